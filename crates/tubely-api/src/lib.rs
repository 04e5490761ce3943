//! Tubely API Library
//!
//! This crate provides the HTTP handlers, authentication middleware, error rendering
//! and application setup for the video service.

pub mod auth;
pub mod error;
mod handlers;
pub mod setup;
pub mod state;

pub use error::{ErrorResponse, HttpAppError};
pub use state::AppState;
