//! Orientation classification used to partition storage keys.

use tubely_core::models::{Orientation, StreamGeometry};

const LANDSCAPE_RATIO: f64 = 16.0 / 9.0;
const PORTRAIT_RATIO: f64 = 9.0 / 16.0;
const RATIO_TOLERANCE: f64 = 0.1;

/// Map stream geometry to its orientation partition.
pub fn classify(geometry: &StreamGeometry) -> Orientation {
    classify_ratio(geometry.aspect_ratio())
}

/// Classify a width/height ratio. Both tolerance bounds are inclusive.
pub fn classify_ratio(ratio: f64) -> Orientation {
    if (ratio - LANDSCAPE_RATIO).abs() <= RATIO_TOLERANCE {
        Orientation::Landscape
    } else if (ratio - PORTRAIT_RATIO).abs() <= RATIO_TOLERANCE {
        Orientation::Portrait
    } else {
        Orientation::Other
    }
}
