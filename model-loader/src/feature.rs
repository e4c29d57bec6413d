//! The fixed model input layout.
//!
//! The classifier was trained on exactly this column order. Reordering the
//! fields silently corrupts every prediction, so construction only goes
//! through [`FeatureVector::new`] with named arguments.

use serde::Serialize;

/// Number of input features every artifact is expected to accept.
pub const FEATURE_COUNT: usize = 5;

/// Training-time column names, in input order.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "temp_max_fb",
    "temp_min_fb",
    "humidity_percent_hist_fb",
    "wind_speed_kmh_hist_fb",
    "city_encoded",
];

/// Whether an artifact's recorded column names match [`FEATURE_NAMES`].
///
/// Artifacts that record no names are accepted; there is nothing to check.
pub fn matches_training_layout(names: &[String]) -> bool {
    names.is_empty() || names.iter().map(String::as_str).eq(FEATURE_NAMES)
}

/// `[temp_max, temp_min, humidity_percent, wind_speed_kmh, city_code]` as `f32`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureVector([f32; FEATURE_COUNT]);

impl FeatureVector {
    pub fn new(
        temp_max: f64,
        temp_min: f64,
        humidity_percent: f64,
        wind_speed_kmh: f64,
        city_code: u32,
    ) -> Self {
        Self([
            temp_max as f32,
            temp_min as f32,
            humidity_percent as f32,
            wind_speed_kmh as f32,
            city_code as f32,
        ])
    }

    pub fn as_array(&self) -> &[f32; FEATURE_COUNT] {
        &self.0
    }

    pub fn get(&self, index: usize) -> Option<f32> {
        self.0.get(index).copied()
    }
}

impl From<[f32; FEATURE_COUNT]> for FeatureVector {
    fn from(values: [f32; FEATURE_COUNT]) -> Self {
        Self(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn new_keeps_training_order() {
        let v = FeatureVector::new(42.0, 28.0, 15.0, 25.0, 6);
        assert_eq!(v.as_array(), &[42.0, 28.0, 15.0, 25.0, 6.0]);
        assert_eq!(v.get(4), Some(6.0));
        assert_eq!(v.get(5), None);
    }

    #[test]
    fn names_line_up_with_positions() {
        assert_eq!(FEATURE_NAMES[2], "humidity_percent_hist_fb");
        assert_eq!(FEATURE_NAMES[FEATURE_COUNT - 1], "city_encoded");
    }

    #[test]
    fn training_layout_check() {
        let owned = |names: &[&str]| names.iter().map(ToString::to_string).collect::<Vec<_>>();
        assert!(matches_training_layout(&[]));
        assert!(matches_training_layout(&owned(&FEATURE_NAMES)));

        let mut swapped = owned(&FEATURE_NAMES);
        swapped.swap(0, 1);
        assert!(!matches_training_layout(&swapped));
        assert!(!matches_training_layout(&owned(&FEATURE_NAMES[..4])));
    }
}
