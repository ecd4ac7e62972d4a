//! Per-point scalar fields

use serde::{Deserialize, Serialize};

/// What a scalar field is used for, derived from its name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarRole {
    /// Vessel radius (also matched by "diameter")
    Radius,
    /// Blood pressure, mapped to vertex colors
    Pressure,
    /// Any other attribute; parsed but unused
    Other,
}

impl ScalarRole {
    /// Classify a field by name (case-insensitive substring match)
    pub fn classify(name: &str) -> Self {
        let name = name.to_ascii_lowercase();
        if name.contains("radius") || name.contains("diameter") {
            Self::Radius
        } else if name.contains("pressure") {
            Self::Pressure
        } else {
            Self::Other
        }
    }
}

/// Inclusive value range of a scalar field
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalarRange {
    pub min: f32,
    pub max: f32,
}

impl ScalarRange {
    /// Range over the finite values of a slice
    pub fn of(values: &[f32]) -> Option<Self> {
        let mut finite = values.iter().copied().filter(|v| v.is_finite());
        let first = finite.next()?;
        let (min, max) = finite.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
        Some(Self { min, max })
    }

    /// Width of the range
    pub fn span(&self) -> f32 {
        self.max - self.min
    }
}

/// Named per-point scalar attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarField {
    /// Field name as declared in the file
    pub name: String,
    /// Declared data type token (`float`, `double`, ...)
    pub data_type: String,
    /// Values, one per point (first component for multi-component fields)
    pub values: Vec<f32>,
}

impl ScalarField {
    /// Create an empty field
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            values: Vec::new(),
        }
    }

    /// Role derived from the field name
    pub fn role(&self) -> ScalarRole {
        ScalarRole::classify(&self.name)
    }

    /// Value at a point index, if present and finite
    pub fn get(&self, index: usize) -> Option<f32> {
        self.values.get(index).copied().filter(|v| v.is_finite())
    }

    /// Value at a point index, or `fallback` for missing entries
    pub fn value_or(&self, index: usize, fallback: f32) -> f32 {
        self.get(index).unwrap_or(fallback)
    }

    /// Number of values
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the field holds no values
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Range over finite values
    pub fn range(&self) -> Option<ScalarRange> {
        ScalarRange::of(&self.values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_classification() {
        assert_eq!(ScalarRole::classify("Radius"), ScalarRole::Radius);
        assert_eq!(ScalarRole::classify("vessel_diameter"), ScalarRole::Radius);
        assert_eq!(ScalarRole::classify("PRESSURE"), ScalarRole::Pressure);
        assert_eq!(ScalarRole::classify("flow"), ScalarRole::Other);
    }

    #[test]
    fn test_value_fallback() {
        let mut field = ScalarField::new("radius", "float");
        field.values = vec![0.5, f32::NAN];

        assert_eq!(field.value_or(0, 0.1), 0.5);
        assert_eq!(field.value_or(1, 0.1), 0.1);
        assert_eq!(field.value_or(7, 0.1), 0.1);
    }

    #[test]
    fn test_range_skips_non_finite() {
        let range = ScalarRange::of(&[3.0, f32::INFINITY, -1.0, 2.0]).unwrap();
        assert_eq!(range.min, -1.0);
        assert_eq!(range.max, 3.0);
        assert_eq!(range.span(), 4.0);
        assert!(ScalarRange::of(&[f32::NAN]).is_none());
    }
}
