//! Raw sheet stock as it appears on a nest.

use serde::{Deserialize, Serialize};

/// A sheet of raw stock: material, thickness and size in inches.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Sheet {
    pub material: String,
    /// Gauge or plate thickness name, e.g. "16 Gauge" or "1/2\"".
    pub thickness: String,
    pub length: f64,
    pub width: f64,
}

impl Sheet {
    pub fn new(material: impl Into<String>, thickness: impl Into<String>, length: f64, width: f64) -> Self {
        Self {
            material: material.into(),
            thickness: thickness.into(),
            length,
            width,
        }
    }

    /// Surface area in square inches.
    pub fn area(&self) -> f64 {
        self.length * self.width
    }

    /// `"<length>x<width>"` with three decimals, the form used in sheet names.
    pub fn dimension(&self) -> String {
        format!("{:.3}x{:.3}", self.length, self.width)
    }

    pub fn name(&self) -> String {
        format!("{} {} {}", self.thickness, self.material, self.dimension())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_includes_dimension() {
        let sheet = Sheet::new("Mild Steel", "16 Gauge", 48.0, 96.0);
        assert_eq!(sheet.dimension(), "48.000x96.000");
        assert_eq!(sheet.name(), "16 Gauge Mild Steel 48.000x96.000");
        assert_eq!(sheet.area(), 4608.0);
    }
}
