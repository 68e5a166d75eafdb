//! Sheet settings: material prices, sheet weights, laser rates and the
//! material-ID table used to decode nest reports.
//!
//! Loaded from the shop's `sheet_settings.json`:
//!
//! ```json
//! {
//!   "cost_for_laser": { "CO2": 150.0, "Nitrogen": 250.0 },
//!   "materials": ["Mild Steel", "304 SS"],
//!   "thicknesses": ["16 Gauge"],
//!   "price_per_pound": { "Mild Steel": { "price_per_pound": 0.6 } },
//!   "pounds_per_square_foot": { "Mild Steel": { "16 Gauge": { "pounds_per_square_foot": 2.5 } } },
//!   "cutting_methods": { "ST": { "name": "Mild Steel", "cut": "CO2" } },
//!   "thickness_ids": { "16": "16 Gauge" }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{NestQuoteError, NestQuoteResult};
use crate::model::Sheet;

/// Materials cut with nitrogen assist; everything else uses the CO2 rate.
const NITROGEN_MATERIALS: [&str; 3] = ["304 SS", "409 SS", "Aluminium"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricePerPound {
    pub price_per_pound: f64,
    pub latest_change: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoundsPerSquareFoot {
    pub pounds_per_square_foot: f64,
    pub latest_change: String,
}

/// A material code from the nest report, e.g. `"ST"` or `"SS"`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CuttingMethod {
    /// Human material name.
    pub name: String,
    /// Assist gas / cutting method.
    pub cut: String,
}

/// Translates the short codes printed on nest reports into names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialIdTable {
    pub cutting_methods: BTreeMap<String, CuttingMethod>,
    pub thickness_ids: BTreeMap<String, String>,
}

impl MaterialIdTable {
    pub fn material_name(&self, code: &str) -> NestQuoteResult<&str> {
        self.cutting_methods
            .get(code)
            .map(|m| m.name.as_str())
            .ok_or_else(|| NestQuoteError::UnknownMaterialId {
                code: code.to_string(),
            })
    }

    pub fn thickness_name(&self, code: &str) -> NestQuoteResult<&str> {
        self.thickness_ids
            .get(code)
            .map(String::as_str)
            .ok_or_else(|| NestQuoteError::UnknownThicknessId {
                code: code.to_string(),
            })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetSettings {
    /// Cutting method → dollars per hour.
    pub cost_for_laser: BTreeMap<String, f64>,
    pub materials: Vec<String>,
    pub thicknesses: Vec<String>,
    pub price_per_pound: BTreeMap<String, PricePerPound>,
    /// Material → thickness → weight.
    pub pounds_per_square_foot: BTreeMap<String, BTreeMap<String, PoundsPerSquareFoot>>,
    #[serde(flatten)]
    pub material_id: MaterialIdTable,
}

impl SheetSettings {
    pub fn from_json(json: &str) -> NestQuoteResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> NestQuoteResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|source| NestQuoteError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn save(&self, path: &Path) -> NestQuoteResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|source| NestQuoteError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Dollars per pound, `0.0` for unknown materials.
    pub fn get_price_per_pound(&self, material: &str) -> f64 {
        self.price_per_pound
            .get(material)
            .map_or(0.0, |p| p.price_per_pound)
    }

    /// Pounds per square foot, `0.0` when either name is unknown.
    pub fn get_pounds_per_square_foot(&self, material: &str, thickness: &str) -> f64 {
        self.pounds_per_square_foot
            .get(material)
            .and_then(|by_thickness| by_thickness.get(thickness))
            .map_or(0.0, |p| p.pounds_per_square_foot)
    }

    /// Laser rate for a material: nitrogen for stainless and aluminium.
    pub fn get_cost_for_laser(&self, material: &str) -> f64 {
        let method = if NITROGEN_MATERIALS.contains(&material) {
            "Nitrogen"
        } else {
            "CO2"
        };
        self.get_laser_cost(method)
    }

    pub fn get_laser_cost(&self, cutting_method: &str) -> f64 {
        self.cost_for_laser.get(cutting_method).copied().unwrap_or(0.0)
    }

    /// Cost of one sheet of stock.
    pub fn sheet_cost(&self, sheet: &Sheet) -> f64 {
        let price_per_pound = self.get_price_per_pound(&sheet.material);
        let pounds_per_square_foot =
            self.get_pounds_per_square_foot(&sheet.material, &sheet.thickness);
        price_per_pound * (sheet.area() / 144.0) * pounds_per_square_foot
    }
}
