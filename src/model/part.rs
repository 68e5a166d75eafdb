//! Laser-cut part occurrences and their quoting state.

use serde::{Deserialize, Serialize};

/// Default overspray / transfer-efficiency percentage for new parts.
pub const DEFAULT_COATING_PERCENT: f64 = 66.67;

/// One laser-cut part as it appears on one nest.
///
/// Created fresh from the parsed report of a single nest. Grouping for a
/// quote works on copies; the nest's own record is left untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaserCutPart {
    pub name: String,
    pub part_number: String,
    /// Quantity quoted. Equal to `quantity_in_nest` right after ingestion.
    pub quantity: u32,
    /// Quantity cut on one sheet of the nest.
    pub quantity_in_nest: u32,
    /// `None` on grouped copies, which no longer belong to a single nest.
    pub quantity_on_sheet: Option<u32>,
    /// Machining time in minutes.
    pub machining_time: f64,
    /// Weight in pounds.
    pub weight: f64,
    /// Surface area in square inches.
    pub surface_area: f64,
    /// Cutting length in inches.
    pub cutting_length: f64,
    /// Piercing time in seconds.
    pub piercing_time: f64,
    pub piercing_points: u32,
    pub material: String,
    pub gauge: String,
    pub part_dim: String,
    pub sheet_dim: String,
    pub geofile_name: String,
    /// Nest report the part was read from.
    pub file_name: String,
    /// Picture reference, relative to the program directory.
    pub image_path: String,
    pub recut: bool,
    pub notes: String,

    pub price: f64,
    pub cost_of_goods: f64,
    pub bend_cost: f64,
    pub labor_cost: f64,
    pub matched_to_sheet_cost_price: f64,

    pub paint: PaintSettings,
}

impl Default for LaserCutPart {
    fn default() -> Self {
        Self {
            name: String::new(),
            part_number: String::new(),
            quantity: 0,
            quantity_in_nest: 0,
            quantity_on_sheet: None,
            machining_time: 0.0,
            weight: 0.0,
            surface_area: 0.0,
            cutting_length: 0.0,
            piercing_time: 0.0,
            piercing_points: 0,
            material: String::new(),
            gauge: String::new(),
            part_dim: String::new(),
            sheet_dim: String::new(),
            geofile_name: String::new(),
            file_name: String::new(),
            image_path: String::new(),
            recut: false,
            notes: String::new(),
            price: 0.0,
            cost_of_goods: 0.0,
            bend_cost: 0.0,
            labor_cost: 0.0,
            matched_to_sheet_cost_price: 0.0,
            paint: PaintSettings::default(),
        }
    }
}

impl LaserCutPart {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Names of every coating this part uses, one per line.
    pub fn coating_names(&self) -> String {
        let p = &self.paint;
        let mut names = String::new();
        for (used, name) in [
            (p.uses_primer, &p.primer_name),
            (p.uses_paint, &p.paint_name),
            (p.uses_powder, &p.powder_name),
        ] {
            if let (true, Some(name)) = (used, name) {
                names.push_str(name);
                names.push('\n');
            }
        }
        names
    }

    /// Cached primer + paint + powder cost per unit.
    pub fn coating_cost(&self) -> f64 {
        self.paint.cost_for_primer + self.paint.cost_for_paint + self.paint.cost_for_powder_coating
    }
}

/// Primer, paint and powder coating choices for a part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaintSettings {
    pub uses_primer: bool,
    pub primer_name: Option<String>,
    pub primer_overspray: f64,
    pub cost_for_primer: f64,

    pub uses_paint: bool,
    pub paint_name: Option<String>,
    pub paint_overspray: f64,
    pub cost_for_paint: f64,

    pub uses_powder: bool,
    pub powder_name: Option<String>,
    pub powder_transfer_efficiency: f64,
    pub cost_for_powder_coating: f64,
}

impl Default for PaintSettings {
    fn default() -> Self {
        Self {
            uses_primer: false,
            primer_name: None,
            primer_overspray: DEFAULT_COATING_PERCENT,
            cost_for_primer: 0.0,
            uses_paint: false,
            paint_name: None,
            paint_overspray: DEFAULT_COATING_PERCENT,
            cost_for_paint: 0.0,
            uses_powder: false,
            powder_name: None,
            powder_transfer_efficiency: DEFAULT_COATING_PERCENT,
            cost_for_powder_coating: 0.0,
        }
    }
}

/// A quote line item: every occurrence of one part name merged together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupedLaserCutPart {
    /// Copy of the first occurrence with the summed quantity.
    pub part: LaserCutPart,
    /// How many nest occurrences were merged into this line.
    pub occurrences: u32,
}
