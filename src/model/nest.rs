//! Nests: one sheet-cutting layout and the parts cut from it.

use serde::{Deserialize, Serialize};

use super::{natural_cmp, LaserCutPart, Sheet};

/// Picture reference used when a nest or part has no image on disk.
pub const PLACEHOLDER_IMAGE: &str = "images/404.jpeg";

/// One nesting layout, usually one nest report PDF.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Nest {
    pub name: String,
    pub sheet: Sheet,
    /// Number of sheets this layout is run on.
    pub sheet_count: u32,
    pub scrap_percentage: f64,
    /// Cut time for one sheet, in seconds.
    pub sheet_cut_time: f64,
    pub image_path: String,
    pub cutting_method: String,
    pub notes: String,
    pub laser_cut_parts: Vec<LaserCutPart>,
    #[serde(skip)]
    pub is_custom: bool,
}

impl Default for Nest {
    fn default() -> Self {
        Self {
            name: String::new(),
            sheet: Sheet::default(),
            sheet_count: 0,
            scrap_percentage: 0.0,
            sheet_cut_time: 0.0,
            image_path: PLACEHOLDER_IMAGE.to_string(),
            cutting_method: "CO2".to_string(),
            notes: String::new(),
            laser_cut_parts: Vec::new(),
            is_custom: false,
        }
    }
}

impl Nest {
    pub fn new(name: impl Into<String>, sheet: Sheet) -> Self {
        Self {
            name: name.into(),
            sheet,
            ..Self::default()
        }
    }

    /// The hand-built nest that holds parts added outside any nest report.
    pub fn custom() -> Self {
        Self {
            name: "Custom".to_string(),
            is_custom: true,
            ..Self::default()
        }
    }

    pub fn add_laser_cut_part(&mut self, part: LaserCutPart) {
        self.laser_cut_parts.push(part);
    }

    /// Remove the first part with this name, returning it.
    pub fn remove_laser_cut_part(&mut self, name: &str) -> Option<LaserCutPart> {
        let index = self.laser_cut_parts.iter().position(|p| p.name == name)?;
        Some(self.laser_cut_parts.remove(index))
    }

    /// Percentage of the sheet area not covered by cut parts.
    ///
    /// Always within `[0, 100]`; `0` when the sheet has no area.
    pub fn calculate_scrap_percentage(&self) -> f64 {
        let sheet_area = self.sheet.area();
        if sheet_area <= 0.0 || !sheet_area.is_finite() {
            return 0.0;
        }
        let used: f64 = self
            .laser_cut_parts
            .iter()
            .map(|p| p.surface_area * f64::from(p.quantity))
            .sum();
        ((1.0 - used / sheet_area) * 100.0).clamp(0.0, 100.0)
    }

    /// Total cut time across all sheets, in seconds.
    pub fn machining_time(&self) -> f64 {
        self.sheet_cut_time * f64::from(self.sheet_count)
    }

    /// Total cut time formatted as `"HHh MMm SSs"`.
    pub fn total_cutting_time(&self) -> String {
        format_duration(self.machining_time())
    }

    /// Cut time of a single sheet formatted as `"HHh MMm SSs"`.
    pub fn sheet_cutting_time(&self) -> String {
        format_duration(self.sheet_cut_time)
    }

    pub fn sheet_dimension(&self) -> String {
        self.sheet.dimension()
    }

    pub fn display_name(&self) -> String {
        format!(
            "{} {} {} {}",
            self.sheet.thickness,
            self.sheet.material,
            self.sheet_dimension(),
            self.name
        )
    }

    /// Sort parts by part number, digit runs compared numerically.
    pub fn sort_laser_cut_parts(&mut self) {
        self.laser_cut_parts
            .sort_by(|a, b| natural_cmp(&a.part_number, &b.part_number));
    }

    /// One line per part flagged for recut.
    pub fn recut_summary(&self) -> String {
        self.laser_cut_parts
            .iter()
            .filter(|p| p.recut)
            .map(|p| format!("{} needs recut ({} pcs)\n", p.name, p.quantity))
            .collect()
    }
}

fn format_duration(total_seconds: f64) -> String {
    let total = total_seconds.max(0.0);
    let hours = (total / 3600.0).floor() as u64;
    let minutes = ((total % 3600.0) / 60.0).floor() as u64;
    let seconds = (total % 60.0).floor() as u64;
    format!("{hours:02}h {minutes:02}m {seconds:02}s")
}
