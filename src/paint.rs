//! Primer, paint and powder coating inventory and per-part coating costs.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{NestQuoteError, NestQuoteResult};
use crate::model::LaserCutPart;

/// Square feet covered by one pound of powder at 1 mil, specific gravity 1.
const POWDER_COVERAGE_CONSTANT: f64 = 192.3;

/// A liquid coating (primer or paint), priced per gallon.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiquidCoating {
    pub price: f64,
    /// Square feet covered per gallon.
    pub average_coverage: f64,
    pub color: String,
}

/// A powder coating, priced per pound.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Powder {
    pub price: f64,
    pub gravity: f64,
    pub color: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaintInventory {
    pub primers: BTreeMap<String, LiquidCoating>,
    pub paints: BTreeMap<String, LiquidCoating>,
    pub powders: BTreeMap<String, Powder>,
}

impl PaintInventory {
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

    pub fn get_primer_cost(&self, part: &LaserCutPart) -> f64 {
        let paint = &part.paint;
        if !paint.uses_primer {
            return 0.0;
        }
        paint
            .primer_name
            .as_deref()
            .and_then(|name| self.primers.get(name))
            .map_or(0.0, |primer| {
                liquid_cost(primer, part.surface_area, paint.primer_overspray)
            })
    }

    pub fn get_paint_cost(&self, part: &LaserCutPart) -> f64 {
        let paint = &part.paint;
        if !paint.uses_paint {
            return 0.0;
        }
        paint
            .paint_name
            .as_deref()
            .and_then(|name| self.paints.get(name))
            .map_or(0.0, |coat| liquid_cost(coat, part.surface_area, paint.paint_overspray))
    }

    pub fn get_powder_cost(&self, part: &LaserCutPart, mil_thickness: f64) -> f64 {
        let paint = &part.paint;
        if !paint.uses_powder {
            return 0.0;
        }
        let Some(powder) = paint
            .powder_name
            .as_deref()
            .and_then(|name| self.powders.get(name))
        else {
            return 0.0;
        };
        let coverage = safe_div(
            POWDER_COVERAGE_CONSTANT,
            powder.gravity * mil_thickness,
        ) * (paint.powder_transfer_efficiency / 100.0);
        let pounds = safe_div(coated_square_feet(part.surface_area), coverage);
        pounds * powder.price
    }

    /// Refresh the cached coating costs stored on a part.
    pub fn update_part_costs(&self, part: &mut LaserCutPart, mil_thickness: f64) {
        part.paint.cost_for_primer = self.get_primer_cost(part);
        part.paint.cost_for_paint = self.get_paint_cost(part);
        part.paint.cost_for_powder_coating = self.get_powder_cost(part, mil_thickness);
    }
}

/// Both faces of the part, in square feet.
fn coated_square_feet(surface_area: f64) -> f64 {
    surface_area * 2.0 / 144.0
}

fn liquid_cost(coating: &LiquidCoating, surface_area: f64, overspray: f64) -> f64 {
    let gallons = safe_div(coated_square_feet(surface_area), coating.average_coverage)
        * (overspray / 100.0 + 1.0);
    coating.price * gallons
}

fn safe_div(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inventory() -> PaintInventory {
        let mut inv = PaintInventory::default();
        inv.primers.insert(
            "Grey".into(),
            LiquidCoating {
                price: 40.0,
                average_coverage: 400.0,
                color: "#808080".into(),
            },
        );
        inv.powders.insert(
            "Black".into(),
            Powder {
                price: 10.0,
                gravity: 1.923,
                color: "#000000".into(),
            },
        );
        inv
    }

    fn part_with_area(area: f64) -> LaserCutPart {
        let mut part = LaserCutPart::new("Panel");
        part.surface_area = area;
        part
    }

    #[test]
    fn primer_cost_includes_overspray() {
        let mut part = part_with_area(14400.0);
        part.paint.uses_primer = true;
        part.paint.primer_name = Some("Grey".into());
        part.paint.primer_overspray = 100.0;
        // 200 ft² / 400 ft²/gal × 2 × $40
        assert!((inventory().get_primer_cost(&part) - 40.0).abs() < 1e-9);
    }

    #[test]
    fn powder_cost_from_gravity_and_mil() {
        let mut part = part_with_area(7200.0);
        part.paint.uses_powder = true;
        part.paint.powder_name = Some("Black".into());
        part.paint.powder_transfer_efficiency = 100.0;
        // coverage = 192.3 / (1.923 × 1) = 100 ft²/lb, 100 ft² → 1 lb
        let cost = inventory().get_powder_cost(&part, 1.0);
        assert!((cost - 10.0).abs() < 1e-9, "got {cost}");
    }

    #[test]
    fn unused_unknown_or_degenerate_coatings_cost_nothing() {
        let inv = inventory();
        let mut part = part_with_area(100.0);
        assert_eq!(inv.get_primer_cost(&part), 0.0);

        part.paint.uses_paint = true;
        part.paint.paint_name = Some("Missing".into());
        assert_eq!(inv.get_paint_cost(&part), 0.0);

        part.paint.uses_powder = true;
        part.paint.powder_name = Some("Black".into());
        assert_eq!(inv.get_powder_cost(&part, 0.0), 0.0);
    }
}
