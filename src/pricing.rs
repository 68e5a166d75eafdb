//! Quote pricing: overhead and profit margin, per-part cost of goods, sheet
//! costs and the item ↔ sheet cost matching.
//!
//! All percentages on [`QuoteSettings`] are stored as whole percents
//! (`18.0` means 18 %) and divided by 100 here.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{Component, LaserCutPart, Nest, Quote, QuoteSettings};
use crate::paint::PaintInventory;
use crate::settings::SheetSettings;

const OVERHEAD_ITERATIONS: usize = 10;
const MATCH_MAX_ITERATIONS: usize = 200;
const MATCH_TOLERANCE: f64 = 1.0;
const MATCH_STEP_DIVISOR: f64 = 1000.0;

/// Price that covers `cost` plus overhead charged on the price itself, at
/// the given profit margin. Both rates are fractions (`0.18`, not `18`).
///
/// Solved by fixed-point iteration of `price = (cost + price × overhead) / (1 − margin)`.
pub fn calculate_overhead(cost: f64, profit_margin: f64, overhead: f64) -> f64 {
    let mut price = 0.0;
    for _ in 0..OVERHEAD_ITERATIONS {
        let denominator = 1.0 - profit_margin;
        price = if denominator == 0.0 {
            // a 100 % margin has no finite price; keep the legacy blow-up
            cost + (price * overhead) / 1e-8
        } else {
            (cost + price * overhead) / denominator
        };
    }
    price
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Summary figures shown at the bottom of a quote.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuoteTotals {
    /// Raw stock cost of every sheet, before overhead.
    pub stock_cost: f64,
    /// Laser time cost of every sheet, before overhead.
    pub cutting_cost: f64,
    /// Overhead-adjusted stock plus cutting cost.
    pub sheet_cost: f64,
    /// Sum of laser-cut line prices.
    pub item_cost: f64,
    pub component_cost: f64,
    /// Primer, paint and powder share of `item_cost`, before overhead.
    pub paint_cost: f64,
    /// Items plus components.
    pub grand_total: f64,
}

/// Prices a [`Quote`] against the shop's sheet settings and paint inventory.
pub struct QuotePriceCalculator<'a> {
    sheet_settings: &'a SheetSettings,
    paint_inventory: &'a PaintInventory,
    settings: QuoteSettings,
}

impl<'a> QuotePriceCalculator<'a> {
    pub fn new(
        sheet_settings: &'a SheetSettings,
        paint_inventory: &'a PaintInventory,
        settings: &QuoteSettings,
    ) -> Self {
        Self {
            sheet_settings,
            paint_inventory,
            settings: settings.clone(),
        }
    }

    fn item_overhead(&self, cost: f64) -> f64 {
        calculate_overhead(
            cost,
            self.settings.item_profit_margin / 100.0,
            self.settings.item_overhead / 100.0,
        )
    }

    fn sheet_overhead(&self, cost: f64) -> f64 {
        calculate_overhead(
            cost,
            self.settings.sheet_profit_margin / 100.0,
            self.settings.sheet_overhead / 100.0,
        )
    }

    // ── Laser-cut parts ─────────────────────────────────────────────────────

    /// Laser time plus material weight cost for one part.
    pub fn cost_of_goods(&self, part: &LaserCutPart) -> f64 {
        if self.settings.match_item_to_sheet_cost {
            return part.matched_to_sheet_cost_price;
        }
        let price_per_pound = self.sheet_settings.get_price_per_pound(&part.material);
        part.machining_time * (self.settings.laser_cutting_cost / 60.0) + part.weight * price_per_pound
    }

    /// Unit price of a part using `cost_of_goods` as its goods cost.
    fn unit_price_with(&self, part: &LaserCutPart, cost_of_goods: f64) -> f64 {
        [
            cost_of_goods,
            part.bend_cost,
            part.labor_cost,
            part.paint.cost_for_primer,
            part.paint.cost_for_paint,
            part.paint.cost_for_powder_coating,
        ]
        .into_iter()
        .map(|cost| self.item_overhead(cost))
        .sum()
    }

    /// Unit price including overhead and margin on every cost component.
    pub fn unit_price(&self, part: &LaserCutPart) -> f64 {
        self.unit_price_with(part, self.cost_of_goods(part))
    }

    /// Line price: the unit price rounded to cents, times quantity.
    pub fn line_price(&self, part: &LaserCutPart) -> f64 {
        round2(self.unit_price(part)) * f64::from(part.quantity)
    }

    // ── Components ──────────────────────────────────────────────────────────

    pub fn component_unit_price(&self, component: &Component) -> f64 {
        let s = &self.settings;
        if !(s.component_use_overhead || s.component_use_profit_margin) {
            return component.price;
        }
        let margin = if s.component_use_profit_margin {
            s.item_profit_margin / 100.0
        } else {
            0.0
        };
        let overhead = if s.component_use_overhead {
            s.item_overhead / 100.0
        } else {
            0.0
        };
        calculate_overhead(component.price, margin, overhead)
    }

    pub fn component_line_price(&self, component: &Component) -> f64 {
        self.component_unit_price(component) * component.quantity
    }

    // ── Sheets ──────────────────────────────────────────────────────────────

    /// Laser time cost for every sheet of a nest.
    pub fn cutting_cost(&self, nest: &Nest) -> f64 {
        (nest.machining_time() / 3600.0) * self.settings.laser_cutting_cost
    }

    /// Raw stock cost for every sheet of a nest.
    pub fn stock_cost(&self, nest: &Nest) -> f64 {
        self.sheet_settings.sheet_cost(&nest.sheet) * f64::from(nest.sheet_count)
    }

    pub fn total_cost_for_sheets(&self, nests: &[Nest]) -> f64 {
        nests
            .iter()
            .map(|nest| self.sheet_overhead(self.cutting_cost(nest) + self.stock_cost(nest)))
            .sum()
    }

    // ── Whole quote ─────────────────────────────────────────────────────────

    /// Refresh coating costs, cost of goods and price on every grouped line.
    ///
    /// When the quote matches item cost to sheet cost, the matched goods
    /// cost is solved first and then used for the prices.
    pub fn update_laser_cut_parts_cost(&self, quote: &mut Quote) {
        let mil_thickness = self.settings.mil_thickness;
        let unmatched = QuoteSettings {
            match_item_to_sheet_cost: false,
            ..self.settings.clone()
        };
        let raw = QuotePriceCalculator::new(self.sheet_settings, self.paint_inventory, &unmatched);
        for line in quote.grouped_laser_cut_parts_mut() {
            let part = &mut line.part;
            self.paint_inventory.update_part_costs(part, mil_thickness);
            part.cost_of_goods = raw.cost_of_goods(part);
        }

        if self.settings.match_item_to_sheet_cost {
            self.match_item_cogs_to_sheet(quote);
        }

        for line in quote.grouped_laser_cut_parts_mut() {
            line.part.price = round2(self.unit_price(&line.part));
        }
    }

    /// Shift every line's `matched_to_sheet_cost_price` by a common amount
    /// until the item total is within a dollar of the sheet total.
    ///
    /// Returns the number of adjustment rounds used.
    pub fn match_item_cogs_to_sheet(&self, quote: &mut Quote) -> usize {
        let target = self.total_cost_for_sheets(quote.nests());

        for line in quote.grouped_laser_cut_parts_mut() {
            line.part.matched_to_sheet_cost_price = line.part.cost_of_goods;
        }

        let item_total = |quote: &Quote| -> f64 {
            quote
                .grouped_laser_cut_parts()
                .iter()
                .map(|line| {
                    let part = &line.part;
                    self.unit_price_with(part, part.matched_to_sheet_cost_price) * f64::from(part.quantity)
                })
                .sum()
        };

        let mut difference = round2(item_total(quote) - target);
        let mut rounds = 0;
        while difference.abs() > MATCH_TOLERANCE && rounds < MATCH_MAX_ITERATIONS {
            let step = difference.abs() / MATCH_STEP_DIVISOR;
            let amount = if difference > 0.0 { -step } else { step };
            for line in quote.grouped_laser_cut_parts_mut() {
                line.part.matched_to_sheet_cost_price += amount;
            }
            difference = round2(item_total(quote) - target);
            rounds += 1;
            if difference.is_infinite() {
                break;
            }
        }
        debug!(rounds, difference, target, "matched item cost to sheet cost");
        rounds
    }

    /// Sheet profit margin (whole percent, 0 to 100) whose sheet total lands
    /// closest to the item total.
    pub fn match_sheet_cost_to_item(&self, quote: &Quote) -> f64 {
        let target: f64 = quote
            .grouped_laser_cut_parts()
            .iter()
            .map(|line| self.line_price(&line.part))
            .sum();

        let mut best_margin = 0.0;
        let mut best_difference = f64::INFINITY;
        for margin in 0..=100 {
            let candidate = QuotePriceCalculator::new(
                self.sheet_settings,
                self.paint_inventory,
                &QuoteSettings {
                    sheet_profit_margin: f64::from(margin),
                    ..self.settings.clone()
                },
            );
            let difference = (candidate.total_cost_for_sheets(quote.nests()) - target).abs();
            if difference < best_difference {
                best_difference = difference;
                best_margin = f64::from(margin);
            }
        }
        best_margin
    }

    pub fn totals(&self, quote: &Quote) -> QuoteTotals {
        let nests = quote.nests();
        let stock_cost = nests.iter().map(|n| self.stock_cost(n)).sum();
        let cutting_cost = nests.iter().map(|n| self.cutting_cost(n)).sum();
        let sheet_cost = self.total_cost_for_sheets(nests);

        let lines = quote.grouped_laser_cut_parts();
        let item_cost = lines.iter().map(|l| self.line_price(&l.part)).sum::<f64>();
        let paint_cost = lines
            .iter()
            .map(|l| l.part.coating_cost() * f64::from(l.part.quantity))
            .sum();
        let component_cost = quote
            .components()
            .iter()
            .map(|c| self.component_line_price(c))
            .sum::<f64>();

        QuoteTotals {
            stock_cost,
            cutting_cost,
            sheet_cost,
            item_cost,
            component_cost,
            paint_cost,
            grand_total: item_cost + component_cost,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Sheet;

    fn sheet_settings() -> SheetSettings {
        SheetSettings::from_json(
            r#"{
                "cost_for_laser": { "CO2": 150.0, "Nitrogen": 250.0 },
                "price_per_pound": { "Mild Steel": { "price_per_pound": 0.5 } },
                "pounds_per_square_foot": {
                    "Mild Steel": { "16 Gauge": { "pounds_per_square_foot": 2.5 } }
                }
            }"#,
        )
        .unwrap()
    }

    fn no_markup() -> QuoteSettings {
        QuoteSettings {
            item_overhead: 0.0,
            item_profit_margin: 0.0,
            sheet_overhead: 0.0,
            sheet_profit_margin: 0.0,
            ..QuoteSettings::default()
        }
    }

    fn quote_with_part(qty: u32) -> Quote {
        let mut nest = Nest::new("a.pdf", Sheet::new("Mild Steel", "16 Gauge", 48.0, 96.0));
        nest.sheet_count = 2;
        nest.sheet_cut_time = 1800.0;
        let mut part = LaserCutPart::new("Bracket-A");
        part.material = "Mild Steel".into();
        part.machining_time = 6.0;
        part.weight = 4.0;
        part.quantity = qty;
        nest.add_laser_cut_part(part);
        let mut quote = Quote::new("Q");
        quote.add_nest(nest);
        quote
    }

    #[test]
    fn overhead_without_markup_is_identity() {
        assert!((calculate_overhead(42.0, 0.0, 0.0) - 42.0).abs() < 1e-12);
    }

    #[test]
    fn overhead_converges_towards_closed_form() {
        // closed form: cost / (1 - margin - overhead)
        let price = calculate_overhead(100.0, 0.3, 0.18);
        let closed = 100.0 / (1.0 - 0.3 - 0.18);
        assert!(price > 100.0 / 0.7);
        assert!(price < closed);
    }

    #[test]
    fn cost_of_goods_combines_laser_time_and_weight() {
        let sheets = sheet_settings();
        let paint = PaintInventory::default();
        let calc = QuotePriceCalculator::new(&sheets, &paint, &no_markup());
        let quote = quote_with_part(3);
        let part = &quote.grouped_laser_cut_parts()[0].part;
        // 6 min × $2.50/min + 4 lb × $0.50
        assert!((calc.cost_of_goods(part) - 17.0).abs() < 1e-9);
        assert!((calc.line_price(part) - 51.0).abs() < 1e-9);
    }

    #[test]
    fn sheet_costs_scale_with_sheet_count() {
        let sheets = sheet_settings();
        let paint = PaintInventory::default();
        let calc = QuotePriceCalculator::new(&sheets, &paint, &no_markup());
        let quote = quote_with_part(1);
        let nest = &quote.nests()[0];
        // one hour of laser at $150
        assert!((calc.cutting_cost(nest) - 150.0).abs() < 1e-9);
        // two sheets at $40
        assert!((calc.stock_cost(nest) - 80.0).abs() < 1e-9);
        assert!((calc.total_cost_for_sheets(quote.nests()) - 230.0).abs() < 1e-9);
    }

    #[test]
    fn components_only_marked_up_when_enabled() {
        let sheets = sheet_settings();
        let paint = PaintInventory::default();
        let component = Component::new("Bolt", "B-1", 10.0, 2.0);

        let plain = QuotePriceCalculator::new(&sheets, &paint, &QuoteSettings::default());
        assert_eq!(plain.component_line_price(&component), 20.0);

        let marked = QuotePriceCalculator::new(
            &sheets,
            &paint,
            &QuoteSettings {
                component_use_profit_margin: true,
                ..QuoteSettings::default()
            },
        );
        assert!(marked.component_unit_price(&component) > 2.0);
    }

    #[test]
    fn matching_brings_item_total_within_tolerance() {
        let sheets = sheet_settings();
        let paint = PaintInventory::default();
        let settings = QuoteSettings {
            match_item_to_sheet_cost: true,
            ..no_markup()
        };
        let calc = QuotePriceCalculator::new(&sheets, &paint, &settings);
        let mut quote = quote_with_part(200);
        calc.update_laser_cut_parts_cost(&mut quote);

        let target = calc.total_cost_for_sheets(quote.nests());
        let part = &quote.grouped_laser_cut_parts()[0].part;
        let items = part.matched_to_sheet_cost_price * f64::from(part.quantity);
        assert!((items - target).abs() <= 1.0, "items {items} vs sheets {target}");
        assert_eq!(part.cost_of_goods, 17.0);
    }

    #[test]
    fn totals_add_items_and_components() {
        let sheets = sheet_settings();
        let paint = PaintInventory::default();
        let calc = QuotePriceCalculator::new(&sheets, &paint, &no_markup());
        let mut quote = quote_with_part(2);
        quote.add_component(Component::new("Bolt", "B-1", 4.0, 0.5));
        calc.update_laser_cut_parts_cost(&mut quote);

        let totals = calc.totals(&quote);
        assert!((totals.item_cost - 34.0).abs() < 1e-9);
        assert!((totals.component_cost - 2.0).abs() < 1e-9);
        assert!((totals.grand_total - 36.0).abs() < 1e-9);
        assert!((totals.sheet_cost - 230.0).abs() < 1e-9);
    }

    #[test]
    fn sheet_margin_search_stays_in_range() {
        let sheets = sheet_settings();
        let paint = PaintInventory::default();
        let calc = QuotePriceCalculator::new(&sheets, &paint, &QuoteSettings::default());
        let quote = quote_with_part(50);
        let margin = calc.match_sheet_cost_to_item(&quote);
        assert!((0.0..=100.0).contains(&margin));
    }
}
