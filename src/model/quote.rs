//! A quote: nests, purchased components and the grouped part list.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{natural_cmp, Component, GroupedLaserCutPart, LaserCutPart, Nest};
use crate::error::{NestQuoteError, NestQuoteResult};
use crate::settings::SheetSettings;

/// Quote-level costing and paperwork settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuoteSettings {
    pub laser_cutting_method: String,
    /// Dollars per hour of laser time.
    pub laser_cutting_cost: f64,

    pub item_overhead: f64,
    pub item_profit_margin: f64,
    pub match_item_to_sheet_cost: bool,

    pub sheet_overhead: f64,
    pub sheet_profit_margin: f64,
    pub match_sheet_cost_to_item: bool,

    pub component_use_overhead: bool,
    pub component_use_profit_margin: bool,

    pub primer_overspray: f64,
    pub paint_overspray: f64,
    pub transfer_efficiency: f64,
    pub mil_thickness: f64,

    pub order_number: f64,
    pub status: String,
    pub date_shipped: String,
    pub date_expected: String,
    pub ship_to: String,
}

impl Default for QuoteSettings {
    fn default() -> Self {
        Self {
            laser_cutting_method: "CO2".to_string(),
            laser_cutting_cost: 150.0,
            item_overhead: 18.0,
            item_profit_margin: 30.0,
            match_item_to_sheet_cost: false,
            sheet_overhead: 18.0,
            sheet_profit_margin: 30.0,
            match_sheet_cost_to_item: false,
            component_use_overhead: false,
            component_use_profit_margin: false,
            primer_overspray: 66.67,
            paint_overspray: 66.67,
            transfer_efficiency: 66.67,
            mil_thickness: 2.0,
            order_number: 0.0,
            status: "In progress".to_string(),
            date_shipped: String::new(),
            date_expected: String::new(),
            ship_to: String::new(),
        }
    }
}

/// A customer quote built from one or more nests.
///
/// The nests are the source of truth. [`Quote::grouped_laser_cut_parts`]
/// is a cache rebuilt by [`Quote::group_laser_cut_parts`], which every
/// nest mutation triggers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Quote {
    name: String,
    settings: QuoteSettings,
    components: Vec<Component>,
    nests: Vec<Nest>,
    custom_nest: Nest,

    #[serde(skip)]
    grouped_laser_cut_parts: Vec<GroupedLaserCutPart>,
    #[serde(skip)]
    unsaved_changes: bool,
}

impl Default for Quote {
    fn default() -> Self {
        Self {
            name: String::new(),
            settings: QuoteSettings::default(),
            components: Vec::new(),
            nests: Vec::new(),
            custom_nest: Nest::custom(),
            grouped_laser_cut_parts: Vec::new(),
            unsaved_changes: false,
        }
    }
}

impl Quote {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// A new quote whose laser rate is the shop's rate for the default
    /// cutting method. Keeps the built-in rate when the shop lists none.
    pub fn with_sheet_settings(name: impl Into<String>, sheet_settings: &SheetSettings) -> Self {
        let mut quote = Self::new(name);
        let method = &quote.settings.laser_cutting_method;
        if let Some(cost) = sheet_settings.cost_for_laser.get(method) {
            quote.settings.laser_cutting_cost = *cost;
        }
        quote
    }

    // ── Accessors ───────────────────────────────────────────────────────────

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn settings(&self) -> &QuoteSettings {
        &self.settings
    }

    pub fn nests(&self) -> &[Nest] {
        &self.nests
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn custom_nest(&self) -> &Nest {
        &self.custom_nest
    }

    pub fn grouped_laser_cut_parts(&self) -> &[GroupedLaserCutPart] {
        &self.grouped_laser_cut_parts
    }

    /// Grouped lines for pricing. Edits here are lost on the next regroup.
    pub fn grouped_laser_cut_parts_mut(&mut self) -> &mut [GroupedLaserCutPart] {
        &mut self.grouped_laser_cut_parts
    }

    // ── Dirty tracking ──────────────────────────────────────────────────────

    pub fn changes_made(&mut self) {
        self.unsaved_changes = true;
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.unsaved_changes
    }

    pub fn mark_saved(&mut self) {
        self.unsaved_changes = false;
    }

    // ── Mutations ───────────────────────────────────────────────────────────

    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.changes_made();
    }

    pub fn update_settings(&mut self, f: impl FnOnce(&mut QuoteSettings)) {
        f(&mut self.settings);
        self.changes_made();
    }

    /// Switch cutting method and take its laser rate from the sheet settings.
    pub fn set_laser_cutting_method(
        &mut self,
        method: impl Into<String>,
        sheet_settings: &SheetSettings,
    ) {
        let method = method.into();
        self.settings.laser_cutting_cost = sheet_settings.get_laser_cost(&method);
        self.settings.laser_cutting_method = method;
        self.changes_made();
    }

    pub fn add_nest(&mut self, nest: Nest) {
        self.nests.push(nest);
        self.nests_changed();
    }

    /// Remove the first nest with this name.
    pub fn remove_nest(&mut self, name: &str) -> Option<Nest> {
        let index = self.nests.iter().position(|n| n.name == name)?;
        let nest = self.nests.remove(index);
        self.nests_changed();
        Some(nest)
    }

    /// Edit a nest in place. Returns `false` when no nest has this name.
    pub fn modify_nest(&mut self, name: &str, f: impl FnOnce(&mut Nest)) -> bool {
        let Some(nest) = self.nests.iter_mut().find(|n| n.name == name) else {
            return false;
        };
        f(nest);
        self.nests_changed();
        true
    }

    pub fn add_component(&mut self, component: Component) {
        self.components.push(component);
        self.changes_made();
    }

    pub fn remove_component(&mut self, part_name: &str) -> Option<Component> {
        let index = self.components.iter().position(|c| c.part_name == part_name)?;
        let component = self.components.remove(index);
        self.changes_made();
        Some(component)
    }

    pub fn add_laser_cut_part_to_custom_nest(&mut self, part: LaserCutPart) {
        self.custom_nest.add_laser_cut_part(part);
        self.nests_changed();
    }

    pub fn remove_laser_cut_part_from_custom_nest(&mut self, name: &str) -> Option<LaserCutPart> {
        let part = self.custom_nest.remove_laser_cut_part(name)?;
        self.nests_changed();
        Some(part)
    }

    pub fn sort_nests(&mut self) {
        self.nests.sort_by(|a, b| natural_cmp(&a.name, &b.name));
        self.changes_made();
    }

    fn nests_changed(&mut self) {
        self.group_laser_cut_parts();
        self.changes_made();
    }

    // ── Grouping ────────────────────────────────────────────────────────────

    /// Rebuild the grouped part list from the custom nest and every nest.
    ///
    /// Parts with the same name merge into one line: quantities are summed,
    /// every other field comes from the first occurrence. Lines are sorted
    /// naturally by part name.
    pub fn group_laser_cut_parts(&mut self) {
        let mut grouped: Vec<GroupedLaserCutPart> = Vec::new();
        for nest in std::iter::once(&self.custom_nest).chain(self.nests.iter()) {
            for part in &nest.laser_cut_parts {
                match grouped.iter_mut().find(|g| g.part.name == part.name) {
                    Some(line) => {
                        line.part.quantity += part.quantity;
                        line.occurrences += 1;
                    }
                    None => {
                        let mut copy = part.clone();
                        copy.quantity_on_sheet = None;
                        grouped.push(GroupedLaserCutPart {
                            part: copy,
                            occurrences: 1,
                        });
                    }
                }
            }
        }
        grouped.sort_by(|a, b| natural_cmp(&a.part.name, &b.part.name));
        debug!(quote = %self.name, lines = grouped.len(), "grouped laser cut parts");
        self.grouped_laser_cut_parts = grouped;
    }

    // ── Persistence ─────────────────────────────────────────────────────────

    /// Serialise for saving. Clears the unsaved-changes flag.
    pub fn to_json(&mut self) -> NestQuoteResult<String> {
        let json = serde_json::to_string_pretty(self)?;
        self.mark_saved();
        Ok(json)
    }

    pub fn from_json(json: &str) -> NestQuoteResult<Self> {
        let mut quote: Quote = serde_json::from_str(json)?;
        quote.custom_nest.is_custom = true;
        quote.custom_nest.name = "Custom".to_string();
        quote.group_laser_cut_parts();
        Ok(quote)
    }

    pub fn save_json(&mut self, path: &Path) -> NestQuoteResult<()> {
        let json = self.to_json()?;
        std::fs::write(path, json).map_err(|source| NestQuoteError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load_json(path: &Path) -> NestQuoteResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|source| NestQuoteError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Sheet;

    fn nest_with(name: &str, parts: &[(&str, u32)]) -> Nest {
        let mut nest = Nest::new(name, Sheet::new("Mild Steel", "16 Gauge", 48.0, 96.0));
        for (part_name, qty) in parts {
            let mut part = LaserCutPart::new(*part_name);
            part.quantity = *qty;
            part.quantity_in_nest = *qty;
            part.quantity_on_sheet = Some(*qty);
            nest.add_laser_cut_part(part);
        }
        nest
    }

    #[test]
    fn same_name_parts_sum_quantities() {
        let mut quote = Quote::new("Q-1");
        quote.add_nest(nest_with("a.pdf", &[("Bracket-A", 2)]));
        quote.add_nest(nest_with("b.pdf", &[("Bracket-A", 5), ("Tab", 1)]));

        let grouped = quote.grouped_laser_cut_parts();
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].part.name, "Bracket-A");
        assert_eq!(grouped[0].part.quantity, 7);
        assert_eq!(grouped[0].occurrences, 2);
        assert_eq!(grouped[0].part.quantity_on_sheet, None);
        // the nests' own records are untouched
        assert_eq!(quote.nests()[0].laser_cut_parts[0].quantity, 2);
    }

    #[test]
    fn grouping_is_idempotent() {
        let mut quote = Quote::new("Q-1");
        quote.add_nest(nest_with("a.pdf", &[("Bracket-A", 2), ("Tab", 3)]));
        quote.add_nest(nest_with("b.pdf", &[("Bracket-A", 5)]));

        quote.group_laser_cut_parts();
        let first = serde_json::to_string(quote.grouped_laser_cut_parts()).unwrap();
        quote.group_laser_cut_parts();
        let second = serde_json::to_string(quote.grouped_laser_cut_parts()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn custom_nest_parts_come_first_in_merge() {
        let mut quote = Quote::new("Q-1");
        quote.add_nest(nest_with("a.pdf", &[("Bracket-A", 2)]));
        let mut custom = LaserCutPart::new("Bracket-A");
        custom.quantity = 1;
        custom.notes = "hand added".into();
        quote.add_laser_cut_part_to_custom_nest(custom);

        let line = &quote.grouped_laser_cut_parts()[0];
        assert_eq!(line.part.quantity, 3);
        assert_eq!(line.part.notes, "hand added");
    }

    #[test]
    fn mutations_set_dirty_and_save_clears_it() {
        let mut quote = Quote::new("Q-1");
        assert!(!quote.has_unsaved_changes());
        quote.add_component(Component::new("Bolt", "B-1", 4.0, 0.25));
        assert!(quote.has_unsaved_changes());
        quote.to_json().unwrap();
        assert!(!quote.has_unsaved_changes());
        quote.update_settings(|s| s.status = "Quoted".into());
        assert!(quote.has_unsaved_changes());
    }

    #[test]
    fn removing_a_nest_regroups() {
        let mut quote = Quote::new("Q-1");
        quote.add_nest(nest_with("a.pdf", &[("Bracket-A", 2)]));
        quote.add_nest(nest_with("b.pdf", &[("Bracket-A", 5)]));
        assert!(quote.remove_nest("b.pdf").is_some());
        assert_eq!(quote.grouped_laser_cut_parts()[0].part.quantity, 2);
        assert!(quote.remove_nest("missing.pdf").is_none());
    }

    #[test]
    fn nests_sort_naturally() {
        let mut quote = Quote::new("Q-1");
        for name in ["job-10.pdf", "job-2.pdf", "job-1.pdf"] {
            quote.add_nest(nest_with(name, &[]));
        }
        quote.sort_nests();
        let names: Vec<_> = quote.nests().iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["job-1.pdf", "job-2.pdf", "job-10.pdf"]);
    }

    #[test]
    fn sorting_nests_is_an_unsaved_change() {
        let mut quote = Quote::new("Q-1");
        quote.add_nest(nest_with("job-2.pdf", &[]));
        quote.add_nest(nest_with("job-1.pdf", &[]));
        quote.mark_saved();
        quote.sort_nests();
        assert!(quote.has_unsaved_changes());
    }

    fn shop_rates() -> SheetSettings {
        let mut settings = SheetSettings::default();
        settings.cost_for_laser.insert("CO2".into(), 120.0);
        settings.cost_for_laser.insert("Nitrogen".into(), 240.0);
        settings
    }

    #[test]
    fn laser_rate_comes_from_sheet_settings() {
        let quote = Quote::with_sheet_settings("Q-1", &shop_rates());
        assert_eq!(quote.settings().laser_cutting_method, "CO2");
        assert_eq!(quote.settings().laser_cutting_cost, 120.0);
        assert!(!quote.has_unsaved_changes());

        // no rate listed for the method keeps the built-in one
        let quote = Quote::with_sheet_settings("Q-2", &SheetSettings::default());
        assert_eq!(quote.settings().laser_cutting_cost, 150.0);
    }

    #[test]
    fn changing_cutting_method_rereads_the_rate() {
        let mut quote = Quote::with_sheet_settings("Q-1", &shop_rates());
        quote.set_laser_cutting_method("Nitrogen", &shop_rates());
        assert_eq!(quote.settings().laser_cutting_method, "Nitrogen");
        assert_eq!(quote.settings().laser_cutting_cost, 240.0);
        assert!(quote.has_unsaved_changes());
    }

    #[test]
    fn json_round_trip_rebuilds_grouped_view() {
        let mut quote = Quote::new("Q-7");
        quote.add_nest(nest_with("a.pdf", &[("Bracket-A", 2)]));
        quote.add_nest(nest_with("b.pdf", &[("Bracket-A", 5)]));
        let json = quote.to_json().unwrap();
        assert!(!json.contains("grouped_laser_cut_parts"));

        let loaded = Quote::from_json(&json).unwrap();
        assert_eq!(loaded.name(), "Q-7");
        assert!(loaded.custom_nest().is_custom);
        assert_eq!(loaded.grouped_laser_cut_parts()[0].part.quantity, 7);
        assert!(!loaded.has_unsaved_changes());
    }
}
