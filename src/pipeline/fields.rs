//! Field matching: named regular expressions applied to a nest report's text.
//!
//! Every pattern has one or two capture groups. Each match yields group 1
//! when it participated, otherwise group 2, so alternations such as
//! `A: (\d+\.\d+)|A: (\d+)` produce one list. A single match is an ordinary
//! one-element list; callers never special-case single-part nests.
//!
//! The table is configurable through JSON. Keys are the field names below;
//! the legacy `*_regex` keys from the shop's old settings file are accepted
//! as aliases. Unlisted fields keep the built-in defaults.

use std::collections::BTreeMap;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::{NestQuoteError, NestQuoteResult};

/// A field read from a nest report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    // ── Per-part fields ─────────────────────────────────────────────────────
    #[serde(alias = "part_path_regex")]
    PartPath,
    #[serde(alias = "machinging_time_regex", alias = "machining_time_regex")]
    MachiningTime,
    #[serde(alias = "weight_regex")]
    Weight,
    #[serde(alias = "surface_area_regex")]
    SurfaceArea,
    #[serde(alias = "cutting_length_regex")]
    CuttingLength,
    #[serde(alias = "quantity_regex")]
    Quantity,
    #[serde(alias = "part_number_regex")]
    PartNumber,
    #[serde(alias = "piercing_time_regex")]
    PiercingTime,
    #[serde(alias = "part_dimension_regex")]
    PartDimensions,
    #[serde(alias = "piercing_points_regex")]
    PiercingPoints,
    GeofileName,

    // ── Sheet fields ────────────────────────────────────────────────────────
    #[serde(alias = "sheet_quantity_regex")]
    SheetQuantity,
    #[serde(alias = "scrap_percentage_regex")]
    ScrapPercentage,
    #[serde(alias = "material_id_regex")]
    MaterialId,
    #[serde(alias = "gauge_regex")]
    Gauge,
    #[serde(alias = "sheet_dimension_regex")]
    SheetDimension,
    #[serde(alias = "sheet_cut_time_regex")]
    SheetCutTime,
}

impl Field {
    pub const ALL: [Field; 17] = [
        Field::PartPath,
        Field::MachiningTime,
        Field::Weight,
        Field::SurfaceArea,
        Field::CuttingLength,
        Field::Quantity,
        Field::PartNumber,
        Field::PiercingTime,
        Field::PartDimensions,
        Field::PiercingPoints,
        Field::GeofileName,
        Field::SheetQuantity,
        Field::ScrapPercentage,
        Field::MaterialId,
        Field::Gauge,
        Field::SheetDimension,
        Field::SheetCutTime,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Field::PartPath => "part_path",
            Field::MachiningTime => "machining_time",
            Field::Weight => "weight",
            Field::SurfaceArea => "surface_area",
            Field::CuttingLength => "cutting_length",
            Field::Quantity => "quantity",
            Field::PartNumber => "part_number",
            Field::PiercingTime => "piercing_time",
            Field::PartDimensions => "part_dimensions",
            Field::PiercingPoints => "piercing_points",
            Field::GeofileName => "geofile_name",
            Field::SheetQuantity => "sheet_quantity",
            Field::ScrapPercentage => "scrap_percentage",
            Field::MaterialId => "material_id",
            Field::Gauge => "gauge",
            Field::SheetDimension => "sheet_dimension",
            Field::SheetCutTime => "sheet_cut_time",
        }
    }

    /// Built-in pattern matching the vendor's nest report layout.
    pub fn default_pattern(self) -> &'static str {
        match self {
            Field::PartPath => r"GEOFILE NAME: ([a-zA-z]:\\[\w\W]{1,300}\.[Gg][Ee][Oo])",
            Field::MachiningTime => r"MACHINING TIME: (\d{1,}.\d{1,}) min",
            Field::Weight => r"WEIGHT: (\d{1,}.\d{1,}) lb",
            Field::SurfaceArea => r"SURFACE: (\d{1,}.\d{1,})  in2",
            Field::CuttingLength => r"CUTTING LENGTH: (\d{1,}.\d{1,})  in|CUTTING LENGTH: (\d{1,})  in",
            Field::Quantity => r"  NUMBER: (\d{1,})",
            Field::PartNumber => r"PART NUMBER: (\d{1,})",
            Field::PiercingTime => r"PIERCING TIME (\d{1,}.\d{1,})  s",
            Field::PartDimensions => r"DIMENSIONS: (\d{1,}\.\d{1,} x \d{1,}\.\d{1,})",
            Field::PiercingPoints => r"NUMBER OF PIERCING POINTS: (\d{1,})",
            Field::GeofileName => r"GEOFILE NAME: (.:[\s\S]*?\.[Gg][Ee][Oo])",
            Field::SheetQuantity => {
                r"PROGRAMME RUNS:  \/  SCRAP: (\d{1,})|PROGRAM RUNS:  \/  SCRAP: (\d{1,})"
            }
            Field::ScrapPercentage => {
                r"PROGRAMME RUNS:  \/  SCRAP: \d{1,}  \/  (\d{1,}.\d{1,}) %|PROGRAM RUNS:  \/  SCRAP: \d{1,}  \/  (\d{1,}.\d{1,}) %"
            }
            Field::MaterialId => r"MATERIAL ID \(SHEET\):.{1,}(ST|SS|AL)-\d{1,}",
            Field::Gauge => r"MATERIAL ID \(SHEET\):.{1,}\w{2}-(\d{1,})",
            Field::SheetDimension => r"BLANK: (\d{1,}\.\d{1,} x \d{1,}\.\d{1,}) x \d{1,}\.\d{1,}",
            Field::SheetCutTime => r"MACHINING TIME: NC postprocessor (\d{1,} : \d{1,} : \d{1,})",
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// The named regex table, as stored in settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldPatterns {
    patterns: BTreeMap<Field, String>,
}

impl Default for FieldPatterns {
    fn default() -> Self {
        Self {
            patterns: Field::ALL
                .iter()
                .map(|f| (*f, f.default_pattern().to_string()))
                .collect(),
        }
    }
}

impl FieldPatterns {
    /// Parse a JSON object of overrides on top of the built-in defaults.
    pub fn from_json(json: &str) -> NestQuoteResult<Self> {
        let overrides: BTreeMap<Field, String> = serde_json::from_str(json)?;
        let mut patterns = Self::default();
        patterns.patterns.extend(overrides);
        Ok(patterns)
    }

    pub fn load(path: &Path) -> NestQuoteResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|source| NestQuoteError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.patterns.get(&field).map(String::as_str)
    }

    pub fn set(&mut self, field: Field, pattern: impl Into<String>) {
        self.patterns.insert(field, pattern.into());
    }

    /// Compile every pattern. Fails on the first invalid or missing one.
    pub fn compile(&self) -> NestQuoteResult<FieldMatcher> {
        let mut compiled = BTreeMap::new();
        for field in Field::ALL {
            let pattern = self.get(field).ok_or_else(|| NestQuoteError::MissingPattern {
                field: field.key().to_string(),
            })?;
            let regex = RegexBuilder::new(pattern)
                .multi_line(true)
                .build()
                .map_err(|e| NestQuoteError::InvalidPattern {
                    field: field.key().to_string(),
                    reason: e.to_string(),
                })?;
            compiled.insert(field, regex);
        }
        Ok(FieldMatcher { compiled })
    }
}

static DEFAULT_MATCHER: Lazy<Option<FieldMatcher>> =
    Lazy::new(|| FieldPatterns::default().compile().ok());

/// A compiled [`FieldPatterns`] table.
#[derive(Debug, Clone)]
pub struct FieldMatcher {
    compiled: BTreeMap<Field, Regex>,
}

impl FieldMatcher {
    /// The built-in vendor table, compiled once per process.
    pub fn builtin() -> NestQuoteResult<&'static FieldMatcher> {
        DEFAULT_MATCHER
            .as_ref()
            .ok_or_else(|| NestQuoteError::Internal("built-in field patterns do not compile".into()))
    }

    fn regex(&self, field: Field) -> NestQuoteResult<&Regex> {
        self.compiled.get(&field).ok_or_else(|| NestQuoteError::MissingPattern {
            field: field.key().to_string(),
        })
    }

    /// Every match of `field` in document order.
    pub fn match_all(&self, field: Field, text: &str) -> NestQuoteResult<Vec<String>> {
        Ok(match_all(self.regex(field)?, text))
    }

    /// The first match of a singleton field; no match is a configuration error.
    pub fn require_first(&self, field: Field, text: &str) -> NestQuoteResult<String> {
        self.match_all(field, text)?
            .into_iter()
            .next()
            .ok_or_else(|| NestQuoteError::PatternNoMatch {
                field: field.key().to_string(),
            })
    }
}

/// Group 1 of each match, or group 2 when group 1 did not participate.
pub fn match_all(regex: &Regex, text: &str) -> Vec<String> {
    regex
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| m.as_str().to_string())
        .collect()
}
