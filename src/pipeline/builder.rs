//! Nest/part builder: turn matched field lists and numbered pictures into a
//! [`Nest`] with its [`LaserCutPart`]s.
//!
//! Each part's fields are zipped by position into a [`PartFields`] as soon
//! as they are read, and each [`PartFields`] is paired with its thumbnail in
//! a [`PartRecord`] before any part is created. Nothing downstream indexes
//! parallel lists.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::IngestConfig;
use crate::error::{ImageIssue, NestQuoteError, NestQuoteResult};
use crate::model::{LaserCutPart, Nest, Sheet};
use crate::pipeline::fields::{Field, FieldMatcher};
use crate::pipeline::images::{place_image, NumberedImages};
use crate::settings::MaterialIdTable;

/// Gauge codes at or above this are plate, whatever the material code says.
pub const LASER_GRADE_PLATE_GAUGE: u32 = 50;
pub const LASER_GRADE_PLATE: &str = "Laser Grade Plate";

// ── Token parsing ────────────────────────────────────────────────────────

/// Parse `"<length>x<width>"`, tolerating spaces around the `x`.
pub fn parse_sheet_dimension(value: &str) -> NestQuoteResult<(f64, f64)> {
    let malformed = || NestQuoteError::MalformedDimension {
        value: value.to_string(),
    };
    let normalised = value.trim().replace(" x ", "x");
    let tokens: Vec<&str> = normalised.split('x').collect();
    let [length, width] = tokens.as_slice() else {
        return Err(malformed());
    };
    let length = length.trim().parse::<f64>().map_err(|_| malformed())?;
    let width = width.trim().parse::<f64>().map_err(|_| malformed())?;
    Ok((length, width))
}

/// Parse an `"H : MM : SS"` cut time into seconds.
pub fn parse_cut_time(value: &str) -> NestQuoteResult<f64> {
    let malformed = || NestQuoteError::MalformedCutTime {
        value: value.to_string(),
    };
    let normalised = value.replace(" : ", ":");
    let tokens: Vec<&str> = normalised.split(':').collect();
    let [hours, minutes, seconds] = tokens.as_slice() else {
        return Err(malformed());
    };
    let parse = |t: &str| t.trim().parse::<f64>().map_err(|_| malformed());
    Ok(parse(hours)? * 3600.0 + parse(minutes)? * 60.0 + parse(seconds)?)
}

/// Part name from a geofile path: last `\` segment without the `.GEO`
/// extension.
pub fn clean_part_name(raw: &str) -> String {
    raw.rsplit('\\')
        .next()
        .unwrap_or(raw)
        .replace('\n', "")
        .replace(".GEO", "")
        .replace(".geo", "")
        .trim()
        .to_string()
}

/// Translate the report's material and gauge codes into
/// `(material name, thickness name)`.
pub fn resolve_material(
    material_code: &str,
    gauge_code: &str,
    table: &MaterialIdTable,
) -> NestQuoteResult<(String, String)> {
    let gauge = parse_number::<u32>(Field::Gauge, gauge_code)?;
    let material = if gauge >= LASER_GRADE_PLATE_GAUGE {
        LASER_GRADE_PLATE.to_string()
    } else {
        table.material_name(material_code)?.to_string()
    };
    let thickness = table.thickness_name(gauge_code)?.to_string();
    Ok((material, thickness))
}

fn parse_number<T: std::str::FromStr>(field: Field, value: &str) -> NestQuoteResult<T> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| NestQuoteError::InvalidNumber {
            field: field.key().to_string(),
            value: value.to_string(),
        })
}

// ── Field sets ───────────────────────────────────────────────────────────

/// Sheet-level values read once per report.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetFields {
    pub sheet_count: u32,
    pub scrap_percentage: f64,
    /// Raw dimension text, e.g. `"48.000 x 96.000"`.
    pub sheet_dimension: String,
    pub material_code: String,
    pub gauge_code: String,
    /// Raw cut time text, e.g. `"1 : 02 : 03"`.
    pub cut_time: String,
}

impl SheetFields {
    pub fn read(matcher: &FieldMatcher, text: &str) -> NestQuoteResult<Self> {
        Ok(Self {
            sheet_count: parse_number(
                Field::SheetQuantity,
                &matcher.require_first(Field::SheetQuantity, text)?,
            )?,
            scrap_percentage: parse_number(
                Field::ScrapPercentage,
                &matcher.require_first(Field::ScrapPercentage, text)?,
            )?,
            sheet_dimension: matcher.require_first(Field::SheetDimension, text)?,
            material_code: matcher.require_first(Field::MaterialId, text)?,
            gauge_code: matcher.require_first(Field::Gauge, text)?,
            cut_time: matcher.require_first(Field::SheetCutTime, text)?,
        })
    }
}

/// Every per-part value for one part, taken from the same list position.
#[derive(Debug, Clone, PartialEq)]
pub struct PartFields {
    pub name: String,
    pub part_number: String,
    pub quantity: u32,
    pub machining_time: f64,
    pub weight: f64,
    pub surface_area: f64,
    pub cutting_length: f64,
    pub piercing_time: f64,
    pub piercing_points: u32,
    pub part_dim: String,
    pub geofile_name: String,
}

/// One per-part field's matches, checked against the number of parts.
struct Column {
    field: Field,
    values: Vec<String>,
}

impl Column {
    fn read(matcher: &FieldMatcher, field: Field, text: &str, parts: usize) -> NestQuoteResult<Self> {
        let values = matcher.match_all(field, text)?;
        if values.len() != parts {
            return Err(NestQuoteError::FieldCountMismatch {
                field: field.key().to_string(),
                expected: parts,
                found: values.len(),
                index: values.len().min(parts),
            });
        }
        Ok(Self { field, values })
    }

    fn text(&self, index: usize) -> String {
        self.values[index].clone()
    }

    fn number<T: std::str::FromStr>(&self, index: usize) -> NestQuoteResult<T> {
        parse_number(self.field, &self.values[index])
    }
}

impl PartFields {
    /// Read every part listed in the report, in report order.
    ///
    /// The part list is defined by the part-path matches; every other
    /// per-part field must have exactly that many matches, otherwise values
    /// would land on the wrong part.
    pub fn read_all(matcher: &FieldMatcher, text: &str) -> NestQuoteResult<Vec<Self>> {
        let names = matcher.match_all(Field::PartPath, text)?;
        let n = names.len();
        let column = |field| Column::read(matcher, field, text, n);

        let quantities = column(Field::Quantity)?;
        let machining_times = column(Field::MachiningTime)?;
        let weights = column(Field::Weight)?;
        let surface_areas = column(Field::SurfaceArea)?;
        let cutting_lengths = column(Field::CuttingLength)?;
        let piercing_times = column(Field::PiercingTime)?;
        let piercing_points = column(Field::PiercingPoints)?;
        let part_numbers = column(Field::PartNumber)?;
        let part_dims = column(Field::PartDimensions)?;
        let geofile_names = column(Field::GeofileName)?;

        names
            .iter()
            .enumerate()
            .map(|(i, raw_name)| {
                Ok(PartFields {
                    name: clean_part_name(raw_name),
                    part_number: part_numbers.text(i),
                    quantity: quantities.number(i)?,
                    machining_time: machining_times.number(i)?,
                    weight: weights.number(i)?,
                    surface_area: surface_areas.number(i)?,
                    cutting_length: cutting_lengths.number(i)?,
                    piercing_time: piercing_times.number(i)?,
                    piercing_points: piercing_points.number(i)?,
                    part_dim: part_dims.text(i),
                    geofile_name: geofile_names.text(i),
                })
            })
            .collect()
    }
}

/// Everything read from one report's text.
#[derive(Debug, Clone, PartialEq)]
pub struct NestFields {
    pub sheet: SheetFields,
    pub parts: Vec<PartFields>,
}

impl NestFields {
    pub fn read(matcher: &FieldMatcher, text: &str) -> NestQuoteResult<Self> {
        Ok(Self {
            sheet: SheetFields::read(matcher, text)?,
            parts: PartFields::read_all(matcher, text)?,
        })
    }
}

// ── Binding ──────────────────────────────────────────────────────────────

/// A part's fields together with its numbered thumbnail.
#[derive(Debug, Clone, PartialEq)]
pub struct PartRecord {
    pub fields: PartFields,
    pub image: Option<PathBuf>,
}

/// Pair parts with thumbnails by position.
///
/// Parts without a thumbnail and thumbnails without a part are reported as
/// [`ImageIssue`]s; neither stops the nest from being built.
pub fn bind_part_images(
    nest_name: &str,
    parts: Vec<PartFields>,
    images: Vec<PathBuf>,
) -> (Vec<PartRecord>, Vec<ImageIssue>) {
    let mut issues = Vec::new();
    let extra = images.len().saturating_sub(parts.len());
    let mut images = images.into_iter();

    let records: Vec<PartRecord> = parts
        .into_iter()
        .map(|fields| {
            let image = images.next();
            if image.is_none() {
                issues.push(ImageIssue::MissingPartImage {
                    nest: nest_name.to_string(),
                    part: fields.name.clone(),
                });
            }
            PartRecord { fields, image }
        })
        .collect();

    if extra > 0 {
        issues.push(ImageIssue::UnassignedPartImages {
            nest: nest_name.to_string(),
            extra,
        });
    }
    (records, issues)
}

// ── Nest ─────────────────────────────────────────────────────────────────

/// A nest plus the picture problems met while building it.
#[derive(Debug, Clone)]
pub struct BuiltNest {
    pub nest: Nest,
    pub image_issues: Vec<ImageIssue>,
}

/// Build the nest for one report and move its pictures to their final names.
pub fn build_nest(
    file: &Path,
    fields: NestFields,
    images: NumberedImages,
    table: &MaterialIdTable,
    config: &IngestConfig,
) -> NestQuoteResult<BuiltNest> {
    let nest_name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string());
    let image_name = file
        .file_stem()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| nest_name.clone());

    let sheet_fields = fields.sheet;
    let (length, width) = parse_sheet_dimension(&sheet_fields.sheet_dimension)?;
    let (material, thickness) = resolve_material(&sheet_fields.material_code, &sheet_fields.gauge_code, table)?;
    let sheet_cut_time = parse_cut_time(&sheet_fields.cut_time)?;

    let mut nest = Nest::new(nest_name.clone(), Sheet::new(material.clone(), thickness.clone(), length, width));
    nest.sheet_count = sheet_fields.sheet_count;
    nest.scrap_percentage = sheet_fields.scrap_percentage;
    nest.sheet_cut_time = sheet_cut_time;
    if let Some(method) = table.cutting_methods.get(&sheet_fields.material_code) {
        if !method.cut.is_empty() {
            nest.cutting_method = method.cut.clone();
        }
    }

    let (records, mut issues) = bind_part_images(&nest_name, fields.parts, images.parts);

    let placed = match &images.nest {
        Some(numbered) => place_image(numbered, &image_name, config)?,
        None => None,
    };
    nest.image_path = match placed {
        Some(reference) => reference,
        None => {
            warn!("{nest_name}: nest picture not found, using placeholder");
            issues.push(ImageIssue::MissingNestImage {
                nest: nest_name.clone(),
            });
            config.placeholder_image.clone()
        }
    };

    let file_name = file.display().to_string();
    for record in records {
        let fields = record.fields;
        let image_path = match &record.image {
            Some(numbered) => place_image(numbered, &fields.name, config)?,
            None => None,
        }
        .unwrap_or_else(|| config.placeholder_image.clone());

        nest.add_laser_cut_part(LaserCutPart {
            quantity: fields.quantity,
            quantity_in_nest: fields.quantity,
            quantity_on_sheet: Some(fields.quantity),
            machining_time: fields.machining_time,
            weight: fields.weight,
            surface_area: fields.surface_area,
            cutting_length: fields.cutting_length,
            piercing_time: fields.piercing_time,
            piercing_points: fields.piercing_points,
            material: material.clone(),
            gauge: thickness.clone(),
            part_dim: fields.part_dim,
            sheet_dim: sheet_fields.sheet_dimension.clone(),
            geofile_name: fields.geofile_name,
            file_name: file_name.clone(),
            image_path,
            part_number: fields.part_number,
            ..LaserCutPart::new(fields.name)
        });
    }

    debug!(
        nest = %nest.name,
        parts = nest.laser_cut_parts.len(),
        issues = issues.len(),
        "built nest"
    );
    Ok(BuiltNest {
        nest,
        image_issues: issues,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::CuttingMethod;

    fn table() -> MaterialIdTable {
        let mut table = MaterialIdTable::default();
        table.cutting_methods.insert(
            "ST".into(),
            CuttingMethod {
                name: "Mild Steel".into(),
                cut: "CO2".into(),
            },
        );
        table.thickness_ids.insert("16".into(), "16 Gauge".into());
        table.thickness_ids.insert("50".into(), "1/2\"".into());
        table
    }

    fn part(name: &str) -> PartFields {
        PartFields {
            name: name.into(),
            part_number: "1".into(),
            quantity: 1,
            machining_time: 0.0,
            weight: 0.0,
            surface_area: 0.0,
            cutting_length: 0.0,
            piercing_time: 0.0,
            piercing_points: 0,
            part_dim: String::new(),
            geofile_name: String::new(),
        }
    }

    #[test]
    fn sheet_dimension_with_padded_separator() {
        assert_eq!(parse_sheet_dimension("48 x 96").unwrap(), (48.0, 96.0));
        assert_eq!(parse_sheet_dimension(" 60.000 x 120.000 ").unwrap(), (60.0, 120.0));
        assert_eq!(parse_sheet_dimension("48x96").unwrap(), (48.0, 96.0));
    }

    #[test]
    fn sheet_dimension_with_wrong_token_count() {
        assert!(matches!(
            parse_sheet_dimension("48"),
            Err(NestQuoteError::MalformedDimension { .. })
        ));
        assert!(matches!(
            parse_sheet_dimension("48 x 96 x 0.06"),
            Err(NestQuoteError::MalformedDimension { .. })
        ));
    }

    #[test]
    fn cut_time_to_seconds() {
        assert_eq!(parse_cut_time("1 : 02 : 03").unwrap(), 3723.0);
        assert_eq!(parse_cut_time("0:00:59").unwrap(), 59.0);
        assert!(matches!(
            parse_cut_time("1 : 02"),
            Err(NestQuoteError::MalformedCutTime { .. })
        ));
    }

    #[test]
    fn part_name_from_geofile_path() {
        assert_eq!(clean_part_name(r"C:\Jobs\4417\Bracket-A.GEO"), "Bracket-A");
        assert_eq!(clean_part_name("C:\\Jobs\\Cover\nPlate.geo "), "CoverPlate");
        assert_eq!(clean_part_name("Tab.GEO"), "Tab");
    }

    #[test]
    fn plate_gauge_overrides_material_name() {
        let (material, thickness) = resolve_material("ST", "50", &table()).unwrap();
        assert_eq!(material, LASER_GRADE_PLATE);
        assert_eq!(thickness, "1/2\"");

        let (material, thickness) = resolve_material("ST", "16", &table()).unwrap();
        assert_eq!(material, "Mild Steel");
        assert_eq!(thickness, "16 Gauge");
    }

    #[test]
    fn unknown_codes_are_configuration_errors() {
        assert!(matches!(
            resolve_material("XX", "16", &table()),
            Err(NestQuoteError::UnknownMaterialId { .. })
        ));
        assert!(matches!(
            resolve_material("ST", "18", &table()),
            Err(NestQuoteError::UnknownThicknessId { .. })
        ));
    }

    #[test]
    fn short_per_part_list_is_fatal() {
        let matcher = FieldMatcher::builtin().unwrap();
        let text = format!(
            "GEOFILE NAME: C:\\P\\A.GEO\n{pad}\nGEOFILE NAME: C:\\P\\B.GEO\n  NUMBER: 2\n",
            pad = "-".repeat(320)
        );
        let err = PartFields::read_all(matcher, &text).unwrap_err();
        assert!(matches!(
            err,
            NestQuoteError::FieldCountMismatch { ref field, expected: 2, found: 1, .. } if field == "quantity"
        ));
    }

    #[test]
    fn merged_part_paths_do_not_shift_fields() {
        // two blocks close enough that the part-path pattern spans both
        let matcher = FieldMatcher::builtin().unwrap();
        let text = "GEOFILE NAME: C:\\P\\A.GEO\n  NUMBER: 2\nWEIGHT: 1.25 lb\n\
                    GEOFILE NAME: C:\\P\\B.GEO\n  NUMBER: 9\nWEIGHT: 7.75 lb\n";
        assert_eq!(matcher.match_all(Field::PartPath, text).unwrap().len(), 1);

        let err = PartFields::read_all(matcher, text).unwrap_err();
        assert!(matches!(
            err,
            NestQuoteError::FieldCountMismatch { ref field, expected: 1, found: 2, index: 1 } if field == "quantity"
        ));
    }

    #[test]
    fn images_bind_by_position_and_report_gaps() {
        let parts = vec![part("A"), part("B"), part("C")];
        let images = vec![PathBuf::from("part-0.jpeg"), PathBuf::from("part-1.jpeg")];
        let (records, issues) = bind_part_images("n.pdf", parts, images);
        assert_eq!(records[0].image, Some(PathBuf::from("part-0.jpeg")));
        assert_eq!(records[1].image, Some(PathBuf::from("part-1.jpeg")));
        assert_eq!(records[2].image, None);
        assert_eq!(
            issues,
            vec![ImageIssue::MissingPartImage {
                nest: "n.pdf".into(),
                part: "C".into()
            }]
        );

        let (_, issues) = bind_part_images(
            "n.pdf",
            vec![part("A")],
            vec![PathBuf::from("p0"), PathBuf::from("p1")],
        );
        assert_eq!(
            issues,
            vec![ImageIssue::UnassignedPartImages {
                nest: "n.pdf".into(),
                extra: 1
            }]
        );
    }
}
