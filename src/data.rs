use crate::config::ColumnConfig;
use crate::types::{FieldAttributes, FieldFeature, YearDataset, YearInput};
use anyhow::{anyhow, bail, Context, Result};
use geo::MultiPolygon;
use geojson::{GeoJson, JsonObject};
use serde_json::Value as JsonValue;
use shapefile::dbase::{FieldValue, Record};
use shapefile::Reader;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const EXTENSIONS: [&str; 2] = ["geojson", "shp"];

/// Year encoded as the last `_`/`-` separated token of the file stem,
/// e.g. `ww_phenology_ch-2018.geojson`.
pub fn parse_year(path: &Path) -> Result<i32> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| anyhow!("Input file has no usable name: {:?}", path))?;

    let token = stem
        .rsplit('_')
        .next()
        .and_then(|t| t.rsplit('-').next())
        .unwrap_or(stem);

    token
        .parse::<i32>()
        .with_context(|| format!("No trailing numeric year token in file name {:?}", path))
}

fn is_input_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| EXTENSIONS.contains(&e.to_lowercase().as_str()))
            .unwrap_or(false)
}

/// Lists the input files of `dir` whose year is selected, ordered by path.
/// Every candidate's year is parsed, so a malformed name fails even when its
/// year would not have been selected.
pub fn select_inputs(dir: &Path, selected_years: &[i32]) -> Result<Vec<YearInput>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read data directory: {:?}", dir))?;

    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in entries {
        let path = entry
            .with_context(|| format!("Failed to list data directory: {:?}", dir))?
            .path();
        if is_input_file(&path) {
            paths.push(path);
        }
    }
    paths.sort();

    let mut inputs = Vec::new();
    for path in paths {
        let year = parse_year(&path)?;
        if !selected_years.contains(&year) {
            debug!("Skipping {:?}, year {} not selected", path, year);
            continue;
        }
        inputs.push(YearInput { year, path });
    }

    info!("Selected {} input files from {:?}", inputs.len(), dir);
    Ok(inputs)
}

pub fn load_year(input: &YearInput, columns: &ColumnConfig) -> Result<YearDataset> {
    let extension = input.path.extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase())
        .ok_or_else(|| anyhow!("Input file has no extension: {:?}", input.path))?;

    let fields = match extension.as_str() {
        "shp" => load_shapefile(&input.path, columns)?,
        "json" | "geojson" => load_geojson(&input.path, columns)?,
        _ => return Err(anyhow!("Unsupported geometry format: {}", extension)),
    };

    info!("Loaded {} fields for {} from {:?}", fields.len(), input.year, input.path);

    Ok(YearDataset {
        year: input.year,
        source: input.path.clone(),
        fields,
    })
}

/// Read-only access to the attribute table row of one feature.
trait AttributeSource {
    /// `None` when the column does not exist, `Some(Null)` for an empty cell.
    fn attribute(&self, name: &str) -> Option<JsonValue>;
}

impl AttributeSource for JsonObject {
    fn attribute(&self, name: &str) -> Option<JsonValue> {
        self.get(name).cloned()
    }
}

impl AttributeSource for Record {
    fn attribute(&self, name: &str) -> Option<JsonValue> {
        let value = match self.get(name)? {
            FieldValue::Character(Some(s)) => JsonValue::from(s.trim()),
            FieldValue::Memo(s) => JsonValue::from(s.trim()),
            FieldValue::Numeric(Some(n)) => JsonValue::from(*n),
            FieldValue::Float(Some(n)) => JsonValue::from(*n as f64),
            FieldValue::Double(n) => JsonValue::from(*n),
            FieldValue::Currency(n) => JsonValue::from(*n),
            FieldValue::Integer(n) => JsonValue::from(*n),
            FieldValue::Logical(Some(b)) => JsonValue::from(*b),
            FieldValue::Date(Some(d)) => {
                JsonValue::from(format!("{:04}-{:02}-{:02}", d.year(), d.month(), d.day()))
            }
            _ => JsonValue::Null,
        };
        Some(value)
    }
}

fn require<S: AttributeSource>(source: &S, column: &str, path: &Path) -> Result<JsonValue> {
    source
        .attribute(column)
        .ok_or_else(|| anyhow!("Column '{}' not found in {:?}", column, path))
}

fn field_id<S: AttributeSource>(source: &S, column: &str, path: &Path) -> Result<String> {
    match require(source, column, path)? {
        JsonValue::String(s) if !s.is_empty() => Ok(s),
        // Float-typed dBase ids come through as 12.0
        JsonValue::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 => Ok(format!("{:.0}", f)),
            _ => Ok(n.to_string()),
        },
        other => Err(anyhow!("Invalid identifier {} in column '{}' of {:?}", other, column, path)),
    }
}

fn doy_value<S: AttributeSource>(source: &S, column: &str, path: &Path) -> Result<Option<f64>> {
    match require(source, column, path)? {
        JsonValue::Null => Ok(None),
        JsonValue::Number(n) => Ok(n.as_f64()),
        JsonValue::String(s) if s.trim().is_empty() => Ok(None),
        JsonValue::String(s) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .with_context(|| format!("Invalid day of year '{}' in column '{}' of {:?}", s, column, path)),
        other => Err(anyhow!("Invalid day of year {} in column '{}' of {:?}", other, column, path)),
    }
}

fn date_label<S: AttributeSource>(source: &S, column: &str, path: &Path) -> Result<Option<String>> {
    Ok(match require(source, column, path)? {
        JsonValue::Null => None,
        JsonValue::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}

fn read_field<S: AttributeSource>(
    source: &S,
    columns: &ColumnConfig,
    path: &Path,
) -> Result<(String, FieldAttributes)> {
    let id = field_id(source, &columns.id, path)?;
    let attributes = FieldAttributes {
        emergence_doy: doy_value(source, &columns.emergence_doy, path)?,
        heading_doy: doy_value(source, &columns.heading_doy, path)?,
        emergence_date: date_label(source, &columns.emergence_date, path)?,
        heading_date: date_label(source, &columns.heading_date, path)?,
    };
    Ok((id, attributes))
}

fn load_geojson(path: &Path, columns: &ColumnConfig) -> Result<Vec<FieldFeature>> {
    debug!("Loading GeoJSON from {:?}...", path);
    let file = File::open(path)
        .with_context(|| format!("Failed to open GeoJSON file: {:?}", path))?;
    let reader = BufReader::new(file);

    let geojson = GeoJson::from_reader(reader)
        .with_context(|| format!("Failed to parse GeoJSON: {:?}", path))?;

    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => return Err(anyhow!("GeoJSON must be a FeatureCollection: {:?}", path)),
    };

    let empty = JsonObject::new();
    let mut fields = Vec::with_capacity(collection.features.len());

    for feature in collection.features {
        let properties = feature.properties.as_ref().unwrap_or(&empty);
        let (id, attributes) = read_field(properties, columns, path)?;

        let geometry = match feature.geometry {
            Some(geom) => {
                let geo_geom: geo::Geometry<f64> = geom.value.try_into()
                    .map_err(|e| anyhow!("Failed to convert geometry of field {}: {:?}", id, e))?;
                match geo_geom {
                    geo::Geometry::MultiPolygon(mp) => mp,
                    geo::Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
                    _ => {
                        warn!("Skipping field {} in {:?}: geometry is not a polygon", id, path);
                        continue;
                    }
                }
            }
            None => {
                warn!("Skipping field {} in {:?}: no geometry", id, path);
                continue;
            }
        };

        fields.push(FieldFeature { id, geometry, attributes });
    }

    Ok(fields)
}

fn load_shapefile(path: &Path, columns: &ColumnConfig) -> Result<Vec<FieldFeature>> {
    debug!("Loading Shapefile from {:?}...", path);
    let mut reader = Reader::from_path(path)
        .with_context(|| format!("Failed to open Shapefile: {:?}", path))?;

    let mut fields = Vec::new();

    for result in reader.iter_shapes_and_records() {
        let (shape, record) = result
            .with_context(|| format!("Failed to read Shapefile record: {:?}", path))?;
        let (id, attributes) = read_field(&record, columns, path)?;

        let geometry: MultiPolygon<f64> = match shape {
            shapefile::Shape::Polygon(polygon) => polygon.try_into()
                .map_err(|e| anyhow!("Failed to convert polygon of field {}: {:?}", id, e))?,
            shapefile::Shape::PolygonM(polygon) => polygon.try_into()
                .map_err(|e| anyhow!("Failed to convert polygonM of field {}: {:?}", id, e))?,
            shapefile::Shape::PolygonZ(polygon) => polygon.try_into()
                .map_err(|e| anyhow!("Failed to convert polygonZ of field {}: {:?}", id, e))?,
            _ => {
                warn!("Skipping field {} in {:?}: shape is not a polygon", id, path);
                continue;
            }
        };

        fields.push(FieldFeature { id, geometry, attributes });
    }

    Ok(fields)
}

/// Attributes of a dataset keyed by field identifier.
#[derive(Debug)]
pub struct AttributeIndex<'a> {
    by_id: HashMap<&'a str, &'a FieldAttributes>,
}

impl<'a> AttributeIndex<'a> {
    pub fn build(dataset: &'a YearDataset) -> Result<Self> {
        let mut by_id = HashMap::with_capacity(dataset.fields.len());
        for field in &dataset.fields {
            if by_id.insert(field.id.as_str(), &field.attributes).is_some() {
                bail!("Duplicate field identifier '{}' in {:?}", field.id, dataset.source);
            }
        }
        Ok(Self { by_id })
    }

    pub fn lookup(&self, id: &str) -> Result<&'a FieldAttributes> {
        self.by_id
            .get(id)
            .copied()
            .ok_or_else(|| anyhow!("No attributes for field identifier '{}'", id))
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }
}
