//! Artifact loading from delimited text and JSON files
//!
//! Line policy for delimited text:
//! - blank lines are ignored
//! - lines with the wrong number of fields are skipped and counted
//! - a correctly shaped line with an unparseable, non-finite or invalid
//!   field aborts the load with [`DatasetError::MalformedArtifact`]
//! - a file that yields no records at all is [`DatasetError::EmptyArtifact`]

use h3o::CellIndex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::{DatasetError, Result};

/// Utilization files number stations this much higher than the location table.
pub const STATION_ID_OFFSET: i64 = 6364;

/// Records read from one artifact, plus the count of mis-shaped lines skipped.
#[derive(Debug, Clone)]
pub struct Loaded<T> {
    pub records: Vec<T>,
    pub skipped: usize,
}

impl<T> Loaded<T> {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Field count a delimited line must have to be considered a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineShape {
    Exactly(usize),
    AtLeast(usize),
}

impl LineShape {
    fn accepts(&self, fields: usize) -> bool {
        match *self {
            LineShape::Exactly(n) => fields == n,
            LineShape::AtLeast(n) => fields >= n,
        }
    }
}

/// A record type stored one-per-line as comma-separated fields.
pub trait DelimitedRecord: Sized {
    const SHAPE: LineShape;

    /// Build a record from a line already known to have an accepted shape.
    fn from_fields(fields: &[&str]) -> std::result::Result<Self, String>;
}

// ========== Field parsing ==========

fn parse_hex(field: &str) -> std::result::Result<String, String> {
    let hex = field.trim();
    if hex.is_empty() {
        return Err("empty H3 cell id".to_string());
    }
    CellIndex::from_str(hex).map_err(|e| format!("invalid H3 cell id {hex:?}: {e}"))?;
    Ok(hex.to_lowercase())
}

fn parse_number(field: &str, name: &str) -> std::result::Result<f64, String> {
    let value: f64 = field
        .trim()
        .parse()
        .map_err(|_| format!("{name} is not a number: {:?}", field.trim()))?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(format!("{name} is not finite: {value}"))
    }
}

fn parse_station_id(field: &str) -> std::result::Result<i64, String> {
    field
        .trim()
        .parse()
        .map_err(|_| format!("station id is not an integer: {:?}", field.trim()))
}

/// Validate latitude is in valid range
fn is_valid_latitude(lat: f64) -> bool {
    (-90.0..=90.0).contains(&lat)
}

/// Validate longitude is in valid range
fn is_valid_longitude(lon: f64) -> bool {
    (-180.0..=180.0).contains(&lon)
}

// ========== Records ==========

/// Heatmap cell from the JSON artifacts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapCell {
    pub hex_id: String,
    pub value: f64,
    pub is_nation: bool,
}

/// `hex,capacity` (Mb) per cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapacityCell {
    pub hex_id: String,
    pub capacity: f64,
}

impl DelimitedRecord for CapacityCell {
    const SHAPE: LineShape = LineShape::Exactly(2);

    fn from_fields(fields: &[&str]) -> std::result::Result<Self, String> {
        Ok(Self {
            hex_id: parse_hex(fields[0])?,
            capacity: parse_number(fields[1], "capacity")?,
        })
    }
}

/// `hex,value`: remaining capacity fraction of a non-nation cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellValue {
    pub hex_id: String,
    pub value: f64,
}

impl DelimitedRecord for CellValue {
    const SHAPE: LineShape = LineShape::Exactly(2);

    fn from_fields(fields: &[&str]) -> std::result::Result<Self, String> {
        Ok(Self {
            hex_id: parse_hex(fields[0])?,
            value: parse_number(fields[1], "value")?,
        })
    }
}

/// `hex,terminals`: a cell inside the simulated country.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NationCell {
    pub hex_id: String,
    pub terminals: f64,
}

impl NationCell {
    pub fn has_terminals(&self) -> bool {
        self.terminals > 0.0
    }
}

impl DelimitedRecord for NationCell {
    const SHAPE: LineShape = LineShape::Exactly(2);

    fn from_fields(fields: &[&str]) -> std::result::Result<Self, String> {
        Ok(Self {
            hex_id: parse_hex(fields[0])?,
            terminals: parse_number(fields[1], "terminals")?,
        })
    }
}

/// `id,name,lat,lng[,...]` from the ground-station location table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationLocation {
    pub station_id: i64,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
}

impl DelimitedRecord for StationLocation {
    const SHAPE: LineShape = LineShape::AtLeast(4);

    fn from_fields(fields: &[&str]) -> std::result::Result<Self, String> {
        let lat = parse_number(fields[2], "latitude")?;
        let lng = parse_number(fields[3], "longitude")?;
        if !is_valid_latitude(lat) || !is_valid_longitude(lng) {
            return Err(format!("coordinates out of range: ({lat}, {lng})"));
        }
        Ok(Self {
            station_id: parse_station_id(fields[0])?,
            name: fields[1].trim().to_string(),
            lat,
            lng,
        })
    }
}

/// `id,utilization` with the utilization file's own (offset) station ids.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationUtilization {
    pub station_id: i64,
    pub utilization: f64,
}

impl StationUtilization {
    /// Id of the matching row in the location table.
    pub fn location_id(&self) -> i64 {
        self.station_id - STATION_ID_OFFSET
    }
}

impl DelimitedRecord for StationUtilization {
    const SHAPE: LineShape = LineShape::AtLeast(2);

    fn from_fields(fields: &[&str]) -> std::result::Result<Self, String> {
        Ok(Self {
            station_id: parse_station_id(fields[0])?,
            utilization: parse_number(fields[1], "utilization")?,
        })
    }
}

/// A located ground station with its utilization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationRecord {
    pub station_id: i64,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub utilization: f64,
}

// ========== Loaders ==========

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => DatasetError::ArtifactNotFound(path.display().to_string()),
        _ => DatasetError::Io(e),
    })
}

fn malformed(path: &Path, line: Option<usize>, reason: impl Into<String>) -> DatasetError {
    DatasetError::MalformedArtifact {
        path: path.to_path_buf(),
        line,
        reason: reason.into(),
    }
}

fn empty(path: &Path) -> DatasetError {
    DatasetError::EmptyArtifact {
        path: path.to_path_buf(),
    }
}

/// Load a comma-separated artifact of `T` records.
pub fn load_delimited<T: DelimitedRecord>(path: impl AsRef<Path>) -> Result<Loaded<T>> {
    let path = path.as_ref();
    debug!("Loading delimited artifact {:?}", path);

    let reader = BufReader::new(open(path)?);
    let mut records = Vec::new();
    let mut skipped = 0;

    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.map_err(|e| match e.kind() {
            io::ErrorKind::InvalidData => malformed(path, Some(line_no), "not valid UTF-8"),
            _ => DatasetError::Io(e),
        })?;

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split(',').collect();
        if !T::SHAPE.accepts(fields.len()) {
            debug!("Skipping line {} of {:?}: {} fields", line_no, path, fields.len());
            skipped += 1;
            continue;
        }

        let record = T::from_fields(&fields).map_err(|reason| malformed(path, Some(line_no), reason))?;
        records.push(record);
    }

    if records.is_empty() {
        return Err(empty(path));
    }
    if skipped > 0 {
        warn!("Skipped {} mis-shaped lines in {:?}", skipped, path);
    }
    info!("Loaded {} records from {:?}", records.len(), path);

    Ok(Loaded { records, skipped })
}

/// Raw heatmap entry from JSON
#[derive(Debug, Deserialize)]
struct RawHeatmapCell {
    hex: Option<String>,
    value: Option<f64>,
    #[serde(default)]
    is_nation: bool,
}

/// Load a JSON heatmap: one array of `{hex, value, is_nation}` objects.
///
/// Nation cells may omit `value`; every other cell needs a finite one.
pub fn load_heatmap_cells(path: impl AsRef<Path>) -> Result<Loaded<HeatmapCell>> {
    let path = path.as_ref();
    debug!("Loading heatmap artifact {:?}", path);

    let reader = BufReader::new(open(path)?);
    let raw: Vec<RawHeatmapCell> = serde_json::from_reader(reader).map_err(|e| {
        if e.is_io() {
            DatasetError::Io(e.into())
        } else {
            malformed(path, Some(e.line()), e.to_string())
        }
    })?;

    let mut records = Vec::with_capacity(raw.len());
    for (i, cell) in raw.into_iter().enumerate() {
        let entry = i + 1;
        let hex_id = parse_hex(cell.hex.as_deref().unwrap_or_default())
            .map_err(|reason| malformed(path, None, format!("entry {entry}: {reason}")))?;
        let value = match (cell.value, cell.is_nation) {
            (Some(v), _) if v.is_finite() => v,
            (None, true) => 0.0,
            (Some(v), _) => {
                return Err(malformed(path, None, format!("entry {entry}: value is not finite: {v}")))
            }
            (None, false) => return Err(malformed(path, None, format!("entry {entry}: missing value"))),
        };
        records.push(HeatmapCell {
            hex_id,
            value,
            is_nation: cell.is_nation,
        });
    }

    if records.is_empty() {
        return Err(empty(path));
    }
    info!("Loaded {} heatmap cells from {:?}", records.len(), path);

    Ok(Loaded { records, skipped: 0 })
}

/// Station locations joined with a utilization table.
#[derive(Debug, Clone)]
pub struct StationsJoin {
    /// Every location; stations without a utilization row read as 0.
    pub stations: Vec<StationRecord>,
    /// Locations that found a utilization row.
    pub matched: usize,
    /// Utilization rows whose adjusted id has no location.
    pub orphaned: usize,
    /// Mis-shaped lines skipped across both input files.
    pub skipped: usize,
}

/// Join utilization rows to locations via [`STATION_ID_OFFSET`].
///
/// Zero matches means the offset or the files disagree; that is reported
/// as [`DatasetError::JoinMismatch`] rather than rendering an all-zero map.
pub fn join_station_utilization(
    locations: &[StationLocation],
    utilization: &[StationUtilization],
    source: &Path,
) -> Result<StationsJoin> {
    let by_location: HashMap<i64, f64> = utilization
        .iter()
        .map(|u| (u.location_id(), u.utilization))
        .collect();

    let mut matched = 0;
    let stations: Vec<StationRecord> = locations
        .iter()
        .map(|loc| {
            let utilization = match by_location.get(&loc.station_id) {
                Some(u) => {
                    matched += 1;
                    *u
                }
                None => 0.0,
            };
            StationRecord {
                station_id: loc.station_id,
                name: loc.name.clone(),
                lat: loc.lat,
                lng: loc.lng,
                utilization,
            }
        })
        .collect();

    if matched == 0 {
        return Err(DatasetError::JoinMismatch {
            path: PathBuf::from(source),
        });
    }

    let located: std::collections::HashSet<i64> = locations.iter().map(|l| l.station_id).collect();
    let orphaned = by_location.keys().filter(|id| !located.contains(id)).count();
    if orphaned > 0 {
        warn!("{} utilization rows in {:?} have no station location", orphaned, source);
    }

    Ok(StationsJoin {
        stations,
        matched,
        orphaned,
        skipped: 0,
    })
}

/// Load the location table and a utilization file, then join them.
pub fn load_stations(
    locations_path: impl AsRef<Path>,
    utilization_path: impl AsRef<Path>,
) -> Result<StationsJoin> {
    let locations = load_delimited::<StationLocation>(locations_path)?;
    let utilization_path = utilization_path.as_ref();
    let utilization = load_delimited::<StationUtilization>(utilization_path)?;
    let mut join = join_station_utilization(&locations.records, &utilization.records, utilization_path)?;
    join.skipped = locations.skipped + utilization.skipped;
    Ok(join)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const CELL_A: &str = "8928308280fffff";
    const CELL_B: &str = "8928308280bffff";
    const CELL_C: &str = "89283082807ffff";

    fn file_with(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_capacity_cells() {
        let file = file_with(&format!("{CELL_A},120.5\n{CELL_B},80\n\n{CELL_C},0\n"));
        let loaded = load_delimited::<CapacityCell>(file.path()).unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded.skipped, 0);
        assert_eq!(loaded.records[0].hex_id, CELL_A);
        assert_eq!(loaded.records[1].capacity, 80.0);
    }

    #[test]
    fn test_misshaped_lines_skipped_and_counted() {
        let file = file_with(&format!("{CELL_A},1.0\n{CELL_B},2.0,extra\njunk\n{CELL_C},3.0\n"));
        let loaded = load_delimited::<CellValue>(file.path()).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.skipped, 2);
    }

    #[test]
    fn test_bad_number_aborts_with_line() {
        let file = file_with(&format!("{CELL_A},1.0\n{CELL_B},abc\n"));
        match load_delimited::<CapacityCell>(file.path()) {
            Err(DatasetError::MalformedArtifact { line, .. }) => assert_eq!(line, Some(2)),
            other => panic!("expected MalformedArtifact, got {other:?}"),
        }
    }

    #[test]
    fn test_non_finite_and_bad_hex_rejected() {
        let file = file_with(&format!("{CELL_A},NaN\n"));
        assert!(matches!(
            load_delimited::<CapacityCell>(file.path()),
            Err(DatasetError::MalformedArtifact { .. })
        ));

        let file = file_with(",1.0\n");
        assert!(matches!(
            load_delimited::<CapacityCell>(file.path()),
            Err(DatasetError::MalformedArtifact { line: Some(1), .. })
        ));

        let file = file_with("not-a-cell,1.0\n");
        assert!(matches!(
            load_delimited::<CapacityCell>(file.path()),
            Err(DatasetError::MalformedArtifact { .. })
        ));
    }

    #[test]
    fn test_file_without_records_is_empty() {
        let file = file_with("only,three,fields\n\n");
        assert!(matches!(
            load_delimited::<CapacityCell>(file.path()),
            Err(DatasetError::EmptyArtifact { .. })
        ));

        let json = file_with("[]");
        assert!(matches!(
            load_heatmap_cells(json.path()),
            Err(DatasetError::EmptyArtifact { .. })
        ));
    }

    #[test]
    fn test_invalid_utf8_reports_line() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(format!("{CELL_A},1.0\n").as_bytes()).unwrap();
        file.write_all(b"\xff\xfe,2.0\n").unwrap();
        match load_delimited::<CellValue>(file.path()) {
            Err(DatasetError::MalformedArtifact { line, reason, .. }) => {
                assert_eq!(line, Some(2));
                assert_eq!(reason, "not valid UTF-8");
            }
            other => panic!("expected MalformedArtifact, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.txt");
        assert!(matches!(
            load_delimited::<CapacityCell>(&missing),
            Err(DatasetError::ArtifactNotFound(_))
        ));
        assert!(matches!(
            load_heatmap_cells(&missing),
            Err(DatasetError::ArtifactNotFound(_))
        ));
    }

    #[test]
    fn test_load_heatmap_json() {
        let json = format!(
            r#"[
                {{"hex": "{CELL_A}", "value": 0.25, "is_nation": false}},
                {{"hex": "{CELL_B}", "value": 0.9}},
                {{"hex": "{CELL_C}", "is_nation": true}}
            ]"#
        );
        let file = file_with(&json);
        let loaded = load_heatmap_cells(file.path()).unwrap();
        assert_eq!(loaded.len(), 3);
        assert!(!loaded.records[1].is_nation);
        assert!(loaded.records[2].is_nation);
        assert_eq!(loaded.records[2].value, 0.0);
    }

    #[test]
    fn test_heatmap_json_missing_value_rejected() {
        let file = file_with(&format!(r#"[{{"hex": "{CELL_A}", "is_nation": false}}]"#));
        assert!(matches!(
            load_heatmap_cells(file.path()),
            Err(DatasetError::MalformedArtifact { .. })
        ));

        let file = file_with("{\"not\": \"an array\"}");
        assert!(matches!(
            load_heatmap_cells(file.path()),
            Err(DatasetError::MalformedArtifact { line: Some(1), .. })
        ));
    }

    #[test]
    fn test_station_join_applies_offset() {
        let locations = file_with("1,Alpha,51.5,-0.12,x\n2,Bravo,40.7,-74.0,y\n3,Charlie,35.0,139.0,z\n");
        let utilization = file_with("6365,0.8\n6366,0.1\n");

        let join = load_stations(locations.path(), utilization.path()).unwrap();
        assert_eq!(join.matched, 2);
        assert_eq!(join.orphaned, 0);
        assert_eq!(join.stations.len(), 3);
        assert_eq!(join.stations[0].utilization, 0.8);
        assert_eq!(join.stations[1].utilization, 0.1);
        assert_eq!(join.stations[2].utilization, 0.0);
    }

    #[test]
    fn test_station_join_without_offset_mismatches() {
        let locations = vec![StationLocation {
            station_id: 7,
            name: "Delta".into(),
            lat: 0.0,
            lng: 0.0,
        }];
        let utilization = vec![StationUtilization {
            station_id: 7,
            utilization: 0.5,
        }];

        let err = join_station_utilization(&locations, &utilization, Path::new("gs_utilization.txt"))
            .unwrap_err();
        assert!(matches!(err, DatasetError::JoinMismatch { .. }));
    }

    #[test]
    fn test_station_location_out_of_range() {
        let file = file_with("1,Nowhere,95.0,0.0\n");
        assert!(matches!(
            load_delimited::<StationLocation>(file.path()),
            Err(DatasetError::MalformedArtifact { line: Some(1), .. })
        ));
    }
}
