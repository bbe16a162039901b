//! Capacity Datasets
//!
//! Resolves user-facing configuration selections to the precomputed
//! satellite-network capacity files produced by the offline simulation,
//! and loads those files into typed record tables.
//!
//! # Pipeline
//!
//! ```text
//! form values ──normalize──▶ tokens ──resolve──▶ ResolvedArtifact ──load──▶ records
//! ```
//!
//! | Dataset kind | Format | Records |
//! |--------------|--------|---------|
//! | Heatmap | JSON array | [`HeatmapCell`] |
//! | Country capacity | `hex,capacity` | [`CapacityCell`] |
//! | Cell heatmap | `hex,value` + `hex,terminals` | [`CellValue`], [`NationCell`] |
//! | GS utilization | `id,utilization` + `id,name,lat,lng` | [`StationRecord`] |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub mod loader;
pub mod options;
pub mod reference;
pub mod resolver;

pub use loader::{
    CapacityCell, CellValue, HeatmapCell, Loaded, NationCell, StationLocation, StationRecord,
    StationUtilization, StationsJoin, STATION_ID_OFFSET,
};
pub use options::{normalize, Category};
pub use reference::{Viewport, GLOBAL_VIEWPORT};
pub use resolver::{
    resolve, CellHeatmapSelection, CountryCapacitySelection, GsUtilizationSelection,
    HeatmapSelection, ResolvedArtifact,
};

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Unknown option for {category}: {value:?}")]
    UnknownOption { category: Category, value: String },
    #[error("{kind} expects {expected} filename tokens, got {got}")]
    InvalidTokens {
        kind: DatasetKind,
        expected: usize,
        got: usize,
    },
    #[error("Unsafe filename token: {0:?}")]
    UnsafeToken(String),
    #[error("Configuration not available: {0}")]
    ArtifactNotFound(String),
    #[error("Malformed artifact {}{}: {reason}", .path.display(), .line.map(|l| format!(" (line {l})")).unwrap_or_default())]
    MalformedArtifact {
        path: PathBuf,
        line: Option<usize>,
        reason: String,
    },
    #[error("No usable records in {}", .path.display())]
    EmptyArtifact { path: PathBuf },
    #[error("No station IDs in {} matched the location table after offset adjustment", .path.display())]
    JoinMismatch { path: PathBuf },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DatasetError>;

/// The families of precomputed artifacts the service knows how to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DatasetKind {
    Heatmap,
    CountryCapacity,
    GsUtilization,
    CellHeatmap,
}

impl DatasetKind {
    pub const ALL: [DatasetKind; 4] = [
        DatasetKind::Heatmap,
        DatasetKind::CountryCapacity,
        DatasetKind::GsUtilization,
        DatasetKind::CellHeatmap,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetKind::Heatmap => "heatmap",
            DatasetKind::CountryCapacity => "country-capacity",
            DatasetKind::GsUtilization => "gs-utilization",
            DatasetKind::CellHeatmap => "cell-heatmap",
        }
    }

    /// Directory under the static root holding this kind's input files.
    pub fn data_dir(&self) -> &'static str {
        match self {
            DatasetKind::Heatmap => "h3_data",
            DatasetKind::CountryCapacity => "country_capacity_data",
            DatasetKind::GsUtilization => "utilization_data",
            DatasetKind::CellHeatmap => "cell_heatmap_data",
        }
    }

    /// Directory under the static root receiving this kind's rendered maps.
    pub fn output_dir(&self) -> &'static str {
        match self {
            DatasetKind::Heatmap => "visualizations",
            DatasetKind::CountryCapacity => "visualizations/country_capacity",
            DatasetKind::GsUtilization => "visualizations/gs_utilizations",
            DatasetKind::CellHeatmap => "visualizations/cell_heatmaps",
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_dirs_are_distinct() {
        for a in DatasetKind::ALL {
            for b in DatasetKind::ALL {
                if a != b {
                    assert_ne!(a.data_dir(), b.data_dir());
                    assert_ne!(a.output_dir(), b.output_dir());
                }
            }
        }
    }

    #[test]
    fn test_malformed_message_includes_line() {
        let err = DatasetError::MalformedArtifact {
            path: PathBuf::from("cells.txt"),
            line: Some(7),
            reason: "bad number".into(),
        };
        assert_eq!(err.to_string(), "Malformed artifact cells.txt (line 7): bad number");
    }

    #[test]
    fn test_empty_message_names_file() {
        let err = DatasetError::EmptyArtifact {
            path: PathBuf::from("cells_tonga_500_10000.txt"),
        };
        assert_eq!(err.to_string(), "No usable records in cells_tonga_500_10000.txt");
    }
}
