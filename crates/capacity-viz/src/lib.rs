//! Capacity Visualization
//!
//! Turns loaded capacity datasets into standalone deck.gl map documents.
//!
//! # Pipeline
//!
//! ```text
//! records ──maps──▶ DeckScene + Legend ──Renderer──▶ HTML ──emit──▶ static/visualizations/...
//! ```
//!
//! Every fill color is computed per record by [`color`] before the scene is
//! serialized, so the rendered page does no color math of its own.

use std::path::PathBuf;
use thiserror::Error;

use capacity_datasets::DatasetError;

pub mod color;
pub mod deck;
pub mod emit;
pub mod legend;
pub mod maps;
pub mod pipeline;

pub use color::{colorize, normalize, ColorScale, Ramp, Rgba};
pub use deck::{DeckGlRenderer, DeckScene, Layer, Renderer};
pub use legend::Legend;
pub use maps::MapScene;
pub use pipeline::{MapPipeline, RenderedMap};

#[derive(Error, Debug)]
pub enum VizError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    #[error("Cannot create output directory {}: {source}", .path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Scene serialization failed: {0}")]
    Render(#[from] serde_json::Error),
}

impl VizError {
    /// The dataset error behind this failure, if there is one.
    pub fn as_dataset(&self) -> Option<&DatasetError> {
        match self {
            VizError::Dataset(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, VizError>;
