//! Selection to rendered document, one method per dataset kind.
//!
//! Each run resolves the selection, checks that the data file exists,
//! loads and colorizes the records, then emits the document under the
//! static root.

use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use capacity_datasets::loader::{load_delimited, load_heatmap_cells, load_stations};
use capacity_datasets::{
    CapacityCell, CellHeatmapSelection, CellValue, CountryCapacitySelection, DatasetError,
    DatasetKind, GsUtilizationSelection, HeatmapSelection, NationCell, ResolvedArtifact,
};

use crate::deck::{DeckGlRenderer, Renderer};
use crate::emit::emit;
use crate::maps::{self, MapScene};
use crate::Result;

/// Ground-station location table, relative to the static root.
pub const STATIONS_FILE: &str = "data/ground_stations_starlink.csv";

/// Outcome of one successful render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedMap {
    pub kind: DatasetKind,
    /// Data file the map was built from, relative to the kind's data directory.
    pub file_name: String,
    /// Rendered document, relative to the static root.
    pub viz_path: String,
    pub records: usize,
    pub skipped: usize,
}

pub struct MapPipeline {
    static_root: PathBuf,
    legend_dir: Option<PathBuf>,
    renderer: Box<dyn Renderer>,
}

impl MapPipeline {
    pub fn new(static_root: impl Into<PathBuf>) -> Self {
        Self {
            static_root: static_root.into(),
            legend_dir: None,
            renderer: Box::new(DeckGlRenderer),
        }
    }

    pub fn with_legend_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.legend_dir = Some(dir.into());
        self
    }

    pub fn with_renderer(mut self, renderer: Box<dyn Renderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn static_root(&self) -> &Path {
        &self.static_root
    }

    pub fn stations_path(&self) -> PathBuf {
        self.static_root.join(STATIONS_FILE)
    }

    /// Data file for `artifact`, or `ArtifactNotFound` naming it.
    fn existing(&self, artifact: &ResolvedArtifact, path: PathBuf, name: &str) -> Result<PathBuf> {
        if path.is_file() {
            Ok(path)
        } else {
            debug!("{} artifact missing: {:?}", artifact.kind, path);
            Err(DatasetError::ArtifactNotFound(name.to_string()).into())
        }
    }

    fn finish(
        &self,
        artifact: &ResolvedArtifact,
        map: MapScene,
        records: usize,
        skipped: usize,
    ) -> Result<RenderedMap> {
        let fragment = map.legend.fragment(self.legend_dir.as_deref())?;
        let viz_path = emit(
            self.renderer.as_ref(),
            &map.scene,
            &fragment,
            &self.static_root,
            &artifact.output_path,
        )?;
        info!(
            "Rendered {} map {} ({} records, {} skipped)",
            artifact.kind, viz_path, records, skipped
        );

        Ok(RenderedMap {
            kind: artifact.kind,
            file_name: artifact.file_name.clone(),
            viz_path,
            records,
            skipped,
        })
    }

    pub fn heatmap(&self, selection: &HeatmapSelection) -> Result<RenderedMap> {
        let artifact = selection.resolve()?;
        let path = self.existing(&artifact, artifact.data_path(&self.static_root), &artifact.file_name)?;
        let cells = load_heatmap_cells(&path)?;

        let title = format!(
            "{} available capacity ({} terminals)",
            selection.country, selection.terminals
        );
        let map = maps::heatmap_scene(&cells.records, selection.country.viewport(), &title)?;
        self.finish(&artifact, map, cells.len(), cells.skipped)
    }

    pub fn country_capacity(&self, selection: &CountryCapacitySelection) -> Result<RenderedMap> {
        let artifact = selection.resolve()?;
        let path = self.existing(&artifact, artifact.data_path(&self.static_root), &artifact.file_name)?;
        let cells = load_delimited::<CapacityCell>(&path)?;

        let title = format!("{} cell capacity ({} terminals)", selection.country, selection.terminals);
        let map = maps::capacity_scene(&cells.records, selection.country.viewport(), &title)?;
        self.finish(&artifact, map, cells.len(), cells.skipped)
    }

    /// The utilization file is checked before the location table, so a
    /// missing configuration reports its own filename.
    pub fn gs_utilization(&self, selection: &GsUtilizationSelection) -> Result<RenderedMap> {
        let artifact = selection.resolve()?;
        let util_path = self.existing(&artifact, artifact.data_path(&self.static_root), &artifact.file_name)?;

        let join = load_stations(self.stations_path(), &util_path)?;
        debug!(
            "Joined {} of {} stations ({} orphaned utilization rows)",
            join.matched,
            join.stations.len(),
            join.orphaned
        );

        let title = format!("{} ground station utilization ({})", selection.country, selection.scenario);
        let map = maps::stations_scene(&join.stations, &title)?;
        self.finish(&artifact, map, join.stations.len(), join.skipped)
    }

    pub fn cell_heatmap(&self, selection: &CellHeatmapSelection) -> Result<RenderedMap> {
        let artifact = selection.resolve()?;
        let values_path =
            self.existing(&artifact, artifact.data_path(&self.static_root), &artifact.file_name)?;
        let (nation_path, nation_name) = match (artifact.companion_path(&self.static_root), &artifact.companion) {
            (Some(path), Some(name)) => (path, name.as_str()),
            _ => return Err(DatasetError::ArtifactNotFound(artifact.file_name.clone()).into()),
        };
        let nation_path = self.existing(&artifact, nation_path, nation_name)?;

        let values = load_delimited::<CellValue>(&values_path)?;
        let nation = load_delimited::<NationCell>(&nation_path)?;
        if !nation.records.iter().any(NationCell::has_terminals) {
            return Err(DatasetError::EmptyArtifact { path: nation_path }.into());
        }

        let title = format!(
            "{} capacity degradation ({}, {})",
            selection.country, selection.terminals_cap, selection.demand
        );
        let map = maps::degradation_scene(
            &values.records,
            &nation.records,
            selection.country.viewport(),
            &title,
        )?;
        self.finish(
            &artifact,
            map,
            values.len(),
            values.skipped + nation.skipped,
        )
    }

    /// Dispatch on a resolved selection of any kind.
    pub fn render(&self, selection: &Selection) -> Result<RenderedMap> {
        match selection {
            Selection::Heatmap(s) => self.heatmap(s),
            Selection::CountryCapacity(s) => self.country_capacity(s),
            Selection::GsUtilization(s) => self.gs_utilization(s),
            Selection::CellHeatmap(s) => self.cell_heatmap(s),
        }
    }
}

/// A selection for any of the four dataset kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Selection {
    Heatmap(HeatmapSelection),
    CountryCapacity(CountryCapacitySelection),
    GsUtilization(GsUtilizationSelection),
    CellHeatmap(CellHeatmapSelection),
}

impl Selection {
    pub fn kind(&self) -> DatasetKind {
        match self {
            Selection::Heatmap(_) => DatasetKind::Heatmap,
            Selection::CountryCapacity(_) => DatasetKind::CountryCapacity,
            Selection::GsUtilization(_) => DatasetKind::GsUtilization,
            Selection::CellHeatmap(_) => DatasetKind::CellHeatmap,
        }
    }

    pub fn resolve(&self) -> capacity_datasets::Result<ResolvedArtifact> {
        match self {
            Selection::Heatmap(s) => s.resolve(),
            Selection::CountryCapacity(s) => s.resolve(),
            Selection::GsUtilization(s) => s.resolve(),
            Selection::CellHeatmap(s) => s.resolve(),
        }
    }

    /// Parse the form fields `kind` needs.
    pub fn from_form(kind: DatasetKind, form: &capacity_datasets::resolver::FormValues) -> capacity_datasets::Result<Self> {
        Ok(match kind {
            DatasetKind::Heatmap => Selection::Heatmap(HeatmapSelection::from_form(form)?),
            DatasetKind::CountryCapacity => {
                Selection::CountryCapacity(CountryCapacitySelection::from_form(form)?)
            }
            DatasetKind::GsUtilization => {
                Selection::GsUtilization(GsUtilizationSelection::from_form(form)?)
            }
            DatasetKind::CellHeatmap => Selection::CellHeatmap(CellHeatmapSelection::from_form(form)?),
        })
    }

    pub fn default_for(kind: DatasetKind) -> Self {
        match kind {
            DatasetKind::Heatmap => Selection::Heatmap(HeatmapSelection::default()),
            DatasetKind::CountryCapacity => Selection::CountryCapacity(CountryCapacitySelection::default()),
            DatasetKind::GsUtilization => Selection::GsUtilization(GsUtilizationSelection::default()),
            DatasetKind::CellHeatmap => Selection::CellHeatmap(CellHeatmapSelection::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::VizError;
    use std::fs;
    use tempfile::TempDir;

    const CELL_A: &str = "8928308280fffff";
    const CELL_B: &str = "8928308280bffff";

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn not_found_name(err: VizError) -> String {
        match err {
            VizError::Dataset(DatasetError::ArtifactNotFound(name)) => name,
            other => panic!("expected ArtifactNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_britain_heatmap_end_to_end() {
        let root = TempDir::new().unwrap();
        write(
            root.path(),
            "h3_data/britain_20000_10000_waterfill_max_flow_0.75.json",
            &format!(
                r#"[{{"hex": "{CELL_A}", "value": 0.42}}, {{"hex": "{CELL_B}", "is_nation": true}}]"#
            ),
        );

        let pipeline = MapPipeline::new(root.path());
        let rendered = pipeline.heatmap(&HeatmapSelection::default()).unwrap();
        assert_eq!(
            rendered.viz_path,
            "visualizations/britain_20000_10000_waterfill_max_flow_0.75.html"
        );
        assert_eq!(rendered.records, 2);

        let html = fs::read_to_string(root.path().join(&rendered.viz_path)).unwrap();
        assert!(html.contains(CELL_A));
        assert!(html.contains("id=\"color-scale\""));
    }

    #[test]
    fn test_missing_artifact_names_file() {
        let root = TempDir::new().unwrap();
        let err = MapPipeline::new(root.path())
            .country_capacity(&CountryCapacitySelection::default())
            .unwrap_err();
        assert_eq!(
            not_found_name(err),
            "britain_0_20000_population_priority_cell_capacities.txt"
        );
        assert!(!root.path().join("visualizations").exists());
    }

    #[test]
    fn test_gs_utilization_joins_offset_ids() {
        let root = TempDir::new().unwrap();
        write(
            root.path(),
            STATIONS_FILE,
            "0,Gravelines,50.98,2.12\n1,Goonhilly,50.05,-5.18\n",
        );
        let artifact = GsUtilizationSelection::default().resolve().unwrap();
        write(
            root.path(),
            &format!("utilization_data/{}", artifact.file_name),
            "6364,0.9\n6365,0.1\n",
        );

        let rendered = MapPipeline::new(root.path())
            .gs_utilization(&GsUtilizationSelection::default())
            .unwrap();
        assert_eq!(rendered.records, 2);
        let html = fs::read_to_string(root.path().join(&rendered.viz_path)).unwrap();
        assert!(html.contains("Goonhilly"));
        assert!(html.contains("0.900"));
    }

    #[test]
    fn test_gs_utilization_checks_utilization_first() {
        let root = TempDir::new().unwrap();
        let err = MapPipeline::new(root.path())
            .gs_utilization(&GsUtilizationSelection::default())
            .unwrap_err();
        assert!(not_found_name(err).ends_with("gs_utilization.txt"));
    }

    #[test]
    fn test_cell_heatmap_needs_companion() {
        let root = TempDir::new().unwrap();
        let artifact = CellHeatmapSelection::default().resolve().unwrap();
        write(
            root.path(),
            &format!("cell_heatmap_data/{}", artifact.file_name),
            &format!("{CELL_A},0.85\n"),
        );
        let pipeline = MapPipeline::new(root.path());
        let err = pipeline.cell_heatmap(&CellHeatmapSelection::default()).unwrap_err();
        assert_eq!(not_found_name(err), "cells_britain_200000_10000.txt");

        write(
            root.path(),
            "cell_heatmap_data/cells_britain_200000_10000.txt",
            &format!("{CELL_B},12\n"),
        );
        let rendered = pipeline.cell_heatmap(&CellHeatmapSelection::default()).unwrap();
        assert_eq!(
            rendered.viz_path,
            "visualizations/cell_heatmaps/britain_200000_10000_0.7_cell_heatmap.html"
        );
        let html = fs::read_to_string(root.path().join(&rendered.viz_path)).unwrap();
        assert!(html.contains("<span>0.8</span><span>0.9</span><span>1.0</span>"));
    }

    #[test]
    fn test_cell_heatmap_without_populated_nation_cells_is_empty() {
        let root = TempDir::new().unwrap();
        let artifact = CellHeatmapSelection::default().resolve().unwrap();
        write(
            root.path(),
            &format!("cell_heatmap_data/{}", artifact.file_name),
            &format!("{CELL_A},0.85\n"),
        );
        write(
            root.path(),
            "cell_heatmap_data/cells_britain_200000_10000.txt",
            &format!("{CELL_A},0\n{CELL_B},0\n"),
        );

        let err = MapPipeline::new(root.path())
            .cell_heatmap(&CellHeatmapSelection::default())
            .unwrap_err();
        match err {
            VizError::Dataset(DatasetError::EmptyArtifact { path }) => {
                assert!(path.ends_with("cells_britain_200000_10000.txt"));
            }
            other => panic!("expected EmptyArtifact, got {other:?}"),
        }
        assert!(!root.path().join("visualizations").exists());
    }

    #[test]
    fn test_legend_override_used() {
        let root = TempDir::new().unwrap();
        let legends = TempDir::new().unwrap();
        fs::write(
            legends.path().join("country_capacity_color_scale.html"),
            "<div id=\"custom\"><span>0.0</span><span>0.5</span><span>1.0</span></div>",
        )
        .unwrap();
        let artifact = CountryCapacitySelection::default().resolve().unwrap();
        write(
            root.path(),
            &format!("country_capacity_data/{}", artifact.file_name),
            &format!("{CELL_A},10\n{CELL_B},30\n"),
        );

        let rendered = MapPipeline::new(root.path())
            .with_legend_dir(legends.path())
            .render(&Selection::default_for(DatasetKind::CountryCapacity))
            .unwrap();
        let html = fs::read_to_string(root.path().join(&rendered.viz_path)).unwrap();
        assert!(html.contains("<div id=\"custom\"><span>10</span><span>20</span><span>30</span></div></body>"));
    }

    struct TitleOnly;

    impl Renderer for TitleOnly {
        fn render(&self, scene: &crate::DeckScene) -> Result<String> {
            Ok(format!("<body>{}</body>", scene.title))
        }
    }

    #[test]
    fn test_custom_renderer() {
        let root = TempDir::new().unwrap();
        let artifact = CountryCapacitySelection::default().resolve().unwrap();
        write(
            root.path(),
            &format!("country_capacity_data/{}", artifact.file_name),
            &format!("{CELL_A},10\n"),
        );

        let rendered = MapPipeline::new(root.path())
            .with_renderer(Box::new(TitleOnly))
            .country_capacity(&CountryCapacitySelection::default())
            .unwrap();
        let html = fs::read_to_string(root.path().join(&rendered.viz_path)).unwrap();
        assert!(html.starts_with("<body>Britain cell capacity (20000 terminals)<div id=\"color-scale\""));
        assert!(html.ends_with("</body>"));
    }

    #[test]
    fn test_selection_kind_round_trip() {
        for kind in DatasetKind::ALL {
            let selection = Selection::default_for(kind);
            assert_eq!(selection.kind(), kind);
            assert_eq!(selection.resolve().unwrap().kind, kind);
        }
    }
}
