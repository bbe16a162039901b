//! Map Pre-generation
//!
//! Sweeps the full option space of each dataset kind and renders every
//! configuration whose data file exists, so the gateway can serve maps
//! without rendering on first request.
//!
//! | Kind | Sweep |
//! |------|-------|
//! | heatmap | country × terminals × population cap × routing × demand |
//! | country-capacity | country × terminals × UT algorithm × beam allocation |
//! | gs-utilization | country × terminals × population cap × routing × scenario |
//! | cell-heatmap | country × terminals/cap × demand |
//!
//! Missing data files are counted as skipped. Any other failure is logged
//! and counted; a sweep never stops early.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use capacity_datasets::options::{
    BeamAllocation, Country, DegradationDemand, IncumbentDemand, OptionSet, PopulationCap,
    RoutingPolicy, Scenario, TerminalCount, TerminalsCap, UtAlgorithm,
};
use capacity_datasets::{
    CellHeatmapSelection, CountryCapacitySelection, DatasetError, DatasetKind,
    GsUtilizationSelection, HeatmapSelection,
};
use capacity_viz::pipeline::Selection;
use capacity_viz::{MapPipeline, VizError};

/// Counts for one kind's sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepCounts {
    pub generated: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl SweepCounts {
    pub fn total(&self) -> usize {
        self.generated + self.skipped + self.failed
    }

    fn add(&mut self, other: SweepCounts) {
        self.generated += other.generated;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    pub generated_at: DateTime<Utc>,
    pub by_kind: BTreeMap<String, SweepCounts>,
    pub totals: SweepCounts,
}

fn terminal_counts(country: Country) -> impl Iterator<Item = TerminalCount> {
    country
        .terminal_counts()
        .iter()
        .filter_map(|&count| TerminalCount::new(count).ok())
}

/// Every selection the option tables allow for `kind`.
pub fn selections(kind: DatasetKind) -> Vec<Selection> {
    let mut out = Vec::new();
    for &country in Country::all() {
        match kind {
            DatasetKind::Heatmap => {
                for terminals in terminal_counts(country) {
                    for &population_cap in PopulationCap::all() {
                        for &routing_policy in RoutingPolicy::all() {
                            for &incumbent_demand in IncumbentDemand::all() {
                                out.push(Selection::Heatmap(HeatmapSelection {
                                    country,
                                    terminals,
                                    population_cap,
                                    routing_policy,
                                    incumbent_demand,
                                }));
                            }
                        }
                    }
                }
            }
            DatasetKind::CountryCapacity => {
                for terminals in terminal_counts(country) {
                    for &ut_algorithm in UtAlgorithm::all() {
                        for &beam_allocation in BeamAllocation::all() {
                            out.push(Selection::CountryCapacity(CountryCapacitySelection {
                                country,
                                terminals,
                                ut_algorithm,
                                beam_allocation,
                            }));
                        }
                    }
                }
            }
            DatasetKind::GsUtilization => {
                for terminals in terminal_counts(country) {
                    for &population_cap in PopulationCap::all() {
                        for &routing_policy in RoutingPolicy::all() {
                            for &scenario in Scenario::all() {
                                out.push(Selection::GsUtilization(GsUtilizationSelection {
                                    country,
                                    terminals,
                                    population_cap,
                                    routing_policy,
                                    scenario,
                                }));
                            }
                        }
                    }
                }
            }
            DatasetKind::CellHeatmap => {
                for &terminals_cap in TerminalsCap::all() {
                    for &demand in DegradationDemand::all() {
                        out.push(Selection::CellHeatmap(CellHeatmapSelection {
                            country,
                            terminals_cap,
                            demand,
                        }));
                    }
                }
            }
        }
    }
    out
}

/// Render every configuration of `kind` that has data.
pub fn sweep(pipeline: &MapPipeline, kind: DatasetKind) -> SweepCounts {
    let all = selections(kind);
    info!("Sweeping {} {} configurations", all.len(), kind);

    let mut counts = SweepCounts::default();
    for selection in &all {
        match pipeline.render(selection) {
            Ok(rendered) => {
                debug!("Generated {}", rendered.viz_path);
                counts.generated += 1;
            }
            Err(VizError::Dataset(DatasetError::ArtifactNotFound(name))) => {
                debug!("Skipped (no data file): {}", name);
                counts.skipped += 1;
            }
            Err(VizError::Dataset(DatasetError::EmptyArtifact { path })) => {
                debug!("Skipped (no usable records): {}", path.display());
                counts.skipped += 1;
            }
            Err(e) => {
                warn!("Failed {} {:?}: {}", kind, selection, e);
                counts.failed += 1;
            }
        }
    }

    info!(
        "{}: {} generated, {} skipped, {} failed",
        kind, counts.generated, counts.skipped, counts.failed
    );
    counts
}

/// Sweep each kind in turn.
pub fn generate(pipeline: &MapPipeline, kinds: &[DatasetKind]) -> GenerationReport {
    let mut by_kind = BTreeMap::new();
    let mut totals = SweepCounts::default();
    for &kind in kinds {
        let counts = sweep(pipeline, kind);
        totals.add(counts);
        by_kind.insert(kind.to_string(), counts);
    }

    GenerationReport {
        generated_at: Utc::now(),
        by_kind,
        totals,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_selection_counts() {
        let countries = Country::all().len();
        assert_eq!(
            selections(DatasetKind::CellHeatmap).len(),
            countries * TerminalsCap::all().len() * DegradationDemand::all().len()
        );

        let britain_terminals = Country::Britain.terminal_counts().len();
        let britain_capacity = selections(DatasetKind::CountryCapacity)
            .into_iter()
            .filter(|s| matches!(s, Selection::CountryCapacity(c) if c.country == Country::Britain))
            .count();
        assert_eq!(
            britain_capacity,
            britain_terminals * UtAlgorithm::all().len() * BeamAllocation::all().len()
        );
    }

    #[test]
    fn test_every_selection_resolves() {
        for kind in DatasetKind::ALL {
            for selection in selections(kind) {
                assert!(selection.resolve().is_ok(), "{selection:?}");
            }
        }
    }

    #[test]
    fn test_sweep_counts_generated_skipped_failed() {
        let root = TempDir::new().unwrap();
        let good = CountryCapacitySelection::default().resolve().unwrap();
        write(
            root.path(),
            &format!("country_capacity_data/{}", good.file_name),
            "8928308280fffff,10\n8928308280bffff,20\n",
        );
        let bad = Selection::CountryCapacity(CountryCapacitySelection {
            beam_allocation: BeamAllocation::PopulationWaterfill,
            ..CountryCapacitySelection::default()
        })
        .resolve()
        .unwrap();
        write(
            root.path(),
            &format!("country_capacity_data/{}", bad.file_name),
            "8928308280fffff,not-a-number\n",
        );

        let pipeline = MapPipeline::new(root.path());
        let report = generate(&pipeline, &[DatasetKind::CountryCapacity]);
        let counts = report.by_kind["country-capacity"];
        assert_eq!(counts.generated, 1);
        assert_eq!(counts.failed, 1);
        assert_eq!(counts.total(), selections(DatasetKind::CountryCapacity).len());
        assert_eq!(report.totals, counts);
        assert!(root.path().join(good.output_path).is_file());
    }

    #[test]
    fn test_sweep_skips_empty_artifacts() {
        let root = TempDir::new().unwrap();

        let no_records = CellHeatmapSelection::default().resolve().unwrap();
        write(
            root.path(),
            &format!("cell_heatmap_data/{}", no_records.file_name),
            "\nnot,a,two,field,line\n",
        );

        let other_cap = TerminalsCap::all()
            .iter()
            .copied()
            .find(|cap| *cap != CellHeatmapSelection::default().terminals_cap)
            .unwrap();
        let unpopulated = CellHeatmapSelection {
            terminals_cap: other_cap,
            ..CellHeatmapSelection::default()
        }
        .resolve()
        .unwrap();
        write(
            root.path(),
            &format!("cell_heatmap_data/{}", unpopulated.file_name),
            "8928308280fffff,0.85\n",
        );
        write(
            root.path(),
            &format!("cell_heatmap_data/{}", unpopulated.companion.clone().unwrap()),
            "8928308280fffff,0\n",
        );

        let pipeline = MapPipeline::new(root.path());
        let counts = sweep(&pipeline, DatasetKind::CellHeatmap);
        assert_eq!(counts.generated, 0);
        assert_eq!(counts.failed, 0);
        assert_eq!(counts.skipped, selections(DatasetKind::CellHeatmap).len());
    }
}
