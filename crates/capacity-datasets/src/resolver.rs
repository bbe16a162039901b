//! Filename resolution: normalized tokens → data file and output document.
//!
//! Pure path construction. Nothing here touches the filesystem; callers
//! check whether the resolved file exists.

use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::options::{
    BeamAllocation, Category, Country, DegradationDemand, IncumbentDemand, OptionSet,
    PopulationCap, RoutingPolicy, Scenario, TerminalCount, TerminalsCap, UtAlgorithm,
};
use crate::{DatasetError, DatasetKind, Result};

/// Run prefix shared by every ground-station utilization directory.
const GS_RUN_PREFIX: &str = "starlink_current_5shells_isls_three_ground_stations_starlink_cells";

/// A data file (and the map document it renders to) for one configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedArtifact {
    pub kind: DatasetKind,
    /// Path of the data file relative to the kind's data directory.
    pub file_name: String,
    /// Second input file, relative to the same directory (cell heatmaps only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub companion: Option<String>,
    /// Deterministic name of the configuration, used for the output document.
    pub config_name: String,
    /// Output document path relative to the static root, `/`-separated.
    pub output_path: String,
}

impl ResolvedArtifact {
    pub fn data_path(&self, static_root: &Path) -> PathBuf {
        static_root.join(self.kind.data_dir()).join(&self.file_name)
    }

    pub fn companion_path(&self, static_root: &Path) -> Option<PathBuf> {
        self.companion
            .as_ref()
            .map(|name| static_root.join(self.kind.data_dir()).join(name))
    }

    pub fn output_file(&self, static_root: &Path) -> PathBuf {
        static_root.join(&self.output_path)
    }
}

/// Number of tokens each kind's template consumes.
pub fn token_arity(kind: DatasetKind) -> usize {
    match kind {
        DatasetKind::Heatmap => 5,
        DatasetKind::CountryCapacity => 4,
        DatasetKind::GsUtilization => 5,
        DatasetKind::CellHeatmap => 3,
    }
}

/// Compose the data file path for `kind` from its ordered tokens.
///
/// | Kind | Token order |
/// |------|-------------|
/// | heatmap | country, terminals, population cap, routing, demand |
/// | country-capacity | country, terminals, UT algorithm, beam allocation |
/// | gs-utilization | country, terminals, population cap, scenario, routing |
/// | cell-heatmap | country, terminals/cap, demand |
pub fn resolve<S: AsRef<str>>(kind: DatasetKind, tokens: &[S]) -> Result<ResolvedArtifact> {
    let expected = token_arity(kind);
    if tokens.len() != expected {
        return Err(DatasetError::InvalidTokens {
            kind,
            expected,
            got: tokens.len(),
        });
    }

    let t: Vec<&str> = tokens.iter().map(AsRef::as_ref).collect();
    if let Some(bad) = t.iter().find(|token| !is_safe_token(token)) {
        return Err(DatasetError::UnsafeToken(bad.to_string()));
    }

    let (file_name, companion, config_name) = match kind {
        DatasetKind::Heatmap => {
            let file = format!("{}_{}_{}_waterfill_{}_{}.json", t[0], t[1], t[2], t[3], t[4]);
            let stem = strip_extension(&file).to_string();
            (file, None, stem)
        }
        DatasetKind::CountryCapacity => {
            let file = format!("{}_0_{}_{}_{}_cell_capacities.txt", t[0], t[1], t[2], t[3]);
            let stem = strip_extension(&file).to_string();
            (file, None, stem)
        }
        DatasetKind::GsUtilization => {
            let run = format!("{}_0_{}_waterfill_variant_{}", t[0], t[1], t[2]);
            let file = format!(
                "{GS_RUN_PREFIX}_{run}_waterfill/{}/{}/gs_utilization.txt",
                t[3], t[4]
            );
            (file, None, format!("{run}_{}_{}_gs_utilization", t[3], t[4]))
        }
        DatasetKind::CellHeatmap => {
            let config = format!("{}_{}_{}", t[0], t[1], t[2]);
            let file = format!("{config}_cell_values.txt");
            let nation = format!("cells_{}_{}.txt", t[0], t[1]);
            (file, Some(nation), format!("{config}_cell_heatmap"))
        }
    };

    let config_name = config_name.to_lowercase();
    let output_path = format!("{}/{}.html", kind.output_dir(), config_name);

    Ok(ResolvedArtifact {
        kind,
        file_name,
        companion,
        config_name,
        output_path,
    })
}

/// Drop only the final extension, so `x_0.75.json` keeps its `0.75`.
fn strip_extension(file_name: &str) -> &str {
    file_name
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(file_name)
}

fn is_safe_token(token: &str) -> bool {
    !token.is_empty()
        && token != "."
        && token != ".."
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-')
}

// ========== Selections ==========

/// Form values keyed by category label.
pub type FormValues = HashMap<String, String>;

fn field<'a>(form: &'a FormValues, category: Category) -> Result<&'a str> {
    form.get(category.label())
        .map(String::as_str)
        .ok_or_else(|| DatasetError::UnknownOption {
            category,
            value: String::new(),
        })
}

fn option<T: OptionSet>(form: &FormValues) -> Result<T> {
    T::from_display(field(form, T::CATEGORY)?)
}

fn terminals(form: &FormValues, country: Country) -> Result<TerminalCount> {
    TerminalCount::for_country(country, field(form, Category::NumberOfTerminals)?)
}

/// Per-cell available capacity heatmap (beam allocation fixed to waterfill).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HeatmapSelection {
    pub country: Country,
    pub terminals: TerminalCount,
    pub population_cap: PopulationCap,
    pub routing_policy: RoutingPolicy,
    pub incumbent_demand: IncumbentDemand,
}

impl HeatmapSelection {
    pub fn from_form(form: &FormValues) -> Result<Self> {
        let country = option(form)?;
        Ok(Self {
            country,
            terminals: terminals(form, country)?,
            population_cap: option(form)?,
            routing_policy: option(form)?,
            incumbent_demand: option(form)?,
        })
    }

    pub fn tokens(&self) -> Vec<String> {
        vec![
            self.country.token().to_string(),
            self.terminals.token(),
            self.population_cap.token().to_string(),
            self.routing_policy.token().to_string(),
            self.incumbent_demand.token().to_string(),
        ]
    }

    pub fn resolve(&self) -> Result<ResolvedArtifact> {
        resolve(DatasetKind::Heatmap, &self.tokens())
    }
}

impl Default for HeatmapSelection {
    fn default() -> Self {
        Self {
            country: Country::Britain,
            terminals: TerminalCount::DEFAULT,
            population_cap: PopulationCap::TenThousand,
            routing_policy: RoutingPolicy::MaxFlow,
            incumbent_demand: IncumbentDemand::Gbps15,
        }
    }
}

/// Per-cell capacity for a terminal distribution and beam allocation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CountryCapacitySelection {
    pub country: Country,
    pub terminals: TerminalCount,
    pub ut_algorithm: UtAlgorithm,
    pub beam_allocation: BeamAllocation,
}

impl CountryCapacitySelection {
    pub fn from_form(form: &FormValues) -> Result<Self> {
        let country = option(form)?;
        Ok(Self {
            country,
            terminals: terminals(form, country)?,
            ut_algorithm: option(form)?,
            beam_allocation: option(form)?,
        })
    }

    pub fn tokens(&self) -> Vec<String> {
        vec![
            self.country.token().to_string(),
            self.terminals.token(),
            self.ut_algorithm.token().to_string(),
            self.beam_allocation.token().to_string(),
        ]
    }

    pub fn resolve(&self) -> Result<ResolvedArtifact> {
        resolve(DatasetKind::CountryCapacity, &self.tokens())
    }
}

impl Default for CountryCapacitySelection {
    fn default() -> Self {
        Self {
            country: Country::Britain,
            terminals: TerminalCount::DEFAULT,
            ut_algorithm: UtAlgorithm::PopulationDensity,
            beam_allocation: BeamAllocation::Priority,
        }
    }
}

/// Ground-station utilization for one routing policy and scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GsUtilizationSelection {
    pub country: Country,
    pub terminals: TerminalCount,
    pub population_cap: PopulationCap,
    pub routing_policy: RoutingPolicy,
    pub scenario: Scenario,
}

impl GsUtilizationSelection {
    pub fn from_form(form: &FormValues) -> Result<Self> {
        let country = option(form)?;
        Ok(Self {
            country,
            terminals: terminals(form, country)?,
            population_cap: option(form)?,
            routing_policy: option(form)?,
            scenario: option(form)?,
        })
    }

    pub fn tokens(&self) -> Vec<String> {
        vec![
            self.country.token().to_string(),
            self.terminals.token(),
            self.population_cap.token().to_string(),
            self.scenario.token().to_string(),
            self.routing_policy.token().to_string(),
        ]
    }

    pub fn resolve(&self) -> Result<ResolvedArtifact> {
        resolve(DatasetKind::GsUtilization, &self.tokens())
    }
}

impl Default for GsUtilizationSelection {
    fn default() -> Self {
        Self {
            country: Country::Britain,
            terminals: TerminalCount::DEFAULT,
            population_cap: PopulationCap::TenThousand,
            routing_policy: RoutingPolicy::MaxFlow,
            scenario: Scenario::Emergency,
        }
    }
}

/// Capacity degradation under rising per-cell demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CellHeatmapSelection {
    pub country: Country,
    pub terminals_cap: TerminalsCap,
    pub demand: DegradationDemand,
}

impl CellHeatmapSelection {
    pub fn from_form(form: &FormValues) -> Result<Self> {
        Ok(Self {
            country: option(form)?,
            terminals_cap: option(form)?,
            demand: option(form)?,
        })
    }

    pub fn tokens(&self) -> Vec<String> {
        vec![
            self.country.token().to_string(),
            self.terminals_cap.token().to_string(),
            self.demand.token().to_string(),
        ]
    }

    pub fn resolve(&self) -> Result<ResolvedArtifact> {
        resolve(DatasetKind::CellHeatmap, &self.tokens())
    }
}

impl Default for CellHeatmapSelection {
    fn default() -> Self {
        Self {
            country: Country::Britain,
            terminals_cap: TerminalsCap::T200000Cap10K,
            demand: DegradationDemand::Mbps8400,
        }
    }
}
