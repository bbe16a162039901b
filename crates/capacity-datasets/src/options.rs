//! Enumerated form options and their filename tokens.
//!
//! Every selectable value on the configuration forms maps to exactly one
//! lowercase, filesystem-safe token. Lookups outside the enumerated set are
//! reported as [`DatasetError::UnknownOption`].

use serde::{Serialize, Serializer};
use std::fmt;

use crate::reference::{ALL_TERMINAL_COUNTS, COUNTRY_TERMINALS};
use crate::{DatasetError, Result};

/// Form categories, labelled exactly as they appear on the forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Country,
    NumberOfTerminals,
    PopulationCap,
    RoutingPolicy,
    IncumbentDemand,
    UtDistributionAlgorithm,
    BeamAllocation,
    Scenario,
    TerminalsCap,
    Demand,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Category::Country,
        Category::NumberOfTerminals,
        Category::PopulationCap,
        Category::RoutingPolicy,
        Category::IncumbentDemand,
        Category::UtDistributionAlgorithm,
        Category::BeamAllocation,
        Category::Scenario,
        Category::TerminalsCap,
        Category::Demand,
    ];

    /// The form field name for this category.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Country => "Country",
            Category::NumberOfTerminals => "Number of terminals",
            Category::PopulationCap => "Population cap",
            Category::RoutingPolicy => "Routing policy",
            Category::IncumbentDemand => "Incumbent demand",
            Category::UtDistributionAlgorithm => "User terminal distribution algorithm",
            Category::BeamAllocation => "Beam allocation",
            Category::Scenario => "Scenario",
            Category::TerminalsCap => "Terminals / cap",
            Category::Demand => "Demand",
        }
    }

    /// Display values offered for this category, in form order.
    pub fn choices(&self) -> Vec<String> {
        fn displays<T: OptionSet>() -> Vec<String> {
            T::all().iter().map(|o| o.display().to_string()).collect()
        }

        match self {
            Category::Country => displays::<Country>(),
            Category::NumberOfTerminals => {
                ALL_TERMINAL_COUNTS.iter().map(|n| n.to_string()).collect()
            }
            Category::PopulationCap => displays::<PopulationCap>(),
            Category::RoutingPolicy => displays::<RoutingPolicy>(),
            Category::IncumbentDemand => displays::<IncumbentDemand>(),
            Category::UtDistributionAlgorithm => displays::<UtAlgorithm>(),
            Category::BeamAllocation => displays::<BeamAllocation>(),
            Category::Scenario => displays::<Scenario>(),
            Category::TerminalsCap => displays::<TerminalsCap>(),
            Category::Demand => displays::<DegradationDemand>(),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// A closed set of display values with stable filename tokens.
pub trait OptionSet: Sized + Copy + 'static {
    const CATEGORY: Category;

    fn all() -> &'static [Self];
    fn display(&self) -> &'static str;
    fn token(&self) -> &'static str;

    /// Look up an option by its exact display value. Country names alone
    /// also match regardless of ASCII case.
    fn from_display(value: &str) -> Result<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|o| {
                if Self::CATEGORY == Category::Country {
                    o.display().eq_ignore_ascii_case(value)
                } else {
                    o.display() == value
                }
            })
            .ok_or_else(|| DatasetError::UnknownOption {
                category: Self::CATEGORY,
                value: value.to_string(),
            })
    }
}

macro_rules! option_set {
    (
        $(#[$meta:meta])*
        $name:ident: $category:expr => {
            $($variant:ident => ($display:literal, $token:literal)),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl OptionSet for $name {
            const CATEGORY: Category = $category;

            fn all() -> &'static [Self] {
                &[$($name::$variant),+]
            }

            fn display(&self) -> &'static str {
                match self {
                    $($name::$variant => $display),+
                }
            }

            fn token(&self) -> &'static str {
                match self {
                    $($name::$variant => $token),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.display())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.serialize_str(self.display())
            }
        }
    };
}

option_set! {
    Country: Category::Country => {
        Britain => ("Britain", "britain"),
        Ghana => ("Ghana", "ghana"),
        SouthAfrica => ("South Africa", "southafrica"),
        Tonga => ("Tonga", "tonga"),
        Lithuania => ("Lithuania", "lithuania"),
        Haiti => ("Haiti", "haiti"),
    }
}

option_set! {
    PopulationCap: Category::PopulationCap => {
        OneThousand => ("1000", "1000"),
        TenThousand => ("10000", "10000"),
        HundredThousand => ("100000", "100000"),
    }
}

option_set! {
    RoutingPolicy: Category::RoutingPolicy => {
        MaxFlow => ("Max flow", "max_flow"),
        HotPotato => ("Hot potato", "hot_potato"),
    }
}

option_set! {
    /// Incumbent demand, tokenised as the fraction of peak demand.
    IncumbentDemand: Category::IncumbentDemand => {
        Gbps2 => ("2 Gbps", "0.1"),
        Gbps5 => ("5 Gbps", "0.25"),
        Gbps10 => ("10 Gbps", "0.5"),
        Gbps15 => ("15 Gbps", "0.75"),
        Gbps20 => ("20 Gbps", "1.0"),
    }
}

option_set! {
    /// How user terminals were distributed over cells.
    UtAlgorithm: Category::UtDistributionAlgorithm => {
        PopulationDensity => ("Population density", "population"),
        GcbNoCap => ("GCB No Cap", "waterfill"),
        Gcb1K => ("GCB 1K", "waterfill_variant_1000"),
        Gcb10K => ("GCB 10K", "waterfill_variant_10000"),
        Gcb100K => ("GCB 100K", "waterfill_variant_100000"),
    }
}

option_set! {
    BeamAllocation: Category::BeamAllocation => {
        Priority => ("Priority", "priority"),
        PopulationWaterfill => ("Population waterfill", "popwaterfill"),
    }
}

option_set! {
    Scenario: Category::Scenario => {
        Emergency => ("Emergency", "emergency"),
        Incumbent => ("Incumbent", "incumbent"),
    }
}

option_set! {
    /// Terminal count and population cap pairs swept by the degradation runs.
    TerminalsCap: Category::TerminalsCap => {
        T200000Cap10K => ("200000 / 10K", "200000_10000"),
        T50000Cap100K => ("50000 / 100K", "50000_100000"),
        T10000Cap100K => ("10000 / 100K", "10000_100000"),
        T100000Cap10K => ("100000 / 10K", "100000_10000"),
        T5000Cap100K => ("5000 / 100K", "5000_100000"),
        T1000Cap100K => ("1000 / 100K", "1000_100000"),
        T10000Cap10K => ("10000 / 10K", "10000_10000"),
        T20000Cap100K => ("20000 / 100K", "20000_100000"),
        T500Cap10K => ("500 / 10K", "500_10000"),
        T1000Cap1K => ("1000 / 1K", "1000_1000"),
    }
}

option_set! {
    /// Per-cell demand levels for the capacity degradation runs.
    DegradationDemand: Category::Demand => {
        Mbps8400 => ("8400 Mbps", "0.7"),
        Mbps9600 => ("9600 Mbps", "0.8"),
        Mbps10800 => ("10800 Mbps", "0.9"),
        Mbps12000 => ("12000 Mbps", "1.0"),
    }
}

/// Number of user terminals placed in the simulated country.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(into = "String")]
pub struct TerminalCount(u32);

impl TerminalCount {
    /// Terminal count preselected on every form.
    pub const DEFAULT: TerminalCount = TerminalCount(20000);

    pub fn new(count: u32) -> Result<Self> {
        if ALL_TERMINAL_COUNTS.contains(&count) {
            Ok(Self(count))
        } else {
            Err(DatasetError::UnknownOption {
                category: Category::NumberOfTerminals,
                value: count.to_string(),
            })
        }
    }

    /// Only the canonical decimal spelling of a simulated count matches.
    pub fn from_display(value: &str) -> Result<Self> {
        ALL_TERMINAL_COUNTS
            .iter()
            .find(|count| count.to_string() == value)
            .map(|&count| Self(count))
            .ok_or_else(|| DatasetError::UnknownOption {
                category: Category::NumberOfTerminals,
                value: value.to_string(),
            })
    }

    /// Parse and additionally require the count to have been simulated for
    /// `country`.
    pub fn for_country(country: Country, value: &str) -> Result<Self> {
        let count = Self::from_display(value)?;
        if country.terminal_counts().contains(&count.0) {
            Ok(count)
        } else {
            Err(DatasetError::UnknownOption {
                category: Category::NumberOfTerminals,
                value: format!("{} (not available for {})", value, country),
            })
        }
    }

    pub fn token(&self) -> String {
        self.0.to_string()
    }
}

impl From<TerminalCount> for String {
    fn from(count: TerminalCount) -> Self {
        count.token()
    }
}

impl fmt::Display for TerminalCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Country {
    /// Terminal counts the offline simulation was run with for this country.
    pub fn terminal_counts(&self) -> &'static [u32] {
        COUNTRY_TERMINALS
            .iter()
            .find(|(country, _)| country == self)
            .map(|(_, counts)| *counts)
            .unwrap_or(&[])
    }
}

/// Map a form display value to its filename token.
pub fn normalize(display_value: &str, category: Category) -> Result<String> {
    fn token<T: OptionSet>(value: &str) -> Result<String> {
        T::from_display(value).map(|o| o.token().to_string())
    }

    match category {
        Category::Country => token::<Country>(display_value),
        Category::NumberOfTerminals => TerminalCount::from_display(display_value).map(|t| t.token()),
        Category::PopulationCap => token::<PopulationCap>(display_value),
        Category::RoutingPolicy => token::<RoutingPolicy>(display_value),
        Category::IncumbentDemand => token::<IncumbentDemand>(display_value),
        Category::UtDistributionAlgorithm => token::<UtAlgorithm>(display_value),
        Category::BeamAllocation => token::<BeamAllocation>(display_value),
        Category::Scenario => token::<Scenario>(display_value),
        Category::TerminalsCap => token::<TerminalsCap>(display_value),
        Category::Demand => token::<DegradationDemand>(display_value),
    }
}
