//! Static reference tables: map viewports and simulated terminal counts.

use serde::Serialize;

use crate::options::Country;

/// Initial camera for a rendered map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Viewport {
    pub latitude: f64,
    pub longitude: f64,
    pub zoom: f64,
}

/// Whole-network view used for ground-station maps.
pub const GLOBAL_VIEWPORT: Viewport = Viewport {
    latitude: 30.0,
    longitude: 0.0,
    zoom: 1.5,
};

const COUNTRY_VIEWPORTS: [(Country, Viewport); 6] = [
    (Country::Britain, Viewport { latitude: 55.3781, longitude: -3.4360, zoom: 5.0 }),
    (Country::Ghana, Viewport { latitude: 7.9465, longitude: -1.0232, zoom: 6.0 }),
    (Country::SouthAfrica, Viewport { latitude: -30.5595, longitude: 22.9375, zoom: 5.0 }),
    (Country::Tonga, Viewport { latitude: -21.1789, longitude: -175.1982, zoom: 7.0 }),
    (Country::Lithuania, Viewport { latitude: 55.1694, longitude: 23.8813, zoom: 6.0 }),
    (Country::Haiti, Viewport { latitude: 18.9712, longitude: -72.2852, zoom: 7.0 }),
];

pub(crate) const COUNTRY_TERMINALS: [(Country, &[u32]); 6] = [
    (Country::SouthAfrica, &[1000, 2000, 5000, 10000, 20000, 50000, 100000, 200000, 500000, 1000000]),
    (Country::Ghana, &[1000, 2000, 5000, 10000, 20000, 50000, 100000, 200000, 500000]),
    (Country::Tonga, &[100, 200, 500, 1000, 2000, 5000, 10000, 20000, 50000]),
    (Country::Lithuania, &[1000, 2000, 5000, 10000, 20000, 50000, 100000, 200000, 500000]),
    (Country::Britain, &[1000, 2000, 5000, 10000, 20000, 50000, 100000, 200000, 500000, 1000000]),
    (Country::Haiti, &[1000, 2000, 5000, 10000, 20000, 50000, 100000, 200000, 500000]),
];

/// Union of every country's terminal counts, ascending.
pub const ALL_TERMINAL_COUNTS: [u32; 13] = [
    100, 200, 500, 1000, 2000, 5000, 10000, 20000, 50000, 100000, 200000, 500000, 1000000,
];

impl Country {
    pub fn viewport(&self) -> Viewport {
        COUNTRY_VIEWPORTS
            .iter()
            .find(|(country, _)| country == self)
            .map(|(_, viewport)| *viewport)
            .unwrap_or(GLOBAL_VIEWPORT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::OptionSet;

    #[test]
    fn test_every_country_has_viewport() {
        for country in Country::all() {
            assert!(COUNTRY_VIEWPORTS.iter().any(|(c, _)| c == country), "{country}");
        }
    }

    #[test]
    fn test_britain_viewport() {
        let vp = Country::Britain.viewport();
        assert_eq!(vp.latitude, 55.3781);
        assert_eq!(vp.longitude, -3.4360);
        assert_eq!(vp.zoom, 5.0);
    }

    #[test]
    fn test_union_covers_country_lists() {
        for (_, counts) in COUNTRY_TERMINALS {
            for count in counts {
                assert!(ALL_TERMINAL_COUNTS.contains(count));
            }
        }
        assert!(ALL_TERMINAL_COUNTS.windows(2).all(|w| w[0] < w[1]));
    }
}
