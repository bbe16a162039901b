//! Bow-tie color ramp
//!
//! Two linear segments through yellow at the midpoint:
//!
//! ```text
//! t:        0.0 ────────── 0.5 ────────── 1.0
//! standard: red           yellow         green
//! mirrored: green         yellow         red
//! ```
//!
//! Colors are computed here, per record, before any geometry reaches the
//! renderer.

use serde::Serialize;

/// Alpha for gradient-filled layers.
pub const GRADIENT_ALPHA: u8 = 185;

/// Alpha for flat nation-cell fills.
pub const NATION_ALPHA: u8 = 200;

/// Flat fill for nation cells, which carry no computed value.
pub const NATION_COLOR: Rgba = Rgba::new(0, 0, 255, NATION_ALPHA);

/// Stroke around hexagons.
pub const HEX_LINE_COLOR: Rgba = Rgba::new(255, 255, 255, 255);

/// Stroke around station markers.
pub const MARKER_LINE_COLOR: Rgba = Rgba::new(0, 0, 0, 255);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "[u8; 4]")]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn to_css(&self) -> String {
        format!("rgba({}, {}, {}, {:.3})", self.r, self.g, self.b, self.a as f64 / 255.0)
    }
}

impl From<Rgba> for [u8; 4] {
    fn from(c: Rgba) -> Self {
        [c.r, c.g, c.b, c.a]
    }
}

/// Direction of the ramp over increasing values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Ramp {
    /// Low values red, high values green (capacity: more is better).
    RedToGreen,
    /// Low values green, high values red (utilization: more is worse).
    GreenToRed,
}

impl Ramp {
    /// Color at position `t` in `[0, 1]`.
    pub fn at(&self, t: f64, alpha: u8) -> Rgba {
        let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.5 };
        let (hot, cool) = if t <= 0.5 {
            (255.0, 255.0 * 2.0 * t)
        } else {
            (255.0 * 2.0 * (1.0 - t), 255.0)
        };
        let (r, g) = match self {
            Ramp::RedToGreen => (hot, cool),
            Ramp::GreenToRed => (cool, hot),
        };
        Rgba::new(channel(r), channel(g), 0, alpha)
    }

    /// CSS stops from low to high, for legends.
    pub fn css_stops(&self) -> [&'static str; 3] {
        match self {
            Ramp::RedToGreen => ["rgb(255, 0, 0)", "rgb(255, 255, 0)", "rgb(0, 255, 0)"],
            Ramp::GreenToRed => ["rgb(0, 255, 0)", "rgb(255, 255, 0)", "rgb(255, 0, 0)"],
        }
    }
}

fn channel(v: f64) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// Position of `value` within `[min, max]`, clamped to `[0, 1]`.
///
/// A degenerate window (`max == min`) or a non-finite input maps to 0.5.
pub fn normalize(value: f64, min: f64, max: f64) -> f64 {
    let span = max - min;
    if span == 0.0 || !span.is_finite() || !value.is_finite() {
        return 0.5;
    }
    ((value - min) / span).clamp(0.0, 1.0)
}

/// Standard ramp color for `value` over `[min, max]`.
pub fn colorize(value: f64, min: f64, max: f64) -> Rgba {
    Ramp::RedToGreen.at(normalize(value, min, max), GRADIENT_ALPHA)
}

/// A ramp bound to a value window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColorScale {
    pub min: f64,
    pub max: f64,
    pub ramp: Ramp,
    pub alpha: u8,
}

impl ColorScale {
    pub fn new(min: f64, max: f64, ramp: Ramp) -> Self {
        Self {
            min,
            max,
            ramp,
            alpha: GRADIENT_ALPHA,
        }
    }

    /// Window spanning the data's own extremes; `[0, 1]` when empty.
    pub fn spanning(values: impl IntoIterator<Item = f64>, ramp: Ramp) -> Self {
        let (min, max) = values
            .into_iter()
            .filter(|v| v.is_finite())
            .fold(None, |acc: Option<(f64, f64)>, v| match acc {
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
                None => Some((v, v)),
            })
            .unwrap_or((0.0, 1.0));
        Self::new(min, max, ramp)
    }

    /// Degradation window: data minimum floored to one decimal, up to 1.0.
    pub fn degradation(values: impl IntoIterator<Item = f64>) -> Self {
        let min = values
            .into_iter()
            .filter(|v| v.is_finite())
            .fold(f64::INFINITY, f64::min);
        let min = if min.is_finite() {
            ((min * 10.0).floor() / 10.0).min(1.0)
        } else {
            0.0
        };
        Self::new(min, 1.0, Ramp::RedToGreen)
    }

    pub fn midpoint(&self) -> f64 {
        (self.min + self.max) / 2.0
    }

    pub fn colorize(&self, value: f64) -> Rgba {
        self.ramp.at(normalize(value, self.min, self.max), self.alpha)
    }
}
