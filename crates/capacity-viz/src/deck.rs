//! deck.gl scene description and the HTML renderer behind it.
//!
//! Scenes serialize to the deck.gl JSON converter format: `@@type` names
//! the layer class and `@@=` prefixes accessor expressions evaluated per
//! datum. Fill colors are always plain per-datum values (`@@=fill_color`),
//! computed before rendering.

use serde::Serialize;
use serde_json::Value;

use capacity_datasets::Viewport;

use crate::color::Rgba;
use crate::legend::escape_html;
use crate::{Result, VizError};

pub const DECK_GL_VERSION: &str = "8.9.35";
pub const MAPLIBRE_VERSION: &str = "3.6.2";

/// Carto "light" basemap.
pub const LIGHT_MAP_STYLE: &str = "https://basemaps.cartocdn.com/gl/positron-gl-style/style.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LayerType {
    H3HexagonLayer,
    ScatterplotLayer,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
    #[serde(rename = "@@type")]
    pub layer_type: LayerType,
    pub id: String,
    pub data: Vec<Value>,
    pub pickable: bool,
    pub stroked: bool,
    pub filled: bool,
    pub get_fill_color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extruded: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub get_hexagon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub get_position: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub get_radius: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub radius_min_pixels: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub radius_max_pixels: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub get_line_color: Option<Rgba>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_width_min_pixels: Option<f64>,
}

fn to_values<T: Serialize>(data: &[T]) -> Result<Vec<Value>> {
    data.iter()
        .map(|d| serde_json::to_value(d).map_err(VizError::from))
        .collect()
}

impl Layer {
    /// Flat hexagons keyed by each datum's `hex` field.
    pub fn h3_hexagons<T: Serialize>(id: impl Into<String>, data: &[T]) -> Result<Self> {
        Ok(Self {
            layer_type: LayerType::H3HexagonLayer,
            id: id.into(),
            data: to_values(data)?,
            pickable: true,
            stroked: true,
            filled: true,
            get_fill_color: "@@=fill_color".to_string(),
            extruded: Some(false),
            get_hexagon: Some("@@=hex".to_string()),
            get_position: None,
            get_radius: None,
            radius_min_pixels: None,
            radius_max_pixels: None,
            opacity: None,
            get_line_color: None,
            line_width_min_pixels: None,
        })
    }

    /// Circles at each datum's `[lng, lat]`.
    pub fn points<T: Serialize>(id: impl Into<String>, data: &[T], radius_m: f64) -> Result<Self> {
        Ok(Self {
            layer_type: LayerType::ScatterplotLayer,
            id: id.into(),
            data: to_values(data)?,
            pickable: true,
            stroked: true,
            filled: true,
            get_fill_color: "@@=fill_color".to_string(),
            extruded: None,
            get_hexagon: None,
            get_position: Some("@@=[lng, lat]".to_string()),
            get_radius: Some(radius_m),
            radius_min_pixels: None,
            radius_max_pixels: None,
            opacity: None,
            get_line_color: None,
            line_width_min_pixels: None,
        })
    }

    pub fn outlined(mut self, color: Rgba, min_pixels: f64) -> Self {
        self.stroked = true;
        self.get_line_color = Some(color);
        self.line_width_min_pixels = Some(min_pixels);
        self
    }

    pub fn unoutlined(mut self) -> Self {
        self.stroked = false;
        self.get_line_color = None;
        self.line_width_min_pixels = None;
        self
    }

    pub fn pickable(mut self, pickable: bool) -> Self {
        self.pickable = pickable;
        self
    }

    pub fn radius_pixels(mut self, min: f64, max: f64) -> Self {
        self.radius_min_pixels = Some(min);
        self.radius_max_pixels = Some(max);
        self
    }

    pub fn opacity(mut self, opacity: f64) -> Self {
        self.opacity = Some(opacity);
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewState {
    pub latitude: f64,
    pub longitude: f64,
    pub zoom: f64,
    pub bearing: f64,
    pub pitch: f64,
}

impl From<Viewport> for ViewState {
    fn from(vp: Viewport) -> Self {
        Self {
            latitude: vp.latitude,
            longitude: vp.longitude,
            zoom: vp.zoom,
            bearing: 0.0,
            pitch: 0.0,
        }
    }
}

/// Hover text; `{field}` placeholders are filled from the picked datum.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tooltip {
    Text(String),
    Html(String),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckScene {
    #[serde(skip)]
    pub title: String,
    pub initial_view_state: ViewState,
    pub map_style: String,
    pub layers: Vec<Layer>,
    #[serde(skip)]
    pub tooltip: Option<Tooltip>,
}

impl DeckScene {
    pub fn new(title: impl Into<String>, viewport: Viewport) -> Self {
        Self {
            title: title.into(),
            initial_view_state: viewport.into(),
            map_style: LIGHT_MAP_STYLE.to_string(),
            layers: Vec::new(),
            tooltip: None,
        }
    }

    pub fn layer(mut self, layer: Layer) -> Self {
        self.layers.push(layer);
        self
    }

    pub fn tooltip(mut self, tooltip: Tooltip) -> Self {
        self.tooltip = Some(tooltip);
        self
    }
}

/// Turns a scene into a complete HTML document.
pub trait Renderer: Send + Sync {
    fn render(&self, scene: &DeckScene) -> Result<String>;
}

/// Standalone page loading deck.gl and MapLibre from a CDN.
#[derive(Debug, Clone, Default)]
pub struct DeckGlRenderer;

/// JSON that is safe to inline inside a `<script>` element.
fn script_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?
        .replace("</", "<\\/")
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029"))
}

impl Renderer for DeckGlRenderer {
    fn render(&self, scene: &DeckScene) -> Result<String> {
        let scene_json = script_json(scene)?;
        let tooltip_json = script_json(&scene.tooltip)?;

        Ok(format!(
            r#"<!DOCTYPE html>
<html>
<head>
<meta charset="UTF-8" />
<title>{title}</title>
<script src="https://unpkg.com/deck.gl@{deck}/dist.min.js"></script>
<script src="https://unpkg.com/@deck.gl/json@{deck}/dist.min.js"></script>
<script src="https://unpkg.com/maplibre-gl@{maplibre}/dist/maplibre-gl.js"></script>
<link href="https://unpkg.com/maplibre-gl@{maplibre}/dist/maplibre-gl.css" rel="stylesheet" />
<style>
  body {{ margin: 0; padding: 0; overflow: hidden; }}
  #deck-container {{ width: 100vw; height: 100vh; position: relative; }}
</style>
</head>
<body>
<div id="deck-container"></div>
<script>
  const scene = {scene_json};
  const tooltip = {tooltip_json};
  const converter = new deck.JSONConverter({{
    configuration: new deck.JSONConfiguration({{ classes: deck }})
  }});
  const props = converter.convert(scene);
  const fill = (template, object) =>
    template.replace(/\{{(\w+)\}}/g, (_, key) => (object[key] ?? '').toString());
  new deck.DeckGL({{
    container: 'deck-container',
    map: maplibregl,
    mapStyle: props.mapStyle,
    initialViewState: props.initialViewState,
    controller: true,
    layers: props.layers,
    getTooltip: ({{ object }}) => {{
      if (!object || !tooltip) return null;
      if (tooltip.html !== undefined) return {{ html: fill(tooltip.html, object) }};
      return {{ text: fill(tooltip.text, object) }};
    }}
  }});
</script>
</body>
</html>
"#,
            title = escape_html(&scene.title),
            deck = DECK_GL_VERSION,
            maplibre = MAPLIBRE_VERSION,
        ))
    }
}
