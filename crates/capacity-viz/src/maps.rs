//! Scene builders, one per dataset kind.

use serde::Serialize;

use capacity_datasets::{
    CapacityCell, CellValue, DatasetKind, HeatmapCell, NationCell, StationRecord, Viewport,
    GLOBAL_VIEWPORT,
};

use crate::color::{
    ColorScale, Ramp, Rgba, HEX_LINE_COLOR, MARKER_LINE_COLOR, NATION_COLOR,
};
use crate::deck::{DeckScene, Layer, Tooltip};
use crate::legend::Legend;
use crate::Result;

/// Station marker radius in meters.
const STATION_RADIUS_M: f64 = 15000.0;

/// A scene together with the legend describing its color scale.
#[derive(Debug, Clone)]
pub struct MapScene {
    pub scene: DeckScene,
    pub legend: Legend,
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

fn floor3(v: f64) -> f64 {
    (v * 1000.0).floor() / 1000.0
}

#[derive(Serialize)]
struct HexValue<'a> {
    hex: &'a str,
    value: f64,
    fill_color: Rgba,
}

#[derive(Serialize)]
struct HexFlat<'a> {
    hex: &'a str,
    fill_color: Rgba,
}

/// Available-capacity heatmap: gradient cells over `[0, 1]` plus flat
/// nation cells.
pub fn heatmap_scene(cells: &[HeatmapCell], viewport: Viewport, title: &str) -> Result<MapScene> {
    let scale = ColorScale::new(0.0, 1.0, Ramp::RedToGreen);

    let regular: Vec<HexValue> = cells
        .iter()
        .filter(|c| !c.is_nation)
        .map(|c| HexValue {
            hex: &c.hex_id,
            value: round3(c.value),
            fill_color: scale.colorize(c.value),
        })
        .collect();
    let nation: Vec<HexValue> = cells
        .iter()
        .filter(|c| c.is_nation)
        .map(|c| HexValue {
            hex: &c.hex_id,
            value: round3(c.value),
            fill_color: NATION_COLOR,
        })
        .collect();

    let scene = DeckScene::new(title, viewport)
        .layer(Layer::h3_hexagons("regular-cells", &regular)?.outlined(HEX_LINE_COLOR, 2.0))
        .layer(Layer::h3_hexagons("nation-cells", &nation)?.outlined(HEX_LINE_COLOR, 2.0))
        .tooltip(Tooltip::Text("H3 cell: {hex}\nAvailable capacity: {value}".into()));

    let legend = Legend::new(DatasetKind::Heatmap, "Available capacity", scale).with_nation_swatch();
    Ok(MapScene { scene, legend })
}

#[derive(Serialize)]
struct HexCapacity<'a> {
    hex: &'a str,
    capacity: f64,
    fill_color: Rgba,
}

/// Per-cell capacity scaled between the data's own minimum and maximum.
pub fn capacity_scene(cells: &[CapacityCell], viewport: Viewport, title: &str) -> Result<MapScene> {
    let scale = ColorScale::spanning(cells.iter().map(|c| c.capacity), Ramp::RedToGreen);

    let data: Vec<HexCapacity> = cells
        .iter()
        .map(|c| HexCapacity {
            hex: &c.hex_id,
            capacity: c.capacity,
            fill_color: scale.colorize(c.capacity),
        })
        .collect();

    let scene = DeckScene::new(title, viewport)
        .layer(Layer::h3_hexagons("cell-capacity", &data)?.outlined(HEX_LINE_COLOR, 2.0))
        .tooltip(Tooltip::Text("Capacity: {capacity} Mb".into()));

    let legend = Legend::new(DatasetKind::CountryCapacity, "Capacity (Mb)", scale).with_labels([
        format!("{:.0}", scale.min),
        format!("{:.0}", scale.midpoint()),
        format!("{:.0}", scale.max),
    ]);
    Ok(MapScene { scene, legend })
}

#[derive(Serialize)]
struct StationPoint<'a> {
    id: i64,
    name: &'a str,
    lat: f64,
    lng: f64,
    utilization: f64,
    utilization_display: String,
    fill_color: Rgba,
}

/// Ground stations as circles, red as utilization rises.
pub fn stations_scene(stations: &[StationRecord], title: &str) -> Result<MapScene> {
    let scale = ColorScale::new(0.0, 1.0, Ramp::GreenToRed);

    let data: Vec<StationPoint> = stations
        .iter()
        .map(|s| StationPoint {
            id: s.station_id,
            name: &s.name,
            lat: s.lat,
            lng: s.lng,
            utilization: s.utilization,
            utilization_display: format!("{:.3}", s.utilization),
            fill_color: scale.colorize(s.utilization),
        })
        .collect();

    let layer = Layer::points("ground-stations", &data, STATION_RADIUS_M)?
        .outlined(MARKER_LINE_COLOR, 1.0)
        .radius_pixels(5.0, 100.0)
        .opacity(0.8);

    let scene = DeckScene::new(title, GLOBAL_VIEWPORT)
        .layer(layer)
        .tooltip(Tooltip::Html(
            "<b>Name:</b> {name}<br/><b>Utilization:</b> {utilization_display}".into(),
        ));

    let legend = Legend::new(DatasetKind::GsUtilization, "Ground station utilization", scale);
    Ok(MapScene { scene, legend })
}

#[derive(Serialize)]
struct HexDegradation<'a> {
    hex: &'a str,
    value: f64,
    truncated_value: f64,
    fill_color: Rgba,
}

/// Capacity degradation: flat nation cells under gradient cells whose
/// window starts at the data minimum floored to one decimal.
///
/// Only nation cells that hold terminals are drawn.
pub fn degradation_scene(
    values: &[CellValue],
    nation: &[NationCell],
    viewport: Viewport,
    title: &str,
) -> Result<MapScene> {
    let scale = ColorScale::degradation(values.iter().map(|v| v.value));

    let nation_data: Vec<HexFlat> = nation
        .iter()
        .filter(|n| n.has_terminals())
        .map(|n| HexFlat {
            hex: &n.hex_id,
            fill_color: NATION_COLOR,
        })
        .collect();
    let cells: Vec<HexDegradation> = values
        .iter()
        .map(|v| HexDegradation {
            hex: &v.hex_id,
            value: v.value,
            truncated_value: floor3(v.value),
            fill_color: scale.colorize(v.value),
        })
        .collect();

    let scene = DeckScene::new(title, viewport)
        .layer(
            Layer::h3_hexagons("nation-cells", &nation_data)?
                .unoutlined()
                .pickable(false),
        )
        .layer(Layer::h3_hexagons("heatmap-cells", &cells)?.outlined(HEX_LINE_COLOR, 2.0))
        .tooltip(Tooltip::Text("Available capacity:\n {truncated_value}".into()));

    let legend = Legend::new(DatasetKind::CellHeatmap, "Available capacity", scale).with_nation_swatch();
    Ok(MapScene { scene, legend })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::GRADIENT_ALPHA;
    use capacity_datasets::options::Country;
    use serde_json::json;

    const CELL_A: &str = "8928308280fffff";
    const CELL_B: &str = "8928308280bffff";

    fn layer_json(scene: &MapScene, idx: usize) -> serde_json::Value {
        serde_json::to_value(&scene.scene.layers[idx]).unwrap()
    }

    #[test]
    fn test_heatmap_splits_nation_cells() {
        let cells = vec![
            HeatmapCell { hex_id: CELL_A.into(), value: 0.12345, is_nation: false },
            HeatmapCell { hex_id: CELL_B.into(), value: 0.0, is_nation: true },
        ];
        let map = heatmap_scene(&cells, Country::Britain.viewport(), "Britain").unwrap();
        assert_eq!(map.scene.layers.len(), 2);

        let regular = layer_json(&map, 0);
        assert_eq!(regular["data"][0]["value"], json!(0.123));
        let nation = layer_json(&map, 1);
        assert_eq!(nation["data"][0]["fill_color"], json!([0, 0, 255, 200]));
        assert_eq!(map.scene.initial_view_state.latitude, 55.3781);
    }

    #[test]
    fn test_capacity_scale_spans_data() {
        let cells = vec![
            CapacityCell { hex_id: CELL_A.into(), capacity: 100.0 },
            CapacityCell { hex_id: CELL_B.into(), capacity: 300.0 },
        ];
        let map = capacity_scene(&cells, Country::Ghana.viewport(), "Ghana").unwrap();
        let layer = layer_json(&map, 0);
        assert_eq!(layer["data"][0]["fill_color"], json!([255, 0, 0, GRADIENT_ALPHA]));
        assert_eq!(layer["data"][1]["fill_color"], json!([0, 255, 0, GRADIENT_ALPHA]));
        assert_eq!(map.legend.labels, ["100".to_string(), "200".into(), "300".into()]);
    }

    #[test]
    fn test_single_capacity_is_midpoint() {
        let cells = vec![CapacityCell { hex_id: CELL_A.into(), capacity: 55.0 }];
        let map = capacity_scene(&cells, Country::Tonga.viewport(), "Tonga").unwrap();
        assert_eq!(layer_json(&map, 0)["data"][0]["fill_color"], json!([255, 255, 0, GRADIENT_ALPHA]));
    }

    #[test]
    fn test_station_points_mirrored() {
        let stations = vec![StationRecord {
            station_id: 3,
            name: "Gravelines".into(),
            lat: 50.98,
            lng: 2.12,
            utilization: 0.91234,
        }];
        let map = stations_scene(&stations, "Stations").unwrap();
        let layer = layer_json(&map, 0);
        assert_eq!(layer["@@type"], "ScatterplotLayer");
        assert_eq!(layer["getPosition"], "@@=[lng, lat]");
        assert_eq!(layer["data"][0]["utilization_display"], "0.912");
        assert_eq!(layer["data"][0]["fill_color"][0], 255);
        assert_eq!(map.scene.initial_view_state.zoom, 1.5);
    }

    #[test]
    fn test_degradation_filters_and_floors() {
        let values = vec![
            CellValue { hex_id: CELL_A.into(), value: 0.8769 },
            CellValue { hex_id: CELL_B.into(), value: 0.95 },
        ];
        let nation = vec![
            NationCell { hex_id: CELL_A.into(), terminals: 4.0 },
            NationCell { hex_id: CELL_B.into(), terminals: 0.0 },
        ];
        let map = degradation_scene(&values, &nation, Country::Haiti.viewport(), "Haiti").unwrap();

        let nation_layer = layer_json(&map, 0);
        assert_eq!(nation_layer["data"].as_array().unwrap().len(), 1);
        assert_eq!(nation_layer["pickable"], false);
        assert_eq!(nation_layer["stroked"], false);

        let cells = layer_json(&map, 1);
        assert_eq!(cells["data"][0]["truncated_value"], json!(0.876));
        assert_eq!(map.legend.labels[0], "0.8");
        assert_eq!(map.legend.labels[2], "1.0");
    }
}
