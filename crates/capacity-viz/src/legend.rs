//! Color-scale legend fragments spliced into rendered map documents.

use capacity_datasets::DatasetKind;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::color::{ColorScale, NATION_COLOR};
use crate::Result;

/// Label placeholders used by legend template overrides.
const TEMPLATE_LABELS: [&str; 3] = ["<span>0.0</span>", "<span>0.5</span>", "<span>1.0</span>"];

/// A horizontal gradient legend with low / mid / high labels.
#[derive(Debug, Clone)]
pub struct Legend {
    pub kind: DatasetKind,
    pub title: String,
    pub scale: ColorScale,
    pub labels: [String; 3],
    pub nation_swatch: bool,
}

impl Legend {
    pub fn new(kind: DatasetKind, title: impl Into<String>, scale: ColorScale) -> Self {
        Self {
            kind,
            title: title.into(),
            scale,
            labels: [
                format!("{:.1}", scale.min),
                format!("{:.1}", scale.midpoint()),
                format!("{:.1}", scale.max),
            ],
            nation_swatch: false,
        }
    }

    pub fn with_labels(mut self, labels: [String; 3]) -> Self {
        self.labels = labels;
        self
    }

    pub fn with_nation_swatch(mut self) -> Self {
        self.nation_swatch = true;
        self
    }

    /// File name of the deployable override for this kind's legend.
    pub fn template_name(kind: DatasetKind) -> &'static str {
        match kind {
            DatasetKind::Heatmap => "color_scale.html",
            DatasetKind::CountryCapacity => "country_capacity_color_scale.html",
            DatasetKind::GsUtilization => "gs_utilizations_color_scale.html",
            DatasetKind::CellHeatmap => "heatmap_color_scale.html",
        }
    }

    /// The fragment to splice: an override from `template_dir` when one is
    /// deployed (with its placeholder labels replaced), else the built-in one.
    pub fn fragment(&self, template_dir: Option<&Path>) -> Result<String> {
        if let Some(dir) = template_dir {
            let path = dir.join(Self::template_name(self.kind));
            if path.is_file() {
                debug!("Using legend template {:?}", path);
                let mut html = fs::read_to_string(&path)?;
                for (placeholder, label) in TEMPLATE_LABELS.iter().zip(&self.labels) {
                    html = html.replace(placeholder, &format!("<span>{label}</span>"));
                }
                return Ok(html);
            }
        }
        Ok(self.builtin())
    }

    fn builtin(&self) -> String {
        let [low, mid, high] = self.scale.ramp.css_stops();
        let nation = if self.nation_swatch {
            format!(
                r#"<div style="margin-top:6px;display:flex;align-items:center;gap:6px;"><span style="display:inline-block;width:14px;height:14px;background:{};"></span><span>Nation cells</span></div>"#,
                NATION_COLOR.to_css()
            )
        } else {
            String::new()
        };

        format!(
            r#"<div id="color-scale" style="position:absolute;bottom:24px;right:24px;z-index:10;background:rgba(255,255,255,0.9);padding:10px 12px;border-radius:6px;font-family:Helvetica,Arial,sans-serif;font-size:12px;box-shadow:0 1px 4px rgba(0,0,0,0.3);">
<div style="font-weight:bold;margin-bottom:6px;">{title}</div>
<div style="width:200px;height:14px;background:linear-gradient(to right, {low}, {mid}, {high});"></div>
<div style="display:flex;justify-content:space-between;width:200px;"><span>{l0}</span><span>{l1}</span><span>{l2}</span></div>
{nation}</div>
"#,
            title = escape_html(&self.title),
            l0 = escape_html(&self.labels[0]),
            l1 = escape_html(&self.labels[1]),
            l2 = escape_html(&self.labels[2]),
        )
    }
}

pub(crate) fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Ramp;

    #[test]
    fn test_builtin_labels_follow_scale() {
        let legend = Legend::new(
            DatasetKind::CellHeatmap,
            "Available capacity",
            ColorScale::new(0.6, 1.0, Ramp::RedToGreen),
        );
        let html = legend.fragment(None).unwrap();
        assert!(html.contains("<span>0.6</span><span>0.8</span><span>1.0</span>"));
        assert!(html.contains("rgb(255, 0, 0), rgb(255, 255, 0), rgb(0, 255, 0)"));
        assert!(!html.contains("Nation cells"));
    }

    #[test]
    fn test_override_template_relabelled() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("heatmap_color_scale.html"),
            "<div><span>0.0</span><span>0.5</span><span>1.0</span></div>",
        )
        .unwrap();

        let legend = Legend::new(
            DatasetKind::CellHeatmap,
            "Available capacity",
            ColorScale::new(0.4, 1.0, Ramp::RedToGreen),
        );
        let html = legend.fragment(Some(dir.path())).unwrap();
        assert_eq!(html, "<div><span>0.4</span><span>0.7</span><span>1.0</span></div>");
    }

    #[test]
    fn test_missing_override_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let legend = Legend::new(
            DatasetKind::GsUtilization,
            "Utilization",
            ColorScale::new(0.0, 1.0, Ramp::GreenToRed),
        )
        .with_nation_swatch();
        let html = legend.fragment(Some(dir.path())).unwrap();
        assert!(html.contains("id=\"color-scale\""));
        assert!(html.contains("Nation cells"));
    }

    #[test]
    fn test_title_escaped() {
        let legend = Legend::new(
            DatasetKind::Heatmap,
            "<b>x</b>",
            ColorScale::new(0.0, 1.0, Ramp::RedToGreen),
        );
        assert!(legend.fragment(None).unwrap().contains("&lt;b&gt;x&lt;/b&gt;"));
    }
}
