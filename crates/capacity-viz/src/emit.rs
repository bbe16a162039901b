//! Writes rendered map documents under the static root.

use std::fs;
use std::path::Path;
use tracing::{error, info};

use crate::deck::{DeckScene, Renderer};
use crate::{Result, VizError};

const BODY_CLOSE: &str = "</body>";

/// Insert `fragment` immediately before the last `</body>`, or append it
/// when the document has none.
pub fn splice_legend(html: &str, fragment: &str) -> String {
    match html.rfind(BODY_CLOSE) {
        Some(at) => {
            let mut out = String::with_capacity(html.len() + fragment.len());
            out.push_str(&html[..at]);
            out.push_str(fragment);
            out.push_str(&html[at..]);
            out
        }
        None => format!("{html}{fragment}"),
    }
}

/// Render `scene`, splice in the legend and write it to
/// `static_root/output_path`, replacing any previous document.
///
/// Returns `output_path`, the document's path relative to the static root.
pub fn emit(
    renderer: &dyn Renderer,
    scene: &DeckScene,
    legend_fragment: &str,
    static_root: &Path,
    output_path: &str,
) -> Result<String> {
    let html = splice_legend(&renderer.render(scene)?, legend_fragment);

    let target = static_root.join(output_path);
    if let Some(dir) = target.parent() {
        fs::create_dir_all(dir).map_err(|source| {
            error!("Cannot create visualization directory {:?}: {}", dir, source);
            VizError::OutputDir {
                path: dir.to_path_buf(),
                source,
            }
        })?;
    }
    fs::write(&target, html)?;
    info!("Wrote {:?} ({} layers)", target, scene.layers.len());

    Ok(output_path.to_string())
}
