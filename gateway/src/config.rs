//! Gateway settings, read from the environment.

use std::path::PathBuf;

pub const DEFAULT_STATIC_ROOT: &str = "static";
pub const DEFAULT_LEGEND_DIR: &str = "templates/color_scales";
pub const DEFAULT_PORT: &str = "18610";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub static_root: PathBuf,
    pub legend_dir: PathBuf,
    pub port: String,
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// `CAPACITY_GATEWAY_PORT` wins over `PORT`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            static_root: lookup("CAPACITY_STATIC_ROOT")
                .unwrap_or_else(|| DEFAULT_STATIC_ROOT.to_string())
                .into(),
            legend_dir: lookup("CAPACITY_LEGEND_DIR")
                .unwrap_or_else(|| DEFAULT_LEGEND_DIR.to_string())
                .into(),
            port: lookup("CAPACITY_GATEWAY_PORT")
                .or_else(|| lookup("PORT"))
                .unwrap_or_else(|| DEFAULT_PORT.to_string()),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}
