// src/config.rs

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashSet,
    env,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::{debug, info};

use crate::{
    fetch::ResourceRef,
    render::target::{SortDirection, DEFAULT_PAGE_SIZE},
};

pub const DEFAULT_CONFIG_PATH: &str = "griddash.yaml";

/// One CSV file and how its table should be shown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    /// Tab / region id, e.g. `results`.
    pub id: String,
    /// Tab label.
    pub title: String,
    pub resource: ResourceRef,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default)]
    pub sort_column_index: usize,
    #[serde(default)]
    pub sort_direction: SortDirection,
    /// Also draw the 4×4 line-flow heatmap (needs `Hour`, `P11..P44`).
    #[serde(default)]
    pub heatmap: bool,
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

impl Source {
    pub fn new(id: &str, title: &str, resource: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            resource: ResourceRef::new(resource),
            page_size: DEFAULT_PAGE_SIZE,
            sort_column_index: 0,
            sort_direction: SortDirection::Asc,
            heatmap: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// URL or local directory the resources are relative to.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Per-request timeout. Unset means wait indefinitely.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    pub sources: Vec<Source>,
}

fn default_base_url() -> String {
    ".".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("site")
}

impl Default for Config {
    /// The three microgrid result files.
    fn default() -> Self {
        let mut powerflow = Source::new("powerflow", "Power Flow", "code/powerflow.csv");
        powerflow.heatmap = true;
        Self {
            base_url: default_base_url(),
            output_dir: default_output_dir(),
            request_timeout_secs: None,
            sources: vec![
                Source::new("results", "Results", "code/results.csv"),
                Source::new("theta", "Theta", "code/theta.csv"),
                powerflow,
            ],
        }
    }
}

impl Config {
    /// Read `path` if it exists, else fall back to the defaults.
    /// `GRIDDASH_BASE_URL` / `GRIDDASH_OUTPUT_DIR` override either.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut cfg = if path.exists() {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            let cfg: Config = serde_yaml::from_str(&text)
                .with_context(|| format!("parsing config {}", path.display()))?;
            info!(path = %path.display(), sources = cfg.sources.len(), "loaded config");
            cfg
        } else {
            info!(path = %path.display(), "no config file; using defaults");
            Config::default()
        };

        if let Ok(base) = env::var("GRIDDASH_BASE_URL") {
            debug!(%base, "base_url from env");
            cfg.base_url = base;
        }
        if let Ok(out) = env::var("GRIDDASH_OUTPUT_DIR") {
            debug!(%out, "output_dir from env");
            cfg.output_dir = PathBuf::from(out);
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sources.is_empty() {
            bail!("config has no sources");
        }
        let mut ids = HashSet::new();
        for s in &self.sources {
            if s.id.trim().is_empty() {
                bail!("source for {} has an empty id", s.resource);
            }
            if !ids.insert(s.id.as_str()) {
                bail!("duplicate source id {:?}", s.id);
            }
            if s.page_size == 0 {
                bail!("source {:?}: page_size must be > 0", s.id);
            }
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}
