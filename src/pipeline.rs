// src/pipeline.rs

use futures::future::join_all;
use serde::Serialize;
use tracing::{error, info, instrument};

use crate::{
    config::Source,
    fetch::{LoadFailure, Loader},
    parse::{self, ParseFailure},
    powerflow::{FlowSeries, PowerflowError},
    render::target::RenderTarget,
};

pub const LOAD_FAILED_MESSAGE: &str = "Failed to load CSV file.";
pub const PARSE_FAILED_MESSAGE: &str = "Error parsing CSV file.";

/// What one table region ends up showing.
#[derive(Debug, Clone)]
pub enum RegionOutcome {
    Table {
        target: RenderTarget,
        /// Present for heatmap sources whose rows form valid flow matrices.
        flows: Option<Result<FlowSeries, PowerflowError>>,
    },
    LoadFailed(LoadFailure),
    ParseFailed(ParseFailure),
}

impl RegionOutcome {
    /// Inline message for a failed region, `None` when there is a table.
    pub fn failure_message(&self) -> Option<&'static str> {
        match self {
            RegionOutcome::Table { .. } => None,
            RegionOutcome::LoadFailed(_) => Some(LOAD_FAILED_MESSAGE),
            RegionOutcome::ParseFailed(_) => Some(PARSE_FAILED_MESSAGE),
        }
    }

    pub fn target(&self) -> Option<&RenderTarget> {
        match self {
            RegionOutcome::Table { target, .. } => Some(target),
            _ => None,
        }
    }

    pub fn summary(&self, source: &Source) -> RegionSummary {
        match self {
            RegionOutcome::Table { target, .. } => RegionSummary {
                id: source.id.clone(),
                status: "ok",
                target: Some(target.clone()),
                message: None,
                details: Vec::new(),
            },
            RegionOutcome::LoadFailed(e) => RegionSummary {
                id: source.id.clone(),
                status: "load_failed",
                target: None,
                message: Some(LOAD_FAILED_MESSAGE.to_string()),
                details: vec![e.to_string()],
            },
            RegionOutcome::ParseFailed(f) => RegionSummary {
                id: source.id.clone(),
                status: "parse_failed",
                target: None,
                message: Some(PARSE_FAILED_MESSAGE.to_string()),
                details: f.diagnostics.iter().map(|d| d.to_string()).collect(),
            },
        }
    }
}

/// Serializable per-source record written next to the page.
#[derive(Debug, Clone, Serialize)]
pub struct RegionSummary {
    pub id: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<RenderTarget>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

/// Load → parse → render target for one source. Failures end up in the
/// outcome; nothing here returns an error.
#[instrument(level = "info", skip(loader, source), fields(id = %source.id, resource = %source.resource))]
pub async fn run(loader: &Loader, source: &Source) -> RegionOutcome {
    let raw = match loader.load(&source.resource).await {
        Ok(raw) => raw,
        Err(e) => {
            error!(error = %e, "CSV load failed");
            return RegionOutcome::LoadFailed(e);
        }
    };

    let table = match parse::parse(&raw) {
        Ok(table) => table,
        Err(failure) => {
            error!(diagnostics = ?failure.diagnostics, "CSV parsing errors");
            return RegionOutcome::ParseFailed(failure);
        }
    };

    let flows = source.heatmap.then(|| {
        let series = FlowSeries::from_table(&table);
        if let Err(e) = &series {
            error!(error = %e, "power-flow matrix unavailable");
        }
        series
    });

    info!(rows = table.rows.len(), columns = table.columns.len(), "table ready");
    let target = RenderTarget::new(table)
        .with_page_size(source.page_size)
        .with_sort(source.sort_column_index, source.sort_direction);

    RegionOutcome::Table { target, flows }
}

/// Run every source concurrently. Output order matches `sources`.
pub async fn run_all(loader: &Loader, sources: &[Source]) -> Vec<RegionOutcome> {
    join_all(sources.iter().map(|s| run(loader, s))).await
}
