//! `GET /api/report?project&period&format` — a weekly/monthly digest built
//! from the same recency-weighted assembly `smart_context` uses, filtered to
//! the requested window and rendered as JSON or Markdown.

use crate::error::ApiResult;
use crate::state::AppState;
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use memory_core::model::{Observation, Summary};
use memory_storage::store::SmartContextQuery;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const REPORT_TOKEN_BUDGET: i64 = 20_000;
const WEEKLY_SECS: i64 = 7 * 24 * 60 * 60;
const MONTHLY_SECS: i64 = 30 * 24 * 60 * 60;

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Period {
    Weekly,
    Monthly,
}

impl Period {
    fn window_secs(self) -> i64 {
        match self {
            Self::Weekly => WEEKLY_SECS,
            Self::Monthly => MONTHLY_SECS,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Format {
    Json,
    Markdown,
}

#[derive(Deserialize)]
pub struct ReportParams {
    project: String,
    #[serde(default = "default_period")]
    period: Period,
    #[serde(default = "default_format")]
    format: Format,
}

fn default_period() -> Period {
    Period::Weekly
}

fn default_format() -> Format {
    Format::Json
}

#[derive(Serialize)]
struct Report {
    project: String,
    period: &'static str,
    observations: Vec<Observation>,
    summaries: Vec<Summary>,
}

async fn report(State(state): State<Arc<AppState>>, Query(params): Query<ReportParams>) -> ApiResult<Response> {
    let now_epoch = chrono::Utc::now().timestamp();
    let cutoff = now_epoch - params.period.window_secs();

    let assembled = state
        .store
        .smart_context(SmartContextQuery { project: params.project.clone(), now_epoch, token_budget: REPORT_TOKEN_BUDGET })
        .await?;
    let observations: Vec<Observation> =
        assembled.hits.into_iter().map(|hit| hit.observation).filter(|obs| obs.created_at_epoch >= cutoff).collect();
    let summaries: Vec<Summary> = state
        .store
        .recent_summaries(&params.project, 50)
        .await?
        .into_iter()
        .filter(|summary| summary.created_at_epoch >= cutoff)
        .collect();

    let period_label = match params.period {
        Period::Weekly => "weekly",
        Period::Monthly => "monthly",
    };
    let report = Report { project: params.project, period: period_label, observations, summaries };

    Ok(match params.format {
        Format::Json => Json(report).into_response(),
        Format::Markdown => (
            [(header::CONTENT_TYPE, "text/markdown; charset=utf-8")],
            render_markdown(&report),
        )
            .into_response(),
    })
}

fn render_markdown(report: &Report) -> String {
    let mut out = format!("# {} report — {}\n\n", report.period, report.project);

    out.push_str("## Summaries\n\n");
    for summary in &report.summaries {
        out.push_str(&format!("- {}\n", summary.request));
    }
    if report.summaries.is_empty() {
        out.push_str("_none_\n");
    }

    out.push_str("\n## Observations\n\n");
    for observation in &report.observations {
        out.push_str(&format!("- [{}] {}\n", observation.r#type, observation.title));
    }
    if report.observations.is_empty() {
        out.push_str("_none_\n");
    }

    out
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/report", get(report))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markdown_renders_placeholders_for_empty_sections() {
        let report = Report { project: "demo".to_string(), period: "weekly", observations: vec![], summaries: vec![] };
        let markdown = render_markdown(&report);
        assert!(markdown.contains("# weekly report — demo"));
        assert_eq!(markdown.matches("_none_").count(), 2);
    }
}
