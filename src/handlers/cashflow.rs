use askama::Template;
use axum::extract::{Query, State};
use axum::response::Html;
use tracing::debug;

use crate::api::{self, RequestContext};
use crate::date_utils::Month;
use crate::error::{AppError, AppResult, RenderHtml};
use crate::handlers::api::CashflowParams;
use crate::models::Settings;
use crate::services::sankey::{self, SanitizedGraph};
use crate::state::{AppState, JsManifest};
use crate::VERSION;

/// A link as listed under the chart.
pub struct FlowRow {
    pub source: String,
    pub target: String,
    pub value: String,
}

#[derive(Template)]
#[template(path = "pages/cashflow.html")]
pub struct CashflowTemplate {
    pub title: String,
    pub settings: Settings,
    pub manifest: JsManifest,
    pub version: &'static str,
    pub login_enabled: bool,
    pub month_label: String,
    pub prev_href: String,
    pub next_href: String,
    /// Chart payload, safe to embed in a `<script>` element.
    pub graph_json: Option<String>,
    pub flows: Vec<FlowRow>,
    pub inflow: String,
}

/// Serialize for inline `<script type="application/json">`; `</` would end
/// the element early.
fn embed_json(graph: &SanitizedGraph) -> AppResult<String> {
    let json = serde_json::to_string(graph).map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(json.replace("</", "<\\/"))
}

fn flow_rows(graph: &SanitizedGraph, settings: &Settings) -> Vec<FlowRow> {
    graph
        .links
        .iter()
        .filter_map(|link| {
            Some(FlowRow {
                source: graph.nodes.get(link.source)?.name.clone(),
                target: graph.nodes.get(link.target)?.name.clone(),
                value: settings.format_money_neutral(&link.value),
            })
        })
        .collect()
}

pub async fn index(
    State(state): State<AppState>,
    ctx: RequestContext,
    Query(params): Query<CashflowParams>,
) -> AppResult<Html<String>> {
    let month = params
        .month
        .as_deref()
        .and_then(Month::parse)
        .unwrap_or_else(Month::current);
    let month_param = month.as_param();

    let (settings, graph) = tokio::try_join!(
        state.load_settings(&ctx),
        api::cashflow::fetch(&state.api, &ctx, Some(&month_param)),
    )?;
    let sanitized = sankey::sanitize(&graph);
    debug!(
        month = %month_param,
        nodes = graph.nodes.len(),
        links = graph.links.len(),
        drawable = sanitized.is_some(),
        "Cash flow loaded"
    );

    let (graph_json, flows, inflow) = match &sanitized {
        Some(g) => (
            Some(embed_json(g)?),
            flow_rows(g, &settings),
            settings.format_money_neutral(&g.inflow()),
        ),
        None => (None, Vec::new(), String::new()),
    };

    let template = CashflowTemplate {
        title: "Cash flow".into(),
        month_label: month.label(),
        prev_href: format!("/cashflow?month={}", month.prev().as_param()),
        next_href: format!("/cashflow?month={}", month.next().as_param()),
        graph_json,
        flows,
        inflow,
        settings,
        manifest: state.manifest.clone(),
        version: VERSION,
        login_enabled: state.config.requires_login(),
    };
    template.render_html()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SankeyNode;
    use crate::services::sankey::SankeyEdge;

    #[test]
    fn test_embed_json_escapes_script_end() {
        let graph = SanitizedGraph {
            nodes: vec![
                SankeyNode {
                    name: "</script>".into(),
                    group: None,
                },
                SankeyNode {
                    name: "Rent".into(),
                    group: None,
                },
            ],
            links: vec![SankeyEdge {
                source: 0,
                target: 1,
                value: 10.0,
            }],
        };
        let json = embed_json(&graph).unwrap();
        assert!(!json.contains("</script>"));
        assert!(json.contains("<\\/script>"));
        let rows = flow_rows(&graph, &Settings::default());
        assert_eq!(rows[0].target, "Rent");
        assert_eq!(rows[0].value, "$10.00");
    }
}
