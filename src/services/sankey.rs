//! Bounds and validation for cash-flow graphs before they reach the chart.

use serde::Serialize;

use crate::models::{SankeyGraph, SankeyNode};

pub const MAX_NODES: usize = 50;
pub const MAX_LINKS: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SankeyEdge {
    pub source: usize,
    pub target: usize,
    pub value: f64,
}

/// A graph that is safe to hand to the renderer: capped, with every link
/// pointing at existing, distinct nodes and carrying a positive value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SanitizedGraph {
    pub nodes: Vec<SankeyNode>,
    pub links: Vec<SankeyEdge>,
}

impl SanitizedGraph {
    /// Sum of link values leaving nodes that never appear as a target.
    pub fn inflow(&self) -> f64 {
        self.links
            .iter()
            .filter(|l| !self.links.iter().any(|other| other.target == l.source))
            .map(|l| l.value)
            .sum()
    }
}

/// `None` means "no data": nothing left to draw after sanitizing.
pub fn sanitize(graph: &SankeyGraph) -> Option<SanitizedGraph> {
    let nodes: Vec<SankeyNode> = graph.nodes.iter().take(MAX_NODES).cloned().collect();
    let node_count = nodes.len();

    // Links are capped before filtering, so valid links past the cap are
    // dropped even when earlier ones are invalid.
    let links: Vec<SankeyEdge> = graph
        .links
        .iter()
        .take(MAX_LINKS)
        .filter_map(|link| {
            // Checked against the truncated node list, so no second pass is needed.
            let source = index_in(link.source, node_count)?;
            let target = index_in(link.target, node_count)?;
            let valid = source != target && link.value.is_finite() && link.value > 0.0;
            valid.then_some(SankeyEdge {
                source,
                target,
                value: link.value,
            })
        })
        .collect();

    let dropped = graph.links.len() - links.len();
    if dropped > 0 || graph.nodes.len() > node_count {
        tracing::debug!(
            nodes = graph.nodes.len(),
            kept_nodes = node_count,
            links = graph.links.len(),
            kept_links = links.len(),
            "sanitized cash-flow graph"
        );
    }

    if nodes.is_empty() || links.is_empty() {
        return None;
    }
    Some(SanitizedGraph { nodes, links })
}

fn index_in(raw: i64, len: usize) -> Option<usize> {
    usize::try_from(raw).ok().filter(|&i| i < len)
}
