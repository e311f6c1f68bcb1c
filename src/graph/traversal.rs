//! Same-circuit connector search.
//!
//! Depth-first walk over the [`WireIndex`] that looks through solder joints
//! and inline splices until it reaches real connectors. The walk is bounded
//! by a hop limit and a visited-node guard, so it terminates on any input,
//! including cyclic splice or solder topologies.
//!
//! Known limitations, kept deliberately because callers depend on the
//! resulting labels:
//! - branches deeper than the hop limit are dropped silently;
//! - nodes that are neither connector, solder joint nor splice end the
//!   branch with no contribution.

use std::collections::HashSet;

use serde::Serialize;

use crate::graph::classify::NodeClassifier;
use crate::graph::index::WireIndex;
use crate::types::{NodeClass, NormalizedKey, WireRecord};

/// Hop limit used when none is configured.
pub const DEFAULT_MAX_DEPTH: u32 = 5;

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Counters describing how much work one query did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TraversalStats {
    /// Distinct nodes expanded.
    pub nodes_visited: usize,
    /// Wires read from the forward index.
    pub wires_examined: usize,
    /// Branches cut by the hop limit.
    pub truncated_branches: usize,
    /// Deepest hop at which a node was expanded.
    pub max_depth_reached: u32,
}

/// Ordered, deduplicated connector labels reachable from a start node.
///
/// Labels are `CODE-PIN`, or `CODE` when the wire carries no pin. Order is
/// first-discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraversalResult {
    labels: Vec<String>,
    stats: TraversalStats,
}

impl TraversalResult {
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn into_labels(self) -> Vec<String> {
        self.labels
    }

    pub fn stats(&self) -> &TraversalStats {
        &self.stats
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Display label for the `to` end of a wire that reached a connector.
pub fn connector_label(wire: &WireRecord) -> String {
    let code = wire.to_node.trim();
    let pin = wire.to_pin.trim();
    if pin.is_empty() {
        code.to_string()
    } else {
        format!("{code}-{pin}")
    }
}

// ---------------------------------------------------------------------------
// CircuitTraversal
// ---------------------------------------------------------------------------

/// Per-query mutable state.
#[derive(Default)]
struct Walk {
    visited: HashSet<NormalizedKey>,
    seen: HashSet<String>,
    labels: Vec<String>,
    stats: TraversalStats,
}

impl Walk {
    fn record(&mut self, label: String) {
        if self.seen.insert(label.clone()) {
            self.labels.push(label);
        }
    }
}

/// Read-only traversal over one indexed wirelist.
#[derive(Debug, Clone, Copy)]
pub struct CircuitTraversal<'a> {
    records: &'a [WireRecord],
    index: &'a WireIndex,
    classifier: NodeClassifier<'a>,
    max_depth: u32,
}

impl<'a> CircuitTraversal<'a> {
    pub fn new(
        records: &'a [WireRecord],
        index: &'a WireIndex,
        classifier: NodeClassifier<'a>,
        max_depth: u32,
    ) -> Self {
        Self {
            records,
            index,
            classifier,
            max_depth,
        }
    }

    /// Find every connector label in the same circuit as `start_node`.
    ///
    /// `start_pin` identifies the request but does not narrow the search:
    /// every wire leaving the start node is followed. Unknown or blank start
    /// nodes give an empty result.
    pub fn find_connected_terminals(&self, start_node: &str, _start_pin: &str) -> TraversalResult {
        let start = NormalizedKey::new(start_node);
        let mut walk = Walk::default();
        if !start.is_empty() {
            self.visit(&mut walk, start, 0);
        }
        TraversalResult {
            labels: walk.labels,
            stats: walk.stats,
        }
    }

    fn visit(&self, walk: &mut Walk, code: NormalizedKey, depth: u32) {
        if depth > self.max_depth {
            walk.stats.truncated_branches += 1;
            tracing::debug!(node = %code, depth, "hop limit reached, branch dropped");
            return;
        }
        if !walk.visited.insert(code.clone()) {
            return;
        }
        walk.stats.nodes_visited += 1;
        walk.stats.max_depth_reached = walk.stats.max_depth_reached.max(depth);

        for &position in self.index.outgoing(&code) {
            walk.stats.wires_examined += 1;
            let wire = &self.records[position];
            let to = wire.to_key();

            match self.classifier.classify(&to, &wire.to_pin) {
                NodeClass::Connector => walk.record(connector_label(wire)),
                NodeClass::SolderJoint => {
                    // Every other conductor soldered at this point.
                    for &leg in self.index.incoming(&to) {
                        let leg = &self.records[leg];
                        if self.classifier.is_solder_pin(&leg.to_pin) {
                            self.visit(walk, leg.from_key(), depth + 1);
                        }
                    }
                }
                NodeClass::InlineSplice => {
                    if let Some(partner) = self.classifier.splices().partner(&to) {
                        if !self.index.outgoing(partner).is_empty() {
                            self.visit(walk, partner.clone(), depth + 1);
                        }
                    }
                }
                NodeClass::Unknown => {}
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
