//! Session state for one loaded wirelist.
//!
//! [`EngineState`] owns the wire records, the adjacency index and the
//! classification tables. It is built once per dataset and is read-only
//! afterwards; every query borrows it immutably.

pub mod batch;
pub mod worker;

use std::collections::HashSet;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::{Result, WireGraphError};
use crate::graph::classify::{
    ConnectorEntry, ConnectorTable, InlineSpliceMap, NodeClassifier, SplicePair,
};
use crate::graph::index::WireIndex;
use crate::graph::orientation::{connection_type, orient, BoxCodes, OrientedWire};
use crate::graph::traversal::{CircuitTraversal, TraversalResult};
use crate::types::{ConnectionType, NormalizedKey, WireRecord};

/// Separator used when listing several connector functions.
const FUNCTION_SEPARATOR: &str = "、";

// ---------------------------------------------------------------------------
// Dataset
// ---------------------------------------------------------------------------

/// The three inputs an engine session is built from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    /// Wire records; `None` when the caller never supplied a wirelist.
    #[serde(default)]
    pub wirelist: Option<Vec<WireRecord>>,
    #[serde(default)]
    pub connectors: Vec<ConnectorEntry>,
    #[serde(default, alias = "inlineMap")]
    pub inline_splices: Vec<SplicePair>,
}

impl Dataset {
    pub fn new(wirelist: Vec<WireRecord>) -> Self {
        Self {
            wirelist: Some(wirelist),
            ..Self::default()
        }
    }

    pub fn with_connectors(mut self, connectors: Vec<ConnectorEntry>) -> Self {
        self.connectors = connectors;
        self
    }

    pub fn with_splices(mut self, splices: Vec<SplicePair>) -> Self {
        self.inline_splices = splices;
        self
    }
}

/// Sizes and timing of one index build.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuildStats {
    pub wire_count: usize,
    pub from_index_size: usize,
    pub to_index_size: usize,
    pub connector_count: usize,
    pub splice_pairs: usize,
    pub elapsed: Duration,
}

// ---------------------------------------------------------------------------
// WireAnnotation
// ---------------------------------------------------------------------------

/// Audit view of a single wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireAnnotation {
    pub wire_id: String,
    pub oriented: OrientedWire,
    pub connection_type: ConnectionType,
    /// Functional description of what the wire feeds, when one is known.
    pub function: Option<String>,
}

// ---------------------------------------------------------------------------
// EngineState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct EngineState {
    records: Vec<WireRecord>,
    index: WireIndex,
    connectors: ConnectorTable,
    splices: InlineSpliceMap,
    box_codes: BoxCodes,
    solder_pin: String,
    max_depth: u32,
}

impl EngineState {
    /// Build indexes and lookup tables for `dataset`.
    ///
    /// Fails when the wirelist is absent or the config is invalid; an empty
    /// wirelist is accepted and simply answers every query with nothing.
    pub fn build(dataset: Dataset, config: &EngineConfig) -> Result<(Self, BuildStats)> {
        config.validate()?;
        let records = dataset
            .wirelist
            .ok_or(WireGraphError::MissingDataset("wirelist"))?;

        tracing::info!(wires = records.len(), "Building wire indexes");
        let started = Instant::now();

        if records.is_empty() {
            tracing::warn!("Wirelist is empty; every query will return no connectors");
        }

        let index = WireIndex::build(&records);
        let connectors = ConnectorTable::from_entries(&dataset.connectors);
        let splices = InlineSpliceMap::from_pairs(&dataset.inline_splices);

        let stats = BuildStats {
            wire_count: records.len(),
            from_index_size: index.from_len(),
            to_index_size: index.to_len(),
            connector_count: connectors.len(),
            splice_pairs: splices.pair_count(),
            elapsed: started.elapsed(),
        };
        tracing::info!(
            from = stats.from_index_size,
            to = stats.to_index_size,
            connectors = stats.connector_count,
            splices = stats.splice_pairs,
            "Indexes built in {:.2}ms",
            stats.elapsed.as_secs_f64() * 1000.0
        );

        let state = Self {
            records,
            index,
            connectors,
            splices,
            box_codes: config.box_codes(),
            solder_pin: config.traversal.solder_pin.clone(),
            max_depth: config.traversal.max_depth,
        };
        Ok((state, stats))
    }

    pub fn classifier(&self) -> NodeClassifier<'_> {
        NodeClassifier::new(&self.connectors, &self.splices, &self.solder_pin)
    }

    pub fn traversal(&self) -> CircuitTraversal<'_> {
        CircuitTraversal::new(&self.records, &self.index, self.classifier(), self.max_depth)
    }

    /// Same-circuit connectors for a start node. Never fails; unknown start
    /// points give an empty result.
    pub fn find_connected_terminals(&self, start_node: &str, start_pin: &str) -> TraversalResult {
        self.traversal().find_connected_terminals(start_node, start_pin)
    }

    /// Like [`Self::find_connected_terminals`], but rejects requests with a
    /// missing or blank start node.
    pub fn try_find(&self, start_node: Option<&str>, start_pin: Option<&str>) -> Result<TraversalResult> {
        let start_node = start_node
            .ok_or_else(|| WireGraphError::InvalidRequest("start node is missing".into()))?;
        if NormalizedKey::new(start_node).is_empty() {
            return Err(WireGraphError::InvalidRequest("start node is blank".into()));
        }
        Ok(self.find_connected_terminals(start_node, start_pin.unwrap_or_default()))
    }

    pub fn records(&self) -> &[WireRecord] {
        &self.records
    }

    pub fn index(&self) -> &WireIndex {
        &self.index
    }

    pub fn connectors(&self) -> &ConnectorTable {
        &self.connectors
    }

    pub fn splices(&self) -> &InlineSpliceMap {
        &self.splices
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    // -------------------------------------------------------------------
    // Annotation
    // -------------------------------------------------------------------

    /// Orientation, connection type and function of the wire at `position`.
    pub fn annotate(&self, position: usize) -> Option<WireAnnotation> {
        let wire = self.records.get(position)?;
        let classifier = self.classifier();
        let oriented = orient(wire, &self.box_codes);
        let kind = connection_type(&oriented, &classifier);

        let function = match kind {
            ConnectionType::SolderJoint => self.solder_joint_functions(&oriented),
            _ => self.end_function(&oriented),
        };

        Some(WireAnnotation {
            wire_id: wire.display_id(position),
            oriented,
            connection_type: kind,
            function,
        })
    }

    pub fn annotate_all(&self) -> Vec<WireAnnotation> {
        (0..self.records.len())
            .filter_map(|position| self.annotate(position))
            .collect()
    }

    /// Description of the connector end that is not a distribution box.
    fn end_function(&self, wire: &OrientedWire) -> Option<String> {
        let ends = [
            (wire.from_key(), wire.from_pin.as_str()),
            (wire.to_key(), wire.to_pin.as_str()),
        ];
        let (code, pin) = ends
            .iter()
            .find(|(key, _)| !self.box_codes.matches(key) && self.connectors.contains(key))?;
        Some(
            self.connectors
                .describe(code, pin)
                .map(str::to_string)
                .unwrap_or_else(|| code.to_string()),
        )
    }

    /// Functions of every connector wired to either end of a solder joint,
    /// excluding the joint's own ends.
    fn solder_joint_functions(&self, wire: &OrientedWire) -> Option<String> {
        let ends = [wire.from_key(), wire.to_key()];

        let mut positions: Vec<usize> = ends
            .iter()
            .flat_map(|key| {
                self.index
                    .outgoing(key)
                    .iter()
                    .chain(self.index.incoming(key))
                    .copied()
            })
            .collect();
        positions.sort_unstable();
        positions.dedup();

        let mut seen = HashSet::new();
        let mut functions = Vec::new();
        for position in positions {
            let related = &self.records[position];
            for key in [related.from_key(), related.to_key()] {
                if ends.contains(&key) || !self.connectors.contains(&key) {
                    continue;
                }
                if seen.insert(key.clone()) {
                    let text = self
                        .connectors
                        .connector_function(&key)
                        .map(str::to_string)
                        .unwrap_or_else(|| key.to_string());
                    functions.push(text);
                }
            }
        }

        (!functions.is_empty()).then(|| functions.join(FUNCTION_SEPARATOR))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn wire(id: &str, from: &str, fp: &str, to: &str, tp: &str) -> WireRecord {
        WireRecord::new(Some(id), from, fp, to, tp)
    }

    fn harness() -> EngineState {
        let dataset = Dataset::new(vec![
            wire("W1", "IP01", "3", "PFB", "F12"),
            wire("W2", "PFB", "F13", "S100", "X"),
            wire("W3", "BD02", "1", "S100", "X"),
            wire("W4", "DR05", "2", "S100", "X"),
            wire("W5", "S100", "X", "S200", "X"),
        ])
        .with_connectors(vec![
            ConnectorEntry::new("IP01").with_pin("3", "Headlamp LH"),
            ConnectorEntry::new("BD02").with_function("Body controller"),
            ConnectorEntry::new("DR05"),
        ]);
        EngineState::build(dataset, &EngineConfig::default()).unwrap().0
    }

    #[test]
    fn build_requires_wirelist() {
        let err = EngineState::build(Dataset::default(), &EngineConfig::default()).unwrap_err();
        assert!(matches!(err, WireGraphError::MissingDataset("wirelist")));
    }

    #[test]
    fn build_rejects_invalid_config() {
        let mut config = EngineConfig::default();
        config.traversal.max_depth = 0;
        let err = EngineState::build(Dataset::new(vec![]), &config).unwrap_err();
        assert!(matches!(err, WireGraphError::Config(_)));
    }

    #[test]
    fn build_reports_sizes() {
        let dataset = Dataset::new(vec![
            wire("W1", "A", "1", "B", "1"),
            wire("W2", "A", "2", "C", "1"),
        ])
        .with_connectors(vec![ConnectorEntry::new("B"), ConnectorEntry::new("C")])
        .with_splices(vec![SplicePair::new("L", "R")]);
        let (_, stats) = EngineState::build(dataset, &EngineConfig::default()).unwrap();
        assert_eq!(stats.wire_count, 2);
        assert_eq!(stats.from_index_size, 1);
        assert_eq!(stats.to_index_size, 2);
        assert_eq!(stats.connector_count, 2);
        assert_eq!(stats.splice_pairs, 1);
    }

    #[test]
    fn empty_wirelist_answers_nothing() {
        let (state, _) = EngineState::build(Dataset::new(vec![]), &EngineConfig::default()).unwrap();
        assert!(state.find_connected_terminals("PFB", "1").is_empty());
    }

    #[test]
    fn try_find_rejects_missing_and_blank_start() {
        let state = harness();
        assert!(matches!(
            state.try_find(None, Some("1")),
            Err(WireGraphError::InvalidRequest(_))
        ));
        assert!(matches!(
            state.try_find(Some("  "), None),
            Err(WireGraphError::InvalidRequest(_))
        ));
        assert!(state.try_find(Some("NOWHERE"), None).unwrap().is_empty());
    }

    #[test]
    fn configured_depth_is_used() {
        let mut config = EngineConfig::default();
        config.traversal.max_depth = 1;
        let dataset = Dataset::new(vec![
            wire("W1", "A", "1", "S1", "X"),
            wire("W2", "B", "1", "S1", "X"),
            wire("W3", "B", "2", "S2", "X"),
            wire("W4", "C", "1", "S2", "X"),
            wire("W5", "C", "2", "END", "1"),
        ])
        .with_connectors(vec![ConnectorEntry::new("END")]);
        let (state, _) = EngineState::build(dataset.clone(), &config).unwrap();
        assert!(state.find_connected_terminals("A", "1").is_empty());

        let (state, _) = EngineState::build(dataset, &EngineConfig::default()).unwrap();
        assert_eq!(state.find_connected_terminals("A", "1").labels(), &["END-1".to_string()]);
    }

    #[test]
    fn annotate_flips_box_to_from_and_describes_pin() {
        let state = harness();
        let note = state.annotate(0).unwrap();
        assert_eq!(note.wire_id, "W1");
        assert!(note.oriented.swapped);
        assert_eq!(note.oriented.from_node, "PFB");
        assert_eq!(note.connection_type, ConnectionType::Connector);
        assert_eq!(note.function.as_deref(), Some("Headlamp LH"));
    }

    #[test]
    fn annotate_solder_joint_lists_connector_functions() {
        let state = harness();
        let note = state.annotate(4).unwrap();
        assert_eq!(note.connection_type, ConnectionType::SolderJoint);
        assert_eq!(note.function.as_deref(), Some("Body controller、DR05"));
    }

    #[test]
    fn annotate_unknown_end_has_no_function() {
        let state = harness();
        // PFB -> S100 at X: box on one end, solder on the other, no connector.
        let note = state.annotate(1).unwrap();
        assert_eq!(note.connection_type, ConnectionType::Unknown);
        assert_eq!(note.function, None);
        assert!(state.annotate(99).is_none());
    }

    #[test]
    fn annotate_all_covers_every_wire() {
        let state = harness();
        let notes = state.annotate_all();
        assert_eq!(notes.len(), 5);
        assert_eq!(notes[3].wire_id, "W4");
    }

    #[test]
    fn dataset_deserializes_worker_payload() {
        let json = r#"{
            "wirelist": [{"from": "PFB", "fromPin": "1", "to": "IP01", "toPin": "2"}],
            "connectors": [{"code": "IP01"}],
            "inlineMap": [{"left": "L1", "right": "R1"}]
        }"#;
        let dataset: Dataset = serde_json::from_str(json).unwrap();
        assert_eq!(dataset.wirelist.as_ref().map(Vec::len), Some(1));
        assert_eq!(dataset.connectors.len(), 1);
        assert_eq!(dataset.inline_splices, vec![SplicePair::new("L1", "R1")]);
    }
}
