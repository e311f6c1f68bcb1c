//! Node classification: connector table, inline splice pairs, and the
//! per-edge classifier that decides how traversal treats a node.
//!
//! Solder-joint status is a property of the `(node, pin)` pair seen on the
//! wire being walked, not of the node itself. The same code may be a
//! connector on one wire and a solder joint on another.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::types::{is_solder_pin, NodeClass, NormalizedKey};

/// Placeholder the source sheets use for "no value".
const EMPTY_MARKER: &str = "-";

fn is_blank(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value == EMPTY_MARKER
}

// ---------------------------------------------------------------------------
// ConnectorTable
// ---------------------------------------------------------------------------

/// One row of the companion connector list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorEntry {
    pub code: String,
    #[serde(default)]
    pub pin: Option<String>,
    #[serde(default)]
    pub function: Option<String>,
}

impl ConnectorEntry {
    pub fn new(code: &str) -> Self {
        Self {
            code: code.to_string(),
            pin: None,
            function: None,
        }
    }

    pub fn with_pin(mut self, pin: &str, function: &str) -> Self {
        self.pin = Some(pin.to_string());
        self.function = Some(function.to_string());
        self
    }

    pub fn with_function(mut self, function: &str) -> Self {
        self.function = Some(function.to_string());
        self
    }
}

/// Set of codes known to be terminal connectors, with optional functional
/// descriptions per connector and per `(connector, pin)`.
#[derive(Debug, Clone, Default)]
pub struct ConnectorTable {
    codes: HashSet<NormalizedKey>,
    connector_functions: HashMap<NormalizedKey, String>,
    pin_functions: HashMap<NormalizedKey, HashMap<String, String>>,
}

impl ConnectorTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from connector-list rows.
    ///
    /// Rows with a blank or `-` code are skipped. A row carrying a pin
    /// records a per-pin description (the pin itself when the function is
    /// blank); a row carrying only a function records a connector-level
    /// description.
    pub fn from_entries<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = &'a ConnectorEntry>,
    {
        let mut table = Self::new();
        for entry in entries {
            if is_blank(&entry.code) {
                continue;
            }
            let key = NormalizedKey::new(&entry.code);
            table.codes.insert(key.clone());

            let function = entry
                .function
                .as_deref()
                .map(str::trim)
                .filter(|f| !is_blank(f));

            match entry.pin.as_deref().map(str::trim) {
                Some(pin) if !is_blank(pin) => {
                    let description = function.unwrap_or(pin).to_string();
                    table
                        .pin_functions
                        .entry(key)
                        .or_default()
                        .insert(pin.to_uppercase(), description);
                }
                Some(_) => {}
                None => {
                    if let Some(function) = function {
                        table.connector_functions.insert(key, function.to_string());
                    }
                }
            }
        }
        table
    }

    /// Register a bare connector code.
    pub fn insert(&mut self, code: &str) {
        let key = NormalizedKey::new(code);
        if !key.is_empty() {
            self.codes.insert(key);
        }
    }

    pub fn contains(&self, key: &NormalizedKey) -> bool {
        self.codes.contains(key)
    }

    /// Functional description for `(code, pin)`: the per-pin entry first,
    /// then the connector-level entry.
    pub fn describe(&self, code: &NormalizedKey, pin: &str) -> Option<&str> {
        let pin = pin.trim().to_uppercase();
        self.pin_functions
            .get(code)
            .and_then(|pins| pins.get(&pin))
            .or_else(|| self.connector_functions.get(code))
            .map(String::as_str)
    }

    /// Connector-level description only.
    pub fn connector_function(&self, code: &NormalizedKey) -> Option<&str> {
        self.connector_functions.get(code).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for ConnectorTable {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        let mut table = Self::new();
        for code in iter {
            table.insert(code.as_ref());
        }
        table
    }
}

// ---------------------------------------------------------------------------
// InlineSpliceMap
// ---------------------------------------------------------------------------

/// One row of the inline splice table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplicePair {
    pub left: String,
    pub right: String,
}

impl SplicePair {
    pub fn new(left: &str, right: &str) -> Self {
        Self {
            left: left.to_string(),
            right: right.to_string(),
        }
    }
}

/// Symmetric pairing of inline splice sides: if `A -> B` then `B -> A`.
#[derive(Debug, Clone, Default)]
pub struct InlineSpliceMap {
    partners: HashMap<NormalizedKey, NormalizedKey>,
}

impl InlineSpliceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = &'a SplicePair>,
    {
        let mut map = Self::new();
        for pair in pairs {
            map.insert(&pair.left, &pair.right);
        }
        map
    }

    /// Pair two splice sides. Pairs with a blank side are ignored.
    ///
    /// When either side was already paired, its old partner loses the
    /// back-link so the mapping stays its own inverse.
    pub fn insert(&mut self, left: &str, right: &str) {
        let left = NormalizedKey::new(left);
        let right = NormalizedKey::new(right);
        if left.is_empty() || right.is_empty() {
            return;
        }
        for side in [&left, &right] {
            if let Some(old) = self.partners.remove(side) {
                if self.partners.get(&old) == Some(side) {
                    self.partners.remove(&old);
                }
            }
        }
        self.partners.insert(left.clone(), right.clone());
        self.partners.insert(right, left);
    }

    /// The other side of the splice containing `key`.
    pub fn partner(&self, key: &NormalizedKey) -> Option<&NormalizedKey> {
        self.partners.get(key)
    }

    pub fn contains(&self, key: &NormalizedKey) -> bool {
        self.partners.contains_key(key)
    }

    /// Number of distinct splice pairs.
    pub fn pair_count(&self) -> usize {
        let self_paired = self.partners.iter().filter(|(k, v)| k == v).count();
        (self.partners.len() - self_paired) / 2 + self_paired
    }

    pub fn is_empty(&self) -> bool {
        self.partners.is_empty()
    }
}

// ---------------------------------------------------------------------------
// NodeClassifier
// ---------------------------------------------------------------------------

/// Classifies a node as reached along one wire end.
///
/// Precedence: solder joint (pin equals the sentinel), then connector, then
/// inline splice, else unknown.
#[derive(Debug, Clone, Copy)]
pub struct NodeClassifier<'a> {
    connectors: &'a ConnectorTable,
    splices: &'a InlineSpliceMap,
    solder_pin: &'a str,
}

impl<'a> NodeClassifier<'a> {
    pub fn new(
        connectors: &'a ConnectorTable,
        splices: &'a InlineSpliceMap,
        solder_pin: &'a str,
    ) -> Self {
        Self {
            connectors,
            splices,
            solder_pin,
        }
    }

    pub fn classify(&self, key: &NormalizedKey, pin: &str) -> NodeClass {
        if is_solder_pin(pin, self.solder_pin) {
            NodeClass::SolderJoint
        } else if self.connectors.contains(key) {
            NodeClass::Connector
        } else if self.splices.contains(key) {
            NodeClass::InlineSplice
        } else {
            NodeClass::Unknown
        }
    }

    pub fn is_solder_pin(&self, pin: &str) -> bool {
        is_solder_pin(pin, self.solder_pin)
    }

    pub fn connectors(&self) -> &'a ConnectorTable {
        self.connectors
    }

    pub fn splices(&self) -> &'a InlineSpliceMap {
        self.splices
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
