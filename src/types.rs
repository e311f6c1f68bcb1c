//! Core domain types for wirelist connectivity.
//!
//! Wire records are kept exactly as loaded; every comparison goes through
//! [`NormalizedKey`] (for node codes) or [`normalize_pin`] (for pins).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Pin value marking a solder joint in the source wirelist.
pub const SOLDER_PIN: &str = "X";

// ---------------------------------------------------------------------------
// NormalizedKey
// ---------------------------------------------------------------------------

/// A node code with all whitespace removed and letters folded to upper case.
///
/// This is the only key type used by the wire index, the connector table and
/// the inline splice map, so `" ip 01"` and `"IP01"` always resolve to the
/// same graph node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedKey(String);

impl NormalizedKey {
    /// Normalize a raw node code.
    pub fn new(raw: &str) -> Self {
        Self(
            raw.chars()
                .filter(|c| !c.is_whitespace())
                .flat_map(char::to_uppercase)
                .collect(),
        )
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Absent or whitespace-only codes normalize to the empty key.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether this key contains `code` (already upper case) as a substring.
    pub fn contains(&self, code: &str) -> bool {
        !code.is_empty() && self.0.contains(code)
    }
}

impl fmt::Display for NormalizedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NormalizedKey {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<&String> for NormalizedKey {
    fn from(raw: &String) -> Self {
        Self::new(raw)
    }
}

/// Normalize a pin for comparison: trimmed and upper case.
pub fn normalize_pin(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Whether `pin` is the solder-joint sentinel `sentinel` after normalization.
pub fn is_solder_pin(pin: &str, sentinel: &str) -> bool {
    normalize_pin(pin) == normalize_pin(sentinel)
}

// ---------------------------------------------------------------------------
// WireRecord
// ---------------------------------------------------------------------------

/// One edge of the harness graph, exactly as it appeared in the source data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireRecord {
    /// Wire identifier; absent in some source sheets.
    #[serde(default, alias = "wireId", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, rename = "from", alias = "fromNode")]
    pub from_node: String,
    #[serde(default)]
    pub from_pin: String,
    #[serde(default, rename = "to", alias = "toNode")]
    pub to_node: String,
    #[serde(default)]
    pub to_pin: String,
}

impl WireRecord {
    pub fn new(
        id: Option<&str>,
        from_node: &str,
        from_pin: &str,
        to_node: &str,
        to_pin: &str,
    ) -> Self {
        Self {
            id: id.map(str::to_string),
            from_node: from_node.to_string(),
            from_pin: from_pin.to_string(),
            to_node: to_node.to_string(),
            to_pin: to_pin.to_string(),
        }
    }

    /// The wire id, or the positional placeholder `Wire{n}` (1-based) when
    /// the record has none.
    pub fn display_id(&self, position: usize) -> String {
        match self.id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => format!("Wire{}", position + 1),
        }
    }

    pub fn from_key(&self) -> NormalizedKey {
        NormalizedKey::new(&self.from_node)
    }

    pub fn to_key(&self) -> NormalizedKey {
        NormalizedKey::new(&self.to_node)
    }
}

// ---------------------------------------------------------------------------
// NodeClass
// ---------------------------------------------------------------------------

/// How a node behaves when reached along a particular wire end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeClass {
    /// Real connector housing; ends a branch and contributes a label.
    Connector,
    /// Soldered junction (pin sentinel); traversal fans out through it.
    SolderJoint,
    /// One side of an inline splice pair; traversal continues on the other side.
    InlineSplice,
    /// Anything else; the branch ends with no contribution.
    Unknown,
}

impl NodeClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connector => "connector",
            Self::SolderJoint => "solder_joint",
            Self::InlineSplice => "inline_splice",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for NodeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ConnectionType
// ---------------------------------------------------------------------------

/// Whole-wire classification used when annotating a wirelist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionType {
    /// Both pins carry the solder sentinel.
    SolderJoint,
    /// Both ends are known connectors.
    ConnectorToConnector,
    /// Exactly one end is a known connector.
    Connector,
    Unknown,
}

impl ConnectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SolderJoint => "solder_joint",
            Self::ConnectorToConnector => "connector_to_connector",
            Self::Connector => "connector",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
