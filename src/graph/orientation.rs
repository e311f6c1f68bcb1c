//! FROM/TO orientation and whole-wire connection types.
//!
//! Source wirelists do not agree on which end of a fused circuit is listed
//! first. Wires whose `to` end sits on a distribution box (fuse/relay box)
//! while the `from` end does not are flipped, so the supply side always
//! reads as `from`.

use serde::{Deserialize, Serialize};

use crate::graph::classify::NodeClassifier;
use crate::types::{ConnectionType, NormalizedKey, WireRecord};

/// Distribution-box codes recognised in the default configuration.
pub const DEFAULT_BOX_CODES: &[&str] = &["UEC", "IEC", "PFB", "FFB", "IPFB", "TFB", "REC"];

// ---------------------------------------------------------------------------
// BoxCodes
// ---------------------------------------------------------------------------

/// Code fragments that mark a node as a distribution box.
///
/// A node matches when its normalized key contains any fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoxCodes(Vec<String>);

impl BoxCodes {
    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            codes
                .into_iter()
                .map(|c| NormalizedKey::new(c.as_ref()).as_str().to_string())
                .filter(|c| !c.is_empty())
                .collect(),
        )
    }

    pub fn matches(&self, key: &NormalizedKey) -> bool {
        self.0.iter().any(|code| key.contains(code))
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl Default for BoxCodes {
    fn default() -> Self {
        Self::new(DEFAULT_BOX_CODES)
    }
}

// ---------------------------------------------------------------------------
// OrientedWire
// ---------------------------------------------------------------------------

/// A wire's ends after orientation. The source record is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrientedWire {
    #[serde(rename = "from")]
    pub from_node: String,
    pub from_pin: String,
    #[serde(rename = "to")]
    pub to_node: String,
    pub to_pin: String,
    /// Whether the ends were exchanged relative to the source record.
    pub swapped: bool,
}

impl OrientedWire {
    pub fn from_key(&self) -> NormalizedKey {
        NormalizedKey::new(&self.from_node)
    }

    pub fn to_key(&self) -> NormalizedKey {
        NormalizedKey::new(&self.to_node)
    }
}

/// Orient `wire` so a distribution box, when present on only one end, is
/// the `from` end.
pub fn orient(wire: &WireRecord, box_codes: &BoxCodes) -> OrientedWire {
    let from_is_box = box_codes.matches(&wire.from_key());
    let to_is_box = box_codes.matches(&wire.to_key());

    if to_is_box && !from_is_box {
        OrientedWire {
            from_node: wire.to_node.clone(),
            from_pin: wire.to_pin.clone(),
            to_node: wire.from_node.clone(),
            to_pin: wire.from_pin.clone(),
            swapped: true,
        }
    } else {
        OrientedWire {
            from_node: wire.from_node.clone(),
            from_pin: wire.from_pin.clone(),
            to_node: wire.to_node.clone(),
            to_pin: wire.to_pin.clone(),
            swapped: false,
        }
    }
}

/// Classify a whole wire: solder joint when both pins carry the sentinel,
/// otherwise by how many ends are known connectors.
pub fn connection_type(wire: &OrientedWire, classifier: &NodeClassifier<'_>) -> ConnectionType {
    if classifier.is_solder_pin(&wire.from_pin) && classifier.is_solder_pin(&wire.to_pin) {
        return ConnectionType::SolderJoint;
    }
    let connectors = classifier.connectors();
    match (
        connectors.contains(&wire.from_key()),
        connectors.contains(&wire.to_key()),
    ) {
        (true, true) => ConnectionType::ConnectorToConnector,
        (true, false) | (false, true) => ConnectionType::Connector,
        (false, false) => ConnectionType::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::classify::{ConnectorTable, InlineSpliceMap};
    use crate::types::SOLDER_PIN;
    use test_case::test_case;

    #[test_case("IP01", "PFB", true ; "box on to side flips")]
    #[test_case("PFB", "IP01", false ; "box on from side stays")]
    #[test_case("UEC1", "IPFB2", false ; "box on both sides stays")]
    #[test_case("IP01", "BD02", false ; "no box stays")]
    #[test_case("ip01", " rec 3", true ; "box match is normalized")]
    fn orientation_cases(from: &str, to: &str, swapped: bool) {
        let wire = WireRecord::new(Some("W1"), from, "1", to, "2");
        let oriented = orient(&wire, &BoxCodes::default());
        assert_eq!(oriented.swapped, swapped);
        if swapped {
            assert_eq!(oriented.from_node, to);
            assert_eq!(oriented.from_pin, "2");
            assert_eq!(oriented.to_node, from);
            assert_eq!(oriented.to_pin, "1");
        } else {
            assert_eq!(oriented.from_node, from);
            assert_eq!(oriented.to_pin, "2");
        }
    }

    #[test]
    fn orient_leaves_record_untouched() {
        let wire = WireRecord::new(None, "IP01", "1", "PFB", "2");
        let before = wire.clone();
        let _ = orient(&wire, &BoxCodes::default());
        assert_eq!(wire, before);
    }

    #[test]
    fn custom_box_codes_ignore_blanks() {
        let codes = BoxCodes::new(["fb", " ", ""]);
        assert_eq!(codes.as_slice(), &["FB".to_string()]);
        assert!(codes.matches(&NormalizedKey::new("PFB")));
    }

    #[test_case("IP01", "X", "S1", "X", ConnectionType::SolderJoint ; "both pins sentinel")]
    #[test_case("IP01", "1", "BD02", "2", ConnectionType::ConnectorToConnector ; "two connectors")]
    #[test_case("IP01", "1", "S1", "X", ConnectionType::Connector ; "one connector")]
    #[test_case("ZZ", "1", "YY", "2", ConnectionType::Unknown ; "no connectors")]
    fn connection_type_cases(from: &str, fp: &str, to: &str, tp: &str, expected: ConnectionType) {
        let connectors: ConnectorTable = ["IP01", "BD02"].into_iter().collect();
        let splices = InlineSpliceMap::new();
        let classifier = NodeClassifier::new(&connectors, &splices, SOLDER_PIN);
        let wire = orient(&WireRecord::new(None, from, fp, to, tp), &BoxCodes::default());
        assert_eq!(connection_type(&wire, &classifier), expected);
    }
}
