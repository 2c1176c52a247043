//! Market record type definitions

use serde::{Deserialize, Serialize};

/// One market/odds record from an upstream feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketRecord<P = serde_json::Value> {
    /// Market identifier
    pub id: u64,
    /// Position in the upstream sequence; higher means newer
    pub sequence_index: u64,
    /// Opaque market payload
    pub payload: P,
}

impl<P> MarketRecord<P> {
    /// Create a new market record
    pub fn new(id: u64, sequence_index: u64, payload: P) -> Self {
        Self {
            id,
            sequence_index,
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_market_record_wire_format() {
        let record: MarketRecord =
            serde_json::from_value(json!({"id": 70472, "sequenceIndex": 3, "payload": {"odds": 1.85}}))
                .unwrap();

        assert_eq!(record.id, 70472);
        assert_eq!(record.sequence_index, 3);
        assert_eq!(record.payload["odds"], 1.85);
    }
}
