//! Result envelopes returned to the HTTP controller

use serde::{Deserialize, Serialize};

/// Envelope for accepted mutations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionReceipt {
    #[serde(rename = "transactionID")]
    pub transaction_id: String,
}

/// Envelope for query results; `entityState` is `NOT_FOUND` when the
/// entity is absent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityState {
    #[serde(rename = "entityState")]
    pub entity_state: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn receipt_uses_wire_field_name() {
        let receipt = TransactionReceipt {
            transaction_id: "tx-1".to_string(),
        };
        let json = serde_json::to_string(&receipt).unwrap();
        assert_eq!(json, r#"{"transactionID":"tx-1"}"#);
    }

    #[test]
    fn entity_state_uses_wire_field_name() {
        let state = EntityState {
            entity_state: "hash-abc".to_string(),
        };
        let json = serde_json::to_string(&state).unwrap();
        assert_eq!(json, r#"{"entityState":"hash-abc"}"#);
    }
}
