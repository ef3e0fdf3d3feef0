//! Key/value chaincode
//!
//! Faithful to the deployed Go implementation: endorsement executes
//! read-only against current state and returns the response payload plus
//! the write set to be ordered. Sentinel payloads are successful
//! executions; only malformed invocations produce an error status.

use fabric_types::{WriteOp, ALREADY_EXIST, NOT_FOUND, STATE_ALREADY_SET, STATUS_ERROR, STATUS_SUCCESS};

use crate::store::LedgerStore;

/// Outcome of one chaincode execution
#[derive(Debug, Clone)]
pub struct ChaincodeResult {
    pub status: u16,
    pub payload: Vec<u8>,
    pub write_set: Vec<WriteOp>,
}

impl ChaincodeResult {
    fn success(payload: &str, write_set: Vec<WriteOp>) -> Self {
        Self {
            status: STATUS_SUCCESS,
            payload: payload.as_bytes().to_vec(),
            write_set,
        }
    }

    fn error(message: &str) -> Self {
        Self {
            status: STATUS_ERROR,
            payload: message.as_bytes().to_vec(),
            write_set: Vec::new(),
        }
    }
}

/// The simple key/value chaincode
pub struct KvChaincode;

impl KvChaincode {
    pub fn invoke(store: &LedgerStore, function: &str, args: &[String]) -> ChaincodeResult {
        match function {
            "add" => Self::add(store, args),
            "delete" => Self::delete(store, args),
            "get" => Self::get(store, args),
            "set" => Self::set(store, args),
            _ => ChaincodeResult::error(
                "Invalid invoke function name. Expecting \"delete\" \"set\" \"add\" \"get\"",
            ),
        }
    }

    fn add(store: &LedgerStore, args: &[String]) -> ChaincodeResult {
        if args.len() != 2 {
            return ChaincodeResult::error(
                "Incorrect number of arguments. Expecting entity and value to add.",
            );
        }
        let (entity, value) = (&args[0], &args[1]);

        if store.contains(entity) {
            return ChaincodeResult::success(ALREADY_EXIST, Vec::new());
        }
        ChaincodeResult::success(
            "",
            vec![WriteOp {
                key: entity.clone(),
                value: Some(value.clone()),
            }],
        )
    }

    fn delete(store: &LedgerStore, args: &[String]) -> ChaincodeResult {
        if args.len() != 1 {
            return ChaincodeResult::error("Incorrect number of arguments. Expecting 1");
        }
        let entity = &args[0];

        if !store.contains(entity) {
            return ChaincodeResult::success(NOT_FOUND, Vec::new());
        }
        ChaincodeResult::success(
            "",
            vec![WriteOp {
                key: entity.clone(),
                value: None,
            }],
        )
    }

    fn get(store: &LedgerStore, args: &[String]) -> ChaincodeResult {
        if args.len() != 1 {
            return ChaincodeResult::error("Incorrect number of arguments. Expecting entity to query");
        }
        match store.get(&args[0]) {
            Some(value) => ChaincodeResult::success(&value, Vec::new()),
            None => ChaincodeResult::success(NOT_FOUND, Vec::new()),
        }
    }

    fn set(store: &LedgerStore, args: &[String]) -> ChaincodeResult {
        if args.len() != 2 {
            return ChaincodeResult::error(
                "Incorrect number of arguments. Expecting entity and value to write.",
            );
        }
        let (entity, value) = (&args[0], &args[1]);

        match store.get(entity) {
            None => ChaincodeResult::success(NOT_FOUND, Vec::new()),
            Some(current) if current == *value => {
                ChaincodeResult::success(STATE_ALREADY_SET, Vec::new())
            }
            Some(_) => ChaincodeResult::success(
                "",
                vec![WriteOp {
                    key: entity.clone(),
                    value: Some(value.clone()),
                }],
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn add_of_new_entity_writes() {
        let store = LedgerStore::new();
        let result = KvChaincode::invoke(&store, "add", &args(&["diploma-123", "hash-abc"]));

        assert_eq!(result.status, STATUS_SUCCESS);
        assert!(result.payload.is_empty());
        assert_eq!(result.write_set.len(), 1);
        // Endorsement is read-only; nothing lands until ordering.
        assert!(store.is_empty());
    }

    #[test]
    fn add_of_existing_entity_is_already_exist() {
        let store = LedgerStore::new();
        store.put("diploma-123".to_string(), "hash-abc".to_string());

        let result = KvChaincode::invoke(&store, "add", &args(&["diploma-123", "hash-def"]));
        assert_eq!(result.payload, ALREADY_EXIST.as_bytes());
        assert!(result.write_set.is_empty());
    }

    #[test]
    fn get_returns_state_or_not_found() {
        let store = LedgerStore::new();
        store.put("diploma-123".to_string(), "hash-abc".to_string());

        let hit = KvChaincode::invoke(&store, "get", &args(&["diploma-123"]));
        assert_eq!(hit.payload, b"hash-abc");

        let miss = KvChaincode::invoke(&store, "get", &args(&["diploma-999"]));
        assert_eq!(miss.payload, NOT_FOUND.as_bytes());
    }

    #[test]
    fn delete_of_missing_entity_is_not_found() {
        let store = LedgerStore::new();
        let result = KvChaincode::invoke(&store, "delete", &args(&["diploma-123"]));
        assert_eq!(result.payload, NOT_FOUND.as_bytes());
    }

    #[test]
    fn set_distinguishes_missing_and_unchanged() {
        let store = LedgerStore::new();

        let missing = KvChaincode::invoke(&store, "set", &args(&["e", "v"]));
        assert_eq!(missing.payload, NOT_FOUND.as_bytes());

        store.put("e".to_string(), "v".to_string());
        let unchanged = KvChaincode::invoke(&store, "set", &args(&["e", "v"]));
        assert_eq!(unchanged.payload, STATE_ALREADY_SET.as_bytes());

        let changed = KvChaincode::invoke(&store, "set", &args(&["e", "w"]));
        assert!(changed.payload.is_empty());
        assert_eq!(changed.write_set.len(), 1);
    }

    #[test]
    fn unknown_function_is_an_execution_error() {
        let store = LedgerStore::new();
        let result = KvChaincode::invoke(&store, "upsert", &args(&["e", "v"]));
        assert_eq!(result.status, STATUS_ERROR);
    }

    #[test]
    fn wrong_arity_is_an_execution_error() {
        let store = LedgerStore::new();
        let result = KvChaincode::invoke(&store, "add", &args(&["only-entity"]));
        assert_eq!(result.status, STATUS_ERROR);
    }
}
