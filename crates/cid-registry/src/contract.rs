//! # CID Record Contract
//!
//! The chaincode operations. Each runs against the world state of exactly
//! one transaction and returns its result together with the event, if any,
//! that the transaction should carry.
//!
//! Every state-changing operation follows the same shape:
//!
//! 1. Observe the record state through the store
//! 2. Run the lifecycle guard for the transition
//! 3. Write and/or build the event
//!
//! Steps 1 and 3 happen inside the same transaction, so the ledger's
//! serialization makes the check-then-act atomic.

use crate::domain::entities::{validate_hash, CidRecord};
use crate::domain::lifecycle::{RecordState, Transition};
use crate::errors::RegistryError;
use crate::events::{AuthenticationRequest, ChaincodeEvent, DeletionRequest, RegistrationIntent};
use crate::invocation::Function;
use crate::ports::outbound::{TxOutcome, WorldState};
use crate::store::RecordStore;
use serde_json::Value;
use tracing::debug;

/// The CID registry chaincode.
///
/// Stateless: everything it reads or writes goes through the world state
/// handed to each operation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CidRecordContract;

impl CidRecordContract {
    fn observe<S: WorldState + ?Sized>(
        store: &RecordStore<'_, S>,
        transition: Transition,
        hash: &str,
    ) -> Result<RecordState, RegistryError> {
        let state = RecordState::from_exists(store.exists(hash)?);
        transition.guard(hash, state)?;
        debug!(%transition, hash, ?state, "Guard passed");
        Ok(state)
    }

    /// Bootstrap hook. Commits without touching state.
    pub fn init_ledger<S: WorldState + ?Sized>(
        &self,
        _state: &mut S,
    ) -> Result<TxOutcome<()>, RegistryError> {
        Ok(TxOutcome::value(()))
    }

    /// Emit a `RegisterFace` intent for an unbound hash.
    ///
    /// Nothing is persisted. The hash stays unbound until the upload worker
    /// confirms.
    pub fn register_hash<S: WorldState + ?Sized>(
        &self,
        state: &mut S,
        hash: &str,
        vector: &str,
    ) -> Result<TxOutcome<()>, RegistryError> {
        validate_hash(hash)?;
        let store = RecordStore::new(state);
        Self::observe(&store, Transition::RegisterHash, hash)?;

        let event = ChaincodeEvent::register_face(&RegistrationIntent {
            hash: hash.to_string(),
            vector: vector.to_string(),
        })?;
        Ok(TxOutcome::with_event((), event))
    }

    /// Bind `cid` to an unbound hash.
    pub fn confirm_cid_upload<S: WorldState + ?Sized>(
        &self,
        state: &mut S,
        hash: &str,
        cid: &str,
    ) -> Result<TxOutcome<()>, RegistryError> {
        validate_hash(hash)?;
        let mut store = RecordStore::new(state);
        Self::observe(&store, Transition::ConfirmCidUpload, hash)?;

        store.put(hash, &CidRecord::new(hash, cid))?;
        Ok(TxOutcome::value(()))
    }

    /// Emit an `AuthenticateFace` request. Runs in any state.
    pub fn authenticate_face<S: WorldState + ?Sized>(
        &self,
        _state: &mut S,
        vector: &str,
    ) -> Result<TxOutcome<()>, RegistryError> {
        let event = ChaincodeEvent::authenticate_face(&AuthenticationRequest {
            vector: vector.to_string(),
        })?;
        Ok(TxOutcome::with_event((), event))
    }

    /// Emit a `RequestDelete` event carrying the stored bytes verbatim.
    ///
    /// The record stays in place until `DeleteCIDRecord` runs.
    pub fn request_delete_cid_record<S: WorldState + ?Sized>(
        &self,
        state: &mut S,
        hash: &str,
    ) -> Result<TxOutcome<()>, RegistryError> {
        let store = RecordStore::new(state);
        let raw = store.get_raw(hash)?;
        Transition::RequestDelete.guard(hash, RecordState::from_exists(raw.is_some()))?;

        let event = ChaincodeEvent::request_delete(DeletionRequest {
            raw: raw.unwrap_or_default(),
        })?;
        Ok(TxOutcome::with_event((), event))
    }

    /// Remove a bound record.
    pub fn delete_cid_record<S: WorldState + ?Sized>(
        &self,
        state: &mut S,
        hash: &str,
    ) -> Result<TxOutcome<()>, RegistryError> {
        let mut store = RecordStore::new(state);
        Self::observe(&store, Transition::DeleteRecord, hash)?;

        store.delete(hash)?;
        Ok(TxOutcome::value(()))
    }

    /// Read the record bound to `hash`.
    pub fn read_cid_record<S: WorldState + ?Sized>(
        &self,
        state: &mut S,
        hash: &str,
    ) -> Result<TxOutcome<CidRecord>, RegistryError> {
        let record = RecordStore::new(state).get(hash)?;
        Ok(TxOutcome::value(record))
    }

    /// Every decodable record in key order.
    pub fn get_all_cid_records<S: WorldState + ?Sized>(
        &self,
        state: &mut S,
    ) -> Result<TxOutcome<Vec<CidRecord>>, RegistryError> {
        let store = RecordStore::new(state);
        let records = store.scan_all()?.collect::<Result<Vec<_>, _>>()?;
        Ok(TxOutcome::value(records))
    }

    /// Whether a record is bound to `hash`.
    pub fn cid_record_exists<S: WorldState + ?Sized>(
        &self,
        state: &mut S,
        hash: &str,
    ) -> Result<TxOutcome<bool>, RegistryError> {
        let exists = RecordStore::new(state).exists(hash)?;
        Ok(TxOutcome::value(exists))
    }

    /// Dispatch a routed function and render its result as JSON.
    ///
    /// Void operations yield `null`.
    pub fn execute<S: WorldState + ?Sized>(
        &self,
        state: &mut S,
        function: &Function,
    ) -> Result<TxOutcome<Value>, RegistryError> {
        match function {
            Function::InitLedger => self.init_ledger(state).map(into_json_null),
            Function::RegisterHash { hash, vector } => {
                self.register_hash(state, hash, vector).map(into_json_null)
            }
            Function::ConfirmCidUpload { hash, cid } => {
                self.confirm_cid_upload(state, hash, cid).map(into_json_null)
            }
            Function::AuthenticateFace { vector } => {
                self.authenticate_face(state, vector).map(into_json_null)
            }
            Function::RequestDeleteCidRecord { hash } => {
                self.request_delete_cid_record(state, hash).map(into_json_null)
            }
            Function::DeleteCidRecord { hash } => {
                self.delete_cid_record(state, hash).map(into_json_null)
            }
            Function::ReadCidRecord { hash } => into_json(self.read_cid_record(state, hash)?),
            Function::GetAllCidRecords => into_json(self.get_all_cid_records(state)?),
            Function::CidRecordExists { hash } => {
                into_json(self.cid_record_exists(state, hash)?)
            }
        }
    }
}

fn into_json_null(outcome: TxOutcome<()>) -> TxOutcome<Value> {
    TxOutcome {
        value: Value::Null,
        event: outcome.event,
    }
}

fn into_json<T: serde::Serialize>(outcome: TxOutcome<T>) -> Result<TxOutcome<Value>, RegistryError> {
    Ok(TxOutcome {
        value: serde_json::to_value(&outcome.value)?,
        event: outcome.event,
    })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::LedgerError;
    use crate::events::EventName;
    use crate::ports::outbound::{in_range, StateIter};
    use std::collections::BTreeMap;

    #[derive(Default)]
    struct MapState {
        data: BTreeMap<String, Vec<u8>>,
        offline: bool,
    }

    impl MapState {
        fn check(&self) -> Result<(), LedgerError> {
            if self.offline {
                return Err(LedgerError::Backend("offline".into()));
            }
            Ok(())
        }
    }

    impl WorldState for MapState {
        fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerError> {
            self.check()?;
            Ok(self.data.get(key).cloned())
        }

        fn put_state(&mut self, key: &str, value: Vec<u8>) -> Result<(), LedgerError> {
            self.check()?;
            self.data.insert(key.to_string(), value);
            Ok(())
        }

        fn del_state(&mut self, key: &str) -> Result<(), LedgerError> {
            self.check()?;
            self.data.remove(key);
            Ok(())
        }

        fn state_by_range(&self, start: &str, end: &str) -> Result<StateIter<'_>, LedgerError> {
            let (start, end) = (start.to_owned(), end.to_owned());
            self.check()?;
            Ok(Box::new(
                self.data
                    .iter()
                    .filter(move |(k, _)| in_range(k, &start, &end))
                    .map(|(k, v)| Ok((k.clone(), v.clone()))),
            ))
        }
    }

    fn contract() -> CidRecordContract {
        CidRecordContract::default()
    }

    #[test]
    fn test_register_hash_emits_intent_and_persists_nothing() {
        let mut state = MapState::default();
        let outcome = contract()
            .register_hash(&mut state, "abc123", "0.1,0.2,0.3")
            .unwrap();

        let event = outcome.event.unwrap();
        assert_eq!(event.name, EventName::RegisterFace);
        assert_eq!(
            RegistrationIntent::from_payload(&event.payload).unwrap(),
            RegistrationIntent {
                hash: "abc123".into(),
                vector: "0.1,0.2,0.3".into()
            }
        );
        assert!(state.data.is_empty());
    }

    #[test]
    fn test_register_hash_rejects_bound_hash() {
        let mut state = MapState::default();
        let c = contract();
        c.confirm_cid_upload(&mut state, "abc123", "QmXyz").unwrap();

        assert_eq!(
            c.register_hash(&mut state, "abc123", "0.1").unwrap_err(),
            RegistryError::already_exists("abc123")
        );
    }

    #[test]
    fn test_confirm_twice_is_already_exists() {
        let mut state = MapState::default();
        let c = contract();

        let outcome = c.confirm_cid_upload(&mut state, "abc123", "QmXyz").unwrap();
        assert!(outcome.event.is_none());
        assert_eq!(
            c.read_cid_record(&mut state, "abc123").unwrap().value,
            CidRecord::new("abc123", "QmXyz")
        );

        // Different cid is still rejected
        assert_eq!(
            c.confirm_cid_upload(&mut state, "abc123", "QmOther").unwrap_err(),
            RegistryError::already_exists("abc123")
        );
        assert_eq!(
            c.read_cid_record(&mut state, "abc123").unwrap().value.cid,
            "QmXyz"
        );
    }

    #[test]
    fn test_absent_hash_reads() {
        let mut state = MapState::default();
        let c = contract();

        assert_eq!(
            c.read_cid_record(&mut state, "missing").unwrap_err(),
            RegistryError::not_found("missing")
        );
        assert!(!c.cid_record_exists(&mut state, "missing").unwrap().value);
        // Reads of an unusable key find nothing rather than failing validation
        assert!(!c.cid_record_exists(&mut state, "").unwrap().value);
    }

    #[test]
    fn test_get_all_skips_corrupt_entry() {
        let mut state = MapState::default();
        let c = contract();
        c.confirm_cid_upload(&mut state, "a", "QmA").unwrap();
        c.confirm_cid_upload(&mut state, "b", "QmB").unwrap();
        state.data.insert("c".into(), b"{corrupted".to_vec());

        let records = c.get_all_cid_records(&mut state).unwrap().value;
        assert_eq!(
            records,
            vec![CidRecord::new("a", "QmA"), CidRecord::new("b", "QmB")]
        );
    }

    #[test]
    fn test_request_delete_carries_stored_bytes() {
        let mut state = MapState::default();
        let c = contract();
        c.confirm_cid_upload(&mut state, "abc123", "QmXyz").unwrap();

        let event = c
            .request_delete_cid_record(&mut state, "abc123")
            .unwrap()
            .event
            .unwrap();
        assert_eq!(event.name, EventName::RequestDelete);
        assert_eq!(event.payload, state.data["abc123"]);
        assert_eq!(
            DeletionRequest::from_payload(&event.payload).record().unwrap(),
            c.read_cid_record(&mut state, "abc123").unwrap().value
        );
        // Still bound after the request
        assert!(c.cid_record_exists(&mut state, "abc123").unwrap().value);
    }

    #[test]
    fn test_request_delete_absent_is_not_found() {
        let mut state = MapState::default();
        assert_eq!(
            contract()
                .request_delete_cid_record(&mut state, "abc123")
                .unwrap_err(),
            RegistryError::not_found("abc123")
        );
    }

    #[test]
    fn test_delete_then_delete_again() {
        let mut state = MapState::default();
        let c = contract();
        c.confirm_cid_upload(&mut state, "abc123", "QmXyz").unwrap();

        c.delete_cid_record(&mut state, "abc123").unwrap();
        assert!(!c.cid_record_exists(&mut state, "abc123").unwrap().value);
        assert_eq!(
            c.delete_cid_record(&mut state, "abc123").unwrap_err(),
            RegistryError::not_found("abc123")
        );

        // Re-registration after deletion is allowed
        assert!(c.register_hash(&mut state, "abc123", "0.1").is_ok());
    }

    #[test]
    fn test_authenticate_face_in_any_state() {
        let mut state = MapState::default();
        let outcome = contract().authenticate_face(&mut state, "0.5,0.6").unwrap();
        let event = outcome.event.unwrap();
        assert_eq!(event.name, EventName::AuthenticateFace);
        assert_eq!(event.payload, br#"{"vector":"0.5,0.6"}"#.to_vec());
    }

    #[test]
    fn test_create_path_validates_hash() {
        let mut state = MapState::default();
        let c = contract();

        for bad in ["", "\u{0}composite"] {
            assert_eq!(
                c.confirm_cid_upload(&mut state, bad, "Qm").unwrap_err().code(),
                "INVALID_ARGUMENT"
            );
            assert_eq!(
                c.register_hash(&mut state, bad, "0.1").unwrap_err().code(),
                "INVALID_ARGUMENT"
            );
        }
        assert!(state.data.is_empty());

        // Length alone never rejects a hash
        let long = "a".repeat(300);
        c.confirm_cid_upload(&mut state, &long, "Qm").unwrap();
        assert_eq!(
            c.read_cid_record(&mut state, &long).unwrap().value,
            CidRecord::new(long.as_str(), "Qm")
        );
    }

    #[test]
    fn test_offline_state_is_store_unavailable() {
        let mut state = MapState {
            offline: true,
            ..MapState::default()
        };
        let err = contract()
            .confirm_cid_upload(&mut state, "abc123", "Qm")
            .unwrap_err();
        assert!(matches!(err, RegistryError::StoreUnavailable(_)));
    }

    #[test]
    fn test_execute_renders_json() {
        let mut state = MapState::default();
        let c = contract();

        let confirm = Function::ConfirmCidUpload {
            hash: "abc123".into(),
            cid: "QmXyz".into(),
        };
        assert_eq!(c.execute(&mut state, &confirm).unwrap().value, Value::Null);

        let read = Function::ReadCidRecord {
            hash: "abc123".into(),
        };
        assert_eq!(
            c.execute(&mut state, &read).unwrap().value,
            serde_json::json!({"id": "abc123", "cid": "QmXyz"})
        );

        let exists = Function::CidRecordExists {
            hash: "abc123".into(),
        };
        assert_eq!(
            c.execute(&mut state, &exists).unwrap().value,
            Value::Bool(true)
        );

        let all = c.execute(&mut state, &Function::GetAllCidRecords).unwrap();
        assert_eq!(all.value.as_array().map(Vec::len), Some(1));
    }
}
