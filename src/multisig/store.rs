//! Storage for multisig approval records

use super::MultisigCall;
use crate::address::AccountId;
use crate::error::WasmSubstrateError;
use crate::types::H256;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Replacement for a record, given the current one (or `None`)
pub type RecordUpdate<'a> =
    dyn FnMut(Option<MultisigCall>) -> Result<MultisigCall, WasmSubstrateError> + 'a;

/// Shared, atomically updated approval records keyed by (multisig account, call hash)
pub trait ApprovalStore: Send + Sync {
    fn load(
        &self,
        multisig: &AccountId,
        call_hash: &H256,
    ) -> Result<Option<MultisigCall>, WasmSubstrateError>;

    /// Atomic read-modify-write of one record, returning the stored replacement
    ///
    /// `update` runs once with the current record. Returning an error leaves the store as it
    /// was, including not creating a record that did not exist.
    fn compare_and_update(
        &self,
        multisig: &AccountId,
        call_hash: &H256,
        update: &mut RecordUpdate<'_>,
    ) -> Result<MultisigCall, WasmSubstrateError>;
}

/// Sessions share one store by cloning the `Arc`
impl<S: ApprovalStore + ?Sized> ApprovalStore for Arc<S> {
    fn load(
        &self,
        multisig: &AccountId,
        call_hash: &H256,
    ) -> Result<Option<MultisigCall>, WasmSubstrateError> {
        (**self).load(multisig, call_hash)
    }

    fn compare_and_update(
        &self,
        multisig: &AccountId,
        call_hash: &H256,
        update: &mut RecordUpdate<'_>,
    ) -> Result<MultisigCall, WasmSubstrateError> {
        (**self).compare_and_update(multisig, call_hash, update)
    }
}

type Key = (AccountId, H256);
type Slot = Arc<Mutex<Option<MultisigCall>>>;

/// In-process store; each record sits behind its own mutex
#[derive(Debug, Default)]
pub struct InMemoryApprovalStore {
    slots: Mutex<HashMap<Key, Slot>>,
}

impl InMemoryApprovalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records held, including ones still being created
    pub fn len(&self) -> usize {
        self.slots.lock().map_or(0, |slots| slots.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot_or_insert(&self, key: Key) -> Result<Slot, WasmSubstrateError> {
        let mut slots = self.slots.lock().map_err(|_| poisoned())?;
        Ok(slots.entry(key).or_default().clone())
    }

    /// Drop a slot whose creating update failed
    ///
    /// Slots are only cloned under the map lock, so a strong count of two (map and caller)
    /// means no other update is waiting on it.
    fn discard_if_empty(&self, key: &Key, slot: &Slot) -> Result<(), WasmSubstrateError> {
        let mut slots = self.slots.lock().map_err(|_| poisoned())?;
        if Arc::strong_count(slot) == 2 && slot.lock().map_err(|_| poisoned())?.is_none() {
            slots.remove(key);
        }
        Ok(())
    }
}

impl ApprovalStore for InMemoryApprovalStore {
    fn load(
        &self,
        multisig: &AccountId,
        call_hash: &H256,
    ) -> Result<Option<MultisigCall>, WasmSubstrateError> {
        let slot = {
            let slots = self.slots.lock().map_err(|_| poisoned())?;
            slots.get(&(*multisig, *call_hash)).cloned()
        };
        match slot {
            Some(slot) => Ok(slot.lock().map_err(|_| poisoned())?.clone()),
            None => Ok(None),
        }
    }

    fn compare_and_update(
        &self,
        multisig: &AccountId,
        call_hash: &H256,
        update: &mut RecordUpdate<'_>,
    ) -> Result<MultisigCall, WasmSubstrateError> {
        let key = (*multisig, *call_hash);
        let slot = self.slot_or_insert(key)?;
        let mut record = slot.lock().map_err(|_| poisoned())?;
        match update(record.clone()) {
            Ok(next) => {
                *record = Some(next.clone());
                Ok(next)
            }
            Err(err) => {
                let created = record.is_none();
                drop(record);
                if created {
                    self.discard_if_empty(&key, &slot)?;
                }
                Err(err)
            }
        }
    }
}

fn poisoned() -> WasmSubstrateError {
    WasmSubstrateError::InvalidMultisig("approval store lock poisoned".to_string())
}
