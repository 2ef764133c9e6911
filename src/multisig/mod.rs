//! Threshold multisig accounts and the approval records kept for each call

pub mod coordinator;
pub mod store;

pub use coordinator::MultisigCoordinator;
pub use store::{ApprovalStore, InMemoryApprovalStore, RecordUpdate};

pub use crate::builder::calls::Timepoint;

use crate::address::AccountId;
use crate::error::WasmSubstrateError;
use crate::transaction::blake2_256;
use crate::types::{serialize_hex_bytes, u128_string, H256};
use parity_scale_codec::Encode;
use serde::Serialize;
use std::collections::BTreeSet;

/// Upper bound on signatories, matching the pallet's `MaxSignatories`
pub const MAX_SIGNATORIES: usize = 100;

const MULTISIG_PREFIX: &[u8] = b"modlpy/utilisuba";

/// A threshold account over a sorted, deduplicated signatory set
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MultisigAccount {
    signatories: Vec<AccountId>,
    threshold: u16,
}

impl MultisigAccount {
    pub fn new(mut signatories: Vec<AccountId>, threshold: u16) -> Result<Self, WasmSubstrateError> {
        signatories.sort();
        signatories.dedup();
        if signatories.is_empty() {
            return Err(WasmSubstrateError::InvalidMultisig(
                "at least one signatory is required".to_string(),
            ));
        }
        if signatories.len() > MAX_SIGNATORIES {
            return Err(WasmSubstrateError::InvalidMultisig(format!(
                "{} signatories exceeds the maximum of {}",
                signatories.len(),
                MAX_SIGNATORIES
            )));
        }
        if threshold == 0 || threshold as usize > signatories.len() {
            return Err(WasmSubstrateError::InvalidMultisig(format!(
                "threshold {} must be between 1 and {}",
                threshold,
                signatories.len()
            )));
        }
        Ok(MultisigAccount {
            signatories,
            threshold,
        })
    }

    pub fn signatories(&self) -> &[AccountId] {
        &self.signatories
    }

    pub fn threshold(&self) -> u16 {
        self.threshold
    }

    pub fn is_signatory(&self, account: &AccountId) -> bool {
        self.signatories.binary_search(account).is_ok()
    }

    /// Signatories other than `who`, in the order the multisig pallet expects
    pub fn other_signatories(&self, who: &AccountId) -> Vec<AccountId> {
        self.signatories
            .iter()
            .filter(|s| *s != who)
            .copied()
            .collect()
    }

    /// On-chain account id: blake2_256("modlpy/utilisuba" ++ signatories ++ threshold)
    pub fn account_id(&self) -> AccountId {
        let mut data = MULTISIG_PREFIX.to_vec();
        let raw: Vec<[u8; 32]> = self.signatories.iter().map(|s| s.0).collect();
        raw.encode_to(&mut data);
        self.threshold.encode_to(&mut data);
        AccountId(blake2_256(&data))
    }
}

/// Hash identifying a multisig call: blake2_256 of its encoded call data
pub fn call_hash(call_data: &[u8]) -> H256 {
    H256(blake2_256(call_data))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MultisigState {
    /// No approvals recorded yet
    Pending,
    Approving,
    /// Threshold reached, waiting for the call data to execute
    Executable,
    Executed,
    Cancelled,
}

impl MultisigState {
    pub fn is_terminal(self) -> bool {
        matches!(self, MultisigState::Executed | MultisigState::Cancelled)
    }
}

/// Approval record for one call hash of one multisig account
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MultisigCall {
    pub call_hash: H256,
    pub threshold: u16,
    pub signatories: Vec<AccountId>,
    pub approvals: BTreeSet<AccountId>,
    /// Timepoint of the first approval
    pub when: Timepoint,
    pub depositor: AccountId,
    #[serde(with = "u128_string")]
    pub deposit: u128,
    #[serde(serialize_with = "serialize_call_data")]
    pub call_data: Option<Vec<u8>>,
    pub state: MultisigState,
}

impl MultisigCall {
    pub fn approval_count(&self) -> usize {
        self.approvals.len()
    }

    pub fn threshold_reached(&self) -> bool {
        self.approvals.len() >= self.threshold as usize
    }
}

fn serialize_call_data<S: serde::Serializer>(
    data: &Option<Vec<u8>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match data {
        Some(bytes) => serialize_hex_bytes(bytes, serializer),
        None => serializer.serialize_none(),
    }
}

/// Result of a successful approval
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ApprovalOutcome {
    Recorded { approvals: usize, threshold: u16 },
    /// Enough approvals; execution needs the call data
    ThresholdReached { approvals: usize },
    /// This approval executed the call; dispatch `call_data`
    Executed {
        call_hash: H256,
        #[serde(serialize_with = "serialize_hex_bytes")]
        call_data: Vec<u8>,
    },
}
