//! Ready-made call descriptors for common pallets
//!
//! `calls::transfer_keep_alive(&dest, amount)` reads the way the chain's own call does. The
//! descriptors are still checked against the metadata when built.

use crate::address::AccountId;
use crate::builder::types::CallDescriptor;
use crate::codec::Value;

/// Where staking rewards are paid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewardDestination {
    Staked,
    Stash,
    Controller,
    Account(AccountId),
    None,
}

/// Block height and extrinsic index of the first multisig approval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Timepoint {
    pub height: u32,
    pub index: u32,
}

impl Timepoint {
    pub fn to_value(&self) -> Value {
        Value::named_composite(vec![
            ("height", Value::u128(self.height as u128)),
            ("index", Value::u128(self.index as u128)),
        ])
    }
}

/// Weight limit for dispatching a multisig call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Weight {
    pub ref_time: u64,
    pub proof_size: u64,
}

impl Weight {
    pub fn to_value(&self) -> Value {
        Value::named_composite(vec![
            ("ref_time", Value::u128(self.ref_time as u128)),
            ("proof_size", Value::u128(self.proof_size as u128)),
        ])
    }
}

// =============================================================================
// Balances pallet
// =============================================================================

pub fn transfer_keep_alive(dest: &AccountId, value: u128) -> CallDescriptor {
    balances("transfer_keep_alive", dest, value)
}

pub fn transfer_allow_death(dest: &AccountId, value: u128) -> CallDescriptor {
    balances("transfer_allow_death", dest, value)
}

pub fn transfer_all(dest: &AccountId, keep_alive: bool) -> CallDescriptor {
    CallDescriptor::new(
        "Balances",
        "transfer_all",
        vec![Value::address(dest), Value::bool(keep_alive)],
    )
}

fn balances(call: &str, dest: &AccountId, value: u128) -> CallDescriptor {
    CallDescriptor::new("Balances", call, vec![Value::address(dest), Value::u128(value)])
}

// =============================================================================
// System pallet
// =============================================================================

pub fn remark(data: impl Into<Vec<u8>>) -> CallDescriptor {
    CallDescriptor::new("System", "remark", vec![Value::from_bytes(data)])
}

// =============================================================================
// Staking pallet
// =============================================================================

pub fn bond(value: u128, payee: RewardDestination) -> CallDescriptor {
    let payee = match payee {
        RewardDestination::Staked => Value::unnamed_variant("Staked", vec![]),
        RewardDestination::Stash => Value::unnamed_variant("Stash", vec![]),
        RewardDestination::Controller => Value::unnamed_variant("Controller", vec![]),
        RewardDestination::Account(account) => {
            Value::unnamed_variant("Account", vec![Value::account(&account)])
        }
        RewardDestination::None => Value::unnamed_variant("None", vec![]),
    };
    CallDescriptor::new("Staking", "bond", vec![Value::u128(value), payee])
}

pub fn chill() -> CallDescriptor {
    CallDescriptor::new("Staking", "chill", vec![])
}

// =============================================================================
// Utility pallet
// =============================================================================

/// Dispatch calls in order, stopping at the first failure
pub fn batch(calls: Vec<CallDescriptor>) -> CallDescriptor {
    utility("batch", calls)
}

/// Dispatch calls atomically
pub fn batch_all(calls: Vec<CallDescriptor>) -> CallDescriptor {
    utility("batch_all", calls)
}

fn utility(call: &str, calls: Vec<CallDescriptor>) -> CallDescriptor {
    CallDescriptor::new(
        "Utility",
        call,
        vec![Value::Sequence(calls.into_iter().map(Value::call).collect())],
    )
}

// =============================================================================
// Multisig pallet
// =============================================================================

pub fn as_multi_threshold_1(other_signatories: &[AccountId], call: CallDescriptor) -> CallDescriptor {
    CallDescriptor::new(
        "Multisig",
        "as_multi_threshold_1",
        vec![signatories(other_signatories), Value::call(call)],
    )
}

/// Approve and, once the threshold is met, dispatch `call`
pub fn as_multi(
    threshold: u16,
    other_signatories: &[AccountId],
    maybe_timepoint: Option<Timepoint>,
    call: CallDescriptor,
    max_weight: Weight,
) -> CallDescriptor {
    CallDescriptor::new(
        "Multisig",
        "as_multi",
        vec![
            Value::u128(threshold as u128),
            signatories(other_signatories),
            timepoint(maybe_timepoint),
            Value::call(call),
            max_weight.to_value(),
        ],
    )
}

/// Approve by call hash only
pub fn approve_as_multi(
    threshold: u16,
    other_signatories: &[AccountId],
    maybe_timepoint: Option<Timepoint>,
    call_hash: [u8; 32],
    max_weight: Weight,
) -> CallDescriptor {
    CallDescriptor::new(
        "Multisig",
        "approve_as_multi",
        vec![
            Value::u128(threshold as u128),
            signatories(other_signatories),
            timepoint(maybe_timepoint),
            Value::from_bytes(call_hash.to_vec()),
            max_weight.to_value(),
        ],
    )
}

pub fn cancel_as_multi(
    threshold: u16,
    other_signatories: &[AccountId],
    timepoint: Timepoint,
    call_hash: [u8; 32],
) -> CallDescriptor {
    CallDescriptor::new(
        "Multisig",
        "cancel_as_multi",
        vec![
            Value::u128(threshold as u128),
            signatories(other_signatories),
            timepoint.to_value(),
            Value::from_bytes(call_hash.to_vec()),
        ],
    )
}

// =============================================================================
// Helpers
// =============================================================================

/// The pallet requires other signatories in ascending order
fn signatories(accounts: &[AccountId]) -> Value {
    let mut sorted = accounts.to_vec();
    sorted.sort();
    Value::Sequence(sorted.iter().map(Value::account).collect())
}

fn timepoint(maybe: Option<Timepoint>) -> Value {
    match maybe {
        Some(tp) => Value::some(tp.to_value()),
        None => Value::none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{alice, bob, test_registry, BOB_HEX};
    use rstest::rstest;

    fn encode(call: &CallDescriptor) -> String {
        hex::encode(test_registry().encode_call(call).unwrap())
    }

    #[test]
    fn test_transfer_keep_alive_golden() {
        assert_eq!(
            encode(&transfer_keep_alive(&bob(), 100_000_000_000)),
            format!("050300{}0700e8764817", &BOB_HEX[2..])
        );
    }

    #[rstest]
    #[case::allow_death(transfer_allow_death(&bob(), 1), format!("050000{}04", &BOB_HEX[2..]))]
    #[case::transfer_all(transfer_all(&bob(), true), format!("050400{}01", &BOB_HEX[2..]))]
    #[case::remark(remark(b"hi".to_vec()), "0000086869".to_string())]
    #[case::chill(chill(), "0706".to_string())]
    #[case::bond_staked(bond(10, RewardDestination::Staked), "07002800".to_string())]
    #[case::bond_account(
        bond(10, RewardDestination::Account(bob())),
        format!("07002803{}", &BOB_HEX[2..])
    )]
    fn test_call_encoding(#[case] call: CallDescriptor, #[case] expected: String) {
        assert_eq!(encode(&call), expected);
    }

    #[test]
    fn test_batch_all_nests_calls() {
        let call = batch_all(vec![chill(), remark(vec![1])]);
        assert_eq!(encode(&call), "1a0208070600000401");
    }

    #[test]
    fn test_as_multi_threshold_1() {
        let call = as_multi_threshold_1(&[bob()], remark(b"hi".to_vec()));
        assert_eq!(encode(&call), format!("1e0004{}0000086869", &BOB_HEX[2..]));
    }

    #[test]
    fn test_as_multi_sorts_signatories() {
        // bob (0x8e..) sorts before alice (0xd4..)
        let call = as_multi(
            2,
            &[alice(), bob()],
            Some(Timepoint { height: 1, index: 2 }),
            chill(),
            Weight::default(),
        );
        let encoded = encode(&call);
        let alice_hex = &crate::test_utils::ALICE_HEX[2..];
        let expected = format!(
            "1e01020008{}{}01{}{}07060000",
            &BOB_HEX[2..],
            alice_hex,
            "01000000",
            "02000000"
        );
        assert_eq!(encoded, expected);
    }

    #[test]
    fn test_approve_and_cancel_as_multi() {
        let hash = [7u8; 32];
        let approve = approve_as_multi(2, &[bob()], None, hash, Weight { ref_time: 1, proof_size: 0 });
        assert_eq!(
            encode(&approve),
            format!("1e02020004{}00{}0400", &BOB_HEX[2..], hex::encode(hash))
        );

        let cancel = cancel_as_multi(2, &[bob()], Timepoint { height: 5, index: 0 }, hash);
        assert_eq!(
            encode(&cancel),
            format!("1e03020004{}0500000000000000{}", &BOB_HEX[2..], hex::encode(hash))
        );
    }
}
