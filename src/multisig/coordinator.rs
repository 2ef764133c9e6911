//! Threshold approval workflow
//!
//! Independent sessions approve the same call hash through a shared `ApprovalStore`. Every
//! transition is a single `compare_and_update`, so the outcome depends only on which signers
//! approved and never on the order they arrived in.

use super::{
    call_hash, ApprovalOutcome, ApprovalStore, MultisigAccount, MultisigCall, MultisigState,
    Timepoint,
};
use crate::address::AccountId;
use crate::builder::calls::{self, Weight};
use crate::builder::types::CallDescriptor;
use crate::codec::TypeRegistry;
use crate::error::WasmSubstrateError;
use crate::types::{DepositConfig, H256};
use std::collections::BTreeSet;

pub struct MultisigCoordinator<S> {
    account: MultisigAccount,
    account_id: AccountId,
    deposit: DepositConfig,
    store: S,
}

impl<S: ApprovalStore> MultisigCoordinator<S> {
    pub fn new(account: MultisigAccount, deposit: DepositConfig, store: S) -> Self {
        let account_id = account.account_id();
        MultisigCoordinator {
            account,
            account_id,
            deposit,
            store,
        }
    }

    pub fn account(&self) -> &MultisigAccount {
        &self.account
    }

    /// On-chain id of the multisig account
    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Approve a call by hash
    ///
    /// The first approval opens the record and makes `signer` the depositor. `when` is only
    /// used for that first approval.
    pub fn approve(
        &self,
        signer: &AccountId,
        call_hash: &H256,
        when: Timepoint,
    ) -> Result<ApprovalOutcome, WasmSubstrateError> {
        self.ensure_signatory(signer)?;
        let record = self
            .store
            .compare_and_update(&self.account_id, call_hash, &mut |current| {
                let mut record = self.open(current, signer, call_hash, when)?;
                if !record.approvals.insert(*signer) {
                    return Err(WasmSubstrateError::AlreadyApproved {
                        signer: *signer,
                        call_hash: *call_hash,
                    });
                }
                record.state = if record.threshold_reached() {
                    MultisigState::Executable
                } else {
                    MultisigState::Approving
                };
                Ok(record)
            })?;
        let outcome = if record.state == MultisigState::Executable {
            ApprovalOutcome::ThresholdReached {
                approvals: record.approval_count(),
            }
        } else {
            ApprovalOutcome::Recorded {
                approvals: record.approval_count(),
                threshold: record.threshold,
            }
        };
        log::debug!("{} approved {} for {}: {:?}", signer, call_hash, self.account_id, outcome);
        Ok(outcome)
    }

    /// Approve with the call data, executing once the threshold is met
    ///
    /// A signer who already approved may supply the call data after the threshold was reached
    /// by others; that executes without adding an approval.
    pub fn approve_and_execute(
        &self,
        signer: &AccountId,
        expected_hash: &H256,
        call_data: &[u8],
        when: Timepoint,
    ) -> Result<ApprovalOutcome, WasmSubstrateError> {
        self.ensure_signatory(signer)?;
        let actual = call_hash(call_data);
        if actual != *expected_hash {
            return Err(WasmSubstrateError::CallHashMismatch {
                expected: *expected_hash,
                actual,
            });
        }

        let record = self
            .store
            .compare_and_update(&self.account_id, expected_hash, &mut |current| {
                let mut record = self.open(current, signer, expected_hash, when)?;
                let newly_approved = record.approvals.insert(*signer);
                if !newly_approved && !record.threshold_reached() {
                    return Err(WasmSubstrateError::AlreadyApproved {
                        signer: *signer,
                        call_hash: *expected_hash,
                    });
                }
                record.call_data = Some(call_data.to_vec());
                record.state = if record.threshold_reached() {
                    MultisigState::Executed
                } else {
                    MultisigState::Approving
                };
                Ok(record)
            })?;
        let outcome = if record.state == MultisigState::Executed {
            ApprovalOutcome::Executed {
                call_hash: *expected_hash,
                call_data: call_data.to_vec(),
            }
        } else {
            ApprovalOutcome::Recorded {
                approvals: record.approval_count(),
                threshold: record.threshold,
            }
        };

        if let ApprovalOutcome::Executed { .. } = outcome {
            log::info!("Multisig {} executed call {}", self.account_id, expected_hash);
        }
        Ok(outcome)
    }

    /// Cancel a call that is still collecting approvals; only its depositor may do so
    pub fn cancel(&self, signer: &AccountId, call_hash: &H256) -> Result<(), WasmSubstrateError> {
        self.store
            .compare_and_update(&self.account_id, call_hash, &mut |current| {
                let mut record = current.ok_or(WasmSubstrateError::MultisigNotFound(*call_hash))?;
                ensure_open(&record)?;
                if record.state != MultisigState::Approving {
                    return Err(WasmSubstrateError::InvalidMultisig(format!(
                        "call {} has reached its threshold and can no longer be cancelled",
                        call_hash
                    )));
                }
                if record.depositor != *signer {
                    return Err(WasmSubstrateError::NotDepositor {
                        signer: *signer,
                        call_hash: *call_hash,
                    });
                }
                record.state = MultisigState::Cancelled;
                Ok(record)
            })?;
        log::info!("Multisig {} cancelled call {}", self.account_id, call_hash);
        Ok(())
    }

    pub fn state(&self, call_hash: &H256) -> Result<MultisigState, WasmSubstrateError> {
        Ok(self
            .get(call_hash)?
            .map_or(MultisigState::Pending, |record| record.state))
    }

    pub fn get(&self, call_hash: &H256) -> Result<Option<MultisigCall>, WasmSubstrateError> {
        self.store.load(&self.account_id, call_hash)
    }

    /// Multisig pallet call that records `signer`'s approval of `call` on chain
    ///
    /// Threshold 1 dispatches directly. Otherwise the first approval omits the timepoint and
    /// later ones reference the timepoint of the first.
    pub fn pallet_call(
        &self,
        signer: &AccountId,
        call: CallDescriptor,
        registry: &TypeRegistry,
        max_weight: Weight,
    ) -> Result<CallDescriptor, WasmSubstrateError> {
        self.ensure_signatory(signer)?;
        let others = self.account.other_signatories(signer);
        let threshold = self.account.threshold();
        if threshold == 1 {
            return Ok(calls::as_multi_threshold_1(&others, call));
        }

        let hash = call_hash(&registry.encode_call(&call)?);
        let record = self.get(&hash)?;
        if let Some(record) = &record {
            ensure_open(record)?;
        }
        let timepoint = record.as_ref().map(|r| r.when);
        let is_final = record
            .as_ref()
            .is_some_and(|r| r.approval_count() + 1 >= threshold as usize);
        if is_final {
            Ok(calls::as_multi(threshold, &others, timepoint, call, max_weight))
        } else {
            Ok(calls::approve_as_multi(threshold, &others, timepoint, hash.0, max_weight))
        }
    }

    fn ensure_signatory(&self, signer: &AccountId) -> Result<(), WasmSubstrateError> {
        if self.account.is_signatory(signer) {
            Ok(())
        } else {
            Err(WasmSubstrateError::NotASignatory(*signer))
        }
    }

    /// Existing open record, or a fresh one with `signer` as depositor
    fn open(
        &self,
        current: Option<MultisigCall>,
        signer: &AccountId,
        call_hash: &H256,
        when: Timepoint,
    ) -> Result<MultisigCall, WasmSubstrateError> {
        match current {
            Some(record) => {
                ensure_open(&record)?;
                Ok(record)
            }
            None => {
                let threshold = self.account.threshold();
                Ok(MultisigCall {
                    call_hash: *call_hash,
                    threshold,
                    signatories: self.account.signatories().to_vec(),
                    approvals: BTreeSet::new(),
                    when,
                    depositor: *signer,
                    deposit: self.deposit.deposit_for(threshold),
                    call_data: None,
                    state: MultisigState::Pending,
                })
            }
        }
    }
}

fn ensure_open(record: &MultisigCall) -> Result<(), WasmSubstrateError> {
    match record.state {
        MultisigState::Executed => Err(WasmSubstrateError::AlreadyExecuted(record.call_hash)),
        MultisigState::Cancelled => Err(WasmSubstrateError::AlreadyCancelled(record.call_hash)),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multisig::InMemoryApprovalStore;
    use crate::test_utils::{account, alice, bob, test_registry};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const WHEN: Timepoint = Timepoint { height: 100, index: 2 };

    fn charlie() -> AccountId {
        account(0x33)
    }

    fn deposit() -> DepositConfig {
        DepositConfig {
            base: 1_000,
            factor: 10,
        }
    }

    fn coordinator(threshold: u16) -> MultisigCoordinator<InMemoryApprovalStore> {
        let account = MultisigAccount::new(vec![alice(), bob(), charlie()], threshold).unwrap();
        MultisigCoordinator::new(account, deposit(), InMemoryApprovalStore::new())
    }

    fn chill_call() -> (Vec<u8>, H256) {
        let call = test_registry().encode_call(&calls::chill()).unwrap();
        let hash = call_hash(&call);
        (call, hash)
    }

    #[test]
    fn test_two_of_three_flow() {
        let coordinator = coordinator(2);
        let (call, hash) = chill_call();
        assert_eq!(coordinator.state(&hash).unwrap(), MultisigState::Pending);

        let first = coordinator.approve(&alice(), &hash, WHEN).unwrap();
        assert_eq!(first, ApprovalOutcome::Recorded { approvals: 1, threshold: 2 });
        assert_eq!(coordinator.state(&hash).unwrap(), MultisigState::Approving);

        let record = coordinator.get(&hash).unwrap().unwrap();
        assert_eq!(record.depositor, alice());
        assert_eq!(record.deposit, 1_020);
        assert_eq!(record.when, WHEN);

        assert_eq!(
            coordinator.approve(&alice(), &hash, WHEN),
            Err(WasmSubstrateError::AlreadyApproved {
                signer: alice(),
                call_hash: hash
            })
        );

        let executed = coordinator.approve_and_execute(&bob(), &hash, &call, WHEN).unwrap();
        assert_eq!(
            executed,
            ApprovalOutcome::Executed {
                call_hash: hash,
                call_data: call.clone()
            }
        );
        assert_eq!(coordinator.state(&hash).unwrap(), MultisigState::Executed);

        assert_eq!(
            coordinator.approve(&charlie(), &hash, WHEN),
            Err(WasmSubstrateError::AlreadyExecuted(hash))
        );
    }

    #[test]
    fn test_executable_without_call_data() {
        let coordinator = coordinator(2);
        let (call, hash) = chill_call();
        coordinator.approve(&alice(), &hash, WHEN).unwrap();
        let outcome = coordinator.approve(&bob(), &hash, WHEN).unwrap();
        assert_eq!(outcome, ApprovalOutcome::ThresholdReached { approvals: 2 });
        assert_eq!(coordinator.state(&hash).unwrap(), MultisigState::Executable);

        // an existing approver supplies the call data
        let outcome = coordinator.approve_and_execute(&alice(), &hash, &call, WHEN).unwrap();
        assert!(matches!(outcome, ApprovalOutcome::Executed { .. }));
    }

    #[test]
    fn test_repeat_approver_before_threshold() {
        let coordinator = coordinator(3);
        let (call, hash) = chill_call();
        coordinator.approve(&alice(), &hash, WHEN).unwrap();
        assert!(matches!(
            coordinator.approve_and_execute(&alice(), &hash, &call, WHEN),
            Err(WasmSubstrateError::AlreadyApproved { .. })
        ));
    }

    #[test]
    fn test_not_a_signatory() {
        let coordinator = coordinator(2);
        let (_, hash) = chill_call();
        assert_eq!(
            coordinator.approve(&account(9), &hash, WHEN),
            Err(WasmSubstrateError::NotASignatory(account(9)))
        );
    }

    #[test]
    fn test_call_hash_mismatch() {
        let coordinator = coordinator(2);
        let (_, hash) = chill_call();
        let err = coordinator
            .approve_and_execute(&alice(), &hash, &[0x07, 0x07], WHEN)
            .unwrap_err();
        assert!(matches!(err, WasmSubstrateError::CallHashMismatch { .. }));
        assert_eq!(coordinator.state(&hash).unwrap(), MultisigState::Pending);
    }

    #[test]
    fn test_cancel() {
        let coordinator = coordinator(2);
        let (call, hash) = chill_call();
        assert_eq!(
            coordinator.cancel(&alice(), &hash),
            Err(WasmSubstrateError::MultisigNotFound(hash))
        );

        coordinator.approve(&alice(), &hash, WHEN).unwrap();
        assert!(matches!(
            coordinator.cancel(&bob(), &hash),
            Err(WasmSubstrateError::NotDepositor { .. })
        ));
        coordinator.cancel(&alice(), &hash).unwrap();
        assert_eq!(coordinator.state(&hash).unwrap(), MultisigState::Cancelled);

        assert_eq!(
            coordinator.approve_and_execute(&bob(), &hash, &call, WHEN),
            Err(WasmSubstrateError::AlreadyCancelled(hash))
        );
        assert_eq!(
            coordinator.cancel(&alice(), &hash),
            Err(WasmSubstrateError::AlreadyCancelled(hash))
        );
    }

    #[test]
    fn test_cancel_after_threshold_is_rejected() {
        let coordinator = coordinator(2);
        let (call, hash) = chill_call();
        coordinator.approve(&alice(), &hash, WHEN).unwrap();
        coordinator.approve(&bob(), &hash, WHEN).unwrap();
        assert_eq!(coordinator.state(&hash).unwrap(), MultisigState::Executable);

        assert!(matches!(
            coordinator.cancel(&alice(), &hash),
            Err(WasmSubstrateError::InvalidMultisig(_))
        ));
        assert_eq!(coordinator.state(&hash).unwrap(), MultisigState::Executable);
        let outcome = coordinator.approve_and_execute(&bob(), &hash, &call, WHEN).unwrap();
        assert!(matches!(outcome, ApprovalOutcome::Executed { .. }));
    }

    #[test]
    fn test_rejected_first_approval_leaves_no_record() {
        let coordinator = coordinator(2);
        let (_, hash) = chill_call();
        let err = coordinator
            .approve_and_execute(&alice(), &hash, &[0x07, 0x07], WHEN)
            .unwrap_err();
        assert!(matches!(err, WasmSubstrateError::CallHashMismatch { .. }));
        assert!(coordinator.cancel(&alice(), &hash).is_err());
        for _ in 0..100 {
            coordinator.state(&hash).unwrap();
        }
        assert!(coordinator.store().is_empty());
    }

    #[test]
    fn test_sessions_share_a_dyn_store() {
        let store: Arc<dyn ApprovalStore> = Arc::new(InMemoryApprovalStore::new());
        let account = MultisigAccount::new(vec![alice(), bob(), charlie()], 2).unwrap();
        let first = MultisigCoordinator::new(account.clone(), deposit(), Arc::clone(&store));
        let second = MultisigCoordinator::new(account, deposit(), Arc::clone(&store));
        let (call, hash) = chill_call();

        first.approve(&alice(), &hash, WHEN).unwrap();
        let outcome = second.approve_and_execute(&bob(), &hash, &call, WHEN).unwrap();
        assert!(matches!(outcome, ApprovalOutcome::Executed { .. }));
        assert_eq!(first.state(&hash).unwrap(), MultisigState::Executed);
    }

    #[test]
    fn test_threshold_one_executes_immediately() {
        let coordinator = coordinator(1);
        let (call, hash) = chill_call();
        let outcome = coordinator.approve_and_execute(&charlie(), &hash, &call, WHEN).unwrap();
        assert!(matches!(outcome, ApprovalOutcome::Executed { .. }));
        let record = coordinator.get(&hash).unwrap().unwrap();
        assert_eq!(record.deposit, 1_010);
        assert_eq!(record.call_data, Some(call));
    }

    #[test]
    fn test_order_independent() {
        let (call, hash) = chill_call();
        for order in [[alice(), bob()], [bob(), alice()], [charlie(), alice()]] {
            let coordinator = coordinator(2);
            coordinator.approve(&order[0], &hash, WHEN).unwrap();
            let outcome = coordinator.approve_and_execute(&order[1], &hash, &call, WHEN).unwrap();
            assert!(matches!(outcome, ApprovalOutcome::Executed { .. }));
        }
    }

    #[test]
    fn test_concurrent_final_approvals_execute_once() {
        let coordinator = Arc::new(coordinator(2));
        let (call, hash) = chill_call();
        coordinator.approve(&alice(), &hash, WHEN).unwrap();

        let executed = AtomicUsize::new(0);
        std::thread::scope(|scope| {
            for signer in [bob(), charlie(), alice()] {
                let coordinator = Arc::clone(&coordinator);
                let (call, executed) = (&call, &executed);
                scope.spawn(move || {
                    if let Ok(ApprovalOutcome::Executed { .. }) =
                        coordinator.approve_and_execute(&signer, &hash, call, WHEN)
                    {
                        executed.fetch_add(1, Ordering::SeqCst);
                    }
                });
            }
        });
        assert_eq!(executed.load(Ordering::SeqCst), 1);
        assert_eq!(coordinator.state(&hash).unwrap(), MultisigState::Executed);
    }

    #[test]
    fn test_pallet_call_progression() {
        let registry = test_registry();
        let coordinator = coordinator(2);
        let (call, hash) = chill_call();

        let first = coordinator
            .pallet_call(&alice(), calls::chill(), &registry, Weight::default())
            .unwrap();
        assert_eq!(first.call, "approve_as_multi");
        assert_eq!(first.args[2], crate::codec::Value::none());

        coordinator.approve(&alice(), &hash, WHEN).unwrap();
        let last = coordinator
            .pallet_call(&bob(), calls::chill(), &registry, Weight::default())
            .unwrap();
        assert_eq!(last.call, "as_multi");
        assert_eq!(last.args[2], crate::codec::Value::some(WHEN.to_value()));
        // encodes against the runtime
        registry.encode_call(&last).unwrap();

        coordinator.approve_and_execute(&bob(), &hash, &call, WHEN).unwrap();
        assert!(matches!(
            coordinator.pallet_call(&charlie(), calls::chill(), &registry, Weight::default()),
            Err(WasmSubstrateError::AlreadyExecuted(_))
        ));
    }

    #[test]
    fn test_pallet_call_threshold_one() {
        let coordinator = coordinator(1);
        let call = coordinator
            .pallet_call(&alice(), calls::chill(), &test_registry(), Weight::default())
            .unwrap();
        assert_eq!(call.call, "as_multi_threshold_1");
    }
}
