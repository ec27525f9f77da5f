//! Per-intent transaction orchestration.
//!
//! Each submitted [`TransactionIntent`] is driven through a fixed phase
//! sequence: guard, approval loop (ERC20 assets only), oracle refresh and
//! fee quote (borrow/repay only), the primary write, and confirmation.
//! Runs for different assets proceed concurrently; a second run for the
//! same (asset, action) pair is refused while the first is live. A run can
//! be dismissed at any suspension point — dismissal stops the client from
//! waiting but cannot recall a write that already left, so the terminal
//! state records whether one did.

use std::{collections::HashMap, future::Future};

use alloy::primitives::{Address, Bytes, B256, U256};
use dashmap::DashMap;
use meridian_oracle::PriceOracle;
use meridian_primitives::{Action, TransactionIntent};
use tokio::sync::{broadcast, oneshot, watch};
use tracing::{debug, info, instrument, warn};

use crate::{
    capacity::Capacity,
    classify::{classify, ClassifiedError},
    error::{EngineError, ValidationError},
    settlement::{Settlement, SettlementError},
};

/// The orchestration state machine. `Idle` is initial; `Confirmed`,
/// `Failed` and `Dismissed` are terminal for a given intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Approving { spender: Address },
    ApprovalConfirming { spender: Address, hash: B256 },
    PriceRefreshing,
    FeeQuoting,
    Submitting,
    Confirming { hash: B256 },
    Confirmed { hash: B256 },
    Failed,
    Dismissed { submitted: Option<B256> },
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Confirmed { .. } | Self::Failed | Self::Dismissed { .. }
        )
    }
}

/// Bounds the entry guard checks the intent amount against. All in token
/// base units; `borrowable` carries the capacity engine's explicit unknown
/// state through to the guard.
#[derive(Debug, Clone)]
pub struct IntentBounds {
    pub wallet_balance: U256,
    pub deposited: U256,
    pub owed: U256,
    pub borrowable: Capacity,
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Spenders the deposit path must have allowance for, in approval
    /// order. The deposit manager itself plus any routers.
    pub deposit_spenders: Vec<Address>,
    /// Spenders the repay path must have allowance for.
    pub repay_spenders: Vec<Address>,
    /// Actions that must carry a fresh oracle update.
    pub oracle_actions: Vec<Action>,
    /// Pyth feed id per token id.
    pub feed_ids: HashMap<B256, B256>,
    /// Permits the empty-payload fee fallback when feeds are pre-seeded.
    /// Never set outside test environments.
    pub test_mode: bool,
}

impl OrchestratorConfig {
    fn approval_spenders(&self, action: Action) -> &[Address] {
        match action {
            Action::Deposit => &self.deposit_spenders,
            Action::Repay => &self.repay_spenders,
            Action::Withdraw | Action::Borrow => &[],
        }
    }
}

/// Emitted after a confirmed write so the read side re-fetches snapshots.
/// The orchestrator owns no caches of reserves or positions.
#[derive(Debug, Clone)]
pub struct RefreshSignal {
    pub token_id: B256,
    pub action: Action,
}

/// Outcome of one orchestration run.
#[derive(Debug)]
pub struct RunReport {
    pub phase: Phase,
    /// The phase the run was in when it failed, for retrying that phase.
    pub failed_at: Option<Phase>,
    pub approval_hashes: Vec<B256>,
    pub write_hash: Option<B256>,
    pub error: Option<ClassifiedError>,
    /// True only after a confirmed write; on failure the user's input is
    /// kept so they can retry without retyping.
    pub input_cleared: bool,
}

/// One half of a dismissal pair; consuming it stops the owning run from
/// waiting at its next suspension point.
pub struct DismissHandle(oneshot::Sender<()>);

impl DismissHandle {
    pub fn dismiss(self) {
        let _ = self.0.send(());
    }
}

/// Receiver side of a dismissal pair. A dropped handle disarms the signal
/// rather than firing it.
pub struct DismissSignal {
    rx: Option<oneshot::Receiver<()>>,
}

impl DismissSignal {
    pub fn pair() -> (DismissHandle, Self) {
        let (tx, rx) = oneshot::channel();
        (DismissHandle(tx), Self { rx: Some(rx) })
    }

    /// A signal that can never fire, for runs without a dismissal surface.
    pub fn disarmed() -> Self {
        Self { rx: None }
    }

    async fn fired(&mut self) {
        if let Some(rx) = self.rx.as_mut() {
            if rx.await.is_ok() {
                return;
            }
            // Handle dropped without dismissing; never resolve again.
            self.rx = None;
        }
        std::future::pending::<()>().await
    }
}

enum Step<T> {
    Done(T),
    Dismissed,
}

/// Runs `fut` unless the dismiss signal fires first.
async fn race<T>(signal: &mut DismissSignal, fut: impl Future<Output = T>) -> Step<T> {
    tokio::select! {
        biased;
        _ = signal.fired() => Step::Dismissed,
        value = fut => Step::Done(value),
    }
}

struct PhaseTracker {
    current: Phase,
    tx: Option<watch::Sender<Phase>>,
}

impl PhaseTracker {
    fn new(tx: Option<watch::Sender<Phase>>) -> Self {
        Self {
            current: Phase::Idle,
            tx,
        }
    }

    fn set(&mut self, phase: Phase) {
        debug!(?phase, "orchestration phase");
        self.current = phase.clone();
        if let Some(tx) = &self.tx {
            let _ = tx.send(phase);
        }
    }
}

/// Removes the (asset, action) reservation when the run ends, however it
/// ends.
struct RunSlot<'a> {
    active: &'a DashMap<(B256, Action), ()>,
    key: (B256, Action),
}

impl Drop for RunSlot<'_> {
    fn drop(&mut self) {
        self.active.remove(&self.key);
    }
}

pub struct Orchestrator<S, O> {
    settlement: S,
    oracle: O,
    config: OrchestratorConfig,
    active: DashMap<(B256, Action), ()>,
    refresh: broadcast::Sender<RefreshSignal>,
}

impl<S: Settlement, O: PriceOracle> Orchestrator<S, O> {
    pub fn new(settlement: S, oracle: O, config: OrchestratorConfig) -> Self {
        let (refresh, _) = broadcast::channel(32);
        Self {
            settlement,
            oracle,
            config,
            active: DashMap::new(),
            refresh,
        }
    }

    pub fn settlement(&self) -> &S {
        &self.settlement
    }

    /// Subscribes to post-confirmation refresh signals.
    pub fn subscribe_refresh(&self) -> broadcast::Receiver<RefreshSignal> {
        self.refresh.subscribe()
    }

    /// Drives an intent to a terminal state without a dismissal surface.
    pub async fn execute(&self, intent: TransactionIntent, bounds: IntentBounds) -> RunReport {
        self.execute_with(intent, bounds, None, DismissSignal::disarmed())
            .await
    }

    /// Drives an intent to a terminal state, reporting phase transitions on
    /// `phases` and honoring the dismiss signal at every suspension point.
    #[instrument(skip_all, fields(action = %intent.action, token_id = %intent.token_id))]
    pub async fn execute_with(
        &self,
        intent: TransactionIntent,
        bounds: IntentBounds,
        phases: Option<watch::Sender<Phase>>,
        mut dismiss: DismissSignal,
    ) -> RunReport {
        let mut tracker = PhaseTracker::new(phases);
        let mut report = RunReport {
            phase: Phase::Idle,
            failed_at: None,
            approval_hashes: Vec::new(),
            write_hash: None,
            error: None,
            input_cleared: false,
        };

        // Entry guard: validation failures never reach the network.
        if let Err(err) = self.validate(&intent, &bounds) {
            return finish_failed(&mut tracker, report, err);
        }
        let _slot = match self.acquire_slot(intent.token_id, intent.action) {
            Ok(slot) => slot,
            Err(err) => return finish_failed(&mut tracker, report, err.into()),
        };

        // Approval loop. The native asset has no ERC20 contract and skips
        // this branch entirely. Allowances are read fresh on every run.
        if intent.token != Address::ZERO {
            let owner = self.settlement.signer_address();
            for &spender in self.config.approval_spenders(intent.action) {
                let allowance = match race(
                    &mut dismiss,
                    self.settlement.allowance(intent.token, owner, spender),
                )
                .await
                {
                    Step::Dismissed => return finish_dismissed(&mut tracker, report),
                    Step::Done(Ok(allowance)) => allowance,
                    Step::Done(Err(err)) => return finish_failed(&mut tracker, report, err.into()),
                };
                if allowance >= intent.amount {
                    continue;
                }

                tracker.set(Phase::Approving { spender });
                let hash = match race(
                    &mut dismiss,
                    self.settlement
                        .submit_approval(intent.token, spender, intent.amount),
                )
                .await
                {
                    Step::Dismissed => return finish_dismissed(&mut tracker, report),
                    Step::Done(Ok(hash)) => hash,
                    Step::Done(Err(err)) => return finish_failed(&mut tracker, report, err.into()),
                };
                report.approval_hashes.push(hash);

                tracker.set(Phase::ApprovalConfirming { spender, hash });
                match race(&mut dismiss, self.settlement.confirm(hash)).await {
                    Step::Dismissed => return finish_dismissed(&mut tracker, report),
                    Step::Done(Ok(())) => {}
                    Step::Done(Err(err)) => return finish_failed(&mut tracker, report, err.into()),
                }
            }
        }

        // Oracle refresh happens only now, after a write is actually about
        // to go out: update data goes stale within the confirmation window,
        // so fetching it eagerly would waste the freshness it exists for.
        let (update_data, price_ids, fee) = if self.config.oracle_actions.contains(&intent.action)
        {
            let feed = match self.config.feed_ids.get(&intent.token_id) {
                Some(feed) => *feed,
                None => {
                    return finish_failed(
                        &mut tracker,
                        report,
                        ValidationError::MissingFeedId(intent.token_id).into(),
                    )
                }
            };

            tracker.set(Phase::PriceRefreshing);
            let update = match race(&mut dismiss, self.oracle.latest_update(&[feed])).await {
                Step::Dismissed => return finish_dismissed(&mut tracker, report),
                Step::Done(Ok(update)) => update,
                Step::Done(Err(err)) => return finish_failed(&mut tracker, report, err.into()),
            };

            tracker.set(Phase::FeeQuoting);
            let fee_step = race(&mut dismiss, self.oracle.update_fee(&update.data)).await;
            match fee_step {
                Step::Dismissed => return finish_dismissed(&mut tracker, report),
                Step::Done(Ok(fee)) => (update.data, vec![feed], fee),
                Step::Done(Err(err)) if self.config.test_mode => {
                    // Feeds are pre-seeded in test environments, so the
                    // write can proceed without an update payload.
                    warn!(error = %err, "fee quote failed; continuing with empty update payload");
                    (Vec::new(), vec![feed], U256::ZERO)
                }
                Step::Done(Err(err)) => return finish_failed(&mut tracker, report, err.into()),
            }
        } else {
            (Vec::new(), Vec::new(), U256::ZERO)
        };

        tracker.set(Phase::Submitting);
        let hash = match race(
            &mut dismiss,
            self.submit(&intent, update_data, price_ids, fee),
        )
        .await
        {
            Step::Dismissed => return finish_dismissed(&mut tracker, report),
            Step::Done(Ok(hash)) => hash,
            Step::Done(Err(err)) => return finish_failed(&mut tracker, report, err.into()),
        };
        report.write_hash = Some(hash);

        tracker.set(Phase::Confirming { hash });
        match race(&mut dismiss, self.settlement.confirm(hash)).await {
            Step::Dismissed => return finish_dismissed(&mut tracker, report),
            Step::Done(Ok(())) => {}
            Step::Done(Err(err)) => return finish_failed(&mut tracker, report, err.into()),
        }

        tracker.set(Phase::Confirmed { hash });
        report.input_cleared = true;
        let _ = self.refresh.send(RefreshSignal {
            token_id: intent.token_id,
            action: intent.action,
        });
        info!(%hash, "intent confirmed");
        report.phase = tracker.current.clone();
        report
    }

    fn validate(&self, intent: &TransactionIntent, bounds: &IntentBounds) -> Result<(), EngineError> {
        if intent.amount.is_zero() {
            return Err(ValidationError::NonPositiveAmount.into());
        }
        let bound = match intent.action {
            Action::Deposit => bounds.wallet_balance,
            Action::Withdraw => bounds.deposited,
            Action::Repay => bounds.owed,
            Action::Borrow => match &bounds.borrowable {
                Capacity::Available(units) => *units,
                Capacity::Unknown(reason) => {
                    return Err(EngineError::UnknownCapacity(reason.clone()))
                }
            },
        };
        if intent.amount > bound {
            return Err(ValidationError::ExceedsBound {
                action: intent.action,
                amount: intent.amount,
                bound,
            }
            .into());
        }
        Ok(())
    }

    fn acquire_slot(&self, token_id: B256, action: Action) -> Result<RunSlot<'_>, ValidationError> {
        use dashmap::mapref::entry::Entry;
        match self.active.entry((token_id, action)) {
            Entry::Occupied(_) => Err(ValidationError::OverlappingRun { token_id, action }),
            Entry::Vacant(vacant) => {
                vacant.insert(());
                Ok(RunSlot {
                    active: &self.active,
                    key: (token_id, action),
                })
            }
        }
    }

    async fn submit(
        &self,
        intent: &TransactionIntent,
        update_data: Vec<Bytes>,
        price_ids: Vec<B256>,
        fee: U256,
    ) -> Result<B256, SettlementError> {
        match intent.action {
            Action::Deposit => {
                self.settlement
                    .submit_deposit(intent.token_id, intent.amount)
                    .await
            }
            Action::Withdraw => {
                self.settlement
                    .submit_withdraw(intent.token_id, intent.amount)
                    .await
            }
            Action::Borrow => {
                self.settlement
                    .submit_borrow(intent.token_id, intent.amount, update_data, price_ids, fee)
                    .await
            }
            Action::Repay => {
                self.settlement
                    .submit_repay(intent.token_id, intent.amount, update_data, price_ids, fee)
                    .await
            }
        }
    }
}

fn finish_failed(tracker: &mut PhaseTracker, mut report: RunReport, err: EngineError) -> RunReport {
    let local = matches!(
        err,
        EngineError::Validation(_) | EngineError::UnknownCapacity(_)
    );
    let classified = if local {
        // Validation text is already user-facing; only raw collaborator
        // errors go through the pattern table.
        ClassifiedError {
            message: err.to_string(),
            raw: err.to_string(),
        }
    } else {
        classify(&err.to_string())
    };
    warn!(error = %classified.raw, "orchestration run did not complete");
    if !local {
        report.failed_at = Some(tracker.current.clone());
        tracker.set(Phase::Failed);
    }
    report.error = Some(classified);
    report.phase = tracker.current.clone();
    report
}

fn finish_dismissed(tracker: &mut PhaseTracker, mut report: RunReport) -> RunReport {
    tracker.set(Phase::Dismissed {
        submitted: report.write_hash,
    });
    info!(submitted = ?report.write_hash, "orchestration run dismissed");
    report.phase = tracker.current.clone();
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UnknownReason;
    use async_trait::async_trait;
    use meridian_oracle::{OracleError, PriceUpdate};
    use meridian_primitives::PriceQuote;
    use std::sync::{Arc, Mutex};
    use tokio::sync::Notify;

    const TOKEN: Address = Address::repeat_byte(0x11);
    const TOKEN_ID: B256 = B256::repeat_byte(0x22);
    const FEED: B256 = B256::repeat_byte(0x33);
    const SPENDER: Address = Address::repeat_byte(0x44);

    #[derive(Default)]
    struct MockSettlement {
        allowance: U256,
        calls: Mutex<Vec<String>>,
        /// When set, `confirm` blocks until notified.
        confirm_gate: Option<Arc<Notify>>,
    }

    impl MockSettlement {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: impl Into<String>) {
            self.calls.lock().unwrap().push(call.into());
        }
    }

    #[async_trait]
    impl Settlement for MockSettlement {
        fn signer_address(&self) -> Address {
            Address::repeat_byte(0x99)
        }

        async fn wallet_balance(&self, _: Address, _: Address) -> Result<U256, SettlementError> {
            Ok(U256::MAX)
        }

        async fn allowance(
            &self,
            _: Address,
            _: Address,
            _: Address,
        ) -> Result<U256, SettlementError> {
            self.record("allowance");
            Ok(self.allowance)
        }

        async fn submit_approval(
            &self,
            _: Address,
            _: Address,
            _: U256,
        ) -> Result<B256, SettlementError> {
            self.record("submit_approval");
            Ok(B256::repeat_byte(0xa1))
        }

        async fn submit_deposit(&self, _: B256, _: U256) -> Result<B256, SettlementError> {
            self.record("submit_deposit");
            Ok(B256::repeat_byte(0xa2))
        }

        async fn submit_withdraw(&self, _: B256, _: U256) -> Result<B256, SettlementError> {
            self.record("submit_withdraw");
            Ok(B256::repeat_byte(0xa3))
        }

        async fn submit_borrow(
            &self,
            _: B256,
            _: U256,
            update_data: Vec<Bytes>,
            _: Vec<B256>,
            fee: U256,
        ) -> Result<B256, SettlementError> {
            self.record(format!("submit_borrow(payloads={}, fee={fee})", update_data.len()));
            Ok(B256::repeat_byte(0xa4))
        }

        async fn submit_repay(
            &self,
            _: B256,
            _: U256,
            _: Vec<Bytes>,
            _: Vec<B256>,
            _: U256,
        ) -> Result<B256, SettlementError> {
            self.record("submit_repay");
            Ok(B256::repeat_byte(0xa5))
        }

        async fn confirm(&self, _: B256) -> Result<(), SettlementError> {
            self.record("confirm");
            if let Some(gate) = &self.confirm_gate {
                gate.notified().await;
            }
            Ok(())
        }

        async fn supported_tokens(&self) -> Result<Vec<B256>, SettlementError> {
            Ok(vec![TOKEN_ID])
        }

        async fn reserve(&self, _: B256) -> Result<meridian_primitives::ReserveState, SettlementError> {
            unimplemented!("not used by orchestration tests")
        }

        async fn deposited_scaled(&self, _: B256, _: Address) -> Result<U256, SettlementError> {
            Ok(U256::ZERO)
        }

        async fn borrow_scaled(&self, _: B256, _: Address) -> Result<U256, SettlementError> {
            Ok(U256::ZERO)
        }

        async fn ray(&self) -> Result<U256, SettlementError> {
            Ok(meridian_math::RAY)
        }
    }

    #[derive(Default)]
    struct MockOracle {
        fail_fee: bool,
    }

    #[async_trait]
    impl PriceOracle for MockOracle {
        async fn latest_update(&self, feed_ids: &[B256]) -> Result<PriceUpdate, OracleError> {
            Ok(PriceUpdate {
                data: vec![Bytes::from_static(b"update")],
                quotes: feed_ids
                    .iter()
                    .map(|id| PriceQuote {
                        id: *id,
                        price: 100_000_000,
                        conf: 0,
                        expo: -8,
                        publish_time: 1_700_000_000,
                    })
                    .collect(),
            })
        }

        async fn update_fee(&self, data: &[Bytes]) -> Result<U256, OracleError> {
            if self.fail_fee {
                return Err(OracleError::Contract("fee quote unavailable".into()));
            }
            Ok(U256::from(2u64 * data.len() as u64))
        }
    }

    fn config(test_mode: bool) -> OrchestratorConfig {
        OrchestratorConfig {
            deposit_spenders: vec![SPENDER],
            repay_spenders: vec![SPENDER],
            oracle_actions: vec![Action::Borrow, Action::Repay],
            feed_ids: HashMap::from([(TOKEN_ID, FEED)]),
            test_mode,
        }
    }

    fn bounds() -> IntentBounds {
        IntentBounds {
            wallet_balance: U256::from(1_000u64),
            deposited: U256::from(1_000u64),
            owed: U256::from(1_000u64),
            borrowable: Capacity::Available(U256::from(1_000u64)),
        }
    }

    fn intent(action: Action, amount: u64) -> TransactionIntent {
        TransactionIntent {
            action,
            token_id: TOKEN_ID,
            token: TOKEN,
            amount: U256::from(amount),
        }
    }

    fn orchestrator(
        settlement: MockSettlement,
        oracle: MockOracle,
        test_mode: bool,
    ) -> Orchestrator<MockSettlement, MockOracle> {
        Orchestrator::new(settlement, oracle, config(test_mode))
    }

    #[tokio::test]
    async fn deposit_approves_then_writes_and_signals_refresh() {
        let orc = orchestrator(MockSettlement::default(), MockOracle::default(), false);
        let mut refresh = orc.subscribe_refresh();

        let report = orc.execute(intent(Action::Deposit, 100), bounds()).await;

        assert!(matches!(report.phase, Phase::Confirmed { .. }));
        assert!(report.input_cleared);
        assert_eq!(report.approval_hashes.len(), 1);
        assert_eq!(
            orc.settlement().calls(),
            vec!["allowance", "submit_approval", "confirm", "submit_deposit", "confirm"]
        );
        let signal = refresh.recv().await.unwrap();
        assert_eq!(signal.token_id, TOKEN_ID);
    }

    #[tokio::test]
    async fn sufficient_allowance_skips_approval() {
        let settlement = MockSettlement {
            allowance: U256::from(1_000u64),
            ..Default::default()
        };
        let orc = orchestrator(settlement, MockOracle::default(), false);

        let report = orc.execute(intent(Action::Deposit, 100), bounds()).await;

        assert!(matches!(report.phase, Phase::Confirmed { .. }));
        assert!(report.approval_hashes.is_empty());
        assert_eq!(
            orc.settlement().calls(),
            vec!["allowance", "submit_deposit", "confirm"]
        );
    }

    #[tokio::test]
    async fn native_asset_skips_the_approval_branch() {
        let orc = orchestrator(MockSettlement::default(), MockOracle::default(), false);
        let native = TransactionIntent {
            token: Address::ZERO,
            ..intent(Action::Deposit, 100)
        };

        let report = orc.execute(native, bounds()).await;

        assert!(matches!(report.phase, Phase::Confirmed { .. }));
        assert_eq!(orc.settlement().calls(), vec!["submit_deposit", "confirm"]);
    }

    #[tokio::test]
    async fn borrow_attaches_update_payload_and_fee() {
        let orc = orchestrator(MockSettlement::default(), MockOracle::default(), false);

        let report = orc.execute(intent(Action::Borrow, 100), bounds()).await;

        assert!(matches!(report.phase, Phase::Confirmed { .. }));
        assert_eq!(
            orc.settlement().calls(),
            vec!["submit_borrow(payloads=1, fee=2)", "confirm"]
        );
    }

    #[tokio::test]
    async fn fee_failure_in_test_mode_falls_back_to_empty_payload() {
        let orc = orchestrator(MockSettlement::default(), MockOracle { fail_fee: true }, true);

        let report = orc.execute(intent(Action::Borrow, 100), bounds()).await;

        assert!(matches!(report.phase, Phase::Confirmed { .. }));
        assert_eq!(
            orc.settlement().calls(),
            vec!["submit_borrow(payloads=0, fee=0)", "confirm"]
        );
    }

    #[tokio::test]
    async fn fee_failure_in_production_fails_the_run() {
        let orc = orchestrator(MockSettlement::default(), MockOracle { fail_fee: true }, false);

        let report = orc.execute(intent(Action::Borrow, 100), bounds()).await;

        assert_eq!(report.phase, Phase::Failed);
        assert_eq!(report.failed_at, Some(Phase::FeeQuoting));
        assert!(report.error.is_some());
        assert!(!report.input_cleared);
        assert!(orc.settlement().calls().is_empty());
    }

    #[tokio::test]
    async fn zero_amount_is_rejected_locally() {
        let orc = orchestrator(MockSettlement::default(), MockOracle::default(), false);

        let report = orc.execute(intent(Action::Deposit, 0), bounds()).await;

        // Validation failures never leave Idle and never reach the network.
        assert_eq!(report.phase, Phase::Idle);
        assert!(report.error.is_some());
        assert!(orc.settlement().calls().is_empty());
    }

    #[tokio::test]
    async fn amount_above_bound_is_rejected_locally() {
        let orc = orchestrator(MockSettlement::default(), MockOracle::default(), false);

        let report = orc.execute(intent(Action::Withdraw, 5_000), bounds()).await;

        assert_eq!(report.phase, Phase::Idle);
        assert!(orc.settlement().calls().is_empty());
    }

    #[tokio::test]
    async fn unknown_capacity_blocks_borrow() {
        let orc = orchestrator(MockSettlement::default(), MockOracle::default(), false);
        let bounds = IntentBounds {
            borrowable: Capacity::Unknown(UnknownReason::MissingQuote(FEED)),
            ..bounds()
        };

        let report = orc.execute(intent(Action::Borrow, 100), bounds).await;

        assert_eq!(report.phase, Phase::Idle);
        assert!(report.error.is_some());
        assert!(orc.settlement().calls().is_empty());
    }

    #[tokio::test]
    async fn overlapping_run_for_same_asset_and_action_is_refused() {
        let gate = Arc::new(Notify::new());
        let settlement = MockSettlement {
            confirm_gate: Some(gate.clone()),
            ..Default::default()
        };
        let orc = Arc::new(orchestrator(settlement, MockOracle::default(), false));

        let first = {
            let orc = orc.clone();
            tokio::spawn(async move { orc.execute(intent(Action::Deposit, 100), bounds()).await })
        };
        // Let the first run reach the gated confirm.
        tokio::task::yield_now().await;
        while !orc.settlement().calls().contains(&"confirm".to_string()) {
            tokio::task::yield_now().await;
        }

        let second = orc.execute(intent(Action::Deposit, 100), bounds()).await;
        assert_eq!(second.phase, Phase::Idle);
        let message = second.error.unwrap().message;
        assert!(message.contains("already in flight"), "got: {message}");

        // Release the first run's two gated confirms; it must still land.
        gate.notify_one();
        gate.notify_one();
        let first = first.await.unwrap();
        assert!(matches!(first.phase, Phase::Confirmed { .. }));

        // The slot is released once the run reaches a terminal state.
        assert!(orc.active.is_empty());
    }

    #[tokio::test]
    async fn dismissal_before_approval_confirms_submits_nothing() {
        let gate = Arc::new(Notify::new());
        let settlement = MockSettlement {
            confirm_gate: Some(gate.clone()),
            ..Default::default()
        };
        let orc = Arc::new(orchestrator(settlement, MockOracle::default(), false));
        let (handle, signal) = DismissSignal::pair();
        let (phase_tx, phase_rx) = watch::channel(Phase::Idle);

        let run = {
            let orc = orc.clone();
            tokio::spawn(async move {
                orc.execute_with(intent(Action::Repay, 100), bounds(), Some(phase_tx), signal)
                    .await
            })
        };
        // Wait until the run is parked in ApprovalConfirming.
        let mut phase_rx = phase_rx;
        loop {
            phase_rx.changed().await.unwrap();
            if matches!(*phase_rx.borrow(), Phase::ApprovalConfirming { .. }) {
                break;
            }
        }

        handle.dismiss();
        let report = run.await.unwrap();

        assert_eq!(report.phase, Phase::Dismissed { submitted: None });
        assert!(report.write_hash.is_none());
        assert!(!report.input_cleared);
        let calls = orc.settlement().calls();
        assert!(
            !calls.iter().any(|c| c.starts_with("submit_repay")),
            "primary write must never be submitted: {calls:?}"
        );
    }

    #[tokio::test]
    async fn dismissal_while_confirming_records_the_submitted_hash() {
        let gate = Arc::new(Notify::new());
        let settlement = MockSettlement {
            allowance: U256::from(1_000u64),
            confirm_gate: Some(gate.clone()),
            ..Default::default()
        };
        let orc = Arc::new(orchestrator(settlement, MockOracle::default(), false));
        let (handle, signal) = DismissSignal::pair();
        let (phase_tx, mut phase_rx) = watch::channel(Phase::Idle);

        let run = {
            let orc = orc.clone();
            tokio::spawn(async move {
                orc.execute_with(intent(Action::Deposit, 100), bounds(), Some(phase_tx), signal)
                    .await
            })
        };
        loop {
            phase_rx.changed().await.unwrap();
            if matches!(*phase_rx.borrow(), Phase::Confirming { .. }) {
                break;
            }
        }

        handle.dismiss();
        let report = run.await.unwrap();

        // Dismissal cannot recall the write; the report says one is out.
        assert_eq!(
            report.phase,
            Phase::Dismissed {
                submitted: Some(B256::repeat_byte(0xa2))
            }
        );
        assert_eq!(report.write_hash, Some(B256::repeat_byte(0xa2)));
    }
}
