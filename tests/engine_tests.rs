//! End-to-end engine scenarios: the full create → allocate → deposit →
//! trigger → claim → complete flow under each unlock policy.

mod helpers;

use std::io::Write;
use std::sync::{Arc, Mutex};

use helpers::{acct, record_params, TestContext, DAY, T0};
use heirvault::{
    AssetId, EventSink, HoldKind, JsonLinesSink, LedgerError, LedgerEvent, Milestone,
    RecordStatus, UnlockPolicy,
};

/// Full immediate-policy flow: 6000/4000 bp split over a 10-unit pool pays
/// 6 and 4 and completes the record.
#[tokio::test]
async fn immediate_policy_full_flow() {
    let ctx = TestContext::new();
    let owner = acct();
    let (b1, b2) = (acct(), acct());
    let native = AssetId::Native;

    let id = ctx
        .engine
        .create_record(record_params(owner, UnlockPolicy::immediate(0)))
        .await
        .unwrap();
    ctx.engine.add_beneficiary(id, owner, b1, 6_000).await.unwrap();
    ctx.engine.add_beneficiary(id, owner, b2, 4_000).await.unwrap();
    ctx.engine.deposit(id, owner, &native, 10).await.unwrap();
    ctx.engine.trigger(id, owner).await.unwrap();

    assert_eq!(ctx.engine.claim(id, b1, &native).await.unwrap(), 6);
    let snapshot = ctx.engine.snapshot(id).await.unwrap();
    assert_eq!(snapshot.allocations.get(b1).unwrap().claimed_for(&native), 6);

    assert_eq!(ctx.engine.claim(id, b2, &native).await.unwrap(), 4);

    let (status, hold) = ctx.engine.record_status(id).await.unwrap();
    assert_eq!(status, RecordStatus::Completed);
    assert_eq!(hold, None);
    assert_eq!(ctx.engine.pool_totals(id, &native).await.unwrap(), Some((10, 10)));

    assert_eq!(ctx.transfers.total_paid(&native, b1), 6);
    assert_eq!(ctx.transfers.total_paid(&native, b2), 4);

    let events = ctx.events.snapshot();
    assert!(events
        .iter()
        .any(|e| matches!(e, LedgerEvent::RecordCompleted { record_id } if *record_id == id)));
}

#[tokio::test]
async fn allocation_overflow_rejected_at_full_capacity() {
    let ctx = TestContext::new();
    let owner = acct();

    let id = ctx
        .engine
        .create_record(record_params(owner, UnlockPolicy::immediate(0)))
        .await
        .unwrap();
    ctx.engine.add_beneficiary(id, owner, acct(), 6_000).await.unwrap();
    ctx.engine.add_beneficiary(id, owner, acct(), 4_000).await.unwrap();

    let err = ctx
        .engine
        .add_beneficiary(id, owner, acct(), 1)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::AllocationOverflow { .. }));
    assert_eq!(ctx.engine.total_allocated(id).await.unwrap(), 10_000);
    assert_eq!(ctx.engine.snapshot(id).await.unwrap().allocations.len(), 2);
}

/// Linear policy with a 10-day cliff and 100-day ramp over a 100-unit pool,
/// single 100% beneficiary: 0 before the cliff, 50 halfway, 100 at the end,
/// 100 (clamped) well past the end.
#[tokio::test]
async fn linear_policy_vests_over_time() {
    let ctx = TestContext::new();
    let owner = acct();
    let b1 = acct();
    let native = AssetId::Native;

    let id = ctx
        .engine
        .create_record(record_params(owner, UnlockPolicy::linear(10 * DAY, 100 * DAY)))
        .await
        .unwrap();
    ctx.engine.add_beneficiary(id, owner, b1, 10_000).await.unwrap();
    ctx.engine.deposit(id, owner, &native, 100).await.unwrap();
    ctx.engine.trigger(id, owner).await.unwrap();

    ctx.clock.set(T0 + 5 * DAY);
    assert_eq!(ctx.engine.claimable_amount(id, &native, b1).await.unwrap(), 0);

    ctx.clock.set(T0 + 10 * DAY + 50 * DAY);
    assert_eq!(ctx.engine.claimable_amount(id, &native, b1).await.unwrap(), 50);
    assert_eq!(ctx.engine.claim(id, b1, &native).await.unwrap(), 50);

    ctx.clock.set(T0 + 10 * DAY + 100 * DAY);
    assert_eq!(ctx.engine.claimable_amount(id, &native, b1).await.unwrap(), 50);
    assert_eq!(ctx.engine.claim(id, b1, &native).await.unwrap(), 50);

    // clamped past the end, nothing further accrues
    ctx.clock.set(T0 + 10 * DAY + 150 * DAY);
    assert_eq!(ctx.engine.claimable_amount(id, &native, b1).await.unwrap(), 0);

    assert_eq!(ctx.transfers.total_paid(&native, b1), 100);
    let (status, _) = ctx.engine.record_status(id).await.unwrap();
    assert_eq!(status, RecordStatus::Completed);
}

#[tokio::test]
async fn double_claim_is_a_no_op() {
    let ctx = TestContext::new();
    let owner = acct();
    let b1 = acct();
    let native = AssetId::Native;

    let id = ctx
        .engine
        .create_record(record_params(owner, UnlockPolicy::immediate(0)))
        .await
        .unwrap();
    ctx.engine.add_beneficiary(id, owner, b1, 6_000).await.unwrap();
    ctx.engine.deposit(id, owner, &native, 10).await.unwrap();
    ctx.engine.trigger(id, owner).await.unwrap();

    assert_eq!(ctx.engine.claim(id, b1, &native).await.unwrap(), 6);

    // every further claim returns zero and changes nothing
    for _ in 0..3 {
        assert_eq!(ctx.engine.claim(id, b1, &native).await.unwrap(), 0);
    }
    assert_eq!(ctx.engine.pool_totals(id, &native).await.unwrap(), Some((10, 6)));
    assert_eq!(ctx.transfers.total_paid(&native, b1), 6);
}

#[tokio::test]
async fn milestone_policy_unlocks_in_steps() {
    let ctx = TestContext::new();
    let owner = acct();
    let b1 = acct();
    let native = AssetId::Native;

    let policy = UnlockPolicy::milestones(
        0,
        vec![
            Milestone { offset_secs: 30 * DAY, cumulative_bp: 5_000 },
            Milestone { offset_secs: 60 * DAY, cumulative_bp: 10_000 },
        ],
    );
    let id = ctx
        .engine
        .create_record(record_params(owner, policy))
        .await
        .unwrap();
    ctx.engine.add_beneficiary(id, owner, b1, 10_000).await.unwrap();
    ctx.engine.deposit(id, owner, &native, 1_000).await.unwrap();
    ctx.engine.trigger(id, owner).await.unwrap();

    ctx.clock.set(T0 + 20 * DAY);
    assert_eq!(ctx.engine.claimable_amount(id, &native, b1).await.unwrap(), 0);

    ctx.clock.set(T0 + 40 * DAY);
    assert_eq!(ctx.engine.claimable_amount(id, &native, b1).await.unwrap(), 500);

    ctx.clock.set(T0 + 90 * DAY);
    assert_eq!(ctx.engine.claimable_amount(id, &native, b1).await.unwrap(), 1_000);
    assert_eq!(ctx.engine.claim(id, b1, &native).await.unwrap(), 1_000);
}

#[tokio::test]
async fn second_trigger_fails_and_preserves_timestamp() {
    let ctx = TestContext::new();
    let owner = acct();

    let id = ctx
        .engine
        .create_record(record_params(owner, UnlockPolicy::immediate(0)))
        .await
        .unwrap();
    ctx.engine.add_beneficiary(id, owner, acct(), 10_000).await.unwrap();
    ctx.engine.trigger(id, owner).await.unwrap();
    let triggered_at = ctx.engine.snapshot(id).await.unwrap().triggered_at;

    ctx.clock.advance(DAY);
    assert_eq!(
        ctx.engine.trigger(id, owner).await.unwrap_err(),
        LedgerError::AlreadyTriggered
    );
    let snapshot = ctx.engine.snapshot(id).await.unwrap();
    assert_eq!(snapshot.status, RecordStatus::Triggered);
    assert_eq!(snapshot.triggered_at, triggered_at);
}

/// An under-allocated record (here 5000 bp) leaves a remainder nobody can
/// claim and never reaches COMPLETED under the all-pools-drained rule.
#[tokio::test]
async fn under_allocated_record_never_completes() {
    let ctx = TestContext::new();
    let owner = acct();
    let b1 = acct();
    let native = AssetId::Native;

    let id = ctx
        .engine
        .create_record(record_params(owner, UnlockPolicy::immediate(0)))
        .await
        .unwrap();
    ctx.engine.add_beneficiary(id, owner, b1, 5_000).await.unwrap();
    ctx.engine.deposit(id, owner, &native, 100).await.unwrap();
    ctx.engine.trigger(id, owner).await.unwrap();

    assert_eq!(ctx.engine.claim(id, b1, &native).await.unwrap(), 50);
    assert_eq!(ctx.engine.claim(id, b1, &native).await.unwrap(), 0);

    let (status, _) = ctx.engine.record_status(id).await.unwrap();
    assert_eq!(status, RecordStatus::Triggered);
    assert_eq!(ctx.engine.pool_totals(id, &native).await.unwrap(), Some((100, 50)));
}

/// A withdrawal while ACTIVE shrinks the effective balance; entitlements
/// computed later use the reduced pool.
#[tokio::test]
async fn withdraw_reduces_later_claims() {
    let ctx = TestContext::new();
    let owner = acct();
    let b1 = acct();
    let native = AssetId::Native;

    let id = ctx
        .engine
        .create_record(record_params(owner, UnlockPolicy::immediate(0)))
        .await
        .unwrap();
    ctx.engine.add_beneficiary(id, owner, b1, 10_000).await.unwrap();
    ctx.engine.deposit(id, owner, &native, 100).await.unwrap();
    ctx.engine.withdraw(id, owner, &native, 40).await.unwrap();
    ctx.engine.trigger(id, owner).await.unwrap();

    assert_eq!(ctx.engine.claim(id, b1, &native).await.unwrap(), 60);
    let (status, _) = ctx.engine.record_status(id).await.unwrap();
    assert_eq!(status, RecordStatus::Completed);

    // withdrawals are an ACTIVE-only affordance
    let id2 = ctx
        .engine
        .create_record(record_params(owner, UnlockPolicy::immediate(0)))
        .await
        .unwrap();
    ctx.engine.add_beneficiary(id2, owner, b1, 10_000).await.unwrap();
    ctx.engine.deposit(id2, owner, &native, 10).await.unwrap();
    ctx.engine.trigger(id2, owner).await.unwrap();
    assert_eq!(
        ctx.engine.withdraw(id2, owner, &native, 1).await.unwrap_err(),
        LedgerError::RecordNotActive
    );
}

#[tokio::test]
async fn hold_blocks_claims_until_released() {
    let ctx = TestContext::new();
    let owner = acct();
    let arbitrator = acct();
    let b1 = acct();
    let native = AssetId::Native;

    let mut params = record_params(owner, UnlockPolicy::immediate(0));
    params.arbitrator = Some(arbitrator);
    let id = ctx.engine.create_record(params).await.unwrap();
    ctx.engine.add_beneficiary(id, owner, b1, 10_000).await.unwrap();
    ctx.engine.deposit(id, owner, &native, 10).await.unwrap();
    ctx.engine.trigger(id, owner).await.unwrap();

    ctx.engine.place_hold(id, arbitrator, HoldKind::Disputed).await.unwrap();
    assert_eq!(
        ctx.engine.claim(id, b1, &native).await.unwrap_err(),
        LedgerError::RecordOnHold
    );
    assert_eq!(ctx.engine.claimable_amount(id, &native, b1).await.unwrap(), 0);

    // hold left the ledger untouched; release restores the prior status
    ctx.engine.release_hold(id, arbitrator).await.unwrap();
    let (status, hold) = ctx.engine.record_status(id).await.unwrap();
    assert_eq!(status, RecordStatus::Triggered);
    assert_eq!(hold, None);
    assert_eq!(ctx.engine.claim(id, b1, &native).await.unwrap(), 10);
}

/// Parallel token and NFT pools: completion requires every pool drained.
#[tokio::test]
async fn multi_asset_pools_complete_together() {
    let ctx = TestContext::new();
    let owner = acct();
    let b1 = acct();
    let usdc = AssetId::Token("USDC".into());
    let deeds = AssetId::Nft("deeds".into());

    let id = ctx
        .engine
        .create_record(record_params(owner, UnlockPolicy::immediate(0)))
        .await
        .unwrap();
    ctx.engine.add_beneficiary(id, owner, b1, 10_000).await.unwrap();
    ctx.engine.deposit(id, owner, &usdc, 500).await.unwrap();
    ctx.engine.deposit_nft(id, owner, &deeds, &[7, 8]).await.unwrap();
    ctx.engine.trigger(id, owner).await.unwrap();

    assert_eq!(ctx.engine.claim(id, b1, &usdc).await.unwrap(), 500);
    let (status, _) = ctx.engine.record_status(id).await.unwrap();
    assert_eq!(status, RecordStatus::Triggered, "NFT pool still unclaimed");

    assert_eq!(ctx.engine.claim(id, b1, &deeds).await.unwrap(), 2);
    let (status, _) = ctx.engine.record_status(id).await.unwrap();
    assert_eq!(status, RecordStatus::Completed);
}

/// The JSON-lines sink writes one parseable object per event.
#[tokio::test]
async fn json_lines_sink_is_parseable() {
    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    let buf = SharedBuf::default();
    let sink = JsonLinesSink::new(buf.clone());
    sink.publish(&LedgerEvent::RecordCreated {
        record_id: 7,
        owner: acct(),
    });
    sink.publish(&LedgerEvent::RecordCompleted { record_id: 7 });

    let bytes = buf.0.lock().unwrap().clone();
    let text = String::from_utf8(bytes).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    for line in lines {
        let value: serde_json::Value = serde_json::from_str(line).unwrap();
        assert_eq!(value["record_id"], 7);
    }
}
