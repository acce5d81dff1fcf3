//! Cancellation protocol coverage: strengthening, epochs, checkpoints,
//! bounded cleanup, and cooperative finalization.

use cordon::{
    Budget, CancelKind, CancelPhase, ErrorKind, Outcome, PollStatus, Runtime, TaskState,
};

fn init(name: &str) {
    cordon::test_utils::init_test_logging();
    cordon::test_phase!(name);
}

#[test]
fn cancel_and_strengthen() {
    init("cancel_and_strengthen");
    let mut rt = Runtime::new();
    let region = rt.region_open().expect("open");
    let task = rt
        .task_spawn(region, Box::new(|_, _| PollStatus::Pending))
        .expect("spawn");

    rt.task_cancel(task, CancelKind::User).expect("cancel");
    rt.task_cancel(task, CancelKind::Shutdown).expect("strengthen");

    let reason = rt.task_cancel_reason(task).expect("reason").expect("pending");
    assert_eq!(reason.kind(), CancelKind::Shutdown);
    assert!(rt.task_cleanup_polls_remaining(task).expect("polls") <= 50);
    assert_eq!(rt.task_cancel_epoch(task).expect("epoch"), 2);

    let mut budget = Budget::infinite();
    rt.scheduler_run(region, &mut budget).expect("run");
    assert_eq!(rt.task_outcome(task).expect("outcome"), Outcome::Cancelled);
    cordon::test_complete!("cancel_and_strengthen");
}

#[test]
fn severity_is_monotone_across_any_sequence() {
    init("severity_is_monotone_across_any_sequence");
    let mut rt = Runtime::new();
    let region = rt.region_open().expect("open");
    let task = rt
        .task_spawn(region, Box::new(|_, _| PollStatus::Pending))
        .expect("spawn");

    let sequence = [
        CancelKind::Timeout,
        CancelKind::User,
        CancelKind::Parent,
        CancelKind::RaceLost,
        CancelKind::Shutdown,
        CancelKind::User,
    ];
    let mut last_severity = 0u8;
    let mut last_polls = u32::MAX;
    for kind in sequence {
        rt.task_cancel(task, kind).expect("cancel");
        let reason = rt.task_cancel_reason(task).expect("reason").expect("pending");
        assert!(reason.severity() >= last_severity, "severity regressed");
        let polls = rt.task_cleanup_polls_remaining(task).expect("polls");
        assert!(polls <= last_polls, "cleanup allowance grew");
        last_severity = reason.severity();
        last_polls = polls;
    }
    assert_eq!(rt.task_cancel_epoch(task).expect("epoch"), 6);
    cordon::test_complete!("severity_is_monotone_across_any_sequence");
}

#[test]
fn bounded_cleanup_never_exceeds_the_class_default() {
    init("bounded_cleanup_never_exceeds_the_class_default");
    for kind in [CancelKind::User, CancelKind::Parent, CancelKind::Shutdown] {
        let mut rt = Runtime::new();
        let region = rt.region_open().expect("open");
        let task = rt
            .task_spawn(region, Box::new(|_, _| PollStatus::Pending))
            .expect("spawn");
        rt.task_cancel(task, kind).expect("cancel");

        let mut budget = Budget::infinite();
        rt.scheduler_run(region, &mut budget).expect("run");
        assert_eq!(rt.task_state(task).expect("state"), TaskState::Completed);
        assert_eq!(rt.task_outcome(task).expect("outcome"), Outcome::Cancelled);

        // Every poll after the cancel was a cleanup poll; the allowance is
        // a hard bound.
        let polls = rt
            .events()
            .iter()
            .filter(|e| matches!(e.kind, cordon::SchedEventKind::Poll { .. }))
            .count() as u32;
        assert!(polls <= kind.cleanup_polls(), "{kind:?} exceeded its allowance");
    }
    cordon::test_complete!("bounded_cleanup_never_exceeds_the_class_default");
}

#[test]
fn cooperative_task_observes_and_finalizes() {
    init("cooperative_task_observes_and_finalizes");
    let mut rt = Runtime::new();
    let region = rt.region_open().expect("open");
    let task = rt
        .task_spawn_captured(
            region,
            1,
            None,
            Box::new(|rt: &mut Runtime, me| {
                let checkpoint = rt.checkpoint(me).expect("checkpoint");
                if !checkpoint.cancelled {
                    return PollStatus::Pending;
                }
                assert!(checkpoint.kind.is_some());
                assert!(checkpoint.epoch >= 1);
                // One cleanup poll of work, then signal teardown.
                let state = rt.task_capture_mut(me).expect("capture");
                if state[0] == 0 {
                    state[0] = 1;
                    PollStatus::Pending
                } else {
                    rt.task_finalize(me).expect("finalize");
                    PollStatus::Pending
                }
            }),
        )
        .expect("spawn");

    let mut budget = Budget::from_polls(5);
    let err = rt.scheduler_run(region, &mut budget).expect_err("still pending");
    assert_eq!(err.kind(), ErrorKind::PollBudgetExhausted);

    rt.task_cancel(task, CancelKind::Timeout).expect("cancel");
    assert_eq!(
        rt.task_cancel_phase(task).expect("phase"),
        CancelPhase::Requested
    );

    let mut budget = Budget::from_polls(20);
    rt.scheduler_run(region, &mut budget).expect("run");
    assert_eq!(rt.task_state(task).expect("state"), TaskState::Completed);
    assert_eq!(rt.task_outcome(task).expect("outcome"), Outcome::Cancelled);
    cordon::test_complete!("cooperative_task_observes_and_finalizes");
}

#[test]
fn propagate_reaches_only_the_target_region() {
    init("propagate_reaches_only_the_target_region");
    let mut rt = Runtime::new();
    let region_a = rt.region_open().expect("open");
    let region_b = rt.region_open().expect("open");
    let a1 = rt
        .task_spawn(region_a, Box::new(|_, _| PollStatus::Pending))
        .expect("spawn");
    let b1 = rt
        .task_spawn(region_b, Box::new(|_, _| PollStatus::Pending))
        .expect("spawn");

    let cancelled = rt
        .cancel_propagate(region_a, CancelKind::ScopeExit)
        .expect("propagate");
    assert_eq!(cancelled, 1);

    let reason = rt.task_cancel_reason(a1).expect("reason").expect("pending");
    assert_eq!(reason.kind(), CancelKind::ScopeExit);
    assert_eq!(reason.origin_region, Some(region_a));
    assert_eq!(rt.task_cancel_reason(b1).expect("reason"), None);
    assert_eq!(rt.task_cancel_phase(b1).expect("phase"), CancelPhase::Idle);
    cordon::test_complete!("propagate_reaches_only_the_target_region");
}

#[test]
fn cancel_with_origin_records_attribution() {
    init("cancel_with_origin_records_attribution");
    let mut rt = Runtime::new();
    let region = rt.region_open().expect("open");
    let culprit = rt
        .task_spawn(region, Box::new(|_, _| PollStatus::Pending))
        .expect("spawn");
    let victim = rt
        .task_spawn(region, Box::new(|_, _| PollStatus::Pending))
        .expect("spawn");

    rt.task_cancel_with_origin(victim, CancelKind::FailFast, Some(region), Some(culprit))
        .expect("cancel");
    let reason = rt.task_cancel_reason(victim).expect("reason").expect("pending");
    assert_eq!(reason.origin_region, Some(region));
    assert_eq!(reason.origin_task, Some(culprit));
    cordon::test_complete!("cancel_with_origin_records_attribution");
}

#[test]
fn strengthening_keeps_the_superseded_reason_in_the_chain() {
    init("strengthening_keeps_the_superseded_reason_in_the_chain");
    let mut rt = Runtime::new();
    let region = rt.region_open().expect("open");
    let task = rt
        .task_spawn(region, Box::new(|_, _| PollStatus::Pending))
        .expect("spawn");
    rt.task_cancel(task, CancelKind::Timeout).expect("cancel");
    rt.task_cancel(task, CancelKind::Shutdown).expect("strengthen");
    let reason = rt.task_cancel_reason(task).expect("reason").expect("pending");
    assert_eq!(reason.kind(), CancelKind::Shutdown);
    let cause = reason.cause().expect("superseded reason retained");
    assert_eq!(cause.kind(), CancelKind::Timeout);
    cordon::test_complete!("strengthening_keeps_the_superseded_reason_in_the_chain");
}
