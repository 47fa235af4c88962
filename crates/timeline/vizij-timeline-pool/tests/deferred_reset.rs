use vizij_timeline_pool::{
    PoolConfig, ResetPolicy, Step, SteppedEngine, Timeline, TimelineOptions, TimelinePool,
};

fn mk_pool(policy: ResetPolicy) -> TimelinePool<SteppedEngine> {
    TimelinePool::new(
        SteppedEngine::default(),
        PoolConfig {
            reset_policy: policy,
            ..PoolConfig::default()
        },
    )
}

fn targets(w: &vizij_timeline_pool::DeferredReset<vizij_timeline_pool::SteppedTimeline>) -> Vec<String> {
    w.timeline()
        .borrow()
        .steps()
        .map(|s| s.target.clone())
        .collect()
}

#[test]
fn queries_keep_stale_steps_until_first_mutation() -> anyhow::Result<()> {
    let mut pool = mk_pool(ResetPolicy::Deferred);
    let opts = TimelineOptions::default();

    // A previous user filled the cached timeline and never released it.
    let previous = pool.acquire(Some("card"), &opts)?;
    previous.borrow_mut().add(Step::new("card/old-a", 1.0));
    previous.borrow_mut().add(Step::new("card/old-b", 1.0));

    let mut w = pool.acquire_wrapped(Some("card"), &opts)?;
    assert!(w.reset_pending());
    assert_eq!(w.len(), 2);
    assert!(!w.is_active());
    assert!(w.is_paused());
    assert_eq!(w.len(), 2, "queries must not clear");

    w.add(Step::new("card/new", 0.5).with("opacity", 1.0));
    assert_eq!(targets(&w), vec!["card/new".to_string()]);
    assert!(!w.reset_pending());

    w.add(Step::new("card/new-2", 0.5));
    assert_eq!(w.len(), 2, "only the first mutation clears");
    Ok(())
}

#[test]
fn play_rearms_reset_for_next_cycle() -> anyhow::Result<()> {
    let mut pool = mk_pool(ResetPolicy::Deferred);
    let mut w = pool.acquire_wrapped(Some("loop"), &TimelineOptions::default())?;

    w.add(Step::new("a", 0.5)).add(Step::new("b", 0.5)).play();
    assert!(w.reset_pending());
    assert!(w.is_active());
    assert_eq!(w.len(), 2);

    pool.engine_mut().tick(2.0);
    assert!(!w.is_active());

    // Same wrapper, no new acquisition: the next build starts empty.
    w.add(Step::new("c", 0.5));
    assert_eq!(targets(&w), vec!["c".to_string()]);
    w.play();
    assert!(w.is_active());
    Ok(())
}

#[test]
fn eager_policy_clears_on_acquire() -> anyhow::Result<()> {
    let mut pool = mk_pool(ResetPolicy::Eager);
    assert_eq!(pool.config().reset_policy, ResetPolicy::Eager);
    let opts = TimelineOptions::default();
    let previous = pool.acquire(Some("card"), &opts)?;
    previous.borrow_mut().add(Step::new("card/old", 1.0));

    let mut w = pool.acquire_wrapped(Some("card"), &opts)?;
    assert!(w.is_empty());
    assert!(!w.reset_pending());
    w.add(Step::new("card/new", 1.0)).add(Step::new("card/new-2", 1.0));
    assert_eq!(w.len(), 2);
    Ok(())
}

#[test]
fn shared_keyed_callers_never_see_each_others_steps() -> anyhow::Result<()> {
    let mut pool = mk_pool(ResetPolicy::Deferred);
    let opts = TimelineOptions::default();

    let mut first = pool.acquire_wrapped(Some("shared"), &opts)?;
    first.add(Step::new("first/a", 1.0)).add(Step::new("first/b", 1.0));

    let mut second = pool.acquire_wrapped(Some("shared"), &opts)?;
    assert_eq!(first.id(), second.id());
    second.add(Step::new("second/a", 1.0));
    assert_eq!(targets(&second), vec!["second/a".to_string()]);
    Ok(())
}

#[test]
fn with_timeline_releases_unplayed_immediately() -> anyhow::Result<()> {
    let mut pool = mk_pool(ResetPolicy::Deferred);
    let opts = TimelineOptions::default();

    let built = pool.with_timeline(None, &opts, |tl| {
        tl.add(Step::new("a", 1.0));
        tl.len()
    })?;
    assert_eq!(built, 1);
    assert_eq!(pool.idle_len(), 1);

    // Conditional path that adds nothing: still returned, nothing to clear.
    pool.with_timeline(None, &opts, |tl| tl.is_active())?;
    assert_eq!(pool.idle_len(), 1);
    assert_eq!(pool.engine().created_count(), 1);
    Ok(())
}

#[test]
fn with_timeline_defers_while_playing() -> anyhow::Result<()> {
    let mut pool = mk_pool(ResetPolicy::Deferred);
    let opts = TimelineOptions::default();

    let id = pool.with_timeline(None, &opts, |tl| {
        tl.add(Step::new("fade", 1.0)).play();
        tl.id()
    })?;
    assert_eq!(pool.idle_len(), 0);
    assert_eq!(pool.pending_len(), 1);

    pool.engine_mut().tick(1.5);
    assert_eq!(pool.idle_len(), 1);
    assert_eq!(pool.pending_len(), 0);

    let again = pool.acquire(None, &opts)?;
    assert_eq!(again.borrow().id(), id);
    assert!(again.borrow().is_empty());
    Ok(())
}
