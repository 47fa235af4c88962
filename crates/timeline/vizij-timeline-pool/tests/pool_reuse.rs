use std::rc::Rc;

use vizij_timeline_pool::{
    EngineError, PoolConfig, ReleaseOutcome, Step, SteppedConfig, SteppedEngine, Timeline,
    TimelineEngine, TimelineOptions, TimelinePool,
};

fn mk_pool() -> TimelinePool<SteppedEngine> {
    TimelinePool::new(SteppedEngine::default(), PoolConfig::default())
}

#[test]
fn keyed_acquire_returns_same_instance() -> anyhow::Result<()> {
    let mut pool = mk_pool();
    let opts = TimelineOptions::default();

    let a = pool.acquire(Some("hero"), &opts)?;
    let b = pool.acquire(Some("hero"), &opts)?;
    assert!(Rc::ptr_eq(&a, &b), "same key must yield the same timeline");
    assert_eq!(pool.keyed_len(), 1);
    assert_eq!(pool.tracked_len(), 1);

    let c = pool.acquire(Some("footer"), &opts)?;
    assert!(!Rc::ptr_eq(&a, &c));
    assert_eq!(pool.engine().created_count(), 2);
    Ok(())
}

#[test]
fn keyed_release_clears_but_keeps_mapping() -> anyhow::Result<()> {
    let mut pool = mk_pool();
    let a = pool.acquire(Some("hero"), &TimelineOptions::default())?;
    a.borrow_mut().add(Step::new("hero/opacity", 1.0));

    assert_eq!(pool.release(&a), ReleaseOutcome::Retained);
    assert!(a.borrow().is_empty());
    assert!(a.borrow().is_paused());
    let cached = pool.cached("hero").expect("mapping kept");
    assert!(Rc::ptr_eq(&cached, &a));
    assert_eq!(pool.idle_len(), 0, "keyed timelines never enter the free-list");
    Ok(())
}

#[test]
fn anonymous_release_then_acquire_reuses() -> anyhow::Result<()> {
    let mut pool = mk_pool();
    let opts = TimelineOptions::default();

    let a = pool.acquire(None, &opts)?;
    assert_eq!(pool.idle_len(), 0, "new timeline is checked out, not pooled");
    assert!(pool.is_tracked(&a));

    assert_eq!(pool.release(&a), ReleaseOutcome::Pooled);
    assert_eq!(pool.idle_len(), 1);
    assert!(pool.is_idle(&a));

    let b = pool.acquire(None, &opts)?;
    assert!(Rc::ptr_eq(&a, &b));
    assert_eq!(pool.idle_len(), 0);
    assert_eq!(pool.engine().created_count(), 1);
    Ok(())
}

#[test]
fn acquire_takes_one_of_two_idle() -> anyhow::Result<()> {
    let mut pool = mk_pool();
    let opts = TimelineOptions::default();
    let a = pool.acquire(None, &opts)?;
    let b = pool.acquire(None, &opts)?;
    pool.release(&a);
    pool.release(&b);
    assert_eq!(pool.idle_len(), 2);

    let c = pool.acquire(None, &opts)?;
    assert!(Rc::ptr_eq(&c, &a) || Rc::ptr_eq(&c, &b));
    assert_eq!(pool.idle_len(), 1);
    assert!(!pool.is_idle(&c));
    assert_eq!(pool.engine().created_count(), 2);
    Ok(())
}

#[test]
fn double_release_is_idempotent() -> anyhow::Result<()> {
    let mut pool = mk_pool();
    let a = pool.acquire(None, &TimelineOptions::default())?;

    assert_eq!(pool.release(&a), ReleaseOutcome::Pooled);
    let again = pool.release(&a);
    assert_eq!(again, ReleaseOutcome::AlreadyIdle);
    assert!(again.is_available());
    assert_eq!(pool.idle_len(), 1);

    let _b = pool.acquire(None, &TimelineOptions::default())?;
    assert_eq!(pool.idle_len(), 0);
    Ok(())
}

#[test]
fn pooled_timelines_start_paused_regardless_of_options() -> anyhow::Result<()> {
    let mut pool = mk_pool();
    let opts = TimelineOptions {
        paused: false,
        ..TimelineOptions::default()
    };
    let a = pool.acquire(None, &opts)?;
    let k = pool.acquire(Some("k"), &opts)?;
    assert!(a.borrow().is_paused());
    assert!(k.borrow().is_paused());
    assert!(a.borrow().is_empty());

    a.borrow_mut().add(Step::new("a", 1.0));
    assert_eq!(pool.engine_mut().tick(1.0), 0, "paused timelines never advance");
    Ok(())
}

#[test]
fn create_tracked_honors_options_and_is_not_pooled() -> anyhow::Result<()> {
    let mut pool = mk_pool();
    let t = pool.create_tracked(&TimelineOptions::default().with_label("intro"))?;
    assert!(!t.borrow().is_paused());
    assert_eq!(t.borrow().label(), Some("intro"));
    assert!(pool.is_tracked(&t));
    assert_eq!(pool.idle_len(), 0);
    assert_eq!(pool.keyed_len(), 0);

    // A tracked timeline handed back is adopted by the free-list.
    assert_eq!(pool.release(&t), ReleaseOutcome::Pooled);
    assert!(t.borrow().is_paused());
    Ok(())
}

#[test]
fn engine_failures_propagate() -> anyhow::Result<()> {
    let engine = SteppedEngine::new(SteppedConfig {
        max_timelines: Some(1),
    });
    let mut pool = TimelinePool::new(engine, PoolConfig::default());
    let opts = TimelineOptions::default();

    let a = pool.acquire(None, &opts)?;
    let err = pool.acquire(None, &opts).unwrap_err();
    assert!(matches!(err, EngineError::CapacityExceeded { limit: 1, .. }));

    let err = pool.acquire(Some("k"), &opts).unwrap_err();
    assert_eq!(err.category(), "capacity");
    assert_eq!(pool.keyed_len(), 0, "failed creation must not leave a cache entry");
    assert_eq!(pool.tracked_len(), 1);

    // Exhaustion of the engine is not exhaustion of the pool: reuse still works.
    pool.release(&a);
    let b = pool.acquire(None, &opts)?;
    assert!(Rc::ptr_eq(&a, &b));
    Ok(())
}

#[test]
fn release_of_foreign_timeline_is_stale() -> anyhow::Result<()> {
    let pool = mk_pool();
    let mut other = SteppedEngine::default();
    let t = other.create(&TimelineOptions::default())?;
    assert_eq!(pool.release(&t), ReleaseOutcome::Stale);
    assert_eq!(pool.idle_len(), 0);
    Ok(())
}

#[test]
fn foreign_timeline_sharing_an_id_is_stale() -> anyhow::Result<()> {
    let mut pool = mk_pool();
    let opts = TimelineOptions::default();
    let ours = pool.acquire(None, &opts)?;

    let mut other = SteppedEngine::default();
    let theirs = other.create(&opts)?;
    assert_eq!(ours.borrow().id(), theirs.borrow().id());

    assert!(!pool.is_tracked(&theirs));
    assert_eq!(pool.release(&theirs), ReleaseOutcome::Stale);
    assert_eq!(pool.idle_len(), 0);

    assert_eq!(pool.release(&ours), ReleaseOutcome::Pooled);
    assert!(!pool.is_idle(&theirs));
    let next = pool.acquire(None, &opts)?;
    assert!(Rc::ptr_eq(&next, &ours));

    pool.reset_all();
    assert!(ours.borrow().is_killed());
    assert!(!theirs.borrow().is_killed(), "never tracked, never killed");
    Ok(())
}
