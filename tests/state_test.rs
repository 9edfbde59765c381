use shop_countdown::state::{State, with_state_lock};
use shop_countdown::store::{FileTargetStore, TargetStore};
use shop_countdown::timer::engine::Phase;
use shop_countdown::timer::{Countdown, TimerConfig};
use chrono::{DateTime, Duration as ChronoDuration, FixedOffset, TimeZone};
use std::thread;
use std::time::Duration;
use tempfile::tempdir;

fn t0() -> DateTime<FixedOffset> {
    FixedOffset::east_opt(0)
        .unwrap()
        .with_ymd_and_hms(2026, 10, 19, 8, 0, 0)
        .unwrap()
}

#[test]
fn test_state_creation() {
    let dir = tempdir().unwrap();
    let state_path = dir.path().join("state.json");

    let state = State::default();
    state.save(&state_path).unwrap();

    let loaded = State::load(&state_path).unwrap();
    assert!(loaded.targets.is_empty());
    assert_eq!(loaded.version, "1.0.0");
}

#[test]
fn test_concurrent_lock() {
    let dir = tempdir().unwrap();
    let state_path = dir.path().join("state.json");
    let lock_path = dir.path().join("state.lock");

    State::default().save(&state_path).unwrap();

    let lock_path_clone = lock_path.clone();
    let state_path_clone = state_path.clone();

    // Hold the lock for 500ms in another thread
    let handle = thread::spawn(move || {
        with_state_lock(&lock_path_clone, &state_path_clone, |state| {
            state
                .targets
                .insert("timer-cd-endtime-1".to_string(), "locked".to_string());
            thread::sleep(Duration::from_millis(500));
            Ok(())
        })
        .unwrap();
    });

    thread::sleep(Duration::from_millis(100));

    let start = std::time::Instant::now();
    with_state_lock(&lock_path, &state_path, |state| {
        assert_eq!(
            state.targets.get("timer-cd-endtime-1").map(String::as_str),
            Some("locked")
        );
        state
            .targets
            .insert("timer-cd-endtime-1".to_string(), "updated".to_string());
        Ok(())
    })
    .unwrap();

    assert!(
        start.elapsed().as_millis() >= 400,
        "Should have waited for lock"
    );

    handle.join().unwrap();

    let final_state = State::load(&state_path).unwrap();
    assert_eq!(final_state.targets["timer-cd-endtime-1"], "updated");
}

#[test]
fn test_failed_update_is_not_saved() {
    let dir = tempdir().unwrap();
    let state_path = dir.path().join("state.json");
    let lock_path = dir.path().join("state.lock");

    let result: anyhow::Result<()> = with_state_lock(&lock_path, &state_path, |state| {
        state.targets.insert("k".to_string(), "v".to_string());
        anyhow::bail!("abort")
    });
    assert!(result.is_err());
    assert!(State::load(&state_path).unwrap().targets.is_empty());
}

#[test]
fn test_fixed_target_survives_reload() {
    let dir = tempdir().unwrap();
    let store = FileTargetStore::open(Some(&dir.path().to_path_buf())).unwrap();
    let config = TimerConfig::fixed(600).with_persistence_key("timer-cd-endtime-42");

    let mut first_mount = Countdown::new(config.clone(), store.clone());
    let first = first_mount.tick(t0());
    let target = first.target.unwrap();

    // A second mount five minutes later picks up the same target
    let mut second_mount = Countdown::new(config, store.clone());
    let second = second_mount.tick(t0() + ChronoDuration::minutes(5));
    assert_eq!(second.target, Some(target));
    assert_eq!(second.remaining.total_seconds(), 300);

    let stored = store.get("timer-cd-endtime-42").unwrap().unwrap();
    assert_eq!(DateTime::parse_from_rfc3339(&stored).unwrap(), target);
}

#[test]
fn test_stale_target_restarts_on_reload() {
    let dir = tempdir().unwrap();
    let store = FileTargetStore::open(Some(&dir.path().to_path_buf())).unwrap();
    store
        .set("timer-cd-endtime-5", "2026-10-19T07:00:00+00:00")
        .unwrap();

    let config = TimerConfig::fixed(60).with_persistence_key("timer-cd-endtime-5");
    let mut countdown = Countdown::new(config, store.clone());
    let evaluation = countdown.tick(t0());

    assert_eq!(evaluation.phase, Phase::Active);
    assert_eq!(evaluation.remaining.total_seconds(), 60);
    assert_ne!(
        store.get("timer-cd-endtime-5").unwrap().as_deref(),
        Some("2026-10-19T07:00:00+00:00")
    );
}

#[test]
fn test_clear_removes_everything() {
    let dir = tempdir().unwrap();
    let store = FileTargetStore::open(Some(&dir.path().to_path_buf())).unwrap();
    store.set("a", "2026-10-19T09:00:00+00:00").unwrap();
    store.set("b", "2026-10-19T10:00:00+00:00").unwrap();

    assert_eq!(store.list().unwrap().len(), 2);
    assert_eq!(store.clear().unwrap(), 2);
    assert!(store.list().unwrap().is_empty());
}
