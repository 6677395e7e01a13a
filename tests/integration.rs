//! Fan-out and unsubscribe behavior through the public API.

use crossbeam_channel::bounded;
use herald::{Emitter, EmitterConfig, Subscription};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

fn test_emitter<T: Send + Sync + 'static>() -> Emitter<T> {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::TRACE)
        .try_init();

    Emitter::with_config(EmitterConfig {
        thread_name: "integration".to_string(),
        ..Default::default()
    })
    .unwrap()
}

/// Register a handler that records every payload it sees under `name`.
fn recording(
    emitter: &Emitter<String>,
    log: &Arc<Mutex<HashMap<&'static str, Vec<String>>>>,
    name: &'static str,
) -> Subscription<String> {
    let log = Arc::clone(log);
    emitter.register(move |_, payload| {
        log.lock().entry(name).or_default().push(payload.clone());
    })
}

fn calls(log: &Mutex<HashMap<&'static str, Vec<String>>>, name: &str) -> Vec<String> {
    log.lock().get(name).cloned().unwrap_or_default()
}

// --- Fan-out ---

#[test]
fn test_every_subscriber_receives_payload() {
    let emitter = test_emitter::<String>();
    let log = Arc::new(Mutex::new(HashMap::new()));
    for name in ["a", "b", "c", "d", "e"] {
        recording(&emitter, &log, name);
    }

    emitter.emit("payload".to_string());

    for name in ["a", "b", "c", "d", "e"] {
        assert_eq!(calls(&log, name), vec!["payload".to_string()]);
    }
    assert_eq!(emitter.stats().deliveries, 5);
}

#[test]
fn test_emit_waits_for_slow_handlers() {
    let emitter = test_emitter::<u32>();
    let finished = Arc::new(AtomicUsize::new(0));
    for _ in 0..3 {
        let finished = Arc::clone(&finished);
        emitter.register(move |_, _| {
            thread::sleep(Duration::from_millis(50));
            finished.fetch_add(1, Ordering::SeqCst);
        });
    }

    emitter.emit(1);
    assert_eq!(finished.load(Ordering::SeqCst), 3);
}

#[test]
fn test_handlers_run_concurrently() {
    let emitter = test_emitter::<u32>();
    for _ in 0..4 {
        emitter.register(|_, _| thread::sleep(Duration::from_millis(100)));
    }

    let started = Instant::now();
    emitter.emit(1);
    // Sequential delivery would take at least 400ms.
    assert!(started.elapsed() < Duration::from_millis(350));
}

/// Run `emit` on its own thread and report whether it returned within `limit`.
fn emit_returns_within(emitter: &Emitter<u32>, payload: u32, limit: Duration) -> bool {
    let emitter = emitter.clone();
    let (tx, rx) = bounded(1);
    thread::spawn(move || {
        emitter.emit(payload);
        let _ = tx.send(());
    });
    rx.recv_timeout(limit).is_ok()
}

#[test]
fn test_all_handlers_of_one_emission_run_at_once() {
    let emitter = test_emitter::<u32>();
    // More handlers than a machine has cores; each waits for all the others.
    let handlers = 32;
    let barrier = Arc::new(Barrier::new(handlers));
    for _ in 0..handlers {
        let barrier = Arc::clone(&barrier);
        emitter.register(move |_, _| {
            barrier.wait();
        });
    }

    assert!(emit_returns_within(&emitter, 1, Duration::from_secs(5)));
    assert_eq!(emitter.stats().deliveries, handlers as u64);
}

#[test]
fn test_emit_not_held_up_by_stuck_async_handlers() {
    let emitter = test_emitter::<u32>();
    let gate = Arc::new(Mutex::new(()));
    let held = gate.lock();

    let stuck_gate = Arc::clone(&gate);
    let stuck = emitter.register(move |_, _| {
        let _open = stuck_gate.lock();
    });
    for _ in 0..16 {
        emitter.emit_async(0);
    }
    stuck.close();

    let delivered = Arc::new(AtomicUsize::new(0));
    let delivered_by_handler = Arc::clone(&delivered);
    emitter.register(move |_, _| {
        delivered_by_handler.fetch_add(1, Ordering::SeqCst);
    });

    assert!(emit_returns_within(&emitter, 1, Duration::from_secs(2)));
    assert_eq!(delivered.load(Ordering::SeqCst), 1);

    drop(held);
}

#[test]
fn test_emit_async_returns_before_handlers_finish() {
    let emitter = test_emitter::<u32>();
    let finished = Arc::new(AtomicUsize::new(0));
    let finished_by_handler = Arc::clone(&finished);
    emitter.register(move |_, _| {
        thread::sleep(Duration::from_millis(100));
        finished_by_handler.fetch_add(1, Ordering::SeqCst);
    });

    emitter.emit_async(1);
    assert_eq!(finished.load(Ordering::SeqCst), 0);

    thread::sleep(Duration::from_millis(300));
    assert_eq!(finished.load(Ordering::SeqCst), 1);
}

// --- Unsubscribe ---

#[test]
fn test_close_middle_subscription() {
    let emitter = test_emitter::<String>();
    let log = Arc::new(Mutex::new(HashMap::new()));
    let _a = recording(&emitter, &log, "a");
    let b = recording(&emitter, &log, "b");
    let _c = recording(&emitter, &log, "c");

    b.close();
    emitter.emit("once".to_string());

    assert_eq!(calls(&log, "a"), vec!["once".to_string()]);
    assert!(calls(&log, "b").is_empty());
    assert_eq!(calls(&log, "c"), vec!["once".to_string()]);
}

#[test]
fn test_close_in_any_order() {
    let emitter = test_emitter::<String>();
    let log = Arc::new(Mutex::new(HashMap::new()));
    let a = recording(&emitter, &log, "a");
    let b = recording(&emitter, &log, "b");
    let c = recording(&emitter, &log, "c");
    let _d = recording(&emitter, &log, "d");

    // Removing earlier registrations first used to shift later positions.
    a.close();
    c.close();
    emitter.emit("first".to_string());
    b.close();
    emitter.emit("second".to_string());

    assert!(calls(&log, "a").is_empty());
    assert_eq!(calls(&log, "b"), vec!["first".to_string()]);
    assert!(calls(&log, "c").is_empty());
    assert_eq!(
        calls(&log, "d"),
        vec!["first".to_string(), "second".to_string()]
    );
    assert_eq!(emitter.subscriber_count(), 1);
}

#[test]
fn test_close_last_subscription() {
    let emitter = test_emitter::<u32>();
    let calls = Arc::new(AtomicUsize::new(0));
    let calls_by_handler = Arc::clone(&calls);
    let only = emitter.register(move |_, _| {
        calls_by_handler.fetch_add(1, Ordering::SeqCst);
    });

    only.close();
    emitter.emit(1);

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(emitter.subscriber_count(), 0);
}

#[test]
fn test_register_after_close() {
    let emitter = test_emitter::<String>();
    let log = Arc::new(Mutex::new(HashMap::new()));
    let a = recording(&emitter, &log, "a");
    a.close();
    let b = recording(&emitter, &log, "b");

    assert_ne!(a.id(), b.id());
    emitter.emit("x".to_string());

    assert!(calls(&log, "a").is_empty());
    assert_eq!(calls(&log, "b"), vec!["x".to_string()]);
}

#[test]
fn test_close_does_not_retract_in_flight_invocation() {
    let emitter = test_emitter::<u32>();
    let completed = Arc::new(AtomicUsize::new(0));
    let completed_by_handler = Arc::clone(&completed);
    let slow = emitter.register(move |_, _| {
        thread::sleep(Duration::from_millis(100));
        completed_by_handler.fetch_add(1, Ordering::SeqCst);
    });

    emitter.emit_async(1);
    thread::sleep(Duration::from_millis(20));
    slow.close();

    thread::sleep(Duration::from_millis(200));
    assert_eq!(completed.load(Ordering::SeqCst), 1);
    assert!(!slow.is_active());
}
