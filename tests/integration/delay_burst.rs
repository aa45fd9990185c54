//! Burst scheduling: many delays registered in a tight loop.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use rill::runtime::{suspend, RootContext, ScriptHost};

#[test]
fn hundred_delays_fire_together_without_blocking_caller() {
    let host = ScriptHost::new();
    host.start_scheduler();
    let instance = host.create_instance(Arc::new(RootContext::default()));
    let caller = instance.root().clone();

    let counter = Arc::new(AtomicUsize::new(0));
    let registered_at = Instant::now();
    for _ in 0..100 {
        let counter = counter.clone();
        suspend::delay(&instance, &caller, 0.02, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();
    }
    let register_time = registered_at.elapsed().as_secs_f64();

    // The caller returned from all hundred calls well before the delay.
    assert!(
        register_time < 0.02,
        "registration loop took {}s",
        register_time
    );
    assert_eq!(instance.registry().pending(), 100);

    // All hundred mature at roughly the same instant.
    let deadline = Instant::now() + Duration::from_secs(2);
    while counter.load(Ordering::SeqCst) < 100 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(1));
    }
    let total = registered_at.elapsed().as_secs_f64();

    assert_eq!(counter.load(Ordering::SeqCst), 100);
    assert!(total >= 0.02, "callbacks fired before the delay elapsed");
    assert!(instance.registry().is_empty());
    host.stop_scheduler();
}
