//! Instance teardown with pending wakes.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use rill::runtime::{
    suspend, ContextFault, IdentityLevel, RootContext, ScriptHost,
};

#[test]
fn teardown_abandons_pending_wakes_without_stopping_driver() {
    let host = ScriptHost::new();
    host.start_scheduler();

    let doomed = host.create_instance(Arc::new(RootContext::default()));
    let survivor = host.create_instance(Arc::new(RootContext::default()));

    // A waiter far in the future on the instance about to be destroyed.
    let abandoned = {
        let doomed = doomed.clone();
        thread::spawn(move || suspend::wait_parked(&doomed, IdentityLevel::DEFAULT, 60.0))
    };

    // Give the worker time to register before teardown.
    let deadline = Instant::now() + Duration::from_secs(2);
    while doomed.registry().is_empty() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(1));
    }
    assert_eq!(doomed.registry().pending(), 1);

    host.destroy_instance(&doomed);
    assert_eq!(host.instances().len(), 1);

    // The abandoned waiter unblocks with a teardown fault, never a resume.
    let outcome = abandoned.join().unwrap();
    match outcome {
        Err(err) => assert_eq!(
            err.to_string(),
            ContextFault::Detached.to_string()
        ),
        Ok(elapsed) => panic!("abandoned wait was resumed with {}", elapsed),
    }

    // The driver survives teardown and still services other instances.
    assert!(host.driver().is_running());
    let elapsed = suspend::wait_parked(&survivor, IdentityLevel::DEFAULT, 0.02).unwrap();
    assert!(elapsed >= 0.02);

    host.stop_scheduler();
}

#[test]
fn destroy_is_idempotent() {
    let host = ScriptHost::new();
    let instance = host.create_instance(Arc::new(RootContext::default()));
    host.destroy_instance(&instance);
    host.destroy_instance(&instance);
    assert!(host.instances().is_empty());
}
