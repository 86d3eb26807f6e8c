//! Cancellation token tests.

use std::thread;

use flashscan::CancellationToken;

#[test]
fn cancellation_token_default_not_cancelled() {
    let token = CancellationToken::new();
    assert!(!token.is_cancelled());
}

#[test]
fn cancellation_token_cancel() {
    let token = CancellationToken::new();
    token.cancel();
    assert!(token.is_cancelled());

    // Cancelling twice is harmless.
    token.cancel();
    assert!(token.is_cancelled());
}

#[test]
fn cancellation_token_clone_shares_state() {
    let token = CancellationToken::new();
    let clone = token.clone();
    assert!(!clone.is_cancelled());

    token.cancel();
    assert!(clone.is_cancelled());
}

#[test]
fn cancellation_token_default_trait() {
    let token = CancellationToken::default();
    assert!(!token.is_cancelled());
}

#[test]
fn cancellation_seen_by_worker_thread() {
    let token = CancellationToken::new();
    let worker_view = token.clone();

    let worker = thread::spawn(move || {
        while !worker_view.is_cancelled() {
            thread::yield_now();
        }
    });

    token.cancel();
    worker.join().unwrap();
}
