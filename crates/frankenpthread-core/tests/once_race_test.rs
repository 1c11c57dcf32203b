use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use frankenpthread_core::pthread::Once;

static TOKEN: Once = Once::new();
static RUNS: AtomicUsize = AtomicUsize::new(0);
static PUBLISHED: AtomicUsize = AtomicUsize::new(0);

#[test]
fn hundred_racing_threads_run_init_once() {
    let start = Arc::new(std::sync::Barrier::new(100));
    let threads: Vec<_> = (0..100)
        .map(|_| {
            let start = Arc::clone(&start);
            std::thread::spawn(move || {
                start.wait();
                TOKEN.call_once(|| {
                    RUNS.fetch_add(1, Ordering::SeqCst);
                    std::thread::sleep(std::time::Duration::from_millis(5));
                    PUBLISHED.store(42, Ordering::Relaxed);
                });
                // Init's effects are visible to every caller on return.
                PUBLISHED.load(Ordering::Relaxed)
            })
        })
        .collect();
    for t in threads {
        assert_eq!(t.join().unwrap(), 42);
    }
    assert_eq!(RUNS.load(Ordering::SeqCst), 1);
    assert!(TOKEN.is_completed());
}
