//! Stress scenarios.
//!
//! Every worker runs on a thread created and joined through the library, so a
//! scenario exercises the lifecycle code as well as the primitive under test.
//! Shared counters are only ever touched under the primitive being checked,
//! with relaxed load/store pairs: a broken exclusion shows up as lost updates.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use frankenpthread_core::pthread::{
    self, Barrier, BarrierAttr, Cond, Mutex, Once, SpinLock, SpinRwLock, ThreadAttr,
};
use frankenpthread_core::semaphore::Semaphore;
use frankenpthread_core::{Context, LogLevel};

use crate::HarnessError;
use crate::report::ScenarioReport;

/// Bounded depth used by the handoff scenarios.
const QUEUE_CAPACITY: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scenario {
    MutexContention,
    SpinContention,
    RwlockMixed,
    Rendezvous,
    OnceRace,
    SemaphoreHandoff,
    CondQueue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScenarioParams {
    pub threads: u32,
    pub iterations: u32,
}

impl Default for ScenarioParams {
    fn default() -> Self {
        Self {
            threads: 4,
            iterations: 1_000,
        }
    }
}

impl Scenario {
    pub const ALL: [Self; 7] = [
        Self::MutexContention,
        Self::SpinContention,
        Self::RwlockMixed,
        Self::Rendezvous,
        Self::OnceRace,
        Self::SemaphoreHandoff,
        Self::CondQueue,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::MutexContention => "mutex-contention",
            Self::SpinContention => "spin-contention",
            Self::RwlockMixed => "rwlock-mixed",
            Self::Rendezvous => "rendezvous",
            Self::OnceRace => "once-race",
            Self::SemaphoreHandoff => "semaphore-handoff",
            Self::CondQueue => "cond-queue",
        }
    }

    /// Parse a scenario name (case-insensitive, `_` accepted for `-`).
    #[must_use]
    pub fn from_name(raw: &str) -> Option<Self> {
        let wanted = raw.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL.into_iter().find(|s| s.name() == wanted)
    }

    const fn min_threads(self) -> u32 {
        match self {
            Self::RwlockMixed | Self::SemaphoreHandoff | Self::CondQueue => 2,
            _ => 1,
        }
    }

    /// Run the scenario on threads owned by `ctx` and log its outcome.
    pub fn run(
        self,
        ctx: &Arc<Context>,
        params: &ScenarioParams,
    ) -> Result<ScenarioReport, HarnessError> {
        if params.threads < self.min_threads() || params.iterations == 0 {
            return Err(HarnessError::Params(format!(
                "{} needs at least {} thread(s) and 1 iteration",
                self.name(),
                self.min_threads()
            )));
        }
        let start = Instant::now();
        let (expected, observed) = match self {
            Self::MutexContention => mutex_contention(ctx, params)?,
            Self::SpinContention => spin_contention(ctx, params)?,
            Self::RwlockMixed => rwlock_mixed(ctx, params)?,
            Self::Rendezvous => rendezvous(ctx, params)?,
            Self::OnceRace => once_race(ctx, params)?,
            Self::SemaphoreHandoff => semaphore_handoff(ctx, params)?,
            Self::CondQueue => cond_queue(ctx, params)?,
        };
        let elapsed_ns = u64::try_from(start.elapsed().as_nanos()).unwrap_or(u64::MAX);
        let report = ScenarioReport {
            scenario: self.name().to_string(),
            threads: params.threads,
            iterations: params.iterations,
            expected,
            observed,
            passed: expected == observed,
            elapsed_ns,
        };
        let level = if report.passed {
            LogLevel::Info
        } else {
            LogLevel::Error
        };
        ctx.log().emit_with(level, "scenario_finished", |e| {
            e.with_op("harness", self.name())
                .with_latency_ns(elapsed_ns)
                .with_details(serde_json::json!({
                    "threads": report.threads,
                    "iterations": report.iterations,
                    "expected": report.expected,
                    "observed": report.observed,
                    "passed": report.passed,
                }))
        });
        Ok(report)
    }
}

// ---------------------------------------------------------------------------
// Worker plumbing
// ---------------------------------------------------------------------------

/// Create one library thread per closure and join them all, returning their
/// exit values in order.
fn run_workers<F>(ctx: &Arc<Context>, workers: Vec<F>) -> Result<Vec<usize>, HarnessError>
where
    F: FnOnce() -> usize + Send + 'static,
{
    let attr = ThreadAttr::default();
    let mut handles = Vec::with_capacity(workers.len());
    for worker in workers {
        handles.push(pthread::create(ctx, &attr, worker)?);
    }
    let mut values = Vec::with_capacity(handles.len());
    for handle in handles {
        values.push(pthread::join(ctx, handle)?);
    }
    Ok(values)
}

fn bump(counter: &AtomicU64) {
    let v = counter.load(Ordering::Relaxed);
    counter.store(v + 1, Ordering::Relaxed);
}

fn total(params: &ScenarioParams) -> u64 {
    u64::from(params.threads) * u64::from(params.iterations)
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

fn mutex_contention(
    ctx: &Arc<Context>,
    params: &ScenarioParams,
) -> Result<(u64, u64), HarnessError> {
    let mutex = Arc::new(Mutex::with_context(Arc::clone(ctx))?);
    let counter = Arc::new(AtomicU64::new(0));
    let iterations = params.iterations;
    let workers = (0..params.threads)
        .map(|_| {
            let mutex = Arc::clone(&mutex);
            let counter = Arc::clone(&counter);
            move || {
                for _ in 0..iterations {
                    if mutex.lock().is_err() {
                        return 1;
                    }
                    bump(&counter);
                    if mutex.unlock().is_err() {
                        return 1;
                    }
                }
                0
            }
        })
        .collect();
    run_workers(ctx, workers)?;
    Ok((total(params), counter.load(Ordering::Relaxed)))
}

fn spin_contention(
    ctx: &Arc<Context>,
    params: &ScenarioParams,
) -> Result<(u64, u64), HarnessError> {
    let lock = Arc::new(SpinLock::new());
    let counter = Arc::new(AtomicU64::new(0));
    let iterations = params.iterations;
    let workers = (0..params.threads)
        .map(|_| {
            let lock = Arc::clone(&lock);
            let counter = Arc::clone(&counter);
            move || {
                for _ in 0..iterations {
                    lock.lock();
                    bump(&counter);
                    if lock.unlock().is_err() {
                        return 1;
                    }
                }
                0
            }
        })
        .collect();
    run_workers(ctx, workers)?;
    Ok((total(params), counter.load(Ordering::Relaxed)))
}

/// Half the threads write, the rest read. Readers must never see a
/// half-finished write: each writer bumps `a` then `b` inside the lock.
fn rwlock_mixed(ctx: &Arc<Context>, params: &ScenarioParams) -> Result<(u64, u64), HarnessError> {
    let lock = Arc::new(SpinRwLock::new());
    let a = Arc::new(AtomicU64::new(0));
    let b = Arc::new(AtomicU64::new(0));
    let torn = Arc::new(AtomicU64::new(0));
    let writers = params.threads / 2;
    let iterations = params.iterations;
    let workers: Vec<Box<dyn FnOnce() -> usize + Send>> = (0..params.threads)
        .map(|i| {
            let lock = Arc::clone(&lock);
            let a = Arc::clone(&a);
            let b = Arc::clone(&b);
            let torn = Arc::clone(&torn);
            let worker: Box<dyn FnOnce() -> usize + Send> = if i < writers {
                Box::new(move || {
                    for _ in 0..iterations {
                        lock.write_lock();
                        bump(&a);
                        bump(&b);
                        if lock.write_unlock().is_err() {
                            return 1;
                        }
                    }
                    0
                })
            } else {
                Box::new(move || {
                    for _ in 0..iterations {
                        lock.read_lock();
                        if a.load(Ordering::Relaxed) != b.load(Ordering::Relaxed) {
                            torn.fetch_add(1, Ordering::Relaxed);
                        }
                        if lock.read_unlock().is_err() {
                            return 1;
                        }
                    }
                    0
                })
            };
            worker
        })
        .collect();
    run_workers(ctx, workers)?;
    let expected = u64::from(writers) * u64::from(iterations);
    // A torn read counts as a lost update.
    let observed = b
        .load(Ordering::Relaxed)
        .saturating_sub(torn.load(Ordering::Relaxed));
    Ok((expected, observed))
}

/// One serial thread per generation.
fn rendezvous(ctx: &Arc<Context>, params: &ScenarioParams) -> Result<(u64, u64), HarnessError> {
    let barrier = Arc::new(Barrier::new(params.threads, &BarrierAttr::default())?);
    let iterations = params.iterations;
    let workers = (0..params.threads)
        .map(|_| {
            let barrier = Arc::clone(&barrier);
            move || {
                let mut serial = 0;
                for _ in 0..iterations {
                    match barrier.wait() {
                        Ok(r) if r.is_serial() => serial += 1,
                        Ok(_) => {}
                        Err(_) => break,
                    }
                }
                serial
            }
        })
        .collect();
    let serials: usize = run_workers(ctx, workers)?.into_iter().sum();
    Ok((u64::from(iterations), serials as u64))
}

/// Every thread races through the same list of once tokens.
fn once_race(ctx: &Arc<Context>, params: &ScenarioParams) -> Result<(u64, u64), HarnessError> {
    let tokens: Arc<Vec<Once>> = Arc::new((0..params.iterations).map(|_| Once::new()).collect());
    let runs = Arc::new(AtomicU64::new(0));
    let workers = (0..params.threads)
        .map(|_| {
            let tokens = Arc::clone(&tokens);
            let runs = Arc::clone(&runs);
            move || {
                for token in tokens.iter() {
                    token.call_once(|| {
                        runs.fetch_add(1, Ordering::SeqCst);
                    });
                }
                0
            }
        })
        .collect();
    run_workers(ctx, workers)?;
    Ok((u64::from(params.iterations), runs.load(Ordering::SeqCst)))
}

/// Producers and one consumer over a bounded semaphore pair.
fn semaphore_handoff(
    ctx: &Arc<Context>,
    params: &ScenarioParams,
) -> Result<(u64, u64), HarnessError> {
    let items = Arc::new(Semaphore::new_in(Arc::clone(ctx), false, 0)?);
    let slots = Arc::new(Semaphore::new_in(Arc::clone(ctx), false, QUEUE_CAPACITY)?);
    let producers = params.threads - 1;
    let per_producer = params.iterations;
    let expected = u64::from(producers) * u64::from(per_producer);
    let consumed = Arc::new(AtomicU64::new(0));

    let mut workers: Vec<Box<dyn FnOnce() -> usize + Send>> = Vec::new();
    for _ in 0..producers {
        let items = Arc::clone(&items);
        let slots = Arc::clone(&slots);
        workers.push(Box::new(move || {
            for _ in 0..per_producer {
                if slots.wait().is_err() || items.post().is_err() {
                    return 1;
                }
            }
            0
        }));
    }
    {
        let consumed = Arc::clone(&consumed);
        workers.push(Box::new(move || {
            for _ in 0..expected {
                if items.wait().is_err() || slots.post().is_err() {
                    return 1;
                }
                consumed.fetch_add(1, Ordering::Relaxed);
            }
            0
        }));
    }
    run_workers(ctx, workers)?;
    Ok((expected, consumed.load(Ordering::Relaxed)))
}

/// Producers and one consumer over a mutex/condition-variable queue.
fn cond_queue(ctx: &Arc<Context>, params: &ScenarioParams) -> Result<(u64, u64), HarnessError> {
    struct Queue {
        mutex: Mutex,
        changed: Cond,
        depth: AtomicU64,
    }

    let queue = Arc::new(Queue {
        mutex: Mutex::with_context(Arc::clone(ctx))?,
        changed: Cond::with_context(Arc::clone(ctx))?,
        depth: AtomicU64::new(0),
    });
    let producers = params.threads - 1;
    let per_producer = params.iterations;
    let expected = u64::from(producers) * u64::from(per_producer);
    let consumed = Arc::new(AtomicU64::new(0));

    let mut workers: Vec<Box<dyn FnOnce() -> usize + Send>> = Vec::new();
    for _ in 0..producers {
        let q = Arc::clone(&queue);
        workers.push(Box::new(move || {
            for _ in 0..per_producer {
                let pushed = (|| {
                    q.mutex.lock()?;
                    while q.depth.load(Ordering::Relaxed) >= u64::from(QUEUE_CAPACITY) {
                        q.changed.wait(&q.mutex)?;
                    }
                    bump(&q.depth);
                    q.changed.broadcast()?;
                    q.mutex.unlock()
                })();
                if pushed.is_err() {
                    return 1;
                }
            }
            0
        }));
    }
    {
        let q = Arc::clone(&queue);
        let consumed = Arc::clone(&consumed);
        workers.push(Box::new(move || {
            for _ in 0..expected {
                let popped = (|| {
                    q.mutex.lock()?;
                    while q.depth.load(Ordering::Relaxed) == 0 {
                        q.changed.wait(&q.mutex)?;
                    }
                    let d = q.depth.load(Ordering::Relaxed);
                    q.depth.store(d - 1, Ordering::Relaxed);
                    q.changed.broadcast()?;
                    q.mutex.unlock()
                })();
                if popped.is_err() {
                    return 1;
                }
                consumed.fetch_add(1, Ordering::Relaxed);
            }
            0
        }));
    }
    run_workers(ctx, workers)?;
    Ok((expected, consumed.load(Ordering::Relaxed)))
}
