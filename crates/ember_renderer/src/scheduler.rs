//! Fixed worker pool for bucket rendering.
//!
//! Workers sleep on a condition variable between frames and are woken by a
//! monotonically increasing frame generation. Comparing generations instead
//! of a boolean "go" flag means a worker can neither miss a wakeup nor be
//! woken into a frame that already finished.
//!
//! Within a frame, tiles are claimed by an atomic fetch-add cursor. The hot
//! cursor and the cold active-worker counter sit on separate cache lines so
//! tile claiming does not false-share with completion bookkeeping.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

use crate::tile::Tile;

type TileJob = Arc<dyn Fn(Tile) + Send + Sync>;

#[repr(align(64))]
struct PaddedCounter(AtomicU32);

struct FrameState {
    generation: u64,
    tiles: Arc<Vec<Tile>>,
    job: Option<TileJob>,
}

struct DoneState {
    /// Generation of the most recently completed frame.
    completed: u64,
}

struct Shared {
    frame: Mutex<FrameState>,
    start: Condvar,
    done: Mutex<DoneState>,
    done_signal: Condvar,
    next_tile: PaddedCounter,
    active_workers: PaddedCounter,
    exit: AtomicBool,
}

/// Fixed pool of rendering workers, created once and kept for the lifetime
/// of the renderer.
pub struct TileScheduler {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

impl TileScheduler {
    /// Pool sized to hardware concurrency, or a single deterministic worker
    /// in debug builds.
    pub fn new() -> Self {
        let worker_count = if cfg!(debug_assertions) {
            1
        } else {
            std::thread::available_parallelism()
                .map(std::num::NonZeroUsize::get)
                .unwrap_or(1)
        };
        Self::with_workers(worker_count)
    }

    pub fn with_workers(worker_count: usize) -> Self {
        let worker_count = worker_count.max(1);
        let shared = Arc::new(Shared {
            frame: Mutex::new(FrameState {
                generation: 0,
                tiles: Arc::new(Vec::new()),
                job: None,
            }),
            start: Condvar::new(),
            done: Mutex::new(DoneState { completed: 0 }),
            done_signal: Condvar::new(),
            next_tile: PaddedCounter(AtomicU32::new(0)),
            active_workers: PaddedCounter(AtomicU32::new(0)),
            exit: AtomicBool::new(false),
        });

        let workers = (0..worker_count)
            .map(|i| {
                let shared = shared.clone();
                std::thread::Builder::new()
                    .name(format!("ember-worker-{i}"))
                    .spawn(move || worker_loop(&shared))
                    .expect("failed to spawn render worker")
            })
            .collect();

        log::info!("tile scheduler started with {worker_count} workers");
        Self { shared, workers }
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Runs `job` over every tile across the worker pool and blocks until
    /// the frame is complete.
    pub fn render_frame<F>(&self, tiles: Vec<Tile>, job: F)
    where
        F: Fn(Tile) + Send + Sync,
    {
        let job: Arc<dyn Fn(Tile) + Send + Sync + '_> = Arc::new(job);
        // SAFETY: the job may borrow caller state, which it must not outlive.
        // Workers hold their clones only while processing this generation and
        // drop them before decrementing the active count; we block below
        // until that count reaches zero and then drop the last clone, so
        // every reference is gone before this call returns.
        let job: TileJob = unsafe {
            std::mem::transmute::<Arc<dyn Fn(Tile) + Send + Sync + '_>, TileJob>(job)
        };

        let generation = {
            let mut frame = self.shared.frame.lock().unwrap();
            frame.generation += 1;
            frame.tiles = Arc::new(tiles);
            frame.job = Some(job);
            // Every worker from the previous generation has already
            // decremented the active count, so no stale fetch-add can race
            // with this reset.
            self.shared.next_tile.0.store(0, Ordering::Relaxed);
            self.shared
                .active_workers
                .0
                .store(self.workers.len() as u32, Ordering::Release);
            frame.generation
        };
        self.shared.start.notify_all();

        let mut done = self.shared.done.lock().unwrap();
        while done.completed < generation {
            done = self.shared.done_signal.wait(done).unwrap();
        }
        drop(done);

        // Last job reference; see the safety comment above.
        self.shared.frame.lock().unwrap().job = None;
    }
}

impl Default for TileScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TileScheduler {
    fn drop(&mut self) {
        {
            // Set under the frame lock so a worker checking its wait
            // predicate cannot miss the final wakeup.
            let _frame = self.shared.frame.lock().unwrap();
            self.shared.exit.store(true, Ordering::Release);
            self.shared.start.notify_all();
        }
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

fn worker_loop(shared: &Shared) {
    let mut last_generation = 0u64;

    loop {
        let (generation, tiles, job) = {
            let mut frame = shared.frame.lock().unwrap();
            while frame.generation == last_generation && !shared.exit.load(Ordering::Acquire) {
                frame = shared.start.wait(frame).unwrap();
            }
            if shared.exit.load(Ordering::Acquire) {
                return;
            }
            last_generation = frame.generation;
            (
                frame.generation,
                frame.tiles.clone(),
                frame.job.clone().expect("dispatched frame carries a job"),
            )
        };

        loop {
            let index = shared.next_tile.0.fetch_add(1, Ordering::Relaxed) as usize;
            if index >= tiles.len() {
                break;
            }
            job(tiles[index]);
        }

        // The job reference must die before the coordinator can observe the
        // frame as complete.
        drop(job);
        drop(tiles);

        if shared.active_workers.0.fetch_sub(1, Ordering::AcqRel) == 1 {
            let mut done = shared.done.lock().unwrap();
            done.completed = generation;
            shared.done_signal.notify_all();
        }
    }
}
