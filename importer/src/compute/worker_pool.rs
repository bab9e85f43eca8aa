//! Fixed-size worker pool with a three-tier load queue.
//!
//! Each worker accepts at most two in-flight jobs. Workers live in one of
//! three tiers by load: idle, assigned once, assigned twice. New jobs go to the
//! front of the least loaded tier; when every worker is assigned twice the
//! job waits in a FIFO pending queue. A completed job moves its worker down
//! one tier and drains the pending queue.
//!
//! Completion order relative to submission order is unspecified.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::mpsc;
use std::task::{Context, Poll};
use std::thread::JoinHandle;

use parking_lot::Mutex;
use tokio::sync::oneshot;

/// Maximum number of jobs a single worker holds at once.
const MAX_JOBS_PER_WORKER: usize = 2;

type Handler<Req, Resp> = dyn Fn(Req) -> Resp + Send + Sync;

struct Job<Req, Resp> {
    request: Req,
    reply: oneshot::Sender<Resp>,
}

enum Message<Req, Resp> {
    Run(Job<Req, Resp>),
    Shutdown,
}

struct Scheduler<Req, Resp> {
    /// `tiers[n]` holds the workers that currently have `n` jobs.
    tiers: [VecDeque<usize>; MAX_JOBS_PER_WORKER + 1],
    load: Vec<usize>,
    pending: VecDeque<Job<Req, Resp>>,
}

impl<Req, Resp> Scheduler<Req, Resp> {
    fn new(worker_count: usize) -> Self {
        Self {
            tiers: [(0..worker_count).collect(), VecDeque::new(), VecDeque::new()],
            load: vec![0; worker_count],
            pending: VecDeque::new(),
        }
    }

    /// Pick the least loaded worker with spare capacity and promote it.
    fn acquire(&mut self) -> Option<usize> {
        let tier = (0..MAX_JOBS_PER_WORKER).find(|&t| !self.tiers[t].is_empty())?;
        let worker = self.tiers[tier].pop_front()?;
        self.tiers[tier + 1].push_back(worker);
        self.load[worker] += 1;
        Some(worker)
    }

    /// Demote a worker after one of its jobs finished.
    fn release(&mut self, worker: usize) {
        let tier = self.load[worker];
        if tier == 0 {
            return;
        }
        if let Some(pos) = self.tiers[tier].iter().position(|&w| w == worker) {
            self.tiers[tier].remove(pos);
        }
        self.tiers[tier - 1].push_back(worker);
        self.load[worker] -= 1;
    }
}

struct Shared<Req, Resp> {
    senders: Vec<mpsc::Sender<Message<Req, Resp>>>,
    scheduler: Mutex<Scheduler<Req, Resp>>,
}

impl<Req, Resp> Shared<Req, Resp> {
    fn dispatch(&self, job: Job<Req, Resp>) {
        let mut scheduler = self.scheduler.lock();
        match scheduler.acquire() {
            Some(worker) => {
                if let Err(mpsc::SendError(Message::Run(job))) =
                    self.senders[worker].send(Message::Run(job))
                {
                    // Worker thread is gone; dropping the reply sender fails the task.
                    scheduler.release(worker);
                    drop(job);
                }
            }
            None => scheduler.pending.push_back(job),
        }
    }

    fn complete(&self, worker: usize) {
        let next = {
            let mut scheduler = self.scheduler.lock();
            scheduler.release(worker);
            scheduler.pending.pop_front()
        };
        if let Some(job) = next {
            self.dispatch(job);
        }
    }
}

/// Pool of OS threads running a shared handler function.
///
/// Explicitly constructed and owned; dropping the pool stops and joins all
/// workers after their current jobs. Safe to share between concurrent
/// imports (`&self` submission).
pub struct WorkerPool<Req: Send + 'static, Resp: Send + 'static> {
    shared: Arc<Shared<Req, Resp>>,
    threads: Vec<JoinHandle<()>>,
}

impl<Req: Send + 'static, Resp: Send + 'static> WorkerPool<Req, Resp> {
    /// Spawn `worker_count` threads (at least one) running `handler`.
    pub fn new(
        name: &str,
        worker_count: usize,
        handler: impl Fn(Req) -> Resp + Send + Sync + 'static,
    ) -> Self {
        let worker_count = worker_count.max(1);
        let handler: Arc<Handler<Req, Resp>> = Arc::new(handler);

        let mut senders = Vec::with_capacity(worker_count);
        let mut receivers = Vec::with_capacity(worker_count);
        for _ in 0..worker_count {
            let (tx, rx) = mpsc::channel();
            senders.push(tx);
            receivers.push(rx);
        }

        let shared = Arc::new(Shared {
            senders,
            scheduler: Mutex::new(Scheduler::new(worker_count)),
        });

        let threads = receivers
            .into_iter()
            .enumerate()
            .filter_map(|(index, receiver)| {
                let shared = Arc::clone(&shared);
                let handler = Arc::clone(&handler);
                std::thread::Builder::new()
                    .name(format!("{name}-{index}"))
                    .spawn(move || worker_loop(index, receiver, shared, handler))
                    .map_err(|e| log::error!("failed to spawn worker thread {name}-{index}: {e}"))
                    .ok()
            })
            .collect();

        Self { shared, threads }
    }

    /// Number of worker slots.
    pub fn worker_count(&self) -> usize {
        self.shared.senders.len()
    }

    /// Number of jobs waiting because every worker is fully assigned.
    pub fn pending_count(&self) -> usize {
        self.shared.scheduler.lock().pending.len()
    }

    /// Queue a job. The returned task resolves when a worker finishes it.
    pub fn submit(&self, request: Req) -> WorkerTask<Resp> {
        let (reply, receiver) = oneshot::channel();
        self.shared.dispatch(Job { request, reply });
        WorkerTask { receiver }
    }
}

impl<Req: Send + 'static, Resp: Send + 'static> Drop for WorkerPool<Req, Resp> {
    fn drop(&mut self) {
        for sender in &self.shared.senders {
            let _ = sender.send(Message::Shutdown);
        }
        for thread in self.threads.drain(..) {
            let _ = thread.join();
        }
    }
}

fn worker_loop<Req, Resp>(
    index: usize,
    receiver: mpsc::Receiver<Message<Req, Resp>>,
    shared: Arc<Shared<Req, Resp>>,
    handler: Arc<Handler<Req, Resp>>,
) {
    while let Ok(Message::Run(job)) = receiver.recv() {
        let response = handler(job.request);
        // The submitter may have stopped waiting; that is not an error.
        let _ = job.reply.send(response);
        shared.complete(index);
    }
}

/// Pending result of a job submitted to a [`WorkerPool`].
///
/// Resolves to `None` if the worker died before replying.
pub struct WorkerTask<Resp> {
    receiver: oneshot::Receiver<Resp>,
}

impl<Resp> Future for WorkerTask<Resp> {
    type Output = Option<Resp>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Resp>> {
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(Ok(value)) => Poll::Ready(Some(value)),
            Poll::Ready(Err(_)) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn scheduler_fills_idle_workers_first() {
        let mut s: Scheduler<(), ()> = Scheduler::new(2);
        assert_eq!(s.acquire(), Some(0));
        assert_eq!(s.acquire(), Some(1));
        // Both assigned once: next jobs double up.
        assert_eq!(s.acquire(), Some(0));
        assert_eq!(s.acquire(), Some(1));
        assert_eq!(s.acquire(), None);
    }

    #[test]
    fn scheduler_release_returns_worker_to_lower_tier() {
        let mut s: Scheduler<(), ()> = Scheduler::new(2);
        for _ in 0..4 {
            s.acquire();
        }
        s.release(1);
        assert_eq!(s.load, vec![2, 1]);
        assert_eq!(s.acquire(), Some(1));
        s.release(0);
        s.release(0);
        assert_eq!(s.load[0], 0);
        assert_eq!(s.acquire(), Some(0));
    }

    #[test]
    fn runs_jobs_and_returns_results() {
        let pool = WorkerPool::new("test", 2, |x: u32| x * 2);
        let tasks: Vec<_> = (0..10).map(|i| pool.submit(i)).collect();
        let results: Vec<u32> = tasks
            .into_iter()
            .map(|t| pollster::block_on(t).unwrap())
            .collect();
        assert_eq!(results, (0..10).map(|i| i * 2).collect::<Vec<_>>());
    }

    #[test]
    fn queues_when_all_workers_are_saturated() {
        let gate = Arc::new(Barrier::new(2));
        let started = Arc::new(AtomicUsize::new(0));
        let pool = {
            let gate = Arc::clone(&gate);
            let started = Arc::clone(&started);
            WorkerPool::new("sat", 1, move |block: bool| {
                started.fetch_add(1, Ordering::SeqCst);
                if block {
                    gate.wait();
                }
            })
        };

        let first = pool.submit(true);
        let second = pool.submit(false);
        let third = pool.submit(false);
        // One worker holds two jobs; the third waits.
        assert_eq!(pool.pending_count(), 1);

        gate.wait();
        for task in [first, second, third] {
            assert!(pollster::block_on(task).is_some());
        }
        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(started.load(Ordering::SeqCst), 3);
        assert_eq!(pool.pending_count(), 0);
    }
}
