//! A small fixed-size pool of named worker threads
//!
//! Jobs are boxed closures pulled off a shared queue. Stopping the pool only
//! closes intake: jobs already queued or running still finish, and nobody
//! joins the workers.

use std::collections::VecDeque;
use std::sync::Arc;
use std::thread;

use crate::error::ImageFetchError;

use parking_lot::{Condvar, Mutex};

type Job = Box<dyn FnOnce() + Send + 'static>;

struct Queue {
    jobs: VecDeque<Job>,
    open: bool,
}

struct Shared {
    queue: Mutex<Queue>,
    work_ready: Condvar,
}

pub struct WorkerPool {
    shared: Arc<Shared>,
}

impl WorkerPool {
    pub fn new(name: &str, workers: usize) -> Self {
        let shared = Arc::new(Shared {
            queue: Mutex::new(Queue {
                jobs: VecDeque::new(),
                open: true,
            }),
            work_ready: Condvar::new(),
        });

        for index in 0..workers.max(1) {
            let shared = Arc::clone(&shared);
            thread::Builder::new()
                .name(format!("{name}-{index}"))
                .spawn(move || worker_loop(&shared))
                .expect("failed spawning worker thread");
        }

        Self { shared }
    }

    /// Queue a job, or hand it back untouched when intake is closed
    pub fn submit<F>(&self, job: F) -> Result<(), ImageFetchError>
    where
        F: FnOnce() + Send + 'static,
    {
        let mut queue = self.shared.queue.lock();
        if !queue.open {
            return Err(ImageFetchError::Stopped);
        }
        queue.jobs.push_back(Box::new(job));
        drop(queue);
        self.shared.work_ready.notify_one();
        Ok(())
    }

    /// Close intake without waiting on in-flight work
    pub fn stop(&self) {
        let mut queue = self.shared.queue.lock();
        queue.open = false;
        drop(queue);
        self.shared.work_ready.notify_all();
    }
}

fn worker_loop(shared: &Shared) {
    loop {
        let job = {
            let mut queue = shared.queue.lock();
            loop {
                if let Some(job) = queue.jobs.pop_front() {
                    break job;
                }
                if !queue.open {
                    return;
                }
                shared.work_ready.wait(&mut queue);
            }
        };
        job();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ImageFetchError;

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn runs_every_submitted_job() {
        let pool = WorkerPool::new("test-pool", 4);
        let (send, recv) = mpsc::channel();
        for index in 0..8 {
            let send = send.clone();
            pool.submit(move || send.send(index).unwrap()).unwrap();
        }

        let mut seen: Vec<i32> = (0..8)
            .map(|_| recv.recv_timeout(Duration::from_secs(5)).unwrap())
            .collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn stop_closes_intake_but_drains_the_queue() {
        let pool = WorkerPool::new("test-pool", 1);
        let ran = Arc::new(AtomicUsize::new(0));
        let (send, recv) = mpsc::channel();

        {
            let ran = Arc::clone(&ran);
            let send = send.clone();
            pool.submit(move || {
                // Hold the only worker so the next job is still queued when
                // the pool stops
                std::thread::sleep(Duration::from_millis(50));
                ran.fetch_add(1, Ordering::SeqCst);
                send.send(()).unwrap();
            })
            .unwrap();
        }
        {
            let ran = Arc::clone(&ran);
            pool.submit(move || {
                ran.fetch_add(1, Ordering::SeqCst);
                send.send(()).unwrap();
            })
            .unwrap();
        }

        pool.stop();
        assert_eq!(
            pool.submit(|| {}).unwrap_err(),
            ImageFetchError::Stopped,
        );

        recv.recv_timeout(Duration::from_secs(5)).unwrap();
        recv.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(ran.load(Ordering::SeqCst), 2);
    }
}
