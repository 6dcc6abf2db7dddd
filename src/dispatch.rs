//! Worker pool that runs asynchronous publishes.

use crate::error::{HubError, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::thread;

pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

/// Lazily started pool of named worker threads fed by an unbounded channel.
///
/// Workers exit once every sender is gone and the queue is drained, so
/// dropping the dispatcher never blocks.
pub(crate) struct Dispatcher {
    workers: usize,
    thread_name: String,
    sender: Mutex<Option<Sender<Job>>>,
}

impl Dispatcher {
    pub(crate) fn new(workers: usize, thread_name: String) -> Self {
        Self {
            workers,
            thread_name,
            sender: Mutex::new(None),
        }
    }

    /// Queue a job, starting the workers on first use.
    pub(crate) fn submit(&self, job: Job) -> Result<()> {
        let sender = {
            let mut slot = self.sender.lock();
            match slot.as_ref() {
                Some(sender) => sender.clone(),
                None => {
                    let sender = self.start()?;
                    *slot = Some(sender.clone());
                    sender
                }
            }
        };

        sender.send(job).map_err(|_| HubError::DispatcherClosed)
    }

    pub(crate) fn is_started(&self) -> bool {
        self.sender.lock().is_some()
    }

    fn start(&self) -> Result<Sender<Job>> {
        let (sender, receiver) = unbounded::<Job>();

        for index in 0..self.workers {
            let receiver = receiver.clone();
            thread::Builder::new()
                .name(format!("{}-{}", self.thread_name, index))
                .spawn(move || run_worker(receiver))?;
        }

        tracing::debug!(
            workers = self.workers,
            thread_name = %self.thread_name,
            "started async dispatcher"
        );
        Ok(sender)
    }
}

fn run_worker(receiver: Receiver<Job>) {
    for job in receiver.iter() {
        // Deliveries are isolated by the hub; this only catches completion callbacks.
        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
            tracing::error!("async publish job panicked");
        }
    }
}
