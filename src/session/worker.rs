// SPDX-License-Identifier: GPL-3.0-only

//! Background worker for slow session calls
//!
//! Starting a capture session can block for a long time, so the controller
//! hands start jobs to a dedicated thread. Jobs run strictly in submission
//! order. Stopping is never queued here; it happens synchronously on the
//! caller's thread.

use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

type Job = Box<dyn FnOnce() + Send + 'static>;

pub(crate) struct SessionWorker {
    sender: Option<mpsc::Sender<Job>>,
    handle: Option<JoinHandle<()>>,
    name: String,
}

impl SessionWorker {
    /// Spawn the worker thread
    pub fn spawn(name: &str) -> std::io::Result<Self> {
        let (sender, receiver) = mpsc::channel::<Job>();
        let thread_name = name.to_string();

        let handle = thread::Builder::new().name(name.to_string()).spawn(move || {
            debug!(name = %thread_name, "Session worker started");
            while let Ok(job) = receiver.recv() {
                job();
            }
            debug!(name = %thread_name, "Session worker exiting");
        })?;

        Ok(Self {
            sender: Some(sender),
            handle: Some(handle),
            name: name.to_string(),
        })
    }

    /// Queue a job; returns false if the worker is gone
    pub fn dispatch(&self, job: impl FnOnce() + Send + 'static) -> bool {
        match &self.sender {
            Some(sender) => sender.send(Box::new(job)).is_ok(),
            None => false,
        }
    }
}

impl Drop for SessionWorker {
    fn drop(&mut self) {
        // Closing the channel ends the receive loop once queued jobs drain
        self.sender.take();
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            warn!(name = %self.name, "Session worker panicked");
        }
    }
}
