// SPDX-License-Identifier: GPL-3.0-only
//! Thread lifecycle for frame delivery loops
//!
//! Both the V4L2 and the file source sessions deliver frames from a
//! dedicated thread. [`FrameLoop`] owns that thread and its stop signal so
//! `stop_running` can return only once no more metadata is produced.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// Returned by one iteration of a frame loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    Continue,
    Stop,
}

/// A frame loop running on its own thread
///
/// # Example
///
/// ```ignore
/// let frame_loop = FrameLoop::start_with_init(
///     "v4l2-capture",
///     || open_stream(&path),
///     move |stream| match stream.next() {
///         Ok(frame) => {
///             delegate.metadata_output(detector.detect(&frame));
///             LoopAction::Continue
///         }
///         Err(_) => LoopAction::Stop,
///     },
/// )?;
/// ```
pub struct FrameLoop {
    thread_handle: Option<JoinHandle<()>>,
    stop_signal: Arc<AtomicBool>,
    name: String,
}

impl FrameLoop {
    /// Spawn a loop that calls `init_fn` once, then `loop_fn` until it stops
    ///
    /// If initialization fails the thread exits without iterating.
    pub fn start_with_init<S, I, F>(name: &str, init_fn: I, mut loop_fn: F) -> std::io::Result<Self>
    where
        S: 'static,
        I: FnOnce() -> Result<S, String> + Send + 'static,
        F: FnMut(&mut S) -> LoopAction + Send + 'static,
    {
        let stop_signal = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop_signal);
        let thread_name = name.to_string();

        info!(name = %name, "Starting frame loop");

        let thread_handle = thread::Builder::new().name(name.to_string()).spawn(move || {
            let mut state = match init_fn() {
                Ok(state) => state,
                Err(e) => {
                    warn!(name = %thread_name, error = %e, "Frame loop initialization failed");
                    return;
                }
            };

            while !thread_stop.load(Ordering::SeqCst) {
                if loop_fn(&mut state) == LoopAction::Stop {
                    debug!(name = %thread_name, "Frame loop finished");
                    break;
                }
            }

            debug!(name = %thread_name, "Frame loop thread exiting");
        })?;

        Ok(Self {
            thread_handle: Some(thread_handle),
            stop_signal,
            name: name.to_string(),
        })
    }

    /// Spawn a thread that runs `body` with the stop signal
    ///
    /// For loops that hold borrowed resources across iterations and so
    /// cannot be split into init and step closures. `body` must return soon
    /// after the signal is set.
    pub fn spawn<F>(name: &str, body: F) -> std::io::Result<Self>
    where
        F: FnOnce(Arc<AtomicBool>) + Send + 'static,
    {
        let stop_signal = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop_signal);

        info!(name = %name, "Starting frame loop");
        let thread_handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || body(thread_stop))?;

        Ok(Self {
            thread_handle: Some(thread_handle),
            stop_signal,
            name: name.to_string(),
        })
    }

    /// Whether the thread is still alive
    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Signal the loop and wait for the thread to finish
    pub fn stop(&mut self) {
        self.stop_signal.store(true, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            debug!(name = %self.name, "Waiting for frame loop to finish");
            if let Err(e) = handle.join() {
                warn!(name = %self.name, "Frame loop thread panicked: {:?}", e);
            }
        }
    }
}

impl Drop for FrameLoop {
    fn drop(&mut self) {
        if self.thread_handle.is_some() {
            self.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_loop_stops_on_request() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let mut frame_loop = FrameLoop::start_with_init(
            "test-loop",
            || Ok(()),
            move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                thread::sleep(std::time::Duration::from_millis(1));
                LoopAction::Continue
            },
        )
        .unwrap();

        thread::sleep(std::time::Duration::from_millis(20));
        frame_loop.stop();
        assert!(!frame_loop.is_running());

        let seen = count.load(Ordering::SeqCst);
        thread::sleep(std::time::Duration::from_millis(10));
        assert_eq!(count.load(Ordering::SeqCst), seen);
    }

    #[test]
    fn test_failed_init_never_iterates() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let mut frame_loop = FrameLoop::start_with_init(
            "test-init-fail",
            || Err::<(), _>("no device".to_string()),
            move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                LoopAction::Continue
            },
        )
        .unwrap();
        frame_loop.stop();
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_loop_can_finish_by_itself() {
        let mut frame_loop =
            FrameLoop::start_with_init("test-finish", || Ok(3u32), |left| {
                if *left == 0 {
                    return LoopAction::Stop;
                }
                *left -= 1;
                LoopAction::Continue
            })
            .unwrap();
        frame_loop.stop();
        assert!(!frame_loop.is_running());
    }
}
