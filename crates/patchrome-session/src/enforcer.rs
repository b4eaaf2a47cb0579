//! Background polling of a shared session.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{RecvTimeoutError, Sender, bounded};
use parking_lot::Mutex;

use crate::session::{EngineFactory, Session};

/// A session shared between its owner and the enforcer thread.
pub type SharedSession<F> = Arc<Mutex<Session<F>>>;

/// Runs [`Session::poll`] every `interval` until dropped.
///
/// Hosts reset playback rate and pitch flags at will; polling puts them back
/// without any error having to be observed first.
#[derive(Debug)]
pub struct PlaybackEnforcer {
    stop: Sender<()>,
    thread: Option<JoinHandle<()>>,
}

impl PlaybackEnforcer {
    /// Starts polling `session`.
    pub fn spawn<F>(session: SharedSession<F>, interval: Duration) -> Self
    where
        F: EngineFactory + 'static,
    {
        let (stop, stopped) = bounded::<()>(1);
        let thread = std::thread::Builder::new()
            .name("patchrome-enforcer".into())
            .spawn(move || {
                tracing::debug!(?interval, "session: enforcer started");
                loop {
                    match stopped.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {
                            session.lock().poll();
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                tracing::debug!("session: enforcer stopped");
            });
        let thread = match thread {
            Ok(handle) => Some(handle),
            Err(err) => {
                tracing::warn!(%err, "session: enforcer thread failed to start");
                None
            }
        };
        Self { stop, thread }
    }

    /// Starts polling `session` at its configured
    /// [`poll_interval`](crate::EngineConfig::poll_interval).
    pub fn for_config<F>(session: SharedSession<F>) -> Self
    where
        F: EngineFactory + 'static,
    {
        let interval = session.lock().config().poll_interval();
        Self::spawn(session, interval)
    }

    /// Whether the polling thread is running.
    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for PlaybackEnforcer {
    fn drop(&mut self) {
        let _ = self.stop.try_send(());
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
