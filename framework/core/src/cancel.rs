use std::{borrow::BorrowMut, sync::Arc};

use tokio::sync::broadcast::{Receiver, Sender};
use tokio::sync::Mutex;

/// Cancellation handle for one playback session.
///
/// Every session gets a fresh handle, so a listener is tied to the specific session instance
/// it was created from. A tick loop that checks its own listener can never be confused by a
/// rapid stop/start sequence that belongs to a newer session.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    sender: Sender<()>,
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelHandle {
    pub fn new() -> Self {
        Self {
            sender: tokio::sync::broadcast::channel(1).0,
        }
    }

    pub fn cancel(&self) {
        if let Err(e) = self.sender.send(()) {
            // Will fail if nobody is listening for the cancellation, in which case the log
            // message can be ignored.
            log::trace!("Failed to send cancel signal: {e:?}");
        }
    }

    pub fn new_listener(&self) -> CancelListener {
        CancelListener::new(self.sender.subscribe())
    }
}

#[derive(Clone, Debug)]
pub struct CancelListener {
    receiver: Arc<Mutex<Receiver<()>>>,
}

impl CancelListener {
    pub(crate) fn new(receiver: Receiver<()>) -> Self {
        Self {
            receiver: Arc::new(Mutex::new(receiver)),
        }
    }

    /// Point in time check whether the session has been cancelled. A dropped handle counts as
    /// cancelled, so a discarded session silences its own loop.
    pub fn is_cancelled(&mut self) -> bool {
        match self.receiver.try_lock() {
            Ok(mut guard) => {
                match guard.try_recv() {
                    Ok(_) => true,
                    Err(tokio::sync::broadcast::error::TryRecvError::Closed) => true,
                    // If the receiver is empty or lagged then the session is still live.
                    Err(_) => false,
                }
            }
            Err(_) => false,
        }
    }

    /// Wait for the session to be cancelled. It is safe to race this with another future so
    /// that cancellation can interrupt work in progress.
    pub async fn cancelled(&mut self) {
        // A closed channel means the handle was dropped, which also counts as cancellation.
        let _ = self.receiver.borrow_mut().lock().await.recv().await;
    }
}

#[derive(derive_more::Error, derive_more::Display, Debug)]
pub struct SessionCancelledError {
    msg: String,
}

impl Default for SessionCancelledError {
    fn default() -> Self {
        Self {
            msg: "Playback session cancelled before finishing".to_string(),
        }
    }
}
