//! Channels between the upload worker and the UI thread.
//!
//! Both channels are unbounded `std::sync::mpsc` queues: pushing never blocks
//! and never fails, and draining never waits. A fresh pair is created for
//! every upload so nothing from an earlier lifecycle can leak into the next.

use crate::upload::{LinkKind, StatusEvent};
use log::debug;
use std::sync::mpsc::{self, Receiver, Sender};

pub fn status_channel() -> (StatusSender, StatusReceiver) {
    let (tx, rx) = mpsc::channel();
    (StatusSender { inner: tx }, StatusReceiver { inner: rx })
}

pub fn progress_channel() -> (ProgressSender, ProgressReceiver) {
    let (tx, rx) = mpsc::channel();
    (ProgressSender { inner: tx }, ProgressReceiver { inner: rx })
}

#[derive(Debug, Clone)]
pub struct StatusSender {
    inner: Sender<StatusEvent>,
}

impl StatusSender {
    pub fn push(&self, event: StatusEvent) {
        if let Err(e) = self.inner.send(event) {
            debug!("Status receiver is gone, dropping {:?}", e.0);
        }
    }

    pub fn message(&self, text: impl Into<String>) {
        self.push(StatusEvent::Message(text.into()));
    }

    pub fn failure(&self, text: impl Into<String>) {
        self.push(StatusEvent::Failure(text.into()));
    }

    pub fn link(&self, url: impl Into<String>, kind: LinkKind) {
        self.push(StatusEvent::Link {
            url: url.into(),
            kind,
        });
    }

    pub fn complete(&self) {
        self.push(StatusEvent::Complete);
    }
}

#[derive(Debug)]
pub struct StatusReceiver {
    inner: Receiver<StatusEvent>,
}

impl StatusReceiver {
    /// Everything queued since the last drain, oldest first.
    pub fn drain_all(&self) -> Vec<StatusEvent> {
        self.inner.try_iter().collect()
    }
}

#[derive(Debug, Clone)]
pub struct ProgressSender {
    inner: Sender<u8>,
}

impl ProgressSender {
    pub fn push(&self, percent: u8) {
        if self.inner.send(percent.min(100)).is_err() {
            debug!("Progress receiver is gone, dropping {}%", percent);
        }
    }
}

#[derive(Debug)]
pub struct ProgressReceiver {
    inner: Receiver<u8>,
}

impl ProgressReceiver {
    /// Consumes every pending sample and returns only the newest one.
    pub fn drain_latest(&self) -> Option<u8> {
        self.inner.try_iter().last()
    }
}
