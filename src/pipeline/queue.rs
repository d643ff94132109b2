//! Bounded queues between stages. Every blocking send/recv wakes up periodically to check the
//! cancel token, so a stop request is seen without draining what is still queued.

use crossbeam_channel::{Receiver, RecvTimeoutError, SendTimeoutError, Sender, bounded};
use std::time::Duration;

use crate::utils::cancel::CancelToken;
use crate::utils::config::QUEUE_POLL_MS;

/// The other side is gone, or cancel was requested.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Stopped;

pub fn queue<T>(capacity: usize) -> (Sender<T>, Receiver<T>) {
    bounded(capacity.max(1))
}

fn poll_interval() -> Duration {
    Duration::from_millis(QUEUE_POLL_MS)
}

/// Blocking send. Blocks while the queue is full; that is the backpressure.
pub fn send<T>(tx: &Sender<T>, mut item: T, cancel: &CancelToken) -> Result<(), Stopped> {
    loop {
        if cancel.is_cancelled() {
            return Err(Stopped);
        }
        match tx.send_timeout(item, poll_interval()) {
            Ok(()) => return Ok(()),
            Err(SendTimeoutError::Timeout(back)) => item = back,
            Err(SendTimeoutError::Disconnected(_)) => return Err(Stopped),
        }
    }
}

/// Blocking receive. `None` once the queue is closed and empty, or on cancel.
pub fn recv<T>(rx: &Receiver<T>, cancel: &CancelToken) -> Option<T> {
    loop {
        if cancel.is_cancelled() {
            return None;
        }
        match rx.recv_timeout(poll_interval()) {
            Ok(item) => return Some(item),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => return None,
        }
    }
}
