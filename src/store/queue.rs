//! Per-document FIFO write queue
//!
//! Each writer takes a ticket for its document id and waits until every
//! earlier ticket for the same id has been released. Writers to different
//! documents never wait on each other.

use std::collections::HashMap;
use std::sync::{Condvar, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Lane {
    next_ticket: u64,
    serving: u64,
}

#[derive(Debug, Default)]
pub struct WriteQueue {
    lanes: Mutex<HashMap<String, Lane>>,
    turn: Condvar,
}

/// Held for the duration of one write; releases the next ticket on drop
#[derive(Debug)]
pub struct WriteTurn<'a> {
    queue: &'a WriteQueue,
    document: String,
}

impl WriteQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Lane>> {
        self.lanes.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Block until it is this caller's turn to write `document`
    pub fn acquire(&self, document: &str) -> WriteTurn<'_> {
        let mut lanes = self.lock();
        let lane = lanes.entry(document.to_string()).or_default();
        let ticket = lane.next_ticket;
        lane.next_ticket += 1;

        while lanes.get(document).map(|l| l.serving) != Some(ticket) {
            tracing::debug!(document, ticket, "waiting for earlier write");
            lanes = self.turn.wait(lanes).unwrap_or_else(|e| e.into_inner());
        }

        WriteTurn {
            queue: self,
            document: document.to_string(),
        }
    }

    /// Number of writers holding or waiting for a turn on `document`
    #[allow(dead_code)]
    pub fn pending(&self, document: &str) -> u64 {
        self.lock()
            .get(document)
            .map(|l| l.next_ticket - l.serving)
            .unwrap_or(0)
    }
}

impl Drop for WriteTurn<'_> {
    fn drop(&mut self) {
        let mut lanes = self.queue.lock();
        let idle = match lanes.get_mut(&self.document) {
            Some(lane) => {
                lane.serving += 1;
                lane.serving == lane.next_ticket
            }
            None => false,
        };
        if idle {
            lanes.remove(&self.document);
        }
        drop(lanes);
        self.queue.turn.notify_all();
    }
}
