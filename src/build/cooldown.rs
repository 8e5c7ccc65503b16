//! In-flight placement window
//!
//! FIFO of candidates whose placement was issued but not yet confirmed.
//! Every entry shares the same duration, so insertion order is expiry order.

use rustc_hash::FxHashSet;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct CooldownWindow {
    duration: Duration,
    queue: VecDeque<(usize, Instant)>,
    members: FxHashSet<usize>,
}

impl CooldownWindow {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            queue: VecDeque::new(),
            members: FxHashSet::default(),
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Start the cooldown of a candidate; no-op if it is already cooling
    pub fn insert(&mut self, id: usize, now: Instant) -> bool {
        if !self.members.insert(id) {
            return false;
        }
        self.queue.push_back((id, now + self.duration));
        true
    }

    pub fn contains(&self, id: usize) -> bool {
        self.members.contains(&id)
    }

    /// Drop expired entries from the front; returns them in expiry order
    pub fn expire(&mut self, now: Instant) -> Vec<usize> {
        let mut expired = Vec::new();
        while let Some(&(id, deadline)) = self.queue.front() {
            if deadline > now {
                break;
            }
            self.queue.pop_front();
            self.members.remove(&id);
            expired.push(id);
        }
        expired
    }

    /// Drop a confirmed candidate before its expiry
    pub fn release(&mut self, id: usize) -> bool {
        if !self.members.remove(&id) {
            return false;
        }
        self.queue.retain(|&(other, _)| other != id);
        true
    }

    /// Expiry of the oldest entry
    pub fn next_expiry(&self) -> Option<Instant> {
        self.queue.front().map(|&(_, deadline)| deadline)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
        self.members.clear();
    }
}
