//! FILENAME: app/src/fetch.rs
// PURPOSE: Fetch generations.
// CONTEXT: Every refresh takes a ticket before it goes to the data service.
// Only the holder of the newest ticket may apply its response; anything
// older resolved late and is dropped.

use std::sync::atomic::{AtomicU64, Ordering};

/// Proof of which generation a fetch belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FetchTicket(u64);

impl FetchTicket {
    pub fn generation(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Default)]
pub struct FetchGenerations {
    latest: AtomicU64,
}

impl FetchGenerations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new generation; every earlier ticket becomes stale.
    pub fn issue(&self) -> FetchTicket {
        FetchTicket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: FetchTicket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }

    /// Makes every outstanding ticket stale without starting a fetch.
    pub fn invalidate(&self) {
        self.latest.fetch_add(1, Ordering::SeqCst);
    }

    pub fn current(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }
}
