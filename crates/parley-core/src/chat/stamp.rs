//! Message ids and display timestamps.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{Local, Utc};
use parley_types::conversation::MessageId;

/// Issues strictly increasing message ids derived from the wall clock.
///
/// Ids are microseconds since the Unix epoch, bumped past the previous id
/// when two calls land in the same microsecond or the clock steps back.
#[derive(Debug, Default)]
pub struct MessageIdGenerator {
    last: AtomicU64,
}

impl MessageIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> MessageId {
        let now = u64::try_from(Utc::now().timestamp_micros()).unwrap_or(0);
        let mut previous = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(previous.saturating_add(1));
            match self.last.compare_exchange_weak(
                previous,
                candidate,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return MessageId(candidate),
                Err(actual) => previous = actual,
            }
        }
    }
}

/// Local wall-clock label in 12-hour form, e.g. "09:05 PM".
pub fn clock_label() -> String {
    Local::now().format("%I:%M %p").to_string()
}
