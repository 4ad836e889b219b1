//! Clock seam for components that need the current instant.

use chrono::{DateTime, Local, NaiveDateTime, Utc};

/// Source of the current instant.
///
/// The decision engine never consults a clock; this trait exists for
/// the protocol layer (deadlines, event timestamps, schedule
/// evaluation) so that tests can inject a fixed or stepped time
/// source.
pub trait Clock: Send + Sync {
    /// Returns the current instant in UTC.
    ///
    /// Used for event timestamps and deadlines.
    fn now(&self) -> DateTime<Utc>;

    /// Returns the device's wall clock.
    ///
    /// Used for schedule evaluation: a rule window of 09:00–17:00
    /// means the time people read on the wall next to the door.
    fn now_local(&self) -> NaiveDateTime {
        self.now().naive_utc()
    }
}

/// The system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn now_local(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}
