use std::time::{Duration, Instant};

#[derive(Debug, Default)]
pub struct PollGate {
    open_sessions: usize,
}

impl PollGate {
    pub fn acquire(&mut self) {
        self.open_sessions += 1;
    }

    pub fn release(&mut self) {
        self.open_sessions = self.open_sessions.saturating_sub(1);
    }

    pub fn is_open(&self) -> bool {
        self.open_sessions == 0
    }

    pub fn open_sessions(&self) -> usize {
        self.open_sessions
    }
}

#[derive(Debug)]
pub struct PollLoop {
    interval: Duration,
    next_due: Instant,
    expedited: bool,
}

impl PollLoop {
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
            next_due: now,
            expedited: false,
        }
    }

    /// Returns true at most once per interval. After a stall the schedule is
    /// re-anchored on `now` instead of firing the missed ticks back to back.
    pub fn due(&mut self, now: Instant) -> bool {
        if self.expedited {
            self.expedited = false;
            self.next_due = now + self.interval;
            return true;
        }
        if now < self.next_due {
            return false;
        }
        self.next_due += self.interval;
        if self.next_due <= now {
            self.next_due = now + self.interval;
        }
        true
    }

    pub fn expedite(&mut self) {
        self.expedited = true;
    }

    pub fn until_due(&self, now: Instant) -> Duration {
        if self.expedited {
            return Duration::ZERO;
        }
        self.next_due.saturating_duration_since(now)
    }
}
