use std::time::{SystemTime, UNIX_EPOCH};

/// Source of "now" for timestamp assignment and TTL cutoffs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Clock {
    /// Wall clock, nanoseconds since the Unix epoch.
    #[default]
    System,
    /// A fixed instant, for deterministic replays and tests.
    Fixed(i64),
}

impl Clock {
    /// Current time in nanoseconds.
    pub fn now(&self) -> i64 {
        match self {
            Clock::System => SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|elapsed| i64::try_from(elapsed.as_nanos()).unwrap_or(i64::MAX))
                .unwrap_or(0),
            Clock::Fixed(now) => *now,
        }
    }
}

/// What a reader does with cells older than their family's TTL cutoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExpireMode {
    /// Erase through the live cursor as the scan passes them.
    #[default]
    Inline,
    /// Remember the keys and erase them once the scan reaches end of stream.
    Deferred,
    /// Hide them without erasing.
    Retain,
}

/// Options shared by every scan and mutation issued through a [`Table`](crate::Table).
#[derive(Debug, Clone, Default)]
pub struct TableOption {
    pub(crate) expire_mode: ExpireMode,
    pub(crate) clock: Clock,
}

impl TableOption {
    /// Choose how expired cells are garbage collected during scans.
    pub fn expire_mode(self, expire_mode: ExpireMode) -> Self {
        TableOption {
            expire_mode,
            ..self
        }
    }

    /// Choose the clock used for `AUTO_ASSIGN` timestamps and TTL cutoffs.
    pub fn clock(self, clock: Clock) -> Self {
        TableOption { clock, ..self }
    }

    /// Configured expiry behaviour.
    pub fn get_expire_mode(&self) -> ExpireMode {
        self.expire_mode
    }

    /// Configured clock.
    pub fn get_clock(&self) -> Clock {
        self.clock
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let option = TableOption::default()
            .expire_mode(ExpireMode::Deferred)
            .clock(Clock::Fixed(42));
        assert_eq!(option.get_expire_mode(), ExpireMode::Deferred);
        assert_eq!(option.get_clock().now(), 42);
    }

    #[test]
    fn system_clock_is_after_epoch() {
        assert!(Clock::System.now() > 0);
    }
}
