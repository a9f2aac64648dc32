use time::OffsetDateTime;

/// Options for decoding a [`crate::SenMLPack`]
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Resolve the records right after decoding
    pub resolve: bool,

    /// Moment relative times are anchored to. `None` reads the system clock
    /// when resolution happens.
    pub now: Option<OffsetDateTime>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            resolve: false,
            now: None,
        }
    }
}

impl Config {
    /// Decode and resolve in one step
    pub fn resolving() -> Self {
        Self {
            resolve: true,
            ..Default::default()
        }
    }

    /// Anchor relative times to a fixed moment instead of the system clock
    pub fn with_now(mut self, now: OffsetDateTime) -> Self {
        self.now = Some(now);
        self
    }

    pub(crate) fn now(&self) -> OffsetDateTime {
        self.now.unwrap_or_else(OffsetDateTime::now_utc)
    }
}
