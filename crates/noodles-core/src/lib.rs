mod macros;

pub mod id;
pub mod post;

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

pub use id::{PostId, UserId};
pub use post::{LikeEntry, Post, PostFilter, Task, Viewer};

/// Seconds since the unix epoch
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(pub u64);

impl Timestamp {
    pub fn now() -> Self {
        Self(
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default(),
        )
    }

    /// Seconds elapsed from `earlier` to `self`, saturating at zero
    pub fn secs_since(self, earlier: Self) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    pub fn to_offset_date_time(self) -> Option<time::OffsetDateTime> {
        i64::try_from(self.0)
            .ok()
            .and_then(|secs| time::OffsetDateTime::from_unix_timestamp(secs).ok())
    }

    /// Long calendar date, e.g. "October 18, 2026"
    pub fn fmt_date(self) -> Option<String> {
        let dt = self.to_offset_date_time()?;
        Some(format!("{} {}, {}", dt.month(), dt.day(), dt.year()))
    }
}

impl From<u64> for Timestamp {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
