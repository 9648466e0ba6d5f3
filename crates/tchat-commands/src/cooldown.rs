//! Cooldown system for rate limiting command usage

use crate::context::Context;
use crate::error::CooldownError;
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Extracts the bucket key for a custom strategy; `None` skips the bucket.
pub type BucketKeyFn = Arc<dyn Fn(&Context) -> Option<String> + Send + Sync>;

/// Strategy deciding which invocations share a bucket
#[derive(Clone)]
pub enum BucketType {
    /// One bucket for everyone.
    Global,
    /// One bucket per channel.
    Channel,
    /// One bucket per chatter, across channels.
    User,
    /// One bucket per chatter per channel.
    Member,
    /// Per chatter, only for subscribers.
    Subscriber,
    /// Per chatter, only for moderators.
    Moderator,
    /// Per chatter, only for turbo users.
    Turbo,
    /// Caller-defined key.
    Custom {
        /// Name reported in cooldown errors.
        name: String,
        /// Key extractor.
        key: BucketKeyFn,
    },
}

impl BucketType {
    /// Creates a custom strategy.
    pub fn custom<F>(name: impl Into<String>, key: F) -> Self
    where
        F: Fn(&Context) -> Option<String> + Send + Sync + 'static,
    {
        Self::Custom {
            name: name.into(),
            key: Arc::new(key),
        }
    }

    /// Strategy name.
    pub fn name(&self) -> &str {
        match self {
            Self::Global => "global",
            Self::Channel => "channel",
            Self::User => "user",
            Self::Member => "member",
            Self::Subscriber => "subscriber",
            Self::Moderator => "moderator",
            Self::Turbo => "turbo",
            Self::Custom { name, .. } => name,
        }
    }

    /// Bucket key for `ctx`, or `None` when the strategy does not apply.
    pub fn key(&self, ctx: &Context) -> Option<String> {
        let author = ctx.author();
        match self {
            Self::Global => Some(String::new()),
            Self::Channel => Some(ctx.channel().as_str().to_string()),
            Self::User => Some(author.name.clone()),
            Self::Member => Some(format!("{}:{}", ctx.channel().as_str(), author.name)),
            Self::Subscriber => author.is_subscriber.then(|| author.name.clone()),
            Self::Moderator => author.is_mod.then(|| author.name.clone()),
            Self::Turbo => author.is_turbo.then(|| author.name.clone()),
            Self::Custom { key, .. } => key(ctx),
        }
    }
}

impl fmt::Debug for BucketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BucketType({})", self.name())
    }
}

impl fmt::Display for BucketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A cooldown group: `rate` uses per `per` in every listed bucket
#[derive(Debug, Clone)]
pub struct Cooldown {
    /// Uses allowed per window.
    pub rate: u32,
    /// Window length.
    pub per: Duration,
    /// Strategies sharing this limit.
    pub buckets: Vec<BucketType>,
}

impl Cooldown {
    /// Creates a group over `buckets`.
    pub fn new(rate: u32, per: Duration, buckets: impl IntoIterator<Item = BucketType>) -> Self {
        Self {
            rate,
            per,
            buckets: buckets.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
struct BucketKey {
    command: String,
    group: usize,
    strategy: String,
    key: String,
}

#[derive(Debug, Clone)]
struct BucketState {
    remaining: u32,
    window: Option<Instant>,
    rate: u32,
    per: Duration,
}

impl BucketState {
    const fn new(rate: u32, per: Duration) -> Self {
        Self {
            remaining: rate,
            window: None,
            rate,
            per,
        }
    }

    /// End of the window opened at `start`. `None` when it lies past what
    /// `Instant` can hold, so the window never closes.
    fn window_end(&self, start: Instant) -> Option<Instant> {
        start.checked_add(self.per)
    }

    /// Takes one use, or returns the time left until the refill.
    fn take(&mut self, now: Instant) -> Result<(), Duration> {
        if let Some(start) = self.window {
            if self.window_end(start).is_some_and(|end| now >= end) {
                self.remaining = self.rate;
                self.window = None;
            }
        }

        if self.remaining == 0 {
            let start = self.window.unwrap_or(now);
            return Err(self
                .window_end(start)
                .map_or(self.per, |end| end.saturating_duration_since(now)));
        }

        if self.window.is_none() {
            self.window = Some(now);
        }
        self.remaining -= 1;
        Ok(())
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.window.map_or(true, |start| {
            self.window_end(start).is_some_and(|end| now >= end)
        })
    }
}

/// Manager for handling command cooldowns
#[derive(Debug, Default)]
pub struct CooldownManager {
    buckets: DashMap<BucketKey, BucketState>,
}

impl CooldownManager {
    /// Create a new cooldown manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes one use from every bucket of `cooldown` that applies to `ctx`.
    ///
    /// Every applicable bucket is updated even after one is exhausted; the
    /// first exhausted bucket is reported.
    pub fn update(
        &self,
        command: &str,
        group: usize,
        cooldown: &Cooldown,
        ctx: &Context,
    ) -> Result<(), CooldownError> {
        let now = Instant::now();
        let mut limited = Vec::new();

        for bucket in &cooldown.buckets {
            let Some(key) = bucket.key(ctx) else {
                continue;
            };
            let key = BucketKey {
                command: command.to_string(),
                group,
                strategy: bucket.name().to_string(),
                key,
            };

            let mut state = self
                .buckets
                .entry(key)
                .or_insert_with(|| BucketState::new(cooldown.rate, cooldown.per));
            if let Err(retry_after) = state.take(now) {
                limited.push(CooldownError {
                    command: command.to_string(),
                    bucket: bucket.name().to_string(),
                    retry_after,
                });
            }
        }

        match limited.into_iter().next() {
            Some(err) => {
                debug!(command, bucket = %err.bucket, retry_after = ?err.retry_after, "Command on cooldown");
                Err(err)
            }
            None => Ok(()),
        }
    }

    /// Clear all cooldowns for a specific command
    pub fn reset_command(&self, command: &str) {
        self.buckets.retain(|key, _| key.command != command);
        debug!("Cleared all cooldowns for command '{}'", command);
    }

    /// Clear the per-chatter buckets of `user` for every command
    pub fn reset_user(&self, user: &str) {
        let member_suffix = format!(":{user}");
        self.buckets.retain(|key, _| match key.strategy.as_str() {
            "user" | "subscriber" | "moderator" | "turbo" => key.key != user,
            "member" => !key.key.ends_with(&member_suffix),
            _ => true,
        });
        debug!("Cleared all cooldowns for user {}", user);
    }

    /// Buckets that are mid-window
    pub fn active_buckets(&self) -> usize {
        let now = Instant::now();
        self.buckets
            .iter()
            .filter(|entry| !entry.value().is_expired(now))
            .count()
    }

    /// Drops buckets whose window has passed
    pub fn cleanup_expired(&self) {
        let now = Instant::now();
        let before = self.buckets.len();
        self.buckets.retain(|_, state| !state.is_expired(now));
        debug!(removed = before - self.buckets.len(), "Cleaned up expired cooldowns");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_refills_after_window() {
        let per = Duration::from_secs(10);
        let start = Instant::now();
        let mut state = BucketState::new(2, per);

        assert!(state.take(start).is_ok());
        assert!(state.take(start + Duration::from_secs(1)).is_ok());

        let retry = state.take(start + Duration::from_secs(4)).unwrap_err();
        assert_eq!(retry, Duration::from_secs(6));

        assert!(state.take(start + per).is_ok());
    }

    #[test]
    fn test_window_starts_at_first_use() {
        let per = Duration::from_secs(5);
        let start = Instant::now();
        let mut state = BucketState::new(1, per);
        assert!(state.is_expired(start));

        let first = start + Duration::from_secs(100);
        assert!(state.take(first).is_ok());
        assert!(!state.is_expired(first));
        assert_eq!(state.take(first + Duration::from_secs(2)).unwrap_err(), Duration::from_secs(3));
    }

    #[test]
    fn test_unbounded_window_never_refills() {
        let start = Instant::now();
        let mut state = BucketState::new(1, Duration::MAX);

        assert!(state.take(start).is_ok());
        assert!(!state.is_expired(start + Duration::from_secs(3_600)));
        assert_eq!(
            state.take(start + Duration::from_secs(3_600)).unwrap_err(),
            Duration::MAX
        );
    }

    #[test]
    fn test_bucket_names() {
        assert_eq!(BucketType::Member.name(), "member");
        let custom = BucketType::custom("room", |_ctx: &Context| None);
        assert_eq!(custom.to_string(), "room");
        assert_eq!(format!("{custom:?}"), "BucketType(room)");
    }
}
