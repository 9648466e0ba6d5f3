//! Lock-free configuration snapshots shared between the bot and its handlers.

use crate::schema::{BotConfig, Config};
use arc_swap::ArcSwap;
use std::sync::Arc;

/// Holds the live configuration; readers get a consistent snapshot without locking.
#[derive(Debug)]
pub struct ConfigCache {
    config: ArcSwap<Config>,
}

impl ConfigCache {
    /// Creates a cache holding `config`.
    pub fn new(config: Config) -> Self {
        Self {
            config: ArcSwap::from_pointee(config),
        }
    }

    /// Current snapshot.
    pub fn get(&self) -> Arc<Config> {
        self.config.load_full()
    }

    /// Current `[bot]` section.
    pub fn bot(&self) -> BotConfig {
        self.config.load().bot.clone()
    }

    /// Replaces the whole configuration.
    pub fn update(&self, config: Config) {
        self.config.store(Arc::new(config));
    }

    /// Applies `f` to a copy of the current configuration and stores the result,
    /// retrying if another writer raced in between.
    pub fn modify<F>(&self, f: F)
    where
        F: Fn(&mut Config),
    {
        self.config.rcu(|current| {
            let mut next = Config::clone(current);
            f(&mut next);
            next
        });
    }
}

impl Default for ConfigCache {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
