//! Command prefix resolution

use crate::bot::Bot;
use crate::error::FrameworkError;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tchat_common::{BoxError, Message};
use tchat_config::BotConfig;

/// Async resolver computing prefixes per message.
pub type PrefixFn =
    Arc<dyn Fn(Bot, Arc<Message>) -> BoxFuture<'static, Result<PrefixValue, BoxError>> + Send + Sync>;

/// What a dynamic resolver returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrefixValue {
    /// A single prefix.
    One(String),
    /// Candidates tried in order.
    Many(Vec<String>),
}

impl PrefixValue {
    fn into_candidates(self) -> Result<Vec<String>, FrameworkError> {
        let candidates = match self {
            Self::One(prefix) => vec![prefix],
            Self::Many(prefixes) => prefixes,
        };
        check_candidates(&candidates)?;
        Ok(candidates)
    }
}

fn check_candidates(candidates: &[String]) -> Result<(), FrameworkError> {
    if candidates.is_empty() {
        return Err(FrameworkError::Configuration(
            "prefix set must not be empty".to_string(),
        ));
    }
    if candidates.iter().any(String::is_empty) {
        return Err(FrameworkError::Configuration(
            "prefix must not be an empty string".to_string(),
        ));
    }
    Ok(())
}

/// How the bot decides which messages address it
#[derive(Clone)]
pub enum Prefix {
    /// One fixed prefix.
    Static(String),
    /// Fixed candidates tried in order.
    Set(Vec<String>),
    /// Computed per message.
    Dynamic(PrefixFn),
}

impl Prefix {
    /// A validated fixed prefix.
    pub fn fixed(prefix: impl Into<String>) -> Result<Self, FrameworkError> {
        let prefix = Self::Static(prefix.into());
        prefix.validate()?;
        Ok(prefix)
    }

    /// A validated candidate set.
    pub fn set<I, S>(prefixes: I) -> Result<Self, FrameworkError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let prefix = Self::Set(prefixes.into_iter().map(Into::into).collect());
        prefix.validate()?;
        Ok(prefix)
    }

    /// A resolver run for every message.
    pub fn dynamic<F, Fut>(resolver: F) -> Self
    where
        F: Fn(Bot, Arc<Message>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<PrefixValue, BoxError>> + Send + 'static,
    {
        Self::Dynamic(Arc::new(move |bot, message| resolver(bot, message).boxed()))
    }

    /// `Static` for one configured prefix, `Set` for several.
    pub fn from_config(config: &BotConfig) -> Result<Self, FrameworkError> {
        match config.prefixes.as_slice() {
            [single] => Self::fixed(single.clone()),
            many => Self::set(many.iter().cloned()),
        }
    }

    /// Rejects empty fixed prefixes; dynamic resolvers are checked per message.
    pub fn validate(&self) -> Result<(), FrameworkError> {
        match self {
            Self::Static(prefix) => check_candidates(std::slice::from_ref(prefix)),
            Self::Set(prefixes) => check_candidates(prefixes),
            Self::Dynamic(_) => Ok(()),
        }
    }

    /// Candidates for `message`.
    pub async fn candidates(&self, bot: &Bot, message: &Arc<Message>) -> Result<Vec<String>, BoxError> {
        match self {
            Self::Static(prefix) => Ok(vec![prefix.clone()]),
            Self::Set(prefixes) => Ok(prefixes.clone()),
            Self::Dynamic(resolver) => {
                let value = resolver(bot.clone(), Arc::clone(message)).await?;
                Ok(value.into_candidates()?)
            }
        }
    }

    /// First candidate the message content starts with.
    pub async fn find(&self, bot: &Bot, message: &Arc<Message>) -> Result<Option<String>, BoxError> {
        let candidates = self.candidates(bot, message).await?;
        Ok(candidates
            .into_iter()
            .find(|prefix| message.content.starts_with(prefix.as_str())))
    }
}

impl fmt::Debug for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(prefix) => f.debug_tuple("Static").field(prefix).finish(),
            Self::Set(prefixes) => f.debug_tuple("Set").field(prefixes).finish(),
            Self::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_validation() {
        assert!(Prefix::fixed("!").is_ok());
        assert!(matches!(Prefix::fixed(""), Err(FrameworkError::Configuration(_))));
        assert!(Prefix::set(Vec::<String>::new()).is_err());
        assert!(Prefix::set(["!", ""]).is_err());
    }

    #[test]
    fn test_from_config() {
        let mut config = BotConfig::default();
        assert!(matches!(Prefix::from_config(&config), Ok(Prefix::Static(ref p)) if p == "!"));

        config.prefixes = vec!["!".to_string(), "?".to_string()];
        assert!(matches!(Prefix::from_config(&config), Ok(Prefix::Set(ref p)) if p.len() == 2));

        config.prefixes.clear();
        assert!(Prefix::from_config(&config).is_err());
    }

    #[test]
    fn test_dynamic_value_validation() {
        assert!(PrefixValue::One(String::new()).into_candidates().is_err());
        assert!(PrefixValue::Many(Vec::new()).into_candidates().is_err());
        assert_eq!(
            PrefixValue::Many(vec!["$".to_string(), "!".to_string()])
                .into_candidates()
                .unwrap()
                .len(),
            2
        );
    }
}
