//! Command checks and the chat permission ladder

use crate::context::Context;
use crate::error::CommandError;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tchat_common::{Author, BoxError};
use tracing::{debug, trace};

/// Predicate evaluated synchronously.
pub type SyncPredicate = Arc<dyn Fn(&Context) -> Result<bool, BoxError> + Send + Sync>;

/// Predicate evaluated as a future.
pub type AsyncPredicate =
    Arc<dyn Fn(Context) -> BoxFuture<'static, Result<bool, BoxError>> + Send + Sync>;

#[derive(Clone)]
enum Predicate {
    Sync(SyncPredicate),
    Async(AsyncPredicate),
}

/// A named predicate gating a command.
#[derive(Clone)]
pub struct Check {
    name: String,
    predicate: Predicate,
}

impl Check {
    /// Creates a synchronous check.
    pub fn new<F>(name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Context) -> Result<bool, BoxError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            predicate: Predicate::Sync(Arc::new(predicate)),
        }
    }

    /// Creates an asynchronous check.
    pub fn new_async<F, Fut>(name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<bool, BoxError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            predicate: Predicate::Async(Arc::new(move |ctx| predicate(ctx).boxed())),
        }
    }

    /// Passes when the author ranks at least `required`.
    pub fn permission(required: Permission) -> Self {
        Self::new(format!("permission:{required}"), move |ctx: &Context| {
            let owners = ctx.bot().owners();
            Ok(Permission::of(ctx.author(), &owners) >= required)
        })
    }

    /// Passes only for the listed logins (case-insensitive).
    pub fn owner_only<I, S>(owners: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let owners: Vec<String> = owners
            .into_iter()
            .map(|owner| owner.as_ref().to_lowercase())
            .collect();
        Self::new("owner_only", move |ctx: &Context| {
            Ok(owners.iter().any(|owner| *owner == ctx.author().name))
        })
    }

    /// Check name reported in failures.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Evaluates the predicate against `ctx`.
    pub async fn evaluate(&self, ctx: &Context) -> Result<bool, BoxError> {
        match &self.predicate {
            Predicate::Sync(predicate) => predicate(ctx),
            Predicate::Async(predicate) => predicate(ctx.clone()).await,
        }
    }
}

impl fmt::Debug for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.predicate {
            Predicate::Sync(_) => "sync",
            Predicate::Async(_) => "async",
        };
        f.debug_struct("Check")
            .field("name", &self.name)
            .field("kind", &kind)
            .finish()
    }
}

/// Runs `checks` in order, stopping at the first `false` or error.
pub(crate) async fn run_checks(command: &str, checks: &[Check], ctx: &Context) -> Result<(), CommandError> {
    for check in checks {
        trace!(command, check = check.name(), "Evaluating check");
        match check.evaluate(ctx).await {
            Ok(true) => {}
            Ok(false) => {
                debug!(command, check = check.name(), "Check refused invocation");
                return Err(CommandError::CheckFailure {
                    command: command.to_string(),
                    check: check.name().to_string(),
                    source: None,
                });
            }
            Err(source) => {
                debug!(command, check = check.name(), error = %source, "Check raised an error");
                return Err(CommandError::CheckFailure {
                    command: command.to_string(),
                    check: check.name().to_string(),
                    source: Some(source),
                });
            }
        }
    }
    Ok(())
}

/// Chat permission levels, lowest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Permission {
    /// Anyone in chat
    Everyone = 0,
    /// Channel subscribers
    Subscriber = 1,
    /// VIP badge holders
    Vip = 2,
    /// Channel moderators
    Moderator = 3,
    /// The channel owner
    Broadcaster = 4,
    /// Configured bot owners
    Owner = 5,
}

impl Permission {
    /// Get the permission level name as a string
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Everyone => "everyone",
            Self::Subscriber => "subscriber",
            Self::Vip => "vip",
            Self::Moderator => "moderator",
            Self::Broadcaster => "broadcaster",
            Self::Owner => "owner",
        }
    }

    /// Highest level `author` holds.
    pub fn of(author: &Author, owners: &[String]) -> Self {
        if owners.iter().any(|owner| owner.eq_ignore_ascii_case(&author.name)) {
            Self::Owner
        } else if author.is_broadcaster {
            Self::Broadcaster
        } else if author.is_mod {
            Self::Moderator
        } else if author.is_vip {
            Self::Vip
        } else if author.is_subscriber {
            Self::Subscriber
        } else {
            Self::Everyone
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_ordering() {
        assert!(Permission::Owner > Permission::Broadcaster);
        assert!(Permission::Broadcaster > Permission::Moderator);
        assert!(Permission::Moderator > Permission::Vip);
        assert!(Permission::Vip > Permission::Subscriber);
        assert!(Permission::Subscriber > Permission::Everyone);
    }

    #[test]
    fn test_permission_of_author() {
        let owners = vec!["BossUser".to_string()];
        assert_eq!(Permission::of(&Author::new("viewer"), &owners), Permission::Everyone);
        assert_eq!(
            Permission::of(&Author::new("sub").subscriber().vip(), &owners),
            Permission::Vip
        );
        assert_eq!(
            Permission::of(&Author::new("mod").moderator().subscriber(), &owners),
            Permission::Moderator
        );
        assert_eq!(
            Permission::of(&Author::new("streamer").broadcaster(), &owners),
            Permission::Broadcaster
        );
        assert_eq!(Permission::of(&Author::new("bossuser"), &owners), Permission::Owner);
    }

    #[test]
    fn test_check_debug_shows_kind() {
        let check = Check::new("always", |_: &Context| Ok(true));
        assert_eq!(check.name(), "always");
        assert!(format!("{check:?}").contains("sync"));

        let check = Check::new_async("later", |_ctx| async { Ok(false) });
        assert!(format!("{check:?}").contains("async"));
    }
}
