//! Command registry for managing bot commands

use crate::command::Command;
use crate::error::FrameworkError;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// Name and alias tables kept in sync on every mutation.
///
/// A key is either a primary name or an alias, never both.
#[derive(Debug, Default)]
pub struct Registry {
    commands: HashMap<String, Arc<Command>>,
    aliases: HashMap<String, String>,
    case_insensitive: bool,
}

impl Registry {
    /// Create a new case-sensitive registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry that lowercases names and aliases on insert and lookup.
    pub fn case_insensitive() -> Self {
        Self {
            case_insensitive: true,
            ..Self::default()
        }
    }

    /// True when lookups ignore case.
    pub const fn is_case_insensitive(&self) -> bool {
        self.case_insensitive
    }

    fn key(&self, name: &str) -> String {
        if self.case_insensitive {
            name.to_lowercase()
        } else {
            name.to_string()
        }
    }

    fn is_taken(&self, key: &str) -> bool {
        self.commands.contains_key(key) || self.aliases.contains_key(key)
    }

    /// Registers `command` under its name and aliases.
    pub fn register(&mut self, command: Command) -> Result<Arc<Command>, FrameworkError> {
        let command = Arc::new(command);
        self.register_arc(Arc::clone(&command))?;
        Ok(command)
    }

    /// Registers a shared command. Nothing is inserted when any key collides.
    pub fn register_arc(&mut self, command: Arc<Command>) -> Result<(), FrameworkError> {
        let name = self.key(command.name());
        let mut claimed = HashSet::new();
        claimed.insert(name.clone());

        let mut alias_keys = Vec::with_capacity(command.alias_list().len());
        for alias in command.alias_list() {
            let key = self.key(alias);
            if !claimed.insert(key.clone()) {
                warn!(command = %command.name(), alias = %alias, "Alias repeats the command's own keys");
                return Err(FrameworkError::DuplicateCommand {
                    name: alias.clone(),
                });
            }
            alias_keys.push(key);
        }

        if let Some(taken) = claimed.iter().find(|key| self.is_taken(key)) {
            warn!(command = %command.name(), key = %taken, "Rejected command registration");
            return Err(FrameworkError::DuplicateCommand {
                name: taken.clone(),
            });
        }

        for key in alias_keys {
            self.aliases.insert(key, name.clone());
        }
        debug!(command = %command.name(), aliases = ?command.alias_list(), "Registered command");
        self.commands.insert(name, command);
        Ok(())
    }

    /// Removes the command `name` and every alias pointing to it.
    pub fn unregister(&mut self, name: &str) -> Result<Arc<Command>, FrameworkError> {
        let key = self.key(name);
        let command = self
            .commands
            .remove(&key)
            .ok_or_else(|| FrameworkError::NotFound(name.to_string()))?;
        self.aliases.retain(|_, target| *target != key);
        debug!(command = %command.name(), "Unregistered command");
        Ok(command)
    }

    /// Looks `token` up as an alias first, then as a name.
    pub fn resolve(&self, token: &str) -> Option<Arc<Command>> {
        let key = self.key(token);
        let name = self.aliases.get(&key).unwrap_or(&key);
        self.commands.get(name).cloned()
    }

    /// True when `token` is a registered name or alias.
    pub fn contains(&self, token: &str) -> bool {
        self.is_taken(&self.key(token))
    }

    /// Registered primary names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.commands.keys().cloned().collect();
        names.sort();
        names
    }

    /// Aliases pointing at the command `name`, sorted.
    pub fn aliases_of(&self, name: &str) -> Vec<String> {
        let key = self.key(name);
        let mut aliases: Vec<String> = self
            .aliases
            .iter()
            .filter(|(_, target)| **target == key)
            .map(|(alias, _)| alias.clone())
            .collect();
        aliases.sort();
        aliases
    }

    /// Iterates over registered commands.
    pub fn commands(&self) -> impl Iterator<Item = &Arc<Command>> {
        self.commands.values()
    }

    /// Number of registered commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// True when no command is registered.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Shared handles of the named commands that are registered.
    pub fn snapshot<S: AsRef<str>>(&self, names: &[S]) -> Vec<Arc<Command>> {
        names
            .iter()
            .filter_map(|name| self.commands.get(&self.key(name.as_ref())).cloned())
            .collect()
    }

    /// Re-registers commands taken with [`Registry::snapshot`], skipping any
    /// whose keys were claimed in the meantime.
    pub fn restore(&mut self, commands: Vec<Arc<Command>>) -> Vec<FrameworkError> {
        commands
            .into_iter()
            .filter_map(|command| self.register_arc(command).err())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::Args;
    use crate::context::Context;
    use crate::error::CommandResult;

    async fn noop(_ctx: Context, _args: Args) -> CommandResult {
        Ok(())
    }

    #[test]
    fn test_duplicate_name_leaves_registry_unchanged() {
        let mut registry = Registry::new();
        registry.register(Command::new("hello", noop).alias("hi")).unwrap();

        let err = registry.register(Command::new("hello", noop).alias("hey")).unwrap_err();
        assert!(matches!(err, FrameworkError::DuplicateCommand { ref name } if name == "hello"));
        assert_eq!(registry.len(), 1);
        assert!(!registry.contains("hey"));
        assert_eq!(registry.aliases_of("hello"), vec!["hi".to_string()]);
    }

    #[test]
    fn test_alias_collision_rolls_back_primary_name() {
        let mut registry = Registry::new();
        registry.register(Command::new("hello", noop).alias("hi")).unwrap();

        assert!(registry.register(Command::new("wave", noop).alias("hi")).is_err());
        assert!(registry.resolve("wave").is_none());
        assert_eq!(registry.names(), vec!["hello".to_string()]);

        assert!(registry.register(Command::new("greet", noop).alias("hello")).is_err());
        assert!(!registry.contains("greet"));
    }

    #[test]
    fn test_name_colliding_with_alias_fails() {
        let mut registry = Registry::new();
        registry.register(Command::new("hello", noop).alias("hi")).unwrap();
        assert!(registry.register(Command::new("hi", noop)).is_err());
    }

    #[test]
    fn test_self_colliding_aliases_fail() {
        let mut registry = Registry::new();
        assert!(registry.register(Command::new("a", noop).alias("a")).is_err());
        assert!(registry.register(Command::new("a", noop).aliases(["b", "b"])).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_resolve_alias_then_name() {
        let mut registry = Registry::new();
        registry.register(Command::new("foo", noop)).unwrap();
        registry.register(Command::new("bar", noop).alias("baz")).unwrap();

        assert_eq!(registry.resolve("foo").unwrap().name(), "foo");
        assert_eq!(registry.resolve("baz").unwrap().name(), "bar");
        assert!(registry.resolve("FOO").is_none());
        assert!(registry.resolve("qux").is_none());
    }

    #[test]
    fn test_unregister_removes_aliases() {
        let mut registry = Registry::new();
        registry.register(Command::new("bar", noop).aliases(["baz", "qux"])).unwrap();

        let removed = registry.unregister("bar").unwrap();
        assert_eq!(removed.name(), "bar");
        assert!(registry.resolve("baz").is_none());
        assert!(!registry.contains("qux"));
        assert!(matches!(registry.unregister("bar"), Err(FrameworkError::NotFound(_))));
    }

    #[test]
    fn test_case_insensitive_lookup() {
        let mut registry = Registry::case_insensitive();
        registry.register(Command::new("Hello", noop).alias("HI")).unwrap();

        assert!(registry.resolve("hello").is_some());
        assert!(registry.resolve("hi").is_some());
        assert!(registry.register(Command::new("HELLO", noop)).is_err());
        assert!(registry.unregister("HeLLo").is_ok());
    }

    #[test]
    fn test_snapshot_and_restore() {
        let mut registry = Registry::new();
        registry.register(Command::new("a", noop).alias("aa")).unwrap();
        registry.register(Command::new("b", noop)).unwrap();

        let saved = registry.snapshot(&["a", "missing"]);
        assert_eq!(saved.len(), 1);
        registry.unregister("a").unwrap();

        assert!(registry.restore(saved).is_empty());
        assert_eq!(registry.resolve("aa").unwrap().name(), "a");
        assert_eq!(registry.len(), 2);
    }
}
