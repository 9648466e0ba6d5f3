//! Cogs: named groups of commands and listeners added and removed together.

use crate::bot::Bot;
use crate::command::Command;
use crate::error::FrameworkError;
use crate::events::{Callback, Listener};
use std::sync::Arc;
use tracing::{info, warn};

/// A named group of commands and event listeners.
pub trait Cog: Send + Sync + 'static {
    /// Unique cog name.
    fn name(&self) -> &str;

    /// Commands the cog provides, enumerated once when it is added.
    fn commands(self: Arc<Self>) -> Vec<Command> {
        Vec::new()
    }

    /// `(event name, callback)` pairs subscribed when the cog is added.
    fn listeners(self: Arc<Self>) -> Vec<(String, Callback)> {
        Vec::new()
    }

    /// Called after the cog's commands and listeners are registered.
    fn on_load(&self, _bot: &Bot) {}

    /// Called before the cog's commands and listeners are removed.
    fn on_unload(&self, _bot: &Bot) {}
}

#[derive(Clone)]
pub(crate) struct CogEntry {
    pub(crate) cog: Arc<dyn Cog>,
    pub(crate) commands: Vec<String>,
    pub(crate) listeners: Vec<Listener>,
}

/// Everything a cog had registered, for putting it back after a failed reload.
pub(crate) struct CogSnapshot {
    name: String,
    entry: CogEntry,
    commands: Vec<Arc<Command>>,
    listeners: Vec<(Listener, Callback)>,
}

impl Bot {
    /// Registers every command of `cog` (tagged with its name) and subscribes
    /// its listeners. Nothing stays registered when a command is rejected.
    pub fn add_cog(&self, cog: Arc<dyn Cog>) -> Result<(), FrameworkError> {
        let name = cog.name().to_string();
        let mut cogs = self.inner.cogs.write();
        if cogs.contains_key(&name) {
            return Err(FrameworkError::InvalidCog(format!("cog '{name}' is already loaded")));
        }

        let mut registered: Vec<String> = Vec::new();
        {
            let mut registry = self.inner.registry.write();
            for mut command in Arc::clone(&cog).commands() {
                command.set_cog(name.clone());
                let command_name = command.name().to_string();
                if let Err(err) = command.validate().and_then(|()| registry.register(command)) {
                    warn!(cog = %name, command = %command_name, error = %err, "Rejected cog command");
                    for done in &registered {
                        let _ = registry.unregister(done);
                    }
                    return Err(err);
                }
                registered.push(command_name);
            }
        }

        let listeners = Arc::clone(&cog)
            .listeners()
            .into_iter()
            .map(|(event, callback)| self.inner.events.subscribe(event, callback))
            .collect();

        cogs.insert(
            name.clone(),
            CogEntry {
                cog: Arc::clone(&cog),
                commands: registered,
                listeners,
            },
        );
        drop(cogs);

        self.inner.modules.record_cog(&name);
        cog.on_load(self);
        info!(cog = %name, "Added cog");
        Ok(())
    }

    /// Removes a cog with all of its commands, aliases and listeners.
    pub fn remove_cog(&self, name: &str) -> Result<(), FrameworkError> {
        let entry = self
            .inner
            .cogs
            .write()
            .remove(name)
            .ok_or_else(|| FrameworkError::InvalidCog(format!("cog '{name}' is not loaded")))?;

        entry.cog.on_unload(self);
        self.drop_cog_state(&entry);
        info!(cog = %name, "Removed cog");
        Ok(())
    }

    fn drop_cog_state(&self, entry: &CogEntry) {
        {
            let mut registry = self.inner.registry.write();
            for command in &entry.commands {
                if registry.unregister(command).is_ok() {
                    self.inner.cooldowns.reset_command(command);
                }
            }
        }
        for listener in &entry.listeners {
            let _ = self.inner.events.unsubscribe(listener);
        }
    }

    /// Loaded cog names, sorted.
    pub fn cogs(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.cogs.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// The loaded cog `name`.
    pub fn get_cog(&self, name: &str) -> Option<Arc<dyn Cog>> {
        self.inner.cogs.read().get(name).map(|entry| Arc::clone(&entry.cog))
    }

    pub(crate) fn snapshot_cog(&self, name: &str) -> Option<CogSnapshot> {
        let entry = self.inner.cogs.read().get(name).cloned()?;
        let commands = self.inner.registry.read().snapshot(entry.commands.as_slice());
        let listeners = entry
            .listeners
            .iter()
            .filter_map(|listener| {
                self.inner
                    .events
                    .callback_of(listener)
                    .map(|callback| (listener.clone(), callback))
            })
            .collect();
        Some(CogSnapshot {
            name: name.to_string(),
            entry,
            commands,
            listeners,
        })
    }

    pub(crate) fn restore_cog(&self, snapshot: CogSnapshot) {
        let failures = self.inner.registry.write().restore(snapshot.commands);
        for err in failures {
            warn!(cog = %snapshot.name, error = %err, "Could not restore cog command");
        }
        for (listener, callback) in snapshot.listeners {
            self.inner.events.restore(listener, callback);
        }
        self.inner.cogs.write().insert(snapshot.name, snapshot.entry);
    }
}
