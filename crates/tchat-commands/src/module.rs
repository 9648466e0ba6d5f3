//! Module catalog and lifecycle tracking.
//!
//! A module is a unit registered by name with a factory. Loading runs its
//! `prepare`, and every command, cog and listener the bot registers on the
//! same thread while `prepare` runs is recorded against the module. The record
//! is what `unload_module` removes and what `reload_module` puts back when the
//! new version fails.

use crate::bot::Bot;
use crate::cog::CogSnapshot;
use crate::command::Command;
use crate::error::{FrameworkError, ModuleError};
use crate::events::{Callback, Listener};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::thread::{self, ThreadId};
use tchat_common::BoxError;
use tracing::{debug, info, warn};

/// A loadable unit of commands, cogs and listeners.
pub trait Module: Send + Sync {
    /// Registers the module's commands, cogs and listeners on `bot`.
    fn prepare(&self, bot: &Bot) -> Result<(), BoxError>;

    /// Called before the module's registrations are removed.
    fn breakdown(&self, _bot: &Bot) {}
}

/// Creates a fresh module instance.
pub type ModuleFactory = Arc<dyn Fn() -> Box<dyn Module> + Send + Sync>;

/// What a loaded module registered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleRecord {
    /// Commands added directly.
    pub commands: Vec<String>,
    /// Aliases of those commands.
    pub aliases: Vec<String>,
    /// Cogs added.
    pub cogs: Vec<String>,
    /// Listeners subscribed directly.
    pub listeners: Vec<Listener>,
}

struct LoadedModule {
    module: Box<dyn Module>,
    record: ModuleRecord,
}

struct Recording {
    thread: ThreadId,
    module: String,
    record: ModuleRecord,
}

/// Module catalog plus the records of loaded modules.
#[derive(Default)]
pub struct ModuleManager {
    factories: RwLock<HashMap<String, ModuleFactory>>,
    loaded: RwLock<HashMap<String, LoadedModule>>,
    recording: Mutex<Vec<Recording>>,
}

impl ModuleManager {
    /// Creates an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `factory` loadable as `name`, replacing any previous factory.
    pub fn register(&self, name: impl Into<String>, factory: ModuleFactory) {
        let name = name.into();
        debug!(module = %name, "Registered module factory");
        self.factories.write().insert(name, factory);
    }

    fn factory(&self, name: &str) -> Option<ModuleFactory> {
        self.factories.read().get(name).cloned()
    }

    /// Names with a registered factory, sorted.
    pub fn available(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Loaded module names, sorted.
    pub fn loaded(&self) -> Vec<String> {
        let mut names: Vec<String> = self.loaded.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// True when `name` is loaded.
    pub fn is_loaded(&self, name: &str) -> bool {
        self.loaded.read().contains_key(name)
    }

    /// Record of the loaded module `name`.
    pub fn record(&self, name: &str) -> Option<ModuleRecord> {
        self.loaded.read().get(name).map(|loaded| loaded.record.clone())
    }

    fn begin(&self, module: &str) {
        self.recording.lock().push(Recording {
            thread: thread::current().id(),
            module: module.to_string(),
            record: ModuleRecord::default(),
        });
    }

    fn finish(&self, module: &str) -> ModuleRecord {
        let mut recording = self.recording.lock();
        let current = thread::current().id();
        recording
            .iter()
            .rposition(|r| r.thread == current && r.module == module)
            .map(|index| recording.remove(index).record)
            .unwrap_or_default()
    }

    fn with_active<F: FnOnce(&mut ModuleRecord)>(&self, f: F) {
        let current = thread::current().id();
        let mut recording = self.recording.lock();
        if let Some(active) = recording.iter_mut().rev().find(|r| r.thread == current) {
            f(&mut active.record);
        }
    }

    pub(crate) fn record_command(&self, command: &Command) {
        self.with_active(|record| {
            record.commands.push(command.name().to_string());
            record.aliases.extend(command.alias_list().iter().cloned());
        });
    }

    pub(crate) fn record_cog(&self, cog: &str) {
        self.with_active(|record| record.cogs.push(cog.to_string()));
    }

    pub(crate) fn record_listener(&self, listener: &Listener) {
        self.with_active(|record| record.listeners.push(listener.clone()));
    }

    fn take(&self, name: &str) -> Option<LoadedModule> {
        self.loaded.write().remove(name)
    }

    fn insert(&self, name: &str, loaded: LoadedModule) {
        self.loaded.write().insert(name.to_string(), loaded);
    }
}

impl fmt::Debug for ModuleManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleManager")
            .field("available", &self.available())
            .field("loaded", &self.loaded())
            .finish()
    }
}

/// Everything a module owned, held while its replacement prepares.
struct OwnedSnapshot {
    commands: Vec<Arc<Command>>,
    cogs: Vec<CogSnapshot>,
    listeners: Vec<(Listener, Callback)>,
}

impl Bot {
    /// Makes a module loadable under `name`.
    pub fn register_module<F, M>(&self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> M + Send + Sync + 'static,
        M: Module + 'static,
    {
        self.inner
            .modules
            .register(name, Arc::new(move || Box::new(factory()) as Box<dyn Module>));
    }

    /// Module catalog and records.
    pub fn modules(&self) -> &ModuleManager {
        &self.inner.modules
    }

    /// Creates the module `name` and runs its `prepare`.
    pub fn load_module(&self, name: &str) -> Result<(), FrameworkError> {
        if self.inner.modules.is_loaded(name) {
            return Err(ModuleError::AlreadyLoaded(name.to_string()).into());
        }
        let factory = self
            .inner
            .modules
            .factory(name)
            .ok_or_else(|| ModuleError::Unknown(name.to_string()))?;

        let module = factory();
        let record = self.prepare_module(name, module.as_ref())?;
        info!(
            module = name,
            commands = record.commands.len(),
            cogs = record.cogs.len(),
            listeners = record.listeners.len(),
            "Loaded module"
        );
        self.inner.modules.insert(name, LoadedModule { module, record });
        Ok(())
    }

    /// Runs `breakdown` and removes exactly what the module registered.
    pub fn unload_module(&self, name: &str) -> Result<(), FrameworkError> {
        let loaded = self
            .inner
            .modules
            .take(name)
            .ok_or_else(|| ModuleError::NotLoaded(name.to_string()))?;

        loaded.module.breakdown(self);
        self.remove_owned(&loaded.record);
        info!(module = name, "Unloaded module");
        Ok(())
    }

    /// Replaces a loaded module with a fresh instance. On failure the previous
    /// commands, aliases, cogs, listeners and record are put back.
    pub fn reload_module(&self, name: &str) -> Result<(), FrameworkError> {
        let previous = self
            .inner
            .modules
            .take(name)
            .ok_or_else(|| ModuleError::NotLoaded(name.to_string()))?;
        let Some(factory) = self.inner.modules.factory(name) else {
            self.inner.modules.insert(name, previous);
            return Err(ModuleError::Unknown(name.to_string()).into());
        };

        let snapshot = self.snapshot_owned(&previous.record);
        previous.module.breakdown(self);
        self.remove_owned(&previous.record);

        let module = factory();
        match self.prepare_module(name, module.as_ref()) {
            Ok(record) => {
                info!(module = name, "Reloaded module");
                self.inner.modules.insert(name, LoadedModule { module, record });
                Ok(())
            }
            Err(err) => {
                warn!(module = name, error = %err, "Reload failed, restoring previous state");
                self.restore_owned(snapshot);
                self.inner.modules.insert(name, previous);
                Err(err)
            }
        }
    }

    fn prepare_module(&self, name: &str, module: &dyn Module) -> Result<ModuleRecord, FrameworkError> {
        self.inner.modules.begin(name);
        let result = module.prepare(self);
        let record = self.inner.modules.finish(name);

        match result {
            Ok(()) => Ok(record),
            Err(source) => {
                warn!(module = name, error = %source, "Module prepare failed, rolling back");
                self.remove_owned(&record);
                Err(ModuleError::Prepare {
                    module: name.to_string(),
                    source,
                }
                .into())
            }
        }
    }

    fn remove_owned(&self, record: &ModuleRecord) {
        for cog in &record.cogs {
            if self.get_cog(cog).is_some() {
                let _ = self.remove_cog(cog);
            }
        }
        for command in &record.commands {
            let _ = self.remove_command(command);
        }
        for listener in &record.listeners {
            let _ = self.unsubscribe(listener);
        }
    }

    fn snapshot_owned(&self, record: &ModuleRecord) -> OwnedSnapshot {
        let commands = self
            .inner
            .registry
            .read()
            .snapshot(record.commands.as_slice());
        let cogs = record
            .cogs
            .iter()
            .filter_map(|cog| self.snapshot_cog(cog))
            .collect();
        let listeners = record
            .listeners
            .iter()
            .filter_map(|listener| {
                self.inner
                    .events
                    .callback_of(listener)
                    .map(|callback| (listener.clone(), callback))
            })
            .collect();
        OwnedSnapshot {
            commands,
            cogs,
            listeners,
        }
    }

    fn restore_owned(&self, snapshot: OwnedSnapshot) {
        for cog in snapshot.cogs {
            self.restore_cog(cog);
        }
        for err in self.inner.registry.write().restore(snapshot.commands) {
            warn!(error = %err, "Could not restore module command");
        }
        for (listener, callback) in snapshot.listeners {
            self.inner.events.restore(listener, callback);
        }
    }
}
