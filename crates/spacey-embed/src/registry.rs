// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module registry
//!
//! Two tables, both fixed once the host has finished starting up:
//!
//! - the builtin table of script modules compiled into the host binary,
//!   each available as source text and as a function index into the
//!   snapshot blob generated from that source;
//! - the native table of modules implemented by the host, whose exports
//!   object is built on first use by a registered init function.
//!
//! Which form of a builtin gets used is a build decision ([`CompileStrategy`]),
//! made once when the registry is constructed.

use crate::engine::{Engine, EngineResult};
use crate::error::{BridgeError, Result};
use crate::lifecycle::Owned;
use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Row of a builtin module table, usually declared with
/// [`builtin_modules!`](crate::builtin_modules).
#[derive(Debug, Clone, Copy)]
pub struct BuiltinModule {
    /// Module id, matched exactly
    pub name: &'static str,
    /// Module source text
    pub source: &'static [u8],
    /// Index of the module's factory in the snapshot blob
    pub snapshot_index: u32,
}

impl BuiltinModule {
    /// Describe a builtin module
    pub const fn new(name: &'static str, source: &'static [u8], snapshot_index: u32) -> Self {
        Self {
            name,
            source,
            snapshot_index,
        }
    }
}

/// How builtin modules are compiled in this build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileStrategy {
    /// Compile from source text at load time
    Source,
    /// Load precompiled factories from the snapshot blob
    Snapshot,
}

impl CompileStrategy {
    /// Strategy selected by the `snapshot` cargo feature
    pub const BUILD: Self = if cfg!(feature = "snapshot") {
        Self::Snapshot
    } else {
        Self::Source
    };
}

/// Where a registered module's code comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorOrigin {
    /// Implemented by the host, exports built by an init function
    NativeHandler,
    /// Builtin source text
    SourceBuffer(&'static [u8]),
    /// Builtin factory in the snapshot blob
    SnapshotIndex(u32),
}

/// Registry entry: one id, one origin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDescriptor {
    /// Module id
    pub id: String,
    /// Code origin
    pub origin: DescriptorOrigin,
}

/// Builtin script modules
#[derive(Debug, Clone)]
pub struct BuiltinRegistry {
    descriptors: BTreeMap<&'static str, ModuleDescriptor>,
    snapshot: &'static [u8],
    strategy: CompileStrategy,
}

impl BuiltinRegistry {
    /// Build the registry for this build's [`CompileStrategy`].
    ///
    /// `snapshot` is the blob the table's snapshot indices point into; it is
    /// ignored by source builds.
    pub fn new(table: &'static [BuiltinModule], snapshot: &'static [u8]) -> Self {
        Self::with_strategy(table, snapshot, CompileStrategy::BUILD)
    }

    /// A registry with no builtin modules
    pub fn empty() -> Self {
        Self::new(&[], &[])
    }

    /// A registry pinned to `strategy` instead of the build's.
    ///
    /// The strategy still holds for the registry's whole lifetime; this is
    /// for tooling that ships both forms of a table.
    pub fn with_strategy(
        table: &'static [BuiltinModule],
        snapshot: &'static [u8],
        strategy: CompileStrategy,
    ) -> Self {
        let descriptors = table
            .iter()
            .map(|module| {
                let origin = match strategy {
                    CompileStrategy::Snapshot => DescriptorOrigin::SnapshotIndex(module.snapshot_index),
                    CompileStrategy::Source => DescriptorOrigin::SourceBuffer(module.source),
                };
                let descriptor = ModuleDescriptor {
                    id: module.name.to_string(),
                    origin,
                };
                (module.name, descriptor)
            })
            .collect();

        Self {
            descriptors,
            snapshot,
            strategy,
        }
    }

    /// Exact-match lookup
    pub fn get(&self, id: &str) -> Option<&ModuleDescriptor> {
        self.descriptors.get(id)
    }

    /// Whether `id` is a builtin script module
    pub fn contains(&self, id: &str) -> bool {
        self.descriptors.contains_key(id)
    }

    /// Module ids in sorted order
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.descriptors.keys().copied()
    }

    /// The snapshot blob
    pub fn snapshot_blob(&self) -> &'static [u8] {
        self.snapshot
    }

    /// Strategy the descriptors were built for
    pub fn strategy(&self) -> CompileStrategy {
        self.strategy
    }
}

impl Default for BuiltinRegistry {
    fn default() -> Self {
        Self::empty()
    }
}

/// Builds a native module's exports object
pub type NativeInit<E> = Box<dyn Fn(&E) -> EngineResult<<E as Engine>::Value>>;

/// Host capability for loading native modules from shared libraries.
///
/// How a library is opened and what its entry point looks like is entirely
/// up to the host; the bridge only hands over a fresh exports object.
pub trait NativeLoader<E: Engine> {
    /// Open the library at `location` and register its exports on `exports`.
    fn load(&self, engine: &E, location: &Path, exports: &E::Value) -> std::result::Result<(), String>;
}

struct NativeEntry<'e, E: Engine> {
    init: NativeInit<E>,
    exports: OnceCell<Owned<'e, E>>,
}

/// Host-implemented modules
pub struct NativeModuleTable<'e, E: Engine> {
    engine: &'e E,
    entries: BTreeMap<String, NativeEntry<'e, E>>,
    loader: Option<Box<dyn NativeLoader<E>>>,
}

impl<'e, E: Engine> NativeModuleTable<'e, E> {
    /// Create an empty table
    pub fn new(engine: &'e E) -> Self {
        Self {
            engine,
            entries: BTreeMap::new(),
            loader: None,
        }
    }

    /// Register a native module. Later registrations of the same name win.
    pub fn register<F>(&mut self, name: impl Into<String>, init: F)
    where
        F: Fn(&E) -> EngineResult<E::Value> + 'static,
    {
        self.entries.insert(
            name.into(),
            NativeEntry {
                init: Box::new(init),
                exports: OnceCell::new(),
            },
        );
    }

    /// Install the dynamic loading capability
    pub fn set_loader(&mut self, loader: impl NativeLoader<E> + 'static) {
        self.loader = Some(Box::new(loader));
    }

    /// Whether `id` is registered
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Registered names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.keys().map(String::as_str)
    }

    /// Exports of native module `id`, constructing them on first use.
    ///
    /// `Ok(None)` means no such module. The returned handle is a separate
    /// reference; the table keeps its own until it is dropped.
    pub fn get(&self, id: &str) -> Result<Option<Owned<'e, E>>> {
        let Some(entry) = self.entries.get(id) else {
            return Ok(None);
        };

        if let Some(exports) = entry.exports.get() {
            return Ok(Some(exports.duplicate()));
        }

        match Owned::adopt(self.engine, (entry.init)(self.engine)) {
            Ok(exports) => {
                tracing::debug!(module = id, "constructed native module");
                let handle = exports.duplicate();
                // Init functions receive `&E`, not the table, so nothing can
                // have filled the cell since the check above.
                let _ = entry.exports.set(exports);
                Ok(Some(handle))
            }
            Err(error) => {
                let reason = self.engine.error_message(&error);
                tracing::warn!(module = id, %reason, "native module init failed");
                Err(BridgeError::native_load(id, reason))
            }
        }
    }

    /// Load a shared library through the host's [`NativeLoader`] and return
    /// the exports it registered.
    pub fn dlopen(&self, location: &Path) -> Result<Owned<'e, E>> {
        let module = location.display().to_string();
        let Some(loader) = self.loader.as_ref() else {
            return Err(BridgeError::native_load(module, "dynamic loading is not available"));
        };

        let exports = Owned::new(self.engine, self.engine.create_object());
        loader
            .load(self.engine, location, &exports)
            .map_err(|reason| {
                tracing::warn!(module = %module, %reason, "dlopen failed");
                BridgeError::native_load(module.as_str(), reason)
            })?;
        Ok(exports)
    }

    fn descriptors(&self) -> impl Iterator<Item = ModuleDescriptor> + '_ {
        self.entries.keys().map(|id| ModuleDescriptor {
            id: id.clone(),
            origin: DescriptorOrigin::NativeHandler,
        })
    }
}

impl<E: Engine> fmt::Debug for NativeModuleTable<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeModuleTable")
            .field("modules", &self.entries.keys().collect::<Vec<_>>())
            .field("loader", &self.loader.is_some())
            .finish()
    }
}

/// Both module tables, fixed at startup
pub struct ModuleRegistry<'e, E: Engine> {
    builtins: BuiltinRegistry,
    natives: NativeModuleTable<'e, E>,
}

impl<'e, E: Engine> ModuleRegistry<'e, E> {
    /// Start building a registry
    pub fn builder(engine: &'e E) -> ModuleRegistryBuilder<'e, E> {
        ModuleRegistryBuilder {
            builtins: BuiltinRegistry::empty(),
            natives: NativeModuleTable::new(engine),
        }
    }

    /// Builtin script modules
    pub fn builtins(&self) -> &BuiltinRegistry {
        &self.builtins
    }

    /// Native modules
    pub fn natives(&self) -> &NativeModuleTable<'e, E> {
        &self.natives
    }

    /// Descriptor for `id`; builtins shadow natives of the same name
    pub fn descriptor(&self, id: &str) -> Option<ModuleDescriptor> {
        if let Some(descriptor) = self.builtins.get(id) {
            return Some(descriptor.clone());
        }
        self.natives.contains(id).then(|| ModuleDescriptor {
            id: id.to_string(),
            origin: DescriptorOrigin::NativeHandler,
        })
    }

    /// Every registered descriptor, builtins first
    pub fn descriptors(&self) -> Vec<ModuleDescriptor> {
        let mut all: Vec<_> = self.builtins.descriptors.values().cloned().collect();
        all.extend(
            self.natives
                .descriptors()
                .filter(|d| !self.builtins.contains(&d.id)),
        );
        all
    }
}

/// Builder for [`ModuleRegistry`]
pub struct ModuleRegistryBuilder<'e, E: Engine> {
    builtins: BuiltinRegistry,
    natives: NativeModuleTable<'e, E>,
}

impl<'e, E: Engine> ModuleRegistryBuilder<'e, E> {
    /// Use `builtins` as the builtin table
    pub fn builtins(mut self, builtins: BuiltinRegistry) -> Self {
        self.builtins = builtins;
        self
    }

    /// Register a native module
    pub fn native<F>(mut self, name: impl Into<String>, init: F) -> Self
    where
        F: Fn(&E) -> EngineResult<E::Value> + 'static,
    {
        self.natives.register(name, init);
        self
    }

    /// Install the dynamic native loader
    pub fn loader(mut self, loader: impl NativeLoader<E> + 'static) -> Self {
        self.natives.set_loader(loader);
        self
    }

    /// Freeze the tables
    pub fn build(self) -> ModuleRegistry<'e, E> {
        ModuleRegistry {
            builtins: self.builtins,
            natives: self.natives,
        }
    }
}
