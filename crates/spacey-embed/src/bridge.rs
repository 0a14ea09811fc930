// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Host-facing entry points
//!
//! [`ModuleBridge`] is what a host's bootstrap code binds into script land:
//! one call per operation, each running a single resolve-compile-invoke
//! cycle to completion (or failure) before returning.

use crate::config::BridgeConfig;
use crate::debugger::{DebuggerSourceGate, DebuggerWire};
use crate::engine::Engine;
use crate::error::{BridgeError, Result};
use crate::invoker::{ExecutionInvoker, ExecutionResult, FactoryArgs};
use crate::lifecycle::Owned;
use crate::registry::ModuleRegistry;
use crate::resolver::{ModuleResolver, Origin};
use crate::snapshot::SnapshotLoader;
use crate::source::{SourceFs, StdFs};
use crate::wrapper::{CompiledFunction, ModuleWrapper};
use std::io;
use std::path::Path;
use std::time::Instant;

enum BuiltinCode {
    Snapshot(u32),
    Source(&'static [u8]),
}

/// Module loading and compilation bridge
pub struct ModuleBridge<'e, E: Engine> {
    engine: &'e E,
    registry: ModuleRegistry<'e, E>,
    config: BridgeConfig,
    debugger: Option<DebuggerSourceGate>,
    fs: Box<dyn SourceFs>,
}

impl<'e, E: Engine> ModuleBridge<'e, E> {
    /// Create a bridge over `engine` and a frozen registry
    pub fn new(engine: &'e E, registry: ModuleRegistry<'e, E>, config: BridgeConfig) -> Self {
        Self {
            engine,
            registry,
            config,
            debugger: None,
            fs: Box::new(StdFs),
        }
    }

    /// Attach the debugger wire layer
    pub fn with_debugger(mut self, wire: impl DebuggerWire + 'static) -> Self {
        self.debugger = Some(DebuggerSourceGate::new(wire));
        self
    }

    /// Replace the file system accessor
    pub fn with_filesystem(mut self, fs: impl SourceFs + 'static) -> Self {
        self.fs = Box::new(fs);
        self
    }

    /// The engine
    pub fn engine(&self) -> &'e E {
        self.engine
    }

    /// The module registry
    pub fn registry(&self) -> &ModuleRegistry<'e, E> {
        &self.registry
    }

    /// The configuration
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// The debugger gate, if a wire layer was attached
    pub fn debugger(&self) -> Option<&DebuggerSourceGate> {
        self.debugger.as_ref()
    }

    /// A resolver over this bridge's registry
    pub fn resolver(&self) -> ModuleResolver<'_, 'e, E> {
        ModuleResolver::new(&self.registry)
    }

    /// Load module `module.id` into `module.exports`.
    ///
    /// Builtin script modules run their factory with
    /// `(module.exports, require, module, native)`, `native` being the native
    /// module of the same id or `undefined`. Native-only modules have their
    /// exports assigned to `module.exports` and nothing is executed; the
    /// result is then `undefined`.
    pub fn compile_module(&self, module: &E::Value, require: &E::Value) -> ExecutionResult<'e, E> {
        let started = Instant::now();
        let id = self.module_id(module)?;

        let code = match self.resolver().resolve(&id)? {
            Origin::Native(exports) => {
                self.engine
                    .set_property(module, "exports", &exports)
                    .map_err(|error| self.invalid_module("exports", error))?;
                return Ok(Owned::undefined(self.engine));
            }
            Origin::Snapshot(index) => BuiltinCode::Snapshot(index),
            Origin::BuiltinSource(source) => BuiltinCode::Source(source),
        };

        let native = match self.registry.natives().get(&id)? {
            Some(native) => native,
            None => Owned::undefined(self.engine),
        };
        let exports = self.property(module, "exports")?;

        let compiled = match code {
            BuiltinCode::Snapshot(index) => {
                SnapshotLoader::new(self.engine).load(&id, self.registry.builtins().snapshot_blob(), index)
            }
            BuiltinCode::Source(source) => ModuleWrapper::new(self.engine).wrap(&id, source),
        };

        let result = ExecutionInvoker::new(self.engine).invoke(
            compiled,
            FactoryArgs {
                exports: &exports,
                require,
                module,
                native: &native,
            },
        );

        if self.config.loadstat {
            tracing::info!(
                module = %id,
                elapsed_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX),
                ok = result.is_ok(),
                "module loaded"
            );
        }
        result
    }

    /// Compile user supplied source into a module factory.
    ///
    /// With a debugger configured the debuggee is stopped first, so the
    /// client sees the new source before any of it runs.
    pub fn compile(&self, filename: &str, source: impl AsRef<[u8]>) -> Result<CompiledFunction<'e, E>> {
        if self.config.debugger.is_some() {
            if let Some(gate) = &self.debugger {
                gate.stop_debuggee();
            }
        }
        ModuleWrapper::new(self.engine).wrap(filename, source.as_ref())
    }

    /// Read a module source file
    pub fn read_source(&self, path: &Path) -> Result<String> {
        if !self.fs.is_regular_file(path) {
            return Err(BridgeError::NotRegularFile(path.to_path_buf()));
        }

        let bytes = self.fs.read_fully(path)?;
        String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e).into())
    }

    /// Execute the snapshot file at `path`
    pub fn compile_snapshot(&self, path: &Path) -> Result<Owned<'e, E>> {
        SnapshotLoader::new(self.engine).exec_file(self.fs.as_ref(), path)
    }

    /// Wait for a debugger client to send source, then compile it under the
    /// resource name the client gave.
    pub fn debugger_source_compile(&self) -> Result<CompiledFunction<'e, E>> {
        let gate = self.debugger.as_ref().ok_or(BridgeError::DebuggerUnavailable)?;
        let source = gate.wait_for_source()?;
        ModuleWrapper::new(self.engine).wrap(&source.resource_name, &source.source)
    }

    /// Whether the host was configured to take its program from the debugger
    pub fn debugger_wait_source(&self) -> bool {
        self.config.debugger_wait_source()
    }

    /// Load a native module library through the host's loader
    pub fn dlopen(&self, location: &Path) -> Result<Owned<'e, E>> {
        self.registry.natives().dlopen(location)
    }

    /// Every loadable module id, sorted and deduplicated
    pub fn builtin_modules(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .registry
            .builtins()
            .names()
            .map(|name| -> &str { name })
            .chain(self.registry.natives().names())
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    /// Set `target[id] = true` for every loadable module id
    pub fn populate_builtin_modules(&self, target: &E::Value) -> Result<()> {
        self.mark_all(target, self.builtin_modules())
    }

    /// Set `target[id] = true` for every builtin script module id
    pub fn populate_native_sources(&self, target: &E::Value) -> Result<()> {
        self.mark_all(target, self.registry.builtins().names())
    }

    fn mark_all<'n>(&self, target: &E::Value, names: impl IntoIterator<Item = &'n str>) -> Result<()> {
        let flag = Owned::new(self.engine, self.engine.create_boolean(true));
        for name in names {
            self.engine
                .set_property(target, name, &flag)
                .map_err(|error| self.invalid_module(name, error))?;
        }
        Ok(())
    }

    fn module_id(&self, module: &E::Value) -> Result<String> {
        let id = self.property(module, "id")?;
        self.engine
            .string_value(&id)
            .ok_or_else(|| BridgeError::InvalidModule("module.id must be a string".to_string()))
    }

    fn property(&self, object: &E::Value, name: &str) -> Result<Owned<'e, E>> {
        Owned::adopt(self.engine, self.engine.get_property(object, name))
            .map_err(|error| self.invalid_module(name, error.into_raw()))
    }

    fn invalid_module(&self, property: &str, error: E::Value) -> BridgeError {
        let error = Owned::new(self.engine, error);
        BridgeError::InvalidModule(format!(
            "cannot access '{property}': {}",
            self.engine.error_message(&error)
        ))
    }
}
