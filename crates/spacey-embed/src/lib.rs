// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # Spacey Embed
//!
//! Module loading and compilation for hosts embedding a small JavaScript
//! engine.
//!
//! A module id is resolved against the builtin script modules compiled into
//! the host and the host's native modules. Script modules are compiled (or
//! loaded from a precompiled snapshot) into a factory function
//! `function (exports, require, module, native, __filename, __dirname)`,
//! which is then called to populate `module.exports`.
//!
//! ## Quick Start
//!
//! ```ignore
//! use spacey_embed::{BridgeConfig, BuiltinRegistry, ModuleBridge, ModuleRegistry, builtin_modules};
//!
//! static BUILTINS: &[spacey_embed::BuiltinModule] = builtin_modules! {
//!     "events" => { source: include_bytes!("js/events.js"), snapshot: 0 },
//!     "timers" => { source: include_bytes!("js/timers.js"), snapshot: 1 },
//! };
//!
//! let registry = ModuleRegistry::builder(&engine)
//!     .builtins(BuiltinRegistry::new(BUILTINS, include_bytes!("js.snapshot")))
//!     .native("timers", |engine| timers::init(engine))
//!     .build();
//! let bridge = ModuleBridge::new(&engine, registry, BridgeConfig::from_env());
//!
//! bridge.compile_module(&module, &require)?;
//! ```
//!
//! The engine itself is supplied by the host through the [`Engine`] trait.

#![warn(missing_docs)]

extern crate self as spacey_embed;

pub mod bridge;
pub mod config;
pub mod debugger;
pub mod engine;
pub mod error;
pub mod invoker;
pub mod lifecycle;
pub mod registry;
pub mod resolver;
pub mod snapshot;
pub mod source;
pub mod wrapper;

pub use bridge::ModuleBridge;
pub use config::{BridgeConfig, DebuggerConfig};
pub use debugger::{
    ChannelWire, DebuggerClient, DebuggerSession, DebuggerSource, DebuggerSourceGate,
    DebuggerWire, SessionState, WireStatus, channel,
};
pub use engine::{Engine, EngineResult, EngineStatus};
pub use error::{BridgeError, Result};
pub use invoker::{ExecutionInvoker, ExecutionResult, FactoryArgs};
pub use lifecycle::Owned;
pub use registry::{
    BuiltinModule, BuiltinRegistry, CompileStrategy, DescriptorOrigin, ModuleDescriptor,
    ModuleRegistry, ModuleRegistryBuilder, NativeLoader, NativeModuleTable,
};
pub use resolver::{ModuleResolver, Origin};
pub use snapshot::SnapshotLoader;
pub use source::{SourceFs, StdFs};
pub use spacey_macros::builtin_modules;
pub use wrapper::{CompiledFunction, FACTORY_PARAMS, FACTORY_SIGNATURE, ModuleWrapper};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
