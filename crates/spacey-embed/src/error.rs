// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error types for the module bridge

use crate::engine::Engine;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Errors surfaced by module resolution, compilation and execution.
///
/// None of these terminate the host. They travel up the call chain as
/// values and the host decides how to report them.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The id matched neither the builtin registry nor the native table
    #[error("Unknown native module")]
    ModuleNotFound(String),

    /// The engine rejected the module source
    #[error("{module}: {message}")]
    Compile {
        /// Module the source was compiled for
        module: String,
        /// Engine diagnostic
        message: String,
    },

    /// The module factory threw while executing
    #[error("{module}: {message}")]
    Execution {
        /// Module whose factory threw
        module: String,
        /// Engine diagnostic
        message: String,
    },

    /// Snapshot blob or function index failed validation
    #[error("Corrupt snapshot: {0}")]
    CorruptSnapshot(String),

    /// A debugger session is already waiting for client source
    #[error("Debugger is already waiting for client source")]
    AlreadyWaiting,

    /// The debugger client went away before sending source
    #[error("Debugger connection closed")]
    ConnectionClosed,

    /// Source was requested from a debugger but none is attached
    #[error("No debugger is attached")]
    DebuggerUnavailable,

    /// A native module failed to construct its exports
    #[error("Failed to load native module '{module}': {reason}")]
    NativeLoad {
        /// Native module name or library location
        module: String,
        /// Why construction failed
        reason: String,
    },

    /// A source or snapshot path that is not a regular file
    #[error("ReadSource error, not a regular file")]
    NotRegularFile(PathBuf),

    /// The module object handed in by the caller is malformed
    #[error("Invalid module object: {0}")]
    InvalidModule(String),

    /// File system error
    #[error("File system error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration parsing error
    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl BridgeError {
    /// Create a compile error attributed to `module`
    pub fn compile(module: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Compile {
            module: module.into(),
            message: message.into(),
        }
    }

    /// Create a native load error
    pub fn native_load(module: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::NativeLoad {
            module: module.into(),
            reason: reason.into(),
        }
    }

    /// Build an engine error value carrying this error's message, for hosts
    /// that report failures back into script land.
    ///
    /// The returned reference belongs to the caller.
    pub fn to_engine_value<E: Engine>(&self, engine: &E) -> E::Value {
        engine.create_error(&self.to_string())
    }
}
