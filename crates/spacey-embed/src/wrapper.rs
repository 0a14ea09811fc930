// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module factory compilation
//!
//! Module source is never evaluated as a script. It is compiled as the body
//! of a factory function whose parameters shadow the names a module expects
//! to see, so `exports`, `require` and friends always bind positionally no
//! matter what the host's global object contains.

use crate::engine::Engine;
use crate::error::{BridgeError, Result};
use crate::lifecycle::Owned;
use std::fmt;

/// Factory parameters, in call order.
pub const FACTORY_PARAMS: [&str; 6] = [
    "exports",
    "require",
    "module",
    "native",
    "__filename",
    "__dirname",
];

/// Parameter list handed to the engine's compile primitive.
pub const FACTORY_SIGNATURE: &str = "exports, require, module, native, __filename, __dirname";

/// A compiled module factory.
///
/// Dropping it releases the engine function; see
/// [`ExecutionInvoker`](crate::invoker::ExecutionInvoker) for the call side.
pub struct CompiledFunction<'e, E: Engine> {
    name: String,
    function: Owned<'e, E>,
}

impl<'e, E: Engine> CompiledFunction<'e, E> {
    pub(crate) fn new(name: impl Into<String>, function: Owned<'e, E>) -> Self {
        Self {
            name: name.into(),
            function,
        }
    }

    /// Name the function was compiled under
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The engine function
    pub fn function(&self) -> &E::Value {
        &self.function
    }
}

impl<E: Engine> fmt::Debug for CompiledFunction<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledFunction")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Compiles module source into factory functions
pub struct ModuleWrapper<'e, E: Engine> {
    engine: &'e E,
}

impl<'e, E: Engine> ModuleWrapper<'e, E> {
    /// Create a wrapper compiling through `engine`
    pub fn new(engine: &'e E) -> Self {
        Self { engine }
    }

    /// Compile `source` as the factory for `module_name`.
    ///
    /// Syntax errors come back as [`BridgeError::Compile`] attributed to
    /// `module_name`.
    pub fn wrap(&self, module_name: &str, source: &[u8]) -> Result<CompiledFunction<'e, E>> {
        tracing::trace!(module = module_name, len = source.len(), "compiling module factory");

        let parsed = self
            .engine
            .parse_function(module_name, FACTORY_SIGNATURE, source);

        match Owned::adopt(self.engine, parsed) {
            Ok(function) => Ok(CompiledFunction::new(module_name, function)),
            Err(error) => {
                let message = self.engine.error_message(&error);
                tracing::debug!(module = module_name, %message, "module failed to compile");
                Err(BridgeError::compile(module_name, message))
            }
        }
    }
}
