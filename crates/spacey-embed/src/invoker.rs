// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module factory invocation

use crate::engine::Engine;
use crate::error::{BridgeError, Result};
use crate::lifecycle::Owned;
use crate::wrapper::CompiledFunction;

/// Completion value of a module factory, or why there is none
pub type ExecutionResult<'e, E> = Result<Owned<'e, E>>;

/// Runtime arguments of a module factory.
///
/// `__filename` and `__dirname` are not among them: the factory declares
/// them, but they are never passed at call time.
pub struct FactoryArgs<'a, V> {
    /// The module's exports object
    pub exports: &'a V,
    /// The `require` function
    pub require: &'a V,
    /// The module object
    pub module: &'a V,
    /// Native counterpart of the module, or `undefined`
    pub native: &'a V,
}

/// Calls compiled module factories
pub struct ExecutionInvoker<'e, E: Engine> {
    engine: &'e E,
}

impl<'e, E: Engine> ExecutionInvoker<'e, E> {
    /// Create an invoker calling through `engine`
    pub fn new(engine: &'e E) -> Self {
        Self { engine }
    }

    /// Call the factory produced by an earlier resolve/compile step.
    ///
    /// An error from that step is returned untouched without calling
    /// anything. Otherwise the factory is released once the call returns,
    /// whether it completed or threw.
    pub fn invoke(
        &self,
        compiled: Result<CompiledFunction<'e, E>>,
        args: FactoryArgs<'_, E::Value>,
    ) -> ExecutionResult<'e, E> {
        let factory = compiled?;
        let this = Owned::undefined(self.engine);

        tracing::trace!(module = factory.name(), "invoking module factory");
        let completion = self.engine.call_function(
            factory.function(),
            &this,
            &[args.exports, args.require, args.module, args.native],
        );

        let module = factory.name().to_string();
        drop(factory);

        Owned::adopt(self.engine, completion).map_err(|error| {
            let message = self.engine.error_message(&error);
            tracing::debug!(module = %module, %message, "module factory threw");
            BridgeError::Execution { module, message }
        })
    }
}
