// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module id resolution
//!
//! Precedence, first match wins:
//!
//! 1. builtin script module, as a snapshot index in snapshot builds
//! 2. builtin script module, as source text otherwise
//! 3. native module, whose already-built exports are handed back directly
//! 4. [`BridgeError::ModuleNotFound`]

use crate::engine::Engine;
use crate::error::{BridgeError, Result};
use crate::lifecycle::Owned;
use crate::registry::{DescriptorOrigin, ModuleRegistry};
use std::fmt;

/// Where the code for a resolved module comes from
pub enum Origin<'e, E: Engine> {
    /// Factory at this index of the registry's snapshot blob
    Snapshot(u32),
    /// Builtin source text to compile
    BuiltinSource(&'static [u8]),
    /// Exports of a native module; nothing to compile
    Native(Owned<'e, E>),
}

impl<E: Engine> fmt::Debug for Origin<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Snapshot(index) => f.debug_tuple("Snapshot").field(index).finish(),
            Origin::BuiltinSource(source) => f
                .debug_tuple("BuiltinSource")
                .field(&format_args!("{} bytes", source.len()))
                .finish(),
            Origin::Native(_) => f.write_str("Native"),
        }
    }
}

/// Resolves module ids against a [`ModuleRegistry`]
pub struct ModuleResolver<'r, 'e, E: Engine> {
    registry: &'r ModuleRegistry<'e, E>,
}

impl<'r, 'e, E: Engine> ModuleResolver<'r, 'e, E> {
    /// Create a resolver over `registry`
    pub fn new(registry: &'r ModuleRegistry<'e, E>) -> Self {
        Self { registry }
    }

    /// Resolve `id` to its code origin
    pub fn resolve(&self, id: &str) -> Result<Origin<'e, E>> {
        let builtin = match self.registry.builtins().get(id).map(|d| d.origin) {
            Some(DescriptorOrigin::SnapshotIndex(index)) => Some(Origin::Snapshot(index)),
            Some(DescriptorOrigin::SourceBuffer(source)) => Some(Origin::BuiltinSource(source)),
            Some(DescriptorOrigin::NativeHandler) | None => None,
        };
        if let Some(origin) = builtin {
            tracing::debug!(module = id, ?origin, "resolved builtin module");
            return Ok(origin);
        }

        if let Some(exports) = self.registry.natives().get(id)? {
            tracing::debug!(module = id, "resolved native module");
            return Ok(Origin::Native(exports));
        }

        tracing::debug!(module = id, "module not found");
        Err(BridgeError::ModuleNotFound(id.to_string()))
    }
}
