// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Precompiled bytecode loading

use crate::engine::Engine;
use crate::error::{BridgeError, Result};
use crate::lifecycle::Owned;
use crate::source::SourceFs;
use crate::wrapper::CompiledFunction;
use std::path::Path;

const UNLOADABLE_SNAPSHOT: &str = "Could not load the snapshot source.";

/// Materializes functions from snapshot blobs
pub struct SnapshotLoader<'e, E: Engine> {
    engine: &'e E,
}

impl<'e, E: Engine> SnapshotLoader<'e, E> {
    /// Create a loader executing through `engine`
    pub fn new(engine: &'e E) -> Self {
        Self { engine }
    }

    /// Load function `index` of `blob` as the factory for `module_name`.
    ///
    /// Structural validation is the engine's job; whatever it rejects comes
    /// back as [`BridgeError::CorruptSnapshot`].
    pub fn load(&self, module_name: &str, blob: &[u8], index: u32) -> Result<CompiledFunction<'e, E>> {
        if blob.is_empty() {
            return Err(BridgeError::CorruptSnapshot("empty snapshot blob".to_string()));
        }

        tracing::trace!(module = module_name, index, len = blob.len(), "loading snapshot function");

        let function = Owned::adopt(self.engine, self.engine.exec_snapshot_at(blob, index))
            .map_err(|error| self.corrupt(&error))?;
        Ok(CompiledFunction::new(module_name, function))
    }

    /// Execute the snapshot stored at `path` and return its completion value.
    pub fn exec_file(&self, fs: &dyn SourceFs, path: &Path) -> Result<Owned<'e, E>> {
        if !fs.is_regular_file(path) {
            return Err(BridgeError::NotRegularFile(path.to_path_buf()));
        }

        let bytecode = match fs.read_fully(path) {
            Ok(bytes) if !bytes.is_empty() => bytes,
            Ok(_) => return Err(BridgeError::CorruptSnapshot(UNLOADABLE_SNAPSHOT.to_string())),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "snapshot read failed");
                return Err(BridgeError::CorruptSnapshot(UNLOADABLE_SNAPSHOT.to_string()));
            }
        };

        tracing::debug!(path = %path.display(), len = bytecode.len(), "executing snapshot file");
        Owned::adopt(self.engine, self.engine.exec_snapshot(&bytecode)).map_err(|error| self.corrupt(&error))
    }

    fn corrupt(&self, error: &E::Value) -> BridgeError {
        BridgeError::CorruptSnapshot(self.engine.error_message(error))
    }
}
