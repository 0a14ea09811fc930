// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! File system access for user source and snapshot files

use std::io;
use std::path::Path;

/// The two file primitives the bridge needs from the host.
pub trait SourceFs {
    /// Whether `path` names a regular file. A path that cannot be
    /// inspected at all is not one.
    fn is_regular_file(&self, path: &Path) -> bool;

    /// Read the whole file.
    fn read_fully(&self, path: &Path) -> io::Result<Vec<u8>>;
}

/// [`SourceFs`] over the process file system
#[derive(Debug, Default, Clone, Copy)]
pub struct StdFs;

impl SourceFs for StdFs {
    fn is_regular_file(&self, path: &Path) -> bool {
        match std::fs::metadata(path) {
            Ok(meta) => meta.is_file(),
            Err(e) => {
                tracing::trace!(path = %path.display(), error = %e, "stat failed");
                false
            }
        }
    }

    fn read_fully(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }
}
