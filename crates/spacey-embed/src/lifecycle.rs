// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Ownership of values crossing the host/engine boundary.
//!
//! The engine's collector only reclaims what it owns; a reference held by
//! the host stays alive until the host gives it back. [`Owned`] ties each such
//! reference to a Rust scope so the release happens exactly once on every
//! exit path, including `?` returns and unwinding.
//!
//! Transient host buffers (module ids, paths, source text) need no extra
//! machinery: they are plain `String`/`Vec<u8>` values owned by the function
//! that builds them and dropped after the last engine call borrowing them.

use crate::engine::{Engine, EngineResult};
use std::fmt;
use std::mem::ManuallyDrop;
use std::ops::Deref;

/// An engine value whose reference is released when dropped.
pub struct Owned<'e, E: Engine> {
    engine: &'e E,
    value: ManuallyDrop<E::Value>,
}

impl<'e, E: Engine> Owned<'e, E> {
    /// Take ownership of a reference returned by `engine`.
    pub fn new(engine: &'e E, value: E::Value) -> Self {
        Self {
            engine,
            value: ManuallyDrop::new(value),
        }
    }

    /// Wrap both sides of an engine call.
    pub fn adopt(engine: &'e E, result: EngineResult<E::Value>) -> Result<Self, Self> {
        match result {
            Ok(value) => Ok(Self::new(engine, value)),
            Err(error) => Err(Self::new(engine, error)),
        }
    }

    /// Scoped `undefined`.
    pub fn undefined(engine: &'e E) -> Self {
        Self::new(engine, engine.create_undefined())
    }

    /// Take a second, independently released reference.
    pub fn duplicate(&self) -> Self {
        Self::new(self.engine, self.engine.acquire_value(&self.value))
    }

    /// Hand the reference to the caller, who becomes responsible for
    /// releasing it.
    pub fn into_raw(self) -> E::Value {
        let mut this = ManuallyDrop::new(self);
        // SAFETY: `this` is never dropped, so the value is moved out exactly
        // once and `Drop::drop` cannot observe it afterwards.
        unsafe { ManuallyDrop::take(&mut this.value) }
    }
}

impl<E: Engine> Deref for Owned<'_, E> {
    type Target = E::Value;

    fn deref(&self) -> &E::Value {
        &self.value
    }
}

impl<E: Engine> Drop for Owned<'_, E> {
    fn drop(&mut self) {
        // SAFETY: `value` is only taken here or in `into_raw`, which
        // suppresses this destructor.
        let value = unsafe { ManuallyDrop::take(&mut self.value) };
        self.engine.release_value(value);
    }
}

impl<E: Engine> fmt::Debug for Owned<'_, E>
where
    E::Value: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Owned").field(&*self.value).finish()
    }
}
