// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The embedded engine boundary.
//!
//! The bridge never parses or executes script itself. Everything it needs
//! from the embedded engine goes through [`Engine`], which mirrors the
//! handle-based C APIs small engines expose: every value handed out is an
//! owned reference that the holder must give back through
//! [`Engine::release_value`] exactly once.
//!
//! Engine calls take `&self`. Embedded engines keep their heap in a single
//! context and the host drives it from one thread, so implementations use
//! interior mutability rather than requiring exclusive borrows for every call.

/// Outcome of an engine call.
///
/// Both sides carry an owned engine value: `Err` holds the engine's error
/// object (a thrown value, a syntax error, a failed validation) and must be
/// released just like a success value.
pub type EngineResult<V> = std::result::Result<V, V>;

/// Outcome of an engine call that produces nothing on success.
///
/// The error side is an owned engine value, as with [`EngineResult`].
pub type EngineStatus<V> = std::result::Result<(), V>;

/// Primitives the bridge needs from the embedded engine.
pub trait Engine {
    /// Handle to an engine-managed value.
    ///
    /// Handles are deliberately not `Clone`: a second reference is obtained
    /// with [`Engine::acquire_value`] and carries its own release obligation.
    type Value;

    /// Compile `source` as the body of a function taking the comma separated
    /// parameter list `params`. `resource_name` names the code in engine
    /// diagnostics and debugger views.
    fn parse_function(
        &self,
        resource_name: &str,
        params: &str,
        source: &[u8],
    ) -> EngineResult<Self::Value>;

    /// Materialize function `index` of a precompiled snapshot without
    /// executing it.
    fn exec_snapshot_at(&self, blob: &[u8], index: u32) -> EngineResult<Self::Value>;

    /// Execute a whole snapshot and return its completion value.
    fn exec_snapshot(&self, blob: &[u8]) -> EngineResult<Self::Value>;

    /// Call `function` with the given receiver and arguments.
    fn call_function(
        &self,
        function: &Self::Value,
        this: &Self::Value,
        args: &[&Self::Value],
    ) -> EngineResult<Self::Value>;

    /// Create `undefined`.
    fn create_undefined(&self) -> Self::Value;

    /// Create an empty plain object.
    fn create_object(&self) -> Self::Value;

    /// Create a boolean.
    fn create_boolean(&self, value: bool) -> Self::Value;

    /// Create an error object carrying `message`.
    fn create_error(&self, message: &str) -> Self::Value;

    /// Read `object[name]`. Missing properties yield `undefined`.
    fn get_property(&self, object: &Self::Value, name: &str) -> EngineResult<Self::Value>;

    /// Write `object[name] = value`. The engine takes its own reference to
    /// `value`; the caller keeps (and still releases) the handle it passed.
    fn set_property(
        &self,
        object: &Self::Value,
        name: &str,
        value: &Self::Value,
    ) -> EngineStatus<Self::Value>;

    /// Contents of a string value, `None` for any other kind of value.
    fn string_value(&self, value: &Self::Value) -> Option<String>;

    /// Human readable message of an error value.
    fn error_message(&self, error: &Self::Value) -> String;

    /// Take an additional reference to `value`.
    fn acquire_value(&self, value: &Self::Value) -> Self::Value;

    /// Give back one reference.
    fn release_value(&self, value: Self::Value);
}
