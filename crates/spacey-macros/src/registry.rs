// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Module table macros.

/// Declare a builtin script module table.
///
/// Expands to a `&'static [spacey_embed::BuiltinModule]`, so it can be used
/// directly as a `static` initializer. Every row names the module id, its
/// source bytes and the index of its factory in the snapshot blob built
/// from those sources.
///
/// # Example
///
/// ```ignore
/// use spacey_embed::{BuiltinModule, BuiltinRegistry, builtin_modules};
///
/// static BUILTINS: &[BuiltinModule] = builtin_modules! {
///     "events" => { source: b"module.exports = {};", snapshot: 0 },
///     "timers" => { source: include_bytes!("js/timers.js"), snapshot: 1 },
/// };
///
/// let registry = BuiltinRegistry::new(BUILTINS, include_bytes!("js.snapshot"));
/// assert!(registry.contains("timers"));
/// ```
#[macro_export]
macro_rules! builtin_modules {
    () => {
        &[]
    };
    ($($name:literal => { source: $source:expr, snapshot: $index:expr $(,)? }),+ $(,)?) => {
        &[$(::spacey_embed::BuiltinModule::new($name, $source, $index)),+]
    };
}
