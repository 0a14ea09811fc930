//! Declarative macros for Spacey embedders.
//!
//! # Macros Overview
//!
//! ## Module tables
//! - [`builtin_modules!`] - Declare the builtin script module table
//!
//! ## Testing
//! - [`assert_matches!`] - Assert that a value matches a pattern
//! - [`assert_ok!`] - Unwrap an `Ok` or panic with the error
//! - [`assert_err!`] - Unwrap an `Err` or panic with the value
//! - [`assert_contains!`] - Assert that a string contains a substring
//!
//! # Examples
//!
//! ```ignore
//! use spacey_embed::{BuiltinModule, builtin_modules};
//!
//! static BUILTINS: &[BuiltinModule] = builtin_modules! {
//!     "events" => { source: include_bytes!("js/events.js"), snapshot: 0 },
//!     "timers" => { source: include_bytes!("js/timers.js"), snapshot: 1 },
//! };
//! ```
//!
//! ```
//! use spacey_macros::assert_ok;
//!
//! let value: Result<i32, String> = Ok(7);
//! assert_eq!(assert_ok!(value), 7);
//! ```

#![warn(missing_docs)]

mod registry;
mod testing;
