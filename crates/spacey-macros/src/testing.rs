// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Testing helper macros.
//!
//! Bridge operations return `Result`s whose error side is usually what a
//! test wants to look at, so these macros hand back the interesting half
//! instead of just asserting on it.

/// Assert that an expression matches a pattern.
///
/// # Example
///
/// ```
/// use spacey_macros::assert_matches;
///
/// #[derive(Debug)]
/// enum Lookup { Found(u32), Missing }
///
/// assert_matches!(Lookup::Found(3), Lookup::Found(n) if n > 0);
/// assert_matches!(Lookup::Missing, Lookup::Missing);
/// ```
#[macro_export]
macro_rules! assert_matches {
    ($expr:expr, $pat:pat) => {
        match $expr {
            $pat => {}
            ref other => panic!(
                "`{}` does not match `{}`\n  value: {:?}",
                stringify!($expr),
                stringify!($pat),
                other
            ),
        }
    };
    ($expr:expr, $pat:pat if $guard:expr) => {
        match $expr {
            $pat if $guard => {}
            ref other => panic!(
                "`{}` does not match `{} if {}`\n  value: {:?}",
                stringify!($expr),
                stringify!($pat),
                stringify!($guard),
                other
            ),
        }
    };
}

/// Unwrap an `Ok`, panicking with the error otherwise.
///
/// # Example
///
/// ```
/// use spacey_macros::assert_ok;
///
/// let parsed: Result<u16, std::num::ParseIntError> = "5001".parse();
/// assert_eq!(assert_ok!(parsed), 5001);
/// ```
#[macro_export]
macro_rules! assert_ok {
    ($expr:expr) => {
        match $expr {
            Ok(value) => value,
            Err(error) => panic!(
                "expected Ok from `{}`, got Err\n  error: {:?}",
                stringify!($expr),
                error
            ),
        }
    };
}

/// Unwrap an `Err`, panicking with the value otherwise.
///
/// # Example
///
/// ```
/// use spacey_macros::assert_err;
///
/// let parsed: Result<u16, std::num::ParseIntError> = "not-a-port".parse();
/// let error = assert_err!(parsed);
/// assert!(!error.to_string().is_empty());
/// ```
#[macro_export]
macro_rules! assert_err {
    ($expr:expr) => {
        match $expr {
            Ok(value) => panic!(
                "expected Err from `{}`, got Ok\n  value: {:?}",
                stringify!($expr),
                value
            ),
            Err(error) => error,
        }
    };
}

/// Assert that a string contains a substring.
///
/// # Example
///
/// ```
/// use spacey_macros::assert_contains;
///
/// assert_contains!("SyntaxError: unexpected token", "SyntaxError");
/// ```
#[macro_export]
macro_rules! assert_contains {
    ($haystack:expr, $needle:expr) => {{
        let haystack = &$haystack;
        if !haystack.contains($needle) {
            panic!(
                "`{}` does not contain `{}`\n  string: {:?}",
                stringify!($haystack),
                $needle,
                haystack
            );
        }
    }};
}
