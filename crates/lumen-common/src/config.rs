//! Startup configuration.
//!
//! The compiler recognizes a small set of environment variables. They are
//! read once at startup; the resulting `Config` is threaded through the
//! pipeline rather than consulted globally.

use serde::Serialize;

/// Options recognized from the environment.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Config {
    /// `DEBUG`: verbosity level 0-10. 0 is silent; higher levels enable
    /// increasingly chatty trace output.
    pub debug_level: u8,
    /// `NO_STD_LIB`: skip prelude inclusion.
    pub no_std_lib: bool,
    /// `NO_STD_MAIN`: omit the default entry-point wrapper.
    pub no_std_main: bool,
    /// `NO_BUILTINS`: suppress registration of builtin schemes.
    pub no_builtins: bool,
    /// `SHOW_ENV`: dump the typing environment after inference.
    pub show_env: bool,
    /// `SHOW_TYPES`: print the inferred type of each declaration.
    pub show_types: bool,
}

impl Config {
    /// Read configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary lookup function.
    ///
    /// Boolean flags are set when the variable is present and non-empty
    /// and not `"0"`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let flag = |key: &str| {
            lookup(key).is_some_and(|v| !v.is_empty() && v != "0")
        };
        let debug_level = lookup("DEBUG")
            .and_then(|v| v.trim().parse::<u8>().ok())
            .map(|n| n.min(10))
            .unwrap_or(0);
        Config {
            debug_level,
            no_std_lib: flag("NO_STD_LIB"),
            no_std_main: flag("NO_STD_MAIN"),
            no_builtins: flag("NO_BUILTINS"),
            show_env: flag("SHOW_ENV"),
            show_types: flag("SHOW_TYPES"),
        }
    }
}
