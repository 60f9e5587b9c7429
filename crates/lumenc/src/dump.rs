//! Debug dumps requested through the environment.
//!
//! `SHOW_ENV` prints the typing environment as JSON after inference;
//! `SHOW_TYPES` prints each declaration's scheme as it is checked (the
//! driver handles the printing; formatting lives here).

use std::collections::BTreeMap;

use lumen_typeck::env::TypeEnv;

/// The typing environment as sorted, pretty-printed JSON.
pub fn env_json(env: &TypeEnv) -> String {
    let map: BTreeMap<String, String> =
        env.iter().map(|(name, scheme)| (name.clone(), scheme.normalize().to_string())).collect();
    serde_json::to_string_pretty(&map).unwrap_or_else(|_| "{}".to_string())
}

/// One line per declaration: `name :: scheme`.
pub fn schemes_text(schemes: &[(String, String)]) -> String {
    let mut out = String::new();
    for (name, scheme) in schemes {
        out.push_str(name);
        out.push_str(" :: ");
        out.push_str(scheme);
        out.push('\n');
    }
    out
}
