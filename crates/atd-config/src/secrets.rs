//! Config files name environment variables; they never hold credentials.
//! A string leaf that looks like a live credential aborts the load.

use anyhow::{bail, Result};
use serde_json::Value;

/// Prefixes of well-known credential formats.
const CREDENTIAL_PREFIXES: &[&str] = &[
    "sk-",
    "sk_live",
    "sk_test",
    "AKIA",
    "ghp_",
    "xoxb-",
    "-----BEGIN",
];

/// Fails with `CONFIG_SECRET_DETECTED` naming the JSON pointer of the first
/// offending leaf. The value itself is never echoed.
pub(crate) fn reject_secret_literals(root: &Value) -> Result<()> {
    if let Some(at) = find_secret(root, String::new()) {
        bail!("CONFIG_SECRET_DETECTED at={at} value=REDACTED");
    }
    Ok(())
}

fn find_secret(v: &Value, path: String) -> Option<String> {
    match v {
        Value::String(s) if is_credential(s) => Some(path),
        Value::Object(map) => map.iter().find_map(|(k, child)| {
            find_secret(child, format!("{path}/{}", k.replace('~', "~0").replace('/', "~1")))
        }),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .find_map(|(i, child)| find_secret(child, format!("{path}/{i}"))),
        _ => None,
    }
}

fn is_credential(s: &str) -> bool {
    let s = s.trim();
    // Bare prefixes ("sk-") show up in docs and examples.
    s.len() >= 8 && CREDENTIAL_PREFIXES.iter().any(|p| s.starts_with(p))
}
