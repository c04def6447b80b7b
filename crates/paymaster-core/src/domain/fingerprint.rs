//! Content fingerprint of task arguments.
//!
//! The fingerprint is half of a memoization key, so it has to be stable
//! across processes and releases: structurally equal arguments fingerprint
//! equal, and any differing leaf changes the digest.
//!
//! Canonical form:
//! - nested structures flatten to single-level `path=value` lines, with
//!   dotted paths in lexicographic order (object key order never matters);
//! - every scalar carries a type tag, and 64-bit integers are emitted
//!   digit-for-digit so they keep full precision across the text boundary;
//! - the encoding is versioned so it can evolve without silently colliding
//!   with keys written by an older build.
//!
//! The canonical text is digested with SHA-256.

use std::collections::BTreeMap;
use std::fmt;
use std::fmt::Write as _;

use serde_json::Value;
use sha2::{Digest, Sha256};

const ENCODING_VERSION: &str = "fp.v1";

/// Hex SHA-256 digest of a task's canonicalized arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of(args: &Value) -> Self {
        let mut leaves = BTreeMap::new();
        flatten("", args, &mut leaves);

        let mut hasher = Sha256::new();
        hasher.update(ENCODING_VERSION.as_bytes());
        for (path, leaf) in &leaves {
            hasher.update(b"\n");
            hasher.update(path.as_bytes());
            hasher.update(b"=");
            hasher.update(leaf.as_bytes());
        }

        let digest = hasher.finalize();
        let mut hex = String::with_capacity(digest.len() * 2);
        for byte in digest {
            let _ = write!(hex, "{byte:02x}");
        }
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

fn flatten(path: &str, value: &Value, out: &mut BTreeMap<String, String>) {
    match value {
        Value::Object(map) if map.is_empty() => {
            out.insert(path.to_string(), "e:{}".to_string());
        }
        Value::Object(map) => {
            for (key, child) in map {
                flatten(&join(path, &escape_segment(key)), child, out);
            }
        }
        Value::Array(items) if items.is_empty() => {
            out.insert(path.to_string(), "e:[]".to_string());
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                flatten(&join(path, &index.to_string()), child, out);
            }
        }
        Value::Null => {
            out.insert(path.to_string(), "_".to_string());
        }
        Value::Bool(b) => {
            out.insert(path.to_string(), format!("b:{b}"));
        }
        Value::Number(n) => {
            // Tag by representation: u64 and i64 stay exact, everything else
            // goes through the float formatter.
            let leaf = if let Some(u) = n.as_u64() {
                format!("u:{u}")
            } else if let Some(i) = n.as_i64() {
                format!("i:{i}")
            } else {
                format!("f:{n}")
            };
            out.insert(path.to_string(), leaf);
        }
        Value::String(s) => {
            out.insert(path.to_string(), format!("s:{}", s.escape_default()));
        }
    }
}

fn join(path: &str, segment: &str) -> String {
    if path.is_empty() {
        segment.to_string()
    } else {
        format!("{path}.{segment}")
    }
}

/// Dots inside object keys would be ambiguous with path separators.
fn escape_segment(key: &str) -> String {
    key.replace('\\', "\\\\").replace('.', "\\.")
}
