//! Signature computation.
//!
//! The canonical form is a NUL-terminated item list:
//!
//! ```text
//! jitforge-v<TEMPLATE_VERSION> \0 <kind> \0 <n> \0 <snippet_0> \0 ... <m> \0 <name_0> \0 ...
//! ```
//!
//! Snippets keep their given order (it decides the output-buffer layout);
//! property names come sorted. Property values are left out, since defaults
//! are applied after load rather than compiled in.

use jitforge_core::{Fragment, Signature, TEMPLATE_VERSION};
use sha2::{Digest, Sha256};

/// Computes the signature of `fragment`.
pub fn compute(fragment: &Fragment) -> Signature {
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&Sha256::digest(canonical_bytes(fragment)));
    Signature::from_digest(digest)
}

/// Canonical serialization the signature is hashed from.
pub fn canonical_bytes(fragment: &Fragment) -> Vec<u8> {
    let mut out = Vec::with_capacity(128);
    let mut push = |item: &str| {
        out.extend_from_slice(item.as_bytes());
        out.push(0);
    };

    push(&format!("jitforge-v{TEMPLATE_VERSION}"));
    push(fragment.kind().tag());

    push(&fragment.snippets().len().to_string());
    for snippet in fragment.snippets() {
        push(snippet);
    }

    push(&fragment.properties().len().to_string());
    for name in fragment.property_names() {
        push(name);
    }

    out
}
