//! Strong entity tags for conditional responses.
//!
//! The tag covers the status line, every accumulated header, a validator
//! discriminator and (when available) the content itself:
//!
//! ```text
//! "<code> <message>"
//! + for each header: "\n" + "name:value"  (list values: "name:item" per item)
//! + '0' (content) | '1' (modification time)
//! + if content is non-empty: "\n\n" + content
//! ```
//!
//! The SHA-1 digest of that text, standard base64 with padding, in quotes.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha1::{Digest, Sha1};

use super::headers::{FieldValue, Headers};

/// What the tag's content stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidatorKind {
    /// The response body itself.
    Content,
    /// A file modification time.
    Modified,
}

impl ValidatorKind {
    fn discriminator(self) -> &'static [u8] {
        match self {
            ValidatorKind::Content => b"0",
            ValidatorKind::Modified => b"1",
        }
    }
}

/// Compute the quoted strong ETag for a response.
pub fn strong_etag(
    code: u16,
    message: &str,
    headers: &Headers,
    kind: ValidatorKind,
    content: Option<&[u8]>,
) -> String {
    let mut hasher = Sha1::new();
    hasher.update(format!("{code} {message}").as_bytes());

    for (name, value) in headers.iter() {
        hasher.update(b"\n");
        match value {
            FieldValue::One(v) => hash_field(&mut hasher, name, v),
            FieldValue::Many(items) => {
                for item in items {
                    hash_field(&mut hasher, name, item);
                }
            }
        }
    }

    hasher.update(kind.discriminator());

    if let Some(content) = content.filter(|c| !c.is_empty()) {
        hasher.update(b"\n\n");
        hasher.update(content);
    }

    format!("\"{}\"", STANDARD.encode(hasher.finalize()))
}

fn hash_field(hasher: &mut Sha1, name: &str, value: &str) {
    hasher.update(name.as_bytes());
    hasher.update(b":");
    hasher.update(value.as_bytes());
}
