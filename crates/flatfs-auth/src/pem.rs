//! Minimal PEM block decoding.
//!
//! Only what key validation needs: locate the first block, read its RFC 1421
//! headers (`Proc-Type`, `DEK-Info`, ...), and base64-decode the body.

use std::collections::BTreeMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;

const BEGIN_MARKER: &str = "-----BEGIN ";
const END_MARKER: &str = "-----END ";
const MARKER_TAIL: &str = "-----";

/// A decoded PEM block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PemBlock {
    /// The label between `BEGIN` and the dashes, e.g. `RSA PRIVATE KEY`.
    pub label: String,
    /// Encapsulated headers, in key order.
    pub headers: BTreeMap<String, String>,
    /// Decoded body bytes.
    pub contents: Vec<u8>,
}

impl PemBlock {
    /// Whether the block carries the `Proc-Type: 4,ENCRYPTED` header.
    #[must_use]
    pub fn is_encrypted(&self) -> bool {
        self.headers
            .get("Proc-Type")
            .is_some_and(|v| v.trim() == "4,ENCRYPTED")
    }
}

/// Decode the first PEM block found in `input`.
///
/// Returns `None` when no complete, well-formed block is present.
///
/// # Examples
///
/// ```
/// use flatfs_auth::pem::decode;
///
/// let text = "-----BEGIN TEST-----\naGVsbG8=\n-----END TEST-----\n";
/// let block = decode(text).unwrap();
/// assert_eq!(block.label, "TEST");
/// assert_eq!(block.contents, b"hello");
/// ```
#[must_use]
pub fn decode(input: &str) -> Option<PemBlock> {
    let start = input.find(BEGIN_MARKER)?;
    let rest = &input[start + BEGIN_MARKER.len()..];
    let (label_line, rest) = rest.split_once('\n')?;
    let label = label_line.trim_end().strip_suffix(MARKER_TAIL)?.to_owned();

    let end_line = format!("{END_MARKER}{label}{MARKER_TAIL}");
    let end = rest.find(&end_line)?;
    let inner = &rest[..end];

    let mut headers = BTreeMap::new();
    let mut body = String::new();
    let mut in_headers = true;
    for line in inner.lines() {
        let line = line.trim_end();
        if in_headers {
            if line.is_empty() {
                in_headers = false;
                continue;
            }
            if let Some((key, value)) = line.split_once(':') {
                headers.insert(key.trim().to_owned(), value.trim().to_owned());
                continue;
            }
            in_headers = false;
        }
        body.push_str(line.trim());
    }

    let contents = BASE64_STANDARD.decode(body.as_bytes()).ok()?;
    Some(PemBlock {
        label,
        headers,
        contents,
    })
}
