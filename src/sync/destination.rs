//! Destination prefix resolution.

use rand::Rng;

/// Requested destination meaning "generate a fresh prefix".
pub const AUTO_DESTINATION: &str = "/";

/// Length of generated prefixes.
pub const GENERATED_ID_LEN: usize = 12;

const ID_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz_-";

/// Resolve the destination root for a run.
///
/// [`AUTO_DESTINATION`] yields a generated id; anything else, including the
/// empty string (bucket root), is returned unchanged.
pub fn resolve_destination(requested: &str) -> String {
    if requested == AUTO_DESTINATION {
        generate_id()
    } else {
        requested.to_string()
    }
}

/// Short random URL-safe identifier (72 bits of entropy).
///
/// Not cryptographic and not checked against existing keys.
pub fn generate_id() -> String {
    let mut rng = rand::rng();
    (0..GENERATED_ID_LEN)
        .map(|_| ID_ALPHABET[rng.random_range(0..ID_ALPHABET.len())] as char)
        .collect()
}
