//! Token generation and shape validation.
//!
//! Tokens are `_` followed by 42 lowercase hex characters (21 random bytes).

use rand::RngCore;

const TOKEN_PREFIX: char = '_';
const TOKEN_BYTES: usize = 21;
const TOKEN_LEN: usize = 1 + TOKEN_BYTES * 2;

pub fn generate() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("{}{}", TOKEN_PREFIX, hex::encode(bytes))
}

/// Returns true if `raw` has the exact shape of a generated token.
pub fn is_well_formed(raw: &str) -> bool {
    let Some(body) = raw.strip_prefix(TOKEN_PREFIX) else {
        return false;
    };
    raw.len() == TOKEN_LEN
        && body
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}
