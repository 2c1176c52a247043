//! Log sanitization helpers
//!
//! Tokens and upstream bodies go through these before reaching a log line.

/// Maximum number of bytes of an upstream body included in a log line
const TRUNCATE_LIMIT: usize = 256;

/// Characters of a secret left visible on each side
const MASK_VISIBLE: usize = 4;

fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        s.len()
    } else {
        let mut i = index;
        while i > 0 && !s.is_char_boundary(i) {
            i -= 1;
        }
        i
    }
}

/// Truncate an upstream body for logging
pub fn truncate_for_log(s: &str) -> String {
    if s.len() <= TRUNCATE_LIMIT {
        s.to_string()
    } else {
        format!(
            "{}... [truncated, total {} bytes]",
            &s[..floor_char_boundary(s, TRUNCATE_LIMIT)],
            s.len()
        )
    }
}

/// Mask a token, keeping only its first and last few characters
///
/// Short secrets are masked entirely.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= MASK_VISIBLE * 3 {
        return "*".repeat(chars.len().min(8));
    }

    let head: String = chars[..MASK_VISIBLE].iter().collect();
    let tail: String = chars[chars.len() - MASK_VISIBLE..].iter().collect();
    format!("{}…{} ({} chars)", head, tail, chars.len())
}
