//! Credential masking for log output.

/// Placeholder emitted for credentials too short to partially reveal.
pub const MASKED_PLACEHOLDER: &str = "***";

/// Credentials up to this many characters are fully masked.
const MASK_THRESHOLD_CHARS: usize = 8;

/// Number of characters kept at each end of a longer credential.
const MASK_VISIBLE_CHARS: usize = 4;

/// Mask a credential before it is written to any log.
///
/// - 8 characters or fewer: `***`
/// - longer: first 4 characters, `...`, last 4 characters
///
/// Works on characters rather than bytes, so multi-byte input never splits
/// a code point.
pub fn mask_credential(credential: &str) -> String {
    let char_count = credential.chars().count();
    if char_count <= MASK_THRESHOLD_CHARS {
        return MASKED_PLACEHOLDER.to_string();
    }

    let head: String = credential.chars().take(MASK_VISIBLE_CHARS).collect();
    let tail: String = credential
        .chars()
        .skip(char_count - MASK_VISIBLE_CHARS)
        .collect();

    format!("{head}...{tail}")
}
