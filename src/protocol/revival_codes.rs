use crate::config::ProtocolConfig;
use rand::RngExt;

/// Generate a revival code of the configured length.
///
/// Revival codes are read off a knocked-out player's screen and typed in by a
/// teammate, so the alphabet avoids confusable characters (0, O, I, 1). This
/// is a cooperative lobby token, not a security boundary.
pub fn generate_revival_code_with_config(config: &ProtocolConfig) -> String {
    generate_revival_code_of_length(config.revival_code_length)
}

/// Generate a clean revival code of the requested length.
pub fn generate_revival_code_of_length(length: usize) -> String {
    const CLEAN_CHARS: &[u8] = b"23456789ABCDEFGHJKLMNPQRSTUVWXYZ";
    if length == 0 {
        return String::new();
    }
    let mut rng = rand::rng();
    (0..length)
        .map(|_| {
            let idx = rng.random_range(0..CLEAN_CHARS.len());
            // SAFETY: `idx` is produced by `random_range(0..len)`, so it is
            // always within [0, len).
            #[allow(clippy::indexing_slicing)]
            let ch = CLEAN_CHARS[idx] as char;
            ch
        })
        .collect()
}

/// Generate a 6-character revival code with the default alphabet.
pub fn generate_revival_code() -> String {
    let cfg = ProtocolConfig::default();
    generate_revival_code_with_config(&cfg)
}

/// Codes are compared case-insensitively and ignoring surrounding
/// whitespace; this is the canonical form stored in the knockout registry.
pub fn normalize_revival_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}
