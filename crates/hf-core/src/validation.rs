//! Input checks applied before anything is sent to the store.

use crate::error::{AppError, Result};

/// Maximum win length, in characters, after trimming.
pub const MAX_WIN_CHARS: usize = 140;

/// Upper bound on the characters of one emoji marker (ZWJ sequences, skin tones, flags).
const MAX_EMOJI_CHARS: usize = 16;

/// Trims `text` and checks it is 1..=140 printable characters.
pub fn validate_win_text(text: &str) -> Result<String> {
    let trimmed = text.trim();
    let len = trimmed.chars().count();
    if len == 0 {
        return Err(AppError::ValidationError("win text is empty".into()));
    }
    if len > MAX_WIN_CHARS {
        return Err(AppError::ValidationError(format!(
            "win text is {len} characters, the limit is {MAX_WIN_CHARS}"
        )));
    }
    if trimmed.chars().any(char::is_control) {
        return Err(AppError::ValidationError(
            "win text contains control characters".into(),
        ));
    }
    Ok(trimmed.to_string())
}

/// Trims a board name and rejects it if nothing is left.
pub fn validate_board_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AppError::ValidationError("board name is empty".into()));
    }
    Ok(trimmed.to_string())
}

/// Accepts a short marker containing at least one emoji-class glyph.
pub fn validate_emoji(emoji: &str) -> Result<String> {
    let trimmed = emoji.trim();
    let len = trimmed.chars().count();
    let pictographic = trimmed.chars().any(is_emoji) || has_keycap(trimmed);
    if len == 0 || len > MAX_EMOJI_CHARS || !pictographic {
        return Err(AppError::ValidationError(format!(
            "{trimmed:?} is not an emoji"
        )));
    }
    Ok(trimmed.to_string())
}

/// `1️⃣`, `#️⃣`, `*⃣`: a digit, `#` or `*`, an optional U+FE0F, then U+20E3.
fn has_keycap(s: &str) -> bool {
    let chars: Vec<char> = s.chars().collect();
    chars.iter().enumerate().any(|(i, &c)| {
        (c.is_ascii_digit() || c == '#' || c == '*')
            && matches!(
                chars.get(i + 1..),
                Some(['\u{FE0F}', '\u{20E3}', ..] | ['\u{20E3}', ..])
            )
    })
}

fn is_emoji(c: char) -> bool {
    matches!(
        c as u32,
        0x1F000..=0x1FAFF   // pictographs, emoticons, transport, symbols & pictographs ext.
            | 0x2600..=0x27BF // misc symbols, dingbats
            | 0x2300..=0x23FF // misc technical (⌚, ⏰)
            | 0x2B05..=0x2B07 // ⬅ ⬆ ⬇
            | 0x2B1B..=0x2B1C
            | 0x2B50
            | 0x2B55
            | 0x2194..=0x2199 // ↔ ↕ and the diagonal arrows
            | 0x21A9..=0x21AA
            | 0x3030
            | 0x303D
            | 0x3297
            | 0x3299
            | 0x00A9
            | 0x00AE
            | 0x203C
            | 0x2049
            | 0x2122
            | 0x2139
    )
}
