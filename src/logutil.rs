//! Log helpers for room-authored text (titles, descriptions, signs, broadcasts).
//! Keeps each log record on one line and bounded in size.

const PREVIEW_CHARS: usize = 120;

/// Single-line preview of arbitrary text: runs of whitespace collapse to one
/// space, other control characters become `\xNN`, and anything past
/// [`PREVIEW_CHARS`] characters is cut with an ellipsis.
pub fn preview(s: &str) -> String {
    preview_with_limit(s, PREVIEW_CHARS)
}

pub fn preview_with_limit(s: &str, limit: usize) -> String {
    use std::fmt::Write;

    let mut out = String::with_capacity(s.len().min(limit) + 4);
    let mut emitted = 0;
    let mut pending_space = false;
    for ch in s.trim().chars() {
        if ch.is_whitespace() {
            pending_space = true;
            continue;
        }
        if emitted >= limit {
            out.push('…');
            return out;
        }
        if pending_space {
            out.push(' ');
            emitted += 1;
            pending_space = false;
        }
        if ch.is_control() {
            let _ = write!(&mut out, "\\x{:02X}", ch as u32);
        } else {
            out.push(ch);
        }
        emitted += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_whitespace() {
        assert_eq!(preview("  A dusty\n\n  road\tbends. "), "A dusty road bends.");
    }

    #[test]
    fn escapes_controls_and_truncates() {
        assert_eq!(preview("bell\u{7}"), "bell\\x07");
        assert_eq!(preview_with_limit("abcdefgh", 3), "abc…");
    }
}
