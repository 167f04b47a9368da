//! Log helpers for captions and option labels, which are user/translator
//! supplied and may span several lines.

/// Longest caption preview written to a log line.
pub const CAPTION_PREVIEW: usize = 80;

/// Render `s` as a single log-safe line, cut after `max` characters.
///
/// Newlines, tabs and backslashes are escaped; other control characters are
/// written as `\xNN`.
pub fn escape_log(s: &str, max: usize) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(s.len().min(max) + 4);
    for (count, ch) in s.chars().enumerate() {
        if count >= max {
            out.push('…');
            break;
        }
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(&mut out, "\\x{:02X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

/// Shorthand for captions.
pub fn caption(s: &str) -> String {
    escape_log(s, CAPTION_PREVIEW)
}
