//! HTML escaping and size limits for the chat surface.
//!
//! Every catalog-supplied string interpolated into a message body passes
//! through [`escape_html`]. Labels are capped by [`truncate_label`] before
//! they reach a keyboard.

/// Maximum characters in a single message body.
pub const MAX_MESSAGE_CHARS: usize = 4096;

/// Maximum characters in a control label.
pub const MAX_LABEL_CHARS: usize = 60;

/// Escape the characters the platform's HTML subset treats as markup.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Cap a label at [`MAX_LABEL_CHARS`] characters, ending with an ellipsis
/// when shortened.
pub fn truncate_label(label: &str) -> String {
    truncate_chars(label, MAX_LABEL_CHARS)
}

/// Cap `s` at `max` characters (not bytes), ending with `…` when shortened.
pub fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_owned();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}
