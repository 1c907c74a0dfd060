//! Terminal error page.

use alloc::string::String;
use alloc::vec::Vec;

use embedded_graphics::prelude::Point;

use super::{LINE_HEIGHT, PADDING};
use crate::display::{DisplaySink, RED, WHITE};

/// 40 columns of `FONT_8X13` across the panel.
pub const ERROR_MAX_LINE_CHARS: usize = 40;
/// Rows that fit below the header.
pub const ERROR_MAX_LINES: usize = 12;

const ELLIPSIS: &str = "...";

/// Word-wrap `message` into at most `max_lines` lines of at most
/// `max_chars` characters.
///
/// Words longer than a line are split across lines. When the text does not
/// fit, the last kept line is cut and ends with `...`.
pub fn wrap_message(message: &str, max_chars: usize, max_lines: usize) -> Vec<String> {
    let max_chars = max_chars.max(ELLIPSIS.len() + 1);
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in message.split_whitespace() {
        let mut rest = word;
        loop {
            let word_len = rest.chars().count();
            let needed = if current_len == 0 { word_len } else { current_len + 1 + word_len };

            if needed <= max_chars {
                if current_len > 0 {
                    current.push(' ');
                }
                current.push_str(rest);
                current_len = needed;
                break;
            }

            if current_len > 0 {
                lines.push(core::mem::take(&mut current));
                current_len = 0;
                continue;
            }

            // Word alone is wider than a line.
            let split = rest
                .char_indices()
                .nth(max_chars)
                .map_or(rest.len(), |(i, _)| i);
            lines.push(String::from(&rest[..split]));
            rest = &rest[split..];
            if rest.is_empty() {
                break;
            }
        }
    }

    if current_len > 0 {
        lines.push(current);
    }

    if lines.len() > max_lines {
        lines.truncate(max_lines);
        if let Some(last) = lines.last_mut() {
            let keep = max_chars - ELLIPSIS.len();
            let cut = last.char_indices().nth(keep).map_or(last.len(), |(i, _)| i);
            last.truncate(cut);
            last.push_str(ELLIPSIS);
        }
    }

    lines
}

/// Blank the screen and show `message` under a red `Error:` header.
pub fn render_error_message<D>(display: &mut D, message: &str)
where
    D: DisplaySink + ?Sized,
{
    display.clear();

    let mut y = PADDING;
    display.text("Error:", Point::new(PADDING, y), RED);
    y += LINE_HEIGHT + PADDING;

    for line in wrap_message(message, ERROR_MAX_LINE_CHARS, ERROR_MAX_LINES) {
        display.text(&line, Point::new(PADDING, y), WHITE);
        y += LINE_HEIGHT + PADDING;
    }

    display.present();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrap(message: &str) -> Vec<String> {
        wrap_message(message, ERROR_MAX_LINE_CHARS, ERROR_MAX_LINES)
    }

    #[test]
    fn short_message_is_one_line() {
        assert_eq!(wrap("Sensor with key: temp_4 not found"), ["Sensor with key: temp_4 not found"]);
    }

    #[test]
    fn wraps_on_word_boundaries() {
        let lines = wrap("Could not find readings for sensor id:0x3c00000f1e64ff28, label:Garage");
        assert_eq!(
            lines,
            ["Could not find readings for sensor", "id:0x3c00000f1e64ff28, label:Garage"]
        );
    }

    #[test]
    fn long_message_is_capped_with_ellipsis() {
        let message = "A very long error ".repeat(40);
        let lines = wrap(&message);

        assert_eq!(lines.len(), ERROR_MAX_LINES);
        assert!(lines.iter().all(|l| l.chars().count() <= ERROR_MAX_LINE_CHARS));
        let last = lines.last().unwrap();
        assert!(last.ends_with("..."));
        assert!(last.chars().count() <= ERROR_MAX_LINE_CHARS);
    }

    #[test]
    fn exactly_full_message_has_no_ellipsis() {
        let message = std::vec!["x".repeat(40); 12].join(" ");
        let lines = wrap(&message);
        assert_eq!(lines.len(), 12);
        assert!(lines.iter().all(|l| l == &"x".repeat(40)));
    }

    #[test]
    fn oversized_word_is_split() {
        let word = "y".repeat(95);
        let lines = wrap(&word);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].len(), 40);
        assert_eq!(lines[1].len(), 40);
        assert_eq!(lines[2].len(), 15);
    }

    #[test]
    fn empty_message_has_no_lines() {
        assert!(wrap("   ").is_empty());
    }
}
