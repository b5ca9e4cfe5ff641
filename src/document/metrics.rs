//! Approximate Helvetica advance widths, in thousandths of the font size.

use super::Font;

fn regular_width(c: char) -> u16 {
    match c {
        ' ' | '!' | ',' | '.' | '/' | ':' | ';' | '[' | ']' | '\\' | 'f' | 't' | 'I' => 278,
        '\'' | '|' => 191,
        'i' | 'j' | 'l' => 222,
        '(' | ')' | '-' | 'r' | '`' => 333,
        '"' => 355,
        '*' => 389,
        'J' | 'c' | 'k' | 's' | 'v' | 'x' | 'y' | 'z' => 500,
        '0'..='9' | '#' | '$' | '?' | '_' | 'L' | 'a' | 'b' | 'd' | 'e' | 'g' | 'h' | 'n' | 'o'
        | 'p' | 'q' | 'u' => 556,
        '+' | '<' | '=' | '>' | '~' => 584,
        'F' | 'T' | 'Z' => 611,
        'A' | 'B' | 'E' | 'K' | 'P' | 'S' | 'V' | 'X' | 'Y' | '&' => 667,
        'C' | 'D' | 'H' | 'N' | 'R' | 'U' | 'w' => 722,
        'G' | 'O' | 'Q' => 778,
        'M' | 'm' | '%' => 833,
        '@' => 1015,
        'W' => 944,
        _ => 556,
    }
}

fn bold_width(c: char) -> u16 {
    match c {
        ' ' | ',' | '.' | '/' | ':' | ';' | '\\' | 'I' | 'i' | 'j' | 'l' => 278,
        '!' | '(' | ')' | '-' | '`' | 'f' | 't' | '[' | ']' => 333,
        '\'' => 238,
        '|' => 280,
        'r' => 389,
        '"' => 474,
        'J' | 'c' | 'k' | 's' | 'v' | 'x' | 'y' | 'z' | 'a' => 556,
        '0'..='9' | '#' | '$' | '_' => 556,
        '+' | '<' | '=' | '>' | '~' => 584,
        'F' | 'L' | '?' | 'b' | 'd' | 'g' | 'h' | 'n' | 'o' | 'p' | 'q' | 'u' | 'T' | 'Z' => 611,
        'B' | 'C' | 'D' | 'H' | 'K' | 'N' | 'R' | 'U' | 'A' | '&' => 722,
        'E' | 'P' | 'S' | 'V' | 'X' | 'Y' => 667,
        'G' | 'O' | 'Q' | 'w' => 778,
        'M' | 'm' => 889,
        '%' => 889,
        '@' => 975,
        'W' => 944,
        _ => 611,
    }
}

pub fn text_width(text: &str, font: Font, size: f32) -> f32 {
    let units: u32 = text
        .chars()
        .map(|c| match font {
            Font::Regular => regular_width(c),
            Font::Bold => bold_width(c),
        } as u32)
        .sum();
    units as f32 * size / 1000.0
}

/// Greedy word wrap. Explicit newlines always break; words longer than a
/// line are split between characters.
pub fn wrap(text: &str, font: Font, size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let paragraph = paragraph.trim_end_matches('\r');
        let mut current = String::new();
        for word in paragraph.split(' ') {
            let candidate = if current.is_empty() {
                word.to_owned()
            } else {
                format!("{current} {word}")
            };
            if text_width(&candidate, font, size) <= max_width {
                current = candidate;
                continue;
            }
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            for c in word.chars() {
                current.push(c);
                if text_width(&current, font, size) > max_width && current.chars().count() > 1 {
                    current.pop();
                    lines.push(std::mem::take(&mut current));
                    current.push(c);
                }
            }
        }
        lines.push(current);
    }
    lines
}
