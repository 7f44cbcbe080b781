//! Message text cleanup before it reaches the speech command.
//!
//! Chat protocols deliver HTML-ish markup. Tags are dropped, common
//! entities are decoded, and apostrophes, newlines and control characters
//! are removed outright.

/// Tags that end a line of text when rendered.
const LINE_BREAK_TAGS: &[&str] = &["br", "p", "div", "li", "tr"];

/// Remove tags and decode entities. Line-breaking tags become `\n`.
pub fn strip_markup(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find(['<', '&']) {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];

        if rest.starts_with('<') {
            match rest.find('>') {
                Some(end) => {
                    if breaks_line(&rest[1..end]) {
                        out.push('\n');
                    }
                    rest = &rest[end + 1..];
                }
                None => {
                    out.push('<');
                    rest = &rest[1..];
                }
            }
        } else {
            match decode_entity(rest) {
                Some((ch, len)) => {
                    out.push(ch);
                    rest = &rest[len..];
                }
                None => {
                    out.push('&');
                    rest = &rest[1..];
                }
            }
        }
    }

    out.push_str(rest);
    out
}

fn breaks_line(tag: &str) -> bool {
    let name: String = tag
        .trim_start_matches('/')
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase();
    LINE_BREAK_TAGS.contains(&name.as_str())
}

/// Decode an entity at the start of `s`. Returns the char and the number
/// of bytes consumed, including the trailing `;`.
fn decode_entity(s: &str) -> Option<(char, usize)> {
    let end = s
        .char_indices()
        .take(12)
        .find(|(_, c)| *c == ';')
        .map(|(i, _)| i)?;
    let name = &s[1..end];
    let ch = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => ' ',
        _ => {
            let code = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                name.strip_prefix('#')?.parse::<u32>().ok()?
            };
            // Control characters stay as literal text.
            char::from_u32(code).filter(|c| !c.is_control() || *c == '\n')?
        }
    };
    Some((ch, end + 1))
}

/// Remove characters that must not reach a shell command line:
/// apostrophes, newlines and every other control character but tab.
pub fn strip_unsafe(text: &str) -> String {
    text.chars()
        .filter(|c| *c != '\'' && (*c == '\t' || !c.is_control()))
        .collect()
}

/// Markup stripping followed by unsafe-character removal.
pub fn normalize(raw: &str) -> String {
    strip_unsafe(&strip_markup(raw))
}
