// Cleans raw model replies before they are decoded as JSON.

const FENCE: &str = "```";

/// Strip markdown code fences and non-printable characters from a model reply.
///
/// Runs single cleaning passes until nothing changes, so the result is a
/// fixed point: normalizing it again returns it unchanged. Every pass only
/// removes characters, which bounds the loop by the input length.
pub fn normalize_reply(raw: &str) -> String {
    let mut current = clean_once(raw);
    loop {
        let next = clean_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn clean_once(text: &str) -> String {
    let mut text = text.trim();

    if let Some(rest) = text.strip_prefix(FENCE) {
        text = strip_language_tag(rest).trim();
    }
    if let Some(rest) = text.strip_suffix(FENCE) {
        text = rest.trim();
    }

    text.chars().filter(|c| is_printable(*c)).collect()
}

const KNOWN_LANGUAGE_TAGS: [&str; 5] = ["json", "json5", "jsonc", "javascript", "js"];

/// Drop a fence language tag such as `json`, `JSON` or `json5`.
fn strip_language_tag(text: &str) -> &str {
    let tag_len: usize = text
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '+' | '.'))
        .map(char::len_utf8)
        .sum();
    let (tag, after_tag) = text.split_at(tag_len);

    // Unknown words glued to the content are content, e.g. "```true```".
    let alone_on_line = after_tag.is_empty() || after_tag.starts_with(char::is_whitespace);
    let known = KNOWN_LANGUAGE_TAGS.iter().any(|known| tag.eq_ignore_ascii_case(known));
    if tag_len == 0 || alone_on_line || known {
        after_tag
    } else {
        text
    }
}

fn is_printable(c: char) -> bool {
    if c == ' ' {
        return true;
    }
    if c.is_control() || c.is_whitespace() {
        return false;
    }
    !(is_format(c) || is_private_use(c) || is_noncharacter(c))
}

/// Unicode format characters (category Cf).
fn is_format(c: char) -> bool {
    matches!(
        c,
        '\u{00AD}'                       // Soft hyphen
        | '\u{0600}'..='\u{0605}'       // Arabic number signs
        | '\u{061C}'                     // Arabic letter mark
        | '\u{06DD}'
        | '\u{070F}'
        | '\u{0890}'..='\u{0891}'
        | '\u{08E2}'
        | '\u{180E}'                     // Mongolian vowel separator
        | '\u{200B}'..='\u{200F}'       // Zero-width space/joiners, LTR/RTL marks
        | '\u{202A}'..='\u{202E}'       // Bidi embedding and overrides
        | '\u{2060}'..='\u{2064}'       // Word joiner, invisible operators
        | '\u{2066}'..='\u{206F}'       // Bidi isolates, deprecated format controls
        | '\u{FEFF}'                     // BOM / zero-width no-break space
        | '\u{FFF9}'..='\u{FFFB}'       // Interlinear annotation
        | '\u{110BD}'
        | '\u{110CD}'
        | '\u{13430}'..='\u{1343F}'     // Egyptian hieroglyph format controls
        | '\u{1BCA0}'..='\u{1BCA3}'     // Shorthand format controls
        | '\u{1D173}'..='\u{1D17A}'     // Musical symbol format controls
        | '\u{E0000}'..='\u{E007F}'     // Tag characters
    )
}

/// Private-use characters (category Co).
fn is_private_use(c: char) -> bool {
    matches!(
        c,
        '\u{E000}'..='\u{F8FF}' | '\u{F0000}'..='\u{FFFFD}' | '\u{100000}'..='\u{10FFFD}'
    )
}

/// Permanently unassigned code points.
fn is_noncharacter(c: char) -> bool {
    matches!(c, '\u{FDD0}'..='\u{FDEF}') || (c as u32 & 0xFFFE) == 0xFFFE
}
