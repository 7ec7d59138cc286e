//! CSS helpers shared by selector construction and element trimming.
//!
//! Covers identifier/string escaping for generated selectors and a small
//! inline `style=""` reader for the properties that affect whether an
//! element can be a click target.

/// Inline style properties relevant to click-target detection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleProps {
    pub cursor: Option<String>,
    pub pointer_events: Option<String>,
}

impl StyleProps {
    pub fn has_pointer_cursor(&self) -> bool {
        self.cursor.as_deref() == Some("pointer")
    }

    pub fn ignores_pointer(&self) -> bool {
        self.pointer_events.as_deref() == Some("none")
    }
}

/// Parse an inline `style="..."` attribute value.
pub fn parse_inline_style(style: &str) -> StyleProps {
    let mut props = StyleProps::default();
    for decl in style.split(';') {
        let Some((prop, val)) = decl.split_once(':') else {
            continue;
        };
        let val = val
            .trim()
            .trim_end_matches("!important")
            .trim()
            .to_ascii_lowercase();
        match prop.trim().to_ascii_lowercase().as_str() {
            "cursor" => props.cursor = Some(val),
            "pointer-events" => props.pointer_events = Some(val),
            _ => {}
        }
    }
    props
}

/// Escape a string for use as a CSS identifier (`CSS.escape` semantics).
pub fn escape_ident(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    let mut out = String::with_capacity(value.len());

    for (i, &ch) in chars.iter().enumerate() {
        let code = ch as u32;
        if ch == '\0' {
            out.push('\u{FFFD}');
        } else if (0x01..=0x1F).contains(&code)
            || code == 0x7F
            || (i == 0 && ch.is_ascii_digit())
            || (i == 1 && ch.is_ascii_digit() && chars[0] == '-')
        {
            out.push_str(&format!("\\{:x} ", code));
        } else if i == 0 && ch == '-' && chars.len() == 1 {
            out.push_str("\\-");
        } else if code >= 0x80 || ch == '-' || ch == '_' || ch.is_ascii_alphanumeric() {
            out.push(ch);
        } else {
            out.push('\\');
            out.push(ch);
        }
    }
    out
}

/// Quote a value for use inside an attribute selector: `[name="value"]`.
pub fn quote_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '"' | '\\' => {
                out.push('\\');
                out.push(ch);
            }
            '\0' => out.push('\u{FFFD}'),
            c if c.is_control() => out.push_str(&format!("\\{:x} ", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
