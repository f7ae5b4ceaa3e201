//! Markup escaping for user-supplied text.
//!
//! `escape_latex` is total: every input string maps to text that typesets
//! literally inside a paragraph or a macro argument. Formatters call it exactly
//! once per raw field; escaped text is never escaped again.

/// Characters with structural meaning in the target markup.
pub const RESERVED_CHARS: &[char] = &['\\', '{', '}', '&', '%', '$', '#', '_', '~', '^'];

/// Escapes `text` for literal display.
///
/// Single pass over the input, so the braces emitted for `\textbackslash{}`
/// are never themselves re-escaped. Line breaks collapse to one space (a blank
/// line inside a macro argument would end the paragraph); other ASCII control
/// characters are dropped. Everything outside the reserved set, including
/// non-ASCII text, passes through unchanged.
pub fn escape_latex(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 8);
    let mut in_line_break = false;

    for c in text.chars() {
        if c == '\n' || c == '\r' {
            if !in_line_break {
                out.push(' ');
                in_line_break = true;
            }
            continue;
        }
        in_line_break = false;

        match c {
            '\\' => out.push_str(r"\textbackslash{}"),
            '{' => out.push_str(r"\{"),
            '}' => out.push_str(r"\}"),
            '&' => out.push_str(r"\&"),
            '%' => out.push_str(r"\%"),
            '$' => out.push_str(r"\$"),
            '#' => out.push_str(r"\#"),
            '_' => out.push_str(r"\_"),
            '~' => out.push_str(r"\textasciitilde{}"),
            '^' => out.push_str(r"\textasciicircum{}"),
            '\t' => out.push(' '),
            c if c.is_ascii_control() => {}
            c => out.push(c),
        }
    }

    out
}

/// Escapes a hyperlink target for the first argument of `\href`.
///
/// `%` and `#` keep their meaning in the URL but must be backslash-escaped;
/// characters that cannot appear in that argument are percent-encoded.
pub fn escape_url(url: &str) -> String {
    let mut out = String::with_capacity(url.len());
    for c in url.trim().chars() {
        match c {
            '%' => out.push_str(r"\%"),
            '#' => out.push_str(r"\#"),
            '\\' | '{' | '}' | '^' | '~' | ' ' | '"' => {
                out.push_str(&format!("%{:02X}", c as u32));
            }
            c if c.is_ascii_control() => {}
            c => out.push(c),
        }
    }
    out
}

/// Prefixes `https://` unless the URL already carries an http(s) scheme.
pub fn ensure_url_protocol(url: &str) -> String {
    let url = url.trim();
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}

/// Builds a `tel:` target: a leading `+` followed by the digits only.
pub fn phone_href(phone: &str) -> String {
    let trimmed = phone.trim();
    let mut out = String::from("tel:");
    if trimmed.starts_with('+') {
        out.push('+');
    }
    out.extend(trimmed.chars().filter(|c| c.is_ascii_digit()));
    out
}
