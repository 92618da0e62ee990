//! Whitespace normalization shared by every locale parser (§4.D).
//!
//! Mirrors `normalize_text` in the original scraper exactly: `\r` becomes `\n`,
//! runs of spaces/tabs collapse to a single space, and any run of two or more
//! newlines collapses to a single newline (a blank line never survives).

/// Returns `None` for `None` input or input that normalizes to an empty string,
/// mirroring the `--` / empty-cell sentinel handling used throughout parsing.
#[must_use]
pub fn normalize(text: Option<&str>) -> Option<String> {
    let text = text?;
    let unified = text.replace('\r', "\n");

    let mut collapsed_spaces = String::with_capacity(unified.len());
    let mut last_was_space_or_tab = false;
    for ch in unified.chars() {
        if ch == ' ' || ch == '\t' {
            if !last_was_space_or_tab {
                collapsed_spaces.push(' ');
            }
            last_was_space_or_tab = true;
        } else {
            collapsed_spaces.push(ch);
            last_was_space_or_tab = false;
        }
    }

    let mut result = String::with_capacity(collapsed_spaces.len());
    let mut last_was_newline = false;
    for ch in collapsed_spaces.chars() {
        if ch == '\n' {
            if !last_was_newline {
                result.push('\n');
            }
            last_was_newline = true;
        } else {
            result.push(ch);
            last_was_newline = false;
        }
    }

    let trimmed = result.trim().to_string();
    if trimmed.is_empty() { None } else { Some(trimmed) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_runs_of_spaces_and_tabs() {
        assert_eq!(normalize(Some("a   b\t\tc")).as_deref(), Some("a b c"));
    }

    #[test]
    fn converts_carriage_returns_and_removes_blank_lines() {
        let raw = "line one\r\n\r\n\r\nline two";
        assert_eq!(normalize(Some(raw)).as_deref(), Some("line one\nline two"));
    }

    #[test]
    fn single_newline_is_preserved() {
        assert_eq!(normalize(Some("a\nb")).as_deref(), Some("a\nb"));
    }

    #[test]
    fn none_and_blank_input_normalize_to_none() {
        assert_eq!(normalize(None), None);
        assert_eq!(normalize(Some("   \n\t ")), None);
    }
}
