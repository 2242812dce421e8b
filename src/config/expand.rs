//! `$NAME` / `${NAME}` substitution over raw config text
//!
//! Runs before TOML parsing and knows nothing about the schema. Unset
//! variables expand to the empty string; `$$` is a literal `$`.

/// Expand tokens using the process environment.
#[must_use]
pub fn expand(text: &str) -> String {
    expand_with(text, |name| std::env::var(name).ok())
}

/// Expand tokens using `lookup`. A `None` from `lookup` expands to nothing.
pub fn expand_with<F>(text: &str, mut lookup: F) -> String
where
    F: FnMut(&str) -> Option<String>,
{
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut start = 0;
    let mut j = 0;

    while j < bytes.len() {
        if bytes[j] == b'$' && j + 1 < bytes.len() {
            out.push_str(&text[start..j]);
            let (name, width) = shell_name(&text[j + 1..]);
            match name {
                Some("$") => out.push('$'),
                Some(name) => {
                    if let Some(value) = lookup(name) {
                        out.push_str(&value);
                    }
                }
                // not followed by a name, keep the dollar
                None if width == 0 => out.push('$'),
                // malformed braces are dropped
                None => {}
            }
            j += width;
            start = j + 1;
        }
        j += 1;
    }

    out.push_str(&text[start..]);
    out
}

const fn is_special(c: u8) -> bool {
    matches!(c, b'*' | b'#' | b'$' | b'@' | b'!' | b'?' | b'-' | b'0'..=b'9')
}

/// Name following a `$` and the number of bytes it occupies. `s` is non-empty.
fn shell_name(s: &str) -> (Option<&str>, usize) {
    let b = s.as_bytes();

    if b[0] == b'{' {
        if b.len() > 2 && is_special(b[1]) && b[2] == b'}' {
            return (Some(&s[1..2]), 3);
        }
        return match b[1..].iter().position(|&c| c == b'}') {
            Some(0) => (None, 2),
            Some(end) => (Some(&s[1..=end]), end + 2),
            None => (None, 1),
        };
    }

    if is_special(b[0]) {
        return (Some(&s[..1]), 1);
    }

    let len = b
        .iter()
        .take_while(|c| c.is_ascii_alphanumeric() || **c == b'_')
        .count();
    if len == 0 {
        (None, 0)
    } else {
        (Some(&s[..len]), len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn expand_map(text: &str) -> String {
        let vars: HashMap<&str, &str> = [
            ("HOME", "/root"),
            ("USER", "svc"),
            ("EMPTY", ""),
            ("1", "first"),
        ]
        .into_iter()
        .collect();
        expand_with(text, |name| vars.get(name).map(|v| (*v).to_string()))
    }

    #[test]
    fn test_braced_and_bare() {
        assert_eq!(expand_map("path = \"${HOME}/data\""), "path = \"/root/data\"");
        assert_eq!(expand_map("$HOME/data"), "/root/data");
        assert_eq!(expand_map("${USER}_${HOME}"), "svc_/root");
        assert_eq!(expand_map("$USER_suffix"), "");
    }

    #[test]
    fn test_missing_is_empty() {
        assert_eq!(expand_map("a${NOPE}b"), "ab");
        assert_eq!(expand_map("a$NOPE-b"), "a-b");
        assert_eq!(expand_map("x${EMPTY}y"), "xy");
    }

    #[test]
    fn test_dollar_escape() {
        assert_eq!(expand_map("cost $$5"), "cost $5");
        assert_eq!(expand_map("$$HOME"), "$HOME");
        assert_eq!(expand_map("${$}"), "$");
    }

    #[test]
    fn test_literal_dollar_kept() {
        assert_eq!(expand_map("trailing $"), "trailing $");
        assert_eq!(expand_map("5$ only"), "5$ only");
        assert_eq!(expand_map("$/x"), "$/x");
    }

    #[test]
    fn test_special_names() {
        assert_eq!(expand_map("$1st"), "firstst");
        assert_eq!(expand_map("${1}"), "first");
        assert_eq!(expand_map("a$-b"), "ab");
    }

    #[test]
    fn test_malformed_braces() {
        assert_eq!(expand_map("a${}b"), "ab");
        assert_eq!(expand_map("a${HOME"), "aHOME");
    }

    #[test]
    fn test_no_recursion() {
        let out = expand_with("${A}", |name| match name {
            "A" => Some("${B}".to_string()),
            _ => Some("nested".to_string()),
        });
        assert_eq!(out, "${B}");
    }

    #[test]
    fn test_unicode_untouched() {
        assert_eq!(expand_map("名前 = \"${USER}é\""), "名前 = \"svcé\"");
        assert_eq!(expand_map("${ü}"), "");
    }
}
