//! Shell-style glob matching for subscription path patterns.
//!
//! Semantics, pinned by the tests below:
//! - the pattern is matched against the whole forward-slash relative path
//!   (anchored at both ends, not a substring or suffix match);
//! - `*` and `?` match within one path segment only (never `/`);
//! - `[abc]` / `[!abc]` character classes are supported;
//! - `**` matches any number of segments, including none.

use regex::Regex;

/// Match `path` (forward-slash, project-relative) against a glob pattern.
///
/// Unparsable patterns match nothing.
pub fn glob_match(pattern: &str, path: &str) -> bool {
    match compile(pattern) {
        Ok(re) => re.is_match(path),
        Err(_) => false,
    }
}

fn compile(pattern: &str) -> Result<Regex, regex::Error> {
    let mut re = String::with_capacity(pattern.len() + 8);
    re.push('^');

    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => {
                if chars.peek() == Some(&'*') {
                    chars.next();
                    if chars.peek() == Some(&'/') {
                        // "a/**/b" also matches "a/b"
                        chars.next();
                        re.push_str("(?:[^/]*/)*");
                    } else {
                        re.push_str(".*");
                    }
                } else {
                    re.push_str("[^/]*");
                }
            }
            '?' => re.push_str("[^/]"),
            '[' => {
                re.push('[');
                if chars.peek() == Some(&'!') {
                    chars.next();
                    re.push('^');
                }
                for cc in chars.by_ref() {
                    if cc == '\\' || cc == '^' {
                        re.push('\\');
                    }
                    re.push(cc);
                    if cc == ']' {
                        break;
                    }
                }
            }
            other => re.push_str(&regex::escape(&other.to_string())),
        }
    }

    re.push('$');
    Regex::new(&re)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_path() {
        assert!(glob_match("src/main.py", "src/main.py"));
        assert!(!glob_match("src/main.py", "src/other.py"));
    }

    #[test]
    fn test_star_stays_in_segment() {
        assert!(glob_match("src/*.py", "src/main.py"));
        assert!(!glob_match("src/*.py", "src/sub/main.py"));
        assert!(!glob_match("*.py", "src/main.py"));
    }

    #[test]
    fn test_match_is_anchored() {
        // Not a suffix match: "b.py" must not match "a/b.py".
        assert!(!glob_match("b.py", "a/b.py"));
        assert!(!glob_match("src/main", "src/main.py"));
    }

    #[test]
    fn test_question_mark() {
        assert!(glob_match("src/?.py", "src/a.py"));
        assert!(!glob_match("src/?.py", "src/ab.py"));
        assert!(!glob_match("src?main.py", "src/main.py"));
    }

    #[test]
    fn test_double_star_crosses_segments() {
        assert!(glob_match("src/**/*.py", "src/a/b/c.py"));
        assert!(glob_match("src/**/*.py", "src/c.py"));
        assert!(glob_match("**/*.rs", "deep/tree/lib.rs"));
        assert!(glob_match("**", "anything/at/all"));
    }

    #[test]
    fn test_character_class() {
        assert!(glob_match("src/[ab].py", "src/a.py"));
        assert!(glob_match("src/[ab].py", "src/b.py"));
        assert!(!glob_match("src/[ab].py", "src/c.py"));
        assert!(glob_match("src/[!ab].py", "src/c.py"));
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        assert!(glob_match("src/a+b.py", "src/a+b.py"));
        assert!(!glob_match("src/a+b.py", "src/aab.py"));
        assert!(glob_match("src/(x).py", "src/(x).py"));
    }

    #[test]
    fn test_unterminated_class_matches_nothing() {
        assert!(!glob_match("src/[ab.py", "src/a.py"));
    }
}
