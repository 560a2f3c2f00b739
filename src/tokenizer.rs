// ABOUTME: Bracket-, string-, and comment-aware splitter producing top-level tokens

/// A top-level token with its byte offset into the tokenized slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub offset: usize,
    pub text: String,
}

/// Split an expression into top-level tokens.
///
/// Whitespace separates tokens only at bracket depth zero and outside
/// string literals; a balanced `()[]{}` group or a `"…"` literal always
/// lands in a single token. `;` starts a comment that runs to the end of
/// the line; comment bytes are never part of any token. Mismatched
/// brackets are not diagnosed here.
pub fn tokenize(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut start = 0usize;
    let mut depth: i64 = 0;
    let mut in_string = false;
    let mut escape = false;
    let mut in_comment = false;

    for (i, ch) in input.char_indices() {
        if in_comment {
            if ch == '\n' {
                in_comment = false;
            }
            continue;
        }

        if in_string {
            current.push(ch);
            if escape {
                escape = false;
            } else if ch == '\\' {
                escape = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => {
                if current.is_empty() {
                    start = i;
                }
                in_string = true;
                current.push(ch);
            }
            ';' => {
                in_comment = true;
                if depth == 0 {
                    flush(&mut tokens, &mut current, start);
                }
            }
            '(' | '[' | '{' => {
                if current.is_empty() {
                    start = i;
                }
                depth += 1;
                current.push(ch);
            }
            ')' | ']' | '}' => {
                if current.is_empty() {
                    start = i;
                }
                depth -= 1;
                current.push(ch);
            }
            c if c.is_whitespace() && depth == 0 => {
                flush(&mut tokens, &mut current, start);
            }
            _ => {
                if current.is_empty() {
                    start = i;
                }
                current.push(ch);
            }
        }
    }

    flush(&mut tokens, &mut current, start);
    tokens
}

fn flush(tokens: &mut Vec<Token>, current: &mut String, start: usize) {
    if !current.is_empty() {
        tokens.push(Token {
            offset: start,
            text: std::mem::take(current),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(input: &str) -> Vec<String> {
        tokenize(input).into_iter().map(|t| t.text).collect()
    }

    #[test]
    fn test_splits_on_whitespace() {
        assert_eq!(texts("a b  c"), vec!["a", "b", "c"]);
        assert_eq!(texts("  a\n\tb "), vec!["a", "b"]);
    }

    #[test]
    fn test_keeps_bracket_groups_whole() {
        assert_eq!(texts("f (g 1 2) h"), vec!["f", "(g 1 2)", "h"]);
        assert_eq!(texts("[1 2 3] {x y}"), vec!["[1 2 3]", "{x y}"]);
        assert_eq!(texts("(a (b c) d)"), vec!["(a (b c) d)"]);
    }

    #[test]
    fn test_prefixed_brackets_stay_attached() {
        assert_eq!(texts("#[x + 1] l[1 2]"), vec!["#[x + 1]", "l[1 2]"]);
    }

    #[test]
    fn test_strings_keep_whitespace_and_semicolons() {
        assert_eq!(texts(r#""a b" c"#), vec![r#""a b""#, "c"]);
        assert_eq!(texts(r#""no ; comment" x"#), vec![r#""no ; comment""#, "x"]);
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(texts(r#""say \"hi\"" y"#), vec![r#""say \"hi\"""#, "y"]);
        assert_eq!(texts(r#""back\\" z"#), vec![r#""back\\""#, "z"]);
    }

    #[test]
    fn test_comments_are_dropped() {
        assert_eq!(texts("a ; rest of line\nb"), vec!["a", "b"]);
        assert_eq!(texts("a;tight comment\nb"), vec!["a", "b"]);
        assert_eq!(texts("; only a comment"), Vec::<String>::new());
    }

    #[test]
    fn test_comment_inside_group_is_dropped() {
        assert_eq!(texts("(1 2 ; c\n 3)"), vec!["(1 2  3)"]);
    }

    #[test]
    fn test_quote_inside_comment_is_ignored() {
        assert_eq!(texts("a ; \" not a string\nb"), vec!["a", "b"]);
    }

    #[test]
    fn test_offsets_are_byte_offsets() {
        let tokens = tokenize("ab (c d) e");
        assert_eq!(tokens[0].offset, 0);
        assert_eq!(tokens[1].offset, 3);
        assert_eq!(tokens[2].offset, 9);
    }

    #[test]
    fn test_mismatched_brackets_not_diagnosed() {
        assert_eq!(texts(")x"), vec![")x"]);
    }
}
