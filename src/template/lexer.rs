//! Line splitting and indentation measurement.

/// A source line with its indentation measured and stripped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Line<'a> {
    /// 1-based line number in the source file.
    pub number: usize,
    /// Number of indentation characters.
    pub indent: usize,
    /// Line content without indentation and trailing whitespace.
    pub text: &'a str,
}

impl Line<'_> {
    pub fn is_blank(&self) -> bool {
        self.text.is_empty()
    }
}

/// Indentation error: line number and message.
pub(super) type LexError = (usize, String);

/// Split source into lines, rejecting mixed tab/space indentation.
///
/// The first indented line fixes the indentation character for the file.
pub(super) fn split_lines(source: &str) -> Result<Vec<Line<'_>>, LexError> {
    let mut indent_char: Option<char> = None;
    let mut lines = Vec::new();

    for (index, raw) in source.lines().enumerate() {
        let number = index + 1;
        let raw = raw.trim_end();
        let text = raw.trim_start_matches([' ', '\t']);
        let indentation = &raw[..raw.len() - text.len()];

        if !text.is_empty() && !indentation.is_empty() {
            let mut chars = indentation.chars();
            let first = chars.next().unwrap_or(' ');
            if chars.any(|c| c != first) {
                return Err((number, "mixed tabs and spaces in indentation".into()));
            }
            match indent_char {
                None => indent_char = Some(first),
                Some(expected) if expected != first => {
                    return Err((
                        number,
                        format!(
                            "indented with {} but the file is indented with {}",
                            indent_name(first),
                            indent_name(expected)
                        ),
                    ));
                }
                Some(_) => {}
            }
        }

        lines.push(Line {
            number,
            indent: if text.is_empty() { 0 } else { indentation.len() },
            text,
        });
    }

    Ok(lines)
}

fn indent_name(c: char) -> &'static str {
    if c == '\t' { "tabs" } else { "spaces" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_measures_indent() {
        let lines = split_lines("html\n  body\n    p Hi\n").unwrap();
        let indents: Vec<_> = lines.iter().map(|l| l.indent).collect();
        assert_eq!(indents, [0, 2, 4]);
        assert_eq!(lines[2].text, "p Hi");
        assert_eq!(lines[2].number, 3);
    }

    #[test]
    fn test_blank_lines_kept() {
        let lines = split_lines("p.\n  one\n\n  two").unwrap();
        assert_eq!(lines.len(), 4);
        assert!(lines[2].is_blank());
        assert_eq!(lines[2].indent, 0);
    }

    #[test]
    fn test_tabs_accepted() {
        let lines = split_lines("ul\n\tli a\n\t\tspan b").unwrap();
        assert_eq!(lines[2].indent, 2);
    }

    #[test]
    fn test_mixed_on_one_line_rejected() {
        let err = split_lines("ul\n \tli").unwrap_err();
        assert_eq!(err.0, 2);
        assert!(err.1.contains("mixed"));
    }

    #[test]
    fn test_mixed_across_lines_rejected() {
        let err = split_lines("ul\n  li\n\tli").unwrap_err();
        assert_eq!(err.0, 3);
        assert!(err.1.contains("tabs"));
    }
}
