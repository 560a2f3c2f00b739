// ABOUTME: Source-highlighted diagnostic rendering with ANSI color support

use crate::error::PreprocessError;

// ANSI color codes (3-bit colors for maximum terminal compatibility)
const COLOR_RESET: &str = "\x1b[0m";
const COLOR_RED: &str = "\x1b[31m";
const COLOR_GREEN: &str = "\x1b[32m";
const COLOR_MAGENTA: &str = "\x1b[35m";

/// A half-open `[start, end)` byte interval over a source buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// A renderable diagnostic: a header line, the offending line with two
/// lines of context either side, an underline with a `┬` at its midpoint,
/// and optional hint and help trailers.
pub struct Diagnostic<'a> {
    pub source: &'a str,
    pub span: Span,
    pub code: &'a str,
    pub description: String,
    pub under_msg: Option<String>,
    pub help: Option<String>,
    pub ansi: bool,
}

impl Diagnostic<'_> {
    pub fn render(&self) -> String {
        let clamped_start = self.span.start.min(self.source.len());
        let err_line_no = self.source[..clamped_start].matches('\n').count();

        let lines: Vec<&str> = self.source.split('\n').collect();
        let context = 2usize;
        let first = err_line_no.saturating_sub(context);
        let last = (err_line_no + context).min(lines.len().saturating_sub(1));

        // Byte length of all lines before the error line, newline-joined.
        let len_to_error = if err_line_no == 0 {
            0
        } else {
            lines[..err_line_no].iter().map(|l| l.len()).sum::<usize>() + err_line_no - 1
        };
        let underline_start = self.span.start.saturating_sub(len_to_error);
        let underline_end = self.span.end.saturating_sub(len_to_error);
        let middle = (underline_start + underline_end) / 2;

        // Right-adjust line numbers so columns stay aligned around
        // powers of ten.
        let right_adjust = (err_line_no + context + 1).to_string().len();

        let mut out = colored(
            &format!("🗙 error[{}]: {}\n", self.code, self.description),
            COLOR_RED,
        );

        for (i, line) in lines.iter().enumerate().take(last + 1).skip(first) {
            out.push_str(&format!("{:>width$} │ {}\n", i + 1, line, width = right_adjust));

            if i == err_line_no {
                let left = format!("{} · ", " ".repeat(right_adjust));
                let underline = underline_for(underline_start, underline_end, middle, line);
                out.push_str(&left);
                out.push_str(&colored(&format!("{}\n", underline), COLOR_GREEN));

                if let Some(msg) = &self.under_msg {
                    let hint = format!("{}╰──── {}", " ".repeat(middle.saturating_sub(1)), msg);
                    out.push_str(&left);
                    out.push_str(&colored(&format!("{}\n", hint), COLOR_GREEN));
                    out.push_str(&left);
                    out.push('\n');
                }
            }
        }

        if let Some(stripped) = out.strip_suffix('\n') {
            out = stripped.to_string();
        }

        if let Some(help) = &self.help {
            out.push_str(&colored("\nhelp:", COLOR_MAGENTA));
            out.push_str(&format!(" {}", help));
        }

        if self.ansi {
            out
        } else {
            strip_ansi(&out)
        }
    }
}

fn colored(text: &str, color: &str) -> String {
    format!("{}{}{}", color, text, COLOR_RESET)
}

/// Build the `───┬───` underline for a single source line. Positions are
/// 1-based relative to the line start.
fn underline_for(start: usize, end: usize, middle: usize, line: &str) -> String {
    let mut out = String::new();
    for i in 0..line.chars().count() {
        if i + 1 == middle {
            out.push('┬');
        } else if i + 1 >= start && i + 1 < end {
            out.push('─');
        } else {
            out.push(' ');
        }
    }
    out
}

/// Remove `\x1b[…m` escape sequences for non-terminal sinks.
pub fn strip_ansi(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\x1b' && chars.peek() == Some(&'[') {
            for escaped in chars.by_ref() {
                if escaped == 'm' {
                    break;
                }
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Render a preprocessing error against the source buffer it occurred in.
pub fn report(error: &PreprocessError, source: &str, ansi: bool) -> String {
    Diagnostic {
        source,
        span: error.span(),
        code: error.code(),
        description: error.to_string(),
        under_msg: error.hint(),
        help: error.help().map(str::to_string),
        ansi,
    }
    .render()
}
