// ABOUTME: Recursive canonicalizer and include resolver; the hub of the pipeline
//
// {...}  -> (expression ...)
// [...]  -> (vector ...)
// l[...] -> (list ...)
// #[...] -> (-> (...))
// a:b:c  -> (range a b c)

use crate::diagnostics::Span;
use crate::error::PreprocessError;
use crate::macros::{self, Expander, MacroTable};
use crate::numbers::{self, Numeric};
use crate::tables::Tables;
use crate::tokenizer::tokenize;
use log::debug;
use std::collections::HashSet;
use std::mem;
use std::path::{Path, PathBuf};

/// Single-threaded preprocessing state: the context stack of files being
/// processed, the set of standard-library paths already imported, and the
/// traceback of byte ranges mirroring canonicalizer recursion.
pub struct Preprocessor {
    tables: Tables,
    macros: MacroTable,
    std_root: PathBuf,
    contexts: Vec<Option<PathBuf>>,
    included: HashSet<PathBuf>,
    traceback: Vec<Span>,
    source: String,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}

impl Preprocessor {
    pub fn new() -> Self {
        Self::with_std_root(default_std_root())
    }

    /// Build a preprocessor resolving `use!` against an explicit root.
    pub fn with_std_root(std_root: PathBuf) -> Self {
        let tables = Tables::bundled();
        let macros = MacroTable::standard(&tables);
        Preprocessor {
            tables,
            macros,
            std_root,
            contexts: vec![None],
            included: HashSet::new(),
            traceback: Vec::new(),
            source: String::new(),
        }
    }

    /// Record the file the top-level source came from, so that
    /// file-relative `include!` calls can resolve.
    pub fn set_origin(&mut self, origin: PathBuf) {
        if let Some(top) = self.contexts.last_mut() {
            *top = Some(origin);
        }
    }

    /// The source buffer diagnostics should be rendered against. After a
    /// failed import this is the buffer of the file that failed.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Byte ranges of the sub-expressions currently being expanded.
    pub fn traceback(&self) -> &[Span] {
        &self.traceback
    }

    /// Canonicalize a whole program: wrap it as `(do …)` and rewrite it
    /// into the evaluator's restricted S-expression dialect.
    pub fn make_canon(&mut self, text: &str) -> Result<String, PreprocessError> {
        self.canon_expr(&format!("(do {})", text))
    }

    /// Canonicalize a single expression without the `(do …)` wrapping.
    pub fn canon_expr(&mut self, expr: &str) -> Result<String, PreprocessError> {
        self.source = expr.to_string();
        let span = Span::new(0, expr.len());
        self.canon(expr, span, true)
    }

    /// The central recursive rewrite. `original` is true while `expr` is a
    /// slice of the current source buffer, so child spans stay exact;
    /// synthetic text produced by macro expansion inherits the span of the
    /// expression it replaced.
    fn canon(&mut self, expr: &str, span: Span, original: bool) -> Result<String, PreprocessError> {
        let trimmed = expr.trim();
        let span = if original {
            let lead = expr.len() - expr.trim_start().len();
            Span::new(span.start + lead, span.start + lead + trimmed.len())
        } else {
            span
        };

        self.traceback.push(span);
        let result = self.canon_trimmed(trimmed, span, original);
        self.traceback.pop();
        result
    }

    fn canon_trimmed(
        &mut self,
        expr: &str,
        span: Span,
        original: bool,
    ) -> Result<String, PreprocessError> {
        if let Some(replacement) = self.tables.shorthand(expr) {
            return Ok(replacement.to_string());
        }

        if expr.len() >= 2 {
            if let Some(inner) = strip_delimiters(expr, "#[", "]") {
                return self.canon(&format!("(-> ({}))", inner), span, false);
            }
            if let Some(inner) = strip_delimiters(expr, "{", "}") {
                return self.canon(&format!("(expression {})", inner), span, false);
            }
            if let Some(inner) = strip_delimiters(expr, "l[", "]") {
                return self.canon(&format!("(list {})", inner), span, false);
            }
            if let Some(inner) = strip_delimiters(expr, "[", "]") {
                return self.canon(&format!("(vector {})", inner), span, false);
            }
            if strip_delimiters(expr, "(", ")").is_some() {
                return self.function_canon(expr, span, original);
            }
        }

        self.leaf_canon(expr, span)
    }

    /// Canonicalize a bracketless leaf: comment strip, range shorthand,
    /// numeric literal, boolean/nil alias, or a symbol passed through
    /// verbatim.
    fn leaf_canon(&mut self, expr: &str, span: Span) -> Result<String, PreprocessError> {
        let is_string = expr.starts_with('"');

        let expr = if is_string {
            expr
        } else {
            expr.split(';').next().unwrap_or(expr).trim_end()
        };

        if !is_string {
            let colons = expr.matches(':').count();
            if (1..=3).contains(&colons) {
                return self.range_canon(expr, span);
            }
        }

        match numbers::recognize_numeric(expr) {
            Some(Numeric::Int(value)) => {
                if !numbers::in_signed_32(value) {
                    return Err(PreprocessError::NumericOutOfRange {
                        literal: expr.to_string(),
                        span: self.current_span(span),
                    });
                }
                return Ok(value.to_string());
            }
            Some(Numeric::Float(value)) => return Ok(format!("{:?}", value)),
            None => {}
        }

        Ok(match expr {
            "True" | "On" => "Yes".to_string(),
            "False" | "Off" => "No".to_string(),
            "Nothing" => "Nil".to_string(),
            other => other.to_string(),
        })
    }

    /// `a:b:c` with missing parts defaulted: `a` to 0, `c` to 1, and `b`
    /// to -1 when the canonicalized `a` is a positive integer, else 0.
    /// The elided-`b` default requires `a` to canonicalize to an integer.
    fn range_canon(&mut self, expr: &str, span: Span) -> Result<String, PreprocessError> {
        let parts: Vec<&str> = expr.split(':').collect();
        fn nonempty<'a>(part: Option<&&'a str>) -> Option<&'a str> {
            part.copied().filter(|p| !p.is_empty())
        }

        let a = nonempty(parts.first()).unwrap_or("0").to_string();
        let c = nonempty(parts.get(2)).unwrap_or("1").to_string();
        let b = match nonempty(parts.get(1)) {
            Some(b) => b.to_string(),
            None => {
                let canon_a = self.canon(&a, span, false)?;
                let start: i128 =
                    canon_a
                        .parse()
                        .map_err(|_| PreprocessError::RangeBoundNotNumeric {
                            literal: a.clone(),
                            span: self.current_span(span),
                        })?;
                if start > 0 {
                    "-1".to_string()
                } else {
                    "0".to_string()
                }
            }
        };

        self.canon(&format!("(range {} {} {})", a, b, c), span, false)
    }

    /// Canonicalize a parenthesized application: children left to right,
    /// macro dispatch on the head, and the `((…)` → `(call …)` rewrite.
    fn function_canon(
        &mut self,
        expr: &str,
        span: Span,
        original: bool,
    ) -> Result<String, PreprocessError> {
        let inner = &expr[1..expr.len() - 1];
        let tokens = tokenize(inner);

        let mut children = Vec::with_capacity(tokens.len());
        let mut spans = Vec::with_capacity(tokens.len());
        for token in &tokens {
            let child_span = if original {
                let start = span.start + 1 + token.offset;
                Span::new(start, start + token.text.len())
            } else {
                span
            };
            children.push(self.canon(&token.text, child_span, original)?);
            spans.push(child_span);
        }

        if children.is_empty() {
            return Ok("()".to_string());
        }

        if let Some(found) = self.macros.find(&children[0]).cloned() {
            let args = &children[1..];
            if !found.arity.contains(args.len()) {
                return Err(PreprocessError::BadMacroArity {
                    name: found.names[0].clone(),
                    expected: found.arity.describe(),
                    actual: args.len(),
                    span: spans[0],
                });
            }

            let arg_span = spans.get(1).copied().unwrap_or(spans[0]);
            let expansion = match &found.expander {
                Expander::Template(template) => macros::fill(template, args),
                Expander::Function(function) => function(args),
                Expander::InPlace { op, rev } => macros::expand_in_place(op, *rev, args),
                Expander::Include => self.expand_include(args, arg_span)?,
                Expander::Use => self.expand_use(args, arg_span)?,
            };

            // Expansions are re-canonicalized in full, then spliced back
            // by stripping the outer parentheses and re-tokenizing.
            let recanon = self.canon(&format!("({})", expansion), span, false)?;
            let stripped = &recanon[1..recanon.len() - 1];
            children = tokenize(stripped).into_iter().map(|t| t.text).collect();
            if children.is_empty() {
                return Ok("()".to_string());
            }
        }

        let joined = children.join(" ");
        if children[0].starts_with('(') {
            Ok(format!("(call {})", joined))
        } else {
            Ok(format!("({})", joined))
        }
    }

    /// Resolve `(include! "name")` against the directory of the file
    /// currently being processed and splice in its canonicalized body.
    fn expand_include(&mut self, args: &[String], span: Span) -> Result<String, PreprocessError> {
        let name = quoted_path(&args[0]).ok_or_else(|| PreprocessError::ImportPathMalformed {
            received: args[0].clone(),
            span,
        })?;

        let parent = match self.contexts.last() {
            Some(Some(path)) => path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
            _ => return Err(PreprocessError::ImportWithoutFile { span }),
        };

        let target = parent.join(name);
        debug!(
            "Resolving include! of '{}' against '{}'.",
            name,
            parent.display()
        );
        self.import_file(&target, span)
    }

    /// Resolve `(use! "name")` against the standard-library root. A path
    /// already imported expands to `do` so the splice is empty.
    fn expand_use(&mut self, args: &[String], span: Span) -> Result<String, PreprocessError> {
        let name = quoted_path(&args[0]).ok_or_else(|| PreprocessError::ImportPathMalformed {
            received: args[0].clone(),
            span,
        })?;

        let target = self.std_root.join(name);
        let absolute = target
            .canonicalize()
            .map_err(|source| PreprocessError::IoFailure {
                path: absolute_path(&target),
                span,
                source,
            })?;

        if self.included.contains(&absolute) {
            debug!("Skipping std import of '{}' (already included).", absolute.display());
            return Ok("do".to_string());
        }
        self.included.insert(absolute.clone());
        debug!("Importing std file '{}'.", absolute.display());
        self.import_file(&absolute, span)
    }

    /// Read, wrap, and canonicalize a file, with the context stack and
    /// diagnostic source buffer switched around the recursion. Returns the
    /// canonicalized `(do …)` body stripped of its outer parentheses. On
    /// error the failing file's buffer is left in place for rendering.
    fn import_file(&mut self, path: &Path, span: Span) -> Result<String, PreprocessError> {
        let text = std::fs::read_to_string(path).map_err(|source| PreprocessError::IoFailure {
            path: absolute_path(path),
            span,
            source,
        })?;

        self.contexts.push(Some(path.to_path_buf()));
        let wrapped = format!("(do {})", text);
        let saved = mem::replace(&mut self.source, wrapped.clone());
        let result = self.canon(&wrapped, Span::new(0, wrapped.len()), true);
        self.contexts.pop();

        match result {
            Ok(canonical) => {
                self.source = saved;
                Ok(canonical[1..canonical.len() - 1].to_string())
            }
            Err(error) => Err(error),
        }
    }

    fn current_span(&self, fallback: Span) -> Span {
        self.traceback.last().copied().unwrap_or(fallback)
    }
}

fn strip_delimiters<'a>(expr: &'a str, open: &str, close: &str) -> Option<&'a str> {
    expr.strip_prefix(open)?.strip_suffix(close)
}

/// Extract the inside of an ASCII double-quoted filename argument.
fn quoted_path(token: &str) -> Option<&str> {
    let inner = token.strip_prefix('"')?.strip_suffix('"')?;
    if inner.is_empty() || inner.contains('"') {
        return None;
    }
    Some(inner)
}

fn absolute_path(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// The bundled `std/` directory, overridable for relocated installs.
pub fn default_std_root() -> PathBuf {
    if let Ok(root) = std::env::var("LISP_PREPROCESS_HOME") {
        return PathBuf::from(root).join("std");
    }
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("std")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canon(input: &str) -> String {
        Preprocessor::new()
            .make_canon(input)
            .expect("canonicalization failed")
    }

    #[test]
    fn test_symbols_pass_through() {
        assert_eq!(canon("foo"), "(do foo)");
        assert_eq!(canon("snake_case!"), "(do snake_case!)");
    }

    #[test]
    fn test_shorthands_replace_leaves() {
        assert_eq!(canon("∧"), "(do &)");
        assert_eq!(canon("(≤ a b)"), "(do (<= a b))");
    }

    #[test]
    fn test_booleans_and_nil_aliases() {
        assert_eq!(canon("True"), "(do Yes)");
        assert_eq!(canon("Off"), "(do No)");
        assert_eq!(canon("Nothing"), "(do Nil)");
    }

    #[test]
    fn test_comment_stripped_from_leaf() {
        let mut p = Preprocessor::new();
        assert_eq!(p.canon_expr("foo; trailing").unwrap(), "foo");
    }

    #[test]
    fn test_string_leaf_keeps_semicolon_and_colon() {
        assert_eq!(canon(r#""a;b""#), r#"(do "a;b")"#);
        assert_eq!(canon(r#""a:b""#), r#"(do "a:b")"#);
    }

    #[test]
    fn test_traceback_unwinds_to_empty() {
        let mut p = Preprocessor::new();
        p.make_canon("(noop (noop (noop 1)))").unwrap();
        assert!(p.traceback().is_empty());
    }

    #[test]
    fn test_empty_group() {
        assert_eq!(canon("()"), "(do ())");
    }

    #[test]
    fn test_range_start_must_be_numeric_when_stop_elided() {
        let mut p = Preprocessor::new();
        let err = p.make_canon("x:").unwrap_err();
        assert!(matches!(
            err,
            PreprocessError::RangeBoundNotNumeric { .. }
        ));
    }

    #[test]
    fn test_quoted_path() {
        assert_eq!(quoted_path("\"seq.lisp\""), Some("seq.lisp"));
        assert_eq!(quoted_path("seq.lisp"), None);
        assert_eq!(quoted_path("\"\""), None);
    }
}
