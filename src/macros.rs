// ABOUTME: Macro table with arity checking; expansions produce raw source text

use crate::tables::Tables;
use crate::tokenizer::tokenize;

/// An inclusive arity interval. `max: None` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    pub min: usize,
    pub max: Option<usize>,
}

impl Arity {
    pub fn exactly(n: usize) -> Self {
        Arity { min: n, max: Some(n) }
    }

    pub fn at_least(n: usize) -> Self {
        Arity { min: n, max: None }
    }

    pub fn at_most(n: usize) -> Self {
        Arity { min: 0, max: Some(n) }
    }

    pub fn between(min: usize, max: usize) -> Self {
        Arity { min, max: Some(max) }
    }

    pub fn any() -> Self {
        Arity { min: 0, max: None }
    }

    pub fn contains(&self, n: usize) -> bool {
        n >= self.min && self.max.map_or(true, |max| n <= max)
    }

    /// Human-readable form used in arity diagnostics: "2", "2-3",
    /// "at least 1", "at most 3".
    pub fn describe(&self) -> String {
        match (self.min, self.max) {
            (min, Some(max)) if min == max => min.to_string(),
            (0, None) => "any number of".to_string(),
            (min, None) => format!("at least {}", min),
            (0, Some(max)) => format!("at most {}", max),
            (min, Some(max)) => format!("{}-{}", min, max),
        }
    }
}

/// How a macro produces its replacement text.
///
/// `Template` substitutes positional `{N}` placeholders; `Function`
/// computes the text from the canonicalized arguments; `InPlace` carries
/// its operator from the data file; `Include` and `Use` are dispatched
/// through the preprocessor because they touch its state.
#[derive(Debug, Clone)]
pub enum Expander {
    Template(&'static str),
    Function(fn(&[String]) -> String),
    InPlace { op: String, rev: bool },
    Include,
    Use,
}

#[derive(Debug, Clone)]
pub struct Macro {
    pub names: Vec<String>,
    pub arity: Arity,
    pub expander: Expander,
}

impl Macro {
    fn new(names: &[&str], arity: Arity, expander: Expander) -> Self {
        Macro {
            names: names.iter().map(|n| n.to_string()).collect(),
            arity,
            expander,
        }
    }
}

/// The macro table, dispatched in insertion order: the first macro whose
/// name set contains the head token wins.
pub struct MacroTable {
    macros: Vec<Macro>,
}

impl MacroTable {
    /// Build the standard table, with the in-place operators from the
    /// data file appended after the built-in macros.
    pub fn standard(tables: &Tables) -> Self {
        let mut macros = vec![
            Macro::new(&["if!"], Arity::between(2, 3), Expander::Function(expand_if)),
            Macro::new(&["unless!"], Arity::between(2, 3), Expander::Function(expand_unless)),
            Macro::new(&["while!"], Arity::at_least(2), Expander::Function(expand_while)),
            Macro::new(&["loop!"], Arity::at_least(1), Expander::Function(expand_loop)),
            Macro::new(&["for!"], Arity::at_least(2), Expander::Function(expand_for)),
            Macro::new(&["where!"], Arity::at_least(3), Expander::Function(expand_where)),
            Macro::new(&["switch"], Arity::at_least(1), Expander::Function(expand_switch)),
            Macro::new(&["=>", "def!"], Arity::between(2, 3), Expander::Function(expand_def)),
            Macro::new(&["λ", "lambda!", "->"], Arity::between(1, 2), Expander::Function(expand_lambda)),
            Macro::new(&["include!"], Arity::exactly(1), Expander::Include),
            Macro::new(&["use!"], Arity::exactly(1), Expander::Use),
            Macro::new(&["putl!"], Arity::any(), Expander::Function(expand_putl)),
            Macro::new(&["head!"], Arity::exactly(1), Expander::Template("@ 0 {0}")),
            Macro::new(&["tail!"], Arity::exactly(1), Expander::Template("@ -1 {0}")),
            Macro::new(&["&&"], Arity::any(), Expander::Function(expand_and)),
            Macro::new(&["||"], Arity::any(), Expander::Function(expand_or)),
            Macro::new(&["pipe!"], Arity::at_least(2), Expander::Function(expand_pipe)),
            Macro::new(&["push!"], Arity::exactly(2), Expander::Template("insert {0} -1 {1}")),
            Macro::new(&["pop!"], Arity::exactly(1), Expander::Template("slice {0} 0 -2")),
            Macro::new(&["rev!"], Arity::exactly(1), Expander::Template("slice {0} -1 0 -1")),
            Macro::new(&["++"], Arity::exactly(1), Expander::Template("let {0} (+ {0} 1)")),
            Macro::new(&["--"], Arity::exactly(1), Expander::Template("let {0} (- {0} 1)")),
        ];

        for (name, entry) in tables.in_place() {
            macros.push(Macro::new(
                &[name.as_str()],
                Arity::at_least(1),
                Expander::InPlace {
                    op: entry.op.clone(),
                    rev: entry.rev,
                },
            ));
        }

        MacroTable { macros }
    }

    pub fn find(&self, head: &str) -> Option<&Macro> {
        self.macros
            .iter()
            .find(|m| m.names.iter().any(|name| name == head))
    }
}

/// Substitute positional `{N}` placeholders; any other braced text (for
/// example the default argument list `{_}`) passes through untouched.
pub fn fill(template: &str, args: &[String]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) if close > 0 && after[..close].bytes().all(|b| b.is_ascii_digit()) => {
                let index: usize = after[..close].parse().unwrap_or(usize::MAX);
                match args.get(index) {
                    Some(arg) => out.push_str(arg),
                    None => {
                        out.push('{');
                        out.push_str(&after[..=close]);
                    }
                }
                rest = &after[close + 1..];
            }
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Expansion for a data-driven in-place operator.
pub fn expand_in_place(op: &str, rev: bool, args: &[String]) -> String {
    let target = &args[0];
    let rest = args[1..].join(" ");
    if rest.is_empty() {
        format!("let {} ({} {})", target, op, target)
    } else if rev {
        format!("let {} ({} {} {})", target, op, rest, target)
    } else {
        format!("let {} ({} {} {})", target, op, target, rest)
    }
}

fn expand_if(args: &[String]) -> String {
    let otherwise = args.get(2).map(String::as_str).unwrap_or("Nil");
    format!(
        "eval_expr (? {} (expression {}) (expression {}))",
        args[0], args[1], otherwise
    )
}

fn expand_unless(args: &[String]) -> String {
    let otherwise = args.get(2).map(String::as_str).unwrap_or("Nil");
    format!("if! {} {} {}", args[0], otherwise, args[1])
}

fn expand_while(args: &[String]) -> String {
    format!(
        "while (expression {}) (expression (do {}))",
        args[0],
        args[1..].join(" ")
    )
}

fn expand_loop(args: &[String]) -> String {
    format!("while! Yes {}", args.join(" "))
}

/// Split a canonicalized `(vector V I? L?)` head into its parts; a bare
/// head is treated as the vector itself.
fn vector_parts(head: &str) -> Vec<String> {
    if let Some(inner) = head.strip_prefix('(').and_then(|h| h.strip_suffix(')')) {
        let tokens = tokenize(inner);
        if tokens.first().map(|t| t.text.as_str()) == Some("vector") {
            return tokens[1..].iter().map(|t| t.text.clone()).collect();
        }
    }
    vec![head.to_string()]
}

fn expand_for(args: &[String]) -> String {
    let head = vector_parts(&args[0]);
    let vector = head.first().cloned().unwrap_or_else(|| args[0].clone());
    let index = head.get(1).cloned().unwrap_or_else(|| "__index__".to_string());
    let length = head.get(2).cloned().unwrap_or_else(|| "__length__".to_string());

    format!(
        "do (let {index} 0) (let {length} (len {vector})) \
         (while! (< {index} {length}) (let item (@ {index} {vector})) {body} (++ {index}))",
        index = index,
        length = length,
        vector = vector,
        body = args[1..].join(" ")
    )
}

fn expand_where(args: &[String]) -> String {
    format!(
        "for! {} (if! {} (do {}))",
        args[0],
        args[1],
        args[2..].join(" ")
    )
}

fn expand_switch(args: &[String]) -> String {
    let name = &args[0];
    let mut fallback = "Nil".to_string();
    let mut cases: Vec<(String, String)> = Vec::new();

    for clause in &args[1..] {
        let inner = clause
            .strip_prefix('(')
            .and_then(|c| c.strip_suffix(')'))
            .map(tokenize)
            .unwrap_or_default();
        match inner.first().map(|t| t.text.as_str()) {
            Some("case") if inner.len() >= 3 => {
                let key = inner[1].text.clone();
                let value = inner[2..]
                    .iter()
                    .map(|t| t.text.as_str())
                    .collect::<Vec<_>>()
                    .join(" ");
                cases.push((key, value));
            }
            Some("otherwise") if inner.len() >= 2 => {
                fallback = inner[1..]
                    .iter()
                    .map(|t| t.text.as_str())
                    .collect::<Vec<_>>()
                    .join(" ");
            }
            _ => fallback = clause.clone(),
        }
    }

    if cases.is_empty() {
        return format!("do {}", fallback);
    }

    let mut text = fallback;
    for (key, value) in cases.iter().rev() {
        text = format!("(if! (== {} {}) {} {})", key, name, value, text);
    }
    text[1..text.len() - 1].to_string()
}

fn expand_def(args: &[String]) -> String {
    if args.len() == 2 {
        format!("let {} (closure (expression {{_}} {}))", args[0], args[1])
    } else {
        format!(
            "let {} (closure (expression {} {}))",
            args[0], args[1], args[2]
        )
    }
}

fn expand_lambda(args: &[String]) -> String {
    if args.len() == 1 {
        format!("closure (expression {{_}} {})", args[0])
    } else {
        format!("closure (expression {} {})", args[0], args[1])
    }
}

fn expand_putl(args: &[String]) -> String {
    let mut parts: Vec<String> = args.to_vec();
    parts.push("\"\\n\"".to_string());
    format!("put {}", parts.join(" "))
}

fn expand_and(args: &[String]) -> String {
    format!("bool (&{})", coerced(args))
}

fn expand_or(args: &[String]) -> String {
    format!("bool (|{})", coerced(args))
}

fn coerced(args: &[String]) -> String {
    args.iter().map(|a| format!(" (bool {})", a)).collect()
}

fn expand_pipe(args: &[String]) -> String {
    let mut text = args[0].clone();
    for function in &args[1..] {
        text = format!("({} {})", function, text);
    }
    text[1..text.len() - 1].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_arity_contains() {
        assert!(Arity::exactly(2).contains(2));
        assert!(!Arity::exactly(2).contains(3));
        assert!(Arity::at_least(1).contains(100));
        assert!(!Arity::at_least(1).contains(0));
        assert!(Arity::any().contains(0));
    }

    #[test]
    fn test_arity_describe() {
        assert_eq!(Arity::exactly(1).describe(), "1");
        assert_eq!(Arity::between(2, 3).describe(), "2-3");
        assert_eq!(Arity::at_least(2).describe(), "at least 2");
        assert_eq!(Arity::at_most(3).describe(), "at most 3");
    }

    #[test]
    fn test_fill_substitutes_positional_placeholders() {
        assert_eq!(fill("let {0} (+ {0} 1)", &args(&["x"])), "let x (+ x 1)");
        assert_eq!(fill("insert {0} -1 {1}", &args(&["xs", "v"])), "insert xs -1 v");
    }

    #[test]
    fn test_fill_leaves_non_positional_braces() {
        assert_eq!(
            fill("closure (expression {_} {0})", &args(&["b"])),
            "closure (expression {_} b)"
        );
        assert_eq!(fill("{} {x}", &args(&["a"])), "{} {x}");
    }

    #[test]
    fn test_find_respects_aliases() {
        let table = MacroTable::standard(&Tables::bundled());
        assert!(table.find("if!").is_some());
        assert_eq!(table.find("def!").unwrap().names[0], "=>");
        assert_eq!(table.find("λ").unwrap().names[0], "λ");
        assert_eq!(table.find("lambda!").unwrap().names[0], "λ");
        assert!(table.find("+=").is_some());
        assert!(table.find("nope").is_none());
    }

    #[test]
    fn test_expand_if_defaults_else_to_nil() {
        assert_eq!(
            expand_if(&args(&["C", "1"])),
            "eval_expr (? C (expression 1) (expression Nil))"
        );
        assert_eq!(
            expand_if(&args(&["C", "1", "2"])),
            "eval_expr (? C (expression 1) (expression 2))"
        );
    }

    #[test]
    fn test_expand_unless_swaps_branches() {
        assert_eq!(expand_unless(&args(&["C", "1", "2"])), "if! C 2 1");
        assert_eq!(expand_unless(&args(&["C", "1"])), "if! C Nil 1");
    }

    #[test]
    fn test_expand_while_wraps_body_in_do() {
        assert_eq!(
            expand_while(&args(&["C", "a", "b"])),
            "while (expression C) (expression (do a b))"
        );
    }

    #[test]
    fn test_expand_for_defaults_index_and_length() {
        let text = expand_for(&args(&["(vector xs)", "(put item)"]));
        assert!(text.contains("(let __index__ 0)"));
        assert!(text.contains("(let __length__ (len xs))"));
        assert!(text.contains("(let item (@ __index__ xs))"));
        assert!(text.contains("(++ __index__)"));
    }

    #[test]
    fn test_expand_for_explicit_index() {
        let text = expand_for(&args(&["(vector xs i)", "(put i)"]));
        assert!(text.contains("(let i 0)"));
        assert!(text.contains("(@ i xs)"));
    }

    #[test]
    fn test_expand_switch_builds_nested_conditionals() {
        let text = expand_switch(&args(&[
            "n",
            "(case 1 \"a\")",
            "(case 2 \"b\")",
            "(otherwise \"z\")",
        ]));
        assert_eq!(text, "if! (== 1 n) \"a\" (if! (== 2 n) \"b\" \"z\")");
    }

    #[test]
    fn test_expand_switch_defaults_to_nil() {
        assert_eq!(
            expand_switch(&args(&["n", "(case 1 x)"])),
            "if! (== 1 n) x Nil"
        );
        assert_eq!(expand_switch(&args(&["n"])), "do Nil");
    }

    #[test]
    fn test_expand_def_defaults_argument_list() {
        assert_eq!(
            expand_def(&args(&["inc", "(+ _ 1)"])),
            "let inc (closure (expression {_} (+ _ 1)))"
        );
        assert_eq!(
            expand_def(&args(&["add", "(expression a b)", "(+ a b)"])),
            "let add (closure (expression (expression a b) (+ a b)))"
        );
    }

    #[test]
    fn test_expand_pipe_right_folds() {
        assert_eq!(expand_pipe(&args(&["a", "f", "g"])), "g (f a)");
        assert_eq!(expand_pipe(&args(&["a", "f"])), "f a");
    }

    #[test]
    fn test_expand_bool_folds() {
        assert_eq!(expand_and(&args(&["a", "b"])), "bool (& (bool a) (bool b))");
        assert_eq!(expand_or(&args(&[])), "bool (|)");
    }

    #[test]
    fn test_expand_putl_appends_newline() {
        assert_eq!(expand_putl(&args(&["a", "b"])), "put a b \"\\n\"");
        assert_eq!(expand_putl(&args(&[])), "put \"\\n\"");
    }

    #[test]
    fn test_expand_in_place() {
        assert_eq!(expand_in_place("+", false, &args(&["x", "2"])), "let x (+ x 2)");
        assert_eq!(expand_in_place("map", true, &args(&["xs", "f"])), "let xs (map f xs)");
        assert_eq!(expand_in_place("+", false, &args(&["x"])), "let x (+ x)");
    }
}
