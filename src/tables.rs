// ABOUTME: Startup tables for shorthands and in-place operators, loaded from bundled JSON

use serde::Deserialize;
use std::collections::HashMap;

/// One entry of the in-place operator table: `(name x …)` rewrites to
/// `(let x (op x …))`, or `(let x (op … x))` when `rev` is set.
#[derive(Debug, Clone, Deserialize)]
pub struct InPlaceOp {
    pub op: String,
    #[serde(default)]
    pub rev: bool,
}

/// The data-driven tables consumed by the canonicalizer.
#[derive(Debug, Clone)]
pub struct Tables {
    shorthands: HashMap<String, String>,
    in_place: Vec<(String, InPlaceOp)>,
}

impl Tables {
    /// Load the tables bundled with the preprocessor.
    pub fn bundled() -> Self {
        Self::from_json(
            include_str!("../data/shorthands.json"),
            include_str!("../data/prefix_equals.json"),
        )
    }

    /// Parse tables from JSON documents. Panics on malformed data: the
    /// bundled files are part of the build, not user input.
    pub fn from_json(shorthands: &str, prefix_equals: &str) -> Self {
        let shorthands: HashMap<String, String> =
            serde_json::from_str(shorthands).expect("shorthand table is malformed");
        let in_place: HashMap<String, InPlaceOp> =
            serde_json::from_str(prefix_equals).expect("in-place operator table is malformed");

        let mut in_place: Vec<(String, InPlaceOp)> = in_place.into_iter().collect();
        in_place.sort_by(|a, b| a.0.cmp(&b.0));

        Tables {
            shorthands,
            in_place,
        }
    }

    pub fn shorthand(&self, token: &str) -> Option<&str> {
        self.shorthands.get(token).map(String::as_str)
    }

    pub fn in_place(&self) -> &[(String, InPlaceOp)] {
        &self.in_place
    }
}
