use std::fmt;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// A rendered type reference, e.g. `long`, `List<String>`, `int[]`.
///
/// Vega treats types as opaque text: resolving a source language's type
/// grammar is a program-model concern. The helpers below perform only the
/// shallow textual inspection needed by migration-type precondition checks.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeRef(SmolStr);

const PRIMITIVES: &[&str] = &[
    "boolean", "byte", "char", "double", "float", "int", "long", "short",
];

impl TypeRef {
    pub fn new(text: impl AsRef<str>) -> Self {
        Self(SmolStr::new(text.as_ref().trim()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_void(&self) -> bool {
        self.0 == "void"
    }

    pub fn is_null(&self) -> bool {
        self.0 == "null"
    }

    pub fn is_primitive(&self) -> bool {
        PRIMITIVES.contains(&self.0.as_str())
    }

    /// Vararg types render with a trailing ellipsis, e.g. `String...`.
    pub fn is_variadic(&self) -> bool {
        self.0.ends_with("...")
    }

    /// Multi-catch / disjunction types join alternatives with `|` at the top
    /// level, e.g. `IOException | SQLException`.
    pub fn is_disjunction(&self) -> bool {
        let mut depth = 0usize;
        for c in self.0.chars() {
            match c {
                '<' => depth += 1,
                '>' => depth = depth.saturating_sub(1),
                '|' if depth == 0 => return true,
                _ => {}
            }
        }
        false
    }

    pub fn has_wildcard(&self) -> bool {
        self.0.contains('?')
    }

    /// Top-level type arguments of a generic type, e.g. `Map<K, List<V>>`
    /// yields `["K", "List<V>"]`. Empty for non-generic types.
    pub fn type_arguments(&self) -> Vec<TypeRef> {
        let text = self.0.as_str();
        let Some(open) = text.find('<') else {
            return Vec::new();
        };
        let Some(close) = text.rfind('>') else {
            return Vec::new();
        };
        if close <= open {
            return Vec::new();
        }

        let mut args = Vec::new();
        let mut depth = 0usize;
        let mut start = open + 1;
        for (i, c) in text[open + 1..close].char_indices() {
            let pos = open + 1 + i;
            match c {
                '<' => depth += 1,
                '>' => depth = depth.saturating_sub(1),
                ',' if depth == 0 => {
                    args.push(TypeRef::new(&text[start..pos]));
                    start = pos + 1;
                }
                _ => {}
            }
        }
        args.push(TypeRef::new(&text[start..close]));
        args
    }

    /// The bound of a wildcard argument: `? extends Number` yields `Number`.
    /// `None` for unbounded wildcards and non-wildcard types.
    pub fn wildcard_bound(&self) -> Option<TypeRef> {
        let text = self.0.as_str();
        let rest = text.strip_prefix('?')?.trim_start();
        let bound = rest
            .strip_prefix("extends")
            .or_else(|| rest.strip_prefix("super"))?;
        let bound = bound.trim();
        if bound.is_empty() {
            None
        } else {
            Some(TypeRef::new(bound))
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeRef {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}
