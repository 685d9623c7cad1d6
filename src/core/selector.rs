// wellmatrix - core/selector.rs
//
// Folder-name selectors. Each hierarchy level is filtered independently
// with its own case-insensitive regex.
// Core layer: pure logic, no I/O.

use crate::core::model::SelectorSpec;
use regex::{Regex, RegexBuilder};

/// A selector compiled once and reused for every name at one level.
#[derive(Debug, Clone)]
pub struct CompiledSelector {
    regex: Regex,
    strict: bool,
}

impl CompiledSelector {
    /// Compile `spec`. Strict selectors are anchored at the start of the name.
    pub fn compile(spec: &SelectorSpec) -> Result<Self, regex::Error> {
        let pattern = if spec.strict {
            format!("^(?:{})", spec.pattern)
        } else {
            spec.pattern.clone()
        };
        let regex = RegexBuilder::new(&pattern).case_insensitive(true).build()?;
        Ok(Self {
            regex,
            strict: spec.strict,
        })
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// True if `name` is selected.
    pub fn is_match(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }

    /// Selection mask over `names`, same length and order.
    pub fn mask<S: AsRef<str>>(&self, names: &[S]) -> Vec<bool> {
        names.iter().map(|n| self.is_match(n.as_ref())).collect()
    }
}

/// Compile `spec` and evaluate it over `names`.
///
/// An empty `names` slice yields an empty mask.
pub fn match_names<S: AsRef<str>>(
    names: &[S],
    spec: &SelectorSpec,
) -> Result<Vec<bool>, regex::Error> {
    Ok(CompiledSelector::compile(spec)?.mask(names))
}
