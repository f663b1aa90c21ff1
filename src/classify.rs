//! Decides whether a source file holds a React class component.

use std::sync::LazyLock;

use regex::Regex;

static REACT_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?mx)
        ^\s*import\s+(?:React\b|[^;]*?\bfrom\s+['"]react['"])
        | \brequire\(\s*['"]react['"]\s*\)
        "#,
    )
    .expect("valid React import pattern")
});

static COMPONENT_CLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        \bclass\s+\w*\s*extends\s+(?:React\.)?(?:Pure)?Component\b
        ",
    )
    .expect("valid component class pattern")
});

/// Result of classifying one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    /// `true` when the file should become a `.tsx` component.
    pub is_component: bool,
}

/// Classifies file text by pattern matching. Deterministic and stateless.
#[must_use]
pub fn classify(text: &str) -> Classification {
    Classification {
        is_component: REACT_IMPORT.is_match(text) || COMPONENT_CLASS.is_match(text),
    }
}

#[cfg(test)]
mod tests {
    use super::classify;

    fn is_component(text: &str) -> bool {
        classify(text).is_component
    }

    #[test]
    fn default_react_import_is_a_component() {
        assert!(is_component("import React from 'react';\n"));
    }

    #[test]
    fn named_react_import_is_a_component() {
        assert!(is_component("import { useState } from \"react\";\n"));
    }

    #[test]
    fn commonjs_require_is_a_component() {
        assert!(is_component("const React = require('react');"));
    }

    #[test]
    fn extends_react_component() {
        assert!(is_component("export class B extends React.Component {\n}"));
    }

    #[test]
    fn extends_bare_pure_component() {
        assert!(is_component("class List extends PureComponent {}"));
    }

    #[test]
    fn plain_module_is_a_script() {
        let text = "const add = (a, b) => a + b;\nmodule.exports = { add };\n";
        assert!(!is_component(text));
    }

    #[test]
    fn similar_package_names_do_not_match() {
        assert!(!is_component("import { render } from 'react-dom';"));
        assert!(!is_component("class Store extends EventEmitter {}"));
    }
}
