//! Language registrations: filename pattern, tree-sitter grammar and the query that picks out chunks.

use regex::Regex;

/// Grammars compiled into the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Grammar {
    Go,
    Rust,
    Python,
    JavaScript,
    TypeScript,
    Tsx,
}

impl Grammar {
    pub fn as_str(self) -> &'static str {
        match self {
            Grammar::Go => "go",
            Grammar::Rust => "rust",
            Grammar::Python => "python",
            Grammar::JavaScript => "javascript",
            Grammar::TypeScript => "typescript",
            Grammar::Tsx => "tsx",
        }
    }

    /// Tree-sitter language instance for this grammar.
    pub fn tree_sitter_language(self) -> tree_sitter::Language {
        match self {
            Grammar::Go => tree_sitter_go::LANGUAGE.into(),
            Grammar::Rust => tree_sitter_rust::LANGUAGE.into(),
            Grammar::Python => tree_sitter_python::LANGUAGE.into(),
            Grammar::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            Grammar::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Grammar::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
        }
    }
}

/// One row of the language table.
///
/// `grammar: None` or `strided: true` sends matching files to the strided chunker.
#[derive(Debug, Clone)]
pub struct LanguageSpec {
    pub name: &'static str,
    pub pattern: Regex,
    pub grammar: Option<Grammar>,
    pub query: &'static str,
    pub strided: bool,
}

impl LanguageSpec {
    /// # Panics
    /// If `pattern` is not a valid regex. Registrations are static tables.
    pub fn new(
        name: &'static str,
        pattern: &str,
        grammar: Option<Grammar>,
        query: &'static str,
        strided: bool,
    ) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).expect("language pattern must be a valid regex"),
            grammar,
            query,
            strided,
        }
    }

    pub fn matches(&self, filename: &str) -> bool {
        self.pattern.is_match(filename)
    }

    /// Grammar to parse with, or None when this language is windowed by bytes.
    pub fn ast_grammar(&self) -> Option<Grammar> {
        if self.strided { None } else { self.grammar }
    }
}
