//! Language Detection
//!
//! Maps file extensions onto the tree-sitter grammars compiled into the binary.
//! Files whose extension has no grammar get no footprint and are read by the
//! model directly.

use std::fmt;
use std::path::Path;

// =============================================================================
// Language Metadata Table
// =============================================================================

struct LanguageMeta {
    display_name: &'static str,
    extensions: &'static [&'static str],
}

macro_rules! lang_meta {
    ($display:literal, [$($ext:literal),*]) => {
        LanguageMeta {
            display_name: $display,
            extensions: &[$($ext),*],
        }
    };
}

/// Languages with a bundled grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Rust,
    Go,
    C,
    Cpp,
    Java,
    Kotlin,
    TypeScript,
    Tsx,
    JavaScript,
    Jsx,
    Python,
    Ruby,
    Bash,
}

impl Language {
    pub const ALL: [Language; 13] = [
        Language::Rust,
        Language::Go,
        Language::C,
        Language::Cpp,
        Language::Java,
        Language::Kotlin,
        Language::TypeScript,
        Language::Tsx,
        Language::JavaScript,
        Language::Jsx,
        Language::Python,
        Language::Ruby,
        Language::Bash,
    ];

    fn meta(&self) -> LanguageMeta {
        match self {
            Language::Rust => lang_meta!("Rust", ["rs"]),
            Language::Go => lang_meta!("Go", ["go"]),
            Language::C => lang_meta!("C", ["c", "h"]),
            Language::Cpp => lang_meta!("C++", ["cpp", "cc", "cxx", "hpp", "hh", "hxx"]),
            Language::Java => lang_meta!("Java", ["java"]),
            Language::Kotlin => lang_meta!("Kotlin", ["kt", "kts"]),
            Language::TypeScript => lang_meta!("TypeScript", ["ts", "mts", "cts"]),
            Language::Tsx => lang_meta!("TSX", ["tsx"]),
            Language::JavaScript => lang_meta!("JavaScript", ["js", "mjs", "cjs"]),
            Language::Jsx => lang_meta!("JSX", ["jsx"]),
            Language::Python => lang_meta!("Python", ["py", "pyi"]),
            Language::Ruby => lang_meta!("Ruby", ["rb", "rake"]),
            Language::Bash => lang_meta!("Bash", ["sh", "bash", "zsh"]),
        }
    }

    pub fn display_name(&self) -> &'static str {
        self.meta().display_name
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|lang| lang.meta().extensions.contains(&ext.as_str()))
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Grammar for this language. JavaScript goes through the TSX grammar so
    /// JSX inside `.js` files parses.
    pub fn grammar(&self) -> tree_sitter::Language {
        match self {
            Language::Rust => tree_sitter_rust::LANGUAGE.into(),
            Language::Go => tree_sitter_go::LANGUAGE.into(),
            Language::C => tree_sitter_c::LANGUAGE.into(),
            Language::Cpp => tree_sitter_cpp::LANGUAGE.into(),
            Language::Java => tree_sitter_java::LANGUAGE.into(),
            Language::Kotlin => tree_sitter_kotlin_sg::LANGUAGE.into(),
            Language::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Language::Tsx | Language::JavaScript | Language::Jsx => {
                tree_sitter_typescript::LANGUAGE_TSX.into()
            }
            Language::Python => tree_sitter_python::LANGUAGE.into(),
            Language::Ruby => tree_sitter_ruby::LANGUAGE.into(),
            Language::Bash => tree_sitter_bash::LANGUAGE.into(),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
