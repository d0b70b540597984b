//! Ignore rules: built-in patterns, the root `.gitignore` and `scan.exclude`.

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::path::Path;
use tracing::warn;

/// Paths never worth analyzing: dependency trees, build output, caches,
/// minified bundles and mobile platform shells.
pub const DEFAULT_IGNORE_PATTERNS: &[&str] = &[
    "node_modules/",
    "bower_components/",
    "vendor/",
    "venv/",
    ".venv/",
    "env/",
    "__pycache__/",
    ".tox/",
    "target/",
    "packages/",
    ".gradle/",
    ".git/",
    "dist/",
    "build/",
    "out/",
    "*.min.js",
    "android/",
    "ios/",
    ".next/",
    "nextjs/",
    "coverage/",
    "tmp/",
    "temp/",
    ".expo/",
];

/// Built-in ignore list, extra patterns and the root `.gitignore`, matched
/// against paths relative to the scanned root.
#[derive(Clone)]
pub struct IgnoreRules {
    gitignore: Gitignore,
}

impl IgnoreRules {
    pub fn new<P: AsRef<Path>>(root: P, extra: &[String]) -> Self {
        let root = root.as_ref();
        let mut builder = GitignoreBuilder::new(root);

        for pattern in DEFAULT_IGNORE_PATTERNS
            .iter()
            .copied()
            .chain(extra.iter().map(String::as_str))
        {
            if let Err(e) = builder.add_line(None, pattern) {
                warn!("Skipping invalid ignore pattern '{}': {}", pattern, e);
            }
        }

        let gitignore_path = root.join(".gitignore");
        if gitignore_path.exists()
            && let Some(e) = builder.add(&gitignore_path)
        {
            warn!("Partially read {}: {}", gitignore_path.display(), e);
        }

        let gitignore = builder.build().unwrap_or_else(|e| {
            warn!("Failed to build ignore rules, ignoring nothing: {}", e);
            Gitignore::empty()
        });

        Self { gitignore }
    }

    /// Whether `relative` (or any of its parent directories) is ignored
    pub fn is_ignored<P: AsRef<Path>>(&self, relative: P, is_dir: bool) -> bool {
        let relative = relative.as_ref();
        if relative.as_os_str().is_empty() || relative.has_root() {
            return false;
        }
        self.gitignore
            .matched_path_or_any_parents(relative, is_dir)
            .is_ignore()
    }
}
