use std::path::Path;

/// Directory names excluded from discovery and reconciliation by default.
pub const DEFAULT_IGNORE_PATTERNS: &[&str] = &[
    ".git",
    ".jj",
    ".mypy_cache",
    ".pytest_cache",
    ".remora",
    ".tox",
    ".venv",
    "__pycache__",
    "node_modules",
    "target",
    "venv",
];

/// Segment-based filesystem filter. A path is rejected when any of its
/// segments is in the deny-list, or, with `ignore_dotfiles` set, when any
/// segment starts with a dot.
#[derive(Debug, Clone)]
pub struct IgnoreFilter {
    patterns: Vec<String>,
    ignore_dotfiles: bool,
}

impl Default for IgnoreFilter {
    fn default() -> Self {
        Self {
            patterns: DEFAULT_IGNORE_PATTERNS
                .iter()
                .map(|p| p.to_string())
                .collect(),
            ignore_dotfiles: true,
        }
    }
}

impl IgnoreFilter {
    pub fn new(patterns: Vec<String>, ignore_dotfiles: bool) -> Self {
        Self {
            patterns,
            ignore_dotfiles,
        }
    }

    pub fn is_ignored(&self, path: &Path) -> bool {
        for component in path.components() {
            let segment = component.as_os_str().to_string_lossy();
            if self.patterns.iter().any(|p| p == segment.as_ref()) {
                return true;
            }
            if self.ignore_dotfiles
                && segment.starts_with('.')
                && segment != "."
                && segment != ".."
            {
                return true;
            }
        }
        false
    }
}
