use globset::{Glob, GlobSet, GlobSetBuilder};

/// Baseline exclude patterns applied to every repository walk.
///
/// Segment patterns (no `/`) match any path component; patterns with a
/// separator match as a glob against the repo-relative path.
const BASELINE_PATTERNS: &[&str] = &[
    // Dependency directories
    "node_modules",
    "vendor",
    "bower_components",
    ".venv",
    "venv",
    "site-packages",
    // Build outputs
    "target",
    "build",
    "dist",
    "out",
    ".next",
    ".nuxt",
    "__pycache__",
    // VCS / IDE
    ".git",
    ".hg",
    ".svn",
    ".idea",
    ".vscode",
    // Caches and logs
    ".cache",
    ".pytest_cache",
    ".mypy_cache",
    ".gradle",
    "coverage",
    "logs",
    // Lockfiles
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "Cargo.lock",
    "poetry.lock",
    "Gemfile.lock",
    "composer.lock",
    // Fixtures and mocks
    "fixtures",
    "__mocks__",
    "__snapshots__",
    // Binary and media extensions
    "*.png",
    "*.jpg",
    "*.jpeg",
    "*.gif",
    "*.ico",
    "*.svg",
    "*.webp",
    "*.mp3",
    "*.mp4",
    "*.avi",
    "*.mov",
    "*.pdf",
    "*.zip",
    "*.tar",
    "*.gz",
    "*.bz2",
    "*.7z",
    "*.rar",
    "*.exe",
    "*.dll",
    "*.so",
    "*.dylib",
    "*.a",
    "*.o",
    "*.class",
    "*.jar",
    "*.pyc",
    "*.wasm",
    "*.bin",
    "*.dat",
    "*.db",
    "*.sqlite",
    "*.woff",
    "*.woff2",
    "*.ttf",
    "*.eot",
    "*.min.js",
    "*.min.css",
    "*.map",
];

/// Exclude-pattern matcher for repository crawling.
///
/// Two kinds of patterns: segment patterns (no path separator) match when any
/// path component matches them glob-style; path patterns (with a separator)
/// match as a glob against the whole repo-relative path.
#[derive(Debug)]
pub struct ExcludeFilter {
    segment_set: GlobSet,
    path_set: GlobSet,
}

impl ExcludeFilter {
    /// Build the filter from the baseline plus user patterns.
    pub fn new(user_patterns: &[String]) -> anyhow::Result<Self> {
        let mut segments = GlobSetBuilder::new();
        let mut paths = GlobSetBuilder::new();

        for pattern in BASELINE_PATTERNS
            .iter()
            .map(|p| (*p).to_string())
            .chain(user_patterns.iter().cloned())
        {
            let pattern = pattern.trim();
            if pattern.is_empty() {
                continue;
            }
            if pattern.contains('/') {
                paths.add(Glob::new(pattern.trim_start_matches("./"))?);
            } else {
                segments.add(Glob::new(pattern)?);
            }
        }

        Ok(Self {
            segment_set: segments.build()?,
            path_set: paths.build()?,
        })
    }

    /// Filter with the baseline patterns only.
    pub fn baseline() -> Self {
        // The baseline list contains only valid globs.
        Self::new(&[]).unwrap_or_else(|_| Self {
            segment_set: GlobSet::empty(),
            path_set: GlobSet::empty(),
        })
    }

    /// Whether a repo-relative path is excluded from indexing.
    pub fn is_excluded(&self, rel_path: &str) -> bool {
        let rel_path = rel_path.replace('\\', "/");

        if self.path_set.is_match(&rel_path) {
            return true;
        }

        rel_path
            .split('/')
            .any(|segment| self.segment_set.is_match(segment))
    }
}
