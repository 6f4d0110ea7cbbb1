// src/watch/expand.rs

//! Turning user patterns into the concrete paths that get watched.
//!
//! Patterns are resolved against a root (the working directory):
//! - `.` is the root itself;
//! - a pattern containing `*`, `?`, `[` or `{` is a glob, matched with
//!   `globset` against a walk of its literal prefix directory;
//! - anything else is a literal path, kept even if it doesn't exist (so
//!   that registration reports it).
//!
//! Matched directories are expanded to all their subdirectories, since one
//! inotify watch only covers a directory's direct entries.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobMatcher};
use tracing::{debug, warn};

use crate::fs::FileSystem;

use super::filter::ExclusionFilter;

/// Names excluded relative to the root unless disabled.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    ".git",
    "node_modules",
    ".idea",
    ".cache",
    ".vscode",
    ".DS_Store",
    ".gitignore",
    ".gitmodules",
    ".gitattributes",
    ".travis.yml",
    "vendor",
    "target",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpandOptions {
    /// Add the root directory even if no pattern names it.
    pub watch_cwd: bool,
    /// Descend into matched directories.
    pub recursive: bool,
}

impl Default for ExpandOptions {
    fn default() -> Self {
        Self {
            watch_cwd: false,
            recursive: true,
        }
    }
}

/// Expands patterns against `root` using a [`FileSystem`].
#[derive(Debug)]
pub struct Expander<'a> {
    fs: &'a dyn FileSystem,
    root: PathBuf,
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '[', '{'])
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

impl<'a> Expander<'a> {
    pub fn new(fs: &'a dyn FileSystem, root: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            root: root.into(),
        }
    }

    /// Absolute, lexically normalised form of `pattern`.
    fn absolutize(&self, pattern: &str) -> PathBuf {
        let joined = if pattern == "." {
            self.root.clone()
        } else {
            self.root.join(pattern)
        };
        joined
            .components()
            .filter(|c| !matches!(c, Component::CurDir))
            .collect()
    }

    /// Expand exclusion patterns to the exact paths the filter compares against.
    ///
    /// No recursion: excluding a directory stops expansion from descending
    /// into it, so its contents never get a watch of their own.
    pub fn expand_excludes(&self, patterns: &[String], with_defaults: bool) -> Result<Vec<String>> {
        let defaults = DEFAULT_EXCLUDES.iter().map(|s| s.to_string());
        let all: Vec<String> = if with_defaults {
            patterns.iter().cloned().chain(defaults).collect()
        } else {
            patterns.to_vec()
        };

        let mut out = Vec::new();
        for pattern in &all {
            if is_glob(pattern) {
                out.extend(self.glob(pattern)?.iter().map(|p| path_string(p)));
            } else {
                out.push(path_string(&self.absolutize(pattern)));
            }
        }
        Ok(dedup(out))
    }

    /// Expand watch patterns into the ordered list of paths to register.
    ///
    /// Directories in `exclude` are never descended into.
    pub fn expand_patterns(
        &self,
        patterns: &[String],
        options: ExpandOptions,
        exclude: &ExclusionFilter,
    ) -> Result<Vec<String>> {
        let mut out = Vec::new();

        for pattern in patterns {
            let matches = if is_glob(pattern) {
                let found = self.glob(pattern)?;
                if found.is_empty() {
                    warn!(pattern = %pattern, "pattern matched nothing");
                }
                found
            } else {
                vec![self.absolutize(pattern)]
            };

            for path in matches {
                self.push_with_children(&path, options.recursive, exclude, &mut out)?;
            }
        }

        if options.watch_cwd {
            let root = self.absolutize(".");
            self.push_with_children(&root, options.recursive, exclude, &mut out)?;
        }

        let out = dedup(out);
        debug!(count = out.len(), "expanded watch patterns");
        Ok(out)
    }

    fn push_with_children(
        &self,
        path: &Path,
        recursive: bool,
        exclude: &ExclusionFilter,
        out: &mut Vec<String>,
    ) -> Result<()> {
        let as_str = path_string(path);
        // Excluded patterns are still listed; registration skips them.
        let excluded = exclude.is_excluded(&as_str);
        out.push(as_str);

        if recursive && !excluded && self.fs.is_dir(path) {
            out.extend(self.subdirectories(path, exclude)?);
        }
        Ok(())
    }

    /// All directories below `dir`, depth first, skipping excluded ones.
    fn subdirectories(&self, dir: &Path, exclude: &ExclusionFilter) -> Result<Vec<String>> {
        let mut found = Vec::new();
        let mut stack = vec![dir.to_path_buf()];

        while let Some(current) = stack.pop() {
            let entries = self
                .fs
                .read_dir(&current)
                .with_context(|| format!("expanding directory {:?}", current))?;

            // Reverse so the stack pops entries in directory order.
            for entry in entries.into_iter().rev() {
                if !self.fs.is_dir(&entry) {
                    continue;
                }
                let entry_str = path_string(&entry);
                if exclude.is_excluded(&entry_str) {
                    debug!(path = %entry_str, "[skipping] excluded directory");
                    continue;
                }
                stack.push(entry);
            }

            if current != dir {
                found.push(path_string(&current));
            }
        }

        Ok(found)
    }

    /// Existing paths matching a glob pattern, in walk order.
    fn glob(&self, pattern: &str) -> Result<Vec<PathBuf>> {
        let absolute = self.absolutize(pattern);
        let matcher = compile(&path_string(&absolute))?;

        // Walk from the deepest directory that has no glob characters.
        let mut base = PathBuf::new();
        let mut remaining = 0usize;
        let mut unbounded = false;
        for comp in absolute.components() {
            let text = comp.as_os_str().to_string_lossy();
            if remaining == 0 && !is_glob(&text) {
                base.push(comp);
            } else {
                remaining += 1;
                unbounded |= text.contains("**");
            }
        }

        if !self.fs.is_dir(&base) {
            return Ok(Vec::new());
        }

        let mut matches = Vec::new();
        let mut stack = vec![(base, 0usize)];
        while let Some((dir, depth)) = stack.pop() {
            let entries = self
                .fs
                .read_dir(&dir)
                .with_context(|| format!("walking {:?} for pattern {pattern}", dir))?;
            for entry in entries.into_iter().rev() {
                let next_depth = depth + 1;
                if matcher.is_match(&entry) {
                    matches.push(entry.clone());
                }
                if (unbounded || next_depth < remaining) && self.fs.is_dir(&entry) {
                    stack.push((entry, next_depth));
                }
            }
        }

        matches.sort();
        Ok(matches)
    }
}

fn compile(pattern: &str) -> Result<GlobMatcher> {
    let glob = GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .with_context(|| format!("invalid glob pattern: {pattern}"))?;
    Ok(glob.compile_matcher())
}

fn dedup(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn project() -> MockFileSystem {
        let fs = MockFileSystem::new();
        fs.add_file("/p/main.go", "");
        fs.add_file("/p/src/a.rs", "");
        fs.add_file("/p/src/nested/b.rs", "");
        fs.add_file("/p/templates/index.html", "");
        fs.add_file("/p/templates/about.html", "");
        fs.add_file("/p/.git/HEAD", "");
        fs.add_file("/p/.git/refs/heads/main", "");
        fs
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn relative_patterns_resolve_against_root() {
        let fs = project();
        let ex = Expander::new(&fs, "/p");
        let out = ex
            .expand_patterns(&strings(&["./main.go", "src"]), ExpandOptions::default(), &ExclusionFilter::default())
            .unwrap();
        assert_eq!(out, strings(&["/p/main.go", "/p/src", "/p/src/nested"]));
    }

    #[test]
    fn dot_is_root_and_excluded_dirs_are_not_descended() {
        let fs = project();
        let ex = Expander::new(&fs, "/p");
        let exclude = ExclusionFilter::new(ex.expand_excludes(&[], true).unwrap());

        let out = ex
            .expand_patterns(&strings(&["."]), ExpandOptions::default(), &exclude)
            .unwrap();
        assert_eq!(
            out,
            strings(&["/p", "/p/src", "/p/src/nested", "/p/templates"])
        );
    }

    #[test]
    fn non_recursive_keeps_only_the_pattern() {
        let fs = project();
        let ex = Expander::new(&fs, "/p");
        let options = ExpandOptions { watch_cwd: false, recursive: false };
        let out = ex
            .expand_patterns(&strings(&["src"]), options, &ExclusionFilter::default())
            .unwrap();
        assert_eq!(out, strings(&["/p/src"]));
    }

    #[test]
    fn glob_matches_within_one_level() {
        let fs = project();
        let ex = Expander::new(&fs, "/p");
        let out = ex
            .expand_patterns(&strings(&["templates/*.html"]), ExpandOptions::default(), &ExclusionFilter::default())
            .unwrap();
        assert_eq!(
            out,
            strings(&["/p/templates/about.html", "/p/templates/index.html"])
        );
    }

    #[test]
    fn double_star_walks_all_levels() {
        let fs = project();
        let ex = Expander::new(&fs, "/p");
        let out = ex
            .expand_patterns(&strings(&["src/**/*.rs"]), ExpandOptions::default(), &ExclusionFilter::default())
            .unwrap();
        assert_eq!(out, strings(&["/p/src/a.rs", "/p/src/nested/b.rs"]));
    }

    #[test]
    fn missing_literal_is_kept_and_missing_glob_is_dropped() {
        let fs = project();
        let ex = Expander::new(&fs, "/p");
        let out = ex
            .expand_patterns(&strings(&["nope", "nope/*.txt"]), ExpandOptions::default(), &ExclusionFilter::default())
            .unwrap();
        assert_eq!(out, strings(&["/p/nope"]));
    }

    #[test]
    fn watch_cwd_adds_root_once() {
        let fs = project();
        let ex = Expander::new(&fs, "/p");
        let options = ExpandOptions { watch_cwd: true, recursive: false };
        let out = ex
            .expand_patterns(&strings(&[".", "main.go"]), options, &ExclusionFilter::default())
            .unwrap();
        assert_eq!(out, strings(&["/p", "/p/main.go"]));
    }

    #[test]
    fn excludes_expand_globs_and_defaults() {
        let fs = project();
        let ex = Expander::new(&fs, "/p");

        let out = ex
            .expand_excludes(&strings(&["templates/*.html", "/abs/file"]), false)
            .unwrap();
        assert_eq!(
            out,
            strings(&["/p/templates/about.html", "/p/templates/index.html", "/abs/file"])
        );

        let with_defaults = ex.expand_excludes(&[], true).unwrap();
        assert!(with_defaults.contains(&"/p/.git".to_string()));
        assert!(with_defaults.contains(&"/p/node_modules".to_string()));
        assert_eq!(with_defaults.len(), DEFAULT_EXCLUDES.len());
    }

    #[test]
    fn invalid_glob_is_an_error() {
        let fs = project();
        let ex = Expander::new(&fs, "/p");
        assert!(ex.expand_excludes(&strings(&["src/[a"]), false).is_err());
    }
}
