//! The out-of-date oracle.
//!
//! Given a parent artifact and its dependency inputs, decides whether the parent must
//! be rebuilt. C/C++ inputs are expanded into the transitive closure of the headers
//! they `#include`, discovered by a textual scan along the configured include path.

use crate::utils;
use once_cell::sync::Lazy;
use regex::Regex;
use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
    time::SystemTime,
};

/// Matches `#include "…"` and `#include <…>` and captures the include path.
static RE_INCLUDE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^\s*#\s*include\s+["<]([^">]+)[">]"#).unwrap());

/// Rebuild decision for a parent artifact against a set of dependency inputs.
///
/// ```no_run
/// use fbuild::FileOutOfDate;
///
/// let stale = FileOutOfDate::new("out/app.o")
///     .add_file("src/app.cpp")
///     .add_include_dir("include")
///     .go();
/// ```
#[derive(Clone, Debug)]
pub struct FileOutOfDate {
    parent: PathBuf,
    files: Vec<PathBuf>,
    include_dirs: Vec<PathBuf>,
    dependency_check: bool,
}

impl FileOutOfDate {
    pub fn new(parent: impl Into<PathBuf>) -> Self {
        Self {
            parent: parent.into(),
            files: Vec::new(),
            include_dirs: Vec::new(),
            dependency_check: true,
        }
    }

    pub fn add_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.files.push(file.into());
        self
    }

    pub fn add_files<I, P>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.files.extend(files.into_iter().map(Into::into));
        self
    }

    /// Adds a directory consulted when resolving scanned `#include` directives.
    pub fn add_include_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.include_dirs.push(dir.into());
        self
    }

    pub fn add_include_dirs<I, P>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.include_dirs.extend(dirs.into_iter().map(Into::into));
        self
    }

    /// Disabling the dependency check forces a rebuild.
    pub fn dependency_check(mut self, check: bool) -> Self {
        self.dependency_check = check;
        self
    }

    /// Returns `true` if the parent must be rebuilt.
    pub fn go(&self) -> bool {
        if !self.dependency_check {
            trace!(parent = %self.parent.display(), "dependency check disabled, forcing rebuild");
            return true;
        }
        let Some(parent_mtime) = utils::mtime(&self.parent) else {
            trace!(parent = %self.parent.display(), "parent missing, rebuild");
            return true;
        };

        let mut visited = HashSet::new();
        for file in &self.files {
            if self.is_newer(file, parent_mtime, &mut visited) {
                trace!(
                    parent = %self.parent.display(),
                    input = %file.display(),
                    "input newer than parent, rebuild"
                );
                return true;
            }
        }
        false
    }

    /// Checks one input against the parent timestamp, descending into scanned
    /// headers for C/C++ inputs. `visited` terminates cyclic include graphs.
    fn is_newer(&self, file: &Path, parent_mtime: SystemTime, visited: &mut HashSet<PathBuf>) -> bool {
        if !visited.insert(file.to_path_buf()) {
            return false;
        }
        // a missing input counts as out-of-date; the downstream tool reports it
        let Some(file_mtime) = utils::mtime(file) else {
            return true;
        };
        if file_mtime > parent_mtime {
            return true;
        }
        if utils::is_cpp_file(file) {
            for include in scan_includes(file) {
                if let Some(resolved) = self.resolve_include(file, &include) {
                    if self.is_newer(&resolved, parent_mtime, visited) {
                        return true;
                    }
                }
                // unresolved includes are system headers the scanner cannot see
            }
        }
        false
    }

    /// Resolves an include first against the including file's directory, then
    /// against the ordered include directories.
    fn resolve_include(&self, from: &Path, include: &Path) -> Option<PathBuf> {
        let sibling = from.parent().map(|dir| dir.join(include));
        if let Some(sibling) = sibling {
            if sibling.is_file() {
                return Some(sibling);
            }
        }
        self.include_dirs.iter().map(|dir| dir.join(include)).find(|p| p.is_file())
    }
}

/// Textually scans a file for `#include` directives.
fn scan_includes(file: &Path) -> Vec<PathBuf> {
    let Ok(content) = fs::read_to_string(file) else {
        return Vec::new();
    };
    content
        .lines()
        .filter_map(|line| RE_INCLUDE.captures(line))
        .map(|cap| PathBuf::from(&cap[1]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::tempdir;
    use std::{fs, thread, time::Duration};

    // Filesystem timestamp granularity is coarse on some hosts; spacing writes
    // keeps the mtime ordering unambiguous.
    fn settle() {
        thread::sleep(Duration::from_millis(20));
    }

    #[test]
    fn up_to_date_when_inputs_are_older() {
        let dir = tempdir("ood-mono").unwrap();
        let input = dir.path().join("in.txt");
        let parent = dir.path().join("out.txt");
        fs::write(&input, "in").unwrap();
        settle();
        fs::write(&parent, "out").unwrap();

        assert!(!FileOutOfDate::new(&parent).add_file(&input).go());
    }

    #[test]
    fn rebuild_when_input_is_newer() {
        let dir = tempdir("ood-newer").unwrap();
        let parent = dir.path().join("out.txt");
        let input = dir.path().join("in.txt");
        fs::write(&parent, "out").unwrap();
        settle();
        fs::write(&input, "in").unwrap();

        assert!(FileOutOfDate::new(&parent).add_file(&input).go());
    }

    #[test]
    fn disabled_dependency_check_forces_rebuild() {
        let dir = tempdir("ood-force").unwrap();
        let input = dir.path().join("in.txt");
        let parent = dir.path().join("out.txt");
        fs::write(&input, "in").unwrap();
        settle();
        fs::write(&parent, "out").unwrap();

        assert!(FileOutOfDate::new(&parent).add_file(&input).dependency_check(false).go());
    }

    #[test]
    fn missing_parent_forces_rebuild() {
        let dir = tempdir("ood-missing").unwrap();
        let input = dir.path().join("in.txt");
        fs::write(&input, "in").unwrap();

        assert!(FileOutOfDate::new(dir.path().join("out.txt")).add_file(&input).go());
    }

    #[test]
    fn missing_input_forces_rebuild() {
        let dir = tempdir("ood-missing-input").unwrap();
        let parent = dir.path().join("out.txt");
        fs::write(&parent, "out").unwrap();

        assert!(FileOutOfDate::new(&parent).add_file(dir.path().join("in.txt")).go());
    }

    #[test]
    fn transitive_header_triggers_rebuild() {
        let dir = tempdir("ood-header").unwrap();
        let source = dir.path().join("in.cpp");
        let header = dir.path().join("h.h");
        let parent = dir.path().join("out.o");

        fs::write(&source, "#include \"h.h\"\nint main() {}\n").unwrap();
        fs::write(&header, "#pragma once\n").unwrap();
        settle();
        fs::write(&parent, "obj").unwrap();
        assert!(!FileOutOfDate::new(&parent).add_file(&source).go());

        settle();
        fs::write(&header, "#pragma once\n// touched\n").unwrap();
        assert!(FileOutOfDate::new(&parent).add_file(&source).go());
    }

    #[test]
    fn header_resolved_via_include_dirs() {
        let dir = tempdir("ood-incdir").unwrap();
        let inc = dir.path().join("include");
        fs::create_dir(&inc).unwrap();
        let source = dir.path().join("in.cpp");
        let parent = dir.path().join("out.o");

        fs::write(&source, "#include <dep.h>\n").unwrap();
        fs::write(inc.join("dep.h"), "").unwrap();
        settle();
        fs::write(&parent, "obj").unwrap();

        assert!(!FileOutOfDate::new(&parent).add_file(&source).add_include_dir(&inc).go());

        settle();
        fs::write(inc.join("dep.h"), "// newer").unwrap();
        assert!(FileOutOfDate::new(&parent).add_file(&source).add_include_dir(&inc).go());
    }

    #[test]
    fn unresolved_includes_are_ignored() {
        let dir = tempdir("ood-sys").unwrap();
        let source = dir.path().join("in.cpp");
        let parent = dir.path().join("out.o");
        fs::write(&source, "#include <vector>\n#include \"nowhere.h\"\n").unwrap();
        settle();
        fs::write(&parent, "obj").unwrap();

        assert!(!FileOutOfDate::new(&parent).add_file(&source).go());
    }

    #[test]
    fn cyclic_includes_terminate() {
        let dir = tempdir("ood-cycle").unwrap();
        let a = dir.path().join("a.h");
        let b = dir.path().join("b.h");
        let parent = dir.path().join("out.o");
        fs::write(&a, "#include \"b.h\"\n").unwrap();
        fs::write(&b, "#include \"a.h\"\n").unwrap();
        settle();
        fs::write(&parent, "obj").unwrap();

        assert!(!FileOutOfDate::new(&parent).add_file(&a).go());
    }

    #[test]
    fn scans_both_include_forms() {
        let dir = tempdir("ood-forms").unwrap();
        let source = dir.path().join("in.cpp");
        fs::write(&source, "  #  include \"a.h\"\n#include <b/c.h>\nint x; // #include \"not me\"\n")
            .unwrap();
        let includes = scan_includes(&source);
        assert_eq!(includes, vec![PathBuf::from("a.h"), PathBuf::from("b/c.h")]);
    }
}
