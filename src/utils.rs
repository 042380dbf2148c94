//! Utility functions

use crate::error::{BuildError, PathIoError, Result};
use std::{
    fs,
    path::{Path, PathBuf},
    time::SystemTime,
};
use walkdir::WalkDir;

/// File extensions the include scanner treats as C/C++ translation units or headers.
pub const CPP_EXTENSIONS: &[&str] = &["c", "cc", "cpp", "cxx", "h", "hh", "hpp", "hxx", "inl"];

/// Canonicalize the path, platform-agnostic.
///
/// On windows this will ensure the path only consists of `/` separators.
pub fn canonicalize(path: impl AsRef<Path>) -> Result<PathBuf, PathIoError> {
    let path = path.as_ref();
    let res = dunce::canonicalize(path);
    #[cfg(windows)]
    let res = res.map(|p| {
        use path_slash::PathBufExt;
        PathBuf::from(p.to_slash_lossy().as_ref())
    });
    res.map_err(|err| PathIoError::new(err, path))
}

/// Returns the same path but with canonicalized components where possible.
///
/// This will take care of potential symbolic linked directories.
/// For example, the tempdir library is creating directories hosted under `/var/`, which in OS X
/// is a symbolic link to `/private/var/`, so the same file can surface under two different
/// paths. This canonicalizes the path but does not treat a non existing path as an error.
pub fn canonicalized(path: impl Into<PathBuf>) -> PathBuf {
    let path = path.into();
    canonicalize(&path).unwrap_or(path)
}

/// Returns the modification timestamp of the file, if it exists.
pub fn mtime(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Returns `true` if the file looks like a C/C++ source or header by extension.
pub fn is_cpp_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| CPP_EXTENSIONS.iter().any(|e| ext.eq_ignore_ascii_case(e)))
        .unwrap_or_default()
}

/// Sets the modification time of every given file to now.
///
/// Fails if a path does not exist or is not a regular file.
pub fn touch(path: &Path) -> Result<()> {
    let meta = fs::metadata(path).map_err(|err| BuildError::io(err, path))?;
    if !meta.is_file() {
        return Err(BuildError::msg(format!("\"{}\" is not a file", path.display())));
    }
    let file = fs::OpenOptions::new()
        .write(true)
        .open(path)
        .map_err(|err| BuildError::io(err, path))?;
    file.set_modified(SystemTime::now()).map_err(|err| BuildError::io(err, path))?;
    Ok(())
}

/// Enumerates the regular files of `dir` (non-recursive) whose file names match the
/// shell-style `pattern` and returns their absolute paths.
///
/// The enumeration order is whatever the directory iterator yields.
pub fn glob_files(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let pattern = glob::Pattern::new(pattern)
        .map_err(|err| BuildError::msg(format!("invalid glob pattern \"{pattern}\": {err}")))?;

    let mut files = Vec::new();
    if !dir.exists() {
        return Ok(files);
    }
    for entry in fs::read_dir(dir).map_err(|err| BuildError::io(err, dir))? {
        let entry = entry.map_err(|err| BuildError::io(err, dir))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let matched = path
            .file_name()
            .map(|name| pattern.matches(&name.to_string_lossy()))
            .unwrap_or_default();
        if matched {
            files.push(canonicalized(path));
        }
    }
    Ok(files)
}

/// Creates the parent directory of the `file` and all its ancestors if it does not exist.
///
/// See [`fs::create_dir_all()`].
pub fn create_parent_dir_all(file: &Path) -> Result<()> {
    if let Some(parent) = file.parent() {
        fs::create_dir_all(parent).map_err(|err| BuildError::io(err, parent))?;
    }
    Ok(())
}

/// Writes `content` to `file`, truncating any previous content.
pub fn string_to_file(file: &Path, content: &str) -> Result<()> {
    fs::write(file, content).map_err(|err| BuildError::io(err, file))
}

/// Copies `src` to `dst` if `dst` is missing or older than `src`, creating the
/// destination directory tree on demand. Returns `true` if a copy happened.
pub fn copy_if_newer(src: &Path, dst: &Path) -> Result<bool> {
    let src_mtime = mtime(src);
    let dst_mtime = mtime(dst);
    if let (Some(src_mtime), Some(dst_mtime)) = (src_mtime, dst_mtime) {
        if src_mtime <= dst_mtime {
            return Ok(false);
        }
    }
    create_parent_dir_all(dst)?;
    fs::copy(src, dst).map_err(|err| BuildError::io(err, dst))?;
    Ok(true)
}

/// Mirrors `src` into `dst` so that `dst` becomes structurally equal to `src`.
///
/// Files and directories only present in `dst` are deleted, missing ones are
/// created, and files whose source is newer are copied over.
pub fn directory_sync(src: &Path, dst: &Path) -> Result<()> {
    if !src.is_dir() {
        return Err(BuildError::msg(format!("\"{}\" is not a directory", src.display())));
    }
    fs::create_dir_all(dst).map_err(|err| BuildError::io(err, dst))?;

    // delete everything under dst that has no counterpart in src
    let mut stale = Vec::new();
    for entry in WalkDir::new(dst).min_depth(1).into_iter().filter_map(std::result::Result::ok) {
        let rel = entry.path().strip_prefix(dst).unwrap_or(entry.path());
        if !src.join(rel).exists() {
            stale.push(entry.path().to_path_buf());
        }
    }
    for path in stale {
        if path.is_dir() {
            let _ = fs::remove_dir_all(&path);
        } else {
            let _ = fs::remove_file(&path);
        }
    }

    for entry in WalkDir::new(src).min_depth(1) {
        let entry = entry.map_err(|err| BuildError::msg(err))?;
        let rel = entry.path().strip_prefix(src).unwrap_or(entry.path());
        let target = dst.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|err| BuildError::io(err, &target))?;
        } else if entry.file_type().is_file() {
            copy_if_newer(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Removes the given paths recursively. Per-path failures are swallowed.
pub fn delete_all<'a>(paths: impl IntoIterator<Item = &'a Path>) {
    for path in paths {
        if path.is_dir() {
            let _ = fs::remove_dir_all(path);
        } else {
            let _ = fs::remove_file(path);
        }
    }
}

/// Creates a new named tempdir.
#[cfg(test)]
pub(crate) fn tempdir(name: &str) -> Result<tempfile::TempDir> {
    tempfile::Builder::new()
        .prefix(name)
        .tempdir()
        .map_err(|err| BuildError::io(err, name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn can_glob_files_by_name() {
        let dir = tempdir("glob").unwrap();
        fs::write(dir.path().join("a.cpp"), "").unwrap();
        fs::write(dir.path().join("b.cpp"), "").unwrap();
        fs::write(dir.path().join("c.h"), "").unwrap();
        fs::create_dir(dir.path().join("sub.cpp")).unwrap();

        let mut files = glob_files(dir.path(), "*.cpp").unwrap();
        files.sort();

        let names: Vec<_> =
            files.iter().map(|f| f.file_name().unwrap().to_string_lossy().to_string()).collect();
        assert_eq!(names, vec!["a.cpp", "b.cpp"]);
        assert!(files.iter().all(|f| f.is_absolute()));
    }

    #[test]
    fn glob_of_missing_dir_is_empty() {
        let dir = tempdir("glob-missing").unwrap();
        let files = glob_files(&dir.path().join("nope"), "*").unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn touch_rejects_directories_and_missing_files() {
        let dir = tempdir("touch").unwrap();
        assert!(touch(dir.path()).is_err());
        assert!(touch(&dir.path().join("missing")).is_err());

        let file = dir.path().join("f");
        fs::write(&file, "x").unwrap();
        touch(&file).unwrap();
    }

    #[test]
    fn directory_sync_mirrors_and_deletes() {
        let dir = tempdir("sync").unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        fs::create_dir_all(src.join("nested")).unwrap();
        fs::write(src.join("keep.txt"), "keep").unwrap();
        fs::write(src.join("nested/inner.txt"), "inner").unwrap();
        fs::create_dir_all(&dst).unwrap();
        fs::write(dst.join("stale.txt"), "stale").unwrap();

        directory_sync(&src, &dst).unwrap();

        assert_eq!(fs::read_to_string(dst.join("keep.txt")).unwrap(), "keep");
        assert_eq!(fs::read_to_string(dst.join("nested/inner.txt")).unwrap(), "inner");
        assert!(!dst.join("stale.txt").exists());
    }

    #[test]
    fn detects_cpp_files() {
        assert!(is_cpp_file(Path::new("a.cpp")));
        assert!(is_cpp_file(Path::new("a.H")));
        assert!(!is_cpp_file(Path::new("a.rs")));
        assert!(!is_cpp_file(Path::new("Makefile")));
    }
}
