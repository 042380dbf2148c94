//! Copying files into a destination directory.

use crate::{
    error::{BuildError, Result},
    utils, Driver,
};
use std::{fs, path::PathBuf};
use walkdir::WalkDir;

/// Copies glob-resolved sources into a destination directory.
///
/// By default a file is only copied when the destination is missing or older;
/// `overwrite` forces the copy unconditionally. Directories matched by a source
/// glob are copied when `recursive` is set.
#[derive(Clone, Debug)]
pub struct CopyTask {
    sources: Vec<String>,
    destination: PathBuf,
    recursive: bool,
    overwrite: bool,
}

impl CopyTask {
    pub fn new(_driver: Driver) -> Self {
        Self { sources: Vec::new(), destination: PathBuf::new(), recursive: false, overwrite: false }
    }

    /// Adds a source glob, e.g. `bin/*.dll`.
    pub fn source(&mut self, pattern: impl Into<String>) {
        self.sources.push(pattern.into());
    }

    pub fn destination(&mut self, dir: impl Into<PathBuf>) {
        self.destination = dir.into();
    }

    pub fn recursive(&mut self, recursive: bool) {
        self.recursive = recursive;
    }

    pub fn overwrite(&mut self, overwrite: bool) {
        self.overwrite = overwrite;
    }

    pub fn go(&self) -> Result<()> {
        if self.sources.is_empty() {
            return Err(BuildError::config("No sources for Copy()"));
        }
        if self.destination.as_os_str().is_empty() {
            return Err(BuildError::config("Missing 'Destination' for Copy()"));
        }

        for pattern in &self.sources {
            let paths = glob::glob(pattern)
                .map_err(|err| BuildError::msg(format!("invalid glob pattern \"{pattern}\": {err}")))?;
            for path in paths {
                let path = path.map_err(|err| BuildError::msg(err))?;
                if path.is_dir() {
                    if !self.recursive {
                        continue;
                    }
                    let base = path.file_name().map(PathBuf::from).unwrap_or_default();
                    for entry in WalkDir::new(&path).min_depth(1) {
                        let entry = entry.map_err(|err| BuildError::msg(err))?;
                        if !entry.file_type().is_file() {
                            continue;
                        }
                        let rel = entry.path().strip_prefix(&path).unwrap_or(entry.path());
                        self.copy_one(entry.path().to_path_buf(), self.destination.join(&base).join(rel))?;
                    }
                } else if path.is_file() {
                    let name = path.file_name().map(PathBuf::from).unwrap_or_default();
                    self.copy_one(path, self.destination.join(name))?;
                }
            }
        }
        Ok(())
    }

    fn copy_one(&self, src: PathBuf, dst: PathBuf) -> Result<()> {
        if self.overwrite {
            utils::create_parent_dir_all(&dst)?;
            fs::copy(&src, &dst).map_err(|err| BuildError::io(err, &dst))?;
            trace!(src = %src.display(), dst = %dst.display(), "copied");
        } else if utils::copy_if_newer(&src, &dst)? {
            trace!(src = %src.display(), dst = %dst.display(), "copied (newer)");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::tempdir;

    #[test]
    fn copy_requires_sources_and_destination() {
        let mut task = CopyTask::new(Driver::new());
        assert!(matches!(task.go().unwrap_err(), BuildError::Configuration(_)));
        task.source("*.txt");
        assert!(matches!(task.go().unwrap_err(), BuildError::Configuration(_)));
    }

    #[test]
    fn copies_only_newer_files_by_default() {
        let dir = tempdir("copy").unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        fs::create_dir_all(&src).unwrap();
        fs::create_dir_all(&dst).unwrap();
        fs::write(src.join("a.txt"), "new").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(20));
        fs::write(dst.join("a.txt"), "current").unwrap();

        let mut task = CopyTask::new(Driver::new());
        task.source(src.join("*.txt").to_string_lossy().to_string());
        task.destination(&dst);
        task.go().unwrap();
        // destination was newer, not overwritten
        assert_eq!(fs::read_to_string(dst.join("a.txt")).unwrap(), "current");

        let mut task = CopyTask::new(Driver::new());
        task.source(src.join("*.txt").to_string_lossy().to_string());
        task.destination(&dst);
        task.overwrite(true);
        task.go().unwrap();
        assert_eq!(fs::read_to_string(dst.join("a.txt")).unwrap(), "new");
    }

    #[test]
    fn recursive_copy_preserves_the_tree() {
        let dir = tempdir("copy-rec").unwrap();
        let src = dir.path().join("assets");
        fs::create_dir_all(src.join("img")).unwrap();
        fs::write(src.join("img/logo.png"), "png").unwrap();
        let dst = dir.path().join("dst");

        let mut task = CopyTask::new(Driver::new());
        task.source(src.to_string_lossy().to_string());
        task.destination(&dst);
        task.recursive(true);
        task.go().unwrap();

        assert_eq!(fs::read_to_string(dst.join("assets/img/logo.png")).unwrap(), "png");
    }
}
