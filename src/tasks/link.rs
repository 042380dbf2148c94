//! Archiving and linking tasks.

use crate::{
    error::{BuildError, Result},
    outofdate::FileOutOfDate,
    process, utils, Driver,
};
use std::path::PathBuf;

/// Archives object files into a static library.
#[derive(Clone, Debug)]
pub struct Librarian {
    driver: Driver,
    output: PathBuf,
    files: Vec<PathBuf>,
    dependency_check: bool,
}

impl Librarian {
    pub fn new(driver: Driver) -> Self {
        Self { driver, output: PathBuf::new(), files: Vec::new(), dependency_check: true }
    }

    pub fn output(&mut self, output: impl Into<PathBuf>) {
        self.output = output.into();
    }

    pub fn add_file(&mut self, file: impl Into<PathBuf>) {
        self.files.push(file.into());
    }

    pub fn dependency_check(&mut self, check: bool) {
        self.dependency_check = check;
    }

    pub fn go(&self) -> Result<()> {
        if self.output.as_os_str().is_empty() {
            return Err(BuildError::config("Missing 'Output' for Librarian()"));
        }
        if self.files.is_empty() {
            return Err(BuildError::config("No files for Librarian()"));
        }
        let stale = FileOutOfDate::new(&self.output)
            .add_files(&self.files)
            .dependency_check(self.dependency_check)
            .go();
        if !stale {
            trace!(output = %self.output.display(), "archive up to date");
            return Ok(());
        }

        utils::create_parent_dir_all(&self.output)?;
        let toolchain = self.driver.toolchain();
        let command = toolchain.archive_command(&self.output, &self.files);
        let output = process::run_capture(&toolchain.setenv_batch_call(), &command)?;
        if !output.is_empty() {
            println!("{output}");
        }
        Ok(())
    }
}

/// Links object files and libraries into an executable or shared library.
#[derive(Clone, Debug)]
pub struct Linker {
    driver: Driver,
    output: PathBuf,
    files: Vec<PathBuf>,
    libs: Vec<PathBuf>,
    lib_paths: Vec<PathBuf>,
    shared: bool,
    debug_info: bool,
    dependency_check: bool,
}

impl Linker {
    pub fn new(driver: Driver) -> Self {
        Self {
            driver,
            output: PathBuf::new(),
            files: Vec::new(),
            libs: Vec::new(),
            lib_paths: Vec::new(),
            shared: false,
            debug_info: false,
            dependency_check: true,
        }
    }

    pub fn output(&mut self, output: impl Into<PathBuf>) {
        self.output = output.into();
    }

    pub fn add_file(&mut self, file: impl Into<PathBuf>) {
        self.files.push(file.into());
    }

    pub fn add_lib(&mut self, lib: impl Into<PathBuf>) {
        self.libs.push(lib.into());
    }

    pub fn add_lib_path(&mut self, path: impl Into<PathBuf>) {
        self.lib_paths.push(path.into());
    }

    /// Produce a shared library instead of an executable.
    pub fn shared(&mut self, shared: bool) {
        self.shared = shared;
    }

    pub fn debug_info(&mut self, debug_info: bool) {
        self.debug_info = debug_info;
    }

    pub fn dependency_check(&mut self, check: bool) {
        self.dependency_check = check;
    }

    pub fn go(&self) -> Result<()> {
        if self.output.as_os_str().is_empty() {
            return Err(BuildError::config("Missing 'Output' for Linker()"));
        }
        if self.files.is_empty() {
            return Err(BuildError::config("No files for Linker()"));
        }
        let stale = FileOutOfDate::new(&self.output)
            .add_files(&self.files)
            .add_files(&self.libs)
            .dependency_check(self.dependency_check)
            .go();
        if !stale {
            trace!(output = %self.output.display(), "link output up to date");
            return Ok(());
        }

        utils::create_parent_dir_all(&self.output)?;
        let toolchain = self.driver.toolchain();
        let command = toolchain.link_command(
            &self.output,
            &self.files,
            &self.libs,
            &self.lib_paths,
            self.shared,
            self.debug_info,
        );
        let output = process::run_capture(&toolchain.setenv_batch_call(), &command)?;
        if !output.is_empty() {
            println!("{output}");
        }
        Ok(())
    }
}
