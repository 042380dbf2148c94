//! Per-input code generation tools: Qt's moc/uic and the resource compiler.
//!
//! Each runs a well-known external tool once per input file, emitting one output per
//! input, with an out-of-date check per input.

use crate::{
    error::{BuildError, Result},
    outofdate::FileOutOfDate,
    process, Driver,
};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Shared shape of the per-input tools: declared inputs and an output directory.
#[derive(Clone, Debug)]
struct PerInputTool {
    driver: Driver,
    files: Vec<PathBuf>,
    out_dir: PathBuf,
}

impl PerInputTool {
    fn new(driver: Driver) -> Self {
        Self { driver, files: Vec::new(), out_dir: PathBuf::new() }
    }

    /// Runs `command(input, output)` for every out-of-date input.
    fn go(
        &self,
        kind: &str,
        output_name: impl Fn(&Path) -> PathBuf,
        command: impl Fn(&Path, &Path) -> String,
    ) -> Result<()> {
        if self.files.is_empty() {
            return Err(BuildError::config(format!("No files for {kind}()")));
        }
        if self.out_dir.as_os_str().is_empty() {
            return Err(BuildError::config(format!("Missing 'OutDir' for {kind}()")));
        }
        fs::create_dir_all(&self.out_dir).map_err(|err| BuildError::io(err, &self.out_dir))?;

        let prelude = self.driver.toolchain().setenv_batch_call();
        for file in &self.files {
            let file = file.as_path();
            let output = self.out_dir.join(output_name(file));
            if !FileOutOfDate::new(&output).add_file(file).go() {
                trace!(output = %output.display(), "up to date");
                continue;
            }
            let captured = process::run_capture(&prelude, &command(file, &output))?;
            if !captured.is_empty() {
                println!("{captured}");
            }
        }
        Ok(())
    }
}

fn stem(file: &Path) -> String {
    file.file_stem().unwrap_or_default().to_string_lossy().to_string()
}

/// Runs Qt's meta-object compiler once per input header.
#[derive(Clone, Debug)]
pub struct Moc(PerInputTool);

impl Moc {
    pub fn new(driver: Driver) -> Self {
        Self(PerInputTool::new(driver))
    }

    pub fn add_file(&mut self, file: impl Into<PathBuf>) {
        self.0.files.push(file.into());
    }

    pub fn out_dir(&mut self, dir: impl Into<PathBuf>) {
        self.0.out_dir = dir.into();
    }

    pub fn go(&self) -> Result<()> {
        self.0.go(
            "Moc",
            |file| PathBuf::from(format!("moc_{}.cpp", stem(file))),
            |file, output| format!("moc \"{}\" -o \"{}\"", file.display(), output.display()),
        )
    }
}

/// Runs Qt's UI compiler once per input `.ui` file.
#[derive(Clone, Debug)]
pub struct Uic(PerInputTool);

impl Uic {
    pub fn new(driver: Driver) -> Self {
        Self(PerInputTool::new(driver))
    }

    pub fn add_file(&mut self, file: impl Into<PathBuf>) {
        self.0.files.push(file.into());
    }

    pub fn out_dir(&mut self, dir: impl Into<PathBuf>) {
        self.0.out_dir = dir.into();
    }

    pub fn go(&self) -> Result<()> {
        self.0.go(
            "Uic",
            |file| PathBuf::from(format!("ui_{}.h", stem(file))),
            |file, output| format!("uic \"{}\" -o \"{}\"", file.display(), output.display()),
        )
    }
}

/// Runs the platform resource compiler once per input script.
#[derive(Clone, Debug)]
pub struct ResourceCompiler(PerInputTool);

impl ResourceCompiler {
    pub fn new(driver: Driver) -> Self {
        Self(PerInputTool::new(driver))
    }

    pub fn add_file(&mut self, file: impl Into<PathBuf>) {
        self.0.files.push(file.into());
    }

    pub fn out_dir(&mut self, dir: impl Into<PathBuf>) {
        self.0.out_dir = dir.into();
    }

    pub fn go(&self) -> Result<()> {
        let toolchain = self.0.driver.toolchain();
        self.0.go(
            "ResourceCompiler",
            |file| PathBuf::from(format!("{}.res", stem(file))),
            |file, output| toolchain.resource_compile_command(file, output),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_input_tools_validate_configuration() {
        let mut moc = Moc::new(Driver::new());
        assert!(matches!(moc.go().unwrap_err(), BuildError::Configuration(_)));
        moc.add_file("widget.h");
        assert!(matches!(moc.go().unwrap_err(), BuildError::Configuration(_)));

        let uic = Uic::new(Driver::new());
        assert!(matches!(uic.go().unwrap_err(), BuildError::Configuration(_)));

        let rc = ResourceCompiler::new(Driver::new());
        assert!(matches!(rc.go().unwrap_err(), BuildError::Configuration(_)));
    }
}
