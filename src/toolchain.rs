//! Toolchain and platform selection.
//!
//! The registry holds the process-wide `{toolchain id, platform}` pair and is the only
//! place that knows the concrete command-line text of the supported compiler families.
//! Task kinds ask it for fully formed command strings (compile, archive, link, PCH) and
//! for the shell prelude that configures the selected toolchain's environment.

use crate::error::{BuildError, Result};
use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

/// Supported compiler families.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ToolchainId {
    Msvc,
    Gcc,
    Clang,
}

impl ToolchainId {
    /// The default toolchain for the host.
    pub fn host_default() -> Self {
        cfg_if::cfg_if! {
            if #[cfg(windows)] {
                ToolchainId::Msvc
            } else {
                ToolchainId::Gcc
            }
        }
    }

    fn compiler(&self) -> &'static str {
        match self {
            ToolchainId::Msvc => "cl",
            ToolchainId::Gcc => "g++",
            ToolchainId::Clang => "clang++",
        }
    }

    /// Extension of the object files this family emits.
    pub fn object_extension(&self) -> &'static str {
        match self {
            ToolchainId::Msvc => "obj",
            ToolchainId::Gcc | ToolchainId::Clang => "o",
        }
    }
}

impl fmt::Display for ToolchainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ToolchainId::Msvc => "MSVC",
            ToolchainId::Gcc => "GCC",
            ToolchainId::Clang => "Clang",
        };
        f.write_str(s)
    }
}

impl FromStr for ToolchainId {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "MSVC" => Ok(ToolchainId::Msvc),
            "GCC" => Ok(ToolchainId::Gcc),
            "CLANG" => Ok(ToolchainId::Clang),
            _ => Err(BuildError::config(format!("unknown toolchain \"{s}\""))),
        }
    }
}

/// Target platform.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Platform {
    X86,
    X64,
}

impl Platform {
    pub fn host_default() -> Self {
        if cfg!(target_pointer_width = "64") {
            Platform::X64
        } else {
            Platform::X86
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Platform::X86 => "x86",
            Platform::X64 => "x64",
        };
        f.write_str(s)
    }
}

impl FromStr for Platform {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "x86" => Ok(Platform::X86),
            "x64" => Ok(Platform::X64),
            _ => Err(BuildError::config(format!("unknown platform \"{s}\", expected x86 or x64"))),
        }
    }
}

/// Compile settings a task hands to the toolchain when asking for command lines.
///
/// These are the semantic knobs only; the flag spelling lives in this module.
#[derive(Clone, Debug, Default)]
pub struct CompileOptions {
    pub debug: bool,
    pub crt_static: bool,
    pub includes: Vec<PathBuf>,
    pub defines: Vec<String>,
    /// Extra flags accumulated by the script, passed through verbatim.
    pub extra_flags: String,
    /// Precompiled header to reference while compiling, with its artifact path.
    pub pch: Option<(PathBuf, PathBuf)>,
}

/// The process-wide `{toolchain id, platform}` selection.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Toolchain {
    id: ToolchainId,
    platform: Platform,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self { id: ToolchainId::host_default(), platform: Platform::host_default() }
    }
}

impl fmt::Display for Toolchain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.id, self.platform)
    }
}

impl Toolchain {
    pub fn new(id: ToolchainId, platform: Platform) -> Self {
        Self { id, platform }
    }

    pub fn id(&self) -> ToolchainId {
        self.id
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn set_id(&mut self, id: ToolchainId) {
        self.id = id;
    }

    pub fn set_platform(&mut self, platform: Platform) {
        self.platform = platform;
    }

    /// A self-contained shell command that configures the current shell for this
    /// toolchain. Prepended (with `&&`) to every `Run()` and tool invocation.
    ///
    /// The POSIX toolchains need no environment setup and yield an empty fragment.
    pub fn setenv_batch_call(&self) -> String {
        match self.id {
            ToolchainId::Msvc => {
                let arch = match self.platform {
                    Platform::X86 => "x86",
                    Platform::X64 => "amd64",
                };
                format!("call vcvarsall.bat {arch}")
            }
            ToolchainId::Gcc | ToolchainId::Clang => String::new(),
        }
    }

    /// The object file path for `source` under `out_dir`.
    pub fn object_file(&self, out_dir: &Path, source: &Path) -> PathBuf {
        let stem = source.file_stem().unwrap_or_default();
        out_dir.join(stem).with_extension(self.id.object_extension())
    }

    /// The command line compiling `source` into `object`.
    pub fn compile_command(&self, opts: &CompileOptions, source: &Path, object: &Path) -> String {
        let mut cmd = vec![self.id.compiler().to_string()];
        match self.id {
            ToolchainId::Msvc => {
                cmd.push("/nologo /c /EHsc".to_string());
                if opts.debug {
                    cmd.push("/Od /Z7".to_string());
                } else {
                    cmd.push("/Ox /DNDEBUG".to_string());
                }
                cmd.push(
                    match (opts.crt_static, opts.debug) {
                        (true, true) => "/MTd",
                        (true, false) => "/MT",
                        (false, true) => "/MDd",
                        (false, false) => "/MD",
                    }
                    .to_string(),
                );
                for inc in &opts.includes {
                    cmd.push(format!("/I\"{}\"", inc.display()));
                }
                for def in &opts.defines {
                    cmd.push(format!("/D\"{def}\""));
                }
                if let Some((header, artifact)) = &opts.pch {
                    cmd.push(format!("/Yu\"{}\" /Fp\"{}\"", header.display(), artifact.display()));
                }
                if !opts.extra_flags.is_empty() {
                    cmd.push(opts.extra_flags.trim().to_string());
                }
                cmd.push(format!("/Fo\"{}\"", object.display()));
                cmd.push(format!("\"{}\"", source.display()));
            }
            ToolchainId::Gcc | ToolchainId::Clang => {
                cmd.push("-c".to_string());
                cmd.push(self.machine_flag().to_string());
                if opts.debug {
                    cmd.push("-g".to_string());
                } else {
                    cmd.push("-O2 -DNDEBUG".to_string());
                }
                if opts.crt_static {
                    cmd.push("-static-libgcc -static-libstdc++".to_string());
                }
                for inc in &opts.includes {
                    cmd.push(format!("-I\"{}\"", inc.display()));
                }
                for def in &opts.defines {
                    cmd.push(format!("-D{def}"));
                }
                if !opts.extra_flags.is_empty() {
                    cmd.push(opts.extra_flags.trim().to_string());
                }
                cmd.push(format!("-o \"{}\"", object.display()));
                cmd.push(format!("\"{}\"", source.display()));
            }
        }
        cmd.join(" ")
    }

    /// The artifact path of the precompiled header under `out_dir`.
    pub fn pch_artifact(&self, out_dir: &Path, header: &Path) -> PathBuf {
        let name = header.file_name().unwrap_or_default();
        match self.id {
            ToolchainId::Msvc => out_dir.join(name).with_extension("pch"),
            // gcc/clang pick up a sibling `<header>.gch` automatically
            ToolchainId::Gcc | ToolchainId::Clang => {
                let mut gch = header.as_os_str().to_os_string();
                gch.push(".gch");
                PathBuf::from(gch)
            }
        }
    }

    /// The command(s) building the precompiled header, in execution order.
    ///
    /// `header` is the PCH header, `source` the implementation file that owns it and
    /// `object` the object the implementation file compiles to. For MSVC a single
    /// `/Yc` invocation produces both the `.pch` and the object; the POSIX toolchains
    /// precompile the header and then compile the implementation file as usual.
    pub fn pch_commands(
        &self,
        opts: &CompileOptions,
        header: &Path,
        artifact: &Path,
        source: &Path,
        object: &Path,
    ) -> Vec<String> {
        match self.id {
            ToolchainId::Msvc => {
                let mut opts = opts.clone();
                opts.pch = None;
                let mut cmd = self.compile_command(&opts, source, object);
                cmd.push_str(&format!(" /Yc\"{}\" /Fp\"{}\"", header.display(), artifact.display()));
                vec![cmd]
            }
            ToolchainId::Gcc | ToolchainId::Clang => {
                let mut opts = opts.clone();
                opts.pch = None;
                let mut precompile = self.compile_command(&opts, header, artifact);
                precompile = precompile.replacen("-c", "-x c++-header", 1);
                let compile = self.compile_command(&opts, source, object);
                vec![precompile, compile]
            }
        }
    }

    /// The command line archiving `objects` into the static library `output`.
    pub fn archive_command(&self, output: &Path, objects: &[PathBuf]) -> String {
        let inputs = quoted(objects);
        match self.id {
            ToolchainId::Msvc => {
                format!("lib /NOLOGO /OUT:\"{}\" {}", output.display(), inputs)
            }
            ToolchainId::Gcc | ToolchainId::Clang => {
                format!("ar rcs \"{}\" {}", output.display(), inputs)
            }
        }
    }

    /// The command line linking `objects` and `libs` into `output`.
    pub fn link_command(
        &self,
        output: &Path,
        objects: &[PathBuf],
        libs: &[PathBuf],
        lib_paths: &[PathBuf],
        shared: bool,
        debug_info: bool,
    ) -> String {
        let mut cmd = Vec::new();
        match self.id {
            ToolchainId::Msvc => {
                cmd.push(format!("link /NOLOGO /OUT:\"{}\"", output.display()));
                if shared {
                    cmd.push("/DLL".to_string());
                }
                if debug_info {
                    cmd.push("/DEBUG".to_string());
                }
                for path in lib_paths {
                    cmd.push(format!("/LIBPATH:\"{}\"", path.display()));
                }
            }
            ToolchainId::Gcc | ToolchainId::Clang => {
                cmd.push(format!("{} {}", self.id.compiler(), self.machine_flag()));
                if shared {
                    cmd.push("-shared".to_string());
                }
                if debug_info {
                    cmd.push("-g".to_string());
                }
                cmd.push(format!("-o \"{}\"", output.display()));
                for path in lib_paths {
                    cmd.push(format!("-L\"{}\"", path.display()));
                }
            }
        }
        if !objects.is_empty() {
            cmd.push(quoted(objects));
        }
        if !libs.is_empty() {
            cmd.push(quoted(libs));
        }
        cmd.join(" ")
    }

    /// The command line running the resource compiler on one input.
    pub fn resource_compile_command(&self, source: &Path, output: &Path) -> String {
        match self.id {
            ToolchainId::Msvc => {
                format!("rc /nologo /fo\"{}\" \"{}\"", output.display(), source.display())
            }
            ToolchainId::Gcc | ToolchainId::Clang => {
                format!("windres \"{}\" -O coff -o \"{}\"", source.display(), output.display())
            }
        }
    }

    fn machine_flag(&self) -> &'static str {
        match self.platform {
            Platform::X86 => "-m32",
            Platform::X64 => "-m64",
        }
    }
}

fn quoted(paths: &[PathBuf]) -> String {
    paths.iter().map(|p| format!("\"{}\"", p.display())).collect::<Vec<_>>().join(" ")
}
