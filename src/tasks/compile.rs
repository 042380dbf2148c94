//! The compile task and its parallel engine.
//!
//! Compilation runs in two phases. If a precompiled header is configured, its
//! implementation file is compiled first, synchronously; every later compilation
//! references the produced PCH artifact. Remaining out-of-date sources are then
//! dispatched to a worker pool. Workers receive fully formed command strings, run
//! the compiler capturing its output, and hand the result to the single reporter on
//! the dispatching thread, which prints each file's diagnostics contiguously in
//! completion order. The engine never cancels in-flight workers on failure; it
//! drains outstanding work so no diagnostics are lost.

use crate::{
    error::{BuildError, Result},
    outofdate::FileOutOfDate,
    process,
    toolchain::CompileOptions,
    Driver,
};
use std::{fs, path::PathBuf, sync::mpsc};

/// Configurable compilation of a set of C/C++ sources into object files.
#[derive(Clone, Debug)]
pub struct Compile {
    driver: Driver,
    debug: bool,
    out_dir: PathBuf,
    includes: Vec<PathBuf>,
    defines: Vec<String>,
    files: Vec<PathBuf>,
    crt_static: bool,
    threads: usize,
    extra_flags: String,
    precompiled_header: Option<PathBuf>,
    precompiled_cpp: Option<PathBuf>,
}

/// One unit of phase-2 work: a source file and the complete shell command
/// (environment prelude included) that compiles it.
#[derive(Clone, Debug)]
struct CompileJob {
    file: PathBuf,
    command: String,
}

/// Everything `go()` decided to run, in order.
#[derive(Debug, Default)]
struct CompilePlan {
    /// Synchronous phase-1 commands building the precompiled header.
    pch_commands: Vec<String>,
    /// Out-of-date sources for the worker pool, in declared order.
    jobs: Vec<CompileJob>,
}

impl Compile {
    pub fn new(driver: Driver) -> Self {
        Self {
            driver,
            debug: false,
            out_dir: PathBuf::new(),
            includes: Vec::new(),
            defines: Vec::new(),
            files: Vec::new(),
            crt_static: false,
            threads: 0,
            extra_flags: String::new(),
            precompiled_header: None,
            precompiled_cpp: None,
        }
    }

    pub fn debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    pub fn out_dir(&mut self, out_dir: impl Into<PathBuf>) {
        self.out_dir = out_dir.into();
    }

    pub fn add_include(&mut self, include: impl Into<PathBuf>) {
        self.includes.push(include.into());
    }

    pub fn add_define(&mut self, define: impl Into<String>) {
        self.defines.push(define.into());
    }

    pub fn add_file(&mut self, file: impl Into<PathBuf>) {
        self.files.push(file.into());
    }

    pub fn crt_static(&mut self, crt_static: bool) {
        self.crt_static = crt_static;
    }

    /// Worker count for the parallel phase; 0 selects the hardware thread count.
    pub fn threads(&mut self, threads: usize) {
        self.threads = threads;
    }

    /// Accumulates extra compiler flags, passed through verbatim.
    pub fn cc(&mut self, flags: &str) {
        if !self.extra_flags.is_empty() {
            self.extra_flags.push(' ');
        }
        self.extra_flags.push_str(flags.trim());
    }

    pub fn precompiled_header(&mut self, header: impl Into<PathBuf>) {
        self.precompiled_header = Some(header.into());
    }

    pub fn precompiled_cpp(&mut self, cpp: impl Into<PathBuf>) {
        self.precompiled_cpp = Some(cpp.into());
    }

    pub fn go(&self) -> Result<()> {
        self.validate()?;
        fs::create_dir_all(&self.out_dir).map_err(|err| BuildError::io(err, &self.out_dir))?;

        let plan = self.plan()?;

        // phase 1: the PCH implementation file compiles strictly before anything else
        for command in &plan.pch_commands {
            let output = process::run_capture("", command)?;
            if !output.is_empty() {
                println!("{output}");
            }
        }

        // phase 2: fan out over the worker pool
        let threads = if self.threads == 0 { num_cpus::get() } else { self.threads };
        run_jobs(plan.jobs, threads)
    }

    fn validate(&self) -> Result<()> {
        if self.files.is_empty() {
            return Err(BuildError::config("No files for Compile()"));
        }
        if self.out_dir.as_os_str().is_empty() {
            return Err(BuildError::config("Missing 'OutDir' for Compile()"));
        }
        for file in &self.files {
            if !file.is_file() {
                return Err(BuildError::config(format!(
                    "Input file \"{}\" for Compile() does not exist",
                    file.display()
                )));
            }
        }
        if self.precompiled_header.is_some() != self.precompiled_cpp.is_some() {
            return Err(BuildError::config(
                "PrecompiledHeader and PrecompiledCpp must be set together for Compile()",
            ));
        }
        Ok(())
    }

    /// Decides what to run: PCH commands first, then one job per out-of-date source.
    fn plan(&self) -> Result<CompilePlan> {
        let toolchain = self.driver.toolchain();
        let prelude = toolchain.setenv_batch_call();
        let mut opts = CompileOptions {
            debug: self.debug,
            crt_static: self.crt_static,
            includes: self.includes.clone(),
            defines: self.defines.clone(),
            extra_flags: self.extra_flags.clone(),
            pch: None,
        };

        let mut plan = CompilePlan::default();

        if let (Some(header), Some(cpp)) = (&self.precompiled_header, &self.precompiled_cpp) {
            let artifact = toolchain.pch_artifact(&self.out_dir, header);
            let object = toolchain.object_file(&self.out_dir, cpp);
            let stale = FileOutOfDate::new(&artifact)
                .add_file(cpp)
                .add_file(header)
                .add_include_dirs(&self.includes)
                .go();
            if stale {
                plan.pch_commands = toolchain
                    .pch_commands(&opts, header, &artifact, cpp, &object)
                    .into_iter()
                    .map(|cmd| process::with_prelude(&prelude, &cmd))
                    .collect();
            }
            opts.pch = Some((header.clone(), artifact));
        }

        for file in &self.files {
            if Some(file) == self.precompiled_cpp.as_ref() {
                continue;
            }
            let object = toolchain.object_file(&self.out_dir, file);
            let stale = FileOutOfDate::new(&object)
                .add_file(file)
                .add_include_dirs(&self.includes)
                .go();
            if !stale {
                trace!(file = %file.display(), "up to date");
                continue;
            }
            let command = toolchain.compile_command(&opts, file, &object);
            plan.jobs.push(CompileJob {
                file: file.clone(),
                command: process::with_prelude(&prelude, &command),
            });
        }

        debug!(
            pch = plan.pch_commands.len(),
            jobs = plan.jobs.len(),
            "compile plan ready"
        );
        Ok(plan)
    }
}

/// Runs the jobs on a pool of `threads` workers and reports the results.
///
/// Jobs are submitted in declared order; completion order is unspecified. All
/// outstanding work is drained before the overall verdict, so every failing file
/// gets its diagnostics printed.
fn run_jobs(jobs: Vec<CompileJob>, threads: usize) -> Result<()> {
    if jobs.is_empty() {
        return Ok(());
    }
    let total = jobs.len();
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|err| BuildError::msg(format!("error creating worker pool: {err}")))?;

    let (tx, rx) = mpsc::channel();
    for job in jobs {
        let tx = tx.clone();
        pool.spawn(move || {
            let result = process::run_status_capture("", &job.command);
            let _ = tx.send((job, result));
        });
    }
    drop(tx);

    // single reporter: per-file output stays contiguous, printed as workers finish
    let mut failed = 0usize;
    for (job, result) in rx {
        println!("{}", job.file.display());
        match result {
            Ok((status, output)) => {
                if !output.is_empty() {
                    println!("{output}");
                }
                if !status.success() {
                    failed += 1;
                }
            }
            Err(err) => {
                println!("{err}");
                failed += 1;
            }
        }
    }

    if failed > 0 {
        return Err(BuildError::msg(format!("{failed} of {total} file(s) failed to compile")));
    }
    Ok(())
}
