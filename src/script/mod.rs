//! The embedded script host.
//!
//! Build descriptions are rhai scripts. At initialisation the host injects the
//! filesystem and process primitives, the toolchain registry, the out-of-date query,
//! the sub-build driver and the task-kind constructors into the engine, plus a
//! read-only `args` map built from the driver's free-form argument strings.
//!
//! Builtin failures are raised as script-level runtime errors; uncaught errors
//! propagate out of the evaluation and surface as [`BuildError::Script`].

mod bindings;

use crate::{
    error::{BuildError, Result},
    outofdate::FileOutOfDate,
    process,
    toolchain::{Platform, ToolchainId},
    utils, Driver, BUILD_SCRIPT_FILE,
};
use rhai::{Array, Dynamic, Engine, EvalAltResult, Map, Module, NativeCallContext};
use std::{env, fs, path::Path};

/// Maps any error into a script-level runtime error.
pub(crate) fn rt(err: impl std::fmt::Display) -> Box<EvalAltResult> {
    err.to_string().into()
}

/// The embedded interpreter with the injected build globals.
pub struct ScriptHost {
    engine: Engine,
    driver: Driver,
}

impl ScriptHost {
    /// Creates a host, splitting each argument into an `args` entry on the first
    /// `:` or `=`; bare arguments map to the empty string.
    pub fn new(args: &[String]) -> Self {
        let driver = Driver::new();
        let mut engine = Engine::new();

        let mut globals = Module::new();
        globals.set_var("args", parse_args(args));
        engine.register_global_module(globals.into());

        register_builtins(&mut engine, &driver);
        bindings::register_tasks(&mut engine, &driver);

        Self { engine, driver }
    }

    /// The process-wide build state shared with every builtin.
    pub fn driver(&self) -> &Driver {
        &self.driver
    }

    /// Evaluates a build script file.
    pub fn run_file(&self, script: &Path) -> Result<()> {
        if !script.exists() {
            return Err(BuildError::msg(format!("File {} does not exist", script.display())));
        }
        let script = utils::canonicalize(script)?;
        debug!(script = %script.display(), "evaluating build script");
        let contents = fs::read_to_string(&script).map_err(|err| BuildError::io(err, &script))?;
        self.run(&contents)
    }

    /// Evaluates a script fragment.
    pub fn run(&self, code: &str) -> Result<()> {
        self.engine.run(code).map_err(|err| BuildError::Script(err.to_string()))
    }
}

/// Splits driver arguments into the script-visible `args` map.
fn parse_args(args: &[String]) -> Map {
    let mut map = Map::new();
    for arg in args {
        let pos = arg.find(':').or_else(|| arg.find('='));
        match pos {
            None => {
                map.insert(arg.as_str().into(), Dynamic::from(String::new()));
            }
            Some(pos) => {
                let (key, value) = arg.split_at(pos);
                map.insert(key.into(), Dynamic::from(value[1..].to_string()));
            }
        }
    }
    map
}

/// Injects the free-function globals of the build language.
fn register_builtins(engine: &mut Engine, driver: &Driver) {
    // Quit
    engine.register_fn("Quit", || -> () { std::process::exit(0) });
    engine.register_fn("Quit", |code: i64| -> () { std::process::exit(code as i32) });

    // Print joins its arguments by spaces and appends a newline. The interpreter
    // dispatches on arity, so the variadic builtins are registered once per
    // argument count, with an array form for longer lists.
    macro_rules! register_print {
        ($($arg:ident),*) => {
            engine.register_fn("Print", |$($arg: Dynamic),*| {
                let parts: Vec<String> = vec![$($arg.to_string()),*];
                println!("{}", parts.join(" "));
            });
        };
    }
    register_print!();
    register_print!(a);
    register_print!(a, b);
    register_print!(a, b, c);
    register_print!(a, b, c, d);
    register_print!(a, b, c, d, e);
    register_print!(a, b, c, d, e, f);
    register_print!(a, b, c, d, e, f, g);
    register_print!(a, b, c, d, e, f, g, h);
    engine.register_fn("Print", |args: Array| {
        let parts: Vec<String> = args.into_iter().map(|a| a.to_string()).collect();
        println!("{}", parts.join(" "));
    });

    // nested evaluation in the same interpreter
    engine.register_fn("ExecuteString", |ctx: NativeCallContext<'_>, code: &str| {
        ctx.engine().run(code)
    });
    engine.register_fn("ExecuteString", |ctx: NativeCallContext<'_>, code: &str, _name: &str| {
        ctx.engine().run(code)
    });
    engine.register_fn(
        "ExecuteFile",
        |ctx: NativeCallContext<'_>, file: &str| -> Result<(), Box<EvalAltResult>> {
            let path = utils::canonicalize(Path::new(file)).map_err(rt)?;
            let contents =
                fs::read_to_string(&path).map_err(|err| rt(BuildError::io(err, &path)))?;
            ctx.engine().run(&contents)
        },
    );

    engine.register_fn("System", |cmd: &str| -> Result<i64, Box<EvalAltResult>> {
        Ok(process::system(cmd).map_err(rt)? as i64)
    });

    // Run prepends the toolchain env prelude; with capture it returns the output
    let d = driver.clone();
    engine.register_fn("Run", move |cmd: &str| -> Result<(), Box<EvalAltResult>> {
        process::run(&d.toolchain().setenv_batch_call(), cmd).map_err(rt)
    });
    let d = driver.clone();
    engine.register_fn("Run", move |cmd: &str, capture: bool| -> Result<Dynamic, Box<EvalAltResult>> {
        let prelude = d.toolchain().setenv_batch_call();
        if capture {
            Ok(process::run_capture(&prelude, cmd).map_err(rt)?.into())
        } else {
            process::run(&prelude, cmd).map_err(rt)?;
            Ok(Dynamic::UNIT)
        }
    });

    engine.register_fn("FullPath", |path: &str| -> Result<String, Box<EvalAltResult>> {
        Ok(utils::canonicalize(Path::new(path)).map_err(rt)?.to_string_lossy().to_string())
    });

    // Delete and Touch take any number of paths; Delete is the sole builtin whose
    // per-item errors are swallowed
    macro_rules! register_paths_variadic {
        ($name:literal, $f:ident) => {
            engine.register_fn($name, |p1: &str| $f(&[p1]));
            engine.register_fn($name, |p1: &str, p2: &str| $f(&[p1, p2]));
            engine.register_fn($name, |p1: &str, p2: &str, p3: &str| $f(&[p1, p2, p3]));
            engine.register_fn($name, |p1: &str, p2: &str, p3: &str, p4: &str| {
                $f(&[p1, p2, p3, p4])
            });
            engine.register_fn($name, |p1: &str, p2: &str, p3: &str, p4: &str, p5: &str| {
                $f(&[p1, p2, p3, p4, p5])
            });
            engine.register_fn(
                $name,
                |p1: &str, p2: &str, p3: &str, p4: &str, p5: &str, p6: &str| {
                    $f(&[p1, p2, p3, p4, p5, p6])
                },
            );
            engine.register_fn(
                $name,
                |p1: &str, p2: &str, p3: &str, p4: &str, p5: &str, p6: &str, p7: &str| {
                    $f(&[p1, p2, p3, p4, p5, p6, p7])
                },
            );
            engine.register_fn(
                $name,
                |p1: &str, p2: &str, p3: &str, p4: &str, p5: &str, p6: &str, p7: &str, p8: &str| {
                    $f(&[p1, p2, p3, p4, p5, p6, p7, p8])
                },
            );
            engine.register_fn($name, |paths: Array| -> Result<(), Box<EvalAltResult>> {
                let paths: Vec<String> = paths.into_iter().map(|p| p.to_string()).collect();
                let paths: Vec<&str> = paths.iter().map(String::as_str).collect();
                $f(&paths)
            });
        };
    }

    fn delete_paths(paths: &[&str]) -> Result<(), Box<EvalAltResult>> {
        utils::delete_all(paths.iter().map(|p| Path::new(*p)));
        Ok(())
    }
    fn touch_paths(paths: &[&str]) -> Result<(), Box<EvalAltResult>> {
        for path in paths {
            utils::touch(Path::new(path)).map_err(rt)?;
        }
        Ok(())
    }
    register_paths_variadic!("Delete", delete_paths);
    register_paths_variadic!("Touch", touch_paths);

    engine.register_fn("Glob", |pattern: &str| -> Result<Array, Box<EvalAltResult>> {
        glob_to_array(Path::new("."), pattern)
    });
    engine.register_fn("Glob", |dir: &str, pattern: &str| -> Result<Array, Box<EvalAltResult>> {
        glob_to_array(Path::new(dir), pattern)
    });

    engine.register_fn(
        "StringToFile",
        |file: &str, content: &str| -> Result<(), Box<EvalAltResult>> {
            utils::string_to_file(Path::new(file), content).map_err(rt)
        },
    );

    engine.register_fn("GetEnv", |name: &str| -> Dynamic {
        match env::var(name) {
            Ok(value) => value.into(),
            Err(_) => Dynamic::UNIT,
        }
    });
    engine.register_fn("SetEnv", |name: &str, value: &str| env::set_var(name, value));

    engine.register_fn("ChangeDirectory", |dir: &str| -> Result<(), Box<EvalAltResult>> {
        env::set_current_dir(dir).map_err(|err| rt(BuildError::io(err, dir)))
    });

    engine.register_fn("DirectorySync", |src: &str, dst: &str| -> Result<(), Box<EvalAltResult>> {
        utils::directory_sync(Path::new(src), Path::new(dst)).map_err(rt)
    });

    // FileOutOfDate(parent, input...): the raw oracle query
    engine.register_fn("FileOutOfDate", |parent: &str, input: &str| {
        FileOutOfDate::new(parent).add_file(input).go()
    });
    engine.register_fn("FileOutOfDate", |parent: &str, i1: &str, i2: &str| {
        FileOutOfDate::new(parent).add_file(i1).add_file(i2).go()
    });
    engine.register_fn("FileOutOfDate", |parent: &str, i1: &str, i2: &str, i3: &str| {
        FileOutOfDate::new(parent).add_file(i1).add_file(i2).add_file(i3).go()
    });
    engine.register_fn("FileOutOfDate", |parent: &str, inputs: Array| {
        FileOutOfDate::new(parent).add_files(inputs.into_iter().map(|i| i.to_string())).go()
    });

    // ToolChain() queries; ToolChain(x86|x64) selects the host default toolchain
    let d = driver.clone();
    engine.register_fn("ToolChain", move || d.toolchain().to_string());
    let d = driver.clone();
    engine.register_fn("ToolChain", move |arg: &str| -> Result<(), Box<EvalAltResult>> {
        if let Ok(platform) = arg.parse::<Platform>() {
            d.set_toolchain_id(ToolchainId::host_default());
            d.set_platform(platform);
        } else {
            d.set_toolchain_id(arg.parse::<ToolchainId>().map_err(rt)?);
        }
        Ok(())
    });
    let d = driver.clone();
    engine.register_fn(
        "ToolChain",
        move |id: &str, platform: &str| -> Result<(), Box<EvalAltResult>> {
            d.set_toolchain_id(id.parse::<ToolchainId>().map_err(rt)?);
            d.set_platform(platform.parse::<Platform>().map_err(rt)?);
            Ok(())
        },
    );

    // Build(dir): evaluate dir/FBuild.js with the working directory moved to dir,
    // restored on every exit path
    engine.register_fn(
        "Build",
        |ctx: NativeCallContext<'_>, dir: &str| -> Result<(), Box<EvalAltResult>> {
            let saved = env::current_dir().map_err(rt)?;
            env::set_current_dir(dir).map_err(|err| rt(BuildError::io(err, dir)))?;
            debug!(%dir, "entering sub-build");
            let result = (|| -> Result<(), Box<EvalAltResult>> {
                let script = utils::canonicalize(Path::new(BUILD_SCRIPT_FILE)).map_err(rt)?;
                let contents =
                    fs::read_to_string(&script).map_err(|err| rt(BuildError::io(err, &script)))?;
                ctx.engine().run(&contents)
            })();
            let restored = env::set_current_dir(&saved);
            debug!(%dir, ok = result.is_ok(), "leaving sub-build");
            result?;
            restored.map_err(|err| rt(BuildError::io(err, &saved)))?;
            Ok(())
        },
    );
}

fn glob_to_array(dir: &Path, pattern: &str) -> Result<Array, Box<EvalAltResult>> {
    let files = utils::glob_files(dir, pattern).map_err(rt)?;
    Ok(files.into_iter().map(|p| Dynamic::from(p.to_string_lossy().to_string())).collect())
}
