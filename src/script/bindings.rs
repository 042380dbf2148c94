//! Script-visible registrations of the task kinds.
//!
//! Every task kind is registered as a type with PascalCase setter methods and a
//! terminal `Go()`; the constructor functions carry the shared [`Driver`] handle into
//! each instance.

use super::rt;
use crate::{
    tasks::{Compile, CopyTask, FileToCpp, Librarian, Linker, Moc, ResourceCompiler, Uic},
    Driver,
};
use rhai::{Array, Engine, EvalAltResult};

pub(crate) fn register_tasks(engine: &mut Engine, driver: &Driver) {
    register_compile(engine, driver);
    register_librarian(engine, driver);
    register_linker(engine, driver);
    register_copy(engine, driver);
    register_file_to_cpp(engine, driver);
    register_per_input_tools(engine, driver);
}

fn strings(values: Array) -> impl Iterator<Item = String> {
    values.into_iter().map(|v| v.to_string())
}

fn register_compile(engine: &mut Engine, driver: &Driver) {
    engine.register_type_with_name::<Compile>("Compile");
    let d = driver.clone();
    engine.register_fn("Compile", move || Compile::new(d.clone()));

    engine.register_fn("Debug", |t: &mut Compile, debug: bool| t.debug(debug));
    engine.register_fn("OutDir", |t: &mut Compile, dir: &str| t.out_dir(dir));
    engine.register_fn("AddInclude", |t: &mut Compile, include: &str| t.add_include(include));
    engine.register_fn("AddDefine", |t: &mut Compile, define: &str| t.add_define(define));
    engine.register_fn("AddFile", |t: &mut Compile, file: &str| t.add_file(file));
    engine.register_fn("AddFiles", |t: &mut Compile, files: Array| {
        for file in strings(files) {
            t.add_file(file);
        }
    });
    engine.register_fn("Threads", |t: &mut Compile, threads: i64| {
        t.threads(threads.max(0) as usize)
    });
    engine.register_fn("CrtStatic", |t: &mut Compile, crt_static: bool| t.crt_static(crt_static));
    engine.register_fn("CC", |t: &mut Compile, flags: &str| t.cc(flags));
    engine.register_fn("PrecompiledHeader", |t: &mut Compile, header: &str| {
        t.precompiled_header(header)
    });
    engine.register_fn("PrecompiledCpp", |t: &mut Compile, cpp: &str| t.precompiled_cpp(cpp));
    engine.register_fn("Go", |t: &mut Compile| -> Result<(), Box<EvalAltResult>> {
        t.go().map_err(rt)
    });
}

fn register_librarian(engine: &mut Engine, driver: &Driver) {
    engine.register_type_with_name::<Librarian>("Librarian");
    let d = driver.clone();
    engine.register_fn("Librarian", move || Librarian::new(d.clone()));

    engine.register_fn("Output", |t: &mut Librarian, output: &str| t.output(output));
    engine.register_fn("AddFile", |t: &mut Librarian, file: &str| t.add_file(file));
    engine.register_fn("AddFiles", |t: &mut Librarian, files: Array| {
        for file in strings(files) {
            t.add_file(file);
        }
    });
    engine.register_fn("DependencyCheck", |t: &mut Librarian, check: bool| {
        t.dependency_check(check)
    });
    engine.register_fn("Go", |t: &mut Librarian| -> Result<(), Box<EvalAltResult>> {
        t.go().map_err(rt)
    });
}

fn register_linker(engine: &mut Engine, driver: &Driver) {
    engine.register_type_with_name::<Linker>("Linker");
    let d = driver.clone();
    engine.register_fn("Linker", move || Linker::new(d.clone()));

    engine.register_fn("Output", |t: &mut Linker, output: &str| t.output(output));
    engine.register_fn("AddFile", |t: &mut Linker, file: &str| t.add_file(file));
    engine.register_fn("AddFiles", |t: &mut Linker, files: Array| {
        for file in strings(files) {
            t.add_file(file);
        }
    });
    engine.register_fn("AddLib", |t: &mut Linker, lib: &str| t.add_lib(lib));
    engine.register_fn("AddLibPath", |t: &mut Linker, path: &str| t.add_lib_path(path));
    engine.register_fn("Shared", |t: &mut Linker, shared: bool| t.shared(shared));
    engine.register_fn("DebugInfo", |t: &mut Linker, debug: bool| t.debug_info(debug));
    engine.register_fn("DependencyCheck", |t: &mut Linker, check: bool| t.dependency_check(check));
    engine.register_fn("Go", |t: &mut Linker| -> Result<(), Box<EvalAltResult>> {
        t.go().map_err(rt)
    });
}

fn register_copy(engine: &mut Engine, driver: &Driver) {
    engine.register_type_with_name::<CopyTask>("Copy");
    let d = driver.clone();
    engine.register_fn("Copy", move || CopyTask::new(d.clone()));

    engine.register_fn("Source", |t: &mut CopyTask, pattern: &str| t.source(pattern));
    engine.register_fn("Destination", |t: &mut CopyTask, dir: &str| t.destination(dir));
    engine.register_fn("Recursive", |t: &mut CopyTask, recursive: bool| t.recursive(recursive));
    engine.register_fn("Overwrite", |t: &mut CopyTask, overwrite: bool| t.overwrite(overwrite));
    engine.register_fn("Go", |t: &mut CopyTask| -> Result<(), Box<EvalAltResult>> {
        t.go().map_err(rt)
    });
}

fn register_file_to_cpp(engine: &mut Engine, driver: &Driver) {
    engine.register_type_with_name::<FileToCpp>("FileToCpp");
    let d = driver.clone();
    engine.register_fn("FileToCpp", move || FileToCpp::new(d.clone()));

    engine.register_fn("Infile", |t: &mut FileToCpp, infile: &str| t.infile(infile));
    engine.register_fn("Outfile", |t: &mut FileToCpp, outfile: &str| t.outfile(outfile));
    engine.register_fn("NameForArray", |t: &mut FileToCpp, name: &str| t.name_for_array(name));
    engine.register_fn("NameForPtr", |t: &mut FileToCpp, name: &str| t.name_for_ptr(name));
    engine.register_fn("Namespace", |t: &mut FileToCpp, ns: &str| t.namespace(ns));
    engine.register_fn("VarConst", |t: &mut FileToCpp, var_const: bool| t.var_const(var_const));
    engine.register_fn("TerminatingNull", |t: &mut FileToCpp, null: bool| {
        t.terminating_null(null)
    });
    engine.register_fn("Intro", |t: &mut FileToCpp, intro: &str| t.intro(intro));
    engine.register_fn("Outro", |t: &mut FileToCpp, outro: &str| t.outro(outro));
    engine.register_fn("Additional", |t: &mut FileToCpp, text: &str| t.additional(text));
    engine.register_fn("DependencyCheck", |t: &mut FileToCpp, check: bool| {
        t.dependency_check(check)
    });
    engine.register_fn("Go", |t: &mut FileToCpp| -> Result<(), Box<EvalAltResult>> {
        t.go().map_err(rt)
    });
}

fn register_per_input_tools(engine: &mut Engine, driver: &Driver) {
    engine.register_type_with_name::<Moc>("Moc");
    let d = driver.clone();
    engine.register_fn("Moc", move || Moc::new(d.clone()));
    engine.register_fn("AddFile", |t: &mut Moc, file: &str| t.add_file(file));
    engine.register_fn("OutDir", |t: &mut Moc, dir: &str| t.out_dir(dir));
    engine.register_fn("Go", |t: &mut Moc| -> Result<(), Box<EvalAltResult>> {
        t.go().map_err(rt)
    });

    engine.register_type_with_name::<Uic>("Uic");
    let d = driver.clone();
    engine.register_fn("Uic", move || Uic::new(d.clone()));
    engine.register_fn("AddFile", |t: &mut Uic, file: &str| t.add_file(file));
    engine.register_fn("OutDir", |t: &mut Uic, dir: &str| t.out_dir(dir));
    engine.register_fn("Go", |t: &mut Uic| -> Result<(), Box<EvalAltResult>> {
        t.go().map_err(rt)
    });

    engine.register_type_with_name::<ResourceCompiler>("ResourceCompiler");
    let d = driver.clone();
    engine.register_fn("ResourceCompiler", move || ResourceCompiler::new(d.clone()));
    engine.register_fn("AddFile", |t: &mut ResourceCompiler, file: &str| t.add_file(file));
    engine.register_fn("OutDir", |t: &mut ResourceCompiler, dir: &str| t.out_dir(dir));
    engine.register_fn("Go", |t: &mut ResourceCompiler| -> Result<(), Box<EvalAltResult>> {
        t.go().map_err(rt)
    });
}

#[cfg(test)]
mod tests {
    use crate::ScriptHost;

    #[test]
    fn tasks_are_constructible_and_configurable_from_scripts() {
        let host = ScriptHost::new(&[]);
        host.run(
            r#"
            let c = Compile();
            c.Debug(true);
            c.OutDir("out");
            c.AddInclude("include");
            c.AddDefine("NDEBUG");
            c.Threads(2);
            c.CC("-Wall");

            let lib = Librarian();
            lib.Output("out/core.a");

            let link = Linker();
            link.Output("out/app");
            link.Shared(false);

            let cp = Copy();
            cp.Source("*.dll");
            cp.Destination("out");

            let f2c = FileToCpp();
            f2c.Infile("logo.png");
            f2c.NameForArray("Logo");

            let moc = Moc();
            moc.OutDir("gen");
        "#,
        )
        .unwrap();
    }

    #[test]
    fn running_an_unconfigured_task_raises_a_script_error() {
        let host = ScriptHost::new(&[]);
        let err = host.run("let c = Compile(); c.Go();").unwrap_err();
        assert!(err.to_string().contains("No files for Compile()"), "{err}");
    }
}
