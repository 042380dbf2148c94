//! End-to-end tests of the script host.

use fbuild::{BuildError, ScriptHost};
use once_cell::sync::Lazy;
use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

/// The process working directory is shared test state; every test that moves it
/// takes this lock first.
fn cwd_lock() -> MutexGuard<'static, ()> {
    static LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));
    LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn host() -> ScriptHost {
    ScriptHost::new(&[])
}

/// Path rendered for embedding into a script string literal.
fn script_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn canonical(path: &Path) -> PathBuf {
    dunce::canonicalize(path).unwrap()
}

#[test]
fn sub_build_restores_cwd_on_script_error() {
    let _guard = cwd_lock();
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("sub")).unwrap();
    fs::write(dir.path().join("sub/FBuild.js"), r#"throw "sub build exploded";"#).unwrap();

    let saved = env::current_dir().unwrap();
    env::set_current_dir(dir.path()).unwrap();

    let err = host().run(r#"Build("sub");"#).unwrap_err();
    assert!(matches!(err, BuildError::Script(_)), "{err}");
    assert!(err.to_string().contains("sub build exploded"), "{err}");
    assert_eq!(env::current_dir().unwrap(), canonical(dir.path()));

    env::set_current_dir(saved).unwrap();
}

#[test]
fn sub_build_runs_in_its_directory_and_shares_state() {
    let _guard = cwd_lock();
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("sub")).unwrap();
    fs::write(
        dir.path().join("sub/FBuild.js"),
        r#"
        StringToFile("from-sub.txt", "ran");
        ToolChain("Clang", "x86");
        "#,
    )
    .unwrap();

    let saved = env::current_dir().unwrap();
    env::set_current_dir(dir.path()).unwrap();

    let host = host();
    host.run(r#"Build("sub");"#).unwrap();

    // the sub script ran with its own directory as CWD, which is restored after
    assert!(dir.path().join("sub/from-sub.txt").exists());
    assert_eq!(env::current_dir().unwrap(), canonical(dir.path()));
    // toolchain selection made by the sub-build survives into the parent
    assert_eq!(host.driver().toolchain().to_string(), "Clang, x86");

    env::set_current_dir(saved).unwrap();
}

#[test]
fn build_of_directory_without_script_fails_and_restores_cwd() {
    let _guard = cwd_lock();
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("empty")).unwrap();

    let saved = env::current_dir().unwrap();
    env::set_current_dir(dir.path()).unwrap();

    assert!(host().run(r#"Build("empty");"#).is_err());
    assert_eq!(env::current_dir().unwrap(), canonical(dir.path()));

    env::set_current_dir(saved).unwrap();
}

#[test]
fn compile_of_missing_source_fails_without_invoking_a_compiler() {
    let dir = tempfile::tempdir().unwrap();
    let script = format!(
        r#"
        let c = Compile();
        c.OutDir("{out}");
        c.AddFile("{src}");
        c.Go();
        "#,
        out = script_path(&dir.path().join("out")),
        src = script_path(&dir.path().join("a.cpp")),
    );
    let err = host().run(&script).unwrap_err();
    assert!(err.to_string().contains("does not exist"), "{err}");
}

#[test]
fn glob_returns_only_matching_regular_files() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("src");
    fs::create_dir(&src).unwrap();
    fs::write(src.join("a.cpp"), "").unwrap();
    fs::write(src.join("b.cpp"), "").unwrap();
    fs::write(src.join("c.h"), "").unwrap();

    let result = dir.path().join("count.txt");
    let script = format!(
        r#"
        let files = Glob("{dir}", "*.cpp");
        StringToFile("{out}", files.len().to_string());
        "#,
        dir = script_path(&src),
        out = script_path(&result),
    );
    host().run(&script).unwrap();
    assert_eq!(fs::read_to_string(&result).unwrap(), "2");
}

#[test]
fn file_out_of_date_sees_transitive_headers() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("in.cpp");
    let header = dir.path().join("h.h");
    let parent = dir.path().join("out.o");

    fs::write(&source, "#include \"h.h\"\n").unwrap();
    fs::write(&header, "").unwrap();
    std::thread::sleep(std::time::Duration::from_millis(20));
    fs::write(&parent, "obj").unwrap();

    let check = format!(
        r#"
        if FileOutOfDate("{parent}", "{source}") {{ throw "should be up to date"; }}
        "#,
        parent = script_path(&parent),
        source = script_path(&source),
    );
    host().run(&check).unwrap();

    std::thread::sleep(std::time::Duration::from_millis(20));
    fs::write(&header, "// newer").unwrap();

    let check = format!(
        r#"
        if !FileOutOfDate("{parent}", "{source}") {{ throw "should be out of date"; }}
        "#,
        parent = script_path(&parent),
        source = script_path(&source),
    );
    host().run(&check).unwrap();
}

#[test]
fn file_to_cpp_emits_the_documented_shape() {
    let dir = tempfile::tempdir().unwrap();
    let infile = dir.path().join("x.bin");
    let outfile = dir.path().join("x.cpp");
    fs::write(&infile, [0x01u8, 0x02, 0xFF]).unwrap();

    let script = format!(
        r#"
        let f = FileToCpp();
        f.Infile("{infile}");
        f.Outfile("{outfile}");
        f.NameForArray("X");
        f.TerminatingNull(true);
        f.VarConst(true);
        f.Go();
        "#,
        infile = script_path(&infile),
        outfile = script_path(&outfile),
    );
    host().run(&script).unwrap();

    let generated = fs::read_to_string(&outfile).unwrap();
    assert!(generated.contains("const char X[] = { 1,2,255,0 };"), "{generated}");
    assert!(generated.contains("const char* XPtr = X;"), "{generated}");
}

#[test]
fn run_captures_tool_output() {
    let script = r#"
        ToolChain("GCC", "x64");
        let out = Run("echo captured", true);
        if out != "captured" { throw "unexpected: " + out; }
    "#;
    host().run(script).unwrap();
}

#[test]
fn system_returns_the_exit_status() {
    let script = r#"
        if System("exit 7") != 7 { throw "wrong status"; }
    "#;
    host().run(script).unwrap();
}

#[test]
fn env_round_trips_through_the_script() {
    let script = r#"
        SetEnv("FBUILD_TEST_MARKER", "42");
        if GetEnv("FBUILD_TEST_MARKER") != "42" { throw "env not visible"; }
    "#;
    host().run(script).unwrap();
}

#[test]
fn touch_and_delete_manage_files() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("f.txt");
    fs::write(&file, "x").unwrap();

    let script = format!(
        r#"
        Touch("{file}");
        Delete("{file}");
        "#,
        file = script_path(&file),
    );
    host().run(&script).unwrap();
    assert!(!file.exists());

    // touching a missing file is an error, deleting one is not
    let script = format!(r#"Delete("{file}");"#, file = script_path(&file));
    host().run(&script).unwrap();
    let script = format!(r#"Touch("{file}");"#, file = script_path(&file));
    assert!(host().run(&script).is_err());
}

#[test]
fn touch_and_delete_take_any_number_of_paths() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.txt");
    let b = dir.path().join("b.txt");
    let c = dir.path().join("c.txt");
    for file in [&a, &b, &c] {
        fs::write(file, "x").unwrap();
    }

    let script = format!(
        r#"
        Touch("{a}", "{b}", "{c}");
        Delete("{a}", "{b}", "{c}");
        "#,
        a = script_path(&a),
        b = script_path(&b),
        c = script_path(&c),
    );
    host().run(&script).unwrap();
    assert!(!a.exists() && !b.exists() && !c.exists());

    // array form for longer lists
    for file in [&a, &b] {
        fs::write(file, "x").unwrap();
    }
    let script = format!(
        r#"Delete(["{a}", "{b}"]);"#,
        a = script_path(&a),
        b = script_path(&b),
    );
    host().run(&script).unwrap();
    assert!(!a.exists() && !b.exists());
}
