use std::{env, path::Path, process};

use fbuild::{ScriptHost, BUILD_SCRIPT_FILE};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let host = ScriptHost::new(&args);

    if let Err(err) = host.run_file(Path::new(BUILD_SCRIPT_FILE)) {
        eprintln!("fbuild: {err}");
        process::exit(1);
    }
}
