//! Task kinds constructed by the build script.
//!
//! Every task follows the same pattern: a builder populated by setter calls from the
//! script, then frozen by `go()`, which validates the configuration, asks the
//! out-of-date oracle whether to run, computes the toolchain command(s) and executes
//! them through the shell.

mod compile;
mod copy;
mod file_to_cpp;
mod link;
mod qt;

pub use compile::Compile;
pub use copy::CopyTask;
pub use file_to_cpp::FileToCpp;
pub use link::{Librarian, Linker};
pub use qt::{Moc, ResourceCompiler, Uic};
