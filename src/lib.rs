//! A scriptable incremental build driver for C/C++ projects.
//!
//! Build descriptions are written in a small embedded scripting language and evaluated
//! by the [`ScriptHost`], which injects filesystem and process primitives, toolchain
//! selection, out-of-date queries and the task-kind constructors (compile, archive,
//! link, copy, code generation). Task actions consult the [`FileOutOfDate`] oracle to
//! decide work, ask the selected [`Toolchain`] for command lines and execute them
//! through the OS shell; the compile task fans out over a worker pool.

#![deny(unused_must_use, rust_2018_idioms)]

#[macro_use]
extern crate tracing;

pub mod error;
pub mod outofdate;
pub mod process;
pub mod script;
pub mod tasks;
pub mod toolchain;
pub mod utils;

pub use error::{BuildError, Result};
pub use outofdate::FileOutOfDate;
pub use script::ScriptHost;
pub use toolchain::{Platform, Toolchain, ToolchainId};

use std::{cell::RefCell, rc::Rc};

/// The well-known build-script filename resolved by the driver and by `Build()`.
pub const BUILD_SCRIPT_FILE: &str = "FBuild.js";

/// Owner of the process-wide build state.
///
/// The script host threads a cheap clone of this through every builtin and task, so
/// the toolchain registry has a single owner instead of a global. Only the
/// interpreter thread ever touches it; compile workers receive fully formed command
/// strings at dispatch time.
#[derive(Clone, Debug, Default)]
pub struct Driver {
    toolchain: Rc<RefCell<Toolchain>>,
}

impl Driver {
    pub fn new() -> Self {
        Self::default()
    }

    /// The currently selected toolchain.
    pub fn toolchain(&self) -> Toolchain {
        *self.toolchain.borrow()
    }

    pub fn set_toolchain_id(&self, id: ToolchainId) {
        self.toolchain.borrow_mut().set_id(id);
    }

    pub fn set_platform(&self, platform: Platform) {
        self.toolchain.borrow_mut().set_platform(platform);
    }
}
