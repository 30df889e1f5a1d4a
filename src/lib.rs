//! sysprep library
//!
//! Platform-dispatching installer framework: detect the host, resolve an
//! ordered plan of setup actions, translate each one for the host's package
//! manager and run them one at a time.

pub mod action;
pub mod cli;
pub mod config_file;
pub mod error;
pub mod executor;
pub mod platform;
pub mod policy;
pub mod process;
pub mod registry;
pub mod report;
pub mod runner;
pub mod sanity;
pub mod types;

// Re-export main types for convenience
pub use action::{
    Action, ConcreteCommand, Guard, Invocation, PackageOverride, PackageOverrides, Payload,
    RedhatManager, Translator,
};
pub use config_file::SetupConfig;
pub use error::{Result, SetupError};
pub use executor::{ActionResult, ExecutionReport, Executor, ExecutorOptions};
pub use platform::{detect, PlatformInfo};
pub use registry::{Phase, PhaseRegistry, PhaseSlot, COMMON_FIRST, COMMON_LAST};
pub use runner::{CommandOutput, CommandRunner, SystemRunner};
pub use types::{ActionKind, ActionOption, Family, Outcome};
