//! Command implementations.

mod process;
mod serve;
mod validate;

pub use process::run_process;
pub use serve::run_serve;
pub use validate::run_validate;
