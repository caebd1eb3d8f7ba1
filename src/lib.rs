pub mod api;
pub mod cli;
pub mod client;
pub mod config;
pub(crate) mod constant;
pub mod error;
pub mod folder;
mod macros;
pub mod util;
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use config::UploadConfig;
pub use folder::{FolderUpload, RunOutcome};
