//! CLI command handlers. Each command is in its own file.

mod checksum;
mod completions;
mod config;
mod upload;

pub use checksum::run_checksum;
pub use completions::run_completions;
pub use config::run_config;
pub use upload::{run_upload, UploadOptions};
