#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::struct_field_names,
    clippy::must_use_candidate,
    clippy::new_without_default,
    clippy::return_self_not_must_use
)]

pub mod app;
pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod handler;
pub mod oracle;
pub mod orchestrator;
pub mod prompt;
pub mod protocol;
pub mod redact;
pub mod store;
pub mod ui;

pub use config::Config;
pub use error::{MendError, Result};
