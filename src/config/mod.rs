//! Runtime settings shared by the library and the CLI.

pub mod settings;
