//! The configurator wizard: one controller per stage.

pub mod controller;
