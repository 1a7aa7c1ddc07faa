//! Name decals painted onto the cake top.
//!
//! [`layout`] is pure geometry and is testable without fonts; [`compositor`] rasterizes it.

pub mod compositor;
pub mod layout;
