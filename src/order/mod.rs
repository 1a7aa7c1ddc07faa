//! Order export and hand-off.

pub mod submit;
