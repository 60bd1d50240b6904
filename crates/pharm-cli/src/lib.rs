//! Library side of the `pharm` command: logging setup and engine assembly.

pub mod logging;
pub mod pipeline;
