//! Shared helpers: Arrow column access, file I/O and logging.

pub mod arrow;
pub mod io;
pub mod logging;
