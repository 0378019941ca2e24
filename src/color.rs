//! ANSI escape sequences used when rendering diagnostics.

pub const RED: &str = "\x1b[31m";
pub const END: &str = "\x1b[0m";
