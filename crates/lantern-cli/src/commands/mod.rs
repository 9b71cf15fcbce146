//! CLI command implementations.

pub mod bookmarks;
pub mod clear;
pub mod index;
pub mod status;
pub mod watch;
