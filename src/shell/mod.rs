//! Shell-level glob support
//!
//! Pathname expansion (C3's glob step) is split out from the word
//! expander proper: `glob_expander` walks the virtual file system to
//! enumerate matches, `glob_helpers` holds the pattern-to-regex and
//! GLOBIGNORE plumbing it depends on.

pub mod glob_expander;
pub mod glob_helpers;
