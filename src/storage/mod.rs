//! Local storage module
//!
//! Handles the on-disk media library: attachment files and their
//! thumbnail renditions.

mod library;

pub use library::MediaLibrary;
