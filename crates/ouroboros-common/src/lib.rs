//! Common utilities for ouroboros
//!
//! This crate provides the error type shared by the ouroboros table layer.

pub mod error;

pub use error::{OrmError, Result};
