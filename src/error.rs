//! Error taxonomy for the document model.
//!
//! Four families, matching how failures are surfaced:
//! - `Validation`: a value outside its enumerated domain, rejected at the
//!   point of assignment; the model is left unchanged.
//! - `Structural`: an internal invariant no longer holds (keyframe-span
//!   lookup miss, non-contiguous folder subtree). Indicates a bug in an
//!   earlier mutation, not a caller error.
//! - `NotFound`: an index or item name the caller passed does not resolve.
//! - `Io`: surfaced undecorated from the collaborator ports; never retried.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, XflError>;

/// Errors produced by the document model and its ports.
#[derive(Debug, Error)]
pub enum XflError {
    /// Value outside its enumerated domain (layer type, loop mode, ...).
    #[error("validation: {0}")]
    Validation(String),

    /// Model invariant violation; fatal to the current operation.
    #[error("structural invariant violated: {0}")]
    Structural(String),

    /// Unknown index or item name at a call boundary.
    #[error("not found: {0}")]
    NotFound(String),

    /// I/O failure from a markup/container/media port.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl XflError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn structural(msg: impl Into<String>) -> Self {
        Self::Structural(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
}
