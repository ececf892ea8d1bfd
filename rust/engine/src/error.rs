// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the conversion engine
//!
//! Malformed plan entries never produce an error: they are skipped and
//! counted. Only failures that make the whole pass untrustworthy surface
//! here, and the caller keeps its previous state when one does.

use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a conversion pass
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Face traversal did not close after {steps} steps")]
    TraversalLimit { steps: usize },

    #[error("Degenerate room geometry: {0}")]
    DegenerateRoom(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }

    pub fn degenerate_room(msg: impl Into<String>) -> Self {
        Error::DegenerateRoom(msg.into())
    }
}
