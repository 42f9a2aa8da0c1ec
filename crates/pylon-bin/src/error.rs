// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Binary-level error type.

use thiserror::Error;

use pylon_config::ConfigError;

/// Result alias for the gateway binary.
pub type BinResult<T> = Result<T, BinError>;

/// Fatal errors of the gateway binary.
#[derive(Debug, Error)]
pub enum BinError {
    /// Configuration could not be loaded or is invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}
