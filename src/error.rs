// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Error types

use std::time::Duration;
use thiserror::Error;

/// Errors raised by the simulation and decision layers
#[derive(Error, Debug)]
pub enum Error {
    /// Machine id was never registered with the manager
    #[error("Machine {0} not registered")]
    NotRegistered(String),

    /// A scoring model call returned an error
    #[error("Model '{model}' failed: {message}")]
    ModelFailure {
        model: &'static str,
        message: String,
    },

    /// A scoring model call did not finish in time
    #[error("Model '{model}' timed out after {timeout:?}")]
    ModelTimeout {
        model: &'static str,
        timeout: Duration,
    },

    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),

    #[error(transparent)]
    TomlSer(#[from] toml::ser::Error),
}

/// Result alias for library operations
pub type Result<T> = std::result::Result<T, Error>;
