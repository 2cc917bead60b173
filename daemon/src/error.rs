// This file is part of accelplug, an application to expose accelerator hardware to container orchestrators and to manage FPGA bitstreams.
//
// Copyright 2025 Canonical Ltd.
//
// SPDX-License-Identifier: GPL-3.0-only
//
// accelplug is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License version 3, as published by the Free Software Foundation.
//
// accelplug is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranties of MERCHANTABILITY, SATISFACTORY QUALITY, or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with this program.  If not, see http://www.gnu.org/licenses/.

//! The error type shared by every component of accelplug.
//!
//! Each variant's display string starts with its own name (e.g. `AccelError::Parse:`) so that
//! operators and tests can tell the failure class apart without access to the type itself, for
//! example when the error has travelled over DBus or been printed by the CLI.

use log::error;
use std::path::PathBuf;
use std::time::Duration;
use zbus::fdo;

#[derive(Debug, thiserror::Error)]
pub enum AccelError {
    #[error("AccelError::Argument: {0}")]
    Argument(String),
    #[error("AccelError::Parse: Failed to parse {file:?}: {msg}")]
    Parse { file: PathBuf, msg: String },
    #[error("AccelError::Consistency: {0}")]
    Consistency(String),
    #[error("AccelError::Command: `{cmd}` failed: {msg}")]
    Command { cmd: String, msg: String },
    #[error("AccelError::Timeout: {what} did not complete within {after:?}")]
    Timeout { what: String, after: Duration },
    #[error("AccelError::IORead: An IO error occurred when reading from {file:?}: {e}")]
    IORead { file: PathBuf, e: std::io::Error },
    #[error("AccelError::IOWrite: An IO error occurred when writing to {file:?}: {e}")]
    IOWrite { file: PathBuf, e: std::io::Error },
    #[error("AccelError::IOCreate: An IO error occurred when creating {file:?}: {e}")]
    IOCreate { file: PathBuf, e: std::io::Error },
    #[error("AccelError::IOReadDir: An IO error occurred when reading directory {dir:?}: {e}")]
    IOReadDir { dir: PathBuf, e: std::io::Error },
    #[error(
        "AccelError::IOExists: Destination file {file:?} already exists. Use --force to overwrite it"
    )]
    IOExists { file: PathBuf },
    #[error("AccelError::Bitstream: {file:?} is not a valid bitstream: {msg}")]
    Bitstream { file: PathBuf, msg: String },
    #[error("AccelError::Hardware: {0}")]
    Hardware(String),
    #[error("AccelError::Internal: An Internal error occurred: {0}")]
    Internal(String),
}

impl From<AccelError> for fdo::Error {
    fn from(err: AccelError) -> Self {
        error!("{err}");
        match err {
            AccelError::Argument(..) => fdo::Error::InvalidArgs(err.to_string()),
            AccelError::IORead { .. } => fdo::Error::IOError(err.to_string()),
            AccelError::IOWrite { .. } => fdo::Error::IOError(err.to_string()),
            AccelError::IOCreate { .. } => fdo::Error::IOError(err.to_string()),
            AccelError::IOReadDir { .. } => fdo::Error::IOError(err.to_string()),
            AccelError::IOExists { .. } => fdo::Error::IOError(err.to_string()),
            _ => fdo::Error::Failed(err.to_string()),
        }
    }
}
