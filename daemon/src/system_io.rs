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

//! Error Wrapping File System I/O Helpers
//!
//! This module provides convenient wrappers around standard Rust file system operations,
//! with automatic conversion to `AccelError` types. All functions include trace logging
//! for debugging and provide detailed error context including file paths and operation types.
//!
//! Includes: blocking read, bounded asynchronous read, and directory operations.
//!
//! # Examples
//!
//! ```rust,no_run
//! # use accelplug::system_io::{fs_read, fs_read_dir};
//! # use std::path::Path;
//!
//! # fn example() -> Result<(), accelplug::error::AccelError> {
//! // Read a sysfs attribute
//! let afu_id = fs_read(Path::new("/sys/bus/platform/devices/dfl-port.0/afu_id"))?;
//!
//! // List device nodes
//! let nodes = fs_read_dir(Path::new("/dev"))?;
//! # Ok(())
//! # }
//! ```

use crate::error::AccelError;
use log::trace;
use std::fs::OpenOptions;
use std::fs::create_dir_all;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Read the contents of a file to a String.
///
/// This is a convenient wrapper around `std::fs::File::read_to_string` that provides
/// trace logging and automatic error conversion to `AccelError::IORead`.
///
/// # Arguments
///
/// * `file_path` - Path to the file to read
///
/// # Returns: `Result<String, AccelError>`
/// * `Ok(String)` - The complete contents of the file
/// * `Err(AccelError::IORead)` - If the file cannot be read (doesn't exist, permissions, etc.)
pub fn fs_read(file_path: &Path) -> Result<String, AccelError> {
    trace!("Attempting to read from {file_path:?}");
    let mut buf: String = String::new();
    let result = OpenOptions::new()
        .read(true)
        .open(file_path)
        .and_then(|mut f| f.read_to_string(&mut buf));

    match result {
        Ok(_) => {
            trace!("Reading done");
            Ok(buf)
        }
        Err(e) => Err(AccelError::IORead {
            file: file_path.into(),
            e,
        }),
    }
}

/// Read a sysfs style attribute and strip the trailing newline and any NUL terminator.
///
/// Driver virtual files often end with `\n` or are NUL terminated instead of EOF terminated.
pub fn fs_read_attr(file_path: &Path) -> Result<String, AccelError> {
    fs_read(file_path).map(|s| s.trim_end_matches(['\n', '\0']).trim().to_string())
}

/// Read the contents of a file to a String without blocking the runtime for longer than
/// `limit`.
///
/// # Returns: `Result<String, AccelError>`
/// * `Ok(String)` - The complete contents of the file
/// * `Err(AccelError::IORead)` - If the file cannot be read
/// * `Err(AccelError::Timeout)` - If the read did not complete within `limit`
pub async fn fs_read_bounded(file_path: &Path, limit: Duration) -> Result<String, AccelError> {
    trace!("Attempting to read from {file_path:?} within {limit:?}");
    match tokio::time::timeout(limit, tokio::fs::read_to_string(file_path)).await {
        Ok(Ok(contents)) => {
            trace!("Reading done");
            Ok(contents)
        }
        Ok(Err(e)) => Err(AccelError::IORead {
            file: file_path.into(),
            e,
        }),
        Err(_) => Err(AccelError::Timeout {
            what: format!("reading {file_path:?}"),
            after: limit,
        }),
    }
}

/// Recursively create directories up to the specified path.
///
/// This is a convenient wrapper around `std::fs::create_dir_all` that provides trace
/// logging and automatic error conversion to `AccelError::IOCreate`. It will create all
/// missing parent directories in the path.
///
/// # Arguments
///
/// * `path` - The directory path to create (including all parents)
///
/// # Returns: `Result<(), AccelError>`
/// * `Ok(())` - Directory created (or already existed)
/// * `Err(AccelError::IOCreate)` - If directory creation fails (permissions, etc.)
pub fn fs_create_dir(path: &Path) -> Result<(), AccelError> {
    trace!("Attempting to Create '{path:?}'");
    let result = create_dir_all(path);
    match result {
        Ok(_) => {
            trace!("Directory created at {path:?}.");
            Ok(())
        }
        Err(e) => Err(AccelError::IOCreate {
            file: path.into(),
            e,
        }),
    }
}

/// Read the contents of a directory and return entry names.
///
/// This is a convenient wrapper around `std::fs::read_dir` that provides trace logging,
/// automatic error conversion to `AccelError::IOReadDir`, and returns a vector of entry
/// names (not full paths), sorted so callers see a stable order. Entries that cannot be read
/// are silently skipped.
///
/// # Arguments
///
/// * `dir` - The directory path to list
///
/// # Returns: `Result<Vec<String>, AccelError>`
/// * `Ok(Vec<String>)` - List of entry names in the directory (files and subdirectories)
/// * `Err(AccelError::IOReadDir)` - If the directory cannot be read (doesn't exist, permissions, etc.)
pub fn fs_read_dir(dir: &Path) -> Result<Vec<String>, AccelError> {
    trace!("Attempting to read directory '{dir:?}'");
    std::fs::read_dir(dir).map_or_else(
        |e| {
            Err(AccelError::IOReadDir {
                dir: dir.to_owned(),
                e,
            })
        },
        |iter| {
            let mut ret: Vec<String> = iter
                .filter_map(Result::ok)
                .map(|entry| entry.file_name().to_string_lossy().into_owned())
                .collect();
            ret.sort();
            trace!("Dir reading done.");
            Ok(ret)
        },
    )
}

/// Resolve all symlinks in `path`, as sysfs class and bus entries are links into the device
/// hierarchy.
pub fn fs_canonicalize(path: &Path) -> Result<PathBuf, AccelError> {
    trace!("Attempting to canonicalize '{path:?}'");
    std::fs::canonicalize(path).map_err(|e| AccelError::IORead {
        file: path.into(),
        e,
    })
}
