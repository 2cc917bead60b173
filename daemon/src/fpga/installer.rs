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

//! Copies bitstreams to their canonical location below the bitstream directory.
//!
//! The copy is staged in a temporary file next to the destination, synced, then renamed into
//! place, so the canonical path never holds a partially written bitstream.

use crate::error::AccelError;
use crate::fpga::bitstream::{Bitstream, open_bitstream};
use crate::system_io::fs_create_dir;
use log::{debug, info};
use std::fs::File;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Install `bitstream` below `root` at [`Bitstream::install_path`].
///
/// # Arguments
///
/// * `bitstream`: the opened source bitstream
/// * `root`: the bitstream directory, usually `/srv/intel.com/fpga`
/// * `overwrite`: replace an existing file instead of failing
///
/// # Returns: `Result<PathBuf, AccelError>`
/// * `Ok(PathBuf)` - The installed path, whose bytes equal the source
/// * `Err(AccelError::IOExists)` - The destination exists and `overwrite` is false. It is left
///   untouched
/// * `Err(AccelError::IOCreate | AccelError::IORead | AccelError::IOWrite)` - Filesystem failure
pub fn install(
    bitstream: &dyn Bitstream,
    root: &Path,
    overwrite: bool,
) -> Result<PathBuf, AccelError> {
    let destination = bitstream.install_path(root);
    let dir = destination.parent().ok_or_else(|| {
        AccelError::Argument(format!("Install path {destination:?} has no parent directory"))
    })?;
    fs_create_dir(dir)?;
    if !overwrite && destination.exists() {
        return Err(AccelError::IOExists { file: destination });
    }

    let source = bitstream.path();
    let mut reader = File::open(source).map_err(|e| AccelError::IORead {
        file: source.into(),
        e,
    })?;
    let mut staged = NamedTempFile::new_in(dir).map_err(|e| AccelError::IOCreate {
        file: dir.into(),
        e,
    })?;
    let write_error = |e: io::Error| AccelError::IOWrite {
        file: destination.clone(),
        e,
    };
    let copied = io::copy(&mut reader, &mut staged).map_err(write_error)?;
    staged.as_file().sync_all().map_err(write_error)?;
    debug!("Staged {copied} bytes of {source:?} in {:?}", staged.path());

    let persisted = if overwrite {
        staged.persist(&destination)
    } else {
        staged.persist_noclobber(&destination)
    };
    match persisted {
        Ok(_) => {
            info!("Installed {source:?} as {destination:?}");
            Ok(destination)
        }
        Err(e) if e.error.kind() == ErrorKind::AlreadyExists => {
            Err(AccelError::IOExists { file: destination })
        }
        Err(e) => Err(AccelError::IOWrite {
            file: destination,
            e: e.error,
        }),
    }
}

/// Open the bitstream at `source` and [`install`] it.
pub fn install_file(source: &Path, root: &Path, overwrite: bool) -> Result<PathBuf, AccelError> {
    let bitstream = open_bitstream(source)?;
    install(bitstream.as_ref(), root, overwrite)
}
