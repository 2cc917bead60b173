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

//! Bitstream files and their embedded identity.
//!
//! Only the GBS container used by DFL accelerator cards is supported:
//!
//! | offset | size | content                                    |
//! |--------|------|--------------------------------------------|
//! | 0      | 16   | [`GBS_GUID`]                               |
//! | 16     | 4    | metadata length `n`, little endian         |
//! | 20     | n    | JSON metadata, possibly NUL padded         |
//! | 20 + n | ...  | raw bitstream handed to the FME            |

use crate::error::AccelError;
use crate::fpga::canonical_uuid;
use log::trace;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Magic of the GBS container: `XeonFPGA` followed by `\xb7GBSv001`.
pub const GBS_GUID: [u8; 16] = [
    0x58, 0x65, 0x6f, 0x6e, 0x46, 0x50, 0x47, 0x41, 0xb7, 0x47, 0x42, 0x53, 0x76, 0x30, 0x30, 0x31,
];

const GBS_HEADER_LEN: u64 = 20;

/// Identity a bitstream carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitstreamIdentity {
    /// Interface the FME must expose for the bitstream to be accepted.
    pub interface_uuid: String,
    /// The accelerator (AFU) the bitstream implements.
    pub accelerator_type_uuid: String,
    /// Names the installed file.
    pub unique_uuid: String,
    /// Informational metadata, e.g. `platform-name` or `clock-frequency-high`.
    pub extra_metadata: BTreeMap<String, String>,
}

pub trait Bitstream {
    fn path(&self) -> &Path;

    fn identity(&self) -> &BitstreamIdentity;

    /// Canonical location of the bitstream below `root`.
    fn install_path(&self, root: &Path) -> PathBuf {
        let identity = self.identity();
        root.join(&identity.interface_uuid)
            .join(format!("{}.gbs", identity.unique_uuid))
    }

    /// The payload to program, without container headers.
    fn raw_data(&self) -> Result<Vec<u8>, AccelError>;
}

/// Open `path` with the parser matching its extension.
///
/// # Returns: `Result<Box<dyn Bitstream>, AccelError>`
/// * `Ok(Box<dyn Bitstream>)` - Parsed bitstream
/// * `Err(AccelError::Bitstream)` - Unsupported extension or malformed container
/// * `Err(AccelError::IORead)` - The file cannot be read
pub fn open_bitstream(path: &Path) -> Result<Box<dyn Bitstream>, AccelError> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("gbs") => Ok(Box::new(GbsBitstream::open(path)?)),
        _ => Err(AccelError::Bitstream {
            file: path.into(),
            msg: "unsupported file format, expected a .gbs file".into(),
        }),
    }
}

#[derive(Debug, Deserialize)]
struct GbsMetadata {
    version: Option<Value>,
    #[serde(rename = "platform-name")]
    platform_name: Option<String>,
    #[serde(rename = "afu-image")]
    afu_image: AfuImage,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct AfuImage {
    interface_uuid: String,
    magic_no: Option<Value>,
    clock_frequency_high: Option<Value>,
    clock_frequency_low: Option<Value>,
    power: Option<Value>,
    #[serde(default)]
    accelerator_clusters: Vec<AcceleratorCluster>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct AcceleratorCluster {
    name: Option<String>,
    total_contexts: Option<Value>,
    accelerator_type_uuid: String,
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct GbsBitstream {
    path: PathBuf,
    identity: BitstreamIdentity,
    payload_offset: u64,
}

impl GbsBitstream {
    /// Parse the header and metadata of a GBS file. The payload is read on demand.
    pub fn open(path: &Path) -> Result<GbsBitstream, AccelError> {
        let invalid = |msg: String| AccelError::Bitstream {
            file: path.into(),
            msg,
        };
        let read_error = |e: std::io::Error| AccelError::IORead {
            file: path.into(),
            e,
        };

        let mut file = File::open(path).map_err(read_error)?;
        let file_len = file.metadata().map_err(read_error)?.len();
        if file_len < GBS_HEADER_LEN {
            return Err(invalid(format!("file is too short ({file_len} bytes)")));
        }
        let mut header = [0u8; GBS_HEADER_LEN as usize];
        file.read_exact(&mut header).map_err(read_error)?;
        if header[..16] != GBS_GUID {
            return Err(invalid("GBS magic not found".into()));
        }
        let metadata_len = u32::from_le_bytes([header[16], header[17], header[18], header[19]]);
        let payload_offset = GBS_HEADER_LEN + u64::from(metadata_len);
        if payload_offset > file_len {
            return Err(invalid(format!(
                "metadata length {metadata_len} exceeds the file size"
            )));
        }

        let mut metadata = vec![0u8; metadata_len as usize];
        file.read_exact(&mut metadata).map_err(read_error)?;
        let end = metadata
            .iter()
            .rposition(|b| *b != 0)
            .map_or(0, |last| last + 1);
        let metadata: GbsMetadata = serde_json::from_slice(&metadata[..end])
            .map_err(|e| invalid(format!("malformed metadata: {e}")))?;
        trace!("GBS metadata of {path:?}: {metadata:?}");

        let identity = identity_from_metadata(metadata).map_err(invalid)?;
        Ok(GbsBitstream {
            path: path.into(),
            identity,
            payload_offset,
        })
    }
}

fn identity_from_metadata(metadata: GbsMetadata) -> Result<BitstreamIdentity, String> {
    let image = metadata.afu_image;
    let interface_uuid = canonical_uuid(&image.interface_uuid)
        .ok_or_else(|| format!("invalid interface-uuid '{}'", image.interface_uuid))?;
    let cluster = image
        .accelerator_clusters
        .first()
        .ok_or("no accelerator cluster in metadata")?;
    let accelerator_type_uuid = canonical_uuid(&cluster.accelerator_type_uuid).ok_or_else(|| {
        format!(
            "invalid accelerator-type-uuid '{}'",
            cluster.accelerator_type_uuid
        )
    })?;

    let mut extra_metadata = BTreeMap::new();
    let mut add = |key: &str, value: Option<String>| {
        if let Some(value) = value {
            extra_metadata.insert(key.to_string(), value);
        }
    };
    add("version", metadata.version.as_ref().map(value_text));
    add("platform-name", metadata.platform_name.clone());
    add("magic-no", image.magic_no.as_ref().map(value_text));
    add(
        "clock-frequency-high",
        image.clock_frequency_high.as_ref().map(value_text),
    );
    add(
        "clock-frequency-low",
        image.clock_frequency_low.as_ref().map(value_text),
    );
    add("power", image.power.as_ref().map(value_text));
    add("accelerator-name", cluster.name.clone());
    add(
        "total-contexts",
        cluster.total_contexts.as_ref().map(value_text),
    );

    Ok(BitstreamIdentity {
        interface_uuid,
        unique_uuid: accelerator_type_uuid.clone(),
        accelerator_type_uuid,
        extra_metadata,
    })
}

impl Bitstream for GbsBitstream {
    fn path(&self) -> &Path {
        &self.path
    }

    fn identity(&self) -> &BitstreamIdentity {
        &self.identity
    }

    fn raw_data(&self) -> Result<Vec<u8>, AccelError> {
        let read_error = |e: std::io::Error| AccelError::IORead {
            file: self.path.clone(),
            e,
        };
        let mut file = File::open(&self.path).map_err(read_error)?;
        file.seek(SeekFrom::Start(self.payload_offset))
            .map_err(read_error)?;
        let mut payload = Vec::new();
        file.read_to_end(&mut payload).map_err(read_error)?;
        if payload.is_empty() {
            return Err(AccelError::Bitstream {
                file: self.path.clone(),
                msg: "bitstream payload is empty".into(),
            });
        }
        Ok(payload)
    }
}
