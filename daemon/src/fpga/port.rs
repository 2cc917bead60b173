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

use crate::error::AccelError;
use crate::fpga::bitstream::Bitstream;
use std::fmt;

/// What a port currently runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortIdentity {
    pub interface_uuid: String,
    pub accelerator_type_uuid: String,
}

impl fmt::Display for PortIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Interface ID: {:?} AFU ID: {:?}",
            self.interface_uuid, self.accelerator_type_uuid
        )
    }
}

/// A port that can be reprogrammed with partial reconfiguration.
///
/// The port decides whether a bitstream is acceptable; callers do not check compatibility.
pub trait ReprogrammablePort {
    /// Human readable name, e.g. the device node.
    fn name(&self) -> String;

    fn identity(&self) -> Result<PortIdentity, AccelError>;

    /// Program `bitstream`. With `dry_run` only validate it and leave the hardware untouched.
    fn program(&self, bitstream: &dyn Bitstream, dry_run: bool) -> Result<(), AccelError>;
}
