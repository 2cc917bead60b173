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

//! QAT resource discovery.
//!
//! The QAT driver spreads user-space "sections" (named groups of crypto and compression
//! instances) over the physical devices it manages. Every device has its own configuration file
//! and each file may declare the same section again. This module turns that per-device state
//! into one validated [`SectionMap`] ([`scanner`]) and the [`SectionMap`] into the published
//! resource inventory ([`tree`]).
//!
//! A section is either *pinned* (`LimitDevAccess` set, every instance belongs to one device and
//! the section must be declared on every device) or *distributed* (instances may be served by
//! any of the contributing devices, which must therefore agree on the number of processes).

pub mod conf;
pub mod scanner;
pub mod tree;

use std::collections::BTreeMap;

/// One physical device contributing processes to a section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Device id as reported by the driver with the `qat_` prefix removed, e.g. `dev0`.
    pub id: String,
    pub processes: u32,
}

/// A resource class declared across one or more devices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub crypto_engines: u32,
    pub compression_engines: u32,
    pub pinned: bool,
    /// Contributing devices in discovery order.
    pub endpoints: Vec<Endpoint>,
}

/// Sections keyed by name.
pub type SectionMap = BTreeMap<String, Section>;
