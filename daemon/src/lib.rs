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

//! # accelplug
//!
//! Accelerator plumbing for container orchestrators on Intel hardware:
//! - [`qat`] discovers QAT sections from the driver status and configuration files and turns
//!   them into a resource inventory
//! - [`scan_loop`] republishes that inventory periodically through a [`scan_loop::Notifier`]
//! - [`comm::dbus`] serves the latest inventory over D-Bus
//! - [`fpga`] inspects DFL FPGA cards, installs bitstreams and reprograms ports
//!
//! Paths default to the live system and can be overridden, see [`config`].

pub mod comm;
pub mod config;
pub mod error;
pub mod fpga;
pub mod qat;
pub mod scan_loop;
pub mod system_io;
