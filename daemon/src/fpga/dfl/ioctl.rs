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

//! DFL character device ioctls, as defined in `include/uapi/linux/fpga-dfl.h`.

use crate::error::AccelError;
use std::fs::{File, OpenOptions};
use std::io;
use std::os::fd::AsRawFd;
use std::os::raw::c_ulong;
use std::path::Path;

/// `_IO(type, nr)`: no direction or size bits.
const fn io(ty: u8, nr: u8) -> c_ulong {
    ((ty as c_ulong) << 8) | nr as c_ulong
}

const DFL_FPGA_MAGIC: u8 = 0xB6;
const DFL_FPGA_BASE: u8 = 0;
const DFL_PORT_BASE: u8 = 0x40;
const DFL_FME_BASE: u8 = 0x80;

const DFL_FPGA_GET_API_VERSION: c_ulong = io(DFL_FPGA_MAGIC, DFL_FPGA_BASE);
const DFL_FPGA_PORT_GET_INFO: c_ulong = io(DFL_FPGA_MAGIC, DFL_PORT_BASE + 1);
const DFL_FPGA_PORT_GET_REGION_INFO: c_ulong = io(DFL_FPGA_MAGIC, DFL_PORT_BASE + 2);
const DFL_FPGA_FME_PORT_PR: c_ulong = io(DFL_FPGA_MAGIC, DFL_FME_BASE);

#[repr(C)]
#[derive(Debug, Default)]
struct DflFpgaPortInfo {
    argsz: u32,
    flags: u32,
    num_regions: u32,
    num_umsgs: u32,
}

#[repr(C)]
#[derive(Debug, Default)]
struct DflFpgaPortRegionInfo {
    argsz: u32,
    flags: u32,
    index: u32,
    padding: u32,
    size: u64,
    offset: u64,
}

#[repr(C)]
#[derive(Debug, Default)]
struct DflFpgaFmePortPr {
    argsz: u32,
    flags: u32,
    port_id: u32,
    buffer_size: u32,
    buffer_address: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortInfo {
    pub flags: u32,
    pub num_regions: u32,
    pub num_umsgs: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionInfo {
    pub index: u32,
    pub flags: u32,
    pub size: u64,
    pub offset: u64,
}

fn open_device(dev_path: &Path) -> Result<File, AccelError> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .open(dev_path)
        .map_err(|e| AccelError::IORead {
            file: dev_path.into(),
            e,
        })
}

fn ioctl_error(dev_path: &Path, what: &str) -> AccelError {
    AccelError::Hardware(format!(
        "{what} on {dev_path:?} failed: {}",
        io::Error::last_os_error()
    ))
}

pub fn get_api_version(dev_path: &Path) -> Result<i32, AccelError> {
    let device = open_device(dev_path)?;
    // SAFETY: DFL_FPGA_GET_API_VERSION takes no argument and only returns an int.
    let version = unsafe { libc::ioctl(device.as_raw_fd(), DFL_FPGA_GET_API_VERSION as _) };
    if version < 0 {
        return Err(ioctl_error(dev_path, "DFL_FPGA_GET_API_VERSION"));
    }
    Ok(version)
}

pub fn port_info(dev_path: &Path) -> Result<PortInfo, AccelError> {
    let device = open_device(dev_path)?;
    let mut info = DflFpgaPortInfo {
        argsz: size_of::<DflFpgaPortInfo>() as u32,
        ..Default::default()
    };
    // SAFETY: info is a live, correctly sized dfl_fpga_port_info the kernel fills in.
    let ret = unsafe {
        libc::ioctl(
            device.as_raw_fd(),
            DFL_FPGA_PORT_GET_INFO as _,
            &raw mut info,
        )
    };
    if ret < 0 {
        return Err(ioctl_error(dev_path, "DFL_FPGA_PORT_GET_INFO"));
    }
    Ok(PortInfo {
        flags: info.flags,
        num_regions: info.num_regions,
        num_umsgs: info.num_umsgs,
    })
}

pub fn region_info(dev_path: &Path, index: u32) -> Result<RegionInfo, AccelError> {
    let device = open_device(dev_path)?;
    let mut info = DflFpgaPortRegionInfo {
        argsz: size_of::<DflFpgaPortRegionInfo>() as u32,
        index,
        ..Default::default()
    };
    // SAFETY: info is a live, correctly sized dfl_fpga_port_region_info the kernel fills in.
    let ret = unsafe {
        libc::ioctl(
            device.as_raw_fd(),
            DFL_FPGA_PORT_GET_REGION_INFO as _,
            &raw mut info,
        )
    };
    if ret < 0 {
        return Err(ioctl_error(dev_path, "DFL_FPGA_PORT_GET_REGION_INFO"));
    }
    Ok(RegionInfo {
        index: info.index,
        flags: info.flags,
        size: info.size,
        offset: info.offset,
    })
}

/// Partially reconfigure port `port_id` of the FME at `fme_dev_path` with `data`.
pub fn fme_port_pr(fme_dev_path: &Path, port_id: u32, data: &[u8]) -> Result<(), AccelError> {
    let buffer_size = u32::try_from(data.len()).map_err(|_| {
        AccelError::Argument(format!("bitstream of {} bytes is too large", data.len()))
    })?;
    let device = open_device(fme_dev_path)?;
    let request = DflFpgaFmePortPr {
        argsz: size_of::<DflFpgaFmePortPr>() as u32,
        flags: 0,
        port_id,
        buffer_size,
        buffer_address: data.as_ptr() as u64,
    };
    // SAFETY: request points at data, which outlives the call; the kernel only reads both.
    let ret = unsafe {
        libc::ioctl(
            device.as_raw_fd(),
            DFL_FPGA_FME_PORT_PR as _,
            &raw const request,
        )
    };
    if ret < 0 {
        return Err(ioctl_error(fme_dev_path, "DFL_FPGA_FME_PORT_PR"));
    }
    Ok(())
}
