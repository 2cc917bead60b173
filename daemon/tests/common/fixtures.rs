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

use accelplug::error::AccelError;
use accelplug::fpga::bitstream::GBS_GUID;
use accelplug::qat::scanner::DriverStatus;
use accelplug::qat::tree::ResourceTree;
use accelplug::scan_loop::Notifier;
use std::fs;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

pub const INTERFACE_UUID: &str = "69528db6eb31577a8c3668f9faa081f6";
pub const AFU_UUID: &str = "d8424dc4a4a3c413f89e433683f9040b";
pub const OTHER_AFU_UUID: &str = "f7df405cbd7acf7222f144b0b93acd18";

/// Driver status listing `count` c6xx devices.
pub struct FakeAdfCtl {
    pub count: usize,
}

impl DriverStatus for FakeAdfCtl {
    async fn status(&self) -> Result<String, AccelError> {
        let mut out = format!(
            "Checking status of all devices.\nThere is {} QAT acceleration device(s) in the system:\n",
            self.count
        );
        for i in 0..self.count {
            out.push_str(&format!(
                " qat_dev{i} - type: c6xx,  inst_id: {i},  node_id: 0,  bsf: 0000:{:02x}:00.0,  #accel: 5 #engines: 10 state: up\n",
                0x1a + i
            ));
        }
        Ok(out)
    }
}

/// Records every tree and cancels the loop after the first one.
pub struct RecordingNotifier {
    pub trees: Mutex<Vec<ResourceTree>>,
    pub cancel: CancellationToken,
}

impl RecordingNotifier {
    pub fn new(cancel: CancellationToken) -> Self {
        RecordingNotifier {
            trees: Mutex::new(vec![]),
            cancel,
        }
    }

    pub fn trees(&self) -> Vec<ResourceTree> {
        self.trees.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, tree: ResourceTree) -> Result<(), AccelError> {
        self.trees.lock().unwrap().push(tree);
        self.cancel.cancel();
        Ok(())
    }
}

/// Write `c6xx_dev{i}.conf` with the given user sections for every device.
pub fn write_qat_confs(dir: &Path, per_device_sections: &[&str]) {
    for (i, sections) in per_device_sections.iter().enumerate() {
        fs::write(
            dir.join(format!("c6xx_dev{i}.conf")),
            format!("[GENERAL]\nServicesEnabled = cy;dc\nConfigVersion = 2\n\n[KERNEL]\nNumberCyInstances = 0\nNumberDcInstances = 0\n\n{sections}"),
        )
        .unwrap();
    }
}

/// A device directory with the QAT control nodes and two uio nodes.
pub fn qat_dev_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    for node in ["qat_adf_ctl", "qat_dev_processes", "usdm_drv", "uio0", "uio1", "null"] {
        fs::write(dir.path().join(node), "").unwrap();
    }
    dir
}

/// Write a GBS file for `INTERFACE_UUID` (or `interface`) and `afu`.
pub fn write_gbs(dir: &Path, name: &str, interface: &str, afu: &str, payload: &[u8]) -> PathBuf {
    let metadata = format!(
        r#"{{"version": 640, "platform-name": "DCP", "afu-image": {{"interface-uuid": "{interface}", "magic-no": 488605312, "accelerator-clusters": [{{"name": "nlb", "total-contexts": 1, "accelerator-type-uuid": "{afu}"}}]}}}}"#
    );
    let mut bytes = GBS_GUID.to_vec();
    bytes.extend_from_slice(&(metadata.len() as u32).to_le_bytes());
    bytes.extend_from_slice(metadata.as_bytes());
    bytes.extend_from_slice(payload);
    let path = dir.join(name);
    fs::write(&path, bytes).unwrap();
    path
}

fn write_attr(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, format!("{contents}\n")).unwrap();
}

/// Fake sysfs and dev trees holding one card with dfl-fme.0 and dfl-port.0.
///
/// Returns the root, `{root}/dev` and `{root}/sys` are the directories to use.
pub fn dfl_card() -> TempDir {
    let root = TempDir::new().unwrap();
    let pci = root.path().join("sys/devices/pci0000:5d/0000:5e:00.0");
    for (attr, value) in [
        ("vendor", "0x8086"),
        ("device", "0x0b30"),
        ("class", "0x120000"),
        ("local_cpulist", "0-17"),
        ("numa_node", "0"),
    ] {
        write_attr(&pci.join(attr), value);
    }
    let region = pci.join("fpga_region/region0");
    let fme = region.join("dfl-fme.0");
    write_attr(&fme.join("ports_num"), "1");
    write_attr(
        &fme.join("dfl-fme-region.1/fpga_region/region1/compat_id"),
        INTERFACE_UUID,
    );
    let port = region.join("dfl-port.0");
    write_attr(&port.join("id"), "0");
    write_attr(&port.join("afu_id"), AFU_UUID);

    let platform = root.path().join("sys/bus/platform/devices");
    fs::create_dir_all(&platform).unwrap();
    symlink(&fme, platform.join("dfl-fme.0")).unwrap();
    symlink(&port, platform.join("dfl-port.0")).unwrap();
    write_attr(&root.path().join("dev/dfl-fme.0"), "");
    write_attr(&root.path().join("dev/dfl-port.0"), "");
    root
}
