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

use crate::common::fixtures::{FakeAdfCtl, RecordingNotifier, qat_dev_dir, write_qat_confs};
use accelplug::comm::dbus::DbusNotifier;
use accelplug::error::AccelError;
use accelplug::qat::scanner::ConfigScanner;
use accelplug::qat::tree::{Health, ResourceTree, SECTION_NAME_ENV};
use accelplug::scan_loop::{Notifier, ScanLoop};
use googletest::prelude::*;
use rstest::*;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

const PINNED_SSL: &str =
    "[SSL]\nNumberCyInstances = 1\nNumberDcInstances = 0\nNumProcesses = 2\nLimitDevAccess = 1\n";
const DISTRIBUTED_SSL: &str =
    "[SSL]\nNumberCyInstances = 1\nNumberDcInstances = 0\nNumProcesses = 4\nLimitDevAccess = 0\n";

fn scan_loop(conf_dir: &Path, dev_dir: &Path, devices: usize) -> ScanLoop<FakeAdfCtl> {
    let scanner = ConfigScanner::new(
        FakeAdfCtl { count: devices },
        conf_dir,
        Duration::from_secs(1),
    );
    ScanLoop::new(scanner, dev_dir, Duration::from_secs(3600))
}

async fn publish_once(per_device_sections: &[&str]) -> (Result<(), AccelError>, Vec<ResourceTree>) {
    let conf_dir = TempDir::new().unwrap();
    let dev_dir = qat_dev_dir();
    write_qat_confs(conf_dir.path(), per_device_sections);

    let cancel = CancellationToken::new();
    let notifier = RecordingNotifier::new(cancel.clone());
    let result = scan_loop(conf_dir.path(), dev_dir.path(), per_device_sections.len())
        .run(&notifier, cancel)
        .await;
    (result, notifier.trees())
}

fn instance_ids(tree: &ResourceTree, label: &str) -> Vec<String> {
    tree.instances(label).unwrap().keys().cloned().collect()
}

#[tokio::test]
#[gtest]
async fn pinned_section_on_three_devices() {
    let (result, trees) = publish_once(&[PINNED_SSL, PINNED_SSL, PINNED_SSL]).await;
    assert_that!(result, ok(anything()));
    assert_eq!(trees.len(), 1);

    let tree = &trees[0];
    assert_eq!(tree.resource_types().collect::<Vec<_>>(), vec!["cy1_dc0_pinned"]);
    assert_eq!(
        instance_ids(tree, "cy1_dc0_pinned"),
        vec!["SSL_dev0_0", "SSL_dev0_1", "SSL_dev1_0", "SSL_dev1_1", "SSL_dev2_0", "SSL_dev2_1"]
    );
    for info in tree.instances("cy1_dc0_pinned").unwrap().values() {
        assert_eq!(info.health, Health::Healthy);
        assert_that!(info.env.get(SECTION_NAME_ENV), some(eq("SSL")));
        assert_eq!(info.node_paths.len(), 5);
    }
}

#[tokio::test]
#[gtest]
async fn distributed_section_on_three_devices() {
    let (result, trees) = publish_once(&[DISTRIBUTED_SSL, DISTRIBUTED_SSL, DISTRIBUTED_SSL]).await;
    assert_that!(result, ok(anything()));
    assert_eq!(
        instance_ids(&trees[0], "cy1_dc0"),
        vec!["SSL_0", "SSL_1", "SSL_2", "SSL_3"]
    );
}

#[tokio::test]
#[gtest]
#[rstest]
#[case::processes(
    &[DISTRIBUTED_SSL, "[SSL]\nNumberCyInstances = 1\nNumberDcInstances = 0\nNumProcesses = 3\n"],
    "For not pinned section [SSL] NumProcesses must be equal for all devices"
)]
#[case::pinned_on_one_device(&[PINNED_SSL, ""], "Section [SSL] must be defined for all 2 QAT devices")]
#[case::pinning(&[PINNED_SSL, DISTRIBUTED_SSL], "LimitDevAccess must be consistent")]
async fn inconsistent_devices_publish_nothing(#[case] sections: &[&str], #[case] message: &str) {
    let (result, trees) = publish_once(sections).await;
    expect_that!(result, err(displays_as(contains_substring(message))));
    assert!(trees.is_empty());
}

#[tokio::test]
#[gtest]
async fn missing_device_dir_publishes_nothing() {
    let conf_dir = TempDir::new().unwrap();
    write_qat_confs(conf_dir.path(), &[PINNED_SSL]);
    let cancel = CancellationToken::new();
    let notifier = RecordingNotifier::new(cancel.clone());

    let result = scan_loop(conf_dir.path(), Path::new("/nonexistent/accelplug/dev"), 1)
        .run(&notifier, cancel)
        .await;
    assert!(matches!(result, Err(AccelError::IOReadDir { .. })));
    assert!(notifier.trees().is_empty());
}

#[tokio::test]
#[gtest]
async fn dbus_notifier_keeps_scanned_inventory() {
    let conf_dir = TempDir::new().unwrap();
    let dev_dir = qat_dev_dir();
    write_qat_confs(conf_dir.path(), &[DISTRIBUTED_SSL, DISTRIBUTED_SSL]);
    let scan_loop = scan_loop(conf_dir.path(), dev_dir.path(), 2);

    let notifier = DbusNotifier::new();
    let tree = scan_loop.scan_once().await.unwrap();
    notifier.notify(tree).unwrap();

    let published = notifier.snapshot().unwrap().to_json().unwrap();
    let json: serde_json::Value = serde_json::from_str(&published).unwrap();
    let instance = &json["cy1_dc0"]["SSL_3"];
    assert_eq!(instance["health"], "Healthy");
    assert_eq!(instance["env"][SECTION_NAME_ENV], "SSL");
    let uio0 = dev_dir.path().join("uio0");
    let node_paths: Vec<PathBuf> = serde_json::from_value(instance["node_paths"].clone()).unwrap();
    assert!(node_paths.contains(&uio0));
}
