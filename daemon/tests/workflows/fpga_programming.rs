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

use crate::common::fixtures::{AFU_UUID, INTERFACE_UUID, OTHER_AFU_UUID, dfl_card, write_gbs};
use accelplug::error::AccelError;
use accelplug::fpga::bitstream::{Bitstream, open_bitstream};
use accelplug::fpga::dfl::DflTopology;
use accelplug::fpga::installer::install_file;
use accelplug::fpga::port::ReprogrammablePort;
use accelplug::fpga::reprogram::reprogram;
use googletest::prelude::*;
use rstest::*;
use std::fs;
use tempfile::TempDir;

#[fixture]
fn card() -> (TempDir, DflTopology) {
    let root = dfl_card();
    let topology = DflTopology::new(root.path().join("dev"), root.path().join("sys"));
    (root, topology)
}

#[gtest]
#[rstest]
fn install_refuses_then_overwrites() {
    let src = TempDir::new().unwrap();
    let root = TempDir::new().unwrap();
    let first = write_gbs(src.path(), "first.gbs", INTERFACE_UUID, AFU_UUID, b"first");
    let second = write_gbs(src.path(), "second.gbs", INTERFACE_UUID, AFU_UUID, b"second");

    let installed = install_file(&first, root.path(), false).unwrap();
    assert_eq!(
        installed,
        root.path().join(INTERFACE_UUID).join(format!("{AFU_UUID}.gbs"))
    );

    let refused = install_file(&second, root.path(), false);
    assert!(matches!(refused, Err(AccelError::IOExists { .. })));
    assert_eq!(fs::read(&installed).unwrap(), fs::read(&first).unwrap());

    assert_that!(install_file(&second, root.path(), true), ok(eq(&installed)));
    assert_eq!(fs::read(&installed).unwrap(), fs::read(&second).unwrap());
}

#[gtest]
#[rstest]
fn dry_run_validates_without_programming(card: (TempDir, DflTopology)) {
    let (root, topology) = card;
    let port = topology.port(&root.path().join("dev/dfl-port.0")).unwrap();
    let bitstream_path = write_gbs(root.path(), "new.gbs", INTERFACE_UUID, OTHER_AFU_UUID, b"bits");
    let bitstream = open_bitstream(&bitstream_path).unwrap();

    let report = reprogram(&port, bitstream.as_ref(), true).unwrap();
    assert!(report.succeeded());
    assert!(!report.changed());
    assert_eq!(report.before.accelerator_type_uuid, AFU_UUID);
    assert_eq!(report.after.as_ref(), Some(&report.before));
    assert_that!(
        report.render(),
        all![
            contains_substring(format!("Before: Interface ID: \"{INTERFACE_UUID}\" AFU ID: \"{AFU_UUID}\"")),
            contains_substring("OK (dry-run, port not modified)"),
            contains_substring(format!("After : Interface ID: \"{INTERFACE_UUID}\" AFU ID: \"{AFU_UUID}\""))
        ]
    );
}

#[gtest]
#[rstest]
#[case::dry_run(true)]
#[case::real(false)]
fn interface_mismatch_is_rejected_by_the_port(card: (TempDir, DflTopology), #[case] dry_run: bool) {
    let (root, topology) = card;
    let port = topology.port(&root.path().join("dev/dfl-port.0")).unwrap();
    let bitstream_path = write_gbs(
        root.path(),
        "foreign.gbs",
        "00000000000000000000000000000001",
        OTHER_AFU_UUID,
        b"bits",
    );
    let bitstream = open_bitstream(&bitstream_path).unwrap();

    let report = reprogram(&port, bitstream.as_ref(), dry_run).unwrap();
    assert!(!report.succeeded());
    assert_that!(report.render(), contains_substring("FAILED"));
    assert_eq!(port.identity().unwrap(), report.before);
    expect_that!(
        report.into_result(),
        err(displays_as(contains_substring("mismatch")))
    );
}

#[gtest]
#[rstest]
fn install_path_follows_identity() {
    let dir = TempDir::new().unwrap();
    let path = write_gbs(dir.path(), "x.gbs", INTERFACE_UUID, AFU_UUID, b"bits");
    let bitstream = open_bitstream(&path).unwrap();
    assert_eq!(
        bitstream.install_path(dir.path()),
        dir.path().join(INTERFACE_UUID).join(format!("{AFU_UUID}.gbs"))
    );
}
