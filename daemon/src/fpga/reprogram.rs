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

//! Reprogram a port and report its identity before and after.

use crate::error::AccelError;
use crate::fpga::bitstream::Bitstream;
use crate::fpga::port::{PortIdentity, ReprogrammablePort};
use log::{info, warn};
use std::fmt::Write;
use std::path::PathBuf;

#[derive(Debug)]
pub struct ReprogramReport {
    pub port: String,
    pub bitstream: PathBuf,
    pub dry_run: bool,
    pub before: PortIdentity,
    /// `None` when the identity could not be read back.
    pub after: Option<PortIdentity>,
    pub outcome: Result<(), AccelError>,
}

impl ReprogramReport {
    pub fn succeeded(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Whether the port now runs something else.
    pub fn changed(&self) -> bool {
        self.after.as_ref().is_some_and(|after| *after != self.before)
    }

    /// Operator facing summary.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Before: {}", self.before);
        let status = match (&self.outcome, self.dry_run) {
            (Ok(()), false) => "OK".to_string(),
            (Ok(()), true) => "OK (dry-run, port not modified)".to_string(),
            (Err(e), _) => format!("FAILED: {e}"),
        };
        let _ = writeln!(
            out,
            "Programming {:?} to port {:?}: {status}",
            self.bitstream, self.port
        );
        match &self.after {
            Some(after) => {
                let _ = writeln!(out, "After : {after}");
            }
            None => {
                let _ = writeln!(out, "After : unavailable");
            }
        }
        out
    }

    /// The programming outcome, for the exit status.
    pub fn into_result(self) -> Result<(), AccelError> {
        self.outcome
    }
}

/// Program `bitstream` into `port`, capturing the port identity around the attempt.
///
/// # Returns: `Result<ReprogramReport, AccelError>`
/// * `Ok(ReprogramReport)` - The attempt was made, its outcome is in the report
/// * `Err(AccelError)` - The initial identity could not be read, nothing was attempted
pub fn reprogram(
    port: &dyn ReprogrammablePort,
    bitstream: &dyn Bitstream,
    dry_run: bool,
) -> Result<ReprogramReport, AccelError> {
    let name = port.name();
    let before = port.identity()?;
    info!(
        "Programming {:?} to port {name} (dry-run: {dry_run}), current {before}",
        bitstream.path()
    );

    let outcome = port.program(bitstream, dry_run);
    if let Err(e) = &outcome {
        warn!("Programming port {name} failed: {e}");
    }
    let after = port
        .identity()
        .inspect_err(|e| warn!("Cannot read identity of port {name} after programming: {e}"))
        .ok();

    Ok(ReprogramReport {
        port: name,
        bitstream: bitstream.path().into(),
        dry_run,
        before,
        after,
        outcome,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fpga::bitstream::BitstreamIdentity;
    use googletest::prelude::*;
    use std::cell::{Cell, RefCell};
    use std::collections::BTreeMap;
    use std::path::Path;

    struct FakeBitstream {
        identity: BitstreamIdentity,
    }

    impl FakeBitstream {
        fn new(interface: &str, afu: &str) -> Self {
            FakeBitstream {
                identity: BitstreamIdentity {
                    interface_uuid: interface.into(),
                    accelerator_type_uuid: afu.into(),
                    unique_uuid: afu.into(),
                    extra_metadata: BTreeMap::new(),
                },
            }
        }
    }

    impl Bitstream for FakeBitstream {
        fn path(&self) -> &Path {
            Path::new("/tmp/fake.gbs")
        }

        fn identity(&self) -> &BitstreamIdentity {
            &self.identity
        }

        fn raw_data(&self) -> Result<Vec<u8>, AccelError> {
            Ok(vec![0; 4])
        }
    }

    /// Accepts bitstreams for its interface; the after read can be made to fail.
    struct FakePort {
        identity: RefCell<PortIdentity>,
        reads: Cell<u32>,
        fail_second_read: bool,
    }

    impl FakePort {
        fn new(fail_second_read: bool) -> Self {
            FakePort {
                identity: RefCell::new(PortIdentity {
                    interface_uuid: "if0".into(),
                    accelerator_type_uuid: "afu0".into(),
                }),
                reads: Cell::new(0),
                fail_second_read,
            }
        }
    }

    impl ReprogrammablePort for FakePort {
        fn name(&self) -> String {
            "/dev/dfl-port.0".into()
        }

        fn identity(&self) -> Result<PortIdentity, AccelError> {
            self.reads.set(self.reads.get() + 1);
            if self.fail_second_read && self.reads.get() == 2 {
                return Err(AccelError::Hardware("port vanished".into()));
            }
            Ok(self.identity.borrow().clone())
        }

        fn program(&self, bitstream: &dyn Bitstream, dry_run: bool) -> Result<(), AccelError> {
            let wanted = &bitstream.identity().interface_uuid;
            if *wanted != self.identity.borrow().interface_uuid {
                return Err(AccelError::Hardware(format!("interface {wanted} mismatch")));
            }
            if !dry_run {
                self.identity.borrow_mut().accelerator_type_uuid =
                    bitstream.identity().accelerator_type_uuid.clone();
            }
            Ok(())
        }
    }

    #[gtest]
    fn programs_and_reports_change() {
        let port = FakePort::new(false);
        let report = reprogram(&port, &FakeBitstream::new("if0", "afu1"), false).unwrap();
        assert!(report.succeeded());
        assert!(report.changed());
        assert_that!(
            report.render(),
            all![
                contains_substring("Before: Interface ID: \"if0\" AFU ID: \"afu0\""),
                contains_substring("Programming \"/tmp/fake.gbs\" to port \"/dev/dfl-port.0\": OK"),
                contains_substring("After : Interface ID: \"if0\" AFU ID: \"afu1\"")
            ]
        );
        assert_that!(report.into_result(), ok(anything()));
    }

    #[gtest]
    fn dry_run_leaves_port_unchanged() {
        let port = FakePort::new(false);
        let report = reprogram(&port, &FakeBitstream::new("if0", "afu1"), true).unwrap();
        assert!(report.succeeded());
        assert!(!report.changed());
        assert_eq!(report.after.as_ref(), Some(&report.before));
        assert_that!(report.render(), contains_substring("OK (dry-run, port not modified)"));
    }

    #[gtest]
    fn rejection_is_reported_and_returned() {
        let port = FakePort::new(false);
        let report = reprogram(&port, &FakeBitstream::new("if1", "afu1"), false).unwrap();
        assert!(!report.succeeded());
        assert!(!report.changed());
        assert_that!(report.render(), contains_substring("FAILED: AccelError::Hardware"));
        expect_that!(
            report.into_result(),
            err(displays_as(contains_substring("interface if1 mismatch")))
        );
    }

    #[gtest]
    fn unreadable_after_identity_is_tolerated() {
        let port = FakePort::new(true);
        let report = reprogram(&port, &FakeBitstream::new("if0", "afu1"), false).unwrap();
        assert!(report.succeeded());
        assert_eq!(report.after, None);
        assert_that!(report.render(), contains_substring("After : unavailable"));
    }
}
