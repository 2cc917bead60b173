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

//! Periodic scan and publication of the QAT resource inventory.

use crate::error::AccelError;
use crate::qat::scanner::{ConfigScanner, DriverStatus, discover_device_nodes};
use crate::qat::tree::{ResourceTree, ResourceTreeBuilder};
use log::{debug, info};
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Receives every validated inventory.
pub trait Notifier {
    fn notify(&self, tree: ResourceTree) -> Result<(), AccelError>;
}

pub struct ScanLoop<S: DriverStatus> {
    scanner: ConfigScanner<S>,
    dev_dir: PathBuf,
    interval: Duration,
}

impl<S: DriverStatus> ScanLoop<S> {
    pub fn new(scanner: ConfigScanner<S>, dev_dir: impl Into<PathBuf>, interval: Duration) -> Self {
        ScanLoop {
            scanner,
            dev_dir: dev_dir.into(),
            interval,
        }
    }

    /// One pass: scan, discover device nodes, build and validate.
    pub async fn scan_once(&self) -> Result<ResourceTree, AccelError> {
        let sections = self.scanner.scan().await?;
        let nodes = discover_device_nodes(&self.dev_dir)?;
        let tree = ResourceTreeBuilder::new(nodes).build(&sections);
        tree.validate()?;
        Ok(tree)
    }

    /// Scan and notify until `cancel` fires or a pass fails.
    ///
    /// A failed pass notifies nothing and is returned to the caller.
    ///
    /// # Returns: `Result<(), AccelError>`
    /// * `Ok(())` - The loop was cancelled
    /// * `Err(AccelError)` - The first scan, validation or notification failure
    pub async fn run<N: Notifier>(
        &self,
        notifier: &N,
        cancel: CancellationToken,
    ) -> Result<(), AccelError> {
        info!("Publishing QAT resources every {:?}", self.interval);
        loop {
            let tree = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                result = self.scan_once() => result?,
            };
            info!(
                "Publishing {} instance(s) of {} resource type(s)",
                tree.instance_count(),
                tree.resource_types().count()
            );
            debug!("Resource tree: {tree:?}");
            notifier.notify(tree)?;

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
        info!("Scan loop cancelled");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qat::scanner::AdfCtl;
    use googletest::prelude::*;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct FixedStatus(&'static str);

    impl DriverStatus for FixedStatus {
        async fn status(&self) -> Result<String, AccelError> {
            Ok(self.0.to_string())
        }
    }

    /// Cancels the loop after the first notification.
    struct CancelAfterFirst {
        trees: Mutex<Vec<ResourceTree>>,
        cancel: CancellationToken,
    }

    impl Notifier for CancelAfterFirst {
        fn notify(&self, tree: ResourceTree) -> Result<(), AccelError> {
            self.trees.lock().unwrap().push(tree);
            self.cancel.cancel();
            Ok(())
        }
    }

    #[tokio::test]
    #[gtest]
    async fn publishes_then_stops_on_cancel() {
        let conf_dir = TempDir::new().unwrap();
        let dev_dir = TempDir::new().unwrap();
        fs::write(
            conf_dir.path().join("c6xx_dev0.conf"),
            "[DC]\nNumberCyInstances = 0\nNumberDcInstances = 1\nNumProcesses = 2\n",
        )
        .unwrap();
        fs::write(dev_dir.path().join("uio3"), "").unwrap();

        let scanner = ConfigScanner::new(
            FixedStatus(" qat_dev0 - type: c6xx, inst_id: 0\n"),
            conf_dir.path(),
            Duration::from_secs(1),
        );
        let scan_loop = ScanLoop::new(scanner, dev_dir.path(), Duration::from_secs(3600));
        let cancel = CancellationToken::new();
        let notifier = CancelAfterFirst {
            trees: Mutex::new(vec![]),
            cancel: cancel.clone(),
        };

        assert_that!(scan_loop.run(&notifier, cancel).await, ok(anything()));
        let trees = notifier.trees.lock().unwrap();
        assert_eq!(trees.len(), 1);
        assert_eq!(trees[0].instances("cy0_dc1").unwrap().len(), 2);
    }

    #[tokio::test]
    #[gtest]
    async fn already_cancelled_loop_does_not_scan() {
        let scanner = ConfigScanner::new(
            FixedStatus(" qat_dev0 - type: c6xx, inst_id: 0\n"),
            "/nonexistent/accelplug",
            Duration::from_secs(1),
        );
        let scan_loop = ScanLoop::new(scanner, "/nonexistent/accelplug", Duration::from_secs(1));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let notifier = CancelAfterFirst {
            trees: Mutex::new(vec![]),
            cancel: cancel.clone(),
        };

        assert_that!(scan_loop.run(&notifier, cancel).await, ok(anything()));
        assert!(notifier.trees.lock().unwrap().is_empty());
    }

    #[tokio::test]
    #[gtest]
    async fn status_timeout_stops_the_loop_unpublished() {
        let scanner = ConfigScanner::new(
            AdfCtl::new(vec!["sleep".into(), "5".into()], Duration::from_millis(100)),
            "/nonexistent/accelplug",
            Duration::from_secs(1),
        );
        let scan_loop = ScanLoop::new(scanner, "/nonexistent/accelplug", Duration::from_secs(1));
        let cancel = CancellationToken::new();
        let notifier = CancelAfterFirst {
            trees: Mutex::new(vec![]),
            cancel: cancel.clone(),
        };

        let result = scan_loop.run(&notifier, cancel).await;
        assert!(matches!(result, Err(AccelError::Timeout { .. })));
        expect_that!(result, err(displays_as(contains_substring("`sleep 5`"))));
        assert!(notifier.trees.lock().unwrap().is_empty());
    }
}
