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

use crate::comm::dbus::DbusNotifier;
use crate::error::AccelError;
use log::info;
use zbus::{fdo, interface};

/// Read-only view of the published inventory.
pub struct InventoryInterface {
    notifier: DbusNotifier,
}

impl InventoryInterface {
    pub fn new(notifier: DbusNotifier) -> Self {
        InventoryInterface { notifier }
    }
}

#[interface(name = "io.accelplug.inventory")]
impl InventoryInterface {
    /// The whole inventory as JSON.
    async fn get_inventory(&self) -> Result<String, fdo::Error> {
        info!("get_inventory called");
        Ok(self.notifier.snapshot()?.to_json()?)
    }

    /// Resource type labels, one per line.
    async fn get_resource_types(&self) -> Result<String, fdo::Error> {
        info!("get_resource_types called");
        let tree = self.notifier.snapshot()?;
        Ok(tree.resource_types().collect::<Vec<_>>().join("\n"))
    }

    /// Instances of one resource type as JSON.
    async fn get_instances(&self, resource_type: &str) -> Result<String, fdo::Error> {
        info!("get_instances called with resource_type: {resource_type}");
        let tree = self.notifier.snapshot()?;
        let instances = tree.instances(resource_type).ok_or_else(|| {
            AccelError::Argument(format!("Unknown resource type '{resource_type}'"))
        })?;
        Ok(serde_json::to_string(instances).map_err(|e| {
            AccelError::Internal(format!("failed to serialize {resource_type}: {e}"))
        })?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qat::tree::{DeviceInfo, Health, ResourceTree, SECTION_NAME_ENV};
    use crate::scan_loop::Notifier;
    use googletest::prelude::*;
    use std::collections::{BTreeMap, BTreeSet};
    use std::path::PathBuf;

    fn published() -> DbusNotifier {
        let mut tree = ResourceTree::new();
        for (label, id) in [("cy1_dc0", "SSL_0"), ("cy1_dc0", "SSL_1"), ("cy0_dc1_pinned", "DC_dev0_0")] {
            tree.add_device(
                label,
                id.to_string(),
                DeviceInfo {
                    health: Health::Healthy,
                    node_paths: BTreeSet::from([PathBuf::from("/dev/uio0")]),
                    env: BTreeMap::from([(SECTION_NAME_ENV.to_string(), "SSL".to_string())]),
                },
            );
        }
        let notifier = DbusNotifier::new();
        notifier.notify(tree).unwrap();
        notifier
    }

    #[tokio::test]
    #[gtest]
    async fn lists_resource_types() {
        let iface = published().interface();
        assert_that!(
            iface.get_resource_types().await,
            ok(eq("cy0_dc1_pinned\ncy1_dc0"))
        );
    }

    #[tokio::test]
    #[gtest]
    async fn instances_of_known_type() {
        let iface = published().interface();
        let json: serde_json::Value =
            serde_json::from_str(&iface.get_instances("cy1_dc0").await.unwrap()).unwrap();
        let ids: Vec<&String> = json.as_object().unwrap().keys().collect();
        assert_eq!(ids, vec!["SSL_0", "SSL_1"]);
    }

    #[tokio::test]
    #[gtest]
    async fn unknown_type_is_invalid_args() {
        let iface = published().interface();
        let result = iface.get_instances("cy9_dc9").await;
        assert!(matches!(result, Err(fdo::Error::InvalidArgs(_))));
    }

    #[tokio::test]
    #[gtest]
    async fn nothing_published_fails() {
        let iface = DbusNotifier::new().interface();
        assert!(matches!(
            iface.get_inventory().await,
            Err(fdo::Error::Failed(_))
        ));
    }
}
