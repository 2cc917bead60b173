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

//! The resource inventory published to the container orchestrator and its builder.

use crate::error::AccelError;
use crate::qat::{Section, SectionMap};
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// Environment variable telling a workload which section its instance belongs to.
pub static SECTION_NAME_ENV: &str = "QAT_SECTION_NAME";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Health {
    Healthy,
    Unhealthy,
}

/// Everything a container needs to use one instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub health: Health,
    pub node_paths: BTreeSet<PathBuf>,
    pub env: BTreeMap<String, String>,
}

/// Instances grouped by resource type label, then by instance id.
///
/// Serializes as the nested maps only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceTree {
    types: BTreeMap<String, BTreeMap<String, DeviceInfo>>,
    /// `{type}/{id}` of instances that were added more than once
    replaced: BTreeSet<String>,
}

impl Serialize for ResourceTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.types.serialize(serializer)
    }
}

impl ResourceTree {
    pub fn new() -> Self {
        ResourceTree::default()
    }

    /// Add an instance, replacing and returning a previous one with the same type and id.
    ///
    /// A replacement is remembered and later rejected by [`ResourceTree::validate`].
    pub fn add_device(
        &mut self,
        resource_type: &str,
        id: String,
        info: DeviceInfo,
    ) -> Option<DeviceInfo> {
        let key = format!("{resource_type}/{id}");
        let previous = self
            .types
            .entry(resource_type.to_string())
            .or_default()
            .insert(id, info);
        if previous.is_some() {
            self.replaced.insert(key);
        }
        previous
    }

    pub fn resource_types(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    pub fn instances(&self, resource_type: &str) -> Option<&BTreeMap<String, DeviceInfo>> {
        self.types.get(resource_type)
    }

    /// Number of instances over all resource types.
    pub fn instance_count(&self) -> usize {
        self.types.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Check that the tree is publishable, whatever transport carries it.
    ///
    /// # Returns: `Result<(), AccelError>`
    /// * `Ok(())` - Every label and id is non-empty and every instance has node paths and a
    ///   non-empty `QAT_SECTION_NAME`
    /// * `Err(AccelError::Internal)` - The first offending instance
    pub fn validate(&self) -> Result<(), AccelError> {
        if let Some(key) = self.replaced.iter().next() {
            return Err(AccelError::Internal(format!(
                "instance {key} was added more than once"
            )));
        }
        for (resource_type, instances) in &self.types {
            if resource_type.is_empty() {
                return Err(AccelError::Internal(
                    "resource tree contains an empty resource type label".into(),
                ));
            }
            if instances.is_empty() {
                return Err(AccelError::Internal(format!(
                    "resource type {resource_type} has no instances"
                )));
            }
            for (id, info) in instances {
                if id.is_empty() {
                    return Err(AccelError::Internal(format!(
                        "resource type {resource_type} contains an instance without id"
                    )));
                }
                if info.node_paths.is_empty() {
                    return Err(AccelError::Internal(format!(
                        "instance {id} of {resource_type} has no device nodes"
                    )));
                }
                if info.env.get(SECTION_NAME_ENV).is_none_or(String::is_empty) {
                    return Err(AccelError::Internal(format!(
                        "instance {id} of {resource_type} has no {SECTION_NAME_ENV}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Serialize the tree as JSON.
    pub fn to_json(&self) -> Result<String, AccelError> {
        serde_json::to_string(self)
            .map_err(|e| AccelError::Internal(format!("failed to serialize resource tree: {e}")))
    }
}

/// Resource type label of a section, e.g. `cy2_dc0` or `cy1_dc0_pinned`.
pub fn resource_type_label(section: &Section) -> String {
    let label = format!(
        "cy{}_dc{}",
        section.crypto_engines, section.compression_engines
    );
    if section.pinned {
        label + "_pinned"
    } else {
        label
    }
}

/// Expands sections into instances that all share the same device nodes.
#[derive(Debug, Clone)]
pub struct ResourceTreeBuilder {
    device_nodes: BTreeSet<PathBuf>,
}

impl ResourceTreeBuilder {
    pub fn new(device_nodes: BTreeSet<PathBuf>) -> Self {
        ResourceTreeBuilder { device_nodes }
    }

    fn device_info(&self, section_name: &str) -> DeviceInfo {
        DeviceInfo {
            health: Health::Healthy,
            node_paths: self.device_nodes.clone(),
            env: BTreeMap::from([(SECTION_NAME_ENV.to_string(), section_name.to_string())]),
        }
    }

    /// Build the inventory. Pinned sections yield `{section}_{device}_{i}` per device, the
    /// others `{section}_{i}` once.
    pub fn build(&self, sections: &SectionMap) -> ResourceTree {
        let mut tree = ResourceTree::new();
        for (name, section) in sections {
            let label = resource_type_label(section);
            if section.pinned {
                for endpoint in &section.endpoints {
                    for i in 0..endpoint.processes {
                        tree.add_device(
                            &label,
                            format!("{name}_{}_{i}", endpoint.id),
                            self.device_info(name),
                        );
                    }
                }
            } else if let Some(first) = section.endpoints.first() {
                for i in 0..first.processes {
                    tree.add_device(&label, format!("{name}_{i}"), self.device_info(name));
                }
            }
        }
        tree
    }
}
