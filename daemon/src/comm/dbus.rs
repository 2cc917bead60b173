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

//! D-Bus publication of the resource inventory.
//!
//! The scan loop hands every validated [`ResourceTree`] to a [`DbusNotifier`], which keeps the
//! latest one for [`inventory_interface::InventoryInterface`] to serve.

pub mod inventory_interface;

use crate::error::AccelError;
use crate::qat::tree::ResourceTree;
use crate::scan_loop::Notifier;
use inventory_interface::InventoryInterface;
use log::trace;
use std::sync::{Arc, Mutex};

pub static SERVICE_NAME: &str = "io.accelplug";
pub static INVENTORY_OBJECT_PATH: &str = "/io/accelplug/inventory";

/// Holds the most recently published inventory.
#[derive(Debug, Clone, Default)]
pub struct DbusNotifier {
    latest: Arc<Mutex<Option<ResourceTree>>>,
}

impl DbusNotifier {
    pub fn new() -> Self {
        DbusNotifier::default()
    }

    /// A D-Bus interface object serving this notifier's inventory.
    pub fn interface(&self) -> InventoryInterface {
        InventoryInterface::new(self.clone())
    }

    /// Clone of the latest inventory.
    ///
    /// # Returns: `Result<ResourceTree, AccelError>`
    /// * `Ok(ResourceTree)` - The last published tree
    /// * `Err(AccelError::Internal)` - Nothing has been published yet
    pub fn snapshot(&self) -> Result<ResourceTree, AccelError> {
        self.latest
            .lock()
            .map_err(|_| AccelError::Internal("inventory lock is poisoned".into()))?
            .clone()
            .ok_or_else(|| AccelError::Internal("no inventory has been published yet".into()))
    }
}

impl Notifier for DbusNotifier {
    fn notify(&self, tree: ResourceTree) -> Result<(), AccelError> {
        trace!("Storing inventory with {} instance(s)", tree.instance_count());
        *self
            .latest
            .lock()
            .map_err(|_| AccelError::Internal("inventory lock is poisoned".into()))? = Some(tree);
        Ok(())
    }
}
