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

//! `accelplugd` periodically scans the QAT devices of the host and publishes the resulting
//! resource inventory on the system D-Bus.
//!
//! # DBus Service
//!
//! - **Service Name**: `io.accelplug`
//! - **Inventory Interface**: `/io/accelplug/inventory` - Read-only view of the last inventory
//!
//! # Environment Variables
//!
//! - `RUST_LOG` - Controls logging level (`trace`, `debug`, `info`, `warn`, `error`
//!   or `off`). Defaults to `info`
//!
//! # Lifecycle
//!
//! The daemon stops cleanly on SIGINT or SIGTERM. A failed scan stops it with a non-zero exit
//! status and no inventory is published for that scan; restarting is left to the service
//! manager.

use accelplug::comm::dbus::{DbusNotifier, INVENTORY_OBJECT_PATH, SERVICE_NAME};
use accelplug::config::{SCAN_INTERVAL, load_settings};
use accelplug::qat::scanner::{AdfCtl, ConfigScanner};
use accelplug::scan_loop::ScanLoop;
use log::{debug, error, info};
use std::error::Error;
use tokio::signal::unix::{SignalKind, signal};
use tokio_util::sync::CancellationToken;
use zbus::connection;

/// Cancel `cancel` on the first SIGINT or SIGTERM.
async fn cancel_on_signal(cancel: CancellationToken) {
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(e) => {
            error!("Cannot listen for SIGTERM: {e}");
            return;
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("Received SIGINT"),
        _ = sigterm.recv() => info!("Received SIGTERM"),
    }
    cancel.cancel();
}

/// Main entry point for the accelplugd daemon.
///
/// # Returns: `Result<(), Box<dyn Error>>`
/// * `Ok(())` - Stopped by a signal
/// * `Err(Box<dyn Error>)` - DBus setup failed or a scan failed
#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let settings = load_settings();
    debug!("Running with {settings:?}");

    let notifier = DbusNotifier::new();
    let _conn = connection::Builder::system()?
        .name(SERVICE_NAME)?
        .serve_at(INVENTORY_OBJECT_PATH, notifier.interface())?
        .build()
        .await?;
    info!("Started {SERVICE_NAME} dbus service");

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_signal(cancel.clone()));

    let scanner = ConfigScanner::new(
        AdfCtl::from_settings(&settings),
        &settings.qat_config_dir,
        settings.io_timeout,
    );
    let scan_loop = ScanLoop::new(scanner, &settings.dev_dir, SCAN_INTERVAL);
    if let Err(e) = scan_loop.run(&notifier, cancel).await {
        error!("Stopping: {e}");
        return Err(e.into());
    }
    Ok(())
}
