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

//! `fpga_tool` inspects DFL FPGA cards, installs GBS bitstreams and reprograms ports.
//!
//! ```bash
//! fpga_tool -b nlb_mode_3.gbs info
//! fpga_tool -b nlb_mode_3.gbs --dry-run install
//! fpga_tool -b nlb_mode_3.gbs -d /dev/dfl-port.0 pr
//! fpga_tool list
//! ```

mod info;
mod install;
mod list;
mod pr;

use accelplug::config::{Settings, load_settings};
use accelplug::error::AccelError;
use accelplug::fpga::dfl::DflTopology;
use clap::{Parser, Subcommand};
use log::debug;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "fpga_tool")]
#[command(bin_name = "fpga_tool")]
struct Cli {
    #[arg(short = 'b', global = true, value_name = "BITSTREAM", help = "Path to the bitstream file")]
    bitstream: Option<PathBuf>,
    #[arg(
        short = 'd',
        global = true,
        value_name = "DEVICE",
        help = "Path to the FME or port device node, e.g. /dev/dfl-port.0"
    )]
    device: Option<PathBuf>,
    #[arg(long = "dry-run", global = true, help = "Validate only, do not modify anything")]
    dry_run: bool,
    #[arg(long, global = true, help = "Overwrite an already installed bitstream")]
    force: bool,
    #[arg(short = 'q', global = true, help = "Print essential information only")]
    quiet: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Commands {
    /// Print the identity and install path of a bitstream (-b)
    Info,
    /// Install a bitstream below the bitstream directory (-b)
    Install,
    /// Program a bitstream into a port (-b, -d)
    Pr,
    /// Print information about an FME or a port (-d)
    Fpgainfo,
    /// Print information about an FME (-d)
    Fmeinfo,
    /// Print information about a port (-d)
    Portinfo,
    /// List FMEs and ports
    List,
    /// List FMEs
    ListFme,
    /// List ports
    ListPort,
}

impl Commands {
    fn needs_bitstream(self) -> bool {
        matches!(self, Commands::Info | Commands::Install | Commands::Pr)
    }

    fn needs_device(self) -> bool {
        matches!(
            self,
            Commands::Pr | Commands::Fpgainfo | Commands::Fmeinfo | Commands::Portinfo
        )
    }
}

fn required<'a>(value: Option<&'a Path>, flag: &str, command: Commands) -> Result<&'a Path, AccelError> {
    value.ok_or_else(|| {
        AccelError::Argument(format!(
            "{flag} is required for the {} command",
            format!("{command:?}").to_lowercase()
        ))
    })
}

/// Reject a command whose mandatory flags are missing, before touching anything.
fn validate_flags(
    command: Commands,
    bitstream: Option<&Path>,
    device: Option<&Path>,
) -> Result<(), AccelError> {
    if command.needs_bitstream() {
        required(bitstream, "-b (bitstream file)", command)?;
    }
    if command.needs_device() {
        required(device, "-d (device node)", command)?;
    }
    Ok(())
}

/// Validate the flags, then load the settings and run the command.
fn execute(cli: &Cli, load: impl FnOnce() -> Settings) -> Result<String, AccelError> {
    validate_flags(cli.command, cli.bitstream.as_deref(), cli.device.as_deref())?;
    let settings = load();
    run(cli, &settings)
}

fn run(cli: &Cli, settings: &Settings) -> Result<String, AccelError> {
    let bitstream = cli.bitstream.as_deref();
    let device = cli.device.as_deref();
    let topology = DflTopology::from_settings(settings);
    let bitstream_arg = || required(bitstream, "-b (bitstream file)", cli.command);
    let device_arg = || required(device, "-d (device node)", cli.command);
    match cli.command {
        Commands::Info => info::bitstream_info(bitstream_arg()?, &settings.bitstream_dir, cli.quiet),
        Commands::Install => install::install(
            bitstream_arg()?,
            &settings.bitstream_dir,
            cli.dry_run,
            cli.force,
            cli.quiet,
        ),
        Commands::Pr => pr::program(&topology, device_arg()?, bitstream_arg()?, cli.dry_run, cli.quiet),
        Commands::Fpgainfo => info::fpga_info(&topology, device_arg()?, cli.quiet),
        Commands::Fmeinfo => info::fme_info(&topology, device_arg()?, cli.quiet),
        Commands::Portinfo => info::port_info(&topology, device_arg()?, cli.quiet),
        Commands::List => list::list(&topology, true, true, cli.quiet),
        Commands::ListFme => list::list(&topology, true, false, cli.quiet),
        Commands::ListPort => list::list(&topology, false, true, cli.quiet),
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    debug!("parsed cli command with {cli:?}");
    match execute(&cli, load_settings) {
        Ok(output) => {
            print!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
