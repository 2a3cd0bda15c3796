pub mod device;

use std::error::Error;

use clap::{Parser, Subcommand};
use device::{handle_device, handle_devices, DeviceCommand};

use joyshock::config::SessionConfig;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to a YAML session configuration
    #[arg(short, long, global = true)]
    pub config: Option<String>,
    #[command(subcommand)]
    pub cmd: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// List all connected supported controllers
    List,
    /// Talk to a single controller
    Device {
        /// Hidraw path of the controller. Defaults to the first supported
        /// controller found.
        #[arg(short, long)]
        path: Option<String>,
        #[command(subcommand)]
        cmd: DeviceCommand,
    },
}

pub fn main_cli(args: Args) -> Result<(), Box<dyn Error>> {
    let Some(cmd) = args.cmd else {
        return Ok(());
    };

    let config = match args.config {
        Some(path) => SessionConfig::from_yaml_file(path)?,
        None => SessionConfig::default(),
    };
    let api = hidapi::HidApi::new()?;

    match cmd {
        Commands::List => handle_devices(&api)?,
        Commands::Device { path, cmd } => handle_device(&api, &config, path, cmd)?,
    }

    Ok(())
}
