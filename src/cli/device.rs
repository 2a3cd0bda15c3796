use std::error::Error;
use std::thread;
use std::time::{Duration, Instant};

use clap::Subcommand;
use tabled::settings::{Panel, Style};
use tabled::{Table, Tabled};

use joyshock::calibration::{AxisCalibration, CalibrationSource};
use joyshock::config::SessionConfig;
use joyshock::drivers::device::identify;
use joyshock::session::DeviceSession;

#[derive(Subcommand, Debug, Clone)]
pub enum DeviceCommand {
    /// Initialize the controller and display its calibration
    Info,
    /// Rumble a Joy-Con or Pro Controller
    Rumble {
        /// Frequency (0-255)
        #[arg(short, long, default_value_t = 100)]
        frequency: u8,
        /// Intensity (0-8)
        #[arg(short, long, default_value_t = 3)]
        intensity: u8,
        /// How long to rumble for, in milliseconds
        #[arg(short, long, default_value_t = 500)]
        duration: u64,
    },
    /// Set DualShock 4 light bar colour and rumble
    Lights {
        red: u8,
        green: u8,
        blue: u8,
        #[arg(long, default_value_t = 0)]
        small: u8,
        #[arg(long, default_value_t = 0)]
        big: u8,
    },
    /// Set the player lights of a Joy-Con or Pro Controller
    PlayerLights {
        /// Low nibble turns lights on, high nibble makes them flash
        pattern: u8,
    },
    /// Collect gyro samples and print the continuous calibration offset
    Gyro {
        /// How long to collect samples for, in seconds
        #[arg(short, long, default_value_t = 5)]
        seconds: u64,
    },
    /// Dump bytes from the SPI flash of a Joy-Con or Pro Controller
    ReadFlash {
        /// Flash address, e.g. 0x6050
        #[arg(value_parser = parse_u32)]
        offset: u32,
        /// Number of bytes to read
        #[arg(value_parser = parse_u32)]
        length: u32,
    },
}

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "Path")]
    path: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Connection")]
    connection: String,
    #[tabled(rename = "Interface")]
    interface: i32,
}

#[derive(Tabled)]
struct AxisRow {
    #[tabled(rename = "Axis")]
    axis: String,
    #[tabled(rename = "Min")]
    min: u16,
    #[tabled(rename = "Center")]
    center: u16,
    #[tabled(rename = "Max")]
    max: u16,
    #[tabled(rename = "Source")]
    source: String,
}

fn parse_u32(value: &str) -> Result<u32, String> {
    let parsed = match value.strip_prefix("0x") {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => value.parse(),
    };
    parsed.map_err(|e| e.to_string())
}

fn source_name(source: CalibrationSource) -> String {
    match source {
        CalibrationSource::Factory => "factory",
        CalibrationSource::User => "user",
        CalibrationSource::Fallback => "fallback",
    }
    .to_string()
}

fn axis_row(axis: &str, calibration: &AxisCalibration, source: CalibrationSource) -> AxisRow {
    AxisRow {
        axis: axis.to_string(),
        min: calibration.min,
        center: calibration.center,
        max: calibration.max,
        source: source_name(source),
    }
}

/// List all connected supported controllers
pub fn handle_devices(api: &hidapi::HidApi) -> Result<(), Box<dyn Error>> {
    let mut rows = Vec::new();
    for info in api.device_list() {
        let Some((family, connection)) = identify(
            info.vendor_id(),
            info.product_id(),
            info.interface_number(),
        ) else {
            continue;
        };
        rows.push(DeviceRow {
            path: info.path().to_string_lossy().to_string(),
            name: family.to_string(),
            connection: connection.to_string(),
            interface: info.interface_number(),
        });
    }
    let count = rows.len();

    let mut table = Table::new(rows);
    table
        .with(Style::modern_rounded())
        .with(Panel::header("Controllers"));
    println!("{table}");
    println!("Found {count} controller(s)");

    Ok(())
}

fn open_session(
    api: &hidapi::HidApi,
    config: &SessionConfig,
    path: Option<String>,
) -> Result<DeviceSession, Box<dyn Error>> {
    if let Some(path) = path {
        return Ok(DeviceSession::open_path(api, path, config)?);
    }

    let info = api.device_list().find(|info| {
        identify(
            info.vendor_id(),
            info.product_id(),
            info.interface_number(),
        )
        .is_some()
    });
    let Some(info) = info else {
        return Err("No supported controller found".into());
    };

    Ok(DeviceSession::open(api, info, config)?)
}

/// Run a command against a single controller
pub fn handle_device(
    api: &hidapi::HidApi,
    config: &SessionConfig,
    path: Option<String>,
    cmd: DeviceCommand,
) -> Result<(), Box<dyn Error>> {
    let mut session = open_session(api, config, path)?;
    session.init()?;

    match cmd {
        DeviceCommand::Info => {
            let calibration = *session.calibration();
            let capabilities = session.capabilities();
            let sticks = calibration.sticks;
            let mut rows = Vec::new();
            if capabilities.has_left_stick {
                rows.push(axis_row("Left X", &sticks.left.x, sticks.left.source));
                rows.push(axis_row("Left Y", &sticks.left.y, sticks.left.source));
            }
            if capabilities.has_right_stick {
                rows.push(axis_row("Right X", &sticks.right.x, sticks.right.source));
                rows.push(axis_row("Right Y", &sticks.right.y, sticks.right.source));
            }

            let mut table = Table::new(rows);
            table
                .with(Style::modern_rounded())
                .with(Panel::header(format!(
                    "{} ({})",
                    session.name(),
                    session.connection()
                )));
            println!("{table}");

            if let Some(sensor) = calibration.sensor {
                println!(
                    "Accel origin: {:?} coeff: {:?} ({})",
                    sensor.accel_origin,
                    sensor.accel_coeff,
                    source_name(sensor.source)
                );
                println!(
                    "Gyro origin: {:?} coeff: {:?} ({})",
                    sensor.gyro_origin,
                    sensor.gyro_coeff,
                    source_name(sensor.source)
                );
            }
            if let Some(colors) = calibration.colors {
                println!(
                    "Body: #{:06x}  Buttons: #{:06x}  Left grip: #{:06x}  Right grip: #{:06x}",
                    colors.body, colors.buttons, colors.left_grip, colors.right_grip
                );
            }
        }
        DeviceCommand::Rumble {
            frequency,
            intensity,
            duration,
        } => {
            session.rumble(frequency, intensity)?;
            thread::sleep(Duration::from_millis(duration));
            session.rumble(0, 0)?;
        }
        DeviceCommand::Lights {
            red,
            green,
            blue,
            small,
            big,
        } => {
            session.set_lights_and_rumble(small, big, red, green, blue)?;
        }
        DeviceCommand::PlayerLights { pattern } => {
            session.set_player_lights(pattern)?;
        }
        DeviceCommand::Gyro { seconds } => {
            session.set_continuous_calibration(true);
            session.reset_calibration();
            let deadline = Instant::now() + Duration::from_secs(seconds);
            let mut count = 0;
            while Instant::now() < deadline {
                if session.read_report()?.is_some() {
                    count += 1;
                }
            }
            let [x, y, z] = session.average();
            println!("Collected {count} samples");
            println!("Gyro offset (rad/s): x={x:.5} y={y:.5} z={z:.5}");
        }
        DeviceCommand::ReadFlash { offset, length } => {
            let data = session.read_flash(offset, length as usize)?;
            for (i, chunk) in data.chunks(16).enumerate() {
                let line: Vec<String> = chunk.iter().map(|b| format!("{b:02x}")).collect();
                println!("{:#06x}: {}", offset as usize + i * 16, line.join(" "));
            }
        }
    }

    session.deinit()?;

    Ok(())
}
