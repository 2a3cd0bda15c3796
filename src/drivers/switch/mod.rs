pub mod calibration;
pub mod driver;
pub mod hid_report;
pub mod spi;

#[cfg(test)]
pub mod calibration_test;

// Hardware ID's
pub const VID: u16 = 0x057e;
pub const JOYCON_L_BT_PID: u16 = 0x2006;
pub const JOYCON_R_BT_PID: u16 = 0x2007;
pub const PRO_CONTROLLER_PID: u16 = 0x2009;
pub const CHARGING_GRIP_PID: u16 = 0x200e;
pub const PIDS: [u16; 4] = [
    JOYCON_L_BT_PID,
    JOYCON_R_BT_PID,
    PRO_CONTROLLER_PID,
    CHARGING_GRIP_PID,
];

/// IMU samples per second pushed by Joy-Cons and the Pro Controller
pub const SAMPLE_RATE: u32 = 67;

/// Size of the output and input report buffers
pub const PACKET_SIZE: usize = 0x40;
