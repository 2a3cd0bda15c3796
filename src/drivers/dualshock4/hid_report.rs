//! Sources:
//! - http://www.psdevwiki.com/ps4/DS4-USB
//! - http://eleccelerator.com/wiki/index.php?title=DualShock_4
//! - https://github.com/chrippa/ds4drv
use packed_struct::prelude::*;

pub const OUTPUT_REPORT_ID: u8 = 0x05;
pub const OUTPUT_REPORT_SIZE: usize = 31;

/// Enables rumble and light changes in the output report
pub const FLAGS_RUMBLE_LIGHTS: u8 = 0xff;

/// Output report setting the light bar and rumble motors
#[derive(PackedStruct, Debug, Copy, Clone, PartialEq)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "31")]
pub struct PackedOutputReport {
    // byte 0-3
    #[packed_field(bytes = "0")]
    pub report_id: u8, // Report ID (always 0x05)
    #[packed_field(bytes = "1")]
    pub flags: u8,

    // byte 4-5
    /// Right (weak, high frequency) motor
    #[packed_field(bytes = "4")]
    pub small_rumble: u8,
    /// Left (strong, low frequency) motor
    #[packed_field(bytes = "5")]
    pub big_rumble: u8,

    // byte 6-8
    #[packed_field(bytes = "6")]
    pub led_red: u8,
    #[packed_field(bytes = "7")]
    pub led_green: u8,
    #[packed_field(bytes = "8")]
    pub led_blue: u8,

    // byte 9-10
    /// Light bar flash on duration
    #[packed_field(bytes = "9")]
    pub flash_on: u8,
    /// Light bar flash off duration
    #[packed_field(bytes = "10")]
    pub flash_off: u8,
}

impl Default for PackedOutputReport {
    fn default() -> Self {
        Self {
            report_id: OUTPUT_REPORT_ID,
            flags: FLAGS_RUMBLE_LIGHTS,
            small_rumble: 0,
            big_rumble: 0,
            led_red: 0,
            led_green: 0,
            led_blue: 0,
            flash_on: 0xff,
            flash_off: 0x00,
        }
    }
}
