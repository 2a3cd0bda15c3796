//! Framing for reading and writing the controller's SPI flash.
//!
//! Requests are sent as a raw [ReportType::CommandOutputReport] with the
//! timing byte in place of the rumble data:
//!
//! | offset  | content                      |
//! |---------|------------------------------|
//! | 0x00    | 0x01                         |
//! | 0x01    | timing byte                  |
//! | 0x0A    | subcommand (0x10 / 0x11)     |
//! | 0x0B-0E | flash address, little endian |
//! | 0x0F    | transfer length              |
//! | 0x10..  | data (writes only)           |
use thiserror::Error;

use super::hid_report::{ReportType, Subcommand};

/// Maximum number of bytes that fit in a single flash transfer
pub const MAX_TRANSFER_SIZE: usize = 0xEC;
/// Size of the buffers used for flash requests and responses
pub const BUFFER_SIZE: usize = 0x100;
/// Number of bytes written for a read request
pub const READ_REQUEST_SIZE: usize = 0x16;

/// Acknowledgement (0x90) followed by the subcommand id (0x10)
pub const READ_ACK: u16 = 0x1090;
/// Acknowledgement (0x80) followed by the subcommand id (0x11)
pub const WRITE_ACK: u16 = 0x1180;

const TIMING_OFFSET: usize = 0x01;
const SUBCOMMAND_OFFSET: usize = 0x0A;
const ADDRESS_OFFSET: usize = 0x0B;
const LENGTH_OFFSET: usize = 0x0F;
const WRITE_DATA_OFFSET: usize = 0x10;

const ACK_OFFSET: usize = 0x0D;
const ECHO_OFFSET: usize = 0x0F;
const READ_DATA_OFFSET: usize = 0x14;

/// Possible errors when accessing the SPI flash
#[derive(Error, Debug, PartialEq, Eq)]
pub enum FlashError {
    #[error("flash transfer of {0} bytes exceeds the maximum of {MAX_TRANSFER_SIZE} bytes")]
    InvalidLength(usize),
    #[error("no acknowledgement for flash read at {offset:#06x} after {attempts} attempts")]
    ReadRetriesExhausted { offset: u32, attempts: u32 },
    #[error("no acknowledgement for flash write at {offset:#06x} after {attempts} attempts")]
    WriteRetriesExhausted { offset: u32, attempts: u32 },
    #[error("flash read response holds {received} bytes, expected {expected}")]
    ShortResponse { expected: usize, received: usize },
}

fn encode_request(
    subcommand: Subcommand,
    timing: u8,
    offset: u32,
    length: usize,
) -> Result<[u8; BUFFER_SIZE], FlashError> {
    if length > MAX_TRANSFER_SIZE {
        return Err(FlashError::InvalidLength(length));
    }

    let mut buf = [0; BUFFER_SIZE];
    buf[0] = ReportType::CommandOutputReport as u8;
    buf[TIMING_OFFSET] = timing & 0xF;
    buf[SUBCOMMAND_OFFSET] = subcommand as u8;
    buf[ADDRESS_OFFSET..ADDRESS_OFFSET + 4].copy_from_slice(&offset.to_le_bytes());
    buf[LENGTH_OFFSET] = length as u8;

    Ok(buf)
}

/// Encode a flash read request. Returns the request and the number of bytes
/// to write.
pub fn encode_read_request(
    timing: u8,
    offset: u32,
    length: usize,
) -> Result<([u8; BUFFER_SIZE], usize), FlashError> {
    let buf = encode_request(Subcommand::SpiFlashRead, timing, offset, length)?;
    Ok((buf, READ_REQUEST_SIZE))
}

/// Encode a flash write request carrying the given data. Returns the request
/// and the number of bytes to write.
pub fn encode_write_request(
    timing: u8,
    offset: u32,
    data: &[u8],
) -> Result<([u8; BUFFER_SIZE], usize), FlashError> {
    let mut buf = encode_request(Subcommand::SpiFlashWrite, timing, offset, data.len())?;
    buf[WRITE_DATA_OFFSET..WRITE_DATA_OFFSET + data.len()].copy_from_slice(data);
    Ok((buf, WRITE_DATA_OFFSET + data.len()))
}

/// Returns the acknowledgement signature of a flash response
pub fn response_ack(buf: &[u8]) -> Option<u16> {
    let bytes = buf.get(ACK_OFFSET..ACK_OFFSET + 2)?;
    Some(u16::from_le_bytes([bytes[0], bytes[1]]))
}

/// Returns the flash address echoed back in a read response
pub fn response_offset(buf: &[u8]) -> Option<u32> {
    let bytes = buf.get(ECHO_OFFSET..ECHO_OFFSET + 4)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Returns true if the buffer is the acknowledgement of a read at `offset`
pub fn is_read_response(buf: &[u8], offset: u32) -> bool {
    response_ack(buf) == Some(READ_ACK) && response_offset(buf) == Some(offset)
}

/// Returns true if the buffer is the acknowledgement of a write
pub fn is_write_response(buf: &[u8]) -> bool {
    response_ack(buf) == Some(WRITE_ACK)
}

/// Extract `length` bytes of flash data from a read response of which
/// `received` bytes are valid
pub fn read_response_data(
    buf: &[u8],
    received: usize,
    length: usize,
) -> Result<Vec<u8>, FlashError> {
    let expected = READ_DATA_OFFSET + length;
    if received < expected || buf.len() < expected {
        return Err(FlashError::ShortResponse { expected, received });
    }
    Ok(buf[READ_DATA_OFFSET..expected].to_vec())
}
