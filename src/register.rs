// Copyright 2026, The pwrctl Developers
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/license/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option.  This file may not be copied, modified, or distributed
// except according to those terms.

//! Whole-register access over SMBus block transfers
//!
//! The controller exposes 32-bit registers behind 16-bit addresses.  Both
//! travel little-endian inside a block frame: a write carries the address
//! followed by the value, a read first selects the address and then pulls
//! a block whose bytes 2..6 hold the value.

use crate::core::I2CDevice;
use crate::error::{Error, Result};
use byteorder::{ByteOrder, LittleEndian};
use log::trace;

/// Block command that reads back the selected register
pub const READ_COMMAND: u8 = 0x01;
/// Block command that selects the register for the next read
pub const ADDRESS_SELECT_COMMAND: u8 = 0x02;
/// Block command that writes a register
pub const WRITE_COMMAND: u8 = 0x07;

/// Content of every frame byte that has not been set explicitly
pub const FILLER_BYTE: u8 = 0xFF;

/// As specified in SMBus standard
pub const SMBUS_BLOCK_MAX: usize = 32;

const ADDRESS_LEN: usize = 2;
const VALUE_LEN: usize = 4;

/// Payload of one SMBus block transfer
#[derive(Clone, PartialEq, Eq)]
pub struct BlockFrame {
    buf: [u8; SMBUS_BLOCK_MAX],
    len: usize,
}

impl Default for BlockFrame {
    fn default() -> BlockFrame {
        BlockFrame {
            buf: [FILLER_BYTE; SMBUS_BLOCK_MAX],
            len: 0,
        }
    }
}

impl std::fmt::Debug for BlockFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BlockFrame({:02x?})", self.as_bytes())
    }
}

impl BlockFrame {
    /// Copy `bytes` into a fresh frame, dropping anything past 32 bytes
    pub fn from_bytes(bytes: &[u8]) -> BlockFrame {
        let mut frame = BlockFrame::default();
        frame.len = bytes.len().min(SMBUS_BLOCK_MAX);
        frame.buf[..frame.len].copy_from_slice(&bytes[..frame.len]);
        frame
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The whole 32-byte scratch area, filler included
    pub fn raw(&self) -> &[u8; SMBUS_BLOCK_MAX] {
        &self.buf
    }

    fn put_address(&mut self, address: u16) {
        LittleEndian::write_u16(&mut self.buf[..ADDRESS_LEN], address);
        self.len = self.len.max(ADDRESS_LEN);
    }

    fn put_value(&mut self, value: u32) {
        LittleEndian::write_u32(&mut self.buf[ADDRESS_LEN..ADDRESS_LEN + VALUE_LEN], value);
        self.len = self.len.max(ADDRESS_LEN + VALUE_LEN);
    }
}

/// Frame sent with `ADDRESS_SELECT_COMMAND`
pub fn encode_select_frame(address: u16) -> BlockFrame {
    let mut frame = BlockFrame::default();
    frame.put_address(address);
    frame
}

/// Frame sent with `WRITE_COMMAND`
pub fn encode_write_frame(address: u16, value: u32) -> BlockFrame {
    let mut frame = BlockFrame::default();
    frame.put_address(address);
    frame.put_value(value);
    frame
}

/// Pull the register value out of a read response
///
/// The first two bytes echo protocol framing and are skipped.  Returns
/// `None` if the response is too short to hold a value.
pub fn decode_register_value(bytes: &[u8]) -> Option<u32> {
    bytes
        .get(ADDRESS_LEN..ADDRESS_LEN + VALUE_LEN)
        .map(LittleEndian::read_u32)
}

/// Write `value` into the register at `address`
pub fn write_register<D: I2CDevice>(dev: &mut D, address: u16, value: u32) -> Result<()> {
    let frame = encode_write_frame(address, value);
    trace!("write register 0x{:04x} <- 0x{:08x}", address, value);
    dev.smbus_write_block_data(WRITE_COMMAND, frame.as_bytes())
        .map_err(Error::transaction)
}

/// Read the register at `address`
///
/// Selecting the address and reading the value are separate transactions.
/// When the select fails the read is not attempted.
pub fn read_register<D: I2CDevice>(dev: &mut D, address: u16) -> Result<u32> {
    let frame = encode_select_frame(address);
    dev.smbus_write_block_data(ADDRESS_SELECT_COMMAND, frame.as_bytes())
        .map_err(|e| Error::RegisterSelectFailed {
            address,
            source: Box::new(e),
        })?;

    let response = dev
        .smbus_read_block_data(READ_COMMAND)
        .map_err(|e| Error::RegisterReadFailed {
            address,
            source: Box::new(e),
        })?;
    let response = BlockFrame::from_bytes(&response);
    let value = decode_register_value(response.as_bytes()).ok_or(Error::ShortRegisterResponse {
        address,
        len: response.len(),
    })?;
    trace!("read register 0x{:04x} -> 0x{:08x}", address, value);
    Ok(value)
}
