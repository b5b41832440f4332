// Copyright 2015, Paul Osborne <osbpau@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/license/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option.  This file may not be copied, modified, or distributed
// except according to those terms.

use std::error::Error;

/// One segment of a raw I2C transfer
///
/// Every message names its own target address, so a transfer may reach a
/// peripheral other than the one the handle was configured for.
#[derive(Debug)]
pub enum I2CMessage<'a> {
    /// Read from the target into the buffer
    Read { address: u16, data: &'a mut [u8] },
    /// Write the buffer to the target
    Write { address: u16, data: &'a [u8] },
}

impl<'a> I2CMessage<'a> {
    pub fn read(address: u16, data: &'a mut [u8]) -> I2CMessage<'a> {
        I2CMessage::Read { address, data }
    }

    pub fn write(address: u16, data: &'a [u8]) -> I2CMessage<'a> {
        I2CMessage::Write { address, data }
    }

    pub fn address(&self) -> u16 {
        match *self {
            I2CMessage::Read { address, .. } | I2CMessage::Write { address, .. } => address,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            I2CMessage::Read { data, .. } => data.len(),
            I2CMessage::Write { data, .. } => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Interface to an I2C Slave Device from an I2C Master
///
/// Implementations hold an open bus handle that has already been
/// configured with the address of the slave device.  Every method
/// performs exactly one transaction and never retries; a failure from
/// the transport fails the whole transaction.
pub trait I2CDevice {
    type Error: Error + Send + Sync + 'static;

    /// This sends a single bit to the device, at the place of the Rd/Wr bit
    fn smbus_write_quick(&mut self, bit: bool) -> Result<(), Self::Error>;

    /// Read a single byte from a device, without specifying a device register
    ///
    /// Some devices are so simple that this interface is enough; for
    /// others, it is a shorthand if you want to read the same register as in
    /// the previous SMBus command.
    fn smbus_read_byte(&mut self) -> Result<u8, Self::Error>;

    /// Write a single byte to a device, without specifying a device register
    ///
    /// This is the opposite operation as smbus_read_byte.  As with read_byte,
    /// no register is specified.
    fn smbus_write_byte(&mut self, value: u8) -> Result<(), Self::Error>;

    /// Read a single byte from a device, from a designated register
    ///
    /// The register is specified through the Comm byte.
    fn smbus_read_byte_data(&mut self, command: u8) -> Result<u8, Self::Error>;

    /// Write a single byte to a specific register on a device
    ///
    /// The register is specified through the Comm byte.
    fn smbus_write_byte_data(&mut self, command: u8, value: u8) -> Result<(), Self::Error>;

    /// Read 2 bytes from a given register on a device
    fn smbus_read_word_data(&mut self, command: u8) -> Result<u16, Self::Error>;

    /// Write 2 bytes to a given register on a device
    fn smbus_write_word_data(&mut self, command: u8, value: u16) -> Result<(), Self::Error>;

    /// Read a block of up to 32 bytes from a device
    ///
    /// The actual number of bytes available to read is returned in the count
    /// byte.  This code returns a correctly sized vector containing the
    /// count bytes read from the device.
    fn smbus_read_block_data(&mut self, command: u8) -> Result<Vec<u8>, Self::Error>;

    /// Write a block of up to 32 bytes to a device
    ///
    /// Anything past the 32nd byte of `values` is dropped, the Count
    /// byte never exceeds the SMBus block limit.
    fn smbus_write_block_data(&mut self, command: u8, values: &[u8]) -> Result<(), Self::Error>;

    /// Issue a raw I2C transfer made of one or more messages
    ///
    /// Returns the number of messages the adapter processed.
    fn transfer(&mut self, messages: &mut [I2CMessage<'_>]) -> Result<u32, Self::Error>;

    /// Write `payload` to `address` as a single raw message
    ///
    /// The target address travels in the message, the slave address the
    /// handle was configured with is not consulted.
    fn write_raw_message(&mut self, address: u16, payload: &[u8]) -> Result<(), Self::Error> {
        let mut messages = [I2CMessage::write(address, payload)];
        self.transfer(&mut messages).map(drop)
    }
}
