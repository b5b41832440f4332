// Copyright 2015, Paul Osborne <osbpau@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/license/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option.  This file may not be copied, modified, or distributed
// except according to those terms.

//! In-memory stand-in for the power controller and its bus handle

use crate::core::{I2CDevice, I2CMessage};
use crate::register::{ADDRESS_SELECT_COMMAND, READ_COMMAND, SMBUS_BLOCK_MAX, WRITE_COMMAND};
use byteorder::{ByteOrder, LittleEndian};
use log::trace;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

/// One bus transaction as seen by the mock, in the order it was attempted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transaction {
    WriteQuick(bool),
    ReadByte,
    WriteByte(u8),
    ReadByteData(u8),
    WriteByteData(u8, u8),
    ReadWordData(u8),
    WriteWordData(u8, u16),
    ReadBlockData(u8),
    WriteBlockData { command: u8, data: Vec<u8> },
    RawRead { address: u16, len: usize },
    RawWrite { address: u16, data: Vec<u8> },
}

/// Where an injected fault fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    /// Any SMBus transaction tagged with this command code
    Command(u8),
    /// Any raw I2C transfer
    Transfer,
    /// Every transaction
    All,
}

#[derive(Debug, thiserror::Error)]
pub enum MockError {
    #[error("injected fault at {0:?}")]
    Injected(Fault),
    #[error("no register selected before block read")]
    NothingSelected,
}

/// Register file and bookkeeping shared by every handle opened on it
pub struct MockController {
    registers: HashMap<u16, u32>,
    selected: Option<u16>,
    smbus_regs: [u8; 0x100],
    pointer: u8,
    responses: HashMap<u8, Vec<u8>>,
    faults: HashSet<Fault>,
    transactions: Vec<Transaction>,
    opened: Vec<u16>,
    closed: usize,
}

impl Default for MockController {
    fn default() -> MockController {
        MockController {
            registers: HashMap::new(),
            selected: None,
            smbus_regs: [0x00; 0x100],
            pointer: 0,
            responses: HashMap::new(),
            faults: HashSet::new(),
            transactions: Vec::new(),
            opened: Vec::new(),
            closed: 0,
        }
    }
}

impl MockController {
    pub fn new() -> Rc<RefCell<MockController>> {
        Rc::new(RefCell::new(MockController::default()))
    }

    /// Make every later transaction matching `fault` fail
    pub fn inject(&mut self, fault: Fault) {
        self.faults.insert(fault);
    }

    /// Answer block reads of `command` with `bytes` instead of the register protocol
    pub fn set_block_response(&mut self, command: u8, bytes: &[u8]) {
        self.responses.insert(command, bytes.to_vec());
    }

    pub fn set_register(&mut self, address: u16, value: u32) {
        self.registers.insert(address, value);
    }

    pub fn register(&self, address: u16) -> Option<u32> {
        self.registers.get(&address).cloned()
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn opened(&self) -> usize {
        self.opened.len()
    }

    /// Slave address of every handle opened so far, in order
    pub fn opened_addresses(&self) -> &[u16] {
        &self.opened
    }

    pub fn closed(&self) -> usize {
        self.closed
    }

    fn attempt(&mut self, transaction: Transaction, command: Option<u8>) -> Result<(), MockError> {
        trace!("mock {:?}", transaction);
        let raw = match transaction {
            Transaction::RawRead { .. } | Transaction::RawWrite { .. } => true,
            _ => false,
        };
        self.transactions.push(transaction);

        if self.faults.contains(&Fault::All) {
            return Err(MockError::Injected(Fault::All));
        }
        if raw && self.faults.contains(&Fault::Transfer) {
            return Err(MockError::Injected(Fault::Transfer));
        }
        if let Some(command) = command {
            if self.faults.contains(&Fault::Command(command)) {
                return Err(MockError::Injected(Fault::Command(command)));
            }
        }
        Ok(())
    }

    fn block_write(&mut self, command: u8, data: &[u8]) {
        match command {
            ADDRESS_SELECT_COMMAND if data.len() >= 2 => {
                self.selected = Some(LittleEndian::read_u16(&data[0..2]));
            }
            WRITE_COMMAND if data.len() >= 6 => {
                let address = LittleEndian::read_u16(&data[0..2]);
                let value = LittleEndian::read_u32(&data[2..6]);
                self.registers.insert(address, value);
            }
            _ => {}
        }
    }

    fn block_read(&mut self, command: u8) -> Result<Vec<u8>, MockError> {
        if let Some(bytes) = self.responses.get(&command) {
            return Ok(bytes.clone());
        }
        if command != READ_COMMAND {
            return Ok(Vec::new());
        }
        let address = self.selected.ok_or(MockError::NothingSelected)?;
        let value = self.registers.get(&address).cloned().unwrap_or(0);
        let mut response = vec![0; 6];
        LittleEndian::write_u16(&mut response[0..2], address);
        LittleEndian::write_u32(&mut response[2..6], value);
        Ok(response)
    }
}

/// A bus handle onto a `MockController`
///
/// Dropping the handle counts as closing it.
pub struct MockI2CDevice {
    controller: Rc<RefCell<MockController>>,
}

impl MockI2CDevice {
    pub fn open(controller: &Rc<RefCell<MockController>>, slave_address: u16) -> MockI2CDevice {
        controller.borrow_mut().opened.push(slave_address);
        MockI2CDevice {
            controller: Rc::clone(controller),
        }
    }
}

impl Drop for MockI2CDevice {
    fn drop(&mut self) {
        self.controller.borrow_mut().closed += 1;
    }
}

impl I2CDevice for MockI2CDevice {
    type Error = MockError;

    fn smbus_write_quick(&mut self, bit: bool) -> Result<(), MockError> {
        self.controller
            .borrow_mut()
            .attempt(Transaction::WriteQuick(bit), None)
    }

    fn smbus_read_byte(&mut self) -> Result<u8, MockError> {
        let mut ctl = self.controller.borrow_mut();
        ctl.attempt(Transaction::ReadByte, None)?;
        let value = ctl.smbus_regs[usize::from(ctl.pointer)];
        ctl.pointer = ctl.pointer.wrapping_add(1);
        Ok(value)
    }

    fn smbus_write_byte(&mut self, value: u8) -> Result<(), MockError> {
        let mut ctl = self.controller.borrow_mut();
        ctl.attempt(Transaction::WriteByte(value), None)?;
        ctl.pointer = value;
        Ok(())
    }

    fn smbus_read_byte_data(&mut self, command: u8) -> Result<u8, MockError> {
        let mut ctl = self.controller.borrow_mut();
        ctl.attempt(Transaction::ReadByteData(command), Some(command))?;
        Ok(ctl.smbus_regs[usize::from(command)])
    }

    fn smbus_write_byte_data(&mut self, command: u8, value: u8) -> Result<(), MockError> {
        let mut ctl = self.controller.borrow_mut();
        ctl.attempt(Transaction::WriteByteData(command, value), Some(command))?;
        ctl.smbus_regs[usize::from(command)] = value;
        Ok(())
    }

    fn smbus_read_word_data(&mut self, command: u8) -> Result<u16, MockError> {
        let mut ctl = self.controller.borrow_mut();
        ctl.attempt(Transaction::ReadWordData(command), Some(command))?;
        let lo = ctl.smbus_regs[usize::from(command)];
        let hi = ctl.smbus_regs[usize::from(command.wrapping_add(1))];
        Ok(LittleEndian::read_u16(&[lo, hi]))
    }

    fn smbus_write_word_data(&mut self, command: u8, value: u16) -> Result<(), MockError> {
        let mut ctl = self.controller.borrow_mut();
        ctl.attempt(Transaction::WriteWordData(command, value), Some(command))?;
        let mut word = [0; 2];
        LittleEndian::write_u16(&mut word, value);
        ctl.smbus_regs[usize::from(command)] = word[0];
        ctl.smbus_regs[usize::from(command.wrapping_add(1))] = word[1];
        Ok(())
    }

    fn smbus_read_block_data(&mut self, command: u8) -> Result<Vec<u8>, MockError> {
        let mut ctl = self.controller.borrow_mut();
        ctl.attempt(Transaction::ReadBlockData(command), Some(command))?;
        let mut block = ctl.block_read(command)?;
        block.truncate(SMBUS_BLOCK_MAX);
        Ok(block)
    }

    fn smbus_write_block_data(&mut self, command: u8, values: &[u8]) -> Result<(), MockError> {
        let data = &values[..values.len().min(SMBUS_BLOCK_MAX)];
        let mut ctl = self.controller.borrow_mut();
        ctl.attempt(
            Transaction::WriteBlockData {
                command,
                data: data.to_vec(),
            },
            Some(command),
        )?;
        ctl.block_write(command, data);
        Ok(())
    }

    fn transfer(&mut self, messages: &mut [I2CMessage<'_>]) -> Result<u32, MockError> {
        let mut ctl = self.controller.borrow_mut();
        for message in messages.iter_mut() {
            match message {
                I2CMessage::Read { address, data } => {
                    ctl.attempt(
                        Transaction::RawRead {
                            address: *address,
                            len: data.len(),
                        },
                        None,
                    )?;
                    for byte in data.iter_mut() {
                        *byte = 0xFF;
                    }
                }
                I2CMessage::Write { address, data } => {
                    ctl.attempt(
                        Transaction::RawWrite {
                            address: *address,
                            data: data.to_vec(),
                        },
                        None,
                    )?;
                }
            }
        }
        Ok(messages.len() as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_and_word_data_share_the_register_file() {
        let controller = MockController::new();
        let mut dev = MockI2CDevice::open(&controller, 0x10);
        dev.smbus_write_word_data(0x40, 0xBEEF).unwrap();
        assert_eq!(dev.smbus_read_byte_data(0x40).unwrap(), 0xEF);
        assert_eq!(dev.smbus_read_byte_data(0x41).unwrap(), 0xBE);
        dev.smbus_write_byte_data(0x41, 0x12).unwrap();
        assert_eq!(dev.smbus_read_word_data(0x40).unwrap(), 0x12EF);
    }

    #[test]
    fn read_byte_follows_the_pointer_set_by_write_byte() {
        let controller = MockController::new();
        let mut dev = MockI2CDevice::open(&controller, 0x10);
        dev.smbus_write_byte_data(0x05, 0xAA).unwrap();
        dev.smbus_write_byte_data(0x06, 0xBB).unwrap();
        dev.smbus_write_byte(0x05).unwrap();
        assert_eq!(dev.smbus_read_byte().unwrap(), 0xAA);
        assert_eq!(dev.smbus_read_byte().unwrap(), 0xBB);
    }

    #[test]
    fn block_write_is_clamped_to_smbus_limit() {
        let controller = MockController::new();
        let mut dev = MockI2CDevice::open(&controller, 0x10);
        let payload: Vec<u8> = (0..40).collect();
        dev.smbus_write_block_data(0x30, &payload).unwrap();
        let ctl = controller.borrow();
        match &ctl.transactions()[0] {
            Transaction::WriteBlockData { command, data } => {
                assert_eq!(*command, 0x30);
                assert_eq!(data.len(), SMBUS_BLOCK_MAX);
                assert_eq!(&data[..], &payload[..SMBUS_BLOCK_MAX]);
            }
            other => panic!("unexpected transaction {:?}", other),
        }
    }

    #[test]
    fn faults_are_recorded_before_failing() {
        let controller = MockController::new();
        controller.borrow_mut().inject(Fault::Command(0x22));
        let mut dev = MockI2CDevice::open(&controller, 0x10);
        assert!(dev.smbus_write_byte_data(0x22, 1).is_err());
        assert!(dev.smbus_write_byte_data(0x23, 1).is_ok());
        assert_eq!(controller.borrow().transactions().len(), 2);
    }

    #[test]
    fn dropping_the_handle_closes_it() {
        let controller = MockController::new();
        {
            let _dev = MockI2CDevice::open(&controller, 0x10);
            assert_eq!(controller.borrow().closed(), 0);
        }
        assert_eq!(controller.borrow().opened_addresses(), &[0x10]);
        assert_eq!(controller.borrow().closed(), 1);
    }

    #[test]
    fn raw_transfer_reports_every_message() {
        let controller = MockController::new();
        let mut dev = MockI2CDevice::open(&controller, 0x10);
        let mut buf = [0u8; 3];
        let mut msgs = [
            I2CMessage::write(0x20, &[0x01]),
            I2CMessage::read(0x20, &mut buf),
        ];
        assert_eq!(dev.transfer(&mut msgs).unwrap(), 2);
        assert_eq!(
            controller.borrow().transactions(),
            &[
                Transaction::RawWrite {
                    address: 0x20,
                    data: vec![0x01]
                },
                Transaction::RawRead { address: 0x20, len: 3 },
            ]
        );
    }
}
