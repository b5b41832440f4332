// Copyright 2026, The pwrctl Developers
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/license/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option.  This file may not be copied, modified, or distributed
// except according to those terms.

use crate::core::I2CDevice;
use crate::error::{Error, Result};
use byteorder::{ByteOrder, LittleEndian};
use log::{debug, info};
use std::fmt;

/// Slave address of the register protocol
pub const REGISTER_SLAVE_ADDR: u16 = 0x10;
/// Target of the raw power-toggle message
pub const POWER_TOGGLE_ADDR: u16 = 0x20;

pub const POWER_ON_WORD: u16 = 0x000B;
pub const POWER_OFF_WORD: u16 = 0x0000;

/// Something the user can ask the controller to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    PowerOn,
    PowerOff,
    LockSd,
    UnlockSd,
    Reset,
    SoftwareButton,
}

impl Action {
    pub const ALL: [Action; 6] = [
        Action::PowerOn,
        Action::PowerOff,
        Action::LockSd,
        Action::UnlockSd,
        Action::Reset,
        Action::SoftwareButton,
    ];

    /// Command line flag selecting this action
    pub fn flag(self) -> &'static str {
        match self {
            Action::PowerOn => "--pwron",
            Action::PowerOff => "--pwroff",
            Action::LockSd => "--locksd",
            Action::UnlockSd => "--unlocksd",
            Action::Reset => "--reset",
            Action::SoftwareButton => "--sw",
        }
    }

    /// Word written to `POWER_TOGGLE_ADDR`, for the power actions only
    pub fn power_word(self) -> Option<u16> {
        match self {
            Action::PowerOn => Some(POWER_ON_WORD),
            Action::PowerOff => Some(POWER_OFF_WORD),
            _ => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match *self {
            Action::PowerOn => "switch power on",
            Action::PowerOff => "switch power off",
            Action::LockSd => "lock SD card",
            Action::UnlockSd => "unlock SD card",
            Action::Reset => "press reset button",
            Action::SoftwareButton => "press power button",
        };
        f.write_str(text)
    }
}

/// Issue the bus traffic for `action` on an already open handle
///
/// SD lock/unlock, reset and the software button have no transaction
/// encoding yet; they are acknowledged without touching the bus.
pub fn dispatch<D: I2CDevice>(dev: &mut D, action: Action) -> Result<()> {
    info!("{}", action);
    match action.power_word() {
        Some(word) => {
            let mut payload = [0; 2];
            LittleEndian::write_u16(&mut payload, word);
            dev.write_raw_message(POWER_TOGGLE_ADDR, &payload)
                .map_err(Error::transaction)
        }
        None => {
            debug!("{} has no bus transaction, nothing sent", action.flag());
            Ok(())
        }
    }
}

/// Run `operation` on a freshly opened handle, then close it
///
/// The handle is closed exactly once whatever `operation` returns.
pub fn with_device<D, F, T, O>(open: F, operation: O) -> Result<T>
where
    D: I2CDevice,
    F: FnOnce() -> Result<D>,
    O: FnOnce(&mut D) -> Result<T>,
{
    let mut dev = open()?;
    let result = operation(&mut dev);
    drop(dev);
    result
}

/// Perform `action` on a handle produced by `open`
pub fn perform_action_with<D, F>(open: F, action: Action) -> Result<()>
where
    D: I2CDevice,
    F: FnOnce() -> Result<D>,
{
    with_device(open, |dev| dispatch(dev, action))
}

/// Perform `action` against the controller behind the i2c-dev node at `path`
#[cfg(any(target_os = "linux", target_os = "android"))]
pub fn perform_action<P: AsRef<std::path::Path>>(path: P, action: Action) -> Result<()> {
    perform_action_with(
        || crate::linux::LinuxI2CDevice::new(path, REGISTER_SLAVE_ADDR),
        action,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{Fault, MockController, MockI2CDevice, Transaction};
    use std::io;
    use std::path::PathBuf;

    #[test]
    fn power_on_sends_one_raw_message() {
        let controller = MockController::new();
        perform_action_with(
            || Ok(MockI2CDevice::open(&controller, REGISTER_SLAVE_ADDR)),
            Action::PowerOn,
        )
        .unwrap();
        assert_eq!(
            controller.borrow().transactions(),
            &[Transaction::RawWrite {
                address: 0x20,
                data: vec![0x0B, 0x00],
            }]
        );
        assert_eq!(controller.borrow().opened_addresses(), &[REGISTER_SLAVE_ADDR]);
    }

    #[test]
    fn power_off_sends_zero_word() {
        let controller = MockController::new();
        perform_action_with(
            || Ok(MockI2CDevice::open(&controller, REGISTER_SLAVE_ADDR)),
            Action::PowerOff,
        )
        .unwrap();
        assert_eq!(
            controller.borrow().transactions(),
            &[Transaction::RawWrite {
                address: 0x20,
                data: vec![0x00, 0x00],
            }]
        );
    }

    #[test]
    fn other_actions_stay_off_the_bus() {
        for &action in &[
            Action::LockSd,
            Action::UnlockSd,
            Action::Reset,
            Action::SoftwareButton,
        ] {
            let controller = MockController::new();
            perform_action_with(
                || Ok(MockI2CDevice::open(&controller, REGISTER_SLAVE_ADDR)),
                action,
            )
            .unwrap();
            assert!(controller.borrow().transactions().is_empty());
        }
    }

    #[test]
    fn handle_closed_once_for_every_action() {
        for &faulty in &[false, true] {
            for &action in Action::ALL.iter() {
                let controller = MockController::new();
                if faulty {
                    controller.borrow_mut().inject(Fault::All);
                }
                let result = perform_action_with(
                    || Ok(MockI2CDevice::open(&controller, REGISTER_SLAVE_ADDR)),
                    action,
                );
                assert_eq!(result.is_err(), faulty && action.power_word().is_some());
                assert_eq!(controller.borrow().opened(), 1);
                assert_eq!(controller.borrow().closed(), 1);
            }
        }
    }

    #[test]
    fn failed_transfer_is_a_transaction_failure() {
        let controller = MockController::new();
        controller.borrow_mut().inject(Fault::Transfer);
        let result = perform_action_with(
            || Ok(MockI2CDevice::open(&controller, REGISTER_SLAVE_ADDR)),
            Action::PowerOn,
        );
        match result {
            Err(Error::TransactionFailed(_)) => {}
            other => panic!("unexpected result {:?}", other),
        }
        assert_eq!(controller.borrow().closed(), 1);
    }

    #[test]
    fn open_failure_skips_dispatch() {
        let result = perform_action_with::<MockI2CDevice, _>(
            || {
                Err(Error::DeviceOpenFailed {
                    path: PathBuf::from("/dev/i2c-10"),
                    source: io::Error::from(io::ErrorKind::NotFound),
                })
            },
            Action::PowerOn,
        );
        match result {
            Err(Error::DeviceOpenFailed { .. }) => {}
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn with_device_closes_after_register_failure() {
        let controller = MockController::new();
        controller
            .borrow_mut()
            .inject(Fault::Command(crate::register::ADDRESS_SELECT_COMMAND));
        let result = with_device(
            || Ok(MockI2CDevice::open(&controller, REGISTER_SLAVE_ADDR)),
            |dev| crate::register::read_register(dev, 0x0010),
        );
        assert!(result.is_err());
        assert_eq!(controller.borrow().closed(), 1);
    }

    #[test]
    fn flags_are_distinct() {
        let mut flags: Vec<&str> = Action::ALL.iter().map(|a| a.flag()).collect();
        flags.sort();
        flags.dedup();
        assert_eq!(flags.len(), Action::ALL.len());
    }
}
