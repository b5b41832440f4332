// Copyright 2026, The pwrctl Developers
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/license/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option.  This file may not be copied, modified, or distributed
// except according to those terms.

use docopt::{ArgvMap, Docopt};
use pwrctl::Action;

const USAGE: &str = "
Drives the power/management controller via Linux i2cdev.

The register protocol is spoken to slave address 0x10, power toggling
goes to address 0x20.

Usage:
  pwrctl --device=<path> (--pwron | --pwroff | --locksd | --unlocksd | --reset | --sw)
  pwrctl --device=<path> --read-reg=<addr>
  pwrctl --device=<path> --write-reg=<addr> --value=<value>
  pwrctl (-h | --help)
  pwrctl --version

Options:
  -h --help           Show this help text (-? works too).
  --version           Show version.
  --device=<path>     i2c-dev node of the bus, e.g. /dev/i2c-10.
  --pwron             Switch power on.
  --pwroff            Switch power off.
  --locksd            Lock the SD card.
  --unlocksd          Unlock the SD card.
  --reset             Press the reset button.
  --sw                Press the power button.
  --read-reg=<addr>   Print the value of a register.
  --write-reg=<addr>  Write a register.
  --value=<value>     Register value, decimal or 0x-prefixed hex.
";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Perform(Action),
    ReadRegister(u16),
    WriteRegister(u16, u32),
}

fn parse_number(text: &str) -> Result<u64, std::num::ParseIntError> {
    let text = text.trim();
    if text.starts_with("0x") || text.starts_with("0X") {
        u64::from_str_radix(&text[2..], 16)
    } else {
        text.parse()
    }
}

fn parse_address(text: &str) -> Result<u16, docopt::Error> {
    parse_number(text)
        .ok()
        .and_then(|n| if n <= u64::from(u16::max_value()) { Some(n as u16) } else { None })
        .ok_or_else(|| docopt::Error::Argv(format!("invalid register address '{}'", text)))
}

fn parse_value(text: &str) -> Result<u32, docopt::Error> {
    parse_number(text)
        .ok()
        .and_then(|n| if n <= u64::from(u32::max_value()) { Some(n as u32) } else { None })
        .ok_or_else(|| docopt::Error::Argv(format!("invalid register value '{}'", text)))
}

fn parse_args<I, S>(argv: I) -> Result<ArgvMap, docopt::Error>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let argv: Vec<String> = argv
        .into_iter()
        .map(|arg| match arg.as_ref() {
            "-?" => "-h".to_string(),
            other => other.to_string(),
        })
        .collect();
    Docopt::new(USAGE).and_then(|d| {
        d.argv(argv)
            .version(Some(env!("CARGO_PKG_VERSION").to_string()))
            .parse()
    })
}

fn command(args: &ArgvMap) -> Result<Command, docopt::Error> {
    if let Some(action) = Action::ALL.iter().find(|a| args.get_bool(a.flag())) {
        return Ok(Command::Perform(*action));
    }
    if !args.get_str("--write-reg").is_empty() {
        let address = parse_address(args.get_str("--write-reg"))?;
        let value = parse_value(args.get_str("--value"))?;
        return Ok(Command::WriteRegister(address, value));
    }
    if !args.get_str("--read-reg").is_empty() {
        return Ok(Command::ReadRegister(parse_address(args.get_str("--read-reg"))?));
    }
    Err(docopt::Error::Argv("no action given".to_string()))
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn main() {}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn main() {
    use log::{error, info};
    use pwrctl::action::REGISTER_SLAVE_ADDR;
    use pwrctl::linux::LinuxI2CDevice;
    use std::env::args;
    use std::process;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = parse_args(args()).unwrap_or_else(|e| e.exit());
    let command = command(&args).unwrap_or_else(|e| e.exit());
    let device = args.get_str("--device");
    info!(
        "SMBus device: {}, SMBus slave address: 0x{:02X}",
        device, REGISTER_SLAVE_ADDR
    );

    let open = || LinuxI2CDevice::new(device, REGISTER_SLAVE_ADDR);
    let result = match command {
        Command::Perform(action) => pwrctl::perform_action_with(open, action),
        Command::ReadRegister(address) => {
            pwrctl::with_device(open, |dev| pwrctl::read_register(dev, address)).map(|value| {
                println!("0x{:08X}", value);
            })
        }
        Command::WriteRegister(address, value) => {
            pwrctl::with_device(open, |dev| pwrctl::write_register(dev, address, value))
        }
    };

    if let Err(e) = result {
        error!("{}", e);
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Result<Command, docopt::Error> {
        let args = parse_args(line.split_whitespace())?;
        command(&args)
    }

    #[test]
    fn each_flag_selects_its_action() {
        for &action in Action::ALL.iter() {
            let line = format!("pwrctl --device=/dev/i2c-10 {}", action.flag());
            assert_eq!(parse(&line).unwrap(), Command::Perform(action));
        }
    }

    #[test]
    fn two_action_flags_are_rejected() {
        assert!(parse("pwrctl --device=/dev/i2c-10 --pwron --pwroff").is_err());
    }

    #[test]
    fn action_needs_a_device() {
        assert!(parse("pwrctl --pwron").is_err());
    }

    #[test]
    fn register_commands_take_hex_or_decimal() {
        assert_eq!(
            parse("pwrctl --device=/dev/i2c-10 --read-reg=0x0123").unwrap(),
            Command::ReadRegister(0x0123)
        );
        assert_eq!(
            parse("pwrctl --device=/dev/i2c-10 --write-reg=16 --value=0xDEADBEEF").unwrap(),
            Command::WriteRegister(16, 0xDEAD_BEEF)
        );
    }

    #[test]
    fn out_of_range_numbers_are_rejected() {
        assert!(parse("pwrctl --device=/dev/i2c-10 --read-reg=0x10000").is_err());
        assert!(parse("pwrctl --device=/dev/i2c-10 --write-reg=1 --value=0x100000000").is_err());
        assert!(parse("pwrctl --device=/dev/i2c-10 --read-reg=bogus").is_err());
    }

    #[test]
    fn number_parsing() {
        assert_eq!(parse_number("0x1F").unwrap(), 0x1F);
        assert_eq!(parse_number("0X1f").unwrap(), 0x1F);
        assert_eq!(parse_number("31").unwrap(), 31);
        assert!(parse_number("0x").is_err());
    }
}
