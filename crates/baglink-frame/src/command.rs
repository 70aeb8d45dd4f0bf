//! Actuator command bytes.
//!
//! Commands are single ASCII characters with no terminator; upper case
//! switches the actuator on, lower case off. Anything outside the closed
//! set is rejected at the boundary.

use std::fmt;

/// A command accepted by the bag firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    HeatOn,
    HeatOff,
    CoolOn,
    CoolOff,
    LightOn,
    LightOff,
}

impl Command {
    /// The single wire character for this command.
    pub const fn wire_byte(self) -> u8 {
        match self {
            Command::HeatOn => b'H',
            Command::HeatOff => b'h',
            Command::CoolOn => b'C',
            Command::CoolOff => b'c',
            Command::LightOn => b'L',
            Command::LightOff => b'l',
        }
    }

    /// Decode a wire character; `None` for anything outside the command set.
    pub const fn from_wire(byte: u8) -> Option<Self> {
        match byte {
            b'H' => Some(Command::HeatOn),
            b'h' => Some(Command::HeatOff),
            b'C' => Some(Command::CoolOn),
            b'c' => Some(Command::CoolOff),
            b'L' => Some(Command::LightOn),
            b'l' => Some(Command::LightOff),
            _ => None,
        }
    }

    /// The actuator this command addresses.
    pub const fn actuator(self) -> &'static str {
        match self {
            Command::HeatOn | Command::HeatOff => "heat",
            Command::CoolOn | Command::CoolOff => "cool",
            Command::LightOn | Command::LightOff => "light",
        }
    }

    /// Whether this command switches its actuator on.
    pub const fn is_on(self) -> bool {
        matches!(self, Command::HeatOn | Command::CoolOn | Command::LightOn)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}",
            self.actuator(),
            if self.is_on() { "on" } else { "off" }
        )
    }
}

/// Encode a command into its wire representation.
pub const fn encode_command(command: Command) -> [u8; 1] {
    [command.wire_byte()]
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Command; 6] = [
        Command::HeatOn,
        Command::HeatOff,
        Command::CoolOn,
        Command::CoolOff,
        Command::LightOn,
        Command::LightOff,
    ];

    #[test]
    fn wire_mapping_is_bijective() {
        for command in ALL {
            assert_eq!(Command::from_wire(command.wire_byte()), Some(command));
        }
    }

    #[test]
    fn rejects_unknown_bytes() {
        assert_eq!(Command::from_wire(b'X'), None);
        assert_eq!(Command::from_wire(b'\n'), None);
        assert_eq!(Command::from_wire(0), None);
    }

    #[test]
    fn encode_is_single_byte() {
        assert_eq!(encode_command(Command::HeatOn), [b'H']);
        assert_eq!(encode_command(Command::LightOff), [b'l']);
    }

    #[test]
    fn display_names_actuator_and_direction() {
        assert_eq!(Command::CoolOn.to_string(), "cool on");
        assert_eq!(Command::HeatOff.to_string(), "heat off");
    }
}
