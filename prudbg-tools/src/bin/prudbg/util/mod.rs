pub mod common_options;
pub mod logging;
pub mod window;

use prudbg::{BreakpointKind, CancellationToken};
use signal_hook::consts::signal;
use std::num::ParseIntError;
use std::str::FromStr;

pub fn parse_u32(input: &str) -> Result<u32, ParseIntError> {
    parse_int::parse(input)
}

pub fn parse_u64(input: &str) -> Result<u64, ParseIntError> {
    parse_int::parse(input)
}

pub fn parse_u16(input: &str) -> Result<u16, ParseIntError> {
    parse_int::parse(input)
}

#[derive(Debug, thiserror::Error, docsplay::Display, PartialEq, Eq)]
pub enum ArgumentParseError {
    /// '{argument}' is missing the '{separator}' separator.
    MissingSeparator { argument: String, separator: char },
    /// '{0}' is not a valid number.
    InvalidNumber(String),
    /// Unknown breakpoint kind '{0}', expected 'hw' or 'sw'.
    UnknownKind(String),
}

fn number<T: num_traits::Num>(input: &str) -> Result<T, ArgumentParseError> {
    parse_int::parse(input.trim()).map_err(|_| ArgumentParseError::InvalidNumber(input.into()))
}

/// A signed word distance like `-2`, `+0x10` or `4`.
pub fn parse_i16(input: &str) -> Result<i16, ArgumentParseError> {
    let (negative, magnitude) = match input.strip_prefix('-') {
        Some(magnitude) => (true, magnitude),
        None => (false, input.strip_prefix('+').unwrap_or(input)),
    };
    let magnitude = i32::from(number::<u16>(magnitude)?);
    let value = if negative { -magnitude } else { magnitude };

    i16::try_from(value).map_err(|_| ArgumentParseError::InvalidNumber(input.into()))
}

fn split(input: &str, separator: char) -> Result<(&str, &str), ArgumentParseError> {
    input
        .split_once(separator)
        .ok_or_else(|| ArgumentParseError::MissingSeparator {
            argument: input.into(),
            separator,
        })
}

/// `ADDRESS[:hw|:sw]`, hardware by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakpointArg {
    pub address: u32,
    pub kind: BreakpointKind,
}

impl FromStr for BreakpointArg {
    type Err = ArgumentParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (address, kind) = match s.split_once(':') {
            Some((address, "hw")) => (address, BreakpointKind::Hardware),
            Some((address, "sw")) => (address, BreakpointKind::Software),
            Some((_, kind)) => return Err(ArgumentParseError::UnknownKind(kind.into())),
            None => (s, BreakpointKind::Hardware),
        };

        Ok(Self {
            address: number(address)?,
            kind,
        })
    }
}

/// `ADDRESS:LENGTH`, a print-on-change watch on data memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchArg {
    pub address: u32,
    pub length: usize,
}

impl FromStr for WatchArg {
    type Err = ArgumentParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (address, length) = split(s, ':')?;
        Ok(Self {
            address: number(address)?,
            length: number(length)?,
        })
    }
}

/// `ADDRESS=BYTE[,BYTE...]`, a watch which halts on the given bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchValueArg {
    pub address: u32,
    pub bytes: Vec<u8>,
}

impl FromStr for WatchValueArg {
    type Err = ArgumentParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (address, bytes) = split(s, '=')?;
        Ok(Self {
            address: number(address)?,
            bytes: bytes.split(',').map(number).collect::<Result<_, _>>()?,
        })
    }
}

/// Run `f` with a token which is cancelled by ctrl-C.
pub fn with_interrupt<T>(f: impl FnOnce(&CancellationToken) -> T) -> anyhow::Result<T> {
    let token = CancellationToken::new();
    let sig_id = signal_hook::flag::register(signal::SIGINT, token.flag())?;

    let result = f(&token);

    signal_hook::low_level::unregister(sig_id);
    if token.is_cancelled() {
        tracing::debug!("Interrupted by ctrl-C");
    }

    Ok(result)
}

/// The bytes of a data dump, 16 per row, split in two halves.
pub fn hex_rows(address: u32, bytes: &[u8]) -> Vec<String> {
    (address..)
        .step_by(16)
        .zip(bytes.chunks(16))
        .map(|(address, row)| {
            let (low, high) = row.split_at(row.len().min(8));
            let low: String = low.iter().map(|byte| format!(" {byte:02x}")).collect();
            let high: String = high.iter().map(|byte| format!("{byte:02x} ")).collect();
            format!("[{address:#07x}]{low}-{high}")
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case("0x10", 0x10, BreakpointKind::Hardware)]
    #[test_case("0x10:hw", 0x10, BreakpointKind::Hardware)]
    #[test_case("32:sw", 32, BreakpointKind::Software)]
    fn breakpoint_argument(input: &str, address: u32, kind: BreakpointKind) {
        assert_eq!(
            input.parse::<BreakpointArg>().unwrap(),
            BreakpointArg { address, kind }
        );
    }

    #[test_case("-2", Ok(-2))]
    #[test_case("+0x10", Ok(16))]
    #[test_case("4", Ok(4))]
    #[test_case("-0x8000", Ok(i16::MIN))]
    #[test_case("0x8000", Err(ArgumentParseError::InvalidNumber("0x8000".into())))]
    fn signed_distance(input: &str, expected: Result<i16, ArgumentParseError>) {
        assert_eq!(parse_i16(input), expected);
    }

    #[test]
    fn breakpoint_kind_is_checked() {
        assert_eq!(
            "0x10:fast".parse::<BreakpointArg>(),
            Err(ArgumentParseError::UnknownKind("fast".into()))
        );
    }

    #[test]
    fn watch_argument() {
        assert_eq!(
            "0x100:4".parse::<WatchArg>().unwrap(),
            WatchArg {
                address: 0x100,
                length: 4
            }
        );
        assert!(matches!(
            "0x100".parse::<WatchArg>(),
            Err(ArgumentParseError::MissingSeparator { separator: ':', .. })
        ));
    }

    #[test]
    fn watch_value_argument() {
        assert_eq!(
            "0x20=0xaa,0x55,7".parse::<WatchValueArg>().unwrap(),
            WatchValueArg {
                address: 0x20,
                bytes: vec![0xaa, 0x55, 7]
            }
        );
        assert_eq!(
            "0x20=0x1aa".parse::<WatchValueArg>(),
            Err(ArgumentParseError::InvalidNumber("0x1aa".into()))
        );
    }

    #[test]
    fn dump_rows() {
        let bytes: Vec<u8> = (0..20).collect();

        assert_eq!(
            hex_rows(0x100, &bytes),
            vec![
                "[0x00100] 00 01 02 03 04 05 06 07-08 09 0a 0b 0c 0d 0e 0f ",
                "[0x00110] 10 11 12 13-",
            ]
        );
    }
}
