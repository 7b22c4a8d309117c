//! GPIO lines used by board bring-up code (transceiver reset, SSI sync).

use core::ops::Not;

use crate::error::Result;

#[cfg(feature = "std")]
pub mod linux;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl Level {
    pub fn is_high(self) -> bool {
        self == Level::High
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high {
            Level::High
        } else {
            Level::Low
        }
    }
}

impl Not for Level {
    type Output = Level;

    fn not(self) -> Level {
        match self {
            Level::Low => Level::High,
            Level::High => Level::Low,
        }
    }
}

/// A single GPIO line, whatever the platform provides it through.
pub trait Gpio {
    fn number(&self) -> u32;

    fn direction_input(&mut self) -> Result<()>;

    /// Makes the line an output and drives it to `level`.
    fn direction_output(&mut self, level: Level) -> Result<()>;

    fn get_direction(&mut self) -> Result<Direction>;

    fn set_value(&mut self, level: Level) -> Result<()>;

    fn get_value(&mut self) -> Result<Level>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_conversions() {
        assert_eq!(Level::from(true), Level::High);
        assert_eq!(!Level::High, Level::Low);
        assert!(!Level::Low.is_high());
    }
}
