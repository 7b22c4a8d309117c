use derive_more::{Display, Error, From};

/// Direction of a failed register access.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
pub enum Access {
    #[display("read")]
    Read,
    #[display("write")]
    Write,
}

/// A register access that the bus could not complete.
#[derive(Clone, Copy, Debug, Display, Error, PartialEq, Eq)]
#[display("{access} of register {base:#x}+{offset:#04x} failed")]
pub struct BusError {
    pub access: Access,
    pub base: usize,
    pub offset: usize,
}

impl BusError {
    pub const fn read(base: usize, offset: usize) -> Self {
        BusError { access: Access::Read, base, offset }
    }

    pub const fn write(base: usize, offset: usize) -> Self {
        BusError { access: Access::Write, base, offset }
    }
}

#[derive(Debug, Display, Error, From)]
pub enum Error {
    /// The underlying register bus failed. Propagated unchanged.
    #[display("{_0}")]
    #[from]
    Io(BusError),

    /// The requested channel is not implemented by the core.
    #[display("channel {channel} out of range, core has {available} channel(s)")]
    ChannelOutOfRange { channel: u32, available: u32 },

    /// The scratchpad did not read back what was written, so there is no
    /// working core at this address.
    #[display("scratchpad self-test failed: wrote {expected:#010x}, read {found:#010x}")]
    SelfTestFailed { expected: u32, found: u32 },

    /// A sysfs GPIO attribute could not be opened, read or written.
    #[cfg(feature = "std")]
    #[display("gpio {number}: {source}")]
    Gpio { number: u32, source: std::io::Error },
}

pub type Result<T> = core::result::Result<T, Error>;

#[cfg(feature = "embedded-hal")]
impl embedded_hal::pwm::Error for Error {
    fn kind(&self) -> embedded_hal::pwm::ErrorKind {
        embedded_hal::pwm::ErrorKind::Other
    }
}

#[cfg(feature = "embedded-hal")]
impl embedded_hal::digital::Error for Error {
    fn kind(&self) -> embedded_hal::digital::ErrorKind {
        embedded_hal::digital::ErrorKind::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bus_error_names_the_register() {
        let err = Error::from(BusError::write(0x43c0_0000, 0x10));
        assert_eq!(
            err.to_string(),
            "write of register 0x43c00000+0x10 failed"
        );
    }

    #[test]
    fn self_test_error_shows_both_words() {
        let err = Error::SelfTestFailed { expected: 0x5a0f_0081, found: 0 };
        assert_eq!(
            err.to_string(),
            "scratchpad self-test failed: wrote 0x5a0f0081, read 0x00000000"
        );
    }
}
