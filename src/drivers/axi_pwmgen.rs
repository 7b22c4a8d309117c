//! Driver for the AXI PWM generator IP core.
//!
//! One core drives several outputs. Each output is handled by its own
//! [`PwmChannel`]; handles for different channels of the same core may coexist
//! since their period, duty and phase registers are disjoint. The core-wide
//! registers (config, scratchpad) are only touched by [`PwmChannel::open`] and
//! [`PwmChannel::close`], which must not run concurrently for the same core.
//!
//! All times are given in nanoseconds and converted to ticks of the core's
//! reference clock, always rounding up so that a requested time is never
//! undershot.

use log::{debug, warn};
use tock_registers::register_bitfields;

use crate::drivers::{write_mask, RegisterBus};
use crate::error::{Error, Result};

pub const REG_CORE_VERSION: usize = 0x00;
pub const REG_ID: usize = 0x04;
pub const REG_SCRATCHPAD: usize = 0x08;
pub const REG_CORE_MAGIC: usize = 0x0C;
pub const REG_CONFIG: usize = 0x10;
pub const REG_NPWM: usize = 0x14;

const CH_PERIOD_BASE: usize = 0x40;
const CH_DUTY_BASE: usize = 0x44;
const CH_PHASE_BASE: usize = 0x48;
const CH_STRIDE: usize = 12;

/// Written to the scratchpad and read back when a channel is opened.
pub const TEST_DATA: u32 = 0x5A0F_0081;
/// Value of the magic register of a PWM generator core.
pub const CORE_MAGIC: u32 = 0x601A_3471;

const CHANNEL_DISABLE: u32 = 0;
const NSEC_PER_SEC: u64 = 1_000_000_000;

register_bitfields![u32,
    Config [
        RESET OFFSET(0) NUMBITS(1) [],
        LOAD_CONFIG OFFSET(1) NUMBITS(1) []
    ],
    Version [
        PATCH OFFSET(0) NUMBITS(8) [],
        MINOR OFFSET(8) NUMBITS(8) [],
        MAJOR OFFSET(16) NUMBITS(16) []
    ]
];

pub const fn period_reg(channel: u32) -> usize {
    CH_PERIOD_BASE + CH_STRIDE * channel as usize
}

pub const fn duty_reg(channel: u32) -> usize {
    CH_DUTY_BASE + CH_STRIDE * channel as usize
}

pub const fn phase_reg(channel: u32) -> usize {
    CH_PHASE_BASE + CH_STRIDE * channel as usize
}

/// Converts a time in nanoseconds to ticks of a `reference_clock_hz` clock,
/// rounding up.
///
/// The product is formed in 64 bits: `u32::MAX * u32::MAX` still fits, so no
/// clock/time pair can overflow. A result that does not fit the 32-bit counter
/// registers saturates at `u32::MAX`.
pub fn ns_to_ticks(reference_clock_hz: u32, ns: u32) -> u32 {
    let scaled = u64::from(reference_clock_hz) * u64::from(ns);
    let ticks = scaled.div_ceil(NSEC_PER_SEC);

    u32::try_from(ticks).unwrap_or_else(|_| {
        warn!(
            "{} ns at {} Hz is {} ticks, saturating to {}",
            ns,
            reference_clock_hz,
            ticks,
            u32::MAX
        );
        u32::MAX
    })
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Polarity {
    #[default]
    Normal,
    Inversed,
}

/// Parameters used to open a channel.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PwmConfig {
    /// Base address of the core's register block.
    pub base_address: usize,
    /// Zero-based output index.
    pub channel: u32,
    /// Frequency of the clock driving the core's counters.
    pub reference_clock_hz: u32,
    pub period_ns: u32,
    pub duty_cycle_ns: u32,
    pub phase_ns: u32,
    /// Recorded only, the core has no polarity control.
    pub polarity: Polarity,
}

/// Identification registers of a core.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CoreInfo {
    pub version: u32,
    pub id: u32,
    pub magic: u32,
}

impl CoreInfo {
    /// `(major, minor, patch)`
    pub fn version(&self) -> (u32, u32, u32) {
        (
            Version::MAJOR.read(self.version),
            Version::MINOR.read(self.version),
            Version::PATCH.read(self.version),
        )
    }

    pub fn is_pwmgen(&self) -> bool {
        self.magic == CORE_MAGIC
    }
}

/// Exclusive handle to one output of a PWM generator core.
///
/// The handle is the authority on the configured times: getters return what
/// was last set and never read the hardware back.
pub struct PwmChannel<B: RegisterBus> {
    bus: B,
    base_address: usize,
    channel: u32,
    reference_clock_hz: u32,
    // Ticks of the configured period, written to the period register while
    // the channel is enabled.
    period_count: u32,
    period_ns: u32,
    duty_cycle_ns: u32,
    phase_ns: u32,
    enabled: bool,
    polarity: Polarity,
}

impl<B: RegisterBus> PwmChannel<B> {
    /// Takes the core out of reset, checks that it answers on the bus and
    /// starts the channel with the configured period, duty cycle and phase.
    ///
    /// On error nothing is kept; the core may be left out of reset.
    pub fn open(bus: B, config: &PwmConfig) -> Result<Self> {
        let base = config.base_address;

        let available = bus.read(base, REG_NPWM)?;
        if config.channel >= available {
            return Err(Error::ChannelOutOfRange {
                channel: config.channel,
                available,
            });
        }

        let reset = Config::RESET::CLEAR;
        write_mask(&bus, base, REG_CONFIG, reset.mask(), reset.value)?;

        bus.write(base, REG_SCRATCHPAD, TEST_DATA)?;
        let found = bus.read(base, REG_SCRATCHPAD)?;
        if found != TEST_DATA {
            return Err(Error::SelfTestFailed {
                expected: TEST_DATA,
                found,
            });
        }

        let mut pwm = PwmChannel {
            bus,
            base_address: base,
            channel: config.channel,
            reference_clock_hz: config.reference_clock_hz,
            period_count: 0,
            period_ns: 0,
            duty_cycle_ns: 0,
            phase_ns: 0,
            enabled: false,
            polarity: config.polarity,
        };

        pwm.set_period(config.period_ns)?;
        pwm.set_duty_cycle(config.duty_cycle_ns)?;
        pwm.set_phase(config.phase_ns)?;
        pwm.enable()?;

        debug!(
            "pwmgen {:#x}: channel {} of {} open, {} ns period at {} Hz",
            base, pwm.channel, available, pwm.period_ns, pwm.reference_clock_hz
        );

        Ok(pwm)
    }

    /// Puts the whole core back into reset and releases the handle.
    ///
    /// The handle is gone even if the reset could not be written.
    pub fn close(self) -> Result<()> {
        let res = self
            .bus
            .write(self.base_address, REG_CONFIG, Config::RESET::SET.value);

        match res {
            Ok(()) => debug!("pwmgen {:#x}: reset", self.base_address),
            Err(err) => warn!("pwmgen {:#x}: {}", self.base_address, err),
        }

        res.map_err(Error::from)
    }

    pub fn core_info(&self) -> Result<CoreInfo> {
        Ok(CoreInfo {
            version: self.bus.read(self.base_address, REG_CORE_VERSION)?,
            id: self.bus.read(self.base_address, REG_ID)?,
            magic: self.bus.read(self.base_address, REG_CORE_MAGIC)?,
        })
    }

    /// Sets the period. While the channel is disabled the period register is
    /// kept at zero and the new period takes effect on [`enable`](Self::enable).
    ///
    /// A duty cycle longer than the new period is shortened to match it.
    pub fn set_period(&mut self, period_ns: u32) -> Result<()> {
        let ticks = ns_to_ticks(self.reference_clock_hz, period_ns);
        let value = if self.enabled { ticks } else { CHANNEL_DISABLE };

        // Shorten the duty cycle first: if either write fails, the recorded
        // duty cycle still fits the recorded period.
        if self.duty_cycle_ns > period_ns {
            self.bus
                .write(self.base_address, duty_reg(self.channel), ticks)?;
            self.duty_cycle_ns = period_ns;
        }

        self.bus
            .write(self.base_address, period_reg(self.channel), value)?;
        self.period_count = ticks;
        self.period_ns = period_ns;

        Ok(())
    }

    pub fn get_period(&self) -> u32 {
        self.period_ns
    }

    /// Sets the duty cycle, silently clamped to the period.
    pub fn set_duty_cycle(&mut self, duty_ns: u32) -> Result<()> {
        let duty_ns = duty_ns.min(self.period_ns);
        let ticks = ns_to_ticks(self.reference_clock_hz, duty_ns);

        self.bus
            .write(self.base_address, duty_reg(self.channel), ticks)?;
        self.duty_cycle_ns = duty_ns;

        Ok(())
    }

    pub fn get_duty_cycle(&self) -> u32 {
        self.duty_cycle_ns
    }

    /// Sets the phase. Unlike the duty cycle it is not limited by the period.
    pub fn set_phase(&mut self, phase_ns: u32) -> Result<()> {
        let ticks = ns_to_ticks(self.reference_clock_hz, phase_ns);

        self.bus
            .write(self.base_address, phase_reg(self.channel), ticks)?;
        self.phase_ns = phase_ns;

        Ok(())
    }

    pub fn get_phase(&self) -> u32 {
        self.phase_ns
    }

    /// Restores the period register and latches the pending configuration.
    pub fn enable(&mut self) -> Result<()> {
        self.bus
            .write(self.base_address, period_reg(self.channel), self.period_count)?;
        self.load_config()?;
        self.enabled = true;

        debug!("pwmgen {:#x}: channel {} enabled", self.base_address, self.channel);
        Ok(())
    }

    /// Stops the output by zeroing the period register. Duty and phase are
    /// left as they are.
    pub fn disable(&mut self) -> Result<()> {
        self.bus
            .write(self.base_address, period_reg(self.channel), CHANNEL_DISABLE)?;
        self.load_config()?;
        self.enabled = false;

        debug!("pwmgen {:#x}: channel {} disabled", self.base_address, self.channel);
        Ok(())
    }

    fn load_config(&self) -> Result<()> {
        self.bus.write(
            self.base_address,
            REG_CONFIG,
            Config::LOAD_CONFIG::SET.value,
        )?;
        Ok(())
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Ticks currently in the period register: zero while disabled.
    pub fn period_ticks(&self) -> u32 {
        if self.enabled {
            self.period_count
        } else {
            CHANNEL_DISABLE
        }
    }

    pub fn channel(&self) -> u32 {
        self.channel
    }

    pub fn base_address(&self) -> usize {
        self.base_address
    }

    pub fn reference_clock_hz(&self) -> u32 {
        self.reference_clock_hz
    }

    pub fn polarity(&self) -> Polarity {
        self.polarity
    }
}

#[cfg(feature = "embedded-hal")]
impl<B: RegisterBus> embedded_hal::pwm::ErrorType for PwmChannel<B> {
    type Error = Error;
}

/// Duty cycles are fractions of `u16::MAX` of the current period.
#[cfg(feature = "embedded-hal")]
impl<B: RegisterBus> embedded_hal::pwm::SetDutyCycle for PwmChannel<B> {
    fn max_duty_cycle(&self) -> u16 {
        u16::MAX
    }

    fn set_duty_cycle(&mut self, duty: u16) -> core::result::Result<(), Self::Error> {
        let duty_ns = (u64::from(self.period_ns) * u64::from(duty))
            .div_ceil(u64::from(u16::MAX))
            .min(u64::from(self.period_ns));
        PwmChannel::set_duty_cycle(self, duty_ns as u32)
    }
}
