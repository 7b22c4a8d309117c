//! Hardware abstraction for Analog Devices FPGA/SoC reference designs.
//!
//! The crate provides a register-level driver for the AXI PWM generator IP
//! core, a Linux sysfs GPIO backend and the board parameters of the ADRV9001
//! evaluation platform.
//!
//! Register access goes through the [`RegisterBus`] trait. On target it is
//! backed by [`Mmio`]; off target [`SimBus`] stands in for the hardware.
//!
//! ```no_run
//! use adi_hal::drivers::axi_pwmgen::{Polarity, PwmChannel, PwmConfig};
//! use adi_hal::drivers::Mmio;
//!
//! // SAFETY: the PWM generator is mapped at this address by the FPGA design.
//! let bus = unsafe { Mmio::new() };
//! let mut pwm = PwmChannel::open(
//!     bus,
//!     &PwmConfig {
//!         base_address: 0x43c0_0000,
//!         channel: 0,
//!         reference_clock_hz: 100_000_000,
//!         period_ns: 1_000_000,
//!         duty_cycle_ns: 500_000,
//!         phase_ns: 0,
//!         polarity: Polarity::Normal,
//!     },
//! )?;
//! pwm.set_duty_cycle(250_000)?;
//! pwm.close()?;
//! # Ok::<(), adi_hal::Error>(())
//! ```

#![cfg_attr(not(any(test, feature = "std")), no_std)]

pub mod drivers;
pub mod error;
pub mod parameters;

pub use drivers::{Mmio, RegisterBus};
pub use drivers::sim::SimBus;
pub use error::{BusError, Error, Result};
