//! In-memory register bus.
//!
//! `SimBus` models a single register window at a fixed base address. Tests and
//! board bring-up code use it to run drivers without hardware: registers can be
//! preloaded, made read-only, or made to fail on access.

use crate::drivers::RegisterBus;
use crate::error::BusError;

const WINDOW_WORDS: usize = 64;

struct State {
    regs: [u32; WINDOW_WORDS],
    writes: [u32; WINDOW_WORDS],
    read_only: u64,
    failing_reads: u64,
    failing_writes: u64,
}

/// Bus accesses outside the window fail with a [`BusError`].
///
/// # Panics
///
/// The test-side helpers ([`poke`](Self::poke), [`peek`](Self::peek),
/// [`write_count`](Self::write_count), [`set_read_only`](Self::set_read_only),
/// [`fail_reads`](Self::fail_reads), [`fail_writes`](Self::fail_writes)) panic
/// if `offset` is unaligned or not below [`WINDOW`](Self::WINDOW).
pub struct SimBus {
    base: usize,
    state: spin::Mutex<State>,
}

impl SimBus {
    /// Size of the simulated window in bytes.
    pub const WINDOW: usize = WINDOW_WORDS * 4;

    pub const fn new(base: usize) -> Self {
        SimBus {
            base,
            state: spin::Mutex::new(State {
                regs: [0; WINDOW_WORDS],
                writes: [0; WINDOW_WORDS],
                read_only: 0,
                failing_reads: 0,
                failing_writes: 0,
            }),
        }
    }

    pub fn base(&self) -> usize {
        self.base
    }

    fn word(offset: usize) -> usize {
        assert!(
            offset % 4 == 0 && offset < Self::WINDOW,
            "offset {:#x} is outside the simulated window",
            offset
        );
        offset / 4
    }

    fn locate(&self, base: usize, offset: usize) -> Option<usize> {
        if base != self.base || offset % 4 != 0 || offset >= Self::WINDOW {
            None
        } else {
            Some(offset / 4)
        }
    }

    /// Sets a register from the hardware side. Ignores read-only protection and
    /// is not counted as a write.
    pub fn poke(&self, offset: usize, value: u32) {
        let idx = Self::word(offset);
        self.state.lock().regs[idx] = value;
    }

    /// Current register value, without going through the fault injection.
    pub fn peek(&self, offset: usize) -> u32 {
        let idx = Self::word(offset);
        self.state.lock().regs[idx]
    }

    /// Number of bus writes the register has received, including writes that
    /// were dropped because the register is read-only.
    pub fn write_count(&self, offset: usize) -> u32 {
        let idx = Self::word(offset);
        self.state.lock().writes[idx]
    }

    /// Writes to a read-only register are accepted and dropped.
    pub fn set_read_only(&self, offset: usize, read_only: bool) {
        let bit = 1u64 << Self::word(offset);
        let mut state = self.state.lock();
        if read_only {
            state.read_only |= bit;
        } else {
            state.read_only &= !bit;
        }
    }

    pub fn fail_reads(&self, offset: usize, fail: bool) {
        let bit = 1u64 << Self::word(offset);
        let mut state = self.state.lock();
        if fail {
            state.failing_reads |= bit;
        } else {
            state.failing_reads &= !bit;
        }
    }

    pub fn fail_writes(&self, offset: usize, fail: bool) {
        let bit = 1u64 << Self::word(offset);
        let mut state = self.state.lock();
        if fail {
            state.failing_writes |= bit;
        } else {
            state.failing_writes &= !bit;
        }
    }
}

impl RegisterBus for SimBus {
    fn read(&self, base: usize, offset: usize) -> Result<u32, BusError> {
        let idx = self
            .locate(base, offset)
            .ok_or(BusError::read(base, offset))?;
        let state = self.state.lock();
        if state.failing_reads & (1 << idx) != 0 {
            return Err(BusError::read(base, offset));
        }
        Ok(state.regs[idx])
    }

    fn write(&self, base: usize, offset: usize, value: u32) -> Result<(), BusError> {
        let idx = self
            .locate(base, offset)
            .ok_or(BusError::write(base, offset))?;
        let mut state = self.state.lock();
        if state.failing_writes & (1 << idx) != 0 {
            return Err(BusError::write(base, offset));
        }
        state.writes[idx] += 1;
        if state.read_only & (1 << idx) == 0 {
            state.regs[idx] = value;
        }
        Ok(())
    }
}
