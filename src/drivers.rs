//! Register buses and the drivers built on top of them.

use core::cell::UnsafeCell;

use crate::error::BusError;

pub mod axi_pwmgen;
pub mod gpio;
pub mod sim;

/// Word-wide access to the registers of memory-mapped IP cores.
///
/// Offsets are in bytes from the base address of the core.
pub trait RegisterBus {
    fn read(&self, base: usize, offset: usize) -> Result<u32, BusError>;
    fn write(&self, base: usize, offset: usize, value: u32) -> Result<(), BusError>;
}

impl<T: RegisterBus + ?Sized> RegisterBus for &T {
    #[inline(always)]
    fn read(&self, base: usize, offset: usize) -> Result<u32, BusError> {
        (**self).read(base, offset)
    }

    #[inline(always)]
    fn write(&self, base: usize, offset: usize, value: u32) -> Result<(), BusError> {
        (**self).write(base, offset, value)
    }
}

/// Read-modify-write of the bits selected by `mask`. Bits outside the mask keep
/// their current value.
pub fn write_mask<B: RegisterBus + ?Sized>(
    bus: &B,
    base: usize,
    offset: usize,
    mask: u32,
    data: u32,
) -> Result<(), BusError> {
    let old = bus.read(base, offset)?;
    bus.write(base, offset, (old & !mask) | (data & mask))
}

#[repr(transparent)]
struct Reg32(UnsafeCell<u32>);

impl Reg32 {
    unsafe fn new<'a>(addr: usize) -> &'a Reg32 {
        let ptr = addr as *const Reg32;
        &*ptr
    }

    fn write(&self, val: u32) {
        unsafe {
            core::ptr::write_volatile(self.0.get(), val);
        }
    }

    fn read(&self) -> u32 {
        unsafe { core::ptr::read_volatile(self.0.get()) }
    }
}

/// Volatile access to physically mapped device registers.
#[derive(Debug)]
pub struct Mmio {
    _private: (),
}

impl Mmio {
    /// # Safety
    ///
    /// Every `base + offset` pair handed to this bus must be a mapped 32-bit
    /// device register. Nothing stops two handles from touching the same
    /// register, so accesses to core-wide registers must be serialized by the
    /// caller.
    pub const unsafe fn new() -> Self {
        Mmio { _private: () }
    }

    fn reg(base: usize, offset: usize) -> Option<&'static Reg32> {
        let addr = base.checked_add(offset)?;
        if addr == 0 || addr % core::mem::align_of::<u32>() != 0 {
            return None;
        }
        // SAFETY: the caller of `Mmio::new` vouched for every address we get.
        Some(unsafe { Reg32::new(addr) })
    }
}

impl RegisterBus for Mmio {
    fn read(&self, base: usize, offset: usize) -> Result<u32, BusError> {
        let reg = Self::reg(base, offset).ok_or(BusError::read(base, offset))?;
        Ok(reg.read())
    }

    fn write(&self, base: usize, offset: usize, value: u32) -> Result<(), BusError> {
        let reg = Self::reg(base, offset).ok_or(BusError::write(base, offset))?;
        reg.write(value);

        // The load-config pulse must not overtake the values it latches.
        #[cfg(target_arch = "aarch64")]
        unsafe {
            use cortex_a::asm::barrier;
            barrier::dsb(barrier::SY);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_mask_keeps_unmasked_bits() {
        let bus = sim::SimBus::new(0x1000);
        bus.poke(0x10, 0b1011);

        write_mask(&bus, 0x1000, 0x10, 0b0011, 0b0110).unwrap();

        assert_eq!(bus.peek(0x10), 0b1010);
    }

    #[test]
    fn write_mask_reports_failed_read_without_writing() {
        let bus = sim::SimBus::new(0x1000);
        bus.fail_reads(0x10, true);

        let err = write_mask(&bus, 0x1000, 0x10, 1, 1).unwrap_err();

        assert_eq!(err, BusError::read(0x1000, 0x10));
        assert_eq!(bus.write_count(0x10), 0);
    }

    #[test]
    fn mmio_reads_and_writes_plain_memory() {
        let mut words = [0u32; 4];
        let base = words.as_mut_ptr() as usize;
        // SAFETY: `words` outlives the bus and every offset used stays inside it.
        let bus = unsafe { Mmio::new() };

        bus.write(base, 8, 0x5a0f_0081).unwrap();

        assert_eq!(bus.read(base, 8).unwrap(), 0x5a0f_0081);
        assert_eq!(bus.read(base, 0).unwrap(), 0);
    }

    #[test]
    fn mmio_rejects_misaligned_registers() {
        // SAFETY: the address is rejected before it is dereferenced.
        let bus = unsafe { Mmio::new() };

        assert_eq!(bus.read(0x1000, 2), Err(BusError::read(0x1000, 2)));
        assert_eq!(bus.write(0, 0, 1), Err(BusError::write(0, 0)));
    }
}
