//! Board parameters of the ADRV9001 evaluation platform.
//!
//! The carrier is picked at build time: the `zcu102` feature selects the
//! ZCU102 (Zynq UltraScale+), anything else is the ZC706 (Zynq-7000). Device
//! IDs and DMA base addresses come from the FPGA build and are not kept here.

/// I (in-phase) and Q (quadrature).
pub const NUM_SUBCHANNELS: usize = 2;
/// Channels per RX/TX chain.
pub const NUM_CHAIN_CHANNELS: usize = 2;
pub const NUM_CHANNELS: usize = NUM_CHAIN_CHANNELS * NUM_SUBCHANNELS;

pub const DAC_BUFFER_SAMPLES: usize = 1024;
pub const ADC_BUFFER_SAMPLES: usize = 16384;
pub const ADC1_CHANNELS: usize = 4;
pub const ADC2_CHANNELS: usize = 2;

pub const SPI_CS: u8 = 0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Carrier {
    Zc706,
    Zcu102,
}

cfg_if::cfg_if! {
    if #[cfg(feature = "zcu102")] {
        pub const CARRIER: Carrier = Carrier::Zcu102;
    } else {
        pub const CARRIER: Carrier = Carrier::Zc706;
    }
}

impl Carrier {
    /// Number of the first EMIO line in the Linux GPIO numbering.
    pub const fn gpio_offset(self) -> u32 {
        match self {
            Carrier::Zcu102 => 78,
            Carrier::Zc706 => 54,
        }
    }

    /// Transceiver reset line.
    pub const fn gpio_reset(self) -> u32 {
        46 + self.gpio_offset()
    }

    /// SSI synchronization line.
    pub const fn gpio_ssi_sync(self) -> u32 {
        54 + self.gpio_offset()
    }
}

pub const GPIO_OFFSET: u32 = CARRIER.gpio_offset();
pub const GPIO_RESET: u32 = CARRIER.gpio_reset();
pub const GPIO_SSI_SYNC: u32 = CARRIER.gpio_ssi_sync();

/// Register blocks of an `axi_adrv9001` core.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AxiAdrv9001Map {
    pub rx1_adc: usize,
    pub rx2_adc: usize,
    pub tx1_dac: usize,
    pub tx2_dac: usize,
}

impl AxiAdrv9001Map {
    pub const fn new(core_base: usize) -> Self {
        AxiAdrv9001Map {
            rx1_adc: core_base,
            rx2_adc: core_base + 0x1000,
            tx1_dac: core_base + 0x2000,
            tx2_dac: core_base + 0x4000,
        }
    }
}

/// Alignment for buffers handed to the DMA engines.
#[derive(Clone, Copy, Debug)]
#[repr(C, align(64))]
pub struct Aligned<T>(pub T);

pub type DacBuffer = [u32; DAC_BUFFER_SAMPLES];
pub type Adc1Buffer = [u16; ADC_BUFFER_SAMPLES * ADC1_CHANNELS];
pub type Adc2Buffer = [u16; ADC_BUFFER_SAMPLES * ADC2_CHANNELS];

/// In RX2TX2 mode the second chain is fed from the first one and has no
/// buffers of its own.
pub const SECOND_CHAIN_BUFFERS: bool = !cfg!(feature = "rx2tx2");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gpio_lines_follow_the_carrier() {
        assert_eq!(Carrier::Zc706.gpio_reset(), 100);
        assert_eq!(Carrier::Zc706.gpio_ssi_sync(), 108);
        assert_eq!(Carrier::Zcu102.gpio_reset(), 124);
        assert_eq!(Carrier::Zcu102.gpio_ssi_sync(), 132);
        assert_eq!(GPIO_RESET, CARRIER.gpio_reset());
    }

    #[test]
    fn adc_dac_blocks_are_laid_out_from_the_core_base() {
        let map = AxiAdrv9001Map::new(0x44a0_0000);

        assert_eq!(map.rx1_adc, 0x44a0_0000);
        assert_eq!(map.rx2_adc, 0x44a0_1000);
        assert_eq!(map.tx1_dac, 0x44a0_2000);
        assert_eq!(map.tx2_dac, 0x44a0_4000);
    }

    #[test]
    fn buffers_are_sized_per_channel() {
        assert_eq!(NUM_CHANNELS, 4);
        assert_eq!(core::mem::size_of::<Adc1Buffer>(), 16384 * 4 * 2);
        assert_eq!(core::mem::size_of::<Adc2Buffer>(), 16384 * 2 * 2);
        assert_eq!(core::mem::align_of::<Aligned<DacBuffer>>(), 64);
    }
}
