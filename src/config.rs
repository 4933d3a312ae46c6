//! Register model of the four ADS1220 configuration registers
//!
//! [`Config`] holds the typed fields of all four registers. [`Config::to_registers`] and
//! [`Config::from_registers`] translate between the typed form and the raw register bytes
//! using the bit positions of the datasheet. [`InputSelect`] covers register 0 alone, which is
//! the part rewritten between channels by the multi-channel read functions.
use crate::AdcError;

pub const NUM_REGISTERS: usize = 4;

const PGA_BYPASS_MASK: u8 = 0b0000_0001;

//==================================================================================================
// Definitions
//==================================================================================================

/// Configuration register addresses
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Register {
    Config0 = 0x00,
    Config1 = 0x01,
    Config2 = 0x02,
    Config3 = 0x03,
}

/// Input multiplexer configuration, bits 7:4 of register 0.
///
/// For settings where AINN = AVSS, the PGA must be bypassed and only gains 1, 2 and 4 can be
/// used.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mux {
    /// AINP = AIN0, AINN = AIN1. Default at power-up
    #[default]
    Ain0Ain1 = 0b0000,
    Ain0Ain2 = 0b0001,
    Ain0Ain3 = 0b0010,
    Ain1Ain2 = 0b0011,
    Ain1Ain3 = 0b0100,
    Ain2Ain3 = 0b0101,
    Ain1Ain0 = 0b0110,
    Ain3Ain2 = 0b0111,
    Ain0Avss = 0b1000,
    Ain1Avss = 0b1001,
    Ain2Avss = 0b1010,
    Ain3Avss = 0b1011,
    /// (V(REFPx) - V(REFNx)) / 4 monitor, PGA bypassed
    RefMonitor = 0b1100,
    /// (AVDD - AVSS) / 4 monitor, PGA bypassed
    SupplyMonitor = 0b1101,
    /// AINP and AINN shorted to (AVDD + AVSS) / 2
    Shorted = 0b1110,
}

impl Mux {
    pub const fn from_bits(bits: u8) -> Option<Self> {
        Some(match bits {
            0b0000 => Mux::Ain0Ain1,
            0b0001 => Mux::Ain0Ain2,
            0b0010 => Mux::Ain0Ain3,
            0b0011 => Mux::Ain1Ain2,
            0b0100 => Mux::Ain1Ain3,
            0b0101 => Mux::Ain2Ain3,
            0b0110 => Mux::Ain1Ain0,
            0b0111 => Mux::Ain3Ain2,
            0b1000 => Mux::Ain0Avss,
            0b1001 => Mux::Ain1Avss,
            0b1010 => Mux::Ain2Avss,
            0b1011 => Mux::Ain3Avss,
            0b1100 => Mux::RefMonitor,
            0b1101 => Mux::SupplyMonitor,
            0b1110 => Mux::Shorted,
            _ => return None,
        })
    }

    /// Negative input is AVSS
    #[inline]
    pub const fn is_single_ended(self) -> bool {
        matches!(
            self,
            Mux::Ain0Avss | Mux::Ain1Avss | Mux::Ain2Avss | Mux::Ain3Avss
        )
    }
}

/// Device gain, bits 3:1 of register 0. Gains 1, 2 and 4 can be used without the PGA, in
/// which case the gain is obtained by a switched-capacitor structure.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Gain {
    #[default]
    X1 = 0b000,
    X2 = 0b001,
    X4 = 0b010,
    X8 = 0b011,
    X16 = 0b100,
    X32 = 0b101,
    X64 = 0b110,
    X128 = 0b111,
}

impl Gain {
    /// Only the lowest three bits are used, so every input maps to a gain.
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0b111 {
            0b000 => Gain::X1,
            0b001 => Gain::X2,
            0b010 => Gain::X4,
            0b011 => Gain::X8,
            0b100 => Gain::X16,
            0b101 => Gain::X32,
            0b110 => Gain::X64,
            _ => Gain::X128,
        }
    }

    #[inline]
    pub const fn multiplier(self) -> u8 {
        1 << (self as u8)
    }

    /// Gains which remain valid with the PGA bypassed
    #[inline]
    pub const fn is_bypass_capable(self) -> bool {
        matches!(self, Gain::X1 | Gain::X2 | Gain::X4)
    }
}

/// Data rate, bits 7:5 of register 1. The variant names give the rate in normal mode. The
/// rate is a quarter of that in duty-cycle mode and twice that in turbo mode.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataRate {
    /// 20 SPS normal, 5 SPS duty-cycle, 40 SPS turbo
    #[default]
    Sps20 = 0b000,
    /// 45 SPS normal, 11.25 SPS duty-cycle, 90 SPS turbo
    Sps45 = 0b001,
    /// 90 SPS normal, 22.5 SPS duty-cycle, 180 SPS turbo
    Sps90 = 0b010,
    /// 175 SPS normal, 44 SPS duty-cycle, 350 SPS turbo
    Sps175 = 0b011,
    /// 330 SPS normal, 82.5 SPS duty-cycle, 660 SPS turbo
    Sps330 = 0b100,
    /// 600 SPS normal, 150 SPS duty-cycle, 1200 SPS turbo
    Sps600 = 0b101,
    /// 1000 SPS normal, 250 SPS duty-cycle, 2000 SPS turbo
    Sps1000 = 0b110,
}

impl DataRate {
    pub const fn from_bits(bits: u8) -> Option<Self> {
        Some(match bits {
            0b000 => DataRate::Sps20,
            0b001 => DataRate::Sps45,
            0b010 => DataRate::Sps90,
            0b011 => DataRate::Sps175,
            0b100 => DataRate::Sps330,
            0b101 => DataRate::Sps600,
            0b110 => DataRate::Sps1000,
            _ => return None,
        })
    }

    /// Nominal output data rate in 1/1000 samples per second for the given operating mode
    pub const fn millisamples_per_second(self, mode: OperatingMode) -> u32 {
        let normal = match self {
            DataRate::Sps20 => 20_000,
            DataRate::Sps45 => 45_000,
            DataRate::Sps90 => 90_000,
            DataRate::Sps175 => 175_000,
            DataRate::Sps330 => 330_000,
            DataRate::Sps600 => 600_000,
            DataRate::Sps1000 => 1_000_000,
        };
        match mode {
            OperatingMode::Normal => normal,
            OperatingMode::DutyCycle => normal / 4,
            OperatingMode::Turbo => normal * 2,
        }
    }
}

/// Operating mode, bits 4:3 of register 1
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OperatingMode {
    /// 256-kHz modulator clock
    #[default]
    Normal = 0b00,
    /// Internal duty cycle of 1:4
    DutyCycle = 0b01,
    /// 512-kHz modulator clock
    Turbo = 0b10,
}

impl OperatingMode {
    pub const fn from_bits(bits: u8) -> Option<Self> {
        Some(match bits {
            0b00 => OperatingMode::Normal,
            0b01 => OperatingMode::DutyCycle,
            0b10 => OperatingMode::Turbo,
            _ => return None,
        })
    }
}

/// Conversion mode, bit 2 of register 1
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConversionMode {
    /// One conversion per START/SYNC command
    #[default]
    SingleShot = 0,
    /// Free-running conversions, re-synchronized by START/SYNC
    Continuous = 1,
}

/// Voltage reference selection, bits 7:6 of register 2
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum VoltageRef {
    /// Internal 2.048-V reference
    #[default]
    Internal = 0b00,
    /// Dedicated REFP0 and REFN0 inputs
    ExternalRef0 = 0b01,
    /// AIN0/REFP1 and AIN3/REFN1 inputs
    ExternalRef1 = 0b10,
    /// AVDD - AVSS
    AnalogSupply = 0b11,
}

impl VoltageRef {
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0b00 => VoltageRef::Internal,
            0b01 => VoltageRef::ExternalRef0,
            0b10 => VoltageRef::ExternalRef1,
            _ => VoltageRef::AnalogSupply,
        }
    }
}

/// FIR filter configuration, bits 5:4 of register 2. Only use rejection together with the
/// 20-SPS setting in normal mode and the 5-SPS setting in duty-cycle mode.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FirFilter {
    #[default]
    NoRejection = 0b00,
    Reject50And60Hz = 0b01,
    Reject50Hz = 0b10,
    Reject60Hz = 0b11,
}

impl FirFilter {
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0b00 => FirFilter::NoRejection,
            0b01 => FirFilter::Reject50And60Hz,
            0b10 => FirFilter::Reject50Hz,
            _ => FirFilter::Reject60Hz,
        }
    }
}

/// Current for both IDAC excitation current sources, bits 2:0 of register 2
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IdacCurrent {
    #[default]
    Off = 0b000,
    Ua10 = 0b001,
    Ua50 = 0b010,
    Ua100 = 0b011,
    Ua250 = 0b100,
    Ua500 = 0b101,
    Ua1000 = 0b110,
    Ua1500 = 0b111,
}

impl IdacCurrent {
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0b111 {
            0b000 => IdacCurrent::Off,
            0b001 => IdacCurrent::Ua10,
            0b010 => IdacCurrent::Ua50,
            0b011 => IdacCurrent::Ua100,
            0b100 => IdacCurrent::Ua250,
            0b101 => IdacCurrent::Ua500,
            0b110 => IdacCurrent::Ua1000,
            _ => IdacCurrent::Ua1500,
        }
    }
}

/// Routing of IDAC1 (bits 7:5) or IDAC2 (bits 4:2) of register 3
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IdacRouting {
    #[default]
    Disabled = 0b000,
    Ain0Refp1 = 0b001,
    Ain1 = 0b010,
    Ain2 = 0b011,
    Ain3Refn1 = 0b100,
    Refp0 = 0b101,
    Refn0 = 0b110,
}

impl IdacRouting {
    pub const fn from_bits(bits: u8) -> Option<Self> {
        Some(match bits {
            0b000 => IdacRouting::Disabled,
            0b001 => IdacRouting::Ain0Refp1,
            0b010 => IdacRouting::Ain1,
            0b011 => IdacRouting::Ain2,
            0b100 => IdacRouting::Ain3Refn1,
            0b101 => IdacRouting::Refp0,
            0b110 => IdacRouting::Refn0,
            _ => return None,
        })
    }
}

//==================================================================================================
// Register 0
//==================================================================================================

/// Contents of register 0: input multiplexer, gain and PGA bypass
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InputSelect {
    pub mux: Mux,
    pub gain: Gain,
    /// The PGA is always enabled for gains 8 to 128, regardless of this setting
    pub pga_bypass: bool,
}

impl InputSelect {
    #[inline]
    pub const fn to_bits(self) -> u8 {
        ((self.mux as u8) << 4) | ((self.gain as u8) << 1) | self.pga_bypass as u8
    }

    pub const fn from_bits(bits: u8) -> Result<Self, AdcError> {
        let mux = match Mux::from_bits(bits >> 4) {
            Some(mux) => mux,
            None => {
                return Err(AdcError::InvalidRegisterValue {
                    register: Register::Config0,
                    value: bits,
                })
            }
        };
        Ok(InputSelect {
            mux,
            gain: Gain::from_bits(bits >> 1),
            pga_bypass: bits & PGA_BYPASS_MASK != 0,
        })
    }
}

//==================================================================================================
// Full configuration
//==================================================================================================

/// Complete device configuration. The default value matches the power-up state of the device,
/// which is all four registers cleared.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    // Register 0
    pub mux: Mux,
    pub gain: Gain,
    pub pga_bypass: bool,
    // Register 1
    pub data_rate: DataRate,
    pub operating_mode: OperatingMode,
    pub conversion_mode: ConversionMode,
    /// Temperature sensor mode. Register 0 has no effect and the internal reference is used
    /// while this is enabled.
    pub temperature_sensor: bool,
    /// 10-uA burn-out current sources, used to detect wire breaks and shorted sensors
    pub burnout_current: bool,
    // Register 2
    pub vref: VoltageRef,
    pub fir_filter: FirFilter,
    /// Low-side switch between AIN3/REFN1 and AVSS closes on START/SYNC and opens on
    /// POWERDOWN when set. Always open otherwise.
    pub low_side_switch: bool,
    pub idac_current: IdacCurrent,
    // Register 3
    pub idac1_routing: IdacRouting,
    pub idac2_routing: IdacRouting,
    /// Data ready is indicated on DOUT/DRDY in addition to the dedicated DRDY pin
    pub drdy_on_dout: bool,
}

impl Config {
    #[inline]
    pub const fn input_select(&self) -> InputSelect {
        InputSelect {
            mux: self.mux,
            gain: self.gain,
            pga_bypass: self.pga_bypass,
        }
    }

    #[inline]
    pub fn set_input_select(&mut self, input: InputSelect) {
        self.mux = input.mux;
        self.gain = input.gain;
        self.pga_bypass = input.pga_bypass;
    }

    #[inline]
    pub const fn config1_byte(&self) -> u8 {
        ((self.data_rate as u8) << 5)
            | ((self.operating_mode as u8) << 3)
            | ((self.conversion_mode as u8) << 2)
            | ((self.temperature_sensor as u8) << 1)
            | self.burnout_current as u8
    }

    #[inline]
    pub const fn config2_byte(&self) -> u8 {
        ((self.vref as u8) << 6)
            | ((self.fir_filter as u8) << 4)
            | ((self.low_side_switch as u8) << 3)
            | self.idac_current as u8
    }

    /// Bit 0 is reserved and always written as 0
    #[inline]
    pub const fn config3_byte(&self) -> u8 {
        ((self.idac1_routing as u8) << 5)
            | ((self.idac2_routing as u8) << 2)
            | ((self.drdy_on_dout as u8) << 1)
    }

    pub const fn to_registers(&self) -> [u8; NUM_REGISTERS] {
        [
            self.input_select().to_bits(),
            self.config1_byte(),
            self.config2_byte(),
            self.config3_byte(),
        ]
    }

    /// Decode the four register bytes. Reserved field codes are rejected with
    /// [`AdcError::InvalidRegisterValue`].
    pub fn from_registers(regs: &[u8; NUM_REGISTERS]) -> Result<Self, AdcError> {
        let input = InputSelect::from_bits(regs[0])?;
        let invalid = |register: Register| AdcError::InvalidRegisterValue {
            register,
            value: regs[register as usize],
        };
        let reg1 = regs[1];
        let data_rate = DataRate::from_bits(reg1 >> 5).ok_or(invalid(Register::Config1))?;
        let operating_mode =
            OperatingMode::from_bits((reg1 >> 3) & 0b11).ok_or(invalid(Register::Config1))?;
        let conversion_mode = if reg1 & (1 << 2) != 0 {
            ConversionMode::Continuous
        } else {
            ConversionMode::SingleShot
        };
        let reg2 = regs[2];
        let reg3 = regs[3];
        let idac1_routing = IdacRouting::from_bits(reg3 >> 5).ok_or(invalid(Register::Config3))?;
        let idac2_routing =
            IdacRouting::from_bits((reg3 >> 2) & 0b111).ok_or(invalid(Register::Config3))?;
        Ok(Config {
            mux: input.mux,
            gain: input.gain,
            pga_bypass: input.pga_bypass,
            data_rate,
            operating_mode,
            conversion_mode,
            temperature_sensor: reg1 & (1 << 1) != 0,
            burnout_current: reg1 & 1 != 0,
            vref: VoltageRef::from_bits(reg2 >> 6),
            fir_filter: FirFilter::from_bits(reg2 >> 4),
            low_side_switch: reg2 & (1 << 3) != 0,
            idac_current: IdacCurrent::from_bits(reg2),
            idac1_routing,
            idac2_routing,
            drdy_on_dout: reg3 & (1 << 1) != 0,
        })
    }

    /// Nominal duration of one conversion in microseconds
    #[inline]
    pub const fn conversion_period_us(&self) -> u32 {
        1_000_000_000 / self.data_rate.millisamples_per_second(self.operating_mode)
    }
}
