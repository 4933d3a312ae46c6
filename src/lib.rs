//! Type-Safe API to use the ADS1220 24-bit delta-sigma ADC
//!
//! ## Usage
//!
//! The driver is generic over an [`Interface`] providing the bus access. The
//! [`SpiInterface`] implements it for any `embedded-hal` SPI bus together with a chip select
//! pin, a delay provider and optionally the DRDY pin:
//!
//! ```ignore
//! let iface = SpiInterface::new(spi, cs, delay).with_data_ready(drdy);
//! let mut adc = Ads1220::new(iface);
//! adc.init(&Config {
//!     conversion_mode: ConversionMode::Continuous,
//!     ..Default::default()
//! })?;
//! let [ch0, ch1] = adc.read_all_differential(None)?;
//! ```
//!
//! [`Ads1220::init`] resets the device and writes all four configuration registers. Single
//! conversions can be read with [`Ads1220::read_sample`] or the non-blocking
//! [`Ads1220::read_data_nb`]. The multi-channel functions [`Ads1220::read_all_differential`]
//! and [`Ads1220::read_all_single_ended`] sequence through the input multiplexer and restore
//! register 0 afterwards. In continuous conversion mode, reading one channel and selecting the
//! next one is done in a single bus transaction.
//!
//! All waits for the DRDY signal are bounded. The bound is derived from the configured data
//! rate and the [`Timing`] settings.
//!
//! ## Features
//!
//!  - `defmt`: [`defmt::Format`] implementations for the public types and log output
#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

mod config;
pub mod interface;
mod sample;
mod sequencer;
#[cfg(test)]
mod sim;

pub use config::*;
pub use interface::{Capabilities, Capability, Interface, InterfaceError, SpiInterface};
pub use sample::*;
pub use sequencer::{DIFFERENTIAL_CHANNELS, SINGLE_ENDED_CHANNELS};

//==================================================================================================
// Definitions
//==================================================================================================

pub(crate) mod cmd {
    use crate::Register;

    pub const RESET: u8 = 0x06;
    pub const START_SYNC: u8 = 0x08;
    pub const POWERDOWN: u8 = 0x02;
    pub const RREG: u8 = 0x20;
    pub const WREG: u8 = 0x40;
    /// Clocked in while the last byte of a pipelined data read is clocked out
    pub const DUMMY: u8 = 0x00;

    /// Read `count` registers, starting at `start`
    #[inline]
    pub const fn rreg(start: Register, count: u8) -> u8 {
        RREG | ((start as u8) << 2) | (count - 1)
    }

    /// Write `count` registers, starting at `start`
    #[inline]
    pub const fn wreg(start: Register, count: u8) -> u8 {
        WREG | ((start as u8) << 2) | (count - 1)
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdcError {
    /// The register state of the device is unknown. Call [`Ads1220::init`],
    /// [`Ads1220::reset`] or [`Ads1220::change_config`] first. This is also returned after a
    /// failed multi-channel read, which might leave register 0 in a transient state.
    NotInitialized,
    /// The [`Interface`] does not implement a function required by this operation
    MissingCapability(Capability),
    /// DRDY was not asserted within the bound computed by [`Ads1220::conversion_timeout_us`]
    ConversionTimeout,
    /// AVSS referenced channels only support gains 1, 2 and 4
    InvalidGainForTopology,
    /// A reserved code was read back from a register
    InvalidRegisterValue { register: Register, value: u8 },
    /// Registers read back from the device differ from the written configuration
    RegisterMismatch,
}

#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    Adc(AdcError),
    Bus(E),
}

impl<E> From<AdcError> for Error<E> {
    fn from(other: AdcError) -> Self {
        Error::Adc(other)
    }
}

/// Delays used on the bus and when waiting for conversions
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timing {
    /// Between chip select assertion and the first byte
    pub select_delay_us: u32,
    /// After each command or register byte
    pub byte_delay_us: u32,
    /// After each conversion data byte
    pub data_byte_delay_us: u32,
    /// Before and after the RESET command. Needs to be at least 50 us + 32 t_CLK
    pub reset_delay_us: u32,
    /// Between two polls of the data-ready line
    pub poll_interval_us: u32,
    /// Conversion periods to wait for DRDY before giving up
    pub timeout_periods: u32,
    /// Added to the conversion timeout
    pub timeout_margin_us: u32,
}

impl Default for Timing {
    fn default() -> Self {
        Timing {
            select_delay_us: 5,
            byte_delay_us: 5,
            data_byte_delay_us: 1,
            reset_delay_us: 100,
            poll_interval_us: 10,
            timeout_periods: 3,
            timeout_margin_us: 2_000,
        }
    }
}

/// Behaviour of the multi-channel read functions
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SequencerOptions {
    /// Issue START/SYNC and wait for one conversion before the first channel. Flushes a stale
    /// result if the device was idle for longer than one conversion period. Can be disabled
    /// if the functions are called back to back.
    pub wake_before_sequence: bool,
    /// In continuous conversion mode, issue START/SYNC instead of writing register 0 when the
    /// value for the next channel is already resident.
    pub skip_unchanged_writes: bool,
}

impl Default for SequencerOptions {
    fn default() -> Self {
        SequencerOptions {
            wake_before_sequence: true,
            skip_unchanged_writes: true,
        }
    }
}

//==================================================================================================
// ADC implementation
//==================================================================================================

pub struct Ads1220<IF> {
    iface: IF,
    timing: Timing,
    options: SequencerOptions,
    caps: Capabilities,
    /// Configuration known to be resident in the device
    config: Option<Config>,
    /// Continuous conversions were started and not stopped since
    running: bool,
}

impl<IF: Interface> Ads1220<IF> {
    /// Create a new driver instance. The device is not accessed. Please note that you still
    /// need to call [`Ads1220::init`] before most operations are available.
    pub fn new(iface: IF) -> Self {
        let caps = iface.capabilities();
        if !caps.data_ready {
            warn!("ADS1220: no data-ready line, multi-channel reads are unavailable");
        }
        if !caps.send_receive {
            warn!("ADS1220: no transmit-receive, continuous multi-channel reads are unavailable");
        }
        Ads1220 {
            iface,
            timing: Timing::default(),
            options: SequencerOptions::default(),
            caps,
            config: None,
            running: false,
        }
    }

    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }

    pub fn with_options(mut self, options: SequencerOptions) -> Self {
        self.options = options;
        self
    }

    #[inline]
    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    #[inline]
    pub fn options(&self) -> &SequencerOptions {
        &self.options
    }

    #[inline]
    pub fn capabilities(&self) -> Capabilities {
        self.caps
    }

    /// Configuration which was last written to the device
    #[inline]
    pub fn config(&self) -> Option<&Config> {
        self.config.as_ref()
    }

    #[inline]
    pub fn interface(&self) -> &IF {
        &self.iface
    }

    pub fn release(self) -> IF {
        self.iface
    }

    #[inline]
    pub(crate) fn cached_config(&self) -> Result<Config, Error<IF::Error>> {
        self.config.ok_or(Error::Adc(AdcError::NotInitialized))
    }

    pub(crate) fn invalidate_config(&mut self) {
        self.config = None;
    }

    //==============================================================================================
    // Framing
    //==============================================================================================

    #[inline]
    fn begin(&mut self) -> Result<(), Error<IF::Error>> {
        self.iface.select(true).map_err(Error::Bus)?;
        self.iface.delay_us(self.timing.select_delay_us);
        Ok(())
    }

    #[inline]
    fn end(&mut self) -> Result<(), Error<IF::Error>> {
        self.iface.select(false).map_err(Error::Bus)
    }

    #[inline]
    fn send_byte(&mut self, byte: u8) -> Result<(), Error<IF::Error>> {
        self.iface.send(byte).map_err(Error::Bus)?;
        self.iface.delay_us(self.timing.byte_delay_us);
        Ok(())
    }

    #[inline]
    fn receive_byte(&mut self, delay_us: u32) -> Result<u8, Error<IF::Error>> {
        let byte = self.iface.receive().map_err(Error::Bus)?;
        self.iface.delay_us(delay_us);
        Ok(byte)
    }

    #[inline]
    fn command(&mut self, cmd: u8) -> Result<(), Error<IF::Error>> {
        self.begin()?;
        self.send_byte(cmd)?;
        self.end()
    }

    //==============================================================================================
    // Commands and register access
    //==============================================================================================

    /// Reset the device. All registers return to their default value and the device is idle.
    pub fn reset(&mut self) -> Result<(), Error<IF::Error>> {
        self.running = false;
        self.iface.delay_us(self.timing.reset_delay_us);
        self.command(cmd::RESET)?;
        self.iface.delay_us(self.timing.reset_delay_us);
        self.config = Some(Config::default());
        Ok(())
    }

    /// Start a conversion in single-shot mode or restart conversions in continuous mode
    pub fn start_sync(&mut self) -> Result<(), Error<IF::Error>> {
        self.command(cmd::START_SYNC)?;
        self.running = matches!(
            self.config,
            Some(Config {
                conversion_mode: ConversionMode::Continuous,
                ..
            })
        );
        Ok(())
    }

    /// Stop conversions. Register contents are kept, [`Ads1220::start_sync`] wakes the device.
    pub fn power_down(&mut self) -> Result<(), Error<IF::Error>> {
        self.running = false;
        self.command(cmd::POWERDOWN)
    }

    /// `true` if continuous conversions are known to be running. Writing a register restarts
    /// them. Otherwise the device waits for START/SYNC.
    #[inline]
    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn read_register(&mut self, reg: Register) -> Result<u8, Error<IF::Error>> {
        self.begin()?;
        self.send_byte(cmd::rreg(reg, 1))?;
        let value = self.receive_byte(self.timing.byte_delay_us)?;
        self.end()?;
        Ok(value)
    }

    pub fn read_registers(&mut self) -> Result<[u8; NUM_REGISTERS], Error<IF::Error>> {
        let mut regs = [0; NUM_REGISTERS];
        self.begin()?;
        self.send_byte(cmd::rreg(Register::Config0, NUM_REGISTERS as u8))?;
        for reg in regs.iter_mut() {
            *reg = self.receive_byte(self.timing.byte_delay_us)?;
        }
        self.end()?;
        Ok(regs)
    }

    /// Write a single register. The cached configuration is not updated.
    pub fn write_register(&mut self, reg: Register, value: u8) -> Result<(), Error<IF::Error>> {
        self.begin()?;
        self.send_byte(cmd::wreg(reg, 1))?;
        self.send_byte(value)?;
        self.end()
    }

    /// Write all four configuration registers in one burst. The cached configuration is not
    /// updated, use [`Ads1220::change_config`] for typed access.
    pub fn write_registers(&mut self, values: &[u8; NUM_REGISTERS]) -> Result<(), Error<IF::Error>> {
        self.begin()?;
        self.send_byte(cmd::wreg(Register::Config0, NUM_REGISTERS as u8))?;
        for value in values {
            self.send_byte(*value)?;
        }
        self.end()
    }

    //==============================================================================================
    // Configuration
    //==============================================================================================

    /// Reset the device and write the full configuration. Pass [`Config::default`] for the
    /// power-up settings.
    pub fn init(&mut self, config: &Config) -> Result<(), Error<IF::Error>> {
        self.reset()?;
        self.change_config(config)
    }

    pub fn change_config(&mut self, config: &Config) -> Result<(), Error<IF::Error>> {
        let regs = config.to_registers();
        debug!("ADS1220: writing registers {=[u8]:#x}", &regs[..]);
        self.config = None;
        if config.conversion_mode == ConversionMode::SingleShot {
            self.running = false;
        }
        self.write_registers(&regs)?;
        self.config = Some(*config);
        Ok(())
    }

    /// Read back and decode all four configuration registers
    pub fn read_config(&mut self) -> Result<Config, Error<IF::Error>> {
        let regs = self.read_registers()?;
        Ok(Config::from_registers(&regs)?)
    }

    /// Compare the register contents of the device with the last written configuration
    pub fn verify_config(&mut self) -> Result<(), Error<IF::Error>> {
        let expected = self.cached_config()?.to_registers();
        let regs = self.read_registers()?;
        if regs != expected {
            warn!(
                "ADS1220: register mismatch, read {=[u8]:#x}, expected {=[u8]:#x}",
                &regs[..],
                &expected[..]
            );
            return Err(Error::Adc(AdcError::RegisterMismatch));
        }
        Ok(())
    }

    /// Change the gain. The other fields of register 0 are kept.
    pub fn set_gain(&mut self, gain: Gain) -> Result<(), Error<IF::Error>> {
        let input = self.cached_config()?.input_select();
        self.update_input_select(InputSelect { gain, ..input })
    }

    /// Select the input multiplexer setting. The other fields of register 0 are kept.
    pub fn set_input(&mut self, mux: Mux) -> Result<(), Error<IF::Error>> {
        let input = self.cached_config()?.input_select();
        self.update_input_select(InputSelect { mux, ..input })
    }

    /// Switch between single-shot and continuous conversion mode
    pub fn set_conversion_mode(&mut self, mode: ConversionMode) -> Result<(), Error<IF::Error>> {
        let mut config = self.cached_config()?;
        config.conversion_mode = mode;
        self.config = None;
        if mode == ConversionMode::SingleShot {
            self.running = false;
        }
        self.write_register(Register::Config1, config.config1_byte())?;
        self.config = Some(config);
        Ok(())
    }

    fn update_input_select(&mut self, input: InputSelect) -> Result<(), Error<IF::Error>> {
        let mut config = self.cached_config()?;
        config.set_input_select(input);
        self.config = None;
        self.write_register(Register::Config0, input.to_bits())?;
        self.config = Some(config);
        Ok(())
    }

    //==============================================================================================
    // Conversion data
    //==============================================================================================

    /// Upper bound for a single conversion with the current configuration
    pub fn conversion_timeout_us(&self) -> Result<u32, Error<IF::Error>> {
        let config = self.cached_config()?;
        Ok(config
            .conversion_period_us()
            .saturating_mul(self.timing.timeout_periods)
            .saturating_add(self.timing.timeout_margin_us))
    }

    /// Read the conversion result directly. Only valid after DRDY was asserted.
    pub fn read_data(&mut self) -> Result<i32, Error<IF::Error>> {
        let mut raw = [0; 3];
        self.begin()?;
        for byte in raw.iter_mut() {
            *byte = self.receive_byte(self.timing.data_byte_delay_us)?;
        }
        self.iface.delay_us(self.timing.select_delay_us);
        self.end()?;
        Ok(decode_sample(raw))
    }

    /// Read the conversion result if DRDY is asserted
    pub fn read_data_nb(&mut self) -> nb::Result<i32, Error<IF::Error>> {
        self.poll_ready()?;
        Ok(self.read_data()?)
    }

    /// Block until DRDY is asserted, at most for [`Ads1220::conversion_timeout_us`]
    pub fn wait_ready(&mut self) -> Result<(), Error<IF::Error>> {
        let budget_us = self.conversion_timeout_us()?;
        self.wait_ready_within(budget_us)
    }

    /// Convert with the current configuration and return the result. In single-shot mode, a
    /// conversion is started first. In continuous mode, conversions are started if the device
    /// is idle after [`Ads1220::init`] or [`Ads1220::power_down`].
    pub fn read_sample(&mut self) -> Result<i32, Error<IF::Error>> {
        let config = self.cached_config()?;
        if config.conversion_mode == ConversionMode::SingleShot || !self.running {
            self.start_sync()?;
        }
        self.wait_ready()?;
        self.read_data()
    }

    fn poll_ready(&mut self) -> nb::Result<(), Error<IF::Error>> {
        match self.iface.is_converting() {
            None => Err(nb::Error::Other(Error::Adc(AdcError::MissingCapability(
                Capability::DataReady,
            )))),
            Some(Err(e)) => Err(nb::Error::Other(Error::Bus(e))),
            Some(Ok(true)) => Err(nb::Error::WouldBlock),
            Some(Ok(false)) => Ok(()),
        }
    }

    pub(crate) fn wait_ready_within(&mut self, budget_us: u32) -> Result<(), Error<IF::Error>> {
        let step_us = self.timing.poll_interval_us.max(1);
        let mut waited_us: u32 = 0;
        loop {
            match self.poll_ready() {
                Ok(()) => return Ok(()),
                Err(nb::Error::Other(e)) => return Err(e),
                Err(nb::Error::WouldBlock) => (),
            }
            if waited_us >= budget_us {
                warn!("ADS1220: no conversion result after {=u32} us", waited_us);
                return Err(Error::Adc(AdcError::ConversionTimeout));
            }
            self.iface.delay_us(step_us);
            waited_us = waited_us.saturating_add(step_us);
        }
    }

    /// Read the pending conversion result while writing `config0` to register 0. The device
    /// accepts commands on DIN while conversion data is clocked out on DOUT.
    pub(crate) fn read_data_and_write_config0(&mut self, config0: u8) -> Result<i32, Error<IF::Error>> {
        let tx = [cmd::wreg(Register::Config0, 1), config0, cmd::DUMMY];
        let mut raw = [0; 3];
        self.begin()?;
        for (rx, tx) in raw.iter_mut().zip(tx) {
            *rx = match self.iface.send_receive(tx) {
                Some(reply) => reply.map_err(Error::Bus)?,
                None => {
                    self.end()?;
                    return Err(Error::Adc(AdcError::MissingCapability(
                        Capability::SendReceive,
                    )));
                }
            };
            self.iface.delay_us(self.timing.data_byte_delay_us);
        }
        self.iface.delay_us(self.timing.select_delay_us);
        self.end()?;
        Ok(decode_sample(raw))
    }
}
