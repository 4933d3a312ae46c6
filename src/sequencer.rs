//! Multi-channel reads
//!
//! Both topologies use the same sequence. Register 0 is read back first so that the gain
//! setting of the caller is reused when no gains are passed, and so that it can be restored at
//! the end. Then each channel is selected, converted and read in turn.
//!
//! In single-shot mode every channel is written, started with START/SYNC and read after DRDY.
//! In continuous mode, writing register 0 restarts the conversion. The read of one channel is
//! therefore combined with the write selecting the next channel, and the read of the last
//! channel writes the original register 0 value back.
use crate::{
    interface::Interface, AdcError, Ads1220, Capability, ConversionMode, Error, Gain,
    InputSelect, Mux, Register,
};

/// AIN0 - AIN1, AIN2 - AIN3
pub const DIFFERENTIAL_CHANNELS: [Mux; 2] = [Mux::Ain0Ain1, Mux::Ain2Ain3];

/// AIN0 to AIN3, each referenced to AVSS
pub const SINGLE_ENDED_CHANNELS: [Mux; 4] =
    [Mux::Ain0Avss, Mux::Ain1Avss, Mux::Ain2Avss, Mux::Ain3Avss];

/// Register 0 value for one channel of a sequence. Without an explicit gain, the gain of the
/// original register 0 value is kept. AVSS referenced channels always bypass the PGA and fall
/// back to gain 1 if the original gain requires the PGA.
fn channel_config0(mux: Mux, gain: Option<Gain>, original: u8) -> u8 {
    let resident_gain = Gain::from_bits(original >> 1);
    let input = if mux.is_single_ended() {
        let gain = match gain {
            Some(gain) => gain,
            None if resident_gain.is_bypass_capable() => resident_gain,
            None => {
                warn!(
                    "ADS1220: gain x{=u8} needs the PGA, using x1 for AVSS channel",
                    resident_gain.multiplier()
                );
                Gain::X1
            }
        };
        InputSelect {
            mux,
            gain,
            pga_bypass: true,
        }
    } else {
        InputSelect {
            mux,
            gain: gain.unwrap_or(resident_gain),
            pga_bypass: original & 0b1 != 0,
        }
    };
    input.to_bits()
}

impl<IF: Interface> Ads1220<IF> {
    /// Read the two differential channels AIN0 - AIN1 and AIN2 - AIN3, in that order.
    ///
    /// Pass [None] to use the gain currently configured in the device for both channels.
    /// Register 0 has its original value again when this function returns successfully.
    pub fn read_all_differential(
        &mut self,
        gains: Option<[Gain; 2]>,
    ) -> Result<[i32; 2], Error<IF::Error>> {
        self.read_all(&DIFFERENTIAL_CHANNELS, gains)
    }

    /// Read the four single-ended channels AIN0 to AIN3 referenced to AVSS, in that order.
    ///
    /// The PGA is bypassed for all channels, so only gains 1, 2 and 4 are valid.
    /// [AdcError::InvalidGainForTopology] is returned for other gains. Pass [None] to use the
    /// gain currently configured in the device. If that gain requires the PGA, gain 1 is used
    /// instead. Register 0 has its original value again when this function returns
    /// successfully.
    pub fn read_all_single_ended(
        &mut self,
        gains: Option<[Gain; 4]>,
    ) -> Result<[i32; 4], Error<IF::Error>> {
        self.read_all(&SINGLE_ENDED_CHANNELS, gains)
    }

    fn read_all<const N: usize>(
        &mut self,
        channels: &[Mux; N],
        gains: Option<[Gain; N]>,
    ) -> Result<[i32; N], Error<IF::Error>> {
        let mode = self.cached_config()?.conversion_mode;
        if !self.caps.data_ready {
            return Err(Error::Adc(AdcError::MissingCapability(Capability::DataReady)));
        }
        if mode == ConversionMode::Continuous && !self.caps.send_receive {
            return Err(Error::Adc(AdcError::MissingCapability(
                Capability::SendReceive,
            )));
        }
        if let Some(gains) = &gains {
            let invalid = channels
                .iter()
                .zip(gains)
                .any(|(mux, gain)| mux.is_single_ended() && !gain.is_bypass_capable());
            if invalid {
                return Err(Error::Adc(AdcError::InvalidGainForTopology));
            }
        }
        let budget_us = self.conversion_timeout_us()?;

        let result = self.sequence(channels, gains, mode, budget_us);
        if result.is_err() {
            // Register 0 might still hold the setting of one of the channels
            self.invalidate_config();
        }
        result
    }

    fn sequence<const N: usize>(
        &mut self,
        channels: &[Mux; N],
        gains: Option<[Gain; N]>,
        mode: ConversionMode,
        budget_us: u32,
    ) -> Result<[i32; N], Error<IF::Error>> {
        let original = self.read_register(Register::Config0)?;
        if self.options.wake_before_sequence {
            self.start_sync()?;
            self.wait_ready_within(budget_us)?;
        }
        let mut config0 = [0; N];
        for (idx, value) in config0.iter_mut().enumerate() {
            *value = channel_config0(channels[idx], gains.map(|g| g[idx]), original);
        }
        let (samples, resident) = match mode {
            ConversionMode::SingleShot => self.sequence_single_shot(&config0, original, budget_us)?,
            ConversionMode::Continuous => self.sequence_continuous(&config0, original, budget_us)?,
        };
        if resident != original {
            self.write_register(Register::Config0, original)?;
        }
        Ok(samples)
    }

    /// Returns the samples and the register 0 value resident in the device afterwards
    fn sequence_single_shot<const N: usize>(
        &mut self,
        config0: &[u8; N],
        original: u8,
        budget_us: u32,
    ) -> Result<([i32; N], u8), Error<IF::Error>> {
        let mut samples = [0; N];
        let mut resident = original;
        for (sample, &value) in samples.iter_mut().zip(config0) {
            trace!("ADS1220: single-shot channel, register 0 {=u8:#x}", value);
            self.write_register(Register::Config0, value)?;
            resident = value;
            self.start_sync()?;
            self.wait_ready_within(budget_us)?;
            *sample = self.read_data()?;
        }
        Ok((samples, resident))
    }

    /// Returns the samples and the register 0 value resident in the device afterwards
    fn sequence_continuous<const N: usize>(
        &mut self,
        config0: &[u8; N],
        original: u8,
        budget_us: u32,
    ) -> Result<([i32; N], u8), Error<IF::Error>> {
        let skip_unchanged = self.options.skip_unchanged_writes;
        let mut samples = [0; N];
        let mut resident = original;
        if let Some(&first) = config0.first() {
            let write = first != resident || !skip_unchanged;
            if write {
                self.write_register(Register::Config0, first)?;
                resident = first;
            }
            // A register write only restarts conversions which are already running
            if !write || !self.running {
                self.start_sync()?;
            }
        }
        for idx in 0..N {
            self.wait_ready_within(budget_us)?;
            let next = config0.get(idx + 1).copied().unwrap_or(original);
            samples[idx] = if next != resident || !skip_unchanged {
                trace!("ADS1220: pipelined read, next register 0 {=u8:#x}", next);
                let sample = self.read_data_and_write_config0(next)?;
                resident = next;
                sample
            } else {
                let sample = self.read_data()?;
                if idx + 1 < N {
                    self.start_sync()?;
                }
                sample
            };
        }
        Ok((samples, resident))
    }
}
