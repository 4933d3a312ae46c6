//! Conversion results
//!
//! Conversion data is a 24-bit two's complement word transmitted most significant byte first.
use crate::Gain;

/// Voltage of the internal reference
pub const INTERNAL_REFERENCE_VOLTS: f32 = 2.048;

/// Number of codes for the positive half of the input range, 2^23
pub const POSITIVE_CODES: i32 = 0x80_0000;

const SIGN_BIT: u32 = 0x80_0000;
const CODE_RANGE: i32 = 0x100_0000;

/// Resolution of the temperature sensor result in degrees Celsius
const TEMPERATURE_LSB_CELSIUS: f32 = 0.031_25;

/// Sign-extend a raw 24-bit conversion word to an [`i32`]
#[inline]
pub const fn decode_sample(bytes: [u8; 3]) -> i32 {
    let raw = ((bytes[0] as u32) << 16) | ((bytes[1] as u32) << 8) | bytes[2] as u32;
    if raw & SIGN_BIT != 0 {
        raw as i32 - CODE_RANGE
    } else {
        raw as i32
    }
}

/// Input voltage for a sample converted with the given reference voltage and gain
pub fn to_voltage(sample: i32, vref_volts: f32, gain: Gain) -> f32 {
    sample as f32 * vref_volts / (POSITIVE_CODES as f32 * gain.multiplier() as f32)
}

/// Temperature for a sample taken in temperature sensor mode. The result is a 14-bit value
/// left-justified within the 24-bit word.
pub fn temperature_celsius(sample: i32) -> f32 {
    (sample >> 10) as f32 * TEMPERATURE_LSB_CELSIUS
}
