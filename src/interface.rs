//! Bus access for the ADS1220
//!
//! The driver only talks to the device through the [`Interface`] trait. [`SpiInterface`]
//! implements it with the `embedded-hal` SPI bus, chip select pin and delay traits. The
//! data-ready line is optional and can be attached with [`SpiInterface::with_data_ready`].
//!
//! Without the data-ready line, the multi-channel read functions of the driver are not
//! available. Without the combined transmit-receive, the pipelined continuous mode read
//! functions are not available.
use core::convert::Infallible;

use embedded_hal::{
    delay::DelayNs,
    digital::{InputPin, OutputPin},
    spi::SpiBus,
};

/// Optional capabilities of an [`Interface`]
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Capabilities {
    /// [`Interface::send_receive`] is implemented
    pub send_receive: bool,
    /// [`Interface::is_converting`] is implemented
    pub data_ready: bool,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Capability {
    SendReceive,
    DataReady,
}

/// Capability set required by the driver.
///
/// Bus errors are reported through [`Interface::Error`] and propagated to the caller of the
/// driver function as [`crate::Error::Bus`].
pub trait Interface {
    type Error;

    /// Assert (`true`) or deassert (`false`) the chip select line
    fn select(&mut self, active: bool) -> Result<(), Self::Error>;

    fn send(&mut self, byte: u8) -> Result<(), Self::Error>;

    fn receive(&mut self) -> Result<u8, Self::Error>;

    fn delay_us(&mut self, us: u32);

    /// Which of the optional functions are implemented
    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }

    /// Send a byte while receiving one. Returns [None] if the bus can not do this.
    fn send_receive(&mut self, byte: u8) -> Option<Result<u8, Self::Error>> {
        let _ = byte;
        None
    }

    /// Returns `true` while no new conversion result is available. Returns [None] if no
    /// data-ready line is connected.
    fn is_converting(&mut self) -> Option<Result<bool, Self::Error>> {
        None
    }
}

//==================================================================================================
// Data-ready line
//==================================================================================================

/// Marker for an [`SpiInterface`] without a data-ready line
pub struct NoDataReady;

/// Data-ready line of an [`SpiInterface`]. DRDY is driven low by the device when a new
/// conversion result is available.
pub struct DataReady<P>(P);

impl<P> DataReady<P> {
    pub fn into_inner(self) -> P {
        self.0
    }
}

pub trait DataReadyLine: private::Sealed {
    const AVAILABLE: bool;
    type Error;

    fn is_converting(&mut self) -> Option<Result<bool, Self::Error>>;
}

impl private::Sealed for NoDataReady {}
impl DataReadyLine for NoDataReady {
    const AVAILABLE: bool = false;
    type Error = Infallible;

    #[inline]
    fn is_converting(&mut self) -> Option<Result<bool, Infallible>> {
        None
    }
}

impl<P> private::Sealed for DataReady<P> {}
impl<P: InputPin> DataReadyLine for DataReady<P> {
    const AVAILABLE: bool = true;
    type Error = P::Error;

    #[inline]
    fn is_converting(&mut self) -> Option<Result<bool, P::Error>> {
        Some(self.0.is_high())
    }
}

//==================================================================================================
// embedded-hal implementation
//==================================================================================================

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InterfaceError<SpiE, PinE, DrdyE = Infallible> {
    Spi(SpiE),
    /// Chip select pin
    Pin(PinE),
    DataReady(DrdyE),
}

/// [`Interface`] implementation using an `embedded-hal` SPI bus with a separate chip select pin.
///
/// The SPI bus needs to be configured for SPI mode 1 (CPOL = 0, CPHA = 1).
pub struct SpiInterface<SPI, CS, DELAY, DRDY = NoDataReady> {
    spi: SPI,
    cs: CS,
    delay: DELAY,
    drdy: DRDY,
}

impl<SPI, CS, DELAY> SpiInterface<SPI, CS, DELAY, NoDataReady> {
    pub fn new(spi: SPI, cs: CS, delay: DELAY) -> Self {
        SpiInterface {
            spi,
            cs,
            delay,
            drdy: NoDataReady,
        }
    }

    /// Attach the DRDY pin. This is required for the multi-channel read functions of the driver
    pub fn with_data_ready<P: InputPin>(self, drdy: P) -> SpiInterface<SPI, CS, DELAY, DataReady<P>> {
        SpiInterface {
            spi: self.spi,
            cs: self.cs,
            delay: self.delay,
            drdy: DataReady(drdy),
        }
    }
}

impl<SPI, CS, DELAY, DRDY> SpiInterface<SPI, CS, DELAY, DRDY> {
    pub fn release(self) -> (SPI, CS, DELAY, DRDY) {
        (self.spi, self.cs, self.delay, self.drdy)
    }
}

impl<SpiE, PinE, SPI, CS, DELAY, DRDY> Interface for SpiInterface<SPI, CS, DELAY, DRDY>
where
    SPI: SpiBus<u8, Error = SpiE>,
    CS: OutputPin<Error = PinE>,
    DELAY: DelayNs,
    DRDY: DataReadyLine,
{
    type Error = InterfaceError<SpiE, PinE, DRDY::Error>;

    fn select(&mut self, active: bool) -> Result<(), Self::Error> {
        if active {
            self.cs.set_low().map_err(InterfaceError::Pin)
        } else {
            // All words need to be clocked out before CS is released
            self.spi.flush().map_err(InterfaceError::Spi)?;
            self.cs.set_high().map_err(InterfaceError::Pin)
        }
    }

    #[inline]
    fn send(&mut self, byte: u8) -> Result<(), Self::Error> {
        self.spi.write(&[byte]).map_err(InterfaceError::Spi)
    }

    #[inline]
    fn receive(&mut self) -> Result<u8, Self::Error> {
        let mut reply = [0; 1];
        self.spi.read(&mut reply).map_err(InterfaceError::Spi)?;
        Ok(reply[0])
    }

    #[inline]
    fn delay_us(&mut self, us: u32) {
        self.delay.delay_us(us);
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            send_receive: true,
            data_ready: DRDY::AVAILABLE,
        }
    }

    fn send_receive(&mut self, byte: u8) -> Option<Result<u8, Self::Error>> {
        let mut buf = [byte];
        Some(
            self.spi
                .transfer_in_place(&mut buf)
                .map(|_| buf[0])
                .map_err(InterfaceError::Spi),
        )
    }

    #[inline]
    fn is_converting(&mut self) -> Option<Result<bool, Self::Error>> {
        self.drdy
            .is_converting()
            .map(|level| level.map_err(InterfaceError::DataReady))
    }
}

mod private {
    pub trait Sealed {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Ads1220, Config, ConversionMode};
    use embedded_hal::digital::ErrorType;
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::digital::{
        Mock as PinMock, State as PinState, Transaction as PinTransaction,
    };
    use embedded_hal_mock::eh1::spi::{Mock as SpiMock, Transaction as SpiTransaction};

    /// Input pin which can not fail and always reads low
    struct LowPin;

    impl ErrorType for LowPin {
        type Error = Infallible;
    }

    impl InputPin for LowPin {
        fn is_high(&mut self) -> Result<bool, Infallible> {
            Ok(false)
        }

        fn is_low(&mut self) -> Result<bool, Infallible> {
            Ok(true)
        }
    }

    #[test]
    fn capabilities_follow_data_ready_pin() {
        let mut spi = SpiMock::<u8>::new(&[]);
        let mut cs = PinMock::new(&[]);
        let mut drdy = PinMock::new(&[]);
        let iface = SpiInterface::new(spi.clone(), cs.clone(), NoopDelay::new());
        assert_eq!(
            iface.capabilities(),
            Capabilities {
                send_receive: true,
                data_ready: false
            }
        );
        let iface = iface.with_data_ready(drdy.clone());
        assert_eq!(
            iface.capabilities(),
            Capabilities {
                send_receive: true,
                data_ready: true
            }
        );
        spi.done();
        cs.done();
        drdy.done();
    }

    #[test]
    fn start_sync_frame() {
        let mut spi = SpiMock::<u8>::new(&[
            SpiTransaction::write_vec(vec![0x08]),
            SpiTransaction::flush(),
        ]);
        let mut cs = PinMock::new(&[
            PinTransaction::set(PinState::Low),
            PinTransaction::set(PinState::High),
        ]);
        let mut adc = Ads1220::new(SpiInterface::new(spi.clone(), cs.clone(), NoopDelay::new()));
        adc.start_sync().unwrap();
        spi.done();
        cs.done();
    }

    #[test]
    fn read_register_frame() {
        let mut spi = SpiMock::<u8>::new(&[
            SpiTransaction::write_vec(vec![0x24]),
            SpiTransaction::read_vec(vec![0xA5]),
            SpiTransaction::flush(),
        ]);
        let mut cs = PinMock::new(&[
            PinTransaction::set(PinState::Low),
            PinTransaction::set(PinState::High),
        ]);
        let mut adc = Ads1220::new(SpiInterface::new(spi.clone(), cs.clone(), NoopDelay::new()));
        assert_eq!(adc.read_register(crate::Register::Config1).unwrap(), 0xA5);
        spi.done();
        cs.done();
    }

    #[test]
    fn blocking_read_waits_for_drdy() {
        let config = Config {
            conversion_mode: ConversionMode::Continuous,
            ..Default::default()
        };
        let mut spi = SpiMock::<u8>::new(&[
            // init: reset command
            SpiTransaction::write_vec(vec![0x06]),
            SpiTransaction::flush(),
            // init: burst write
            SpiTransaction::write_vec(vec![0x43]),
            SpiTransaction::write_vec(vec![0x00]),
            SpiTransaction::write_vec(vec![0x04]),
            SpiTransaction::write_vec(vec![0x00]),
            SpiTransaction::write_vec(vec![0x00]),
            SpiTransaction::flush(),
            // conversions are started on the first read
            SpiTransaction::write_vec(vec![0x08]),
            SpiTransaction::flush(),
            // data read
            SpiTransaction::read_vec(vec![0xFF]),
            SpiTransaction::read_vec(vec![0xFF]),
            SpiTransaction::read_vec(vec![0xFE]),
            SpiTransaction::flush(),
        ]);
        let mut cs = PinMock::new(&[
            PinTransaction::set(PinState::Low),
            PinTransaction::set(PinState::High),
            PinTransaction::set(PinState::Low),
            PinTransaction::set(PinState::High),
            PinTransaction::set(PinState::Low),
            PinTransaction::set(PinState::High),
            PinTransaction::set(PinState::Low),
            PinTransaction::set(PinState::High),
        ]);
        let mut drdy = PinMock::new(&[
            PinTransaction::get(PinState::High),
            PinTransaction::get(PinState::High),
            PinTransaction::get(PinState::Low),
        ]);
        let iface = SpiInterface::new(spi.clone(), cs.clone(), NoopDelay::new())
            .with_data_ready(drdy.clone());
        let mut adc = Ads1220::new(iface);
        adc.init(&config).unwrap();
        assert_eq!(adc.read_sample().unwrap(), -2);
        spi.done();
        cs.done();
        drdy.done();
    }

    #[test]
    fn data_ready_pin_with_own_error_type() {
        let mut spi = SpiMock::<u8>::new(&[
            SpiTransaction::read_vec(vec![0x00]),
            SpiTransaction::read_vec(vec![0x01]),
            SpiTransaction::read_vec(vec![0x00]),
            SpiTransaction::flush(),
        ]);
        let mut cs = PinMock::new(&[
            PinTransaction::set(PinState::Low),
            PinTransaction::set(PinState::High),
        ]);
        let iface =
            SpiInterface::new(spi.clone(), cs.clone(), NoopDelay::new()).with_data_ready(LowPin);
        assert!(iface.capabilities().data_ready);
        let mut adc = Ads1220::new(iface);
        assert_eq!(adc.read_data_nb(), Ok(256));
        spi.done();
        cs.done();
    }

    #[test]
    fn pipelined_exchange_uses_transfer_in_place() {
        let mut spi = SpiMock::<u8>::new(&[SpiTransaction::transfer_in_place(
            vec![0x40],
            vec![0x12],
        )]);
        let mut cs = PinMock::new(&[]);
        let mut iface = SpiInterface::new(spi.clone(), cs.clone(), NoopDelay::new());
        assert_eq!(iface.send_receive(0x40), Some(Ok(0x12)));
        spi.done();
        cs.done();
    }
}
