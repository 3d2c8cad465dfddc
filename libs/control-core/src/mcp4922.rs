//! MCP4922 dual 12-bit SPI DAC: typed command frames plus the transfer
//! sequence.
//!
//! The two outputs program the regulator references: channel A the
//! switching pre-regulator, channel B the linear output stage. Every write
//! is a complete 2-byte command; there is no readback path, so the frame
//! layout is covered by unit tests instead.

use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiBus;

/// Highest programmable code (12-bit device).
pub const MAX_CODE: u16 = 4095;

// Byte0 layout. Bit6 (buffered reference) is wired unbuffered on this board
// and always transmitted as 0.
const CHANNEL_B_BIT: u8 = 0x80;
const GAIN_X1_BIT: u8 = 0x20;
const ACTIVE_BIT: u8 = 0x10;

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// OUTA, switching pre-regulator reference.
    A,
    /// OUTB, linear stage reference.
    B,
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error<E> {
    /// SPI bus error during the transfer.
    Comm(E),
    /// Code does not fit the 12-bit value field.
    InvalidValue,
}

/// One complete DAC command.
///
/// `double_gain` selects the 2× output range (the gain bit is transmitted
/// inverted: 0 on the wire means 2×). `powered` clear puts the channel into
/// shutdown, presenting a high-impedance output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    channel: Channel,
    double_gain: bool,
    powered: bool,
    value: u16,
}

impl Default for Command {
    /// Channel A, 1× gain, powered, code 0.
    fn default() -> Self {
        Command {
            channel: Channel::A,
            double_gain: false,
            powered: true,
            value: 0,
        }
    }
}

impl Command {
    pub fn channel(mut self, channel: Channel) -> Self {
        self.channel = channel;
        self
    }

    pub fn double_gain(mut self) -> Self {
        self.double_gain = true;
        self
    }

    pub fn single_gain(mut self) -> Self {
        self.double_gain = false;
        self
    }

    pub fn powered(mut self, powered: bool) -> Self {
        self.powered = powered;
        self
    }

    pub fn value(mut self, value: u16) -> Self {
        self.value = value;
        self
    }

    pub fn code(&self) -> u16 {
        self.value
    }

    /// Encode to the 2-byte wire frame, MSB first.
    pub fn to_frame(self) -> [u8; 2] {
        let mut byte0 = ((self.value >> 8) & 0x0F) as u8;
        if self.channel == Channel::B {
            byte0 |= CHANNEL_B_BIT;
        }
        if !self.double_gain {
            byte0 |= GAIN_X1_BIT;
        }
        if self.powered {
            byte0 |= ACTIVE_BIT;
        }
        [byte0, (self.value & 0xFF) as u8]
    }

    /// Decode a wire frame back into its fields. Inverse of
    /// [`Command::to_frame`] for every in-range command.
    pub fn from_frame(frame: [u8; 2]) -> Self {
        let channel = if frame[0] & CHANNEL_B_BIT != 0 {
            Channel::B
        } else {
            Channel::A
        };
        Command {
            channel,
            double_gain: frame[0] & GAIN_X1_BIT == 0,
            powered: frame[0] & ACTIVE_BIT != 0,
            value: ((frame[0] & 0x0F) as u16) << 8 | frame[1] as u16,
        }
    }
}

/// Driver owning the chip-select line; the SPI bus itself is borrowed per
/// transfer so the ADC can share it. Assert CS → two bytes → deassert CS is
/// one critical section and must never interleave with the ADC's sequence;
/// the `&mut` bus borrow enforces that within safe code.
pub struct Mcp4922<CS> {
    cs: CS,
}

impl<CS: OutputPin> Mcp4922<CS> {
    pub fn new(cs: CS) -> Self {
        Self { cs }
    }

    pub fn send<SPI: SpiBus>(
        &mut self,
        spi: &mut SPI,
        command: Command,
    ) -> Result<(), Error<SPI::Error>> {
        if command.value > MAX_CODE {
            return Err(Error::InvalidValue);
        }
        let frame = command.to_frame();

        self.cs.set_low().ok();
        let result = spi
            .write(&frame)
            .and_then(|_| spi.flush())
            .map_err(Error::Comm);
        self.cs.set_high().ok();
        result
    }

    pub fn release(self) -> CS {
        self.cs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_layout_matches_datasheet() {
        let cmd = Command::default()
            .channel(Channel::B)
            .double_gain()
            .powered(true)
            .value(0xABC);
        // Channel bit set, gain bit clear (2x selected), active bit set,
        // top nibble of the code in the low nibble of byte0.
        assert_eq!(cmd.to_frame(), [0b1001_1010, 0xBC]);
    }

    #[test]
    fn channel_a_single_gain_frame() {
        let cmd = Command::default().value(0x123);
        assert_eq!(cmd.to_frame(), [0b0011_0001, 0x23]);
    }

    #[test]
    fn shutdown_clears_active_bit() {
        let cmd = Command::default().powered(false).value(0);
        assert_eq!(cmd.to_frame(), [0b0010_0000, 0x00]);
    }

    #[test]
    fn roundtrip_recovers_all_fields() {
        let cmd = Command::default()
            .channel(Channel::B)
            .double_gain()
            .powered(false)
            .value(0x5A5);
        assert_eq!(Command::from_frame(cmd.to_frame()), cmd);

        let cmd = Command::default().value(MAX_CODE);
        assert_eq!(Command::from_frame(cmd.to_frame()), cmd);
    }

    mod transfer {
        use super::*;
        use embedded_hal_mock::eh1::digital::{
            Mock as PinMock, State as PinLevel, Transaction as PinCall,
        };
        use embedded_hal_mock::eh1::spi::{Mock as SpiMock, Transaction as SpiCall};
        use std::vec;

        #[test]
        fn send_frames_one_chip_select_window() {
            let mut spi = SpiMock::new(&[
                SpiCall::write_vec(vec![0b1001_1010, 0xBC]),
                SpiCall::flush(),
            ]);
            let cs = PinMock::new(&[
                PinCall::set(PinLevel::Low),
                PinCall::set(PinLevel::High),
            ]);

            let mut dac = Mcp4922::new(cs);
            let cmd = Command::default()
                .channel(Channel::B)
                .double_gain()
                .value(0xABC);
            dac.send(&mut spi, cmd).unwrap();

            dac.release().done();
            spi.done();
        }

        #[test]
        fn oversized_code_is_rejected_before_any_transfer() {
            let mut spi = SpiMock::new(&[]);
            let cs = PinMock::new(&[]);

            let mut dac = Mcp4922::new(cs);
            let err = dac
                .send(&mut spi, Command::default().value(MAX_CODE + 1))
                .unwrap_err();
            assert_eq!(err, Error::InvalidValue);

            dac.release().done();
            spi.done();
        }
    }
}
