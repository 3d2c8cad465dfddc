//! MCP3204 4-channel 12-bit SPI ADC: typed query frames and response
//! decoding.
//!
//! All four inputs are sampled single-ended. A conversion is one 3-byte
//! full-duplex transfer: the query bits go out while the device clocks the
//! conversion result back in, straddling the second and third byte.

use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiBus;

// Byte0: start bit and single-ended select, everything else zero. The
// channel number rides in the top two bits of byte1; byte2 is a dummy that
// only exists to clock the low half of the result out of the device.
const START_BIT: u8 = 0b0000_0100;
const SINGLE_ENDED_BIT: u8 = 0b0000_0010;

/// The response carries a null bit above the 12 data bits; mask it off.
const RESPONSE_MASK: u16 = 0x0FFF;

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Ch0,
    Ch1,
    Ch2,
    Ch3,
}

impl Channel {
    pub const fn index(self) -> u8 {
        self as u8
    }

    pub const ALL: [Channel; 4] = [Channel::Ch0, Channel::Ch1, Channel::Ch2, Channel::Ch3];
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error<E> {
    /// SPI bus error during the transfer.
    Comm(E),
}

/// Encode the 3-byte single-ended conversion request for `channel`.
pub const fn request_frame(channel: Channel) -> [u8; 3] {
    [
        START_BIT | SINGLE_ENDED_BIT,
        (channel.index()) << 6,
        0x00,
    ]
}

/// Recover the 12-bit conversion result from the raw response bytes.
///
/// Out-of-range garbage above bit 11 is silently masked, never flagged;
/// there is no error path on this link.
pub const fn decode_response(response: [u8; 3]) -> u16 {
    ((response[1] as u16) << 8 | response[2] as u16) & RESPONSE_MASK
}

/// Driver owning the chip-select line; shares the SPI bus with the DAC by
/// borrowing it per conversion.
pub struct Mcp3204<CS> {
    cs: CS,
}

impl<CS: OutputPin> Mcp3204<CS> {
    pub fn new(cs: CS) -> Self {
        Self { cs }
    }

    /// Run one conversion and return the raw 12-bit code.
    pub fn read<SPI: SpiBus>(
        &mut self,
        spi: &mut SPI,
        channel: Channel,
    ) -> Result<u16, Error<SPI::Error>> {
        let tx = request_frame(channel);
        let mut rx = [0u8; 3];

        self.cs.set_low().ok();
        let result = spi
            .transfer(&mut rx, &tx)
            .and_then(|_| spi.flush())
            .map_err(Error::Comm);
        self.cs.set_high().ok();
        result?;

        Ok(decode_response(rx))
    }

    pub fn release(self) -> CS {
        self.cs
    }
}
