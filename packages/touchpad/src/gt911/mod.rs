//! Blocking GT911 driver over an `embedded-hal` I2C bus.

use core::fmt;

use embedded_hal::{
    delay::DelayNs,
    digital::OutputPin,
    i2c::{I2c, Operation, SevenBitAddress},
};
use log::{debug, warn};

use crate::protocol::{
    acknowledgment_payload, decode, needs_acknowledgment, register_address, valid_point_count,
    TouchFrame, POINT_TABLE_LEN,
};

pub mod config;
#[cfg(test)]
mod tests;

pub use config::{config_checksum, CONFIG_BODY_LEN, CONFIG_FRESH, DEFAULT_CONFIG};

/// Address latched when INT is held low while RST is released.
pub const GT911_ADDR_PRIMARY: u8 = 0x5D;
/// Address latched when INT is held high while RST is released.
pub const GT911_ADDR_SECONDARY: u8 = 0x14;

pub const REG_COMMAND: u16 = 0x8040;
pub const REG_CONFIG_START: u16 = 0x8047;
pub const REG_PRODUCT_INFO: u16 = 0x8140;
pub const REG_STATUS: u16 = 0x814E;
pub const REG_POINT_TABLE: u16 = 0x814F;

pub const PRODUCT_INFO_LEN: usize = 11;

const COMMAND_READ_COORDINATES: u8 = 0x00;

const RESET_SELECT_US: u32 = 200;
const RESET_SETTLE_MS: u32 = 6;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Gt911Error<E> {
    I2c(E),
    Pin,
    UnsupportedAddress(u8),
    ConfigLength(usize),
}

impl<E> From<E> for Gt911Error<E> {
    fn from(value: E) -> Self {
        Self::I2c(value)
    }
}

impl<E: fmt::Debug> fmt::Display for Gt911Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gt911Error::I2c(err) => write!(f, "i2c error: {err:?}"),
            Gt911Error::Pin => f.write_str("reset pin could not be driven"),
            Gt911Error::UnsupportedAddress(addr) => {
                write!(f, "unsupported gt911 address {addr:#04x}")
            }
            Gt911Error::ConfigLength(len) => write!(
                f,
                "config body is {len} bytes, expected {CONFIG_BODY_LEN}"
            ),
        }
    }
}

/// Product information block at 0x8140.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GtInfo {
    pub product_id: [u8; 4],
    pub firmware_version: u16,
    pub x_resolution: u16,
    pub y_resolution: u16,
    pub vendor_id: u8,
}

impl GtInfo {
    pub fn from_bytes(raw: &[u8; PRODUCT_INFO_LEN]) -> Self {
        Self {
            product_id: [raw[0], raw[1], raw[2], raw[3]],
            firmware_version: u16::from_le_bytes([raw[4], raw[5]]),
            x_resolution: u16::from_le_bytes([raw[6], raw[7]]),
            y_resolution: u16::from_le_bytes([raw[8], raw[9]]),
            vendor_id: raw[10],
        }
    }

    /// Product id as ASCII with trailing NULs stripped, e.g. `"911"`.
    pub fn product_id_str(&self) -> Option<&str> {
        let len = self
            .product_id
            .iter()
            .position(|byte| *byte == 0)
            .unwrap_or(self.product_id.len());
        core::str::from_utf8(&self.product_id[..len]).ok()
    }
}

pub struct Gt911<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C> Gt911<I2C>
where
    I2C: I2c<SevenBitAddress>,
{
    pub fn new(i2c: I2C, address: u8) -> Result<Self, Gt911Error<I2C::Error>> {
        match address {
            GT911_ADDR_PRIMARY | GT911_ADDR_SECONDARY => Ok(Self { i2c, address }),
            _ => Err(Gt911Error::UnsupportedAddress(address)),
        }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn release(self) -> I2C {
        self.i2c
    }

    /// Pulses RST with INT driven to the level that latches `self.address`.
    ///
    /// INT is left driven; the caller must switch it back to an input before
    /// relying on it as an interrupt line.
    pub fn reset<INT, RST, D>(
        &mut self,
        int: &mut INT,
        rst: &mut RST,
        delay: &mut D,
    ) -> Result<(), Gt911Error<I2C::Error>>
    where
        INT: OutputPin,
        RST: OutputPin,
        D: DelayNs,
    {
        rst.set_low().map_err(|_| Gt911Error::Pin)?;
        int.set_low().map_err(|_| Gt911Error::Pin)?;
        delay.delay_us(RESET_SELECT_US);

        if self.address == GT911_ADDR_SECONDARY {
            int.set_high().map_err(|_| Gt911Error::Pin)?;
        }
        delay.delay_us(RESET_SELECT_US);
        rst.set_high().map_err(|_| Gt911Error::Pin)?;
        delay.delay_ms(RESET_SETTLE_MS);

        debug!("gt911: reset addr={:#04x}", self.address);
        Ok(())
    }

    /// Writes `body` to 0x8047 followed by its checksum and the fresh flag.
    pub fn upload_config(&mut self, body: &[u8]) -> Result<(), Gt911Error<I2C::Error>> {
        if body.len() != CONFIG_BODY_LEN {
            return Err(Gt911Error::ConfigLength(body.len()));
        }

        let reg = register_address(REG_CONFIG_START);
        let trailer = [config_checksum(body), CONFIG_FRESH];
        self.i2c.transaction(
            self.address,
            &mut [
                Operation::Write(&reg),
                Operation::Write(body),
                Operation::Write(&trailer),
            ],
        )?;

        debug!(
            "gt911: config_uploaded len={} checksum={:#04x}",
            body.len(),
            trailer[0]
        );
        Ok(())
    }

    /// Command 0x00: report coordinates.
    pub fn enter_coordinate_mode(&mut self) -> Result<(), Gt911Error<I2C::Error>> {
        self.write_register(REG_COMMAND, &[COMMAND_READ_COORDINATES])
            .map_err(Gt911Error::I2c)
    }

    pub fn read_info(&mut self) -> Result<GtInfo, Gt911Error<I2C::Error>> {
        let mut raw = [0u8; PRODUCT_INFO_LEN];
        self.read_register(REG_PRODUCT_INFO, &mut raw)?;
        Ok(GtInfo::from_bytes(&raw))
    }

    /// One poll cycle: status, point table when announced, acknowledgment.
    ///
    /// A failed point-table read returns before the acknowledgment, so the
    /// controller keeps the buffer and the next cycle reads it again.
    pub fn read_frame(&mut self) -> Result<TouchFrame, Gt911Error<I2C::Error>> {
        let mut status = [0u8; 1];
        self.read_register(REG_STATUS, &mut status)?;
        let status = status[0];

        let frame = if valid_point_count(status).is_some() {
            let mut table = [0u8; POINT_TABLE_LEN];
            self.read_register(REG_POINT_TABLE, &mut table)?;
            decode(status, &table)
        } else {
            decode(status, &[])
        };

        if needs_acknowledgment(&frame) {
            self.acknowledge()?;
        }
        Ok(frame)
    }

    /// Clears the buffer-ready flag. Retried once; a controller that is never
    /// acknowledged stops reporting touches.
    pub fn acknowledge(&mut self) -> Result<(), Gt911Error<I2C::Error>> {
        let payload = acknowledgment_payload();
        match self.write_register(REG_STATUS, &payload) {
            Ok(()) => Ok(()),
            Err(err) => {
                warn!("gt911: ack_retry addr={:#04x} err={:?}", self.address, err);
                self.write_register(REG_STATUS, &payload)
                    .map_err(Gt911Error::I2c)
            }
        }
    }

    pub fn read_register(
        &mut self,
        reg: u16,
        buffer: &mut [u8],
    ) -> Result<(), Gt911Error<I2C::Error>> {
        self.i2c
            .write_read(self.address, &register_address(reg), buffer)?;
        Ok(())
    }

    fn write_register(&mut self, reg: u16, payload: &[u8]) -> Result<(), I2C::Error> {
        let reg = register_address(reg);
        self.i2c.transaction(
            self.address,
            &mut [Operation::Write(&reg), Operation::Write(payload)],
        )
    }
}
