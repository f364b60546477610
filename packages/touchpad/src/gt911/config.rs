//! Register image uploaded to 0x8047 at start-up.
//!
//! Panel: 1024x600, five touch points, INT asserted on the falling edge,
//! 20 ms report interval. The checksum byte and the fresh flag that follow
//! the body on the wire are appended by [`super::Gt911::upload_config`].

pub const CONFIG_BODY_LEN: usize = 184;
/// Written after the checksum so the controller reloads the image.
pub const CONFIG_FRESH: u8 = 0x01;

pub const OFFSET_X_RESOLUTION: usize = 1;
pub const OFFSET_Y_RESOLUTION: usize = 3;
pub const OFFSET_TOUCH_POINTS: usize = 5;
pub const OFFSET_MODULE_SWITCH: usize = 6;
pub const OFFSET_REFRESH_RATE: usize = 15;

#[rustfmt::skip]
pub const DEFAULT_CONFIG: [u8; CONFIG_BODY_LEN] = [
    0x81, 0x00, 0x04, 0x58, 0x02, 0x05, 0x3D, 0x20, 0x22, 0x08, 0x28, 0x08,
    0x5F, 0x41, 0x03, 0x0F, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x17,
    0x1A, 0x1D, 0x14, 0x88, 0x29, 0x08, 0x99, 0x9B, 0xB2, 0x04, 0x00, 0x00,
    0x00, 0x21, 0x01, 0x1D, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x82, 0xB4, 0x9E, 0xD5, 0xF4, 0x07, 0x00, 0x00, 0x04,
    0x89, 0x86, 0x00, 0x84, 0x8F, 0x00, 0x7F, 0x99, 0x00, 0x7B, 0xA3, 0x00,
    0x77, 0xAE, 0x00, 0x77, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x02, 0x04, 0x06, 0x08, 0x0A, 0x0C, 0x10, 0x12,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x02,
    0x04, 0x06, 0x08, 0x0F, 0x10, 0x12, 0x16, 0x18, 0x1C, 0x1D, 0x1E, 0x1F,
    0x20, 0x21, 0x22, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00,
];

/// Two's complement of the byte sum, so body plus checksum sums to zero.
pub fn config_checksum(body: &[u8]) -> u8 {
    body.iter()
        .fold(0u8, |acc, byte| acc.wrapping_add(*byte))
        .wrapping_neg()
}

pub fn configured_resolution(body: &[u8; CONFIG_BODY_LEN]) -> (u16, u16) {
    (
        u16::from_le_bytes([
            body[OFFSET_X_RESOLUTION],
            body[OFFSET_X_RESOLUTION + 1],
        ]),
        u16::from_le_bytes([
            body[OFFSET_Y_RESOLUTION],
            body[OFFSET_Y_RESOLUTION + 1],
        ]),
    )
}
