//! Relative-mouse report handed to the transport.

use crate::gesture::{PointerUpdate, BUTTON_LEFT};

pub const REPORT_ID_MOUSE: u8 = 0x02;
pub const SERIAL_SYNC: u8 = 0xA5;
pub const BOOT_REPORT_LEN: usize = 4;
/// Sync, report id, boot report, xor checksum.
pub const SERIAL_FRAME_LEN: usize = BOOT_REPORT_LEN + 3;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MouseReport {
    pub buttons: u8,
    pub x: i8,
    pub y: i8,
    pub wheel: i8,
}

impl MouseReport {
    pub fn from_update(update: &PointerUpdate) -> Self {
        Self {
            buttons: if update.left_button { BUTTON_LEFT } else { 0 },
            x: update.delta_x,
            y: update.delta_y,
            wheel: 0,
        }
    }

    /// HID boot-protocol mouse layout.
    pub fn boot_bytes(&self) -> [u8; BOOT_REPORT_LEN] {
        [
            self.buttons,
            self.x as u8,
            self.y as u8,
            self.wheel as u8,
        ]
    }

    pub fn serial_frame(&self) -> [u8; SERIAL_FRAME_LEN] {
        let boot = self.boot_bytes();
        let mut frame = [0u8; SERIAL_FRAME_LEN];
        frame[0] = SERIAL_SYNC;
        frame[1] = REPORT_ID_MOUSE;
        frame[2..2 + BOOT_REPORT_LEN].copy_from_slice(&boot);
        frame[SERIAL_FRAME_LEN - 1] = frame[1..SERIAL_FRAME_LEN - 1]
            .iter()
            .fold(0u8, |acc, byte| acc ^ byte);
        frame
    }
}

/// Destination for pointer reports (USB HID, serial bridge, test capture).
pub trait PointerSink {
    type Error;

    fn send(&mut self, report: &MouseReport) -> Result<(), Self::Error>;
}

/// Sends `update` when it carries a change. Returns whether a report went out.
pub fn forward_update<S: PointerSink>(
    update: &PointerUpdate,
    sink: &mut S,
) -> Result<bool, S::Error> {
    if !update.changed {
        return Ok(false);
    }
    sink.send(&MouseReport::from_update(update))?;
    Ok(true)
}
