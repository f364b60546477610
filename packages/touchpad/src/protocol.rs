//! Decoding of GT911 status and point-table reads.
//!
//! One poll cycle reads the status register and, when the buffer-ready bit is
//! set, the point table that follows it. Every ready frame must be
//! acknowledged by writing zero back to the status register or the controller
//! stops publishing new touches.

pub const MAX_TOUCH_POINTS: usize = 5;
pub const POINT_RECORD_LEN: usize = 8;
pub const POINT_TABLE_LEN: usize = MAX_TOUCH_POINTS * POINT_RECORD_LEN;

pub const STATUS_BUFFER_READY: u8 = 0x80;
pub const STATUS_POINT_COUNT_MASK: u8 = 0x0F;

const ACKNOWLEDGMENT_PAYLOAD: [u8; 1] = [0x00];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TouchPoint {
    pub x: u16,
    pub y: u16,
    pub size: u16,
    pub track_id: u8,
}

impl TouchPoint {
    /// Decodes one 8-byte point record; the trailing byte is reserved.
    fn from_record(record: &[u8]) -> Self {
        Self {
            track_id: record[0],
            x: u16::from_le_bytes([record[1], record[2]]),
            y: u16::from_le_bytes([record[3], record[4]]),
            size: u16::from_le_bytes([record[5], record[6]]),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TouchFrame {
    pub status: u8,
    pub points: heapless::Vec<TouchPoint, MAX_TOUCH_POINTS>,
}

impl TouchFrame {
    pub fn empty(status: u8) -> Self {
        Self {
            status,
            points: heapless::Vec::new(),
        }
    }

    pub fn is_ready(&self) -> bool {
        status_is_ready(self.status)
    }

    /// Point count as reported in the status byte, valid or not.
    pub fn reported_count(&self) -> u8 {
        self.status & STATUS_POINT_COUNT_MASK
    }

    pub fn primary(&self) -> Option<TouchPoint> {
        self.points.first().copied()
    }

    pub fn has_contact(&self) -> bool {
        !self.points.is_empty()
    }
}

pub fn status_is_ready(status: u8) -> bool {
    status & STATUS_BUFFER_READY != 0
}

/// Number of valid point records announced by `status`, or `None` when the
/// buffer is not ready or the count is outside `1..=MAX_TOUCH_POINTS`.
pub fn valid_point_count(status: u8) -> Option<usize> {
    if !status_is_ready(status) {
        return None;
    }
    let count = (status & STATUS_POINT_COUNT_MASK) as usize;
    (1..=MAX_TOUCH_POINTS).contains(&count).then_some(count)
}

/// Decodes one poll cycle. `point_bytes` is the point table read from
/// 0x814F and is ignored unless `status` announces a valid count. A table
/// shorter than the announced records yields an empty frame.
pub fn decode(status: u8, point_bytes: &[u8]) -> TouchFrame {
    let mut frame = TouchFrame::empty(status);
    let Some(count) = valid_point_count(status) else {
        return frame;
    };
    if point_bytes.len() < count * POINT_RECORD_LEN {
        return frame;
    }

    for record in point_bytes.chunks_exact(POINT_RECORD_LEN).take(count) {
        let _ = frame.points.push(TouchPoint::from_record(record));
    }
    frame
}

pub fn needs_acknowledgment(frame: &TouchFrame) -> bool {
    frame.is_ready()
}

/// Bytes written to the status register to clear the buffer-ready flag.
pub fn acknowledgment_payload() -> [u8; 1] {
    ACKNOWLEDGMENT_PAYLOAD
}

/// GT911 register addresses go on the wire big-endian.
pub fn register_address(reg: u16) -> [u8; 2] {
    reg.to_be_bytes()
}
