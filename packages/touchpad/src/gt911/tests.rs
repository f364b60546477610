use core::cell::RefCell;
use core::convert::Infallible;
use std::collections::BTreeMap;
use std::vec::Vec;

use embedded_hal::digital;
use embedded_hal::i2c::{ErrorKind, ErrorType, Operation};

use super::*;
use crate::protocol::STATUS_BUFFER_READY;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Transfer {
    address: u8,
    written: Vec<u8>,
    read_len: usize,
}

/// Register-file model of the controller: the first two written bytes set
/// the pointer, further writes store, reads stream from the pointer.
#[derive(Default)]
struct FakeBus {
    registers: BTreeMap<u16, u8>,
    transfers: Vec<Transfer>,
    failing_writes: usize,
    failing_reads_at: Option<u16>,
}

impl FakeBus {
    fn with_status(status: u8) -> Self {
        let mut bus = Self::default();
        bus.registers.insert(REG_STATUS, status);
        bus
    }

    fn load(&mut self, reg: u16, bytes: &[u8]) {
        for (offset, byte) in bytes.iter().enumerate() {
            self.registers.insert(reg + offset as u16, *byte);
        }
    }

    fn register(&self, reg: u16) -> u8 {
        self.registers.get(&reg).copied().unwrap_or(0)
    }

    fn writes(&self) -> Vec<&Transfer> {
        self.transfers.iter().filter(|t| t.read_len == 0).collect()
    }
}

impl ErrorType for FakeBus {
    type Error = ErrorKind;
}

impl I2c for FakeBus {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        let mut written = Vec::new();
        let mut read_len = 0;
        for op in operations.iter() {
            match op {
                Operation::Write(bytes) => written.extend_from_slice(bytes),
                Operation::Read(buf) => read_len += buf.len(),
            }
        }
        let pointer = u16::from_be_bytes([written[0], written[1]]);

        if read_len == 0 && self.failing_writes > 0 {
            self.failing_writes -= 1;
            return Err(ErrorKind::Other);
        }
        if read_len > 0 && self.failing_reads_at == Some(pointer) {
            return Err(ErrorKind::Other);
        }

        for (offset, byte) in written[2..].iter().enumerate() {
            self.registers.insert(pointer + offset as u16, *byte);
        }
        let mut cursor = pointer;
        for op in operations.iter_mut() {
            if let Operation::Read(buf) = op {
                for slot in buf.iter_mut() {
                    *slot = self.register(cursor);
                    cursor += 1;
                }
            }
        }

        self.transfers.push(Transfer {
            address,
            written,
            read_len,
        });
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    High(&'static str),
    Low(&'static str),
    WaitUs(u32),
}

struct FakePin<'a> {
    name: &'static str,
    log: &'a RefCell<Vec<Step>>,
}

impl digital::ErrorType for FakePin<'_> {
    type Error = Infallible;
}

impl OutputPin for FakePin<'_> {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.log.borrow_mut().push(Step::Low(self.name));
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.log.borrow_mut().push(Step::High(self.name));
        Ok(())
    }
}

struct BrokenPin;

impl digital::ErrorType for BrokenPin {
    type Error = digital::ErrorKind;
}

impl OutputPin for BrokenPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Err(digital::ErrorKind::Other)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Err(digital::ErrorKind::Other)
    }
}

struct FakeDelay<'a> {
    log: &'a RefCell<Vec<Step>>,
}

impl DelayNs for FakeDelay<'_> {
    fn delay_ns(&mut self, ns: u32) {
        self.log.borrow_mut().push(Step::WaitUs(ns / 1_000));
    }

    fn delay_us(&mut self, us: u32) {
        self.log.borrow_mut().push(Step::WaitUs(us));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.log.borrow_mut().push(Step::WaitUs(ms * 1_000));
    }
}

fn run_reset(address: u8) -> Vec<Step> {
    let log = RefCell::new(Vec::new());
    let mut int = FakePin { name: "int", log: &log };
    let mut rst = FakePin { name: "rst", log: &log };
    let mut delay = FakeDelay { log: &log };

    let mut touch = Gt911::new(FakeBus::default(), address).unwrap();
    touch.reset(&mut int, &mut rst, &mut delay).unwrap();
    log.into_inner()
}

fn settle_time_before_release(steps: &[Step]) -> u32 {
    let release = steps
        .iter()
        .position(|s| *s == Step::High("rst"))
        .unwrap();
    steps[..release]
        .iter()
        .rev()
        .take_while(|s| matches!(s, Step::WaitUs(_)))
        .map(|s| match s {
            Step::WaitUs(us) => *us,
            _ => 0,
        })
        .sum()
}

#[test]
fn only_the_two_strap_addresses_are_accepted() {
    assert!(Gt911::new(FakeBus::default(), GT911_ADDR_PRIMARY).is_ok());
    assert!(Gt911::new(FakeBus::default(), GT911_ADDR_SECONDARY).is_ok());
    assert!(matches!(
        Gt911::new(FakeBus::default(), 0x15),
        Err(Gt911Error::UnsupportedAddress(0x15))
    ));
}

#[test]
fn reset_for_secondary_address_raises_int_before_releasing_rst() {
    let steps = run_reset(GT911_ADDR_SECONDARY);

    let int_high = steps.iter().position(|s| *s == Step::High("int")).unwrap();
    let rst_high = steps.iter().position(|s| *s == Step::High("rst")).unwrap();
    assert!(int_high < rst_high);
    assert!(settle_time_before_release(&steps) > 100);
    assert_eq!(steps.last(), Some(&Step::WaitUs(6_000)));
}

#[test]
fn reset_for_primary_address_keeps_int_low() {
    let steps = run_reset(GT911_ADDR_PRIMARY);

    assert!(!steps.contains(&Step::High("int")));
    assert!(steps.contains(&Step::Low("int")));
    assert_eq!(&steps[..2], &[Step::Low("rst"), Step::Low("int")]);
    assert!(settle_time_before_release(&steps) > 100);
    assert_eq!(steps.last(), Some(&Step::WaitUs(6_000)));
}

#[test]
fn reset_reports_pin_failures() {
    let log = RefCell::new(Vec::new());
    let mut int = FakePin { name: "int", log: &log };
    let mut delay = FakeDelay { log: &log };
    let mut touch = Gt911::new(FakeBus::default(), GT911_ADDR_SECONDARY).unwrap();

    let err = touch
        .reset(&mut int, &mut BrokenPin, &mut delay)
        .unwrap_err();
    assert_eq!(err, Gt911Error::Pin);
}

#[test]
fn not_ready_frame_is_not_acknowledged() {
    let mut touch = Gt911::new(FakeBus::with_status(0x03), GT911_ADDR_SECONDARY).unwrap();

    let frame = touch.read_frame().unwrap();
    assert!(frame.points.is_empty());

    let bus = touch.release();
    assert_eq!(bus.transfers.len(), 1);
    assert_eq!(bus.transfers[0].written, vec![0x81, 0x4E]);
    assert_eq!(bus.transfers[0].read_len, 1);
    assert!(bus.writes().is_empty());
}

#[test]
fn ready_frame_reads_the_table_and_acknowledges() {
    let mut bus = FakeBus::with_status(STATUS_BUFFER_READY | 2);
    bus.load(
        REG_POINT_TABLE,
        &[
            0x01, 0x10, 0x02, 0x20, 0x01, 0x08, 0x00, 0x00, //
            0x02, 0xFF, 0x03, 0x57, 0x02, 0x09, 0x00, 0x00,
        ],
    );
    let mut touch = Gt911::new(bus, GT911_ADDR_SECONDARY).unwrap();

    let frame = touch.read_frame().unwrap();
    assert_eq!(frame.points.len(), 2);
    assert_eq!((frame.points[0].x, frame.points[0].y), (0x0210, 0x0120));
    assert_eq!((frame.points[1].x, frame.points[1].y), (1023, 599));

    let bus = touch.release();
    assert_eq!(bus.transfers[1].written, vec![0x81, 0x4F]);
    assert_eq!(bus.transfers[1].read_len, POINT_TABLE_LEN);
    let writes = bus.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].written, vec![0x81, 0x4E, 0x00]);
    assert_eq!(writes[0].address, GT911_ADDR_SECONDARY);
    assert_eq!(bus.register(REG_STATUS), 0);
}

#[test]
fn invalid_count_skips_the_table_but_still_acknowledges() {
    let mut touch = Gt911::new(
        FakeBus::with_status(STATUS_BUFFER_READY | 7),
        GT911_ADDR_PRIMARY,
    )
    .unwrap();

    let frame = touch.read_frame().unwrap();
    assert!(frame.points.is_empty());
    assert!(frame.is_ready());

    let bus = touch.release();
    assert_eq!(bus.transfers.len(), 2);
    assert_eq!(bus.transfers[1].written, vec![0x81, 0x4E, 0x00]);
}

#[test]
fn failed_acknowledgment_is_retried_once() {
    let mut bus = FakeBus::with_status(STATUS_BUFFER_READY);
    bus.failing_writes = 1;
    let mut touch = Gt911::new(bus, GT911_ADDR_SECONDARY).unwrap();

    assert!(touch.read_frame().is_ok());
    let bus = touch.release();
    assert_eq!(bus.writes().len(), 1);
    assert_eq!(bus.register(REG_STATUS), 0);
}

#[test]
fn acknowledgment_failing_twice_is_reported() {
    let mut bus = FakeBus::with_status(STATUS_BUFFER_READY | 1);
    bus.failing_writes = 2;
    let mut touch = Gt911::new(bus, GT911_ADDR_SECONDARY).unwrap();

    assert_eq!(
        touch.read_frame().unwrap_err(),
        Gt911Error::I2c(ErrorKind::Other)
    );
}

#[test]
fn failed_table_read_leaves_the_buffer_unacknowledged() {
    let mut bus = FakeBus::with_status(STATUS_BUFFER_READY | 1);
    bus.failing_reads_at = Some(REG_POINT_TABLE);
    let mut touch = Gt911::new(bus, GT911_ADDR_SECONDARY).unwrap();

    assert!(touch.read_frame().is_err());
    let bus = touch.release();
    assert!(bus.writes().is_empty());
    assert_eq!(bus.register(REG_STATUS), STATUS_BUFFER_READY | 1);
}

#[test]
fn config_upload_appends_checksum_and_fresh_flag() {
    let mut touch = Gt911::new(FakeBus::default(), GT911_ADDR_SECONDARY).unwrap();
    touch.upload_config(&DEFAULT_CONFIG).unwrap();

    let bus = touch.release();
    assert_eq!(bus.transfers.len(), 1);
    let written = &bus.transfers[0].written;
    assert_eq!(written.len(), 2 + CONFIG_BODY_LEN + 2);
    assert_eq!(&written[..2], &[0x80, 0x47]);
    assert_eq!(&written[2..2 + CONFIG_BODY_LEN], &DEFAULT_CONFIG[..]);
    assert_eq!(&written[2 + CONFIG_BODY_LEN..], &[0x49, CONFIG_FRESH]);
    // Checksum lands at 0x80FF, fresh flag at 0x8100.
    assert_eq!(bus.register(0x80FF), 0x49);
    assert_eq!(bus.register(0x8100), CONFIG_FRESH);
}

#[test]
fn config_upload_rejects_wrong_length() {
    let mut touch = Gt911::new(FakeBus::default(), GT911_ADDR_SECONDARY).unwrap();

    let err = touch.upload_config(&DEFAULT_CONFIG[..100]).unwrap_err();
    assert_eq!(err, Gt911Error::ConfigLength(100));
    assert!(touch.release().transfers.is_empty());
}

#[test]
fn coordinate_mode_writes_the_command_register() {
    let mut touch = Gt911::new(FakeBus::default(), GT911_ADDR_PRIMARY).unwrap();
    touch.enter_coordinate_mode().unwrap();

    let bus = touch.release();
    assert_eq!(bus.transfers[0].address, GT911_ADDR_PRIMARY);
    assert_eq!(bus.transfers[0].written, vec![0x80, 0x40, 0x00]);
}

#[test]
fn coordinate_mode_failure_surfaces_as_driver_error() {
    let mut bus = FakeBus::default();
    bus.failing_writes = 1;
    let mut touch = Gt911::new(bus, GT911_ADDR_PRIMARY).unwrap();

    assert_eq!(
        touch.enter_coordinate_mode().unwrap_err(),
        Gt911Error::I2c(ErrorKind::Other)
    );
}

#[test]
fn product_info_is_decoded_little_endian() {
    let mut bus = FakeBus::default();
    bus.load(
        REG_PRODUCT_INFO,
        &[b'9', b'1', b'1', 0x00, 0x60, 0x10, 0x00, 0x04, 0x58, 0x02, 0x0A],
    );
    let mut touch = Gt911::new(bus, GT911_ADDR_SECONDARY).unwrap();

    let info = touch.read_info().unwrap();
    assert_eq!(info.product_id_str(), Some("911"));
    assert_eq!(info.firmware_version, 0x1060);
    assert_eq!((info.x_resolution, info.y_resolution), (1024, 600));
    assert_eq!(info.vendor_id, 0x0A);
}

#[test]
fn errors_render_for_logs() {
    let err: Gt911Error<ErrorKind> = Gt911Error::UnsupportedAddress(0x15);
    assert_eq!(err.to_string(), "unsupported gt911 address 0x15");
    let err: Gt911Error<ErrorKind> = Gt911Error::ConfigLength(3);
    assert_eq!(err.to_string(), "config body is 3 bytes, expected 184");
}
