#![cfg_attr(not(test), no_std)]

pub mod gesture;
pub mod gt911;
pub mod protocol;
pub mod report;

pub use gesture::{GestureClassifier, GesturePhase, GestureState, PointerUpdate};
pub use gt911::{Gt911, Gt911Error, GtInfo};
pub use protocol::{TouchFrame, TouchPoint, MAX_TOUCH_POINTS, POINT_TABLE_LEN};
pub use report::{forward_update, MouseReport, PointerSink};
