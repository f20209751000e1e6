//! Screen update command carried in a record.
//!
//! The common use of a channel is telling the consumer which part of the
//! framebuffer changed. Such a record holds a single 8-byte header:
//!
//! ```text
//! i16 x, i16 y, u16 w, u16 h   (little-endian)
//! ```

use crate::channel::Channel;
use crate::notifier::Notifier;

pub const DIRTY_RECT_BYTES: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirtyRect {
    pub x: i16,
    pub y: i16,
    pub w: u16,
    pub h: u16,
}

impl DirtyRect {
    /// Build a rect from inclusive-exclusive corners, as display servers report them.
    ///
    /// Coordinates are truncated to the 16-bit wire fields.
    pub fn from_corners(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self {
            x: x1 as i16,
            y: y1 as i16,
            w: x2.wrapping_sub(x1) as u16,
            h: y2.wrapping_sub(y1) as u16,
        }
    }

    pub fn to_le_bytes(self) -> [u8; DIRTY_RECT_BYTES] {
        let mut out = [0u8; DIRTY_RECT_BYTES];
        out[0..2].copy_from_slice(&self.x.to_le_bytes());
        out[2..4].copy_from_slice(&self.y.to_le_bytes());
        out[4..6].copy_from_slice(&self.w.to_le_bytes());
        out[6..8].copy_from_slice(&self.h.to_le_bytes());
        out
    }

    pub fn from_le_bytes(bytes: [u8; DIRTY_RECT_BYTES]) -> Self {
        Self {
            x: i16::from_le_bytes([bytes[0], bytes[1]]),
            y: i16::from_le_bytes([bytes[2], bytes[3]]),
            w: u16::from_le_bytes([bytes[4], bytes[5]]),
            h: u16::from_le_bytes([bytes[6], bytes[7]]),
        }
    }
}

impl Channel {
    /// Send one dirty rectangle as its own record.
    ///
    /// Quietly returns `false` when the channel is not enabled or the record
    /// could not be written completely.
    pub fn report_dirty_rect<N: Notifier + ?Sized>(
        &mut self,
        notifier: &mut N,
        rect: DirtyRect,
    ) -> bool {
        if !self.is_enabled() || !self.begin_update(notifier) {
            return false;
        }
        let written = self.write(notifier, &rect.to_le_bytes());
        self.end_update();
        written
    }
}
