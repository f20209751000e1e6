//! Shared memory layout contract for a command channel.
//!
//! A channel region lives inside device memory (VRAM) and is shared by the
//! producer (the driver) and the consumer (the device/host side). It starts
//! with a fixed header followed by the ring data area:
//!
//! ```text
//! 0x000 host_events           (HostEvents bits, bit 0 = MODE_ENABLED)
//! 0x004 supported_ops         (capability bitmap, filled at enable time)
//! 0x008 write_cursor          (producer-owned byte offset into data)
//! 0x00C read_cursor           (consumer-owned byte offset into data)
//! 0x010 record_queue[64]      (u32 length per record, high bit = in progress)
//! 0x110 queue_head            (consumer-owned)
//! 0x114 queue_tail            (producer-owned)
//! 0x118 partial_write_threshold
//! 0x11C ring_capacity
//! 0x120 data[ring_capacity]
//! ```
//!
//! All header words are little-endian `u32`. Any change to this table is an ABI
//! break between producer and consumer.

use bitflags::bitflags;

use crate::error::LayoutError;

/// Number of slots in the record queue.
///
/// Must stay a power of two; the consumer indexes the queue modulo this value.
pub const RECORD_QUEUE_LEN: usize = 64;

/// In-progress marker stored in the high bit of a record length.
pub const RECORD_PARTIAL: u32 = 0x8000_0000;

/// Largest cumulative length a single record may reach.
pub const MAX_RECORD_BYTES: u32 = 128 * 1024 * 1024;

/// Free space kept in reserve when a large record has to be split.
pub const DEFAULT_PARTIAL_WRITE_THRESHOLD: u32 = 256;

/// Default size of a per-screen channel region, header included.
pub const MIN_BUFFER_BYTES: u32 = 64 * 1024;

bitflags! {
    /// Bits of the `host_events` header word.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct HostEvents: u32 {
        /// The channel has been accepted by the consumer and may carry records.
        const MODE_ENABLED = 1 << 0;
    }
}

/// Byte offsets of the header fields from the start of the region.
pub mod header {
    use super::RECORD_QUEUE_LEN;

    pub const HOST_EVENTS: usize = 0x00;
    pub const SUPPORTED_OPS: usize = 0x04;
    pub const WRITE_CURSOR: usize = 0x08;
    pub const READ_CURSOR: usize = 0x0C;
    pub const RECORD_QUEUE: usize = 0x10;
    pub const QUEUE_HEAD: usize = RECORD_QUEUE + RECORD_QUEUE_LEN * 4;
    pub const QUEUE_TAIL: usize = QUEUE_HEAD + 4;
    pub const PARTIAL_WRITE_THRESHOLD: usize = QUEUE_TAIL + 4;
    pub const RING_CAPACITY: usize = PARTIAL_WRITE_THRESHOLD + 4;

    /// Offset of the first ring data byte.
    pub const DATA: usize = RING_CAPACITY + 4;

    /// Offset of the length word for record slot `index`.
    pub const fn record(index: usize) -> usize {
        RECORD_QUEUE + (index % RECORD_QUEUE_LEN) * 4
    }
}

/// Size of the fixed header in bytes.
pub const HEADER_BYTES: usize = header::DATA;

const _: () = {
    assert!(RECORD_QUEUE_LEN.is_power_of_two());
    assert!(header::QUEUE_HEAD == 0x110);
    assert!(header::DATA == 0x120);
    assert!(MAX_RECORD_BYTES < RECORD_PARTIAL);
};

/// Placement of one channel region inside device memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelLayout {
    base_offset: u32,
    region_bytes: u32,
}

impl ChannelLayout {
    /// Describe a region of `region_bytes` starting at `base_offset` in device memory.
    pub fn new(base_offset: u32, region_bytes: usize) -> Result<Self, LayoutError> {
        if base_offset % 4 != 0 {
            return Err(LayoutError::Misaligned { base_offset });
        }
        if region_bytes <= HEADER_BYTES {
            return Err(LayoutError::RegionTooSmall {
                region_bytes,
                min_bytes: HEADER_BYTES + 1,
            });
        }
        let region_bytes_u32 =
            u32::try_from(region_bytes).map_err(|_| LayoutError::TooLarge { region_bytes })?;
        if base_offset.checked_add(region_bytes_u32).is_none() {
            return Err(LayoutError::TooLarge { region_bytes });
        }
        Ok(Self {
            base_offset,
            region_bytes: region_bytes_u32,
        })
    }

    /// Offset of the region in device memory, as reported to the consumer.
    pub fn base_offset(&self) -> u32 {
        self.base_offset
    }

    pub fn region_bytes(&self) -> usize {
        self.region_bytes as usize
    }

    /// Bytes available to the ring data area.
    pub fn ring_capacity(&self) -> u32 {
        self.region_bytes - HEADER_BYTES as u32
    }
}

/// Result of carving per-screen channel regions off the end of device memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenLayout {
    /// Device memory left for framebuffers once the channel regions are reserved.
    pub usable_vram_bytes: u32,
    /// One region per screen, in screen order.
    pub channels: Vec<ChannelLayout>,
}

/// Reserve `screens` regions of `region_bytes` each at the top of device memory.
///
/// Screen `i` is placed at `usable_vram_bytes + i * region_bytes`.
pub fn layout_screens(
    vram_bytes: u32,
    screens: u32,
    region_bytes: u32,
) -> Result<ScreenLayout, LayoutError> {
    let reserved = screens
        .checked_mul(region_bytes)
        .filter(|&reserved| reserved <= vram_bytes)
        .ok_or(LayoutError::VramExhausted {
            vram_bytes,
            screens,
            region_bytes,
        })?;
    let usable_vram_bytes = vram_bytes - reserved;

    let channels = (0..screens)
        .map(|i| ChannelLayout::new(usable_vram_bytes + i * region_bytes, region_bytes as usize))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ScreenLayout {
        usable_vram_bytes,
        channels,
    })
}
