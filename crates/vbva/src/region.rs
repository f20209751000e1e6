//! The volatile memory region shared by producer and consumer.
//!
//! The region is a flat byte image of the layout described in [`crate::layout`].
//! It is backed by an array of `AtomicU32` so that it is 4-byte aligned and can
//! be mutated through a shared reference from both sides; in a real driver the
//! same image lives in device memory.
//!
//! Header words are accessed atomically. Ring data bytes are copied with plain
//! memory copies: the producer only writes bytes the consumer has not been told
//! about yet (past `write_cursor`), and the consumer only reads bytes the
//! producer has already published (before `write_cursor`), so the two sides
//! never touch the same data byte at the same time.

use core::sync::atomic::{AtomicU32, Ordering};

use crate::layout::{header, HEADER_BYTES, RECORD_QUEUE_LEN};

pub struct SharedRegion {
    words: Box<[AtomicU32]>,
    len: usize,
}

impl SharedRegion {
    /// Allocate a zeroed region of `len` bytes.
    pub fn new(len: usize) -> Self {
        assert!(len > HEADER_BYTES, "region must be larger than the channel header");
        let words = (0..len.div_ceil(4)).map(|_| AtomicU32::new(0)).collect();
        Self { words, len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn word(&self, offset: usize) -> &AtomicU32 {
        assert!(
            offset % 4 == 0 && offset + 4 <= self.len,
            "header word access at {offset:#x} outside region of {} bytes",
            self.len
        );
        &self.words[offset / 4]
    }

    pub fn load_u32(&self, offset: usize) -> u32 {
        u32::from_le(self.word(offset).load(Ordering::Acquire))
    }

    pub fn store_u32(&self, offset: usize, value: u32) {
        self.word(offset).store(value.to_le(), Ordering::Release);
    }

    fn base_ptr(&self) -> *mut u8 {
        // `AtomicU32` is an `UnsafeCell`, so writes through a pointer derived
        // from a shared reference are allowed.
        self.words.as_ptr().cast::<u8>().cast_mut()
    }

    fn check_span(&self, offset: usize, len: usize) {
        assert!(
            offset <= self.len && len <= self.len - offset,
            "byte access {offset:#x}+{len} outside region of {} bytes",
            self.len
        );
    }

    /// Copy `src` into the region at `offset`. Panics if the span leaves the region.
    pub fn write_bytes(&self, offset: usize, src: &[u8]) {
        self.check_span(offset, src.len());
        unsafe {
            core::ptr::copy_nonoverlapping(src.as_ptr(), self.base_ptr().add(offset), src.len());
        }
    }

    /// Copy bytes at `offset` out of the region into `dst`. Panics if the span leaves the region.
    pub fn read_bytes(&self, offset: usize, dst: &mut [u8]) {
        self.check_span(offset, dst.len());
        unsafe {
            core::ptr::copy_nonoverlapping(self.base_ptr().add(offset), dst.as_mut_ptr(), dst.len());
        }
    }

    /// Copy of the whole region, header included.
    ///
    /// Only meaningful while neither side is writing.
    pub fn snapshot(&self) -> Vec<u8> {
        let mut out = vec![0u8; self.len];
        self.read_bytes(0, &mut out);
        out
    }

    pub fn host_events(&self) -> u32 {
        self.load_u32(header::HOST_EVENTS)
    }

    pub fn set_host_events(&self, value: u32) {
        self.store_u32(header::HOST_EVENTS, value);
    }

    pub fn supported_ops(&self) -> u32 {
        self.load_u32(header::SUPPORTED_OPS)
    }

    pub fn set_supported_ops(&self, value: u32) {
        self.store_u32(header::SUPPORTED_OPS, value);
    }

    pub fn write_cursor(&self) -> u32 {
        self.load_u32(header::WRITE_CURSOR)
    }

    pub fn set_write_cursor(&self, value: u32) {
        self.store_u32(header::WRITE_CURSOR, value);
    }

    pub fn read_cursor(&self) -> u32 {
        self.load_u32(header::READ_CURSOR)
    }

    pub fn set_read_cursor(&self, value: u32) {
        self.store_u32(header::READ_CURSOR, value);
    }

    pub fn record_len(&self, index: usize) -> u32 {
        self.load_u32(header::record(index))
    }

    pub fn set_record_len(&self, index: usize, value: u32) {
        self.store_u32(header::record(index), value);
    }

    pub fn queue_head(&self) -> u32 {
        self.load_u32(header::QUEUE_HEAD)
    }

    pub fn set_queue_head(&self, value: u32) {
        self.store_u32(header::QUEUE_HEAD, value);
    }

    pub fn queue_tail(&self) -> u32 {
        self.load_u32(header::QUEUE_TAIL)
    }

    pub fn set_queue_tail(&self, value: u32) {
        self.store_u32(header::QUEUE_TAIL, value);
    }

    pub fn partial_write_threshold(&self) -> u32 {
        self.load_u32(header::PARTIAL_WRITE_THRESHOLD)
    }

    pub fn set_partial_write_threshold(&self, value: u32) {
        self.store_u32(header::PARTIAL_WRITE_THRESHOLD, value);
    }

    pub fn ring_capacity(&self) -> u32 {
        self.load_u32(header::RING_CAPACITY)
    }

    pub fn set_ring_capacity(&self, value: u32) {
        self.store_u32(header::RING_CAPACITY, value);
    }

    /// Zero the cursors and the record queue.
    pub(crate) fn reset_queue(&self) {
        self.set_write_cursor(0);
        self.set_read_cursor(0);
        for index in 0..RECORD_QUEUE_LEN {
            self.set_record_len(index, 0);
        }
        self.set_queue_head(0);
        self.set_queue_tail(0);
    }
}

impl core::fmt::Debug for SharedRegion {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SharedRegion")
            .field("len", &self.len)
            .field("host_events", &self.host_events())
            .field("write_cursor", &self.write_cursor())
            .field("read_cursor", &self.read_cursor())
            .field("queue_head", &self.queue_head())
            .field("queue_tail", &self.queue_tail())
            .finish_non_exhaustive()
    }
}
