//! Record framing: `begin_update`, `write`, `end_update`.
//!
//! Each record occupies one slot of the record queue and a contiguous (modulo
//! wraparound) span of the ring. The slot holds the cumulative byte length with
//! [`RECORD_PARTIAL`] set until `end_update` publishes it.
//!
//! `write_cursor == read_cursor` means the ring is empty, so the producer never
//! lets `write_cursor` catch up with `read_cursor`: a chunk that would consume
//! all known free space triggers a flush first, and if that does not help the
//! chunk is cut to leave `partial_write_threshold` bytes free.

use crate::channel::{Channel, RecordHandle};
use crate::error::SubmitError;
use crate::layout::{HEADER_BYTES, MAX_RECORD_BYTES, RECORD_PARTIAL, RECORD_QUEUE_LEN};
use crate::notifier::Notifier;

impl Channel {
    /// Open a new record.
    ///
    /// Returns `false` without touching shared memory if the channel is not
    /// enabled or the record queue is still full after one flush.
    pub fn begin_update<N: Notifier + ?Sized>(&mut self, notifier: &mut N) -> bool {
        if !self.is_enabled() {
            return false;
        }
        assert!(
            self.active_record.is_none(),
            "begin_update called while a record is already open"
        );
        debug_assert!(!self.overflowed);

        let tail = self.region.queue_tail() as usize % RECORD_QUEUE_LEN;
        let next = (tail + 1) % RECORD_QUEUE_LEN;

        if self.record_queue_full(next) {
            self.flush(notifier);
            if self.record_queue_full(next) {
                tracing::debug!(
                    base_offset = self.base_offset(),
                    "record queue still full after flush (head {}, tail {tail})",
                    self.region.queue_head()
                );
                return false;
            }
        }

        self.region.set_record_len(tail, RECORD_PARTIAL);
        self.region.set_queue_tail(next as u32);
        self.active_record = Some(RecordHandle { slot: tail });
        true
    }

    /// Append `bytes` to the open record.
    ///
    /// Returns `false` once the ring runs out of space for this record; every
    /// later write to the same record fails too. Bytes copied before the
    /// failure stay in the ring.
    pub fn write<N: Notifier + ?Sized>(&mut self, notifier: &mut N, bytes: &[u8]) -> bool {
        let record = match self.active_record {
            Some(record) => record,
            None => panic!("write called without an open record"),
        };
        if self.overflowed {
            return false;
        }
        if bytes.is_empty() {
            return true;
        }

        let recorded = self.region.record_len(record.slot) & !RECORD_PARTIAL;
        if bytes.len() as u64 + recorded as u64 > MAX_RECORD_BYTES as u64 {
            tracing::warn!(
                base_offset = self.base_offset(),
                "record would exceed {MAX_RECORD_BYTES} bytes ({recorded} + {})",
                bytes.len()
            );
            self.overflowed = true;
            return false;
        }

        let capacity = self.ring_capacity();
        let threshold = self.config.partial_write_threshold;

        let Some(mut available) = self.available() else {
            self.overflowed = true;
            return false;
        };

        let mut remaining = bytes;
        while !remaining.is_empty() {
            // Bounded by MAX_RECORD_BYTES above.
            let mut chunk = remaining.len() as u32;

            if chunk >= available {
                tracing::debug!(
                    base_offset = self.base_offset(),
                    "{chunk} bytes pending, {available} available; flushing"
                );
                self.flush(notifier);

                let Some(after_flush) = self.available() else {
                    self.overflowed = true;
                    return false;
                };
                available = after_flush;

                if chunk >= available {
                    if available <= threshold {
                        tracing::warn!(
                            base_offset = self.base_offset(),
                            "ring overflow: {} bytes left unwritten, {available} available",
                            remaining.len()
                        );
                        self.overflowed = true;
                        return false;
                    }
                    tracing::debug!(
                        base_offset = self.base_offset(),
                        "only {available} bytes available after flush; writing partially"
                    );
                    chunk = available - threshold;
                }
            }

            let (now, later) = remaining.split_at(chunk as usize);
            let write_cursor = self.region.write_cursor();
            self.place_data_at(now, write_cursor);

            self.region.set_write_cursor((write_cursor + chunk) % capacity);
            let length = (self.region.record_len(record.slot) & !RECORD_PARTIAL) + chunk;
            self.region.set_record_len(record.slot, length | RECORD_PARTIAL);

            available -= chunk;
            remaining = later;
        }

        true
    }

    /// Close the open record and publish it to the consumer.
    pub fn end_update(&mut self) {
        let record = match self.active_record.take() {
            Some(record) => record,
            None => panic!("end_update called without an open record"),
        };

        let length = self.region.record_len(record.slot);
        debug_assert!(
            length & RECORD_PARTIAL != 0,
            "open record lost its in-progress flag"
        );
        self.region.set_record_len(record.slot, length & !RECORD_PARTIAL);
        self.overflowed = false;
    }

    /// Bytes written so far to the open record.
    pub fn active_record_len(&self) -> Option<u32> {
        self.active_record
            .map(|record| self.region.record_len(record.slot) & !RECORD_PARTIAL)
    }

    /// Write one complete record made of `parts`.
    ///
    /// An overflowing record is still closed so its queue slot is released; the
    /// consumer sees the truncated bytes.
    pub fn submit<N: Notifier + ?Sized>(
        &mut self,
        notifier: &mut N,
        parts: &[&[u8]],
    ) -> Result<(), SubmitError> {
        if !self.is_enabled() {
            return Err(SubmitError::NotEnabled);
        }
        self.flush_error = None;

        if !self.begin_update(notifier) {
            return Err(self
                .flush_error
                .take()
                .map_or(SubmitError::Backpressure, SubmitError::Notify));
        }

        for part in parts {
            if !self.write(notifier, part) {
                let written = self.active_record_len().unwrap_or(0);
                self.end_update();
                return Err(self
                    .flush_error
                    .take()
                    .map_or(SubmitError::Overflow { written }, SubmitError::Notify));
            }
        }

        self.end_update();
        Ok(())
    }

    /// Ask the consumer to drain. Failures are logged and kept for [`Channel::take_flush_error`].
    fn flush<N: Notifier + ?Sized>(&mut self, notifier: &mut N) {
        if let Err(err) = notifier.notify_flush(self.base_offset()) {
            tracing::warn!(base_offset = self.base_offset(), "flush request failed: {err}");
            self.flush_error = Some(err);
        }
    }

    /// Free ring bytes as currently known, or `None` if the consumer-owned
    /// read cursor is out of range.
    fn available(&self) -> Option<u32> {
        let capacity = self.ring_capacity();
        let read = self.region.read_cursor();
        let write = self.region.write_cursor();
        if read >= capacity || write >= capacity {
            tracing::warn!(
                base_offset = self.base_offset(),
                "ring cursors out of range (read {read}, write {write}, capacity {capacity})"
            );
            return None;
        }
        Some(if read > write {
            read - write
        } else {
            capacity - write + read
        })
    }

    fn record_queue_full(&self, next_tail: usize) -> bool {
        let head = self.region.queue_head() as usize;
        if head >= RECORD_QUEUE_LEN {
            tracing::warn!(
                base_offset = self.base_offset(),
                "record queue head {head} out of range"
            );
            return true;
        }
        next_tail == head
    }

    /// Copy `src` into the ring at `offset`, splitting at the end of the ring.
    fn place_data_at(&self, src: &[u8], offset: u32) {
        let capacity = self.ring_capacity() as usize;
        let offset = offset as usize;
        assert!(
            offset < capacity && src.len() < capacity,
            "chunk of {} bytes at {offset} does not fit a {capacity} byte ring",
            src.len()
        );

        let till_boundary = capacity - offset;
        let (tail_end, wrapped) = src.split_at(src.len().min(till_boundary));
        self.region.write_bytes(HEADER_BYTES + offset, tail_end);
        if !wrapped.is_empty() {
            self.region.write_bytes(HEADER_BYTES, wrapped);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::channel::ChannelConfig;
    use crate::layout::ChannelLayout;
    use crate::notifier::{EnableRequest, NotifyError, SupportedOps};
    use crate::region::SharedRegion;

    /// Consumer that never drains anything.
    #[derive(Default)]
    struct StuckHost {
        flushes: usize,
    }

    impl Notifier for StuckHost {
        fn notify_enable(&mut self, _: &EnableRequest) -> Result<SupportedOps, NotifyError> {
            Ok(SupportedOps::NONE)
        }

        fn notify_disable(&mut self, _: &EnableRequest) -> Result<(), NotifyError> {
            Ok(())
        }

        fn notify_flush(&mut self, _: u32) -> Result<(), NotifyError> {
            self.flushes += 1;
            Ok(())
        }
    }

    fn enabled_channel(capacity: usize, threshold: u32) -> (Channel, StuckHost) {
        let layout = ChannelLayout::new(0, HEADER_BYTES + capacity).unwrap();
        let region = Arc::new(SharedRegion::new(layout.region_bytes()));
        let mut channel = Channel::new(
            region,
            layout,
            ChannelConfig {
                partial_write_threshold: threshold,
            },
        )
        .unwrap();
        let mut host = StuckHost::default();
        channel.enable(&mut host, Some(0)).unwrap();
        (channel, host)
    }

    #[test]
    fn available_treats_equal_cursors_as_empty() {
        let (channel, _) = enabled_channel(128, 16);
        assert_eq!(channel.available(), Some(128));

        channel.region.set_write_cursor(100);
        channel.region.set_read_cursor(20);
        assert_eq!(channel.available(), Some(48));

        channel.region.set_write_cursor(20);
        channel.region.set_read_cursor(100);
        assert_eq!(channel.available(), Some(80));
    }

    #[test]
    fn out_of_range_read_cursor_is_reported() {
        let (channel, _) = enabled_channel(128, 16);
        channel.region.set_read_cursor(128);
        assert_eq!(channel.available(), None);
    }

    #[test]
    fn place_data_splits_at_the_ring_end() {
        let (channel, _) = enabled_channel(16, 4);
        channel.place_data_at(b"abcdef", 13);

        let mut ring = [0u8; 16];
        channel.region.read_bytes(HEADER_BYTES, &mut ring);
        assert_eq!(&ring[13..], b"abc");
        assert_eq!(&ring[..3], b"def");
        assert_eq!(&ring[3..13], &[0u8; 10]);
    }

    #[test]
    fn large_write_is_cut_to_leave_the_threshold_free() {
        let (mut channel, mut host) = enabled_channel(128, 16);
        assert!(channel.begin_update(&mut host));

        // The first chunk leaves exactly `threshold` bytes; the next attempt
        // finds no progress after flushing and overflows.
        assert!(!channel.write(&mut host, &[0xAB; 200]));
        assert!(channel.is_overflowed());
        assert_eq!(channel.write_cursor(), 112);
        assert_eq!(channel.active_record_len(), Some(112));
        assert_eq!(host.flushes, 2);

        // Sticky for the rest of the record.
        assert!(!channel.write(&mut host, &[1]));
        assert_eq!(host.flushes, 2);

        channel.end_update();
        assert!(!channel.is_overflowed());
        assert_eq!(channel.region.record_len(0), 112);
    }

    #[test]
    fn chunk_equal_to_free_space_flushes_first() {
        let (mut channel, mut host) = enabled_channel(64, 8);
        assert!(channel.begin_update(&mut host));
        assert!(channel.write(&mut host, &[7; 63]));
        assert_eq!(host.flushes, 0);

        // One byte left; writing it would make the ring look empty.
        assert!(!channel.write(&mut host, &[7]));
        assert_eq!(host.flushes, 1);
        assert_eq!(channel.write_cursor(), 63);
    }
}
