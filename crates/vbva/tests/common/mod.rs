//! Simulated consumer used by the integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use vbva::{
    Channel, ChannelConfig, ChannelLayout, EnableRequest, Notifier, NotifyError, SharedRegion,
    SupportedOps, HEADER_BYTES, RECORD_PARTIAL, RECORD_QUEUE_LEN,
};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Drains records the way the device side does: FIFO, lifting the bytes an
/// in-progress record has published so far without completing it.
pub struct Consumer {
    region: Arc<SharedRegion>,
    partial: Vec<u8>,
    pub records: Vec<Vec<u8>>,
}

impl Consumer {
    pub fn new(region: Arc<SharedRegion>) -> Self {
        Self {
            region,
            partial: Vec::new(),
            records: Vec::new(),
        }
    }

    /// Complete at most `max_records` records. Returns how many were completed.
    pub fn drain(&mut self, max_records: usize) -> usize {
        let mut completed = 0;
        while completed < max_records {
            let head = self.region.queue_head() as usize;
            let tail = self.region.queue_tail() as usize;
            if head == tail {
                break;
            }

            let raw = self.region.record_len(head);
            let len = (raw & !RECORD_PARTIAL) as usize;
            assert!(len >= self.partial.len(), "record length went backwards");
            self.lift(len - self.partial.len());

            if raw & RECORD_PARTIAL != 0 {
                break;
            }

            self.records.push(std::mem::take(&mut self.partial));
            self.region.set_queue_head(((head + 1) % RECORD_QUEUE_LEN) as u32);
            completed += 1;
        }
        completed
    }

    fn lift(&mut self, n: usize) {
        if n == 0 {
            return;
        }
        let capacity = self.region.ring_capacity() as usize;
        let read = self.region.read_cursor() as usize;
        let first = n.min(capacity - read);

        let mut buf = vec![0u8; n];
        self.region.read_bytes(HEADER_BYTES + read, &mut buf[..first]);
        self.region.read_bytes(HEADER_BYTES, &mut buf[first..]);
        self.partial.extend_from_slice(&buf);
        self.region.set_read_cursor(((read + n) % capacity) as u32);
    }

    pub fn pending_partial(&self) -> &[u8] {
        &self.partial
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrainPolicy {
    /// Flush requests are acknowledged but nothing is drained.
    Nothing,
    /// Each flush completes at most one record.
    One,
    /// Each flush drains everything published so far.
    All,
}

pub struct SimulatedHost {
    pub consumer: Consumer,
    pub policy: DrainPolicy,
    pub capabilities: SupportedOps,
    pub reject_enable: Option<NotifyError>,
    pub fail_disable: bool,
    pub fail_flush: bool,
    pub enables: Vec<EnableRequest>,
    pub disables: Vec<EnableRequest>,
    pub flushes: usize,
}

impl SimulatedHost {
    pub fn new(region: Arc<SharedRegion>) -> Self {
        Self {
            consumer: Consumer::new(region),
            policy: DrainPolicy::All,
            capabilities: SupportedOps(0b1011),
            reject_enable: None,
            fail_disable: false,
            fail_flush: false,
            enables: Vec::new(),
            disables: Vec::new(),
            flushes: 0,
        }
    }

    pub fn drain_all(&mut self) -> Vec<Vec<u8>> {
        self.consumer.drain(usize::MAX);
        std::mem::take(&mut self.consumer.records)
    }
}

impl Notifier for SimulatedHost {
    fn notify_enable(&mut self, request: &EnableRequest) -> Result<SupportedOps, NotifyError> {
        self.enables.push(*request);
        match &self.reject_enable {
            Some(err) => Err(err.clone()),
            None => Ok(self.capabilities),
        }
    }

    fn notify_disable(&mut self, request: &EnableRequest) -> Result<(), NotifyError> {
        self.disables.push(*request);
        if self.fail_disable {
            return Err(NotifyError::Transport("device gone".into()));
        }
        Ok(())
    }

    fn notify_flush(&mut self, _base_offset: u32) -> Result<(), NotifyError> {
        self.flushes += 1;
        if self.fail_flush {
            return Err(NotifyError::Transport("flush port stuck".into()));
        }
        match self.policy {
            DrainPolicy::Nothing => {}
            DrainPolicy::One => {
                self.consumer.drain(1);
            }
            DrainPolicy::All => {
                self.consumer.drain(usize::MAX);
            }
        }
        Ok(())
    }
}

pub const BASE_OFFSET: u32 = 0x0080_0000;

/// A disabled channel with `capacity` ring bytes and its simulated consumer.
pub fn channel(capacity: usize, threshold: u32) -> (Channel, SimulatedHost) {
    init_tracing();
    let layout = ChannelLayout::new(BASE_OFFSET, HEADER_BYTES + capacity).unwrap();
    let region = Arc::new(SharedRegion::new(layout.region_bytes()));
    let host = SimulatedHost::new(region.clone());
    let channel = Channel::new(
        region,
        layout,
        ChannelConfig {
            partial_write_threshold: threshold,
        },
    )
    .unwrap();
    (channel, host)
}

pub fn enabled_channel(capacity: usize, threshold: u32) -> (Channel, SimulatedHost) {
    let (mut channel, mut host) = channel(capacity, threshold);
    channel.enable(&mut host, Some(0)).unwrap();
    (channel, host)
}

pub fn pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed))
        .collect()
}
