use std::sync::Arc;

use crate::error::LayoutError;
use crate::layout::{ChannelLayout, HostEvents, DEFAULT_PARTIAL_WRITE_THRESHOLD};
use crate::notifier::{NotifyError, SupportedOps};
use crate::region::SharedRegion;

#[derive(Clone, Debug)]
pub struct ChannelConfig {
    /// Free bytes kept in reserve when a record is larger than the space the
    /// consumer has released. Must be at least 1 and below the ring capacity.
    pub partial_write_threshold: u32,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            partial_write_threshold: DEFAULT_PARTIAL_WRITE_THRESHOLD,
        }
    }
}

/// Lifecycle of a channel as seen by the producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Uninitialized,
    Enabled,
    Disabled,
}

/// The record currently being built between `begin_update` and `end_update`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHandle {
    pub(crate) slot: usize,
}

impl RecordHandle {
    /// Index of the record queue slot this record occupies.
    pub fn slot(&self) -> usize {
        self.slot
    }
}

/// Producer side of one shared-memory command channel.
///
/// Producer operations are not synchronized; callers serialize them per
/// channel. Separate channels share nothing and can be driven from different
/// threads.
#[derive(Debug)]
pub struct Channel {
    pub(crate) region: Arc<SharedRegion>,
    pub(crate) layout: ChannelLayout,
    pub(crate) config: ChannelConfig,
    pub(crate) state: ChannelState,
    pub(crate) active_record: Option<RecordHandle>,
    pub(crate) overflowed: bool,
    pub(crate) flush_error: Option<NotifyError>,
}

impl Channel {
    /// Attach a producer to `region`, which must be exactly `layout.region_bytes()` long.
    pub fn new(
        region: Arc<SharedRegion>,
        layout: ChannelLayout,
        config: ChannelConfig,
    ) -> Result<Self, LayoutError> {
        if region.len() != layout.region_bytes() {
            return Err(LayoutError::RegionSizeMismatch {
                expected: layout.region_bytes(),
                actual: region.len(),
            });
        }
        let threshold = config.partial_write_threshold;
        if threshold == 0 || threshold >= layout.ring_capacity() {
            return Err(LayoutError::InvalidThreshold {
                threshold,
                ring_capacity: layout.ring_capacity(),
            });
        }
        Ok(Self {
            region,
            layout,
            config,
            state: ChannelState::Uninitialized,
            active_record: None,
            overflowed: false,
            flush_error: None,
        })
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    /// True between a successful enable and the next disable.
    pub fn is_enabled(&self) -> bool {
        self.state == ChannelState::Enabled
            && HostEvents::from_bits_truncate(self.region.host_events())
                .contains(HostEvents::MODE_ENABLED)
    }

    /// True once a write on the current record ran out of space.
    pub fn is_overflowed(&self) -> bool {
        self.overflowed
    }

    pub fn active_record(&self) -> Option<RecordHandle> {
        self.active_record
    }

    /// Capabilities reported by the consumer at the last enable.
    pub fn supported_ops(&self) -> SupportedOps {
        if self.state != ChannelState::Enabled {
            return SupportedOps::NONE;
        }
        SupportedOps(self.region.supported_ops())
    }

    /// The most recent failed flush request, if any, clearing it.
    pub fn take_flush_error(&mut self) -> Option<NotifyError> {
        self.flush_error.take()
    }

    pub fn layout(&self) -> &ChannelLayout {
        &self.layout
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    pub fn region(&self) -> &Arc<SharedRegion> {
        &self.region
    }

    pub fn base_offset(&self) -> u32 {
        self.layout.base_offset()
    }

    pub fn ring_capacity(&self) -> u32 {
        self.layout.ring_capacity()
    }

    pub fn write_cursor(&self) -> u32 {
        self.region.write_cursor()
    }

    pub fn read_cursor(&self) -> u32 {
        self.region.read_cursor()
    }
}
