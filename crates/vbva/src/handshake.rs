//! Bringing a channel into and out of service.

use crate::channel::{Channel, ChannelState};
use crate::error::EnableError;
use crate::layout::HostEvents;
use crate::notifier::{EnableRequest, Notifier};

impl Channel {
    /// Reset the shared header and ask the consumer to start draining it.
    ///
    /// On failure the channel is disabled again before the error is returned.
    pub fn enable<N: Notifier + ?Sized>(
        &mut self,
        notifier: &mut N,
        screen_id: Option<u32>,
    ) -> Result<(), EnableError> {
        if self.state == ChannelState::Enabled {
            return Err(EnableError::AlreadyEnabled);
        }

        tracing::debug!(
            base_offset = self.base_offset(),
            ?screen_id,
            "enabling channel with {} ring bytes",
            self.ring_capacity()
        );

        let region = &self.region;
        region.set_host_events(0);
        region.set_supported_ops(0);
        region.reset_queue();
        region.set_partial_write_threshold(self.config.partial_write_threshold);
        region.set_ring_capacity(self.layout.ring_capacity());

        self.overflowed = false;
        self.active_record = None;

        let request = EnableRequest::new(true, self.base_offset(), screen_id);
        match notifier.notify_enable(&request) {
            Ok(ops) => {
                self.region.set_supported_ops(ops.bits());
                self.region.set_host_events(HostEvents::MODE_ENABLED.bits());
                self.state = ChannelState::Enabled;
                Ok(())
            }
            Err(err) => {
                tracing::warn!(
                    base_offset = self.base_offset(),
                    ?screen_id,
                    "channel enable failed: {err}"
                );
                self.disable(notifier, screen_id);
                Err(err.into())
            }
        }
    }

    /// Take the channel out of service. Safe to call in any state.
    pub fn disable<N: Notifier + ?Sized>(&mut self, notifier: &mut N, screen_id: Option<u32>) {
        tracing::debug!(base_offset = self.base_offset(), ?screen_id, "disabling channel");

        let events = HostEvents::from_bits_retain(self.region.host_events());
        self.region.set_host_events((events - HostEvents::MODE_ENABLED).bits());
        self.overflowed = false;
        self.active_record = None;
        self.state = ChannelState::Disabled;

        let request = EnableRequest::new(false, self.base_offset(), screen_id);
        if let Err(err) = notifier.notify_disable(&request) {
            tracing::warn!(
                base_offset = self.base_offset(),
                ?screen_id,
                "ignoring failed disable notification: {err}"
            );
        }
    }

    /// Whether the consumer advertised support for `op_code` at enable time.
    pub fn is_operation_supported(&self, op_code: u32) -> bool {
        self.supported_ops().supports(op_code)
    }
}
