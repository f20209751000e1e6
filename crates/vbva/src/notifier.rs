//! Boundary between the producer and whatever transport reaches the consumer.
//!
//! A driver implements [`Notifier`] on top of its command-submission path (port
//! I/O, hypercall, IOCTL). All calls are synchronous: `notify_flush` may block
//! the calling thread until the consumer has processed pending records.

use bitflags::bitflags;
use thiserror::Error;

bitflags! {
    /// Flags carried by an enable/disable request.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct EnableFlags: u32 {
        const ENABLE = 1 << 0;
        const DISABLE = 1 << 1;
        /// The request carries a screen id.
        const EXTENDED = 1 << 2;
        /// `base_offset` is an absolute device memory offset.
        const ABSOFFSET = 1 << 3;
    }
}

/// Enable or disable request sent to the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnableRequest {
    pub flags: EnableFlags,
    /// Offset of the channel region in device memory.
    pub base_offset: u32,
    pub screen_id: Option<u32>,
}

impl EnableRequest {
    pub fn new(enable: bool, base_offset: u32, screen_id: Option<u32>) -> Self {
        let mut flags = if enable {
            EnableFlags::ENABLE
        } else {
            EnableFlags::DISABLE
        };
        if screen_id.is_some() {
            flags |= EnableFlags::EXTENDED | EnableFlags::ABSOFFSET;
        }
        Self {
            flags,
            base_offset,
            screen_id,
        }
    }

    pub fn is_enable(&self) -> bool {
        self.flags.contains(EnableFlags::ENABLE)
    }
}

/// Capability bitmap reported by the consumer at enable time.
///
/// Bit `n` set means operation code `n` is understood by the consumer.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SupportedOps(pub u32);

impl SupportedOps {
    pub const NONE: Self = Self(0);

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn supports(self, op_code: u32) -> bool {
        op_code < u32::BITS && self.0 & (1 << op_code) != 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotifyError {
    /// The consumer processed the request and returned a failure status.
    #[error("consumer rejected the request with status {status}")]
    Rejected { status: i32 },

    /// No command buffer could be allocated for the request.
    #[error("failed to allocate a command buffer for the request")]
    AllocationFailed,

    #[error("transport failure: {0}")]
    Transport(String),
}

/// Status the consumer reports for a request kind it does not understand.
pub const STATUS_NOT_SUPPORTED: i32 = -37;

pub trait Notifier {
    /// Ask the consumer to start watching the region at `request.base_offset`.
    fn notify_enable(&mut self, request: &EnableRequest) -> Result<SupportedOps, NotifyError>;

    /// Tell the consumer to stop watching the region. Best effort.
    fn notify_disable(&mut self, request: &EnableRequest) -> Result<(), NotifyError>;

    /// Ask the consumer to drain pending records.
    ///
    /// Returning `Ok` does not imply that any bytes were drained.
    fn notify_flush(&mut self, base_offset: u32) -> Result<(), NotifyError>;
}

impl<N: Notifier + ?Sized> Notifier for &mut N {
    fn notify_enable(&mut self, request: &EnableRequest) -> Result<SupportedOps, NotifyError> {
        (**self).notify_enable(request)
    }

    fn notify_disable(&mut self, request: &EnableRequest) -> Result<(), NotifyError> {
        (**self).notify_disable(request)
    }

    fn notify_flush(&mut self, base_offset: u32) -> Result<(), NotifyError> {
        (**self).notify_flush(base_offset)
    }
}

impl<N: Notifier + ?Sized> Notifier for Box<N> {
    fn notify_enable(&mut self, request: &EnableRequest) -> Result<SupportedOps, NotifyError> {
        (**self).notify_enable(request)
    }

    fn notify_disable(&mut self, request: &EnableRequest) -> Result<(), NotifyError> {
        (**self).notify_disable(request)
    }

    fn notify_flush(&mut self, base_offset: u32) -> Result<(), NotifyError> {
        (**self).notify_flush(base_offset)
    }
}

/// Notifier for configurations with no consumer attached.
///
/// Enable is always refused with [`STATUS_NOT_SUPPORTED`]; disable and flush
/// succeed without doing anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify_enable(&mut self, _request: &EnableRequest) -> Result<SupportedOps, NotifyError> {
        Err(NotifyError::Rejected {
            status: STATUS_NOT_SUPPORTED,
        })
    }

    fn notify_disable(&mut self, _request: &EnableRequest) -> Result<(), NotifyError> {
        Ok(())
    }

    fn notify_flush(&mut self, _base_offset: u32) -> Result<(), NotifyError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn screen_requests_are_extended() {
        let req = EnableRequest::new(true, 0x40_0000, Some(2));
        assert_eq!(
            req.flags,
            EnableFlags::ENABLE | EnableFlags::EXTENDED | EnableFlags::ABSOFFSET
        );
        assert!(req.is_enable());

        let legacy = EnableRequest::new(false, 0x40_0000, None);
        assert_eq!(legacy.flags, EnableFlags::DISABLE);
        assert!(!legacy.is_enable());
    }

    #[test]
    fn supported_ops_bit_test() {
        let ops = SupportedOps(0b1010);
        assert!(ops.supports(1));
        assert!(ops.supports(3));
        assert!(!ops.supports(0));
        assert!(!ops.supports(32));
        assert!(!ops.supports(u32::MAX));
        assert!(!SupportedOps::NONE.supports(0));
    }
}
