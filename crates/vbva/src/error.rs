use thiserror::Error;

use crate::notifier::NotifyError;

/// Errors returned by [`Channel::enable`](crate::Channel::enable).
///
/// When this is returned the channel has already been disabled again; no
/// partially enabled state is left behind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnableError {
    #[error("channel is already enabled")]
    AlreadyEnabled,

    #[error("consumer refused to enable the channel: {0}")]
    Notify(#[from] NotifyError),
}

/// Errors describing an unusable channel region or configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("region of {region_bytes} bytes is too small, need at least {min_bytes}")]
    RegionTooSmall { region_bytes: usize, min_bytes: usize },

    #[error("region base offset {base_offset:#x} is not 4-byte aligned")]
    Misaligned { base_offset: u32 },

    #[error("region of {region_bytes} bytes does not fit in 32-bit device addressing")]
    TooLarge { region_bytes: usize },

    #[error("{screens} regions of {region_bytes} bytes do not fit in {vram_bytes} bytes of VRAM")]
    VramExhausted {
        vram_bytes: u32,
        screens: u32,
        region_bytes: u32,
    },

    #[error("partial write threshold {threshold} must be in 1..{ring_capacity}")]
    InvalidThreshold { threshold: u32, ring_capacity: u32 },

    #[error("shared region holds {actual} bytes but the layout needs {expected}")]
    RegionSizeMismatch { expected: usize, actual: usize },
}

/// Errors returned by [`Channel::submit`](crate::Channel::submit).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("channel is not enabled")]
    NotEnabled,

    /// The record queue stayed full after a flush. Nothing was written.
    #[error("record queue is full")]
    Backpressure,

    /// The ring ran out of space. The record was closed after `written` bytes.
    #[error("ring overflow after {written} bytes")]
    Overflow { written: u32 },

    #[error("flush request failed: {0}")]
    Notify(NotifyError),
}
