//! Producer side of a shared-memory command channel.
//!
//! A driver hands variable-length command records to a privileged consumer
//! (the device model / host) through a region of device memory both sides can
//! see, without a round trip per record. The region holds a small header, a
//! queue of record lengths and a byte ring (see [`layout`]).
//!
//! Typical use:
//!
//! 1. [`Channel::enable`] resets the header and tells the consumer where it lives.
//! 2. Per command: [`Channel::begin_update`], one or more [`Channel::write`],
//!    [`Channel::end_update`]. Under pressure these ask the consumer to drain
//!    through [`Notifier::notify_flush`].
//! 3. [`Channel::disable`] takes the channel out of service.
//!
//! Producer calls on one channel must be serialized by the caller. The consumer
//! only writes `read_cursor` and `queue_head`; the producer only reads them.

pub mod channel;
pub mod cmd;
pub mod error;
mod handshake;
pub mod layout;
pub mod notifier;
pub mod region;
mod writer;

pub use channel::{Channel, ChannelConfig, ChannelState, RecordHandle};
pub use cmd::DirtyRect;
pub use error::{EnableError, LayoutError, SubmitError};
pub use layout::{
    layout_screens, ChannelLayout, HostEvents, ScreenLayout, DEFAULT_PARTIAL_WRITE_THRESHOLD,
    HEADER_BYTES, MAX_RECORD_BYTES, MIN_BUFFER_BYTES, RECORD_PARTIAL, RECORD_QUEUE_LEN,
};
pub use notifier::{
    EnableFlags, EnableRequest, Notifier, NotifyError, NullNotifier, SupportedOps,
};
pub use region::SharedRegion;
