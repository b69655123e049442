//! Stream lifecycle (RFC 7540 Section 5.1).
//!
//! ```text
//!                          +--------+
//!                  send PP |        | recv PP
//!                 ,--------|  idle  |--------.
//!                /         |        |         \
//!               v          +--------+          v
//!        +----------+          |           +----------+
//!        |          |          | send H /  |          |
//! ,------| reserved |          | recv H    | reserved |------.
//! |      | (local)  |          |           | (remote) |      |
//! |      +----------+          v           +----------+      |
//! |          |             +--------+             |          |
//! |          |     recv ES |        | send ES     |          |
//! |   send H |     ,-------|  open  |-------.     | recv H   |
//! |          |    /        |        |        \    |          |
//! |          v   v         +--------+         v   v          |
//! |      +----------+          |           +----------+      |
//! |      |   half   |          |           |   half   |      |
//! |      |  closed  |          | send R /  |  closed  |      |
//! |      | (remote) |          | recv R    | (local)  |      |
//! |      +----------+          |           +----------+      |
//! |           |                |                 |           |
//! |           | send ES /      |       recv ES / |           |
//! |           | send R /       v        send R / |           |
//! |           | recv R     +--------+   recv R   |           |
//! | send R /  `----------->|        |<-----------'  send R / |
//! | recv R                 | closed |               recv R   |
//! `----------------------->|        |<----------------------'
//!                          +--------+
//! ```
//!
//! Every transition returns `None` when it is not allowed from the current
//! state; callers turn that into the appropriate protocol error.

/// Lifecycle state of a single stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamState {
    #[default]
    Idle,
    ReservedLocal,
    ReservedRemote,
    Open,
    HalfClosedLocal,
    HalfClosedRemote,
    Closed,
}

impl StreamState {
    /// We may still send frames carrying stream data.
    pub fn local_side_open(self) -> bool {
        matches!(
            self,
            StreamState::Open | StreamState::HalfClosedRemote | StreamState::ReservedLocal
        )
    }

    /// The peer may still send frames carrying stream data.
    pub fn remote_side_open(self) -> bool {
        matches!(
            self,
            StreamState::Open | StreamState::HalfClosedLocal | StreamState::ReservedRemote
        )
    }

    /// Counts toward SETTINGS_MAX_CONCURRENT_STREAMS.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            StreamState::Open | StreamState::HalfClosedLocal | StreamState::HalfClosedRemote
        )
    }

    pub fn is_half_closed(self) -> bool {
        matches!(self, StreamState::HalfClosedLocal | StreamState::HalfClosedRemote)
    }

    pub fn is_closed(self) -> bool {
        self == StreamState::Closed
    }

    /// A HEADERS block was queued by us (request, response or trailers).
    pub fn activate_local(self) -> Option<Self> {
        match self {
            StreamState::Idle => Some(StreamState::Open),
            StreamState::ReservedLocal => Some(StreamState::HalfClosedRemote),
            StreamState::Open | StreamState::HalfClosedRemote => Some(self),
            _ => None,
        }
    }

    /// A HEADERS block arrived from the peer.
    pub fn activate_remote(self) -> Option<Self> {
        match self {
            StreamState::Idle => Some(StreamState::Open),
            StreamState::ReservedRemote => Some(StreamState::HalfClosedLocal),
            StreamState::Open | StreamState::HalfClosedLocal => Some(self),
            _ => None,
        }
    }

    pub fn reserve_local(self) -> Option<Self> {
        match self {
            StreamState::Idle => Some(StreamState::ReservedLocal),
            _ => None,
        }
    }

    pub fn reserve_remote(self) -> Option<Self> {
        match self {
            StreamState::Idle => Some(StreamState::ReservedRemote),
            _ => None,
        }
    }

    /// We sent END_STREAM.
    pub fn close_local(self) -> Option<Self> {
        match self {
            StreamState::Open => Some(StreamState::HalfClosedLocal),
            StreamState::HalfClosedRemote => Some(StreamState::Closed),
            _ => None,
        }
    }

    /// The peer sent END_STREAM.
    pub fn close_remote(self) -> Option<Self> {
        match self {
            StreamState::Open => Some(StreamState::HalfClosedRemote),
            StreamState::HalfClosedLocal => Some(StreamState::Closed),
            _ => None,
        }
    }
}
