//! Stream records, the registry that owns them, and stream id allocation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use slab::Slab;

use crate::channel::StreamHandle;
use crate::error::{Error, Result};
use crate::flow_control::LocalWindow;
use crate::frame::{StreamId, MAX_STREAM_ID};
use crate::payload::PendingQueue;
use crate::state::StreamState;

/// One multiplexed stream as seen by the connection.
#[derive(Debug)]
pub struct Stream {
    id: StreamId,
    locally_initiated: bool,
    pub(crate) state: StreamState,
    /// Bytes we may still send. Negative after a SETTINGS shrink.
    pub(crate) remote_window: i32,
    pub(crate) local_window: LocalWindow,
    pub(crate) queue: PendingQueue,
    pub(crate) end_stream_queued: bool,
    pub(crate) end_stream_sent: bool,
    pub(crate) end_stream_received: bool,
    pub(crate) reset_sent: bool,
    /// The peer has seen a frame for this stream, so RST_STREAM is legal.
    pub(crate) known_to_peer: bool,
    channel: StreamHandle,
}

impl Stream {
    pub(crate) fn new(
        id: StreamId,
        locally_initiated: bool,
        remote_window: u32,
        local_window: LocalWindow,
        channel: StreamHandle,
    ) -> Self {
        Self {
            id,
            locally_initiated,
            state: StreamState::Idle,
            remote_window: remote_window as i32,
            local_window,
            queue: PendingQueue::default(),
            end_stream_queued: false,
            end_stream_sent: false,
            end_stream_received: false,
            reset_sent: false,
            known_to_peer: !locally_initiated,
            channel,
        }
    }

    pub fn id(&self) -> StreamId {
        self.id
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn is_locally_initiated(&self) -> bool {
        self.locally_initiated
    }

    pub fn remote_window(&self) -> i32 {
        self.remote_window
    }

    pub fn local_window(&self) -> i32 {
        self.local_window.window()
    }

    /// Flow-controlled bytes queued for sending.
    pub fn pending_bytes(&self) -> usize {
        self.queue.pending_bytes()
    }

    pub fn end_stream_sent(&self) -> bool {
        self.end_stream_sent
    }

    pub fn end_stream_received(&self) -> bool {
        self.end_stream_received
    }

    /// Channel bound to this stream.
    pub fn channel(&self) -> StreamHandle {
        self.channel
    }

    /// Queued data that still fits the window and could be written now.
    pub(crate) fn streamable_bytes(&self) -> usize {
        if self.remote_window <= 0 {
            return 0;
        }
        self.queue.pending_bytes().min(self.remote_window as usize)
    }
}

/// Owns every live stream: a slab arena indexed by stream id.
#[derive(Debug, Default)]
pub struct StreamRegistry {
    streams: Slab<Stream>,
    by_id: HashMap<StreamId, usize>,
}

impl StreamRegistry {
    pub(crate) fn insert(&mut self, stream: Stream) {
        let id = stream.id();
        let key = self.streams.insert(stream);
        if let Some(stale) = self.by_id.insert(id, key) {
            self.streams.remove(stale);
        }
    }

    pub(crate) fn remove(&mut self, stream_id: StreamId) -> Option<Stream> {
        let key = self.by_id.remove(&stream_id)?;
        self.streams.try_remove(key)
    }

    pub fn get(&self, stream_id: StreamId) -> Option<&Stream> {
        self.by_id.get(&stream_id).and_then(|&key| self.streams.get(key))
    }

    pub(crate) fn get_mut(&mut self, stream_id: StreamId) -> Option<&mut Stream> {
        let key = *self.by_id.get(&stream_id)?;
        self.streams.get_mut(key)
    }

    pub fn contains(&self, stream_id: StreamId) -> bool {
        self.by_id.contains_key(&stream_id)
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Stream> {
        self.streams.iter().map(|(_, s)| s)
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Stream> {
        self.streams.iter_mut().map(|(_, s)| s)
    }

    /// Ids of every stream, sorted ascending.
    pub(crate) fn ids(&self) -> Vec<StreamId> {
        let mut ids: Vec<StreamId> = self.by_id.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Visit active streams until `visitor` returns `false`; returns the
    /// id of the stream the visit stopped at.
    pub fn for_each_active(&self, mut visitor: impl FnMut(&Stream) -> bool) -> Option<StreamId> {
        for stream in self.iter().filter(|s| s.state().is_active()) {
            if !visitor(stream) {
                return Some(stream.id());
            }
        }
        None
    }

    /// Active streams opened by one side, for MAX_CONCURRENT_STREAMS.
    pub fn active_count(&self, locally_initiated: bool) -> usize {
        self.iter()
            .filter(|s| s.is_locally_initiated() == locally_initiated && s.state().is_active())
            .count()
    }
}

/// Hands out this endpoint's stream ids. Lock-free, so ids may be reserved
/// from any thread; everything else about streams stays on the thread that
/// owns the connection.
#[derive(Debug)]
pub struct StreamIdAllocator {
    next: AtomicU32,
}

impl StreamIdAllocator {
    /// `first` is 1 for clients and 2 for servers.
    pub fn new(first: StreamId) -> Self {
        Self {
            next: AtomicU32::new(first),
        }
    }

    pub fn allocate(&self) -> Result<StreamId> {
        self.next
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |next| {
                (next <= MAX_STREAM_ID).then(|| next + 2)
            })
            .map_err(|_| Error::StreamIdsExhausted)
    }

    /// The id the next successful `allocate` returns.
    pub fn peek(&self) -> Option<StreamId> {
        let next = self.next.load(Ordering::Acquire);
        (next <= MAX_STREAM_ID).then_some(next)
    }

    pub fn is_exhausted(&self) -> bool {
        self.peek().is_none()
    }
}
