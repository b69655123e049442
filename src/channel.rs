//! Per-stream application surface.
//!
//! A [`StreamHandle`] names a channel without borrowing the connection. It
//! is resolved through the connection's channel table on every call, and a
//! serial number makes handles to recycled slots detectably stale. The
//! stream record holds the same handle, so neither side owns the other.
//!
//! [`StreamChannel`] is the short-lived view returned by
//! [`Connection::channel`](crate::Connection::channel). Writes only queue
//! work; frames go out on [`Connection::flush`](crate::Connection::flush).

use std::collections::VecDeque;

use bytes::Bytes;
use tracing::{debug, trace, warn};

use crate::connection::{Connection, Event, Role};
use crate::error::{Error, Result};
use crate::frame::{error_code, header_list_size, FrameWriter, Header, PrioritySpec, StreamId, MAX_STREAM_ID};
use crate::payload::{Payload, WriteId, MAX_PADDING};
use crate::state::StreamState;
use crate::stream::Stream;

/// Opaque reference to one stream channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamHandle {
    index: usize,
    serial: u64,
}

impl StreamHandle {
    pub(crate) fn new(index: usize, serial: u64) -> Self {
        Self { index, serial }
    }

    pub(crate) fn index(self) -> usize {
        self.index
    }
}

/// Something the peer sent on a stream, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Headers { headers: Vec<Header>, end_stream: bool },
    Data { data: Bytes, end_stream: bool },
    /// Request headers of a stream the peer promised to push.
    Promise { headers: Vec<Header> },
}

#[derive(Debug)]
pub(crate) struct ChannelState {
    serial: u64,
    pub(crate) stream_id: Option<StreamId>,
    /// Undelivered items with the flow-control bytes each still holds.
    pub(crate) inbound: VecDeque<(Inbound, usize)>,
    pub(crate) reported_writable: bool,
    /// Priority to apply once the stream is opened.
    pub(crate) priority: Option<PrioritySpec>,
    /// The stream is gone; the channel lives on only until drained.
    pub(crate) finished: bool,
}

impl ChannelState {
    pub(crate) fn new(serial: u64, stream_id: Option<StreamId>) -> Self {
        Self {
            serial,
            stream_id,
            inbound: VecDeque::new(),
            reported_writable: true,
            priority: None,
            finished: false,
        }
    }
}

/// Borrowed view of one stream channel.
pub struct StreamChannel<'a, W: FrameWriter> {
    conn: &'a mut Connection<W>,
    handle: StreamHandle,
}

impl<'a, W: FrameWriter> StreamChannel<'a, W> {
    pub(crate) fn new(conn: &'a mut Connection<W>, handle: StreamHandle) -> Self {
        Self { conn, handle }
    }

    pub fn handle(&self) -> StreamHandle {
        self.handle
    }

    /// Stream id, assigned when the first HEADERS is written.
    pub fn id(&self) -> Option<StreamId> {
        self.conn.channel_state(self.handle).and_then(|c| c.stream_id)
    }

    pub fn state(&self) -> StreamState {
        match self.id() {
            None => StreamState::Idle,
            Some(id) => self.conn.streams.get(id).map_or(StreamState::Closed, Stream::state),
        }
    }

    /// Whether more writes are welcome. Computed from the stream state and
    /// the queued flow-control size against the high watermark.
    pub fn is_writable(&self) -> bool {
        self.conn.is_writable(self.handle)
    }

    /// Flow-controlled bytes queued but not yet written.
    pub fn pending_bytes(&self) -> usize {
        self.id()
            .and_then(|id| self.conn.streams.get(id))
            .map_or(0, Stream::pending_bytes)
    }

    /// Queue a HEADERS block. The first one opens the stream and assigns
    /// its id; later ones are trailers or, on a pushed stream, the response.
    pub fn write_headers(&mut self, headers: Vec<Header>, end_stream: bool) -> Result<WriteId> {
        self.conn.write_headers(self.handle, headers, end_stream)
    }

    pub fn write_data(&mut self, data: Bytes, end_stream: bool) -> Result<WriteId> {
        self.conn.write_data(self.handle, data, 0, end_stream)
    }

    /// Queue DATA followed by `padding` bytes of padding. The padding
    /// includes the pad-length octet and is flow controlled.
    pub fn write_data_padded(&mut self, data: Bytes, padding: usize, end_stream: bool) -> Result<WriteId> {
        self.conn.write_data(self.handle, data, padding, end_stream)
    }

    /// Half-close: queue an empty DATA frame carrying END_STREAM.
    pub fn close_write(&mut self) -> Result<WriteId> {
        self.conn.write_data(self.handle, Bytes::new(), 0, true)
    }

    /// Abort the stream with RST_STREAM. Does nothing on a closed stream.
    pub fn reset(&mut self, code: u32) {
        self.conn.reset_channel(self.handle, code)
    }

    /// Abort the stream with CANCEL.
    pub fn close(&mut self) {
        self.conn.reset_channel(self.handle, error_code::CANCEL)
    }

    /// Take the next inbound item. Data bytes count as consumed once read,
    /// which may release a WINDOW_UPDATE.
    pub fn read(&mut self) -> Option<Inbound> {
        self.conn.read_channel(self.handle)
    }

    pub fn set_priority(&mut self, priority: PrioritySpec) -> Result<()> {
        self.conn.set_channel_priority(self.handle, priority)
    }

    /// Promise a pushed stream associated with this one and return the new
    /// channel, reserved until its response HEADERS are written.
    pub fn push_promise(&mut self, headers: Vec<Header>) -> Result<StreamHandle> {
        self.conn.push_promise(self.handle, headers)
    }
}

impl<W: FrameWriter> Connection<W> {
    pub(crate) fn channel_state(&self, handle: StreamHandle) -> Option<&ChannelState> {
        self.channels.get(handle.index).filter(|c| c.serial == handle.serial)
    }

    pub(crate) fn channel_state_mut(&mut self, handle: StreamHandle) -> Option<&mut ChannelState> {
        self.channels.get_mut(handle.index).filter(|c| c.serial == handle.serial)
    }

    pub(crate) fn insert_channel(&mut self, stream_id: Option<StreamId>) -> StreamHandle {
        self.next_serial += 1;
        let serial = self.next_serial;
        let index = self.channels.insert(ChannelState::new(serial, stream_id));
        StreamHandle::new(index, serial)
    }

    fn live_channel(&self, handle: StreamHandle) -> Result<&ChannelState> {
        if self.closed {
            return Err(Error::ChannelClosed);
        }
        self.channel_state(handle).ok_or(Error::ChannelClosed)
    }

    pub(crate) fn is_writable(&self, handle: StreamHandle) -> bool {
        let Some(channel) = self.channel_state(handle) else {
            return false;
        };
        if self.closed || channel.finished {
            return false;
        }
        let Some(stream_id) = channel.stream_id else {
            return true;
        };
        self.streams.get(stream_id).map_or(false, |stream| {
            stream.state.local_side_open()
                && !stream.end_stream_queued
                && stream.queue.estimated_size() < self.config.write_buffer_high_watermark
        })
    }

    /// Emit `WritabilityChanged` if writability differs from what the
    /// application last saw.
    pub(crate) fn update_writability(&mut self, handle: StreamHandle) {
        let writable = self.is_writable(handle);
        let Some(channel) = self.channel_state_mut(handle) else {
            return;
        };
        if channel.reported_writable == writable {
            return;
        }
        channel.reported_writable = writable;
        let stream_id = channel.stream_id;
        trace!(?stream_id, writable, "writability changed");
        self.events.push_back(Event::WritabilityChanged {
            handle,
            stream_id,
            writable,
        });
    }

    /// Queue an inbound item for the application.
    pub(crate) fn deliver(&mut self, handle: StreamHandle, item: Inbound, flow_bytes: usize) {
        let Some(channel) = self.channel_state_mut(handle) else {
            return;
        };
        channel.inbound.push_back((item, flow_bytes));
        let Some(stream_id) = channel.stream_id else {
            return;
        };
        self.events.push_back(Event::Readable { handle, stream_id });
    }

    fn write_headers(&mut self, handle: StreamHandle, headers: Vec<Header>, end_stream: bool) -> Result<WriteId> {
        let opened = self.live_channel(handle)?.stream_id;
        if let Some(max) = self.peer_settings.max_header_list_size {
            let size = header_list_size(&headers);
            if size > max as usize {
                return Err(Error::stream(
                    opened.unwrap_or_default(),
                    error_code::PROTOCOL_ERROR,
                    format!("header list of {} bytes exceeds peer limit {}", size, max),
                ));
            }
        }
        let stream_id = match opened {
            Some(id) => id,
            None => self.open_local_stream(handle)?,
        };

        let Some(stream) = self.streams.get(stream_id) else {
            return Err(Error::stream(stream_id, error_code::STREAM_CLOSED, "stream already closed"));
        };
        if stream.end_stream_queued {
            return Err(Error::InvalidState {
                stream_id: Some(stream_id),
                message: "END_STREAM already queued",
            });
        }
        let previous = stream.state;
        let Some(next) = previous.activate_local() else {
            return Err(Error::stream(stream_id, error_code::STREAM_CLOSED, "stream closed for sending"));
        };
        let priority = if previous == StreamState::Idle {
            self.channel_state(handle).and_then(|c| c.priority)
        } else {
            None
        };

        let write = self.next_write_id();
        self.set_state(stream_id, next);
        self.enqueue(stream_id, Payload::headers(write, headers, priority, end_stream));
        self.update_writability(handle);
        Ok(write)
    }

    /// Allocate an id and create the stream record for a local channel.
    fn open_local_stream(&mut self, handle: StreamHandle) -> Result<StreamId> {
        if let Some((last_stream_id, code, debug_data)) = &self.goaway_received {
            return Err(Error::GoAway {
                stream_id: self.ids.peek().unwrap_or(MAX_STREAM_ID),
                last_stream_id: *last_stream_id,
                code: *code,
                debug_data: debug_data.clone(),
            });
        }
        if self.ids.is_exhausted() {
            warn!("stream identifiers exhausted");
            self.go_away(error_code::NO_ERROR, Bytes::new());
            return Err(Error::StreamIdsExhausted);
        }
        if self.goaway_sent.is_some() {
            return Err(Error::InvalidState {
                stream_id: None,
                message: "GOAWAY sent, no new streams",
            });
        }
        if let Some(max) = self.peer_settings.max_concurrent_streams {
            if self.streams.active_count(true) >= max as usize {
                return Err(Error::stream(
                    self.ids.peek().unwrap_or(MAX_STREAM_ID),
                    error_code::REFUSED_STREAM,
                    format!("peer allows {} concurrent streams", max),
                ));
            }
        }
        let stream_id = match self.ids.allocate() {
            Ok(id) => id,
            Err(err) => {
                self.go_away(error_code::NO_ERROR, Bytes::new());
                return Err(err);
            }
        };

        let stream = Stream::new(
            stream_id,
            true,
            self.remote_flow.initial_stream_window(),
            self.local_flow.new_stream_window(),
            handle,
        );
        self.streams.insert(stream);
        let priority = self.channel_state_mut(handle).and_then(|channel| {
            channel.stream_id = Some(stream_id);
            channel.priority
        });
        let distributor = self.remote_flow.distributor_mut();
        distributor.add_stream(stream_id);
        if let Some(p) = priority.filter(|p| p.dependency != stream_id) {
            distributor.update_dependency(stream_id, p.dependency, p.weight, p.exclusive);
        }
        self.notify(stream_id, |l, s| l.on_stream_added(s));
        debug!(stream_id, "opened local stream");
        Ok(stream_id)
    }

    fn write_data(&mut self, handle: StreamHandle, data: Bytes, padding: usize, end_stream: bool) -> Result<WriteId> {
        let channel = self.live_channel(handle)?;
        let Some(stream_id) = channel.stream_id else {
            return Err(Error::InvalidState {
                stream_id: None,
                message: "HEADERS must be written before DATA",
            });
        };
        if padding > MAX_PADDING {
            return Err(Error::InvalidState {
                stream_id: Some(stream_id),
                message: "padding exceeds 256 bytes",
            });
        }
        let Some(stream) = self.streams.get(stream_id) else {
            return Err(Error::stream(stream_id, error_code::STREAM_CLOSED, "stream already closed"));
        };
        if stream.end_stream_queued {
            return Err(Error::InvalidState {
                stream_id: Some(stream_id),
                message: "END_STREAM already queued",
            });
        }
        if !matches!(stream.state, StreamState::Open | StreamState::HalfClosedRemote) {
            return Err(Error::InvalidState {
                stream_id: Some(stream_id),
                message: "stream not open for DATA",
            });
        }

        let write = self.next_write_id();
        self.enqueue(stream_id, Payload::data(write, data, padding, end_stream));
        self.update_writability(handle);
        Ok(write)
    }

    fn reset_channel(&mut self, handle: StreamHandle, code: u32) {
        let Some(opened) = self.channel_state(handle).map(|c| c.stream_id) else {
            return;
        };
        match opened {
            Some(stream_id) => {
                self.reset_stream(stream_id, code, Error::stream(stream_id, code, "reset locally"))
            }
            None => {
                self.channels.remove(handle.index());
            }
        }
    }

    fn read_channel(&mut self, handle: StreamHandle) -> Option<Inbound> {
        let channel = self.channel_state_mut(handle)?;
        let (item, flow_bytes) = channel.inbound.pop_front()?;
        let stream_id = channel.stream_id;
        if channel.finished && channel.inbound.is_empty() {
            self.channels.remove(handle.index());
        }
        if let Some(stream_id) = stream_id {
            self.consume_inbound(stream_id, flow_bytes);
        }
        Some(item)
    }

    pub(crate) fn consume_inbound(&mut self, stream_id: StreamId, bytes: usize) {
        let stream = self.streams.get_mut(stream_id).map(|s| {
            let expects_more = s.state.remote_side_open() && !s.end_stream_received;
            (&mut s.local_window, expects_more)
        });
        self.local_flow.consume(stream_id, stream, bytes, &mut self.writer);
    }

    fn set_channel_priority(&mut self, handle: StreamHandle, priority: PrioritySpec) -> Result<()> {
        let opened = self.live_channel(handle)?.stream_id;
        match opened {
            Some(stream_id) if priority.dependency == stream_id => Err(Error::InvalidState {
                stream_id: Some(stream_id),
                message: "stream cannot depend on itself",
            }),
            Some(stream_id) => {
                self.remote_flow.distributor_mut().update_dependency(
                    stream_id,
                    priority.dependency,
                    priority.weight,
                    priority.exclusive,
                );
                Ok(())
            }
            None => {
                if let Some(channel) = self.channel_state_mut(handle) {
                    channel.priority = Some(priority);
                }
                Ok(())
            }
        }
    }

    fn push_promise(&mut self, handle: StreamHandle, headers: Vec<Header>) -> Result<StreamHandle> {
        let channel = self.live_channel(handle)?;
        let Some(parent) = channel.stream_id else {
            return Err(Error::InvalidState {
                stream_id: None,
                message: "cannot push on an unopened stream",
            });
        };
        if self.role != Role::Server {
            return Err(Error::InvalidState {
                stream_id: Some(parent),
                message: "only servers push",
            });
        }
        if !self.peer_settings.enable_push {
            return Err(Error::InvalidState {
                stream_id: Some(parent),
                message: "peer disabled push",
            });
        }
        let parent_open = self
            .streams
            .get(parent)
            .map_or(false, |s| matches!(s.state, StreamState::Open | StreamState::HalfClosedRemote));
        if !parent_open {
            return Err(Error::InvalidState {
                stream_id: Some(parent),
                message: "associated stream is not open",
            });
        }
        if self.goaway_received.is_some() || self.goaway_sent.is_some() {
            return Err(Error::InvalidState {
                stream_id: Some(parent),
                message: "connection is going away",
            });
        }
        let promised = self.ids.allocate()?;

        let pushed = self.insert_channel(Some(promised));
        let mut stream = Stream::new(
            promised,
            true,
            self.remote_flow.initial_stream_window(),
            self.local_flow.new_stream_window(),
            pushed,
        );
        stream.state = stream.state.reserve_local().unwrap_or(StreamState::ReservedLocal);
        stream.known_to_peer = true;
        self.streams.insert(stream);
        let distributor = self.remote_flow.distributor_mut();
        distributor.add_stream(promised);
        distributor.update_dependency(promised, parent, PrioritySpec::DEFAULT_WEIGHT, false);
        self.notify(promised, |l, s| l.on_stream_added(s));

        debug!(stream_id = parent, promised, "push promised");
        self.writer.write_push_promise(parent, promised, &headers);
        Ok(pushed)
    }
}
