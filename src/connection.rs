//! The connection: inbound frame handling, outbound flushing and the
//! application-facing event queue.
//!
//! `Connection` is driven through `&mut self` from one place at a time,
//! which is the only synchronization the stream table, the windows and the
//! priority tree get. Stream ids are the exception: the
//! [`StreamIdAllocator`] is atomic and may be shared with other threads.

use std::collections::VecDeque;
use std::sync::Arc;

use bytes::Bytes;
use slab::Slab;
use tracing::{debug, trace, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::channel::{ChannelState, Inbound, StreamChannel, StreamHandle};
use crate::config::{
    Config, Settings, DEFAULT_MAX_FRAME_SIZE, DEFAULT_WINDOW_SIZE, MAX_FRAME_SIZE_UPPER_BOUND, MAX_WINDOW_SIZE,
};
use crate::distributor::ByteDistributor;
use crate::error::{Error, Result};
use crate::flow_control::{LocalFlowController, RemoteFlowController};
use crate::frame::{
    dispatch, error_code, header_list_size, FrameEvent, FrameListener, FrameWriter, Header, PrioritySpec, StreamId,
    CONNECTION_STREAM_ID,
};
use crate::lifecycle::StreamListener;
use crate::payload::{Payload, WriteId};
use crate::state::StreamState;
use crate::stream::{Stream, StreamIdAllocator, StreamRegistry};

/// Which end of the connection we are. Clients open odd stream ids,
/// servers even ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Role {
    Client,
    Server,
}

impl Role {
    fn first_stream_id(self) -> StreamId {
        match self {
            Role::Client => 1,
            Role::Server => 2,
        }
    }
}

/// Notifications for the application, drained with
/// [`Connection::poll_event`].
#[derive(Debug, Clone)]
pub enum Event {
    /// The peer opened a stream, or promised one when `promised_by` is set.
    StreamOpened {
        handle: StreamHandle,
        stream_id: StreamId,
        promised_by: Option<StreamId>,
    },
    /// Inbound headers or data are waiting in the channel.
    Readable { handle: StreamHandle, stream_id: StreamId },
    WritabilityChanged {
        handle: StreamHandle,
        stream_id: Option<StreamId>,
        writable: bool,
    },
    WriteCompleted { handle: StreamHandle, write: WriteId },
    WriteFailed {
        handle: StreamHandle,
        write: WriteId,
        error: Error,
    },
    /// Emitted exactly once per stream. `error` is `None` after a normal
    /// close.
    StreamClosed {
        handle: StreamHandle,
        stream_id: StreamId,
        error: Option<Error>,
    },
    GoAwayReceived {
        last_stream_id: StreamId,
        error_code: u32,
        debug_data: Bytes,
    },
}

/// Sans-I/O HTTP/2 stream multiplexer.
///
/// Feed decoded frames to [`handle_frame`](Self::handle_frame), write through
/// [`StreamChannel`]s, call [`flush`](Self::flush) to push queued data out
/// through the [`FrameWriter`], and drain [`Event`]s.
pub struct Connection<W: FrameWriter> {
    pub(crate) role: Role,
    pub(crate) config: Config,
    /// Our settings as acknowledged by the peer.
    pub(crate) local_settings: Settings,
    /// Sent but not yet acknowledged, oldest first.
    pending_settings: VecDeque<Settings>,
    pub(crate) peer_settings: Settings,
    pub(crate) writer: W,
    pub(crate) streams: StreamRegistry,
    pub(crate) channels: Slab<ChannelState>,
    pub(crate) next_serial: u64,
    pub(crate) ids: Arc<StreamIdAllocator>,
    pub(crate) remote_flow: RemoteFlowController,
    pub(crate) local_flow: LocalFlowController,
    pub(crate) listeners: Vec<Box<dyn StreamListener>>,
    pub(crate) events: VecDeque<Event>,
    next_write_id: u64,
    /// Last stream id we advertised in our GOAWAY.
    pub(crate) goaway_sent: Option<StreamId>,
    pub(crate) goaway_received: Option<(StreamId, u32, Bytes)>,
    pub(crate) last_remote_stream_id: StreamId,
    empty_data_frames: usize,
    pub(crate) closed: bool,
}

impl<W: FrameWriter> Connection<W> {
    /// Create a connection and write the initial SETTINGS (plus a
    /// connection WINDOW_UPDATE when a larger inbound window is configured).
    pub fn new(role: Role, config: Config, writer: W) -> Result<Self> {
        config.validate()?;
        let connection_window = config.connection_window_size.max(DEFAULT_WINDOW_SIZE);
        let send_frame_size = config.max_frame_size.min(DEFAULT_MAX_FRAME_SIZE) as usize;

        let mut conn = Self {
            role,
            local_flow: LocalFlowController::new(connection_window, DEFAULT_WINDOW_SIZE, config.window_update_ratio),
            remote_flow: RemoteFlowController::new(DEFAULT_WINDOW_SIZE, send_frame_size),
            config,
            local_settings: Settings::default(),
            pending_settings: VecDeque::new(),
            peer_settings: Settings::default(),
            writer,
            streams: StreamRegistry::default(),
            channels: Slab::new(),
            next_serial: 0,
            ids: Arc::new(StreamIdAllocator::new(role.first_stream_id())),
            listeners: Vec::new(),
            events: VecDeque::new(),
            next_write_id: 0,
            goaway_sent: None,
            goaway_received: None,
            last_remote_stream_id: 0,
            empty_data_frames: 0,
            closed: false,
        };

        conn.remote_flow
            .distributor_mut()
            .set_max_placeholders(conn.config.max_priority_placeholders);
        let settings = conn.config.local_settings();
        conn.writer.write_settings(&settings.to_pairs());
        conn.pending_settings.push_back(settings);
        if connection_window > DEFAULT_WINDOW_SIZE {
            conn.writer
                .write_window_update(CONNECTION_STREAM_ID, connection_window - DEFAULT_WINDOW_SIZE);
        }
        debug!(?role, "connection started");
        Ok(conn)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Our settings, as last acknowledged by the peer.
    pub fn local_settings(&self) -> &Settings {
        &self.local_settings
    }

    pub fn peer_settings(&self) -> &Settings {
        &self.peer_settings
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    pub fn writer_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    pub fn stream(&self, stream_id: StreamId) -> Option<&Stream> {
        self.streams.get(stream_id)
    }

    pub fn streams(&self) -> &StreamRegistry {
        &self.streams
    }

    pub fn distributor(&self) -> &ByteDistributor {
        self.remote_flow.distributor()
    }

    /// Outbound connection window.
    pub fn connection_window(&self) -> i32 {
        self.remote_flow.connection_window()
    }

    /// Inbound connection window.
    pub fn local_connection_window(&self) -> i32 {
        self.local_flow.connection_window()
    }

    /// Shared id allocator. Safe to use from any thread.
    pub fn stream_id_allocator(&self) -> Arc<StreamIdAllocator> {
        Arc::clone(&self.ids)
    }

    pub fn goaway_sent(&self) -> Option<StreamId> {
        self.goaway_sent
    }

    pub fn goaway_received(&self) -> Option<StreamId> {
        self.goaway_received.as_ref().map(|(last, _, _)| *last)
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn add_listener(&mut self, listener: Box<dyn StreamListener>) {
        self.listeners.push(listener);
    }

    pub fn poll_event(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    /// Create a channel for a new local stream. It gets its id when its
    /// first HEADERS is written.
    pub fn new_stream(&mut self) -> Result<StreamHandle> {
        if self.closed {
            return Err(Error::ChannelClosed);
        }
        Ok(self.insert_channel(None))
    }

    pub fn channel(&mut self, handle: StreamHandle) -> Option<StreamChannel<'_, W>> {
        self.channel_state(handle)?;
        Some(StreamChannel::new(self, handle))
    }

    /// Visit active streams until `visitor` returns `false`; returns the id
    /// the visit stopped at.
    pub fn for_each_active_stream(&self, visitor: impl FnMut(&Stream) -> bool) -> Option<StreamId> {
        self.streams.for_each_active(visitor)
    }

    /// Send new local SETTINGS. They take effect when the peer acknowledges.
    pub fn update_local_settings(&mut self, settings: Settings) -> Result<()> {
        if settings.initial_window_size > MAX_WINDOW_SIZE {
            return Err(Error::Config(format!(
                "initial_window_size {} exceeds {}",
                settings.initial_window_size, MAX_WINDOW_SIZE
            )));
        }
        if !(DEFAULT_MAX_FRAME_SIZE..=MAX_FRAME_SIZE_UPPER_BOUND).contains(&settings.max_frame_size) {
            return Err(Error::Config(format!("max_frame_size {} out of range", settings.max_frame_size)));
        }
        if self.closed {
            return Err(Error::ChannelClosed);
        }
        self.writer.write_settings(&settings.to_pairs());
        self.pending_settings.push_back(settings);
        Ok(())
    }

    /// Process one decoded frame. Stream errors are answered with
    /// RST_STREAM and swallowed; connection errors send GOAWAY, tear the
    /// connection down and are returned.
    pub fn handle_frame(&mut self, event: FrameEvent) -> Result<()> {
        if self.closed {
            return Err(Error::ChannelClosed);
        }
        trace!(?event, "frame received");
        match dispatch(self, event) {
            Ok(()) => Ok(()),
            Err(Error::Stream {
                stream_id,
                code,
                message,
            }) => {
                warn!(stream_id, code = error_code::name(code), %message, "stream error");
                if self.streams.contains(stream_id) {
                    let error = Error::Stream {
                        stream_id,
                        code,
                        message,
                    };
                    self.reset_stream(stream_id, code, error);
                } else {
                    self.writer.write_rst_stream(stream_id, code);
                }
                Ok(())
            }
            Err(error) => {
                self.connection_error(&error);
                Err(error)
            }
        }
    }

    /// Write whatever queued data the flow-control windows allow.
    pub fn flush(&mut self) {
        if self.closed {
            return;
        }
        let outcome = self.remote_flow.write_pending(&mut self.streams, &mut self.writer);

        for (handle, write) in outcome.completed {
            self.events.push_back(Event::WriteCompleted { handle, write });
        }
        for stream_id in &outcome.touched {
            if let Some(stream) = self.streams.get_mut(*stream_id) {
                stream.known_to_peer = true;
            }
        }
        for stream_id in outcome.ended {
            let Some(stream) = self.streams.get_mut(stream_id) else {
                continue;
            };
            stream.end_stream_sent = true;
            if let Some(next) = stream.state.close_local() {
                self.set_state(stream_id, next);
            }
        }
        for stream_id in outcome.touched {
            if let Some(handle) = self.streams.get(stream_id).map(Stream::channel) {
                self.update_writability(handle);
            }
        }
    }

    pub(crate) fn next_write_id(&mut self) -> WriteId {
        self.next_write_id += 1;
        WriteId(self.next_write_id)
    }

    pub(crate) fn enqueue(&mut self, stream_id: StreamId, payload: Payload) {
        if let Some(stream) = self.streams.get_mut(stream_id) {
            if payload.end_stream() {
                stream.end_stream_queued = true;
            }
            self.remote_flow.enqueue(stream, payload);
        }
    }

    fn is_local_id(&self, stream_id: StreamId) -> bool {
        stream_id % 2 == self.role.first_stream_id() % 2
    }

    /// Never used by either side so far.
    fn is_idle(&self, stream_id: StreamId) -> bool {
        if self.is_local_id(stream_id) {
            self.ids.peek().map_or(false, |next| stream_id >= next)
        } else {
            stream_id > self.last_remote_stream_id
        }
    }

    fn check_header_list(&self, stream_id: StreamId, headers: &[Header]) -> Result<()> {
        let Some(max) = self.local_settings.max_header_list_size else {
            return Ok(());
        };
        let size = header_list_size(headers);
        if size > max as usize {
            return Err(Error::stream(
                stream_id,
                error_code::PROTOCOL_ERROR,
                format!("header list of {} bytes exceeds {}", size, max),
            ));
        }
        Ok(())
    }

    fn apply_priority(&mut self, stream_id: StreamId, priority: PrioritySpec) -> Result<()> {
        if priority.dependency == stream_id {
            return Err(Error::stream(stream_id, error_code::PROTOCOL_ERROR, "stream depends on itself"));
        }
        self.remote_flow.distributor_mut().update_dependency(
            stream_id,
            priority.dependency,
            priority.weight,
            priority.exclusive,
        );
        Ok(())
    }

    fn check_empty_data(&mut self, data: &Bytes, end_stream: bool) -> Result<()> {
        if !data.is_empty() || end_stream {
            self.empty_data_frames = 0;
            return Ok(());
        }
        self.empty_data_frames += 1;
        let max = self.config.max_consecutive_empty_frames;
        if max > 0 && self.empty_data_frames > max {
            return Err(Error::connection(
                error_code::ENHANCE_YOUR_CALM,
                format!("{} consecutive empty DATA frames", self.empty_data_frames),
            ));
        }
        Ok(())
    }

    fn open_remote_stream(
        &mut self,
        stream_id: StreamId,
        headers: Vec<Header>,
        priority: Option<PrioritySpec>,
        end_stream: bool,
    ) -> Result<()> {
        if self.is_local_id(stream_id) {
            return Err(if self.is_idle(stream_id) {
                Error::connection(error_code::PROTOCOL_ERROR, format!("HEADERS on idle local stream {}", stream_id))
            } else {
                Error::stream(stream_id, error_code::STREAM_CLOSED, "HEADERS on closed stream")
            });
        }
        if stream_id <= self.last_remote_stream_id {
            return Err(Error::stream(stream_id, error_code::STREAM_CLOSED, "HEADERS on closed stream"));
        }
        if let Some(last) = self.goaway_sent {
            if stream_id > last {
                debug!(stream_id, last, "ignoring stream opened after GOAWAY");
                return Ok(());
            }
        }
        self.last_remote_stream_id = stream_id;

        if let Some(max) = self.local_settings.max_concurrent_streams {
            if self.streams.active_count(false) >= max as usize {
                return Err(Error::stream(
                    stream_id,
                    error_code::REFUSED_STREAM,
                    format!("{} concurrent streams allowed", max),
                ));
            }
        }
        self.check_header_list(stream_id, &headers)?;
        if priority.map_or(false, |p| p.dependency == stream_id) {
            return Err(Error::stream(stream_id, error_code::PROTOCOL_ERROR, "stream depends on itself"));
        }

        let handle = self.insert_channel(Some(stream_id));
        let mut stream = Stream::new(
            stream_id,
            false,
            self.remote_flow.initial_stream_window(),
            self.local_flow.new_stream_window(),
            handle,
        );
        stream.end_stream_received = end_stream;
        self.streams.insert(stream);
        self.remote_flow.distributor_mut().add_stream(stream_id);
        if let Some(p) = priority {
            self.apply_priority(stream_id, p)?;
        }
        self.notify(stream_id, |l, s| l.on_stream_added(s));
        debug!(stream_id, end_stream, "peer opened stream");
        self.events.push_back(Event::StreamOpened {
            handle,
            stream_id,
            promised_by: None,
        });

        self.set_state(stream_id, StreamState::Open);
        self.deliver(handle, Inbound::Headers { headers, end_stream }, 0);
        if end_stream {
            self.set_state(stream_id, StreamState::HalfClosedRemote);
        }
        Ok(())
    }
}

impl<W: FrameWriter> FrameListener for Connection<W> {
    type Error = Error;

    fn on_data(&mut self, stream_id: StreamId, data: Bytes, padding: usize, end_stream: bool) -> Result<()> {
        if stream_id == CONNECTION_STREAM_ID {
            return Err(Error::connection(error_code::PROTOCOL_ERROR, "DATA on stream 0"));
        }
        self.check_empty_data(&data, end_stream)?;
        let flow_bytes = data.len() + padding;

        let receiving = self
            .streams
            .get(stream_id)
            .map(|s| matches!(s.state, StreamState::Open | StreamState::HalfClosedLocal) && !s.end_stream_received);
        match receiving {
            None if self.is_idle(stream_id) => {
                return Err(Error::connection(
                    error_code::PROTOCOL_ERROR,
                    format!("DATA on idle stream {}", stream_id),
                ));
            }
            None | Some(false) => {
                // Still counts against the connection window; hand it back.
                self.local_flow.receive(stream_id, None, flow_bytes)?;
                self.local_flow.consume(stream_id, None, flow_bytes, &mut self.writer);
                return Err(Error::stream(stream_id, error_code::STREAM_CLOSED, "DATA on closed stream"));
            }
            Some(true) => {}
        }

        let Some(stream) = self.streams.get_mut(stream_id) else {
            return Ok(());
        };
        match self.local_flow.receive(stream_id, Some(&mut stream.local_window), flow_bytes) {
            Ok(()) => {}
            Err(err @ Error::Stream { .. }) => {
                self.local_flow.consume(stream_id, None, flow_bytes, &mut self.writer);
                return Err(err);
            }
            Err(err) => return Err(err),
        }
        if padding > 0 {
            let expects_more = !end_stream;
            self.local_flow.consume(
                stream_id,
                Some((&mut stream.local_window, expects_more)),
                padding,
                &mut self.writer,
            );
        }
        if end_stream {
            stream.end_stream_received = true;
        }
        let handle = stream.channel();
        let state = stream.state;

        let len = data.len();
        if len > 0 || end_stream {
            self.deliver(handle, Inbound::Data { data, end_stream }, len);
        }
        if end_stream {
            if let Some(next) = state.close_remote() {
                self.set_state(stream_id, next);
            }
        }
        Ok(())
    }

    fn on_headers(
        &mut self,
        stream_id: StreamId,
        headers: Vec<Header>,
        priority: Option<PrioritySpec>,
        end_stream: bool,
    ) -> Result<()> {
        self.empty_data_frames = 0;
        if stream_id == CONNECTION_STREAM_ID {
            return Err(Error::connection(error_code::PROTOCOL_ERROR, "HEADERS on stream 0"));
        }
        let Some(stream) = self.streams.get(stream_id) else {
            return self.open_remote_stream(stream_id, headers, priority, end_stream);
        };
        if stream.end_stream_received {
            return Err(Error::stream(stream_id, error_code::STREAM_CLOSED, "HEADERS after END_STREAM"));
        }
        let handle = stream.channel();
        let Some(next) = stream.state.activate_remote() else {
            return Err(Error::stream(stream_id, error_code::STREAM_CLOSED, "stream closed for receiving"));
        };
        self.check_header_list(stream_id, &headers)?;
        if let Some(p) = priority {
            self.apply_priority(stream_id, p)?;
        }
        if let Some(stream) = self.streams.get_mut(stream_id) {
            stream.end_stream_received |= end_stream;
        }

        self.set_state(stream_id, next);
        self.deliver(handle, Inbound::Headers { headers, end_stream }, 0);
        if end_stream {
            if let Some(next) = next.close_remote() {
                self.set_state(stream_id, next);
            }
        }
        Ok(())
    }

    fn on_push_promise(
        &mut self,
        stream_id: StreamId,
        promised_stream_id: StreamId,
        headers: Vec<Header>,
    ) -> Result<()> {
        if self.role == Role::Server {
            return Err(Error::connection(error_code::PROTOCOL_ERROR, "PUSH_PROMISE sent to a server"));
        }
        if !self.local_settings.enable_push {
            return Err(Error::connection(error_code::PROTOCOL_ERROR, "PUSH_PROMISE with push disabled"));
        }
        let associated_open = self
            .streams
            .get(stream_id)
            .map_or(false, |s| matches!(s.state, StreamState::Open | StreamState::HalfClosedLocal));
        if !associated_open {
            return Err(Error::connection(
                error_code::PROTOCOL_ERROR,
                format!("PUSH_PROMISE on stream {} which is not open", stream_id),
            ));
        }
        if self.is_local_id(promised_stream_id) || promised_stream_id <= self.last_remote_stream_id {
            return Err(Error::connection(
                error_code::PROTOCOL_ERROR,
                format!("invalid promised stream id {}", promised_stream_id),
            ));
        }
        self.last_remote_stream_id = promised_stream_id;

        let handle = self.insert_channel(Some(promised_stream_id));
        let mut stream = Stream::new(
            promised_stream_id,
            false,
            self.remote_flow.initial_stream_window(),
            self.local_flow.new_stream_window(),
            handle,
        );
        stream.state = stream.state.reserve_remote().unwrap_or(StreamState::ReservedRemote);
        self.streams.insert(stream);
        self.remote_flow.distributor_mut().add_stream(promised_stream_id);
        self.remote_flow.distributor_mut().update_dependency(
            promised_stream_id,
            stream_id,
            PrioritySpec::DEFAULT_WEIGHT,
            false,
        );
        self.notify(promised_stream_id, |l, s| l.on_stream_added(s));
        debug!(stream_id, promised_stream_id, "push promised by peer");
        self.events.push_back(Event::StreamOpened {
            handle,
            stream_id: promised_stream_id,
            promised_by: Some(stream_id),
        });
        self.deliver(handle, Inbound::Promise { headers }, 0);
        Ok(())
    }

    fn on_priority(&mut self, stream_id: StreamId, priority: PrioritySpec) -> Result<()> {
        if stream_id == CONNECTION_STREAM_ID {
            return Err(Error::connection(error_code::PROTOCOL_ERROR, "PRIORITY on stream 0"));
        }
        self.apply_priority(stream_id, priority)
    }

    fn on_rst_stream(&mut self, stream_id: StreamId, error_code: u32) -> Result<()> {
        if stream_id == CONNECTION_STREAM_ID {
            return Err(Error::connection(crate::frame::error_code::PROTOCOL_ERROR, "RST_STREAM on stream 0"));
        }
        let idle = self.is_idle(stream_id);
        match self.streams.get_mut(stream_id) {
            Some(stream) => {
                // Never answer a reset with a reset.
                stream.reset_sent = true;
                debug!(stream_id, code = crate::frame::error_code::name(error_code), "stream reset by peer");
                self.close_stream(
                    stream_id,
                    Some(Error::Reset {
                        stream_id,
                        code: error_code,
                    }),
                );
                Ok(())
            }
            None if idle => Err(Error::connection(
                crate::frame::error_code::PROTOCOL_ERROR,
                format!("RST_STREAM on idle stream {}", stream_id),
            )),
            None => Ok(()),
        }
    }

    fn on_settings(&mut self, settings: Vec<(u16, u32)>) -> Result<()> {
        let previous = self.peer_settings;
        let mut next = previous;
        next.apply(&settings)?;
        self.peer_settings = next;

        if next.initial_window_size != previous.initial_window_size {
            self.remote_flow
                .set_initial_window_size(&mut self.streams, next.initial_window_size)?;
        }
        if next.max_frame_size != previous.max_frame_size {
            let frame_size = next.max_frame_size.min(self.config.max_frame_size) as usize;
            self.remote_flow.set_max_frame_size(frame_size);
        }
        debug!(?next, "peer settings applied");
        self.writer.write_settings_ack();
        self.flush();
        Ok(())
    }

    fn on_settings_ack(&mut self) -> Result<()> {
        let Some(settings) = self.pending_settings.pop_front() else {
            warn!("unexpected SETTINGS ACK");
            return Ok(());
        };
        if settings.initial_window_size != self.local_settings.initial_window_size {
            self.local_flow
                .set_initial_stream_window(&mut self.streams, settings.initial_window_size)?;
        }
        self.local_settings = settings;
        debug!(?settings, "local settings acknowledged");
        Ok(())
    }

    fn on_window_update(&mut self, stream_id: StreamId, increment: u32) -> Result<()> {
        if stream_id == CONNECTION_STREAM_ID {
            self.remote_flow.increment_connection_window(increment)?;
        } else {
            let idle = self.is_idle(stream_id);
            match self.streams.get_mut(stream_id) {
                Some(stream) => self.remote_flow.increment_stream_window(stream, increment)?,
                None if idle => {
                    return Err(Error::connection(
                        error_code::PROTOCOL_ERROR,
                        format!("WINDOW_UPDATE on idle stream {}", stream_id),
                    ));
                }
                None => return Ok(()),
            }
        }
        trace!(stream_id, increment, "window update");
        self.flush();
        Ok(())
    }

    fn on_goaway(&mut self, last_stream_id: StreamId, error_code: u32, debug_data: Bytes) -> Result<()> {
        self.handle_goaway(last_stream_id, error_code, debug_data)
    }
}
