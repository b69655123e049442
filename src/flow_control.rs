//! Flow-control windows (RFC 7540 Section 6.9).
//!
//! [`LocalFlowController`] guards what the peer may send us and decides when
//! to replenish it with WINDOW_UPDATE. [`RemoteFlowController`] guards what
//! we may send, owns the [`ByteDistributor`] and drives the pending queues
//! of every stream through it.

use tracing::{debug, trace};

use crate::channel::StreamHandle;
use crate::config::MAX_WINDOW_SIZE;
use crate::distributor::ByteDistributor;
use crate::error::{Error, Result};
use crate::frame::{error_code, FrameWriter, StreamId, CONNECTION_STREAM_ID};
use crate::payload::{Payload, WriteId};
use crate::stream::{Stream, StreamRegistry};

/// Inbound window of one stream or of the connection.
#[derive(Debug, Clone)]
pub struct LocalWindow {
    /// Bytes the peer may still send.
    window: i32,
    /// `window` plus bytes received but not yet consumed by the application.
    processed: i32,
    initial: i32,
    /// How far below zero `window` may go while the peer catches up with a
    /// shrunken SETTINGS_INITIAL_WINDOW_SIZE.
    lower_bound: i32,
}

impl LocalWindow {
    pub fn new(initial: u32) -> Self {
        let initial = initial.min(MAX_WINDOW_SIZE) as i32;
        Self {
            window: initial,
            processed: initial,
            initial,
            lower_bound: 0,
        }
    }

    pub fn window(&self) -> i32 {
        self.window
    }

    pub fn initial(&self) -> i32 {
        self.initial
    }

    /// Received bytes not yet handed back through `consume`.
    pub fn unconsumed(&self) -> usize {
        (self.processed as i64 - self.window as i64).max(0) as usize
    }

    fn receive(&mut self, bytes: usize) -> bool {
        let next = self.window as i64 - bytes as i64;
        if next < self.lower_bound as i64 {
            return false;
        }
        self.window = next as i32;
        true
    }

    /// Returns the WINDOW_UPDATE increment to send, if the unacknowledged
    /// share crossed the ratio.
    fn consume(&mut self, bytes: usize, ratio: f32) -> Option<u32> {
        let bytes = bytes.min(self.unconsumed());
        self.processed -= bytes as i32;
        let threshold = (self.initial as f32 * ratio) as i32;
        if self.processed > threshold {
            return None;
        }
        let delta = self.initial - self.processed;
        if delta <= 0 {
            return None;
        }
        self.window += delta;
        self.processed += delta;
        self.lower_bound = 0;
        Some(delta as u32)
    }

    fn adjust_initial(&mut self, delta: i32) -> bool {
        let window = self.window as i64 + delta as i64;
        let processed = self.processed as i64 + delta as i64;
        if window > MAX_WINDOW_SIZE as i64 || processed > MAX_WINDOW_SIZE as i64 {
            return false;
        }
        self.initial += delta;
        self.window = window as i32;
        self.processed = processed as i32;
        self.lower_bound = delta.min(0);
        true
    }
}

/// Inbound (receive-side) flow control.
#[derive(Debug)]
pub struct LocalFlowController {
    connection: LocalWindow,
    initial_stream_window: u32,
    ratio: f32,
}

impl LocalFlowController {
    pub fn new(connection_window: u32, initial_stream_window: u32, ratio: f32) -> Self {
        Self {
            connection: LocalWindow::new(connection_window),
            initial_stream_window,
            ratio,
        }
    }

    pub fn connection_window(&self) -> i32 {
        self.connection.window()
    }

    pub fn initial_stream_window(&self) -> u32 {
        self.initial_stream_window
    }

    pub(crate) fn new_stream_window(&self) -> LocalWindow {
        LocalWindow::new(self.initial_stream_window)
    }

    /// Debit an inbound DATA frame (payload plus padding). `stream` is
    /// `None` when the frame targets a stream we no longer track.
    pub(crate) fn receive(
        &mut self,
        stream_id: StreamId,
        stream: Option<&mut LocalWindow>,
        bytes: usize,
    ) -> Result<()> {
        if !self.connection.receive(bytes) {
            return Err(Error::connection(
                error_code::FLOW_CONTROL_ERROR,
                format!(
                    "connection window exceeded: {} bytes with {} available",
                    bytes,
                    self.connection.window()
                ),
            ));
        }
        if let Some(window) = stream {
            if !window.receive(bytes) {
                return Err(Error::stream(
                    stream_id,
                    error_code::FLOW_CONTROL_ERROR,
                    format!("stream window exceeded: {} bytes with {} available", bytes, window.window()),
                ));
            }
        }
        Ok(())
    }

    /// Hand bytes back after the application consumed them, writing any
    /// WINDOW_UPDATE that became due. Stream-level updates are skipped when
    /// the peer has finished sending on the stream.
    pub(crate) fn consume<W: FrameWriter + ?Sized>(
        &mut self,
        stream_id: StreamId,
        stream: Option<(&mut LocalWindow, bool)>,
        bytes: usize,
        writer: &mut W,
    ) {
        if bytes == 0 {
            return;
        }
        if let Some(increment) = self.connection.consume(bytes, self.ratio) {
            trace!(increment, "connection WINDOW_UPDATE");
            writer.write_window_update(CONNECTION_STREAM_ID, increment);
        }
        if let Some((window, expects_more)) = stream {
            if let Some(increment) = window.consume(bytes, self.ratio) {
                if expects_more {
                    trace!(stream_id, increment, "stream WINDOW_UPDATE");
                    writer.write_window_update(stream_id, increment);
                }
            }
        }
    }

    /// Apply an acknowledged SETTINGS_INITIAL_WINDOW_SIZE to every stream.
    pub(crate) fn set_initial_stream_window(&mut self, streams: &mut StreamRegistry, new: u32) -> Result<()> {
        let delta = new as i64 - self.initial_stream_window as i64;
        self.initial_stream_window = new;
        for stream in streams.iter_mut() {
            if !stream.local_window.adjust_initial(delta as i32) {
                return Err(Error::connection(
                    error_code::FLOW_CONTROL_ERROR,
                    format!("stream {} inbound window overflow", stream.id()),
                ));
            }
        }
        debug!(new, delta, "local initial window size changed");
        Ok(())
    }
}

/// Writes and stream transitions produced by one pass over pending queues.
#[derive(Debug, Default)]
pub(crate) struct WriteOutcome {
    pub(crate) completed: Vec<(StreamHandle, WriteId)>,
    /// Streams whose END_STREAM went out.
    pub(crate) ended: Vec<StreamId>,
    /// Streams whose queue shrank.
    pub(crate) touched: Vec<StreamId>,
}

/// Outbound (send-side) flow control.
#[derive(Debug)]
pub struct RemoteFlowController {
    connection_window: i32,
    initial_stream_window: u32,
    max_frame_size: usize,
    distributor: ByteDistributor,
}

impl RemoteFlowController {
    pub fn new(initial_stream_window: u32, max_frame_size: usize) -> Self {
        Self {
            connection_window: crate::config::DEFAULT_WINDOW_SIZE as i32,
            initial_stream_window,
            max_frame_size,
            distributor: ByteDistributor::new(max_frame_size),
        }
    }

    pub fn connection_window(&self) -> i32 {
        self.connection_window
    }

    pub fn initial_stream_window(&self) -> u32 {
        self.initial_stream_window
    }

    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }

    pub fn distributor(&self) -> &ByteDistributor {
        &self.distributor
    }

    pub(crate) fn distributor_mut(&mut self) -> &mut ByteDistributor {
        &mut self.distributor
    }

    pub(crate) fn set_max_frame_size(&mut self, max_frame_size: usize) {
        self.max_frame_size = max_frame_size;
        self.distributor.set_max_frame_size(max_frame_size);
    }

    pub(crate) fn increment_connection_window(&mut self, increment: u32) -> Result<()> {
        if increment == 0 {
            return Err(Error::connection(
                error_code::PROTOCOL_ERROR,
                "WINDOW_UPDATE with zero increment on connection",
            ));
        }
        let next = self.connection_window as i64 + increment as i64;
        if next > MAX_WINDOW_SIZE as i64 {
            return Err(Error::connection(
                error_code::FLOW_CONTROL_ERROR,
                format!("connection window overflow: {}", next),
            ));
        }
        self.connection_window = next as i32;
        Ok(())
    }

    pub(crate) fn increment_stream_window(&mut self, stream: &mut Stream, increment: u32) -> Result<()> {
        if increment == 0 {
            return Err(Error::stream(
                stream.id(),
                error_code::PROTOCOL_ERROR,
                "WINDOW_UPDATE with zero increment",
            ));
        }
        let next = stream.remote_window as i64 + increment as i64;
        if next > MAX_WINDOW_SIZE as i64 {
            return Err(Error::stream(
                stream.id(),
                error_code::FLOW_CONTROL_ERROR,
                format!("stream window overflow: {}", next),
            ));
        }
        stream.remote_window = next as i32;
        self.refresh(stream);
        Ok(())
    }

    /// Apply the peer's SETTINGS_INITIAL_WINDOW_SIZE: every stream window
    /// moves by `new - old`, possibly below zero.
    pub(crate) fn set_initial_window_size(&mut self, streams: &mut StreamRegistry, new: u32) -> Result<()> {
        let delta = new as i64 - self.initial_stream_window as i64;
        self.initial_stream_window = new;
        for stream in streams.iter_mut() {
            let next = stream.remote_window as i64 + delta;
            if next > MAX_WINDOW_SIZE as i64 {
                return Err(Error::connection(
                    error_code::FLOW_CONTROL_ERROR,
                    format!("stream {} window overflow after SETTINGS", stream.id()),
                ));
            }
            stream.remote_window = next as i32;
            self.refresh(stream);
        }
        debug!(new, delta, "remote initial window size changed");
        Ok(())
    }

    pub(crate) fn enqueue(&mut self, stream: &mut Stream, payload: Payload) {
        stream.queue.push(payload);
        self.refresh(stream);
    }

    /// Drop every queued unit of `stream`, returning the writes it owed.
    pub(crate) fn cancel(&mut self, stream: &mut Stream) -> Vec<WriteId> {
        let writes = stream.queue.drain();
        self.distributor.update_streamable_bytes(stream.id(), 0);
        writes
    }

    pub(crate) fn remove(&mut self, stream_id: StreamId) {
        self.distributor.remove(stream_id);
    }

    fn refresh(&mut self, stream: &Stream) {
        self.distributor
            .update_streamable_bytes(stream.id(), stream.streamable_bytes());
    }

    /// Write as much queued data as the windows allow, in the order the
    /// distributor picks.
    pub(crate) fn write_pending<W: FrameWriter + ?Sized>(
        &mut self,
        streams: &mut StreamRegistry,
        writer: &mut W,
    ) -> WriteOutcome {
        let mut out = WriteOutcome::default();

        // HEADERS and empty DATA cost no window and go out immediately once
        // they reach the head of their queue.
        for id in streams.ids() {
            if let Some(stream) = streams.get_mut(id) {
                if stream.queue.head_size() == Some(0) {
                    self.write_stream(stream, 0, writer, &mut out);
                }
            }
        }

        loop {
            let budget = self.connection_window.max(0) as usize;
            if budget == 0 || !self.distributor.has_streamable() {
                break;
            }
            let mut allocations: Vec<(StreamId, usize)> = Vec::new();
            self.distributor.distribute(budget, |id, bytes| allocations.push((id, bytes)));

            let mut written = 0;
            for (id, bytes) in allocations {
                if let Some(stream) = streams.get_mut(id) {
                    written += self.write_stream(stream, bytes, writer, &mut out);
                }
            }
            if written == 0 {
                break;
            }
        }
        out
    }

    fn write_stream<W: FrameWriter + ?Sized>(
        &mut self,
        stream: &mut Stream,
        allowed: usize,
        writer: &mut W,
        out: &mut WriteOutcome,
    ) -> usize {
        let mut allowed = allowed;
        let mut written = 0;
        let mut done = Vec::new();

        while let Some(head_size) = stream.queue.head_size() {
            let max = allowed
                .min(stream.remote_window.max(0) as usize)
                .min(self.connection_window.max(0) as usize)
                .min(self.max_frame_size);
            if head_size > 0 && max == 0 {
                break;
            }
            let Some(head) = stream.queue.write_head(stream.id(), max, writer, &mut done) else {
                break;
            };
            allowed -= head.written;
            written += head.written;
            stream.remote_window -= head.written as i32;
            self.connection_window -= head.written as i32;
            if head.end_stream {
                out.ended.push(stream.id());
            }
        }

        if written > 0 || !done.is_empty() {
            out.touched.push(stream.id());
        }
        let channel = stream.channel();
        out.completed.extend(done.into_iter().map(|write| (channel, write)));
        self.refresh(stream);
        written
    }
}
