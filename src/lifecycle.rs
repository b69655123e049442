//! Stream closure, resets, GOAWAY and shutdown.
//!
//! Every path that ends a stream funnels into `close_stream`, which runs at
//! most once per stream: the record leaves the registry at the end of it, so
//! a second call finds nothing to do. Queued writes are drained from the
//! stream's queue in the same step, which is what makes each of them fail
//! exactly once.

use bytes::Bytes;
use tracing::{debug, warn};

use crate::connection::{Connection, Event};
use crate::error::{Error, Result};
use crate::frame::{error_code, FrameWriter, StreamId};
use crate::state::StreamState;
use crate::stream::Stream;

/// Observer of stream lifecycle transitions. Listeners run synchronously,
/// in registration order, while the connection is being driven.
pub trait StreamListener {
    /// A stream record was created (idle or reserved).
    fn on_stream_added(&mut self, _stream: &Stream) {}

    /// The stream became open or half-closed and now counts as active.
    fn on_stream_active(&mut self, _stream: &Stream) {}

    fn on_stream_half_closed(&mut self, _stream: &Stream) {}

    /// The stream reached `Closed`. Still present in the registry.
    fn on_stream_closed(&mut self, _stream: &Stream) {}

    /// The stream left the registry.
    fn on_stream_removed(&mut self, _stream: &Stream) {}

    fn on_goaway_sent(&mut self, _last_stream_id: StreamId, _error_code: u32, _debug_data: &Bytes) {}

    fn on_goaway_received(&mut self, _last_stream_id: StreamId, _error_code: u32, _debug_data: &Bytes) {}
}

impl<W: FrameWriter> Connection<W> {
    pub(crate) fn notify(&mut self, stream_id: StreamId, mut f: impl FnMut(&mut Box<dyn StreamListener>, &Stream)) {
        let Some(stream) = self.streams.get(stream_id) else {
            return;
        };
        for listener in self.listeners.iter_mut() {
            f(listener, stream);
        }
    }

    /// Move a stream to `next`, telling listeners about newly active and
    /// half-closed streams. Reaching `Closed` closes the stream.
    pub(crate) fn set_state(&mut self, stream_id: StreamId, next: StreamState) {
        let Some(stream) = self.streams.get_mut(stream_id) else {
            return;
        };
        let previous = std::mem::replace(&mut stream.state, next);
        if previous == next {
            return;
        }
        debug!(stream_id, ?previous, ?next, "stream state");
        if next.is_closed() {
            self.close_stream(stream_id, None);
            return;
        }
        if next.is_active() && !previous.is_active() {
            self.notify(stream_id, |l, s| l.on_stream_active(s));
        }
        if next.is_half_closed() && !previous.is_half_closed() {
            self.notify(stream_id, |l, s| l.on_stream_half_closed(s));
        }
    }

    /// Close `stream_id`. `error` is `None` for a normal close after both
    /// sides sent END_STREAM. Does nothing when the stream is already gone.
    pub(crate) fn close_stream(&mut self, stream_id: StreamId, error: Option<Error>) {
        let Some(stream) = self.streams.get_mut(stream_id) else {
            return;
        };
        stream.state = StreamState::Closed;
        let handle = stream.channel();
        let failed = self.remote_flow.cancel(stream);
        let unconsumed = stream.local_window.unconsumed();
        self.remote_flow.remove(stream_id);

        // Bytes the application never read go back to the connection.
        if unconsumed > 0 {
            self.local_flow.consume(stream_id, None, unconsumed, &mut self.writer);
        }

        if !failed.is_empty() {
            let cause = error
                .clone()
                .unwrap_or_else(|| Error::stream(stream_id, error_code::STREAM_CLOSED, "stream closed"));
            for write in failed {
                self.events.push_back(Event::WriteFailed {
                    handle,
                    write,
                    error: cause.clone(),
                });
            }
        }

        self.notify(stream_id, |l, s| l.on_stream_closed(s));
        if let Some(stream) = self.streams.remove(stream_id) {
            for listener in self.listeners.iter_mut() {
                listener.on_stream_removed(&stream);
            }
        }

        if let Some(channel) = self.channel_state_mut(handle) {
            channel.finished = true;
            for (_, flow_bytes) in channel.inbound.iter_mut() {
                *flow_bytes = 0;
            }
            if channel.inbound.is_empty() {
                self.channels.remove(handle.index());
            }
        }

        match &error {
            None => debug!(stream_id, "stream closed"),
            Some(err) => debug!(stream_id, error = %err, "stream closed"),
        }
        self.events.push_back(Event::StreamClosed {
            handle,
            stream_id,
            error,
        });
    }

    /// Send RST_STREAM (once) and close the stream with `error`.
    pub(crate) fn reset_stream(&mut self, stream_id: StreamId, code: u32, error: Error) {
        let Some(stream) = self.streams.get_mut(stream_id) else {
            return;
        };
        if !stream.reset_sent && stream.known_to_peer {
            self.writer.write_rst_stream(stream_id, code);
        }
        stream.reset_sent = true;
        debug!(stream_id, code = error_code::name(code), "stream reset");
        self.close_stream(stream_id, Some(error));
    }

    /// Send GOAWAY naming the last peer stream we will process. Only the
    /// first call writes a frame; returns whether this one did.
    pub fn go_away(&mut self, error_code: u32, debug_data: Bytes) -> bool {
        if self.goaway_sent.is_some() || self.closed {
            return false;
        }
        let last_stream_id = self.last_remote_stream_id;
        self.goaway_sent = Some(last_stream_id);
        debug!(last_stream_id, code = crate::frame::error_code::name(error_code), "sending GOAWAY");
        self.writer.write_goaway(last_stream_id, error_code, debug_data.clone());
        for listener in self.listeners.iter_mut() {
            listener.on_goaway_sent(last_stream_id, error_code, &debug_data);
        }
        true
    }

    /// Fail every local stream the peer will not process.
    pub(crate) fn handle_goaway(
        &mut self,
        last_stream_id: StreamId,
        error_code: u32,
        debug_data: Bytes,
    ) -> Result<()> {
        if let Some((previous, _, _)) = &self.goaway_received {
            if last_stream_id > *previous {
                return Err(Error::connection(
                    crate::frame::error_code::PROTOCOL_ERROR,
                    format!("GOAWAY last stream id raised from {} to {}", previous, last_stream_id),
                ));
            }
        }
        debug!(last_stream_id, code = crate::frame::error_code::name(error_code), "GOAWAY received");
        self.goaway_received = Some((last_stream_id, error_code, debug_data.clone()));
        for listener in self.listeners.iter_mut() {
            listener.on_goaway_received(last_stream_id, error_code, &debug_data);
        }
        self.events.push_back(Event::GoAwayReceived {
            last_stream_id,
            error_code,
            debug_data: debug_data.clone(),
        });

        let mut doomed: Vec<StreamId> = self
            .streams
            .iter()
            .filter(|s| s.is_locally_initiated() && s.id() > last_stream_id)
            .map(Stream::id)
            .collect();
        doomed.sort_unstable();
        for stream_id in doomed {
            self.close_stream(
                stream_id,
                Some(Error::GoAway {
                    stream_id,
                    last_stream_id,
                    code: error_code,
                    debug_data: debug_data.clone(),
                }),
            );
        }
        Ok(())
    }

    /// Stop the connection: every queued write and every stream fails with
    /// [`Error::ChannelClosed`]. Unread inbound data stays readable.
    pub fn shutdown(&mut self) {
        if self.closed {
            return;
        }
        debug!("connection shutdown");
        self.teardown(Error::ChannelClosed);
    }

    /// React to a fatal protocol violation: GOAWAY with the error, then
    /// fail everything with it.
    pub(crate) fn connection_error(&mut self, error: &Error) {
        if let Error::Connection { code, message } = error {
            warn!(code = error_code::name(*code), %message, "connection error");
            self.go_away(*code, Bytes::copy_from_slice(message.as_bytes()));
        }
        self.teardown(error.clone());
    }

    fn teardown(&mut self, error: Error) {
        for stream_id in self.streams.ids() {
            self.close_stream(stream_id, Some(error.clone()));
        }
        self.closed = true;
        self.channels.retain(|_, channel| {
            channel.finished = true;
            !channel.inbound.is_empty()
        });
    }
}
