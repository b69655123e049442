//! Integration tests for the stream multiplexer
//!
//! Every test drives a `Connection<Vec<Frame>>`: frames the connection
//! would send are recorded, peer frames are fed in as `FrameEvent`s.

use bytes::Bytes;
use h2_mux::{Config, Connection, Event, Frame, FrameEvent, Header, Role, StreamHandle, StreamId};

mod distribution;
mod flow_control;
mod lifecycle;

pub type TestConnection = Connection<Vec<Frame>>;

pub fn connection(role: Role, config: Config) -> TestConnection {
    let mut conn = Connection::new(role, config, Vec::new()).unwrap();
    conn.writer_mut().clear();
    conn
}

pub fn client() -> TestConnection {
    connection(Role::Client, Config::default())
}

pub fn server() -> TestConnection {
    connection(Role::Server, Config::default())
}

/// Acknowledge our initial SETTINGS so local limits take effect.
pub fn ack_settings(conn: &mut TestConnection) {
    conn.handle_frame(FrameEvent::Settings {
        ack: true,
        settings: Vec::new(),
    })
    .unwrap();
}

/// Apply peer SETTINGS and drop the ACK we answer with.
pub fn peer_settings(conn: &mut TestConnection, settings: Vec<(u16, u32)>) {
    conn.handle_frame(FrameEvent::Settings { ack: false, settings })
        .unwrap();
    conn.writer_mut().retain(|f| *f != Frame::SettingsAck);
}

/// New local stream with its request HEADERS queued.
pub fn open_stream(conn: &mut TestConnection) -> StreamHandle {
    let handle = conn.new_stream().unwrap();
    conn.channel(handle)
        .unwrap()
        .write_headers(vec![Header::new(":method", "POST")], false)
        .unwrap();
    handle
}

pub fn headers(stream_id: StreamId, end_stream: bool) -> FrameEvent {
    FrameEvent::Headers {
        stream_id,
        headers: vec![Header::new(":path", "/")],
        priority: None,
        end_stream,
    }
}

pub fn data(stream_id: StreamId, len: usize, end_stream: bool) -> FrameEvent {
    FrameEvent::Data {
        stream_id,
        data: Bytes::from(vec![0u8; len]),
        padding: 0,
        end_stream,
    }
}

pub fn window_update(stream_id: StreamId, increment: u32) -> FrameEvent {
    FrameEvent::WindowUpdate { stream_id, increment }
}

pub fn drain_events(conn: &mut TestConnection) -> Vec<Event> {
    std::iter::from_fn(|| conn.poll_event()).collect()
}

/// Flow-controlled bytes (payload plus padding) written on `stream_id`.
pub fn data_bytes(frames: &[Frame], stream_id: StreamId) -> usize {
    frames
        .iter()
        .map(|f| match f {
            Frame::Data {
                stream_id: id,
                data,
                padding,
                ..
            } if *id == stream_id => data.len() + padding,
            _ => 0,
        })
        .sum()
}

pub fn closed_streams(events: &[Event]) -> Vec<StreamId> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::StreamClosed { stream_id, .. } => Some(*stream_id),
            _ => None,
        })
        .collect()
}
