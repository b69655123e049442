//! Tests for stream closure, GOAWAY and shutdown

use bytes::Bytes;
use h2_mux::{error_code, settings_id, Error, Event, Frame, FrameEvent, StreamState};

use crate::{
    client, closed_streams, drain_events, headers, open_stream, peer_settings, server, TestConnection,
};

/// Client with `count` open streams, each holding queued DATA the peer's
/// zero window keeps from going out.
fn client_with_stuck_streams(count: usize) -> TestConnection {
    let mut conn = client();
    peer_settings(&mut conn, vec![(settings_id::INITIAL_WINDOW_SIZE, 0)]);
    for _ in 0..count {
        let handle = open_stream(&mut conn);
        conn.channel(handle)
            .unwrap()
            .write_data(Bytes::from_static(b"request body"), false)
            .unwrap();
    }
    conn.flush();
    drain_events(&mut conn);
    conn.writer_mut().clear();
    conn
}

#[test]
fn test_goaway_fails_unprocessed_streams_as_retryable() {
    let mut conn = client_with_stuck_streams(5);
    conn.handle_frame(FrameEvent::GoAway {
        last_stream_id: 5,
        error_code: error_code::NO_ERROR,
        debug_data: Bytes::from_static(b"bye"),
    })
    .unwrap();

    let events = drain_events(&mut conn);
    assert!(matches!(
        &events[0],
        Event::GoAwayReceived { last_stream_id: 5, error_code: error_code::NO_ERROR, .. }
    ));
    assert_eq!(closed_streams(&events), vec![7, 9]);

    let failed: Vec<&Error> = events
        .iter()
        .filter_map(|e| match e {
            Event::WriteFailed { error, .. } => Some(error),
            _ => None,
        })
        .collect();
    assert_eq!(failed.len(), 2);
    assert!(failed.iter().all(|e| e.is_retryable()));
    assert!(matches!(failed[0], Error::GoAway { stream_id: 7, last_stream_id: 5, .. }));

    // Streams the peer will process are untouched, and nothing is reset.
    for id in [1, 3, 5] {
        assert_eq!(conn.stream(id).unwrap().state(), StreamState::Open);
    }
    assert!(conn.writer().is_empty());
    assert_eq!(conn.goaway_received(), Some(5));
}

#[test]
fn test_new_streams_after_goaway_fail_retryably() {
    let mut conn = client_with_stuck_streams(1);
    conn.handle_frame(FrameEvent::GoAway {
        last_stream_id: 1,
        error_code: error_code::NO_ERROR,
        debug_data: Bytes::new(),
    })
    .unwrap();

    let handle = conn.new_stream().unwrap();
    let err = conn
        .channel(handle)
        .unwrap()
        .write_headers(Vec::new(), true)
        .unwrap_err();
    assert!(err.is_retryable());
    assert!(matches!(err, Error::GoAway { stream_id: 3, last_stream_id: 1, .. }));
}

#[test]
fn test_goaway_raising_last_stream_id_is_protocol_error() {
    let mut conn = client();
    let goaway = |last_stream_id| FrameEvent::GoAway {
        last_stream_id,
        error_code: error_code::NO_ERROR,
        debug_data: Bytes::new(),
    };
    conn.handle_frame(goaway(5)).unwrap();
    let err = conn.handle_frame(goaway(7)).unwrap_err();
    assert_eq!(err.code(), Some(error_code::PROTOCOL_ERROR));
    assert!(conn.is_closed());
}

#[test]
fn test_shutdown_fails_everything_exactly_once() {
    let mut conn = client_with_stuck_streams(3);
    conn.shutdown();

    let events = drain_events(&mut conn);
    let mut closed = closed_streams(&events);
    closed.sort_unstable();
    assert_eq!(closed, vec![1, 3, 5]);

    let failed: Vec<&Error> = events
        .iter()
        .filter_map(|e| match e {
            Event::WriteFailed { error, .. } => Some(error),
            _ => None,
        })
        .collect();
    assert_eq!(failed.len(), 3);
    assert!(failed.iter().all(|e| matches!(e, Error::ChannelClosed)));
    assert!(events.iter().all(|e| match e {
        Event::StreamClosed { error, .. } => matches!(error, Some(Error::ChannelClosed)),
        _ => true,
    }));

    conn.shutdown();
    assert!(conn.poll_event().is_none());
    assert!(conn.is_closed());
    assert!(matches!(conn.new_stream(), Err(Error::ChannelClosed)));
    assert!(matches!(
        conn.handle_frame(headers(2, false)),
        Err(Error::ChannelClosed)
    ));
}

#[test]
fn test_shutdown_keeps_unread_data_readable() {
    let mut conn = server();
    conn.handle_frame(headers(1, true)).unwrap();
    let handle = conn.stream(1).unwrap().channel();
    conn.shutdown();

    let mut channel = conn.channel(handle).unwrap();
    assert!(matches!(channel.read(), Some(h2_mux::Inbound::Headers { end_stream: true, .. })));
    assert!(channel.read().is_none());
    assert!(conn.channel(handle).is_none());
}

#[test]
fn test_local_reset_sends_one_rst() {
    let mut conn = client_with_stuck_streams(1);
    let handle = conn.stream(1).unwrap().channel();

    conn.channel(handle).unwrap().reset(error_code::CANCEL);
    assert!(conn.channel(handle).is_none());
    conn.handle_frame(FrameEvent::StreamReset {
        stream_id: 1,
        error_code: error_code::CANCEL,
    })
    .unwrap();

    assert_eq!(
        conn.writer().as_slice(),
        &[Frame::RstStream {
            stream_id: 1,
            error_code: error_code::CANCEL
        }]
    );
    let events = drain_events(&mut conn);
    assert_eq!(closed_streams(&events), vec![1]);
    assert!(events.iter().any(|e| matches!(
        e,
        Event::WriteFailed { error: Error::Stream { code: error_code::CANCEL, .. }, .. }
    )));
}

#[test]
fn test_peer_reset_is_not_answered() {
    let mut conn = client_with_stuck_streams(1);
    conn.handle_frame(FrameEvent::StreamReset {
        stream_id: 1,
        error_code: error_code::INTERNAL_ERROR,
    })
    .unwrap();

    assert!(conn.writer().is_empty());
    let events = drain_events(&mut conn);
    assert!(events.iter().any(|e| matches!(
        e,
        Event::StreamClosed { stream_id: 1, error: Some(Error::Reset { code: error_code::INTERNAL_ERROR, .. }), .. }
    )));
}

#[test]
fn test_rst_stream_on_idle_stream_is_connection_error() {
    let mut conn = server();
    let err = conn
        .handle_frame(FrameEvent::StreamReset {
            stream_id: 9,
            error_code: error_code::CANCEL,
        })
        .unwrap_err();
    assert_eq!(err.code(), Some(error_code::PROTOCOL_ERROR));
}

#[test]
fn test_both_end_streams_close_normally() {
    let mut conn = client();
    let handle = open_stream(&mut conn);
    conn.channel(handle)
        .unwrap()
        .write_data(Bytes::from_static(b"ping"), true)
        .unwrap();
    assert_eq!(conn.channel(handle).unwrap().state(), StreamState::Open);
    conn.flush();
    assert_eq!(conn.stream(1).unwrap().state(), StreamState::HalfClosedLocal);

    conn.handle_frame(headers(1, true)).unwrap();
    assert!(conn.stream(1).is_none());

    let events = drain_events(&mut conn);
    assert!(events.iter().any(|e| matches!(
        e,
        Event::StreamClosed { stream_id: 1, error: None, .. }
    )));
    let completed = events
        .iter()
        .filter(|e| matches!(e, Event::WriteCompleted { .. }))
        .count();
    assert_eq!(completed, 2);
    assert!(!conn.writer().iter().any(|f| matches!(f, Frame::RstStream { .. })));
}

#[test]
fn test_connection_error_sends_goaway_with_last_peer_stream() {
    let mut conn = server();
    conn.handle_frame(headers(1, false)).unwrap();
    conn.handle_frame(headers(3, false)).unwrap();
    conn.writer_mut().clear();

    let err = conn
        .handle_frame(FrameEvent::Data {
            stream_id: 0,
            data: Bytes::new(),
            padding: 0,
            end_stream: false,
        })
        .unwrap_err();
    assert!(matches!(err, Error::Connection { code: error_code::PROTOCOL_ERROR, .. }));
    assert!(matches!(
        conn.writer().as_slice(),
        [Frame::GoAway { last_stream_id: 3, error_code: error_code::PROTOCOL_ERROR, .. }]
    ));
    assert_eq!(conn.goaway_sent(), Some(3));
    assert!(conn.streams().is_empty());
}
