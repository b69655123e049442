//! Tests for inbound and outbound flow control

use bytes::Bytes;
use h2_mux::{error_code, settings_id, Config, Event, Frame, FrameEvent, Role};

use crate::{
    client, connection, data, data_bytes, headers, open_stream, peer_settings, server, window_update,
};

#[test]
fn test_large_write_stops_at_initial_window() {
    let mut conn = client();
    let handle = open_stream(&mut conn);
    conn.channel(handle)
        .unwrap()
        .write_data(Bytes::from(vec![1u8; 70_000]), false)
        .unwrap();
    conn.flush();

    assert_eq!(data_bytes(conn.writer(), 1), 65_535);
    assert_eq!(conn.channel(handle).unwrap().pending_bytes(), 4_465);
    assert_eq!(conn.connection_window(), 0);
    assert!(conn
        .writer()
        .iter()
        .all(|f| !matches!(f, Frame::Data { data, .. } if data.len() > 16_384)));

    // Connection credit alone does not help: the stream window is empty.
    conn.writer_mut().clear();
    conn.handle_frame(window_update(0, 10_000)).unwrap();
    assert_eq!(data_bytes(conn.writer(), 1), 0);

    conn.handle_frame(window_update(1, 10_000)).unwrap();
    assert_eq!(data_bytes(conn.writer(), 1), 4_465);
    assert_eq!(conn.channel(handle).unwrap().pending_bytes(), 0);
    assert_eq!(conn.connection_window(), 10_000 - 4_465);
    assert_eq!(conn.stream(1).unwrap().remote_window(), 10_000 - 4_465);
}

#[test]
fn test_settings_shrink_drives_window_negative() {
    let mut conn = client();
    let handle = open_stream(&mut conn);
    conn.channel(handle)
        .unwrap()
        .write_data(Bytes::from(vec![0u8; 60_000]), false)
        .unwrap();
    conn.flush();
    assert_eq!(conn.stream(1).unwrap().remote_window(), 5_535);

    peer_settings(&mut conn, vec![(settings_id::INITIAL_WINDOW_SIZE, 1_000)]);
    assert_eq!(conn.stream(1).unwrap().remote_window(), 5_535 - 64_535);

    conn.writer_mut().clear();
    conn.channel(handle)
        .unwrap()
        .write_data(Bytes::from(vec![0u8; 10_000]), false)
        .unwrap();
    conn.flush();
    assert_eq!(data_bytes(conn.writer(), 1), 0);

    // Back to zero: still nothing may be written.
    conn.handle_frame(window_update(1, 59_000)).unwrap();
    assert_eq!(conn.stream(1).unwrap().remote_window(), 0);
    assert_eq!(data_bytes(conn.writer(), 1), 0);

    conn.handle_frame(window_update(1, 3_000)).unwrap();
    assert_eq!(data_bytes(conn.writer(), 1), 3_000);
}

#[test]
fn test_settings_growth_overflowing_window_is_connection_error() {
    let mut conn = client();
    open_stream(&mut conn);
    conn.flush();
    conn.handle_frame(window_update(1, 0x7FFF_FFFF - 65_535)).unwrap();

    let err = conn
        .handle_frame(FrameEvent::Settings {
            ack: false,
            settings: vec![(settings_id::INITIAL_WINDOW_SIZE, 65_536)],
        })
        .unwrap_err();
    assert_eq!(err.code(), Some(error_code::FLOW_CONTROL_ERROR));
    assert!(conn.is_closed());
}

#[test]
fn test_stream_window_overflow_resets_stream() {
    let mut conn = client();
    open_stream(&mut conn);
    conn.flush();
    conn.writer_mut().clear();

    conn.handle_frame(window_update(1, 0x7FFF_FFFF)).unwrap();
    assert_eq!(
        conn.writer().as_slice(),
        &[Frame::RstStream {
            stream_id: 1,
            error_code: error_code::FLOW_CONTROL_ERROR
        }]
    );
    assert!(conn.stream(1).is_none());
    assert!(!conn.is_closed());
}

#[test]
fn test_zero_increment_on_connection_is_fatal() {
    let mut conn = client();
    let err = conn.handle_frame(window_update(0, 0)).unwrap_err();
    assert_eq!(err.code(), Some(error_code::PROTOCOL_ERROR));
    assert!(matches!(
        conn.writer().last(),
        Some(Frame::GoAway { error_code: error_code::PROTOCOL_ERROR, .. })
    ));
}

#[test]
fn test_zero_increment_on_stream_resets_it() {
    let mut conn = client();
    open_stream(&mut conn);
    conn.flush();
    conn.handle_frame(window_update(1, 0)).unwrap();
    assert!(matches!(
        conn.writer().last(),
        Some(Frame::RstStream { stream_id: 1, error_code: error_code::PROTOCOL_ERROR })
    ));
}

#[test]
fn test_reading_releases_window_updates() {
    let mut conn = server();
    conn.handle_frame(headers(1, false)).unwrap();
    conn.handle_frame(data(1, 40_000, false)).unwrap();
    assert_eq!(conn.local_connection_window(), 65_535 - 40_000);
    assert!(conn.writer().is_empty());

    let handle = conn.stream(1).unwrap().channel();
    let mut channel = conn.channel(handle).unwrap();
    channel.read();
    channel.read();

    assert_eq!(
        conn.writer().as_slice(),
        &[
            Frame::WindowUpdate { stream_id: 0, increment: 40_000 },
            Frame::WindowUpdate { stream_id: 1, increment: 40_000 },
        ]
    );
    assert_eq!(conn.local_connection_window(), 65_535);
}

#[test]
fn test_no_stream_update_after_end_of_stream() {
    let mut conn = server();
    conn.handle_frame(headers(1, false)).unwrap();
    conn.handle_frame(data(1, 40_000, true)).unwrap();

    let handle = conn.stream(1).unwrap().channel();
    let mut channel = conn.channel(handle).unwrap();
    channel.read();
    channel.read();

    assert_eq!(
        conn.writer().as_slice(),
        &[Frame::WindowUpdate { stream_id: 0, increment: 40_000 }]
    );
}

#[test]
fn test_inbound_overrun_of_connection_window_is_fatal() {
    let mut conn = server();
    conn.handle_frame(headers(1, false)).unwrap();
    let err = conn.handle_frame(data(1, 65_536, false)).unwrap_err();
    assert_eq!(err.code(), Some(error_code::FLOW_CONTROL_ERROR));
    assert!(conn.is_closed());
}

#[test]
fn test_inbound_overrun_of_stream_window_resets_stream() {
    let config = Config {
        connection_window_size: 1 << 20,
        ..Config::default()
    };
    let mut conn = connection(Role::Server, config);
    conn.handle_frame(headers(1, false)).unwrap();
    conn.handle_frame(data(1, 70_000, false)).unwrap();

    assert!(matches!(
        conn.writer().last(),
        Some(Frame::RstStream { stream_id: 1, error_code: error_code::FLOW_CONTROL_ERROR })
    ));
    assert_eq!(conn.local_connection_window(), (1 << 20) - 70_000);
    assert!(!conn.is_closed());
}

#[test]
fn test_padding_is_charged_and_returned_immediately() {
    let mut conn = server();
    conn.handle_frame(headers(1, false)).unwrap();
    conn.handle_frame(FrameEvent::Data {
        stream_id: 1,
        data: Bytes::from_static(b"abc"),
        padding: 40_000,
        end_stream: false,
    })
    .unwrap();

    // Padding alone crossed the update ratio.
    assert_eq!(
        conn.writer().as_slice(),
        &[
            Frame::WindowUpdate { stream_id: 0, increment: 40_000 },
            Frame::WindowUpdate { stream_id: 1, increment: 40_000 },
        ]
    );
    assert_eq!(conn.local_connection_window(), 65_535 - 3);
}

#[test]
fn test_unread_bytes_return_to_connection_on_reset() {
    let mut conn = server();
    conn.handle_frame(headers(1, false)).unwrap();
    conn.handle_frame(data(1, 40_000, false)).unwrap();
    conn.handle_frame(FrameEvent::StreamReset {
        stream_id: 1,
        error_code: error_code::CANCEL,
    })
    .unwrap();

    assert_eq!(
        conn.writer().as_slice(),
        &[Frame::WindowUpdate { stream_id: 0, increment: 40_000 }]
    );

    // Reading the leftovers later does not return them twice.
    let handle = std::iter::from_fn(|| conn.poll_event())
        .find_map(|e| match e {
            Event::StreamClosed { handle, .. } => Some(handle),
            _ => None,
        })
        .unwrap();
    while conn.channel(handle).and_then(|mut c| c.read()).is_some() {}
    assert_eq!(conn.writer().len(), 1);
}

#[test]
fn test_padded_write_is_flow_controlled() {
    let mut conn = client();
    peer_settings(&mut conn, vec![(settings_id::INITIAL_WINDOW_SIZE, 10)]);
    let handle = open_stream(&mut conn);
    conn.channel(handle)
        .unwrap()
        .write_data_padded(Bytes::from_static(b"abcd"), 8, true)
        .unwrap();
    conn.flush();

    let data_frames: Vec<&Frame> = conn.writer().iter().filter(|f| matches!(f, Frame::Data { .. })).collect();
    assert_eq!(
        data_frames,
        vec![&Frame::Data {
            stream_id: 1,
            data: Bytes::from_static(b"abcd"),
            padding: 6,
            end_stream: false
        }]
    );

    conn.handle_frame(window_update(1, 2)).unwrap();
    assert!(matches!(
        conn.writer().last(),
        Some(Frame::Data { stream_id: 1, padding: 2, end_stream: true, .. })
    ));
}
