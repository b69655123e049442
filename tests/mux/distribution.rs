//! Tests for priority-weighted distribution of the connection window

use bytes::Bytes;
use h2_mux::{error_code, settings_id, Frame, FrameEvent, Header, PrioritySpec, StreamHandle};

use crate::{client, data_bytes, headers, open_stream, peer_settings, server, window_update, TestConnection};

fn write(conn: &mut TestConnection, handle: StreamHandle, len: usize) {
    conn.channel(handle)
        .unwrap()
        .write_data(Bytes::from(vec![0u8; len]), false)
        .unwrap();
}

/// Client whose peer grants large stream windows, so only the connection
/// window limits writes.
fn roomy_client() -> TestConnection {
    let mut conn = client();
    peer_settings(&mut conn, vec![(settings_id::INITIAL_WINDOW_SIZE, 1 << 20)]);
    conn
}

#[test]
fn test_equal_weights_share_the_connection_window() {
    let mut conn = roomy_client();
    let handles: Vec<_> = (0..3).map(|_| open_stream(&mut conn)).collect();
    for &handle in &handles {
        write(&mut conn, handle, 100_000);
    }
    conn.flush();

    let written: Vec<usize> = [1, 3, 5].iter().map(|&id| data_bytes(conn.writer(), id)).collect();
    assert_eq!(written.iter().sum::<usize>(), 65_535);
    for (id, bytes) in [1, 3, 5].iter().zip(&written) {
        assert!(
            bytes.abs_diff(65_535 / 3) <= 16_384,
            "stream {} got {} bytes",
            id,
            bytes
        );
    }
}

#[test]
fn test_fair_over_repeated_rounds() {
    let mut conn = roomy_client();
    let handles: Vec<_> = (0..3).map(|_| open_stream(&mut conn)).collect();
    for &handle in &handles {
        write(&mut conn, handle, 500_000);
    }
    conn.flush();
    for _ in 0..3 {
        conn.handle_frame(window_update(0, 10_001)).unwrap();
    }

    let total = 65_535 + 3 * 10_001;
    let written: Vec<usize> = [1, 3, 5].iter().map(|&id| data_bytes(conn.writer(), id)).collect();
    assert_eq!(written.iter().sum::<usize>(), total);
    for bytes in written {
        assert!(bytes.abs_diff(total / 3) <= 16_384);
    }
}

#[test]
fn test_weights_split_proportionally() {
    let mut conn = roomy_client();
    let heavy = conn.new_stream().unwrap();
    let light = conn.new_stream().unwrap();
    conn.channel(heavy)
        .unwrap()
        .set_priority(PrioritySpec::new(0, 32, false))
        .unwrap();
    for handle in [heavy, light] {
        conn.channel(handle)
            .unwrap()
            .write_headers(vec![Header::new(":method", "PUT")], false)
            .unwrap();
        write(&mut conn, handle, 100_000);
    }
    conn.flush();

    assert_eq!(data_bytes(conn.writer(), 1), 43_690);
    assert_eq!(data_bytes(conn.writer(), 3), 21_845);
    assert!(conn.writer().iter().any(|f| matches!(
        f,
        Frame::Headers { stream_id: 1, priority: Some(p), .. } if p.weight == 32
    )));
}

#[test]
fn test_dependent_stream_gets_what_parent_leaves() {
    let mut conn = client();
    let parent = open_stream(&mut conn);
    let child = conn.new_stream().unwrap();
    conn.channel(child)
        .unwrap()
        .set_priority(PrioritySpec::new(1, 16, false))
        .unwrap();
    conn.channel(child).unwrap().write_headers(Vec::new(), false).unwrap();
    write(&mut conn, parent, 40_000);
    write(&mut conn, child, 40_000);
    conn.flush();

    assert_eq!(conn.distributor().parent(3), Some(1));
    assert_eq!(data_bytes(conn.writer(), 1), 40_000);
    assert_eq!(data_bytes(conn.writer(), 3), 25_535);
}

#[test]
fn test_blocked_stream_does_not_hold_back_siblings() {
    let mut conn = client();
    peer_settings(&mut conn, vec![(settings_id::INITIAL_WINDOW_SIZE, 10)]);
    let first = open_stream(&mut conn);
    let second = open_stream(&mut conn);
    write(&mut conn, first, 1_000);
    write(&mut conn, second, 1_000);
    conn.flush();
    assert_eq!(data_bytes(conn.writer(), 1), 10);
    assert_eq!(data_bytes(conn.writer(), 3), 10);

    conn.writer_mut().clear();
    conn.handle_frame(window_update(3, 5_000)).unwrap();
    assert_eq!(data_bytes(conn.writer(), 1), 0);
    assert_eq!(data_bytes(conn.writer(), 3), 990);
    assert_eq!(conn.distributor().streamable_bytes(1), 0);
}

#[test]
fn test_frames_respect_peer_max_frame_size() {
    let mut conn = roomy_client();
    let handle = open_stream(&mut conn);
    write(&mut conn, handle, 40_000);
    conn.flush();

    let sizes: Vec<usize> = conn
        .writer()
        .iter()
        .filter_map(|f| match f {
            Frame::Data { data, .. } => Some(data.len()),
            _ => None,
        })
        .collect();
    assert_eq!(sizes, vec![16_384, 16_384, 7_232]);
}

#[test]
fn test_priority_frame_for_unknown_stream_creates_placeholders() {
    let mut conn = client();
    conn.handle_frame(FrameEvent::Priority {
        stream_id: 4,
        priority: PrioritySpec::new(6, 100, false),
    })
    .unwrap();

    let tree = conn.distributor();
    assert_eq!(tree.parent(4), Some(6));
    assert_eq!(tree.parent(6), Some(0));
    assert_eq!(tree.weight(4), Some(100));
    assert_eq!(tree.weight(6), Some(PrioritySpec::DEFAULT_WEIGHT));
}

#[test]
fn test_self_dependency_is_a_stream_error() {
    let mut conn = client();
    conn.handle_frame(FrameEvent::Priority {
        stream_id: 4,
        priority: PrioritySpec::new(4, 16, false),
    })
    .unwrap();
    assert_eq!(
        conn.writer().as_slice(),
        &[Frame::RstStream {
            stream_id: 4,
            error_code: error_code::PROTOCOL_ERROR
        }]
    );
    assert!(!conn.is_closed());
}

#[test]
fn test_closed_stream_children_move_to_its_parent() {
    let mut conn = client();
    let parent = open_stream(&mut conn);
    let child = conn.new_stream().unwrap();
    conn.channel(child)
        .unwrap()
        .set_priority(PrioritySpec::new(1, 16, false))
        .unwrap();
    conn.channel(child).unwrap().write_headers(Vec::new(), false).unwrap();
    conn.flush();

    conn.channel(parent).unwrap().reset(error_code::CANCEL);
    assert!(!conn.distributor().contains(1));
    assert_eq!(conn.distributor().parent(3), Some(0));
}

#[test]
fn test_priority_placeholders_are_bounded() {
    let mut conn = server();
    for stream_id in (1..20_000).step_by(2) {
        conn.handle_frame(FrameEvent::Priority {
            stream_id,
            priority: PrioritySpec::new(0, 16, false),
        })
        .unwrap();
    }

    let tree = conn.distributor();
    assert_eq!(tree.placeholder_count(), 5);
    assert!(!tree.contains(1));
    assert!(tree.contains(19_999));
    assert!(!conn.is_closed());
}

#[test]
fn test_opened_stream_keeps_its_placeholder_priority() {
    let mut conn = server();
    conn.handle_frame(FrameEvent::Priority {
        stream_id: 1,
        priority: PrioritySpec::new(0, 200, false),
    })
    .unwrap();
    assert_eq!(conn.distributor().placeholder_count(), 1);

    conn.handle_frame(headers(1, false)).unwrap();
    assert_eq!(conn.distributor().placeholder_count(), 0);
    assert_eq!(conn.distributor().weight(1), Some(200));
}
