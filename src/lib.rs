//! h2-mux: a sans-I/O HTTP/2 stream multiplexer
//!
//! This crate is the stream layer of an HTTP/2 endpoint. It takes decoded
//! frames in and emits frame intents out, and in between it runs every
//! stream of one connection: lifecycle, flow control in both directions, and
//! priority-weighted scheduling of the outbound window.
//!
//! # Features
//!
//! - **Sans-I/O Design**: No async runtime, no sockets. You feed
//!   [`FrameEvent`]s and implement [`FrameWriter`]
//! - **Flow Control**: Connection and stream windows, ratio-driven
//!   WINDOW_UPDATE, SETTINGS-driven resizing including negative windows
//! - **Priority Scheduling**: Weighted dependency tree with round-robin
//!   fairness among equal siblings
//! - **Exactly-Once Completion**: Every write ends in one `WriteCompleted`
//!   or `WriteFailed`, every stream in one `StreamClosed`
//! - **GOAWAY and Shutdown**: Retryable failures for streams the peer never
//!   processed
//!
//! # Quick Start
//!
//! ```rust
//! use bytes::Bytes;
//! use h2_mux::{Config, Connection, Event, Frame, FrameEvent, Header, Role};
//!
//! // Frames are recorded into a Vec<Frame>; a real endpoint encodes them.
//! let mut conn = Connection::new(Role::Client, Config::default(), Vec::<Frame>::new()).unwrap();
//!
//! let handle = conn.new_stream().unwrap();
//! let mut stream = conn.channel(handle).unwrap();
//! stream.write_headers(vec![Header::new(":method", "POST")], false).unwrap();
//! stream.write_data(Bytes::from_static(b"hello"), true).unwrap();
//! conn.flush();
//!
//! conn.handle_frame(FrameEvent::Headers {
//!     stream_id: 1,
//!     headers: vec![Header::new(":status", "200")],
//!     priority: None,
//!     end_stream: true,
//! })
//! .unwrap();
//!
//! while let Some(event) = conn.poll_event() {
//!     if let Event::StreamClosed { stream_id, error, .. } = event {
//!         println!("stream {} closed: {:?}", stream_id, error);
//!     }
//! }
//! ```
//!
//! # Architecture
//!
//! This crate provides:
//! - Stream registry and id allocation
//! - Stream state machine (RFC 7540 Section 5.1)
//! - Inbound and outbound flow control
//! - Byte distribution over the priority tree
//! - Per-stream channels with backpressure
//!
//! It does NOT provide:
//! - Frame encoding or decoding (you provide the frames)
//! - HPACK (headers arrive and leave decoded)
//! - TCP or TLS
//!
//! # Threading
//!
//! A [`Connection`] is driven through `&mut self` only. The
//! [`StreamIdAllocator`] is the one piece that may be shared across threads.

pub mod channel;
pub mod config;
pub mod connection;
pub mod distributor;
pub mod error;
pub mod flow_control;
pub mod frame;
pub mod lifecycle;
pub mod payload;
pub mod state;
pub mod stream;

pub use channel::{Inbound, StreamChannel, StreamHandle};
pub use config::{Config, Settings};
pub use connection::{Connection, Event, Role};
pub use distributor::ByteDistributor;
pub use error::{Error, Result, ShutdownHint};
pub use flow_control::{LocalFlowController, LocalWindow, RemoteFlowController};
pub use frame::{
    error_code, settings_id, Frame, FrameEvent, FrameListener, FrameWriter, Header, PrioritySpec, StreamId,
    CONNECTION_STREAM_ID, MAX_STREAM_ID,
};
pub use lifecycle::StreamListener;
pub use payload::WriteId;
pub use state::StreamState;
pub use stream::{Stream, StreamIdAllocator, StreamRegistry};
