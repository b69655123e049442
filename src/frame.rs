//! Frame-level boundary of the multiplexer.
//!
//! The multiplexer never touches wire bytes. Decoded frames come in as
//! [`FrameEvent`]s (or through the [`FrameListener`] callbacks), and every
//! frame the core wants on the wire goes out through a [`FrameWriter`].
//!
//! Reference: RFC 7540 (HTTP/2)

use bytes::Bytes;

/// Stream identifier (31 bits, high bit reserved).
pub type StreamId = u32;

/// Largest stream identifier either endpoint may use.
pub const MAX_STREAM_ID: StreamId = 0x7FFF_FFFF;

/// The connection itself, as addressed by stream-0 frames.
pub const CONNECTION_STREAM_ID: StreamId = 0;

/// HTTP/2 SETTINGS identifiers (RFC 7540 Section 6.5.2)
pub mod settings_id {
    pub const HEADER_TABLE_SIZE: u16 = 0x1;
    pub const ENABLE_PUSH: u16 = 0x2;
    pub const MAX_CONCURRENT_STREAMS: u16 = 0x3;
    pub const INITIAL_WINDOW_SIZE: u16 = 0x4;
    pub const MAX_FRAME_SIZE: u16 = 0x5;
    pub const MAX_HEADER_LIST_SIZE: u16 = 0x6;
}

/// HTTP/2 error codes (RFC 7540 Section 7)
pub mod error_code {
    pub const NO_ERROR: u32 = 0x0;
    pub const PROTOCOL_ERROR: u32 = 0x1;
    pub const INTERNAL_ERROR: u32 = 0x2;
    pub const FLOW_CONTROL_ERROR: u32 = 0x3;
    pub const SETTINGS_TIMEOUT: u32 = 0x4;
    pub const STREAM_CLOSED: u32 = 0x5;
    pub const FRAME_SIZE_ERROR: u32 = 0x6;
    pub const REFUSED_STREAM: u32 = 0x7;
    pub const CANCEL: u32 = 0x8;
    pub const COMPRESSION_ERROR: u32 = 0x9;
    pub const CONNECT_ERROR: u32 = 0xa;
    pub const ENHANCE_YOUR_CALM: u32 = 0xb;
    pub const INADEQUATE_SECURITY: u32 = 0xc;
    pub const HTTP_1_1_REQUIRED: u32 = 0xd;

    /// Symbolic name of an error code, for logs and error messages.
    pub fn name(code: u32) -> &'static str {
        match code {
            NO_ERROR => "NO_ERROR",
            PROTOCOL_ERROR => "PROTOCOL_ERROR",
            INTERNAL_ERROR => "INTERNAL_ERROR",
            FLOW_CONTROL_ERROR => "FLOW_CONTROL_ERROR",
            SETTINGS_TIMEOUT => "SETTINGS_TIMEOUT",
            STREAM_CLOSED => "STREAM_CLOSED",
            FRAME_SIZE_ERROR => "FRAME_SIZE_ERROR",
            REFUSED_STREAM => "REFUSED_STREAM",
            CANCEL => "CANCEL",
            COMPRESSION_ERROR => "COMPRESSION_ERROR",
            CONNECT_ERROR => "CONNECT_ERROR",
            ENHANCE_YOUR_CALM => "ENHANCE_YOUR_CALM",
            INADEQUATE_SECURITY => "INADEQUATE_SECURITY",
            HTTP_1_1_REQUIRED => "HTTP_1_1_REQUIRED",
            _ => "UNKNOWN",
        }
    }
}

/// A decoded HTTP/2 header field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Size of this field as counted against SETTINGS_MAX_HEADER_LIST_SIZE
    /// (RFC 7540 Section 6.5.2).
    pub fn list_size(&self) -> usize {
        self.name.len() + self.value.len() + 32
    }
}

/// Total SETTINGS_MAX_HEADER_LIST_SIZE cost of a header list.
pub fn header_list_size(headers: &[Header]) -> usize {
    headers.iter().map(Header::list_size).sum()
}

/// Stream dependency carried by HEADERS and PRIORITY frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrioritySpec {
    pub dependency: StreamId,
    /// Effective weight, 1..=256.
    pub weight: u16,
    pub exclusive: bool,
}

impl PrioritySpec {
    pub const DEFAULT_WEIGHT: u16 = 16;
    pub const MIN_WEIGHT: u16 = 1;
    pub const MAX_WEIGHT: u16 = 256;

    pub fn new(dependency: StreamId, weight: u16, exclusive: bool) -> Self {
        Self {
            dependency,
            weight: weight.clamp(Self::MIN_WEIGHT, Self::MAX_WEIGHT),
            exclusive,
        }
    }
}

impl Default for PrioritySpec {
    fn default() -> Self {
        Self::new(CONNECTION_STREAM_ID, Self::DEFAULT_WEIGHT, false)
    }
}

/// Decoded frame events consumed by the multiplexer.
#[derive(Debug, Clone)]
pub enum FrameEvent {
    /// DATA frame. `padding` counts the pad-length octet plus padding bytes,
    /// all of which are flow controlled.
    Data {
        stream_id: StreamId,
        data: Bytes,
        padding: usize,
        end_stream: bool,
    },
    /// Complete header block (HEADERS plus any CONTINUATION), already decoded.
    Headers {
        stream_id: StreamId,
        headers: Vec<Header>,
        priority: Option<PrioritySpec>,
        end_stream: bool,
    },
    PushPromise {
        stream_id: StreamId,
        promised_stream_id: StreamId,
        headers: Vec<Header>,
    },
    Priority {
        stream_id: StreamId,
        priority: PrioritySpec,
    },
    StreamReset {
        stream_id: StreamId,
        error_code: u32,
    },
    Settings {
        ack: bool,
        /// (identifier, value) pairs. Empty for ACK frames.
        settings: Vec<(u16, u32)>,
    },
    WindowUpdate {
        stream_id: StreamId,
        increment: u32,
    },
    GoAway {
        last_stream_id: StreamId,
        error_code: u32,
        debug_data: Bytes,
    },
}

/// Callback surface for decoded frames.
///
/// [`Connection`](crate::Connection) implements this; [`dispatch`] routes a
/// [`FrameEvent`] to the matching callback.
pub trait FrameListener {
    type Error;

    fn on_data(
        &mut self,
        stream_id: StreamId,
        data: Bytes,
        padding: usize,
        end_stream: bool,
    ) -> Result<(), Self::Error>;

    fn on_headers(
        &mut self,
        stream_id: StreamId,
        headers: Vec<Header>,
        priority: Option<PrioritySpec>,
        end_stream: bool,
    ) -> Result<(), Self::Error>;

    fn on_push_promise(
        &mut self,
        stream_id: StreamId,
        promised_stream_id: StreamId,
        headers: Vec<Header>,
    ) -> Result<(), Self::Error>;

    fn on_priority(&mut self, stream_id: StreamId, priority: PrioritySpec) -> Result<(), Self::Error>;

    fn on_rst_stream(&mut self, stream_id: StreamId, error_code: u32) -> Result<(), Self::Error>;

    fn on_settings(&mut self, settings: Vec<(u16, u32)>) -> Result<(), Self::Error>;

    fn on_settings_ack(&mut self) -> Result<(), Self::Error>;

    fn on_window_update(&mut self, stream_id: StreamId, increment: u32) -> Result<(), Self::Error>;

    fn on_goaway(
        &mut self,
        last_stream_id: StreamId,
        error_code: u32,
        debug_data: Bytes,
    ) -> Result<(), Self::Error>;
}

/// Route a decoded frame to the matching [`FrameListener`] callback.
pub fn dispatch<L: FrameListener + ?Sized>(listener: &mut L, event: FrameEvent) -> Result<(), L::Error> {
    match event {
        FrameEvent::Data { stream_id, data, padding, end_stream } => {
            listener.on_data(stream_id, data, padding, end_stream)
        }
        FrameEvent::Headers { stream_id, headers, priority, end_stream } => {
            listener.on_headers(stream_id, headers, priority, end_stream)
        }
        FrameEvent::PushPromise { stream_id, promised_stream_id, headers } => {
            listener.on_push_promise(stream_id, promised_stream_id, headers)
        }
        FrameEvent::Priority { stream_id, priority } => listener.on_priority(stream_id, priority),
        FrameEvent::StreamReset { stream_id, error_code } => listener.on_rst_stream(stream_id, error_code),
        FrameEvent::Settings { ack: true, .. } => listener.on_settings_ack(),
        FrameEvent::Settings { ack: false, settings } => listener.on_settings(settings),
        FrameEvent::WindowUpdate { stream_id, increment } => listener.on_window_update(stream_id, increment),
        FrameEvent::GoAway { last_stream_id, error_code, debug_data } => {
            listener.on_goaway(last_stream_id, error_code, debug_data)
        }
    }
}

/// Frame-emission surface. Implementations own wire encoding and header
/// compression; the multiplexer supplies ids, payloads and flags.
pub trait FrameWriter {
    fn write_headers(
        &mut self,
        stream_id: StreamId,
        headers: &[Header],
        priority: Option<PrioritySpec>,
        end_stream: bool,
    );

    fn write_push_promise(&mut self, stream_id: StreamId, promised_stream_id: StreamId, headers: &[Header]);

    fn write_data(&mut self, stream_id: StreamId, data: Bytes, padding: usize, end_stream: bool);

    fn write_window_update(&mut self, stream_id: StreamId, increment: u32);

    fn write_rst_stream(&mut self, stream_id: StreamId, error_code: u32);

    fn write_goaway(&mut self, last_stream_id: StreamId, error_code: u32, debug_data: Bytes);

    fn write_settings(&mut self, settings: &[(u16, u32)]);

    fn write_settings_ack(&mut self);
}

/// An outbound frame intent, as recorded by `Vec<Frame>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Headers {
        stream_id: StreamId,
        headers: Vec<Header>,
        priority: Option<PrioritySpec>,
        end_stream: bool,
    },
    PushPromise {
        stream_id: StreamId,
        promised_stream_id: StreamId,
        headers: Vec<Header>,
    },
    Data {
        stream_id: StreamId,
        data: Bytes,
        padding: usize,
        end_stream: bool,
    },
    WindowUpdate {
        stream_id: StreamId,
        increment: u32,
    },
    RstStream {
        stream_id: StreamId,
        error_code: u32,
    },
    GoAway {
        last_stream_id: StreamId,
        error_code: u32,
        debug_data: Bytes,
    },
    Settings(Vec<(u16, u32)>),
    SettingsAck,
}

impl FrameWriter for Vec<Frame> {
    fn write_headers(
        &mut self,
        stream_id: StreamId,
        headers: &[Header],
        priority: Option<PrioritySpec>,
        end_stream: bool,
    ) {
        self.push(Frame::Headers {
            stream_id,
            headers: headers.to_vec(),
            priority,
            end_stream,
        });
    }

    fn write_push_promise(&mut self, stream_id: StreamId, promised_stream_id: StreamId, headers: &[Header]) {
        self.push(Frame::PushPromise {
            stream_id,
            promised_stream_id,
            headers: headers.to_vec(),
        });
    }

    fn write_data(&mut self, stream_id: StreamId, data: Bytes, padding: usize, end_stream: bool) {
        self.push(Frame::Data {
            stream_id,
            data,
            padding,
            end_stream,
        });
    }

    fn write_window_update(&mut self, stream_id: StreamId, increment: u32) {
        self.push(Frame::WindowUpdate { stream_id, increment });
    }

    fn write_rst_stream(&mut self, stream_id: StreamId, error_code: u32) {
        self.push(Frame::RstStream { stream_id, error_code });
    }

    fn write_goaway(&mut self, last_stream_id: StreamId, error_code: u32, debug_data: Bytes) {
        self.push(Frame::GoAway {
            last_stream_id,
            error_code,
            debug_data,
        });
    }

    fn write_settings(&mut self, settings: &[(u16, u32)]) {
        self.push(Frame::Settings(settings.to_vec()));
    }

    fn write_settings_ack(&mut self) {
        self.push(Frame::SettingsAck);
    }
}
