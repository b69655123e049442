use bytes::Bytes;
use thiserror::Error;

use crate::frame::{error_code, StreamId};

pub type Result<T> = std::result::Result<T, Error>;

fn code_name(code: &u32) -> &'static str {
    error_code::name(*code)
}

/// What the connection should do after an error surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownHint {
    /// Only the affected stream or write is impacted.
    None,
    /// Stop opening streams, let active ones finish, then close.
    Graceful,
    /// Tear the connection down now.
    Hard,
}

#[derive(Error, Debug, Clone)]
pub enum Error {
    /// Scoped to one stream; resolved by RST_STREAM.
    #[error("stream {stream_id} error ({}): {message}", code_name(.code))]
    Stream {
        stream_id: StreamId,
        code: u32,
        message: String,
    },

    /// The peer reset the stream.
    #[error("stream {stream_id} reset by peer ({})", code_name(.code))]
    Reset { stream_id: StreamId, code: u32 },

    /// Fatal for the whole connection; resolved by GOAWAY and teardown.
    #[error("connection error ({}): {message}", code_name(.code))]
    Connection { code: u32, message: String },

    /// The connection was shut down while the write was still queued.
    #[error("channel closed")]
    ChannelClosed,

    /// The peer will not process this stream. Safe to retry elsewhere.
    #[error(
        "stream {stream_id} not processed: GOAWAY with last stream id {last_stream_id} ({})",
        code_name(.code)
    )]
    GoAway {
        stream_id: StreamId,
        last_stream_id: StreamId,
        code: u32,
        debug_data: Bytes,
    },

    #[error("stream identifiers exhausted")]
    StreamIdsExhausted,

    /// The stream cannot accept this operation in its current state.
    #[error("invalid operation on stream {stream_id:?}: {message}")]
    InvalidState {
        stream_id: Option<StreamId>,
        message: &'static str,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn stream(stream_id: StreamId, code: u32, message: impl Into<String>) -> Self {
        Error::Stream {
            stream_id,
            code,
            message: message.into(),
        }
    }

    pub(crate) fn connection(code: u32, message: impl Into<String>) -> Self {
        Error::Connection {
            code,
            message: message.into(),
        }
    }

    /// HTTP/2 error code carried by this error, if any.
    pub fn code(&self) -> Option<u32> {
        match self {
            Error::Stream { code, .. }
            | Error::Reset { code, .. }
            | Error::Connection { code, .. }
            | Error::GoAway { code, .. } => Some(*code),
            Error::StreamIdsExhausted => Some(error_code::NO_ERROR),
            _ => None,
        }
    }

    /// Whether the request can be safely replayed on another connection.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::GoAway { .. } => true,
            Error::Stream { code, .. } | Error::Reset { code, .. } => *code == error_code::REFUSED_STREAM,
            _ => false,
        }
    }

    pub fn is_stream_error(&self) -> bool {
        matches!(self, Error::Stream { .. } | Error::Reset { .. })
    }

    pub fn shutdown_hint(&self) -> ShutdownHint {
        match self {
            Error::Connection { .. } => ShutdownHint::Hard,
            Error::StreamIdsExhausted => ShutdownHint::Graceful,
            _ => ShutdownHint::None,
        }
    }
}
