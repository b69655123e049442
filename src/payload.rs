//! Flow-controlled payloads and the per-stream pending queue.

use std::collections::VecDeque;

use bytes::{Bytes, BytesMut};

use crate::frame::{FrameWriter, Header, PrioritySpec, StreamId};

/// Flow-control-size charge of a frame header. Units that carry no payload
/// still cost this much when measuring queued data against watermarks.
pub const FRAME_OVERHEAD: usize = 9;

/// Most padding a single DATA frame can carry, pad-length octet included.
pub const MAX_PADDING: usize = 256;

/// Identifies one application write. Every id reaches exactly one
/// `WriteCompleted` or `WriteFailed` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WriteId(pub(crate) u64);

impl WriteId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// The unsent remainder of one write.
#[derive(Debug)]
pub(crate) struct Segment {
    data: Bytes,
    /// Padding still owed after `data`, pad-length octets included.
    padding: usize,
    write: WriteId,
}

/// A unit of queued outbound work.
#[derive(Debug)]
pub(crate) enum Payload {
    Headers {
        write: WriteId,
        headers: Vec<Header>,
        priority: Option<PrioritySpec>,
        end_stream: bool,
    },
    Data {
        segments: VecDeque<Segment>,
        len: usize,
        padding: usize,
        end_stream: bool,
    },
}

impl Payload {
    pub(crate) fn headers(
        write: WriteId,
        headers: Vec<Header>,
        priority: Option<PrioritySpec>,
        end_stream: bool,
    ) -> Self {
        Payload::Headers {
            write,
            headers,
            priority,
            end_stream,
        }
    }

    /// `padding` includes the pad-length octet.
    pub(crate) fn data(write: WriteId, data: Bytes, padding: usize, end_stream: bool) -> Self {
        let len = data.len();
        Payload::Data {
            segments: VecDeque::from([Segment { data, padding, write }]),
            len,
            padding,
            end_stream,
        }
    }

    /// Bytes this unit still debits from flow-control windows.
    pub(crate) fn size(&self) -> usize {
        match self {
            Payload::Headers { .. } => 0,
            Payload::Data { len, padding, .. } => len + padding,
        }
    }

    pub(crate) fn end_stream(&self) -> bool {
        match self {
            Payload::Headers { end_stream, .. } | Payload::Data { end_stream, .. } => *end_stream,
        }
    }

    /// Fold `next` into `self` so both go out together. Only DATA merges
    /// into DATA, and nothing merges behind END_STREAM. On refusal `next`
    /// is handed back untouched.
    pub(crate) fn merge(&mut self, next: Payload) -> Result<(), Payload> {
        let Payload::Data {
            segments,
            len,
            padding,
            end_stream,
        } = self
        else {
            return Err(next);
        };
        if *end_stream {
            return Err(next);
        }
        match next {
            Payload::Data {
                segments: next_segments,
                len: next_len,
                padding: next_padding,
                end_stream: next_end,
            } => {
                segments.extend(next_segments);
                *len += next_len;
                *padding += next_padding;
                *end_stream = next_end;
                Ok(())
            }
            next => Err(next),
        }
    }

    /// Write one frame of at most `allowed` flow-controlled bytes. Writes
    /// that become fully flushed are pushed to `done`. Returns the size
    /// still queued in this unit.
    pub(crate) fn write<W: FrameWriter + ?Sized>(
        &mut self,
        stream_id: StreamId,
        allowed: usize,
        writer: &mut W,
        done: &mut Vec<WriteId>,
    ) -> usize {
        match self {
            Payload::Headers {
                write,
                headers,
                priority,
                end_stream,
            } => {
                writer.write_headers(stream_id, headers, *priority, *end_stream);
                done.push(*write);
                0
            }
            Payload::Data {
                segments,
                len,
                padding,
                end_stream,
            } => {
                let data_len = (*len).min(allowed);
                let pad = (allowed - data_len).min(*padding).min(MAX_PADDING);
                let chunk = take(segments, data_len, pad, done);
                *len -= data_len;
                *padding -= pad;
                let last = *end_stream && *len + *padding == 0;
                writer.write_data(stream_id, chunk, pad, last);
                *len + *padding
            }
        }
    }

    /// Every write still owed a completion by this unit.
    pub(crate) fn into_writes(self) -> Vec<WriteId> {
        match self {
            Payload::Headers { write, .. } => vec![write],
            Payload::Data { segments, .. } => segments.into_iter().map(|s| s.write).collect(),
        }
    }
}

/// Remove `n` data bytes and then `pad` padding bytes from `segments`.
/// A write completes once both its data and its own padding are gone, and
/// completions keep queue order. Padding is only taken after all data.
fn take(segments: &mut VecDeque<Segment>, n: usize, pad: usize, done: &mut Vec<WriteId>) -> Bytes {
    let mut pieces: Vec<Bytes> = Vec::new();
    let mut remaining = n;
    for segment in segments.iter_mut() {
        if remaining == 0 {
            break;
        }
        let cut = segment.data.len().min(remaining);
        if cut > 0 {
            pieces.push(segment.data.split_to(cut));
            remaining -= cut;
        }
    }

    let mut pad = pad;
    for segment in segments.iter_mut() {
        if pad == 0 {
            break;
        }
        let paid = segment.padding.min(pad);
        segment.padding -= paid;
        pad -= paid;
    }

    while let Some(front) = segments.front() {
        if !front.data.is_empty() || front.padding > 0 {
            break;
        }
        if let Some(segment) = segments.pop_front() {
            done.push(segment.write);
        }
    }

    match pieces.len() {
        0 => Bytes::new(),
        1 => pieces.pop().unwrap_or_default(),
        _ => {
            let mut joined = BytesMut::with_capacity(n);
            for piece in pieces {
                joined.extend_from_slice(&piece);
            }
            joined.freeze()
        }
    }
}

/// Outcome of writing one frame from the head of a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct HeadWrite {
    pub(crate) written: usize,
    pub(crate) end_stream: bool,
}

/// Per-stream FIFO of outbound units. Adjacent DATA units are merged at
/// enqueue time.
#[derive(Debug, Default)]
pub(crate) struct PendingQueue {
    units: VecDeque<Payload>,
    bytes: usize,
}

impl PendingQueue {
    pub(crate) fn push(&mut self, payload: Payload) {
        self.bytes += payload.size();
        let payload = match self.units.back_mut() {
            Some(tail) => match tail.merge(payload) {
                Ok(()) => return,
                Err(payload) => payload,
            },
            None => payload,
        };
        self.units.push_back(payload);
    }

    /// Flow-controlled bytes still queued.
    pub(crate) fn pending_bytes(&self) -> usize {
        self.bytes
    }

    /// Queued size in watermark units: payload bytes plus a frame header
    /// per unit.
    pub(crate) fn estimated_size(&self) -> usize {
        self.bytes + self.units.len() * FRAME_OVERHEAD
    }

    pub(crate) fn head_size(&self) -> Option<usize> {
        self.units.front().map(Payload::size)
    }

    /// Write one frame from the head unit, popping it once it is empty.
    pub(crate) fn write_head<W: FrameWriter + ?Sized>(
        &mut self,
        stream_id: StreamId,
        allowed: usize,
        writer: &mut W,
        done: &mut Vec<WriteId>,
    ) -> Option<HeadWrite> {
        let head = self.units.front_mut()?;
        let before = head.size();
        let after = head.write(stream_id, allowed, writer, done);
        let written = before - after;
        self.bytes -= written;
        let finished = after == 0;
        let end_stream = finished && head.end_stream();
        if finished {
            self.units.pop_front();
        }
        Some(HeadWrite { written, end_stream })
    }

    /// Remove every unit, yielding the writes they still owe.
    pub(crate) fn drain(&mut self) -> Vec<WriteId> {
        self.bytes = 0;
        self.units.drain(..).flat_map(Payload::into_writes).collect()
    }
}
