//! Connection configuration and the SETTINGS values exchanged with the peer.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::frame::{error_code, settings_id};

/// Protocol default for every flow-control window (RFC 7540 Section 6.9.2).
pub const DEFAULT_WINDOW_SIZE: u32 = 65_535;
/// Largest legal flow-control window.
pub const MAX_WINDOW_SIZE: u32 = 0x7FFF_FFFF;
pub const DEFAULT_MAX_FRAME_SIZE: u32 = 16_384;
pub const MAX_FRAME_SIZE_UPPER_BOUND: u32 = 16_777_215;
pub const DEFAULT_WINDOW_UPDATE_RATIO: f32 = 0.5;
pub const DEFAULT_HIGH_WATERMARK: usize = 64 * 1024;
pub const DEFAULT_MAX_CONSECUTIVE_EMPTY_FRAMES: usize = 2;
pub const DEFAULT_MAX_PRIORITY_PLACEHOLDERS: usize = 5;

/// Local knobs for one connection.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct Config {
    /// Window granted to each new inbound stream (SETTINGS_INITIAL_WINDOW_SIZE).
    pub initial_window_size: u32,
    /// Largest frame we accept, and the largest single allocation handed to
    /// a stream when writing (capped further by the peer's setting).
    pub max_frame_size: u32,
    /// Limit on concurrent peer-initiated streams. `None` means unlimited.
    pub max_concurrent_streams: Option<u32>,
    /// Limit on decoded header list size we accept. `None` means unlimited.
    pub max_header_list_size: Option<u32>,
    /// Whether we accept server push. Only meaningful for clients.
    pub enable_push: bool,
    /// Fraction of a window that may remain unacknowledged before a
    /// WINDOW_UPDATE is sent. Must lie strictly between 0 and 1.
    pub window_update_ratio: f32,
    /// Inbound connection-level window. Values above the protocol default
    /// are announced with a WINDOW_UPDATE on stream 0 at startup.
    pub connection_window_size: u32,
    /// Queued flow-control size above which a stream stops being writable.
    pub write_buffer_high_watermark: usize,
    /// Consecutive zero-length DATA frames without END_STREAM tolerated
    /// before the peer is treated as abusive. 0 disables the guard.
    pub max_consecutive_empty_frames: usize,
    /// Priority-tree nodes kept for streams that are not open. The oldest
    /// childless one is dropped when the limit is passed.
    pub max_priority_placeholders: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            initial_window_size: DEFAULT_WINDOW_SIZE,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            max_concurrent_streams: None,
            max_header_list_size: None,
            enable_push: true,
            window_update_ratio: DEFAULT_WINDOW_UPDATE_RATIO,
            connection_window_size: DEFAULT_WINDOW_SIZE,
            write_buffer_high_watermark: DEFAULT_HIGH_WATERMARK,
            max_consecutive_empty_frames: DEFAULT_MAX_CONSECUTIVE_EMPTY_FRAMES,
            max_priority_placeholders: DEFAULT_MAX_PRIORITY_PLACEHOLDERS,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.initial_window_size > MAX_WINDOW_SIZE {
            return Err(Error::Config(format!(
                "initial_window_size {} exceeds {}",
                self.initial_window_size, MAX_WINDOW_SIZE
            )));
        }
        if self.connection_window_size > MAX_WINDOW_SIZE {
            return Err(Error::Config(format!(
                "connection_window_size {} exceeds {}",
                self.connection_window_size, MAX_WINDOW_SIZE
            )));
        }
        if !(DEFAULT_MAX_FRAME_SIZE..=MAX_FRAME_SIZE_UPPER_BOUND).contains(&self.max_frame_size) {
            return Err(Error::Config(format!(
                "max_frame_size {} outside {}..={}",
                self.max_frame_size, DEFAULT_MAX_FRAME_SIZE, MAX_FRAME_SIZE_UPPER_BOUND
            )));
        }
        if !(self.window_update_ratio > 0.0 && self.window_update_ratio < 1.0) {
            return Err(Error::Config(format!(
                "window_update_ratio {} must be in (0, 1)",
                self.window_update_ratio
            )));
        }
        if self.write_buffer_high_watermark == 0 {
            return Err(Error::Config("write_buffer_high_watermark must be positive".into()));
        }
        Ok(())
    }

    /// The SETTINGS this configuration advertises to the peer.
    pub fn local_settings(&self) -> Settings {
        Settings {
            initial_window_size: self.initial_window_size,
            max_frame_size: self.max_frame_size,
            max_concurrent_streams: self.max_concurrent_streams,
            max_header_list_size: self.max_header_list_size,
            enable_push: self.enable_push,
        }
    }
}

/// One endpoint's SETTINGS state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Settings {
    pub initial_window_size: u32,
    pub max_frame_size: u32,
    pub max_concurrent_streams: Option<u32>,
    pub max_header_list_size: Option<u32>,
    pub enable_push: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            initial_window_size: DEFAULT_WINDOW_SIZE,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            max_concurrent_streams: None,
            max_header_list_size: None,
            enable_push: true,
        }
    }
}

impl Settings {
    /// Encode as SETTINGS (identifier, value) pairs. Unlimited values are
    /// omitted, defaults are always sent.
    pub fn to_pairs(&self) -> Vec<(u16, u32)> {
        let mut pairs = vec![
            (settings_id::ENABLE_PUSH, self.enable_push as u32),
            (settings_id::INITIAL_WINDOW_SIZE, self.initial_window_size),
            (settings_id::MAX_FRAME_SIZE, self.max_frame_size),
        ];
        if let Some(max) = self.max_concurrent_streams {
            pairs.push((settings_id::MAX_CONCURRENT_STREAMS, max));
        }
        if let Some(max) = self.max_header_list_size {
            pairs.push((settings_id::MAX_HEADER_LIST_SIZE, max));
        }
        pairs
    }

    /// Apply received SETTINGS pairs, validating each value.
    /// Unknown identifiers are ignored (RFC 7540 Section 6.5.2).
    pub fn apply(&mut self, pairs: &[(u16, u32)]) -> Result<()> {
        for &(id, value) in pairs {
            match id {
                settings_id::ENABLE_PUSH => {
                    self.enable_push = match value {
                        0 => false,
                        1 => true,
                        _ => {
                            return Err(Error::connection(
                                error_code::PROTOCOL_ERROR,
                                format!("invalid SETTINGS_ENABLE_PUSH {}", value),
                            ))
                        }
                    };
                }
                settings_id::INITIAL_WINDOW_SIZE => {
                    if value > MAX_WINDOW_SIZE {
                        return Err(Error::connection(
                            error_code::FLOW_CONTROL_ERROR,
                            format!("SETTINGS_INITIAL_WINDOW_SIZE {} exceeds maximum", value),
                        ));
                    }
                    self.initial_window_size = value;
                }
                settings_id::MAX_FRAME_SIZE => {
                    if !(DEFAULT_MAX_FRAME_SIZE..=MAX_FRAME_SIZE_UPPER_BOUND).contains(&value) {
                        return Err(Error::connection(
                            error_code::PROTOCOL_ERROR,
                            format!("invalid SETTINGS_MAX_FRAME_SIZE {}", value),
                        ));
                    }
                    self.max_frame_size = value;
                }
                settings_id::MAX_CONCURRENT_STREAMS => self.max_concurrent_streams = Some(value),
                settings_id::MAX_HEADER_LIST_SIZE => self.max_header_list_size = Some(value),
                // Header compression lives outside the multiplexer.
                settings_id::HEADER_TABLE_SIZE => {}
                _ => {}
            }
        }
        Ok(())
    }
}
