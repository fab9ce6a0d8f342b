//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

use crate::Address;

/// Result Type for Codec Operations
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors raised while encoding commands or reading from the underlying stream.
///
/// Decoding never produces a variant other than [`CodecError::Io`]: lines the codec cannot
/// classify are surfaced as [`HomeworksEvent::Unknown`](crate::HomeworksEvent::Unknown).
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// An I/O error occurred while reading from or writing to the underlying stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A device address could not be parsed or has fields outside the addressing scheme.
    #[error("invalid address {input:?}: {reason}")]
    InvalidAddress {
        /// The rejected input
        input: String,
        /// Why it was rejected
        reason: &'static str,
    },

    /// Light level outside `0..=100`.
    #[error("light level {0} is outside 0..=100")]
    LevelOutOfRange(u8),

    /// Keypad button number outside `1..=24`.
    #[error("button {button} on {address} is outside 1..=24")]
    ButtonOutOfRange {
        /// The keypad address
        address: Address,
        /// The rejected button number
        button: u8,
    },

    /// Fade time above the controller maximum.
    #[error("fade time {0}s exceeds the maximum of {max}s", max = crate::consts::MAX_FADE_SECONDS)]
    FadeOutOfRange(u32),

    /// Delay time above the controller maximum.
    #[error("delay time {0}s exceeds the maximum of {max}s", max = crate::consts::MAX_DELAY_SECONDS)]
    DelayOutOfRange(u32),

    /// Login secret is empty or contains characters that would break line framing.
    #[error("login secret must be non-empty and free of control characters")]
    InvalidSecret,

    /// A raw command line contains a line terminator and would reach the controller as
    /// more than one command.
    #[error("command line {0:?} contains a line terminator")]
    EmbeddedTerminator(String),
}

impl CodecError {
    /// Check if the error originated from the transport rather than from invalid parameters
    pub fn is_io(&self) -> bool {
        matches!(self, CodecError::Io(_))
    }
}
