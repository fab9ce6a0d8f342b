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

use crate::consts::{CR, LF};
use bytes::{Buf, BytesMut};

///
/// Splits a raw byte stream into protocol lines.
///
/// Bytes are buffered until a terminator (CR, LF or CR LF) arrives; terminators are
/// stripped and empty lines dropped, so the lines produced do not depend on how the stream was
/// chunked. Content is never interpreted: bytes that are not valid UTF-8 are replaced and
/// passed through for the codec to classify.
///
#[derive(Debug, Default)]
pub struct LineFramer {
    buffer: BytesMut,
}

impl LineFramer {
    /// Creates an empty framer.
    pub fn new() -> LineFramer {
        LineFramer::default()
    }

    /// Appends `bytes` and returns an iterator over every line completed so far.
    ///
    /// The iterator is lazy; lines it does not consume stay buffered and are returned by
    /// the next call.
    pub fn feed(&mut self, bytes: &[u8]) -> Lines<'_> {
        self.buffer.extend_from_slice(bytes);
        Lines { framer: self }
    }

    /// Unterminated bytes buffered after the last complete line.
    pub fn partial(&self) -> &[u8] {
        &self.buffer
    }

    /// Removes and returns the unterminated remainder as text.
    pub fn take_partial(&mut self) -> String {
        let rest = self.buffer.split();
        String::from_utf8_lossy(&rest).into_owned()
    }

    /// Discards everything buffered, as when a connection is replaced.
    pub fn reset(&mut self) {
        self.buffer.clear();
    }
}

/// Lazy sequence of complete lines produced by [`LineFramer::feed`].
#[derive(Debug)]
pub struct Lines<'a> {
    framer: &'a mut LineFramer,
}

impl Iterator for Lines<'_> {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        next_line(&mut self.framer.buffer)
    }
}

/// Removes the first complete, non-empty line from `buffer`.
///
/// Shared by [`LineFramer`] and the tokio codec, which frames directly on the read buffer.
pub(crate) fn next_line(buffer: &mut BytesMut) -> Option<String> {
    loop {
        let end = buffer.iter().position(|&b| b == CR || b == LF)?;
        let line = buffer.split_to(end);
        buffer.advance(1);
        if !line.is_empty() {
            return Some(String::from_utf8_lossy(&line).into_owned());
        }
    }
}
