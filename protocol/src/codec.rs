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

use crate::consts::{CR, LF, LINE_ENDING, report};
use crate::framer::next_line;
use crate::{CodecError, Command, HomeworksEvent};
use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::{trace, warn};

/// A codec for the Homeworks line protocol.
///
/// Decoding frames the read buffer into lines and classifies each one as a
/// [`HomeworksEvent`]. The controller sends its `LOGIN: ` prompt without a terminator, so an
/// unterminated remainder that is exactly the prompt is surfaced as
/// [`HomeworksEvent::LoginPrompt`] as well.
///
/// Encoding accepts a [`Command`], which is validated in full before anything is appended to
/// the destination buffer, or a raw `&str` line. Both are terminated with CR LF; a raw line
/// that already contains CR or LF is rejected.
#[derive(Clone, Debug, Default)]
pub struct HomeworksCodec {
    lines_decoded: u64,
}

impl HomeworksCodec {
    /// Creates a new instance of `HomeworksCodec`.
    pub fn new() -> HomeworksCodec {
        HomeworksCodec::default()
    }

    /// Number of lines decoded since this codec was created
    pub fn lines_decoded(&self) -> u64 {
        self.lines_decoded
    }

    fn decoded(&mut self, line: &str) -> HomeworksEvent {
        self.lines_decoded += 1;
        let event = HomeworksEvent::decode(line);
        if let HomeworksEvent::Unknown { raw } = &event {
            trace!(line = %raw, "Unrecognized line");
        }
        event
    }
}

fn is_login_prompt(partial: &[u8]) -> bool {
    partial.trim_ascii() == report::LOGIN_PROMPT.as_bytes()
}

impl Decoder for HomeworksCodec {
    type Item = HomeworksEvent;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<HomeworksEvent>, Self::Error> {
        if let Some(line) = next_line(src) {
            return Ok(Some(self.decoded(&line)));
        }
        if is_login_prompt(src) {
            src.clear();
            self.lines_decoded += 1;
            return Ok(Some(HomeworksEvent::LoginPrompt));
        }
        Ok(None)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<HomeworksEvent>, Self::Error> {
        if let Some(event) = self.decode(src)? {
            return Ok(Some(event));
        }
        if src.trim_ascii().is_empty() {
            src.clear();
            return Ok(None);
        }
        let rest = src.split();
        warn!(bytes = rest.len(), "Stream ended inside an unterminated line");
        Ok(Some(self.decoded(&String::from_utf8_lossy(&rest))))
    }
}

impl Encoder<&str> for HomeworksCodec {
    type Error = CodecError;

    fn encode(&mut self, item: &str, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if item.bytes().any(|b| b == CR || b == LF) {
            return Err(CodecError::EmbeddedTerminator(item.to_string()));
        }
        dst.reserve(item.len() + LINE_ENDING.len());
        dst.put_slice(item.as_bytes());
        dst.put_slice(LINE_ENDING.as_bytes());
        Ok(())
    }
}

impl Encoder<String> for HomeworksCodec {
    type Error = CodecError;

    fn encode(&mut self, item: String, dst: &mut BytesMut) -> Result<(), Self::Error> {
        self.encode(item.as_str(), dst)
    }
}

impl Encoder<Command> for HomeworksCodec {
    type Error = CodecError;

    fn encode(&mut self, item: Command, dst: &mut BytesMut) -> Result<(), Self::Error> {
        self.encode(&item, dst)
    }
}

impl Encoder<&Command> for HomeworksCodec {
    type Error = CodecError;

    fn encode(&mut self, item: &Command, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let line = item.encode()?;
        self.encode(line.as_str(), dst)
    }
}
