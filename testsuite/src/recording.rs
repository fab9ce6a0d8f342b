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

//! Transport double that records and fragments writes

use async_trait::async_trait;
use homeworks_client::{BoxedTransport, ClientConfig, Connector};
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// Bytes written through every [`RecordingTransport`] of one connector, in write order
#[derive(Debug, Clone, Default)]
pub struct WriteLog {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl WriteLog {
    /// Everything written so far
    pub fn bytes(&self) -> Vec<u8> {
        self.bytes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Complete CR LF terminated lines written so far
    pub fn lines(&self) -> Vec<String> {
        let text = String::from_utf8_lossy(&self.bytes()).into_owned();
        let mut lines: Vec<String> = text.split("\r\n").map(str::to_string).collect();
        // Whatever follows the last terminator is not a complete line.
        lines.pop();
        lines
    }

    fn append(&self, bytes: &[u8]) {
        self.bytes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(bytes);
    }
}

/// Wraps another connector so every transport it opens is a [`RecordingTransport`].
pub struct RecordingConnector<C> {
    inner: C,
    log: WriteLog,
    chunk: usize,
}

impl<C: Connector> RecordingConnector<C> {
    /// Record writes in pieces of at most `chunk` bytes
    pub fn new(inner: C, chunk: usize) -> Self {
        Self {
            inner,
            log: WriteLog::default(),
            chunk: chunk.max(1),
        }
    }

    /// Shared view of the recorded bytes
    pub fn log(&self) -> WriteLog {
        self.log.clone()
    }
}

#[async_trait]
impl<C: Connector> Connector for RecordingConnector<C> {
    async fn connect(&self, config: &ClientConfig) -> io::Result<BoxedTransport> {
        let inner = self.inner.connect(config).await?;
        Ok(Box::new(RecordingTransport {
            inner,
            log: self.log.clone(),
            chunk: self.chunk,
            yield_next: false,
        }))
    }
}

/// Transport that accepts at most `chunk` bytes per write and yields between writes,
/// so a line is written in several pieces with other tasks free to run in between.
pub struct RecordingTransport {
    inner: BoxedTransport,
    log: WriteLog,
    chunk: usize,
    yield_next: bool,
}

impl AsyncRead for RecordingTransport {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for RecordingTransport {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        if this.yield_next {
            this.yield_next = false;
            cx.waker().wake_by_ref();
            return Poll::Pending;
        }
        let limit = buf.len().min(this.chunk);
        match Pin::new(&mut this.inner).poll_write(cx, &buf[..limit]) {
            Poll::Ready(Ok(written)) => {
                this.log.append(&buf[..written]);
                this.yield_next = true;
                Poll::Ready(Ok(written))
            }
            other => other,
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}
