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

//! Transport seam between the client and the byte stream it talks over

use crate::ClientConfig;
use async_trait::async_trait;
use std::io;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::debug;

/// Any bidirectional byte stream the client can run the protocol over
pub trait Transport: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> Transport for T {}

/// Boxed transport handed to the connection manager
pub type BoxedTransport = Box<dyn Transport>;

/// Opens transports to the controller.
///
/// [`TcpConnector`] covers the network interface; serial adapters and test doubles implement
/// this trait to hand the client any other stream.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Open a new transport for `config`
    async fn connect(&self, config: &ClientConfig) -> io::Result<BoxedTransport>;
}

/// Connects over TCP to `config.host:config.port`
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self, config: &ClientConfig) -> io::Result<BoxedTransport> {
        let stream = TcpStream::connect((config.host.as_str(), config.port)).await?;
        stream.set_nodelay(true)?;
        debug!(peer = %stream.peer_addr()?, "TCP transport established");
        Ok(Box::new(stream))
    }
}
