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

//! Client error types

use homeworks_protocol::CodecError;
use std::io;
use std::time::Duration;

/// Client error type
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The transport could not be established in time
    #[error("connection timed out after {0:?}")]
    ConnectTimeout(Duration),

    /// The controller rejected the credentials, or did not answer the login in time
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The controller asked for a login but no credentials are configured
    #[error("controller requires credentials but none are configured")]
    CredentialsRequired,

    /// I/O error on the transport
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// No live, authenticated link
    #[error("not connected")]
    NotConnected,

    /// The controller closed the connection
    #[error("connection closed by controller")]
    ConnectionClosed,

    /// Nothing arrived within the heartbeat grace period
    #[error("no traffic within {0:?} after keepalive")]
    HeartbeatTimeout(Duration),

    /// A command could not be encoded; nothing was written
    #[error("encoding error: {0}")]
    Encoding(CodecError),

    /// The configuration cannot be used
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// `connect` was called while a session is running
    #[error("already connected")]
    AlreadyConnected,
}

impl ClientError {
    /// Errors caused by the link itself
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Io(_)
                | Self::NotConnected
                | Self::ConnectionClosed
                | Self::HeartbeatTimeout(_)
                | Self::ConnectTimeout(_)
        )
    }

    /// Errors caused by a command that could not be rendered
    pub fn is_encoding(&self) -> bool {
        matches!(self, Self::Encoding(_))
    }

    /// Whether retrying the connection may succeed without a configuration change
    pub fn is_recoverable(&self) -> bool {
        self.is_transport()
    }
}

impl From<CodecError> for ClientError {
    fn from(error: CodecError) -> Self {
        match error {
            CodecError::Io(error) => Self::Io(error),
            other => Self::Encoding(other),
        }
    }
}

/// Client result type
pub type Result<T> = std::result::Result<T, ClientError>;
