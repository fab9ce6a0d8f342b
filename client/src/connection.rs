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

//! Connection manager: transport, login handshake and the framed link

use crate::transport::{BoxedTransport, Connector};
use crate::{
    ClientConfig, ClientError, Credentials, Dispatcher, HeartbeatConfig, Notification, Result,
};
use futures::{SinkExt, StreamExt};
use homeworks_protocol::{Command, HomeworksCodec, HomeworksEvent};
use metrics::{counter, gauge};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;
use tokio::io::{ReadHalf, WriteHalf};
use tokio::sync::Mutex;
use tokio::time::{sleep, timeout};
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace, warn};

pub(crate) type LinkReader = FramedRead<ReadHalf<BoxedTransport>, HomeworksCodec>;
type LinkWriter = FramedWrite<WriteHalf<BoxedTransport>, HomeworksCodec>;

/// Link state (stored as atomic u8 for lock-free reads)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LinkState {
    /// No transport
    Disconnected = 0,
    /// Transport is being established
    Connecting = 1,
    /// Login handshake in progress
    Authenticating = 2,
    /// Logged in and monitoring
    Connected = 3,
    /// The last connection attempt or the live link failed
    Failed = 4,
}

impl LinkState {
    /// Convert from u8 (for atomic operations)
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Disconnected,
            1 => Self::Connecting,
            2 => Self::Authenticating,
            3 => Self::Connected,
            _ => Self::Failed,
        }
    }

    /// Convert to u8 (for atomic operations)
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Authenticating => "authenticating",
            Self::Connected => "connected",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// The single link to the controller.
///
/// Holds the write half of the live transport behind a mutex so concurrent senders never
/// interleave lines. The read half is owned by whoever runs [`Link::read_loop`].
pub(crate) struct Link {
    state: AtomicU8,
    writer: Mutex<Option<LinkWriter>>,
}

impl Link {
    pub(crate) fn new() -> Self {
        Self {
            state: AtomicU8::new(LinkState::Disconnected.as_u8()),
            writer: Mutex::new(None),
        }
    }

    pub(crate) fn state(&self) -> LinkState {
        LinkState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn set_state(&self, state: LinkState) {
        let previous = LinkState::from_u8(self.state.swap(state.as_u8(), Ordering::AcqRel));
        if previous != state {
            debug!(from = %previous, to = %state, "Link state changed");
        }
    }

    /// Establish the transport, log in and enable monitoring.
    ///
    /// On success the write half is installed, the state is `Connected` and the read half is
    /// returned for the read loop. On failure the state is `Failed`.
    #[instrument(skip_all, fields(controller = %config.address()))]
    pub(crate) async fn open(
        &self,
        config: &ClientConfig,
        connector: &dyn Connector,
    ) -> Result<LinkReader> {
        let result = self.establish(config, connector).await;
        if let Err(error) = &result {
            warn!(error = %error, "Failed to open link");
            self.set_state(LinkState::Failed);
        }
        result
    }

    async fn establish(
        &self,
        config: &ClientConfig,
        connector: &dyn Connector,
    ) -> Result<LinkReader> {
        self.set_state(LinkState::Connecting);
        let transport = match timeout(config.connect_timeout, connector.connect(config)).await {
            Ok(Ok(transport)) => transport,
            Ok(Err(error)) => return Err(error.into()),
            Err(_) => return Err(ClientError::ConnectTimeout(config.connect_timeout)),
        };

        let (read_half, write_half) = tokio::io::split(transport);
        let mut reader = FramedRead::new(read_half, HomeworksCodec::new());
        let mut writer = FramedWrite::new(write_half, HomeworksCodec::new());

        self.set_state(LinkState::Authenticating);
        authenticate(&mut reader, &mut writer, config).await?;

        for command in &config.monitoring {
            writer.feed(command).await?;
        }
        SinkExt::<&Command>::flush(&mut writer).await?;
        counter!("homeworks.commands.sent").increment(config.monitoring.len() as u64);

        *self.writer.lock().await = Some(writer);
        self.set_state(LinkState::Connected);
        gauge!("homeworks.connections.active").increment(1.0);
        info!("Connected to controller");
        Ok(reader)
    }

    /// Encode `command` and write it to the controller.
    pub(crate) async fn send(&self, command: &Command) -> Result<()> {
        let line = command.encode()?;
        if command.is_sensitive() {
            debug!("Sending login secret");
        } else {
            debug!(line = %line, "Sending command");
        }
        self.send_line(&line).await
    }

    /// Write one complete line; the terminator is appended here.
    pub(crate) async fn send_line(&self, line: &str) -> Result<()> {
        let mut guard = self.writer.lock().await;
        if self.state() != LinkState::Connected {
            return Err(ClientError::NotConnected);
        }
        let writer = guard.as_mut().ok_or(ClientError::NotConnected)?;
        writer.send(line).await?;
        counter!("homeworks.commands.sent").increment(1);
        Ok(())
    }

    /// Drop the write half of the transport, if one is installed.
    pub(crate) async fn detach(&self) {
        if self.writer.lock().await.take().is_some() {
            gauge!("homeworks.connections.active").decrement(1.0);
            debug!("Transport released");
        }
    }

    /// Decode lines from `reader` and publish them until the link fails or `cancel` fires.
    ///
    /// Returns `Ok(())` only when cancelled.
    pub(crate) async fn read_loop(
        &self,
        reader: &mut LinkReader,
        heartbeat: Option<HeartbeatConfig>,
        dispatcher: &Dispatcher,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let mut awaiting_reply = false;
        loop {
            let quiet = quiet_period(heartbeat, awaiting_reply);
            tokio::select! {
                biased;
                () = cancel.cancelled() => return Ok(()),
                item = reader.next() => match item {
                    Some(Ok(event)) => {
                        awaiting_reply = false;
                        counter!("homeworks.lines.received").increment(1);
                        trace!(event = %event, "Received");
                        dispatcher.publish(&Notification::Event(event));
                    }
                    Some(Err(error)) => return Err(error.into()),
                    None => return Err(ClientError::ConnectionClosed),
                },
                () = wait(quiet) => {
                    if awaiting_reply {
                        let grace = quiet.unwrap_or_default();
                        return Err(ClientError::HeartbeatTimeout(grace));
                    }
                    debug!("Link idle, sending keepalive");
                    self.send(&Command::Keepalive).await?;
                    awaiting_reply = true;
                }
            }
        }
    }
}

fn quiet_period(heartbeat: Option<HeartbeatConfig>, awaiting_reply: bool) -> Option<Duration> {
    heartbeat.map(|heartbeat| {
        if awaiting_reply {
            heartbeat.grace
        } else {
            heartbeat.idle
        }
    })
}

async fn wait(period: Option<Duration>) {
    match period {
        Some(period) => sleep(period).await,
        None => std::future::pending().await,
    }
}

async fn authenticate(
    reader: &mut LinkReader,
    writer: &mut LinkWriter,
    config: &ClientConfig,
) -> Result<()> {
    match &config.credentials {
        Some(credentials) => {
            let exchange = login(reader, writer, credentials);
            match timeout(config.login_timeout, exchange).await {
                Ok(result) => result,
                Err(_) => Err(ClientError::AuthenticationFailed(format!(
                    "no login response within {:?}",
                    config.login_timeout
                ))),
            }
        }
        None => match timeout(config.prompt_wait, wait_for_prompt(reader)).await {
            Ok(Ok(())) => Err(ClientError::CredentialsRequired),
            Ok(Err(error)) => Err(error),
            Err(_) => {
                debug!("No login prompt, controller does not require credentials");
                Ok(())
            }
        },
    }
}

async fn login(
    reader: &mut LinkReader,
    writer: &mut LinkWriter,
    credentials: &Credentials,
) -> Result<()> {
    wait_for_prompt(reader).await?;
    debug!("Login prompt received, sending credentials");
    writer.send(&credentials.login_command()).await?;
    loop {
        match next_event(reader).await? {
            HomeworksEvent::LoginAccepted => return Ok(()),
            HomeworksEvent::LoginRejected | HomeworksEvent::LoginPrompt => {
                return Err(ClientError::AuthenticationFailed(
                    "controller rejected the credentials".to_string(),
                ));
            }
            other => trace!(event = %other, "Ignoring line during login"),
        }
    }
}

async fn wait_for_prompt(reader: &mut LinkReader) -> Result<()> {
    loop {
        match next_event(reader).await? {
            HomeworksEvent::LoginPrompt => return Ok(()),
            other => trace!(event = %other, "Ignoring line before login prompt"),
        }
    }
}

async fn next_event(reader: &mut LinkReader) -> Result<HomeworksEvent> {
    match reader.next().await {
        Some(Ok(event)) => Ok(event),
        Some(Err(error)) => Err(error.into()),
        None => Err(ClientError::ConnectionClosed),
    }
}
