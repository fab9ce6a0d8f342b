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

//! Client facade

use crate::connection::{Link, LinkState};
use crate::supervisor::Supervisor;
use crate::transport::{Connector, TcpConnector};
use crate::{ClientConfig, ClientError, Dispatcher, Notification, Result, SubscriptionId};
use homeworks_protocol::{Address, Command};
use std::sync::{Arc, PoisonError};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

struct Session {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl Session {
    fn is_live(&self) -> bool {
        !self.cancel.is_cancelled() && !self.task.is_finished()
    }
}

struct ClientInner {
    config: Arc<ClientConfig>,
    connector: Arc<dyn Connector>,
    link: Arc<Link>,
    dispatcher: Arc<Dispatcher>,
    session: Mutex<Option<Session>>,
    cancel: std::sync::Mutex<CancellationToken>,
}

impl ClientInner {
    fn current_token(&self) -> CancellationToken {
        self.cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn replace_token(&self) -> CancellationToken {
        let token = CancellationToken::new();
        *self.cancel.lock().unwrap_or_else(PoisonError::into_inner) = token.clone();
        token
    }
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        self.cancel
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .cancel();
    }
}

/// Client for a single Homeworks processor.
///
/// Cloning is cheap and every clone drives the same link. Once [`connect`](Self::connect)
/// succeeds, a background task reads and dispatches controller reports and transparently
/// reconnects (re-enabling monitoring) whenever the link drops. Dropping the last clone stops
/// that task.
#[derive(Clone)]
pub struct HomeworksClient {
    inner: Arc<ClientInner>,
}

impl HomeworksClient {
    /// Client connecting over TCP
    pub fn new(config: ClientConfig) -> Self {
        Self::with_connector(config, TcpConnector)
    }

    /// Client using `connector` to open its transports
    pub fn with_connector(config: ClientConfig, connector: impl Connector) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                config: Arc::new(config),
                connector: Arc::new(connector),
                link: Arc::new(Link::new()),
                dispatcher: Arc::new(Dispatcher::new()),
                session: Mutex::new(None),
                cancel: std::sync::Mutex::new(CancellationToken::new()),
            }),
        }
    }

    /// The configuration this client was built with
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Connect, log in, enable monitoring and start the background reader.
    ///
    /// Errors from this first attempt are returned; later connection loss is handled in the
    /// background and reported to listeners.
    pub async fn connect(&self) -> Result<()> {
        self.inner.config.validate()?;

        let mut session = self.inner.session.lock().await;
        if session.as_ref().is_some_and(Session::is_live) {
            return Err(ClientError::AlreadyConnected);
        }
        if let Some(stale) = session.take() {
            stale.cancel.cancel();
            if let Err(error) = stale.task.await {
                error!(error = %error, "Previous session ended abnormally");
            }
        }

        let cancel = self.inner.replace_token();
        let link = Arc::clone(&self.inner.link);
        let opened = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!("Connect cancelled by shutdown");
                link.set_state(LinkState::Disconnected);
                return Err(ClientError::NotConnected);
            }
            opened = link.open(&self.inner.config, self.inner.connector.as_ref()) => opened,
        };
        let reader = opened?;

        let supervisor = Supervisor {
            config: Arc::clone(&self.inner.config),
            connector: Arc::clone(&self.inner.connector),
            link,
            dispatcher: Arc::clone(&self.inner.dispatcher),
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(supervisor.run(reader));
        *session = Some(Session { cancel, task });
        Ok(())
    }

    /// Request shutdown without waiting for it.
    ///
    /// Safe from any context, including listener callbacks. Use [`close`](Self::close) to
    /// also wait until the transport is released.
    pub fn shutdown(&self) {
        self.inner.current_token().cancel();
    }

    /// Stop the background task, cancel any reconnect in progress and release the transport.
    ///
    /// Idempotent. Must not be awaited from inside a listener callback, which runs on the
    /// background task; call [`shutdown`](Self::shutdown) there instead.
    pub async fn close(&self) {
        self.shutdown();
        let session = self.inner.session.lock().await.take();
        if let Some(session) = session {
            session.cancel.cancel();
            if let Err(error) = session.task.await {
                error!(error = %error, "Session task ended abnormally");
            }
            info!("Client closed");
        }
        self.inner.link.detach().await;
        self.inner.link.set_state(LinkState::Disconnected);
    }

    /// Encode `command` and write it to the controller.
    ///
    /// Fails with an encoding error before anything is written, or with
    /// [`ClientError::NotConnected`] while the link is down.
    pub async fn send_command(&self, command: Command) -> Result<()> {
        self.inner.link.send(&command).await
    }

    /// Fade a dimmer to `level` percent over `fade` seconds, starting after `delay` seconds.
    pub async fn set_light_level(
        &self,
        address: Address,
        level: u8,
        fade: u32,
        delay: u32,
    ) -> Result<()> {
        self.send_command(Command::SetLightLevel {
            address,
            level,
            fade,
            delay,
        })
        .await
    }

    /// Simulate a keypad button press
    pub async fn press_button(&self, address: Address, button: u8) -> Result<()> {
        self.send_command(Command::PressButton { address, button }).await
    }

    /// Simulate a keypad button release
    pub async fn release_button(&self, address: Address, button: u8) -> Result<()> {
        self.send_command(Command::ReleaseButton { address, button })
            .await
    }

    /// Ask a dimmer for its level; the answer arrives as a `LightLevelChanged` event.
    pub async fn request_light_level(&self, address: Address) -> Result<()> {
        self.send_command(Command::RequestLightLevel { address }).await
    }

    /// Ask a keypad for its LED states; the answer arrives as a `KeypadLedChanged` event.
    pub async fn request_led_states(&self, address: Address) -> Result<()> {
        self.send_command(Command::RequestLedStates { address }).await
    }

    /// Close a contact closure output
    pub async fn close_contact(&self, address: Address) -> Result<()> {
        self.send_command(Command::CloseContact { address }).await
    }

    /// Open a contact closure output
    pub async fn open_contact(&self, address: Address) -> Result<()> {
        self.send_command(Command::OpenContact { address }).await
    }

    /// Ask for the state of a contact closure output; the answer arrives as a
    /// `ContactClosureChanged` event.
    pub async fn request_contact_state(&self, address: Address) -> Result<()> {
        self.send_command(Command::RequestContactState { address }).await
    }

    /// Register a callback for every notification
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        self.inner.dispatcher.subscribe(callback)
    }

    /// Register a callback for events about `address` plus connectivity notifications
    pub fn subscribe_address<F>(&self, address: Address, callback: F) -> SubscriptionId
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        self.inner.dispatcher.subscribe_address(address, callback)
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.dispatcher.unsubscribe(id)
    }

    /// Current state of the link
    pub fn state(&self) -> LinkState {
        self.inner.link.state()
    }

    /// Whether the link is logged in and usable
    pub fn is_connected(&self) -> bool {
        self.state() == LinkState::Connected
    }
}

impl std::fmt::Debug for HomeworksClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HomeworksClient")
            .field("controller", &self.inner.config.address())
            .field("state", &self.state())
            .field("listeners", &self.inner.dispatcher.len())
            .finish()
    }
}
