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

//! Client configuration

use crate::{ClientError, Result};
use homeworks_protocol::Command;
use std::fmt;
use std::time::Duration;

/// Default port of the controller's network interface
pub const DEFAULT_PORT: u16 = 23;

/// Login credentials for the controller.
///
/// The controller accepts either a bare password or a `username, password` pair in answer to
/// its `LOGIN:` prompt.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Optional user name
    pub username: Option<String>,
    /// Password
    pub password: String,
}

impl Credentials {
    /// Credentials consisting of a password only
    pub fn password(password: impl Into<String>) -> Self {
        Self {
            username: None,
            password: password.into(),
        }
    }

    /// Credentials consisting of a user name and password
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: password.into(),
        }
    }

    /// The line sent in answer to the login prompt
    pub fn secret(&self) -> String {
        match &self.username {
            Some(username) => format!("{}, {}", username, self.password),
            None => self.password.clone(),
        }
    }

    pub(crate) fn login_command(&self) -> Command {
        Command::Login {
            secret: self.secret(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Idle detection for an otherwise quiet link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatConfig {
    /// Silence after which a keepalive is sent
    pub idle: Duration,
    /// Time allowed for any line to arrive after the keepalive
    pub grace: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            idle: Duration::from_secs(60),
            grace: Duration::from_secs(10),
        }
    }
}

/// Exponential backoff between reconnection attempts
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    /// Delay before the first attempt
    pub initial_delay: Duration,
    /// Upper bound for any delay
    pub max_delay: Duration,
    /// Growth factor per failed attempt, at least `1.0`
    pub multiplier: f64,
    /// Random spread added to each delay as a fraction of it, `0.0..=1.0`
    pub jitter: f64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            multiplier: 2.0,
            jitter: 0.1,
        }
    }
}

/// Homeworks client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Controller hostname or IP address
    pub host: String,

    /// Controller port
    pub port: u16,

    /// Login credentials, if the controller requires them
    pub credentials: Option<Credentials>,

    /// Bound on establishing the transport
    pub connect_timeout: Duration,

    /// Bound on the whole login exchange
    pub login_timeout: Duration,

    /// How long to wait for a login prompt when no credentials are configured
    pub prompt_wait: Duration,

    /// Keepalive behavior (None disables it)
    pub heartbeat: Option<HeartbeatConfig>,

    /// Backoff between reconnection attempts
    pub reconnect: ReconnectPolicy,

    /// Commands sent after every successful login
    pub monitoring: Vec<Command>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            credentials: None,
            connect_timeout: Duration::from_secs(10),
            login_timeout: Duration::from_secs(10),
            prompt_wait: Duration::from_secs(2),
            heartbeat: Some(HeartbeatConfig::default()),
            reconnect: ReconnectPolicy::default(),
            monitoring: Command::monitoring(),
        }
    }
}

impl ClientConfig {
    /// Create a new client configuration with the given host and port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Set the login credentials
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Set the connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the login timeout
    pub fn with_login_timeout(mut self, timeout: Duration) -> Self {
        self.login_timeout = timeout;
        self
    }

    /// Set how long to wait for an unexpected login prompt
    pub fn with_prompt_wait(mut self, wait: Duration) -> Self {
        self.prompt_wait = wait;
        self
    }

    /// Set or disable the heartbeat
    pub fn with_heartbeat(mut self, heartbeat: Option<HeartbeatConfig>) -> Self {
        self.heartbeat = heartbeat;
        self
    }

    /// Set the reconnection backoff
    pub fn with_reconnect(mut self, reconnect: ReconnectPolicy) -> Self {
        self.reconnect = reconnect;
        self
    }

    /// Replace the commands sent after login
    pub fn with_monitoring(mut self, monitoring: Vec<Command>) -> Self {
        self.monitoring = monitoring;
        self
    }

    /// Get the controller address as a string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check the configuration for values the client cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(invalid("host must not be empty"));
        }
        if self.port == 0 {
            return Err(invalid("port must not be zero"));
        }
        if self.connect_timeout.is_zero() || self.login_timeout.is_zero() {
            return Err(invalid("timeouts must be greater than zero"));
        }
        if let Some(credentials) = &self.credentials {
            credentials
                .login_command()
                .encode()
                .map_err(|_| invalid("credentials must be non-empty single-line text"))?;
        }
        if let Some(heartbeat) = &self.heartbeat
            && (heartbeat.idle.is_zero() || heartbeat.grace.is_zero())
        {
            return Err(invalid("heartbeat intervals must be greater than zero"));
        }
        let reconnect = &self.reconnect;
        if reconnect.initial_delay.is_zero() || reconnect.max_delay < reconnect.initial_delay {
            return Err(invalid("reconnect delays must satisfy 0 < initial <= max"));
        }
        if !reconnect.multiplier.is_finite() || reconnect.multiplier < 1.0 {
            return Err(invalid("reconnect multiplier must be at least 1.0"));
        }
        if !(0.0..=1.0).contains(&reconnect.jitter) {
            return Err(invalid("reconnect jitter must be within 0.0..=1.0"));
        }
        for command in &self.monitoring {
            command.encode()?;
        }
        Ok(())
    }
}

fn invalid(reason: &str) -> ClientError {
    ClientError::InvalidConfig(reason.to_string())
}
