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

//! # Homeworks Client
//!
//! Async client for Lutron Homeworks processors with login handling, activity monitoring and
//! automatic reconnection.
//!
//! ## Features
//!
//! - **Login Handshake** - Answers the controller's `LOGIN:` prompt with configured credentials
//! - **Monitoring** - Enables keypad, LED and dimmer reports after every login
//! - **Reconnection Support** - Reconnects with exponential backoff and tells listeners
//! - **Listener Fan-out** - Callbacks per client or per device address, isolated from each other
//! - **Async-First** - Built on Tokio; any `AsyncRead + AsyncWrite` stream can be the transport
//!
//! ## Quick Start
//!
//! ```no_run
//! use homeworks_client::{ClientConfig, Credentials, HomeworksClient, Notification};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::new("192.168.1.50", 23)
//!         .with_credentials(Credentials::password("lutron"));
//!
//!     let client = HomeworksClient::new(config);
//!     client.subscribe(|notification| match notification {
//!         Notification::Event(event) => println!("{event}"),
//!         other => println!("{other:?}"),
//!     });
//!     client.connect().await?;
//!
//!     let dimmer = "[01:02:03:04]".parse()?;
//!     client.set_light_level(dimmer, 75, 2, 0).await?;
//!
//!     client.close().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Per-Device Listeners
//!
//! ```no_run
//! # use homeworks_client::{HomeworksClient, HomeworksEvent, Notification};
//! # fn example(client: &HomeworksClient) -> Result<(), homeworks_client::CodecError> {
//! let keypad = "[01:04:10]".parse()?;
//! let id = client.subscribe_address(keypad, |notification| {
//!     if let Notification::Event(HomeworksEvent::ButtonPress { button, .. }) = notification {
//!         println!("button {button} pressed");
//!     }
//! });
//! client.unsubscribe(id);
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod connection;
mod dispatcher;
mod error;
mod supervisor;
mod transport;

pub use client::HomeworksClient;
pub use config::{ClientConfig, Credentials, DEFAULT_PORT, HeartbeatConfig, ReconnectPolicy};
pub use connection::LinkState;
pub use dispatcher::{Dispatcher, Notification, SubscriptionId};
pub use error::{ClientError, Result};
pub use transport::{BoxedTransport, Connector, TcpConnector, Transport};

// Re-export protocol types used in the client API
pub use homeworks_protocol::{Address, CodecError, Command, HomeworksEvent, LedState};
