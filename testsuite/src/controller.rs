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

//! Scripted mock Homeworks controller.
//!
//! [`MockController`] plays the controller side of the protocol over TCP or over in-memory
//! duplex streams handed to the client through [`MemoryConnector`]. It prompts for a login
//! when scripted to, records every line the client sends, answers level and LED queries, and
//! lets a test push reports, drop the live connection, or refuse new ones.
//!
//! ```ignore
//! let controller = MockController::start(ControllerScript::with_login("lutron")).await?;
//! let client = HomeworksClient::new(controller.client_config());
//! client.connect().await?;
//! assert!(controller.wait_for_line("DLMON").await);
//! controller.send_line("KBP, [01:04:10], 1");
//! ```

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use homeworks_client::{
    BoxedTransport, ClientConfig, Connector, Credentials, HeartbeatConfig, ReconnectPolicy,
};
use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::{Notify, mpsc};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::codec::{Framed, LinesCodec};
use tracing::{debug, trace};

/// How long the wait helpers wait before giving up
pub const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Prompt the controller sends, without a line terminator
const LOGIN_PROMPT: &[u8] = b"LOGIN: ";

/// Behavior of a [`MockController`]
#[derive(Debug, Clone)]
pub struct ControllerScript {
    /// Secret the controller asks for; `None` means no login
    pub secret: Option<String>,
    /// Lines sent as soon as a connection is accepted
    pub greeting: Vec<String>,
    /// Whether `OSREV` keepalives are answered
    pub answer_keepalive: bool,
}

impl Default for ControllerScript {
    fn default() -> Self {
        Self {
            secret: None,
            greeting: vec!["Lutron Homeworks Processor".to_string()],
            answer_keepalive: true,
        }
    }
}

impl ControllerScript {
    /// Controller that requires `secret` at the login prompt
    pub fn with_login(secret: impl Into<String>) -> Self {
        Self {
            secret: Some(secret.into()),
            ..Default::default()
        }
    }

    /// Stop answering keepalives
    pub fn silent(mut self) -> Self {
        self.answer_keepalive = false;
        self
    }
}

#[derive(Debug)]
enum Control {
    Line(String),
    Close,
}

struct Shared {
    script: ControllerScript,
    received: Mutex<Vec<String>>,
    levels: Mutex<HashMap<String, String>>,
    contacts: Mutex<HashMap<String, bool>>,
    current: Mutex<Option<mpsc::UnboundedSender<Control>>>,
    connections: AtomicUsize,
    accepting: AtomicBool,
    activity: Notify,
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Shared {
    fn record(&self, line: &str) {
        lock(&self.received).push(line.to_string());
        self.activity.notify_waiters();
    }

    /// Replies to a command line from an authenticated client
    fn respond(&self, line: &str) -> Vec<String> {
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        match fields.as_slice() {
            ["OSREV"] if self.script.answer_keepalive => {
                vec!["Processor 01 OS Revision 1.24".to_string()]
            }
            ["OSREV" | "PROMPTOFF" | "KBMON" | "KLMON" | "DLMON"] => Vec::new(),
            ["FADEDIM", level, _fade, _delay, address] => {
                lock(&self.levels).insert((*address).to_string(), (*level).to_string());
                vec![format!("DL, {address}, {level}")]
            }
            ["RDL", address] => {
                let level = lock(&self.levels)
                    .get(*address)
                    .cloned()
                    .unwrap_or_else(|| "0".to_string());
                vec![format!("DL, {address}, {level}")]
            }
            ["RKLS", address] => vec![format!("KLS, {address}, {}", "0".repeat(24))],
            [keyword @ ("CCOCLOSE" | "CCOOPEN"), address] => {
                let closed = *keyword == "CCOCLOSE";
                lock(&self.contacts).insert((*address).to_string(), closed);
                vec![format!("CCOS, {address}, {}", u8::from(closed))]
            }
            ["RCCOS", address] => {
                let closed = lock(&self.contacts).get(*address).copied().unwrap_or(false);
                vec![format!("CCOS, {address}, {}", u8::from(closed))]
            }
            ["KBP" | "KBR" | "KBH" | "KBDT", _address, _button] => Vec::new(),
            _ => vec!["Invalid command".to_string()],
        }
    }
}

/// Scripted controller listening on a local TCP port
pub struct MockController {
    shared: Arc<Shared>,
    addr: SocketAddr,
    accept_task: JoinHandle<()>,
}

impl MockController {
    /// Bind to a random local port and start accepting connections.
    pub async fn start(script: ControllerScript) -> io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shared = Arc::new(Shared {
            script,
            received: Mutex::new(Vec::new()),
            levels: Mutex::new(HashMap::new()),
            contacts: Mutex::new(HashMap::new()),
            current: Mutex::new(None),
            connections: AtomicUsize::new(0),
            accepting: AtomicBool::new(true),
            activity: Notify::new(),
        });

        let accept_shared = Arc::clone(&shared);
        let accept_task = tokio::spawn(async move {
            while let Ok((stream, peer)) = listener.accept().await {
                if !accept_shared.accepting.load(Ordering::SeqCst) {
                    debug!(%peer, "Refusing connection");
                    drop(stream);
                    continue;
                }
                tokio::spawn(serve(stream, Arc::clone(&accept_shared)));
            }
        });

        Ok(Self {
            shared,
            addr,
            accept_task,
        })
    }

    /// Address the controller listens on
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Client configuration pointing at this controller, with credentials matching the
    /// script and timings short enough for tests.
    pub fn client_config(&self) -> ClientConfig {
        let config = ClientConfig::new("127.0.0.1", self.addr.port())
            .with_connect_timeout(Duration::from_secs(1))
            .with_login_timeout(Duration::from_secs(2))
            .with_prompt_wait(Duration::from_millis(200))
            .with_heartbeat(Some(HeartbeatConfig {
                idle: Duration::from_secs(30),
                grace: Duration::from_secs(5),
            }))
            .with_reconnect(ReconnectPolicy {
                initial_delay: Duration::from_millis(20),
                max_delay: Duration::from_millis(200),
                multiplier: 2.0,
                jitter: 0.1,
            });
        match &self.shared.script.secret {
            Some(secret) => config.with_credentials(Credentials::password(secret.clone())),
            None => config,
        }
    }

    /// Connector serving this controller over in-memory streams instead of TCP
    pub fn connector(&self) -> MemoryConnector {
        MemoryConnector {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Every line received so far, login secrets included
    pub fn received(&self) -> Vec<String> {
        lock(&self.shared.received).clone()
    }

    /// Forget the lines received so far
    pub fn clear_received(&self) {
        lock(&self.shared.received).clear();
    }

    /// Number of connections served so far
    pub fn connections(&self) -> usize {
        self.shared.connections.load(Ordering::SeqCst)
    }

    /// Send a report on the live connection. Returns `false` if there is none.
    pub fn send_line(&self, line: impl Into<String>) -> bool {
        self.control(Control::Line(line.into()))
    }

    /// Close the live connection from the controller side.
    pub fn drop_connection(&self) -> bool {
        self.control(Control::Close)
    }

    /// Accept or refuse new connections
    pub fn set_accepting(&self, accepting: bool) {
        self.shared.accepting.store(accepting, Ordering::SeqCst);
    }

    fn control(&self, control: Control) -> bool {
        lock(&self.shared.current)
            .as_ref()
            .is_some_and(|tx| tx.send(control).is_ok())
    }

    /// Wait until `line` has been received.
    pub async fn wait_for_line(&self, line: &str) -> bool {
        self.wait_until(|shared| lock(&shared.received).iter().any(|l| l == line))
            .await
    }

    /// Wait until `count` lines equal to `line` have been received.
    pub async fn wait_for_count(&self, line: &str, count: usize) -> bool {
        self.wait_until(|shared| {
            lock(&shared.received).iter().filter(|l| *l == line).count() >= count
        })
        .await
    }

    /// Wait until at least `count` connections have been served.
    pub async fn wait_for_connections(&self, count: usize) -> bool {
        self.wait_until(|shared| shared.connections.load(Ordering::SeqCst) >= count)
            .await
    }

    async fn wait_until(&self, condition: impl Fn(&Shared) -> bool) -> bool {
        let shared = &self.shared;
        timeout(WAIT_TIMEOUT, async {
            loop {
                let notified = shared.activity.notified();
                if condition(shared) {
                    return;
                }
                notified.await;
            }
        })
        .await
        .is_ok()
    }
}

impl Drop for MockController {
    fn drop(&mut self) {
        self.accept_task.abort();
        self.drop_connection();
    }
}

/// Connector handing the client one end of an in-memory stream served by a [`MockController`]
#[derive(Clone)]
pub struct MemoryConnector {
    shared: Arc<Shared>,
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, _config: &ClientConfig) -> io::Result<BoxedTransport> {
        if !self.shared.accepting.load(Ordering::SeqCst) {
            return Err(io::Error::from(io::ErrorKind::ConnectionRefused));
        }
        let (client, controller) = tokio::io::duplex(4096);
        tokio::spawn(serve(controller, Arc::clone(&self.shared)));
        Ok(Box::new(client))
    }
}

async fn serve<S>(stream: S, shared: Arc<Shared>)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (tx, mut rx) = mpsc::unbounded_channel();
    // Replacing the sender ends any previous connection.
    *lock(&shared.current) = Some(tx);
    shared.connections.fetch_add(1, Ordering::SeqCst);
    shared.activity.notify_waiters();

    let mut framed = Framed::new(stream, LinesCodec::new());
    if let Err(error) = greet(&mut framed, &shared).await {
        debug!(%error, "Mock connection failed during greeting");
        return;
    }
    let mut authenticated = shared.script.secret.is_none();

    loop {
        tokio::select! {
            control = rx.recv() => match control {
                Some(Control::Line(line)) => {
                    if framed.send(line).await.is_err() {
                        break;
                    }
                }
                Some(Control::Close) | None => break,
            },
            line = framed.next() => {
                let Some(Ok(line)) = line else {
                    break;
                };
                trace!(%line, "Mock controller received");
                shared.record(&line);
                let replies = if authenticated {
                    shared.respond(&line)
                } else if shared.script.secret.as_deref() == Some(line.as_str()) {
                    authenticated = true;
                    vec!["login successful".to_string()]
                } else {
                    vec!["login incorrect".to_string()]
                };
                let mut failed = false;
                for reply in replies {
                    failed |= framed.send(reply).await.is_err();
                }
                if !authenticated {
                    failed |= prompt(&mut framed).await.is_err();
                }
                if failed {
                    break;
                }
            }
        }
    }
    debug!("Mock connection closed");
}

async fn greet<S>(framed: &mut Framed<S, LinesCodec>, shared: &Shared) -> io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    for line in &shared.script.greeting {
        framed.send(line.as_str()).await.map_err(io::Error::other)?;
    }
    if shared.script.secret.is_some() {
        prompt(framed).await?;
    }
    Ok(())
}

async fn prompt<S>(framed: &mut Framed<S, LinesCodec>) -> io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let stream = framed.get_mut();
    stream.write_all(LOGIN_PROMPT).await?;
    stream.flush().await
}
