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

//! Reconnection supervisor

use crate::connection::{Link, LinkReader, LinkState};
use crate::transport::Connector;
use crate::{ClientConfig, Dispatcher, Notification, ReconnectPolicy};
use metrics::counter;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Delay schedule between reconnection attempts.
///
/// Delays grow as `initial_delay * multiplier^attempt` with random jitter on top, are capped
/// at `max_delay`, and never shrink until [`Backoff::reset`].
#[derive(Debug, Clone)]
pub(crate) struct Backoff {
    policy: ReconnectPolicy,
    attempt: u32,
    last: Duration,
}

impl Backoff {
    pub(crate) fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            attempt: 0,
            last: Duration::ZERO,
        }
    }

    /// Number of delays handed out since the last reset
    pub(crate) fn attempt(&self) -> u32 {
        self.attempt
    }

    pub(crate) fn next_delay(&mut self) -> Duration {
        let exponent = i32::try_from(self.attempt).unwrap_or(i32::MAX);
        let base = self.policy.initial_delay.as_secs_f64() * self.policy.multiplier.powi(exponent);
        let jitter = if self.policy.jitter > 0.0 {
            rand::thread_rng().gen_range(0.0..=self.policy.jitter)
        } else {
            0.0
        };
        let capped = (base * (1.0 + jitter)).min(self.policy.max_delay.as_secs_f64());
        let delay = Duration::try_from_secs_f64(capped)
            .unwrap_or(self.policy.max_delay)
            .min(self.policy.max_delay)
            .max(self.last);

        self.last = delay;
        self.attempt = self.attempt.saturating_add(1);
        delay
    }

    pub(crate) fn reset(&mut self) {
        self.attempt = 0;
        self.last = Duration::ZERO;
    }
}

/// Background task owning the read half of the link.
///
/// Runs the read loop; when it ends for any reason other than cancellation, tears the link
/// down, tells listeners, and reconnects with backoff until it succeeds or is cancelled.
pub(crate) struct Supervisor {
    pub(crate) config: Arc<ClientConfig>,
    pub(crate) connector: Arc<dyn Connector>,
    pub(crate) link: Arc<Link>,
    pub(crate) dispatcher: Arc<Dispatcher>,
    pub(crate) cancel: CancellationToken,
}

impl Supervisor {
    pub(crate) async fn run(self, reader: LinkReader) {
        let mut backoff = Backoff::new(self.config.reconnect.clone());
        let mut reader = Some(reader);

        while let Some(mut current) = reader.take() {
            let result = self
                .link
                .read_loop(
                    &mut current,
                    self.config.heartbeat,
                    &self.dispatcher,
                    &self.cancel,
                )
                .await;
            drop(current);

            let error = match result {
                Ok(()) => break,
                Err(_) if self.cancel.is_cancelled() => break,
                Err(error) => error,
            };
            warn!(error = %error, "Lost connection to controller");
            self.link.set_state(LinkState::Failed);
            self.link.detach().await;
            self.dispatcher.publish(&Notification::ConnectionLost);

            reader = self.reconnect(&mut backoff).await;
            if reader.is_some() {
                self.dispatcher.publish(&Notification::ConnectionRestored);
            }
        }

        self.link.detach().await;
        self.link.set_state(LinkState::Disconnected);
        debug!("Supervisor stopped");
    }

    async fn reconnect(&self, backoff: &mut Backoff) -> Option<LinkReader> {
        loop {
            let delay = backoff.next_delay();
            info!(
                attempt = backoff.attempt(),
                delay_ms = delay.as_millis() as u64,
                "Waiting before reconnect"
            );
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => return None,
                () = sleep(delay) => {}
            }

            counter!("homeworks.reconnects").increment(1);
            let result = tokio::select! {
                biased;
                () = self.cancel.cancelled() => return None,
                result = self.link.open(&self.config, self.connector.as_ref()) => result,
            };
            match result {
                Ok(reader) => {
                    info!(attempts = backoff.attempt(), "Reconnected to controller");
                    backoff.reset();
                    return Some(reader);
                }
                Err(error) => {
                    warn!(error = %error, attempt = backoff.attempt(), "Reconnect attempt failed");
                }
            }
        }
    }
}
