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

//! Fan-out of decoded events to registered listeners

use dashmap::DashMap;
use homeworks_protocol::{Address, HomeworksEvent};
use metrics::counter;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{error, trace};

/// What listeners are told about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// The controller reported something
    Event(HomeworksEvent),
    /// The link to the controller dropped; reconnection is under way
    ConnectionLost,
    /// The link was re-established and monitoring re-enabled
    ConnectionRestored,
}

impl Notification {
    /// The decoded event, if this is one
    pub fn event(&self) -> Option<&HomeworksEvent> {
        match self {
            Notification::Event(event) => Some(event),
            _ => None,
        }
    }
}

/// Handle identifying one registered listener (monotonically increasing, never reused)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Get the underlying u64 value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

type Callback = Arc<dyn Fn(&Notification) + Send + Sync + 'static>;

struct Registration {
    filter: Option<Address>,
    callback: Callback,
}

impl Registration {
    fn wants(&self, notification: &Notification) -> bool {
        match (&self.filter, notification) {
            (None, _) => true,
            (Some(filter), Notification::Event(event)) => event.address() == Some(filter),
            (Some(_), _) => true,
        }
    }
}

/// Listener table shared by the client facade and the read loop.
///
/// Callbacks run synchronously on the publishing task, in subscription order. The table is
/// snapshotted before delivery, so callbacks may subscribe or unsubscribe freely; a listener
/// removed during delivery is not called again, and one added during delivery first hears the
/// next notification.
#[derive(Default)]
pub struct Dispatcher {
    listeners: DashMap<SubscriptionId, Registration>,
    next_id: AtomicU64,
}

impl Dispatcher {
    /// Creates an empty dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback for every notification
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        self.register(None, Arc::new(callback))
    }

    /// Register a callback for events about `address` plus connectivity notifications
    pub fn subscribe_address<F>(&self, address: Address, callback: F) -> SubscriptionId
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        self.register(Some(address), Arc::new(callback))
    }

    fn register(&self, filter: Option<Address>, callback: Callback) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.insert(id, Registration { filter, callback });
        trace!(subscription = %id, "Listener registered");
        id
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.listeners.remove(&id).is_some()
    }

    /// Number of registered listeners
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Whether no listener is registered
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Deliver `notification` to every interested listener.
    ///
    /// A panicking listener is logged and skipped; the rest still receive the notification.
    pub fn publish(&self, notification: &Notification) {
        let mut targets: Vec<(SubscriptionId, Callback)> = self
            .listeners
            .iter()
            .filter(|entry| entry.value().wants(notification))
            .map(|entry| (*entry.key(), Arc::clone(&entry.value().callback)))
            .collect();
        targets.sort_unstable_by_key(|(id, _)| *id);

        for (id, callback) in targets {
            if !self.listeners.contains_key(&id) {
                continue;
            }
            let result = catch_unwind(AssertUnwindSafe(|| callback(notification)));
            if let Err(panic) = result {
                counter!("homeworks.listener.panics").increment(1);
                error!(
                    subscription = %id,
                    panic = panic_message(panic.as_ref()),
                    "Listener panicked while handling {:?}",
                    notification
                );
            }
        }
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
