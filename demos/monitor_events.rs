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

//! Homeworks Event Monitor Example
//!
//! Connects to a Homeworks processor, enables monitoring and prints every report until
//! Ctrl+C is pressed.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --example monitor_events -- 192.168.1.50 23 lutron
//! cargo run --example monitor_events -- 192.168.1.50 23 lutron admin
//! ```

use homeworks_client::{ClientConfig, Credentials, HomeworksClient, HomeworksEvent, Notification};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();
    let host = args.get(1).map_or("localhost", String::as_str);
    let port: u16 = args
        .get(2)
        .and_then(|s| s.parse().ok())
        .unwrap_or(homeworks_client::DEFAULT_PORT);

    let mut config = ClientConfig::new(host, port);
    match (args.get(3), args.get(4)) {
        (Some(password), Some(username)) => {
            config = config.with_credentials(Credentials::new(username.clone(), password.clone()));
        }
        (Some(password), None) => {
            config = config.with_credentials(Credentials::password(password.clone()));
        }
        _ => {}
    }

    println!("Homeworks Event Monitor");
    println!("=======================");
    println!("Connecting to: {}", config.address());
    println!();

    let client = HomeworksClient::new(config);
    client.subscribe(|notification| match notification {
        Notification::Event(HomeworksEvent::Unknown { raw }) => println!("  ? {raw}"),
        Notification::Event(event) => println!("  {event}"),
        Notification::ConnectionLost => println!("=== Connection lost, reconnecting ==="),
        Notification::ConnectionRestored => println!("=== Connection restored ==="),
    });

    client.connect().await?;
    println!("=== Monitoring (press Ctrl+C to stop) ===");

    tokio::signal::ctrl_c().await?;

    client.close().await;
    println!("\n=== Disconnected ===");
    Ok(())
}
