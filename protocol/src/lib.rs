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

//! # Homeworks Protocol Codec
//!
//! This crate implements the line-oriented control protocol spoken by Lutron Homeworks
//! Series 4 and 8 processors over RS-232 and Ethernet.
//!
//! ## Overview
//!
//! Every message is one line of ASCII text: a keyword followed by comma separated fields,
//! terminated by CR LF. Device addresses are bracketed, colon separated decimal fields such
//! as `[01:04:10]`. Once monitoring is enabled the controller reports activity unprompted:
//!
//! ```text
//! KBP, [01:04:10], 1          keypad button 1 pressed
//! DL, [01:01:00:02:04], 75    dimmer now at 75%
//! KLS, [01:04:10], 100000000000000000000000
//! ```
//!
//! ## Core Components
//!
//! ### [`LineFramer`]
//!
//! Splits a byte stream into lines, buffering partial input between reads.
//!
//! ### [`Command`]
//!
//! Outbound requests. [`Command::encode`] validates every parameter before producing a line.
//!
//! ### [`HomeworksEvent`]
//!
//! Decoded inbound lines. Decoding is total: anything unrecognized or malformed becomes
//! [`HomeworksEvent::Unknown`].
//!
//! ### [`HomeworksCodec`]
//!
//! Implements [`Encoder`](tokio_util::codec::Encoder) and
//! [`Decoder`](tokio_util::codec::Decoder) so a transport can be wrapped in `FramedRead` and
//! `FramedWrite`.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use bytes::BytesMut;
//! use homeworks_protocol::{Command, HomeworksCodec, HomeworksEvent};
//! use tokio_util::codec::{Decoder, Encoder};
//!
//! # fn example() -> Result<(), homeworks_protocol::CodecError> {
//! let mut codec = HomeworksCodec::new();
//!
//! let mut output = BytesMut::new();
//! codec.encode(
//!     Command::SetLightLevel { address: "[01:02:03:04]".parse()?, level: 50, fade: 2, delay: 0 },
//!     &mut output,
//! )?;
//! assert_eq!(&output[..], b"FADEDIM, 50, 2, 0, [01:02:03:04]\r\n");
//!
//! let mut input = BytesMut::from(&b"DL, [01:02:03:04], 50\r\n"[..]);
//! if let Some(HomeworksEvent::LightLevelChanged { address, level }) = codec.decode(&mut input)? {
//!     println!("{address} is at {level}%");
//! }
//! # Ok(())
//! # }
//! ```

#![warn(
    clippy::cargo,
    missing_docs,
    clippy::pedantic,
    future_incompatible,
    rust_2018_idioms
)]
#![allow(
    clippy::option_if_let_else,
    clippy::module_name_repetitions,
    clippy::missing_errors_doc
)]

mod address;
mod codec;
mod command;
pub mod consts;
mod event;
mod framer;
mod result;

pub use self::address::Address;
pub use self::codec::HomeworksCodec;
pub use self::command::Command;
pub use self::event::{HomeworksEvent, LedState};
pub use self::framer::{LineFramer, Lines};
pub use self::result::{CodecError, CodecResult};
