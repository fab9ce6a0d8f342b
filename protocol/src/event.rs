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

use crate::Address;
use crate::consts::{self, report};
use std::fmt;

/// State of a single keypad LED as reported in a `KLS` line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LedState {
    /// LED is dark
    Off,
    /// LED is lit
    On,
    /// LED flashes slowly
    Flash,
    /// LED flashes quickly
    RapidFlash,
}

impl LedState {
    fn from_digit(digit: u8) -> Option<LedState> {
        match digit {
            b'0' => Some(LedState::Off),
            b'1' => Some(LedState::On),
            b'2' => Some(LedState::Flash),
            b'3' => Some(LedState::RapidFlash),
            _ => None,
        }
    }

    /// Whether the LED is lit in any way
    pub fn is_lit(self) -> bool {
        !matches!(self, LedState::Off)
    }
}

///
/// `HomeworksEvent` is a decoded line received from the controller.
///
/// Every line decodes to exactly one event. Lines that are not recognized, or that carry
/// malformed or out of range fields, become [`HomeworksEvent::Unknown`].
///
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HomeworksEvent {
    /// A button was pressed
    ButtonPress {
        /// Device address
        address: Address,
        /// Button number
        button: u8,
    },
    /// A button was released
    ButtonRelease {
        /// Device address
        address: Address,
        /// Button number
        button: u8,
    },
    /// A button is being held
    ButtonHold {
        /// Device address
        address: Address,
        /// Button number
        button: u8,
    },
    /// A button was double tapped
    ButtonDoubleTap {
        /// Device address
        address: Address,
        /// Button number
        button: u8,
    },
    /// A dimmer reported its level
    LightLevelChanged {
        /// Dimmer address
        address: Address,
        /// Level in percent
        level: u8,
    },
    /// A keypad reported the state of its LEDs
    KeypadLedChanged {
        /// Keypad address
        address: Address,
        /// LED states, LED 1 first
        leds: Vec<LedState>,
    },
    /// A contact closure output reported its state
    ContactClosureChanged {
        /// Output address
        address: Address,
        /// Whether the contact is closed
        closed: bool,
    },
    /// The controller is asking for credentials
    LoginPrompt,
    /// The controller accepted the credentials
    LoginAccepted,
    /// The controller rejected the credentials
    LoginRejected,
    /// The controller rejected a command
    ControllerError {
        /// Text of the error response
        message: String,
    },
    /// Anything the codec does not recognize
    Unknown {
        /// The line with control characters removed
        raw: String,
    },
}

impl HomeworksEvent {
    /// Classifies one line received from the controller. Never fails.
    pub fn decode(line: &str) -> HomeworksEvent {
        let text = clean(line);
        classify(&text).unwrap_or(HomeworksEvent::Unknown { raw: text })
    }

    /// The device this event concerns, if any
    pub fn address(&self) -> Option<&Address> {
        match self {
            HomeworksEvent::ButtonPress { address, .. }
            | HomeworksEvent::ButtonRelease { address, .. }
            | HomeworksEvent::ButtonHold { address, .. }
            | HomeworksEvent::ButtonDoubleTap { address, .. }
            | HomeworksEvent::LightLevelChanged { address, .. }
            | HomeworksEvent::KeypadLedChanged { address, .. }
            | HomeworksEvent::ContactClosureChanged { address, .. } => Some(address),
            _ => None,
        }
    }

    /// State of LED `led` (1-based) for a [`HomeworksEvent::KeypadLedChanged`] event
    pub fn led(&self, led: usize) -> Option<LedState> {
        match self {
            HomeworksEvent::KeypadLedChanged { leds, .. } => {
                led.checked_sub(1).and_then(|index| leds.get(index)).copied()
            }
            _ => None,
        }
    }

    /// Whether this event belongs to the login handshake
    pub fn is_login(&self) -> bool {
        matches!(
            self,
            HomeworksEvent::LoginPrompt
                | HomeworksEvent::LoginAccepted
                | HomeworksEvent::LoginRejected
        )
    }
}

impl fmt::Display for HomeworksEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HomeworksEvent::ButtonPress { address, button } => {
                write!(f, "button {button} pressed on {address}")
            }
            HomeworksEvent::ButtonRelease { address, button } => {
                write!(f, "button {button} released on {address}")
            }
            HomeworksEvent::ButtonHold { address, button } => {
                write!(f, "button {button} held on {address}")
            }
            HomeworksEvent::ButtonDoubleTap { address, button } => {
                write!(f, "button {button} double tapped on {address}")
            }
            HomeworksEvent::LightLevelChanged { address, level } => {
                write!(f, "{address} at {level}%")
            }
            HomeworksEvent::KeypadLedChanged { address, leds } => {
                let lit = leds.iter().filter(|led| led.is_lit()).count();
                write!(f, "{address} has {lit} of {} LEDs lit", leds.len())
            }
            HomeworksEvent::ContactClosureChanged { address, closed } => {
                let state = if *closed { "closed" } else { "open" };
                write!(f, "contact {address} {state}")
            }
            HomeworksEvent::LoginPrompt => f.write_str("login prompt"),
            HomeworksEvent::LoginAccepted => f.write_str("login accepted"),
            HomeworksEvent::LoginRejected => f.write_str("login rejected"),
            HomeworksEvent::ControllerError { message } => write!(f, "controller error: {message}"),
            HomeworksEvent::Unknown { raw } => write!(f, "unknown: {raw}"),
        }
    }
}

/// Drops control characters and any leading `L232> ` or `LNET> ` style prompt.
fn clean(line: &str) -> String {
    let text: String = line.chars().filter(|c| !c.is_control()).collect();
    let mut rest = text.trim();
    while let Some((prompt, tail)) = rest.split_once("> ") {
        if prompt.is_empty()
            || prompt.len() > 5
            || !prompt.bytes().all(|b| b.is_ascii_alphanumeric())
        {
            break;
        }
        rest = tail.trim_start();
    }
    rest.to_string()
}

fn classify(text: &str) -> Option<HomeworksEvent> {
    if text == report::LOGIN_PROMPT {
        return Some(HomeworksEvent::LoginPrompt);
    }
    let lower = text.to_ascii_lowercase();
    if lower == report::LOGIN_SUCCESSFUL {
        return Some(HomeworksEvent::LoginAccepted);
    }
    if report::LOGIN_REJECTED.iter().any(|p| lower.starts_with(p)) {
        return Some(HomeworksEvent::LoginRejected);
    }
    if report::ERROR.iter().any(|p| lower.starts_with(p)) {
        return Some(HomeworksEvent::ControllerError {
            message: text.to_string(),
        });
    }

    let mut fields = text.split(',').map(str::trim);
    let keyword = fields.next()?.to_ascii_uppercase();
    let args: Vec<&str> = fields.collect();

    if report::PRESS.contains(&keyword.as_str()) {
        let (address, button) = button_args(&args)?;
        Some(HomeworksEvent::ButtonPress { address, button })
    } else if report::RELEASE.contains(&keyword.as_str()) {
        let (address, button) = button_args(&args)?;
        Some(HomeworksEvent::ButtonRelease { address, button })
    } else if report::HOLD.contains(&keyword.as_str()) {
        let (address, button) = button_args(&args)?;
        Some(HomeworksEvent::ButtonHold { address, button })
    } else if report::DOUBLE_TAP.contains(&keyword.as_str()) {
        let (address, button) = button_args(&args)?;
        Some(HomeworksEvent::ButtonDoubleTap { address, button })
    } else if keyword == report::DL {
        let [address, level] = args.as_slice() else {
            return None;
        };
        Some(HomeworksEvent::LightLevelChanged {
            address: address.parse().ok()?,
            level: parse_level(level)?,
        })
    } else if keyword == report::KLS {
        let [address, states] = args.as_slice() else {
            return None;
        };
        if states.is_empty() || states.len() > consts::MAX_LEDS {
            return None;
        }
        let leds = states
            .bytes()
            .map(LedState::from_digit)
            .collect::<Option<Vec<_>>>()?;
        Some(HomeworksEvent::KeypadLedChanged {
            address: address.parse().ok()?,
            leds,
        })
    } else if keyword == report::CCOS {
        let [address, state] = args.as_slice() else {
            return None;
        };
        let closed = match *state {
            report::CCO_OPEN => false,
            report::CCO_CLOSED => true,
            _ => return None,
        };
        Some(HomeworksEvent::ContactClosureChanged {
            address: address.parse().ok()?,
            closed,
        })
    } else {
        None
    }
}

fn button_args(args: &[&str]) -> Option<(Address, u8)> {
    let [address, button] = args else {
        return None;
    };
    let button: u8 = button.parse().ok()?;
    if !(consts::MIN_BUTTON..=consts::MAX_BUTTON).contains(&button) {
        return None;
    }
    Some((address.parse().ok()?, button))
}

/// Levels are normally integral but some firmware reports a fractional percentage.
fn parse_level(text: &str) -> Option<u8> {
    let value: f32 = text.parse().ok()?;
    if !value.is_finite() || value < f32::from(consts::MIN_LEVEL) || value > f32::from(consts::MAX_LEVEL) {
        return None;
    }
    Some(value.round() as u8)
}
