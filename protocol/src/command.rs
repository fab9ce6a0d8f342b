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

use crate::consts::{self, command};
use crate::{Address, CodecError, CodecResult};

///
/// Outbound request to the controller.
///
/// Commands are plain data; [`Command::encode`] validates every parameter and renders the
/// line in the controller's grammar without its terminator.
///
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Fade a dimmer to `level` percent over `fade` seconds after waiting `delay` seconds.
    SetLightLevel {
        /// Dimmer address
        address: Address,
        /// Target level, `0..=100`
        level: u8,
        /// Fade time in seconds
        fade: u32,
        /// Delay before the fade starts, in seconds
        delay: u32,
    },
    /// Simulate a keypad button press.
    PressButton {
        /// Keypad address
        address: Address,
        /// Button number, `1..=24`
        button: u8,
    },
    /// Simulate a keypad button release.
    ReleaseButton {
        /// Keypad address
        address: Address,
        /// Button number, `1..=24`
        button: u8,
    },
    /// Simulate a keypad button hold.
    HoldButton {
        /// Keypad address
        address: Address,
        /// Button number, `1..=24`
        button: u8,
    },
    /// Simulate a keypad button double tap.
    DoubleTapButton {
        /// Keypad address
        address: Address,
        /// Button number, `1..=24`
        button: u8,
    },
    /// Ask for the current level of a dimmer; answered with a `DL` report.
    RequestLightLevel {
        /// Dimmer address
        address: Address,
    },
    /// Ask for the LED states of a keypad; answered with a `KLS` report.
    RequestLedStates {
        /// Keypad address
        address: Address,
    },
    /// Close a contact closure output.
    CloseContact {
        /// Output address, relay last
        address: Address,
    },
    /// Open a contact closure output.
    OpenContact {
        /// Output address, relay last
        address: Address,
    },
    /// Ask for the state of a contact closure output; answered with a `CCOS` report.
    RequestContactState {
        /// Output address, relay last
        address: Address,
    },
    /// Report keypad button activity.
    StartKeypadMonitoring,
    /// Report keypad LED changes.
    StartLedMonitoring,
    /// Report dimmer level changes.
    StartLightMonitoring,
    /// Stop the controller from printing its interactive prompt.
    DisablePrompt,
    /// Cheap request used to probe an idle link.
    Keepalive,
    /// Answer to the login prompt.
    Login {
        /// Password, or `username, password`
        secret: String,
    },
}

impl Command {
    /// Renders the command line without its terminator.
    ///
    /// Nothing is produced unless every parameter is within the controller's range.
    pub fn encode(&self) -> CodecResult<String> {
        let line = match self {
            Command::SetLightLevel {
                address,
                level,
                fade,
                delay,
            } => {
                if *level > consts::MAX_LEVEL {
                    return Err(CodecError::LevelOutOfRange(*level));
                }
                if *fade > consts::MAX_FADE_SECONDS {
                    return Err(CodecError::FadeOutOfRange(*fade));
                }
                if *delay > consts::MAX_DELAY_SECONDS {
                    return Err(CodecError::DelayOutOfRange(*delay));
                }
                format!("{}, {level}, {fade}, {delay}, {address}", command::FADEDIM)
            }
            Command::PressButton { address, button } => button_line(command::KBP, address, *button)?,
            Command::ReleaseButton { address, button } => {
                button_line(command::KBR, address, *button)?
            }
            Command::HoldButton { address, button } => button_line(command::KBH, address, *button)?,
            Command::DoubleTapButton { address, button } => {
                button_line(command::KBDT, address, *button)?
            }
            Command::RequestLightLevel { address } => format!("{}, {address}", command::RDL),
            Command::RequestLedStates { address } => format!("{}, {address}", command::RKLS),
            Command::CloseContact { address } => format!("{}, {address}", command::CCOCLOSE),
            Command::OpenContact { address } => format!("{}, {address}", command::CCOOPEN),
            Command::RequestContactState { address } => format!("{}, {address}", command::RCCOS),
            Command::StartKeypadMonitoring => command::KBMON.to_string(),
            Command::StartLedMonitoring => command::KLMON.to_string(),
            Command::StartLightMonitoring => command::DLMON.to_string(),
            Command::DisablePrompt => command::PROMPTOFF.to_string(),
            Command::Keepalive => command::OSREV.to_string(),
            Command::Login { secret } => {
                if secret.trim().is_empty() || secret.chars().any(char::is_control) {
                    return Err(CodecError::InvalidSecret);
                }
                secret.clone()
            }
        };
        Ok(line)
    }

    /// Commands issued after every login so the controller reports activity.
    pub fn monitoring() -> Vec<Command> {
        vec![
            Command::DisablePrompt,
            Command::StartKeypadMonitoring,
            Command::StartLedMonitoring,
            Command::StartLightMonitoring,
        ]
    }

    /// Whether the rendered line may be written to logs.
    pub fn is_sensitive(&self) -> bool {
        matches!(self, Command::Login { .. })
    }
}

fn button_line(keyword: &str, address: &Address, button: u8) -> CodecResult<String> {
    if !(consts::MIN_BUTTON..=consts::MAX_BUTTON).contains(&button) {
        return Err(CodecError::ButtonOutOfRange {
            address: *address,
            button,
        });
    }
    Ok(format!("{keyword}, {address}, {button}"))
}
