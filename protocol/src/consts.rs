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

//! Keywords and limits of the Homeworks command grammar.

/// Line terminator appended to every outbound line.
pub const LINE_ENDING: &str = "\r\n";
/// Carriage Return
pub const CR: u8 = b'\r';
/// Line Feed
pub const LF: u8 = b'\n';

/// Lowest light level
pub const MIN_LEVEL: u8 = 0;
/// Highest light level
pub const MAX_LEVEL: u8 = 100;
/// Lowest keypad button number
pub const MIN_BUTTON: u8 = 1;
/// Highest keypad button number
pub const MAX_BUTTON: u8 = 24;
/// Longest fade the processor accepts (four hours)
pub const MAX_FADE_SECONDS: u32 = 14_400;
/// Longest delay the processor accepts (four hours)
pub const MAX_DELAY_SECONDS: u32 = 14_400;
/// Number of LEDs reported by a keypad LED status line
pub const MAX_LEDS: usize = 24;
/// Fewest fields in a bracketed address
pub const MIN_ADDRESS_FIELDS: usize = 3;
/// Most fields in a bracketed address
pub const MAX_ADDRESS_FIELDS: usize = 5;
/// Highest value of a single address field
pub const MAX_ADDRESS_FIELD: u8 = 99;

/// Outbound command keywords
pub mod command {
    /// Fade a dimmer to a level
    pub const FADEDIM: &str = "FADEDIM";
    /// Keypad button press
    pub const KBP: &str = "KBP";
    /// Keypad button release
    pub const KBR: &str = "KBR";
    /// Keypad button hold
    pub const KBH: &str = "KBH";
    /// Keypad button double tap
    pub const KBDT: &str = "KBDT";
    /// Request dimmer level
    pub const RDL: &str = "RDL";
    /// Request keypad LED states
    pub const RKLS: &str = "RKLS";
    /// Close a contact closure output
    pub const CCOCLOSE: &str = "CCOCLOSE";
    /// Open a contact closure output
    pub const CCOOPEN: &str = "CCOOPEN";
    /// Request the state of a contact closure output
    pub const RCCOS: &str = "RCCOS";
    /// Enable keypad button monitoring
    pub const KBMON: &str = "KBMON";
    /// Enable keypad LED monitoring
    pub const KLMON: &str = "KLMON";
    /// Enable dimmer level monitoring
    pub const DLMON: &str = "DLMON";
    /// Disable the interactive prompt
    pub const PROMPTOFF: &str = "PROMPTOFF";
    /// Request the processor OS revision, used as a keepalive probe
    pub const OSREV: &str = "OSREV";
}

/// Inbound report keywords
pub mod report {
    /// Button press reports from keypads, dimmers and shades
    pub const PRESS: &[&str] = &["KBP", "DBP", "SVBP"];
    /// Button release reports
    pub const RELEASE: &[&str] = &["KBR", "DBR", "SVBR"];
    /// Button hold reports
    pub const HOLD: &[&str] = &["KBH", "DBH", "SVBH"];
    /// Button double tap reports
    pub const DOUBLE_TAP: &[&str] = &["KBDT", "DBDT", "SVBDT", "SVDT"];
    /// Dimmer level report
    pub const DL: &str = "DL";
    /// Keypad LED status report
    pub const KLS: &str = "KLS";
    /// Contact closure output state report
    pub const CCOS: &str = "CCOS";
    /// CCOS state for an open contact
    pub const CCO_OPEN: &str = "0";
    /// CCOS state for a closed contact
    pub const CCO_CLOSED: &str = "1";
    /// Login prompt, sent without a line terminator
    pub const LOGIN_PROMPT: &str = "LOGIN:";
    /// Login accepted
    pub const LOGIN_SUCCESSFUL: &str = "login successful";
    /// Login rejected
    pub const LOGIN_REJECTED: &[&str] = &["login incorrect", "invalid login"];
    /// Error responses
    pub const ERROR: &[&str] = &["error", "invalid command"];
}
