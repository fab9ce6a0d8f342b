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

//! Property tests for the framer and codec

use homeworks_protocol::{Address, Command, HomeworksEvent, LineFramer};
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

fn address() -> impl Strategy<Value = Address> {
    prop::collection::vec(0u8..=99, 3..=5).prop_map(|fields| Address::new(&fields).unwrap())
}

fn stream() -> impl Strategy<Value = Vec<u8>> {
    let line = prop_oneof![
        Just(b"KBP, [01:04:10], 1".to_vec()),
        Just(b"DL, [01:02:03:04], 50".to_vec()),
        Just(b"LOGIN: ".to_vec()),
        prop::collection::vec(any::<u8>(), 0..40),
    ];
    let terminator = prop_oneof![
        Just(b"\r\n".to_vec()),
        Just(b"\n".to_vec()),
        Just(b"\r".to_vec()),
        Just(Vec::new()),
    ];
    prop::collection::vec((line, terminator), 0..20).prop_map(|parts| {
        parts
            .into_iter()
            .flat_map(|(mut line, terminator)| {
                line.extend(terminator);
                line
            })
            .collect()
    })
}

fn frame(chunks: &[&[u8]]) -> (Vec<String>, Vec<u8>) {
    let mut framer = LineFramer::new();
    let mut lines = Vec::new();
    for chunk in chunks {
        lines.extend(framer.feed(chunk));
    }
    (lines, framer.partial().to_vec())
}

// ============================================================================
// Framer Properties
// ============================================================================

proptest! {
    #[test]
    fn framing_is_independent_of_chunk_boundaries(
        bytes in stream(),
        cuts in prop::collection::vec(any::<prop::sample::Index>(), 0..8),
    ) {
        let mut offsets: Vec<usize> = cuts.iter().map(|cut| cut.index(bytes.len() + 1)).collect();
        offsets.sort_unstable();
        offsets.dedup();

        let mut chunks = Vec::new();
        let mut start = 0;
        for offset in offsets {
            chunks.push(&bytes[start..offset]);
            start = offset;
        }
        chunks.push(&bytes[start..]);

        prop_assert_eq!(frame(&chunks), frame(&[bytes.as_slice()]));
    }

    #[test]
    fn framed_lines_never_contain_terminators(bytes in stream()) {
        let (lines, _) = frame(&[bytes.as_slice()]);
        for line in lines {
            prop_assert!(!line.is_empty());
            prop_assert!(!line.contains('\r') && !line.contains('\n'));
        }
    }

    // ========================================================================
    // Codec Properties
    // ========================================================================

    #[test]
    fn decode_is_total(line in ".*") {
        // Any input yields exactly one event and never panics.
        let _ = HomeworksEvent::decode(&line);
    }

    #[test]
    fn unrecognized_prefix_yields_unknown(suffix in "[a-z0-9 ,\\[\\]:]{0,30}") {
        let line = format!("ZZTOP{suffix}");
        prop_assert_eq!(
            HomeworksEvent::decode(&line),
            HomeworksEvent::Unknown { raw: line.trim().to_string() }
        );
    }

    #[test]
    fn button_commands_decode_as_the_matching_report(address in address(), button in 1u8..=24) {
        let press = Command::PressButton { address, button }.encode().unwrap();
        prop_assert_eq!(HomeworksEvent::decode(&press), HomeworksEvent::ButtonPress { address, button });

        let release = Command::ReleaseButton { address, button }.encode().unwrap();
        prop_assert_eq!(HomeworksEvent::decode(&release), HomeworksEvent::ButtonRelease { address, button });

        let hold = Command::HoldButton { address, button }.encode().unwrap();
        prop_assert_eq!(HomeworksEvent::decode(&hold), HomeworksEvent::ButtonHold { address, button });

        let tap = Command::DoubleTapButton { address, button }.encode().unwrap();
        prop_assert_eq!(HomeworksEvent::decode(&tap), HomeworksEvent::ButtonDoubleTap { address, button });
    }

    #[test]
    fn level_report_matches_level_command(
        address in address(),
        level in 0u8..=100,
        fade in 0u32..=14_400,
        delay in 0u32..=14_400,
    ) {
        // The controller answers FADEDIM with a DL report naming the same address and level.
        let line = Command::SetLightLevel { address, level, fade, delay }.encode().unwrap();
        let fields: Vec<&str> = line.split(", ").collect();
        prop_assert_eq!(fields.len(), 5);
        let report = format!("DL, {}, {}", fields[4], fields[1]);
        prop_assert_eq!(
            HomeworksEvent::decode(&report),
            HomeworksEvent::LightLevelChanged { address, level }
        );
    }

    #[test]
    fn address_display_round_trips(address in address()) {
        prop_assert_eq!(address.to_string().parse::<Address>().unwrap(), address);
    }
}
