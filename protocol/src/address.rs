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

use crate::consts::{MAX_ADDRESS_FIELD, MAX_ADDRESS_FIELDS, MIN_ADDRESS_FIELDS};
use crate::{CodecError, CodecResult};
use std::fmt;
use std::str::FromStr;

///
/// Controller device address such as `[01:04:10]` or `[01:01:00:02:04]`.
///
/// An address has between three and five fields (processor, link, then keypad or module and
/// output), each in `0..=99`. It is always rendered with two digits per field, which is the
/// form the controller emits, so parsed and rendered addresses compare equal.
///
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address {
    fields: [u8; MAX_ADDRESS_FIELDS],
    len: u8,
}

impl Address {
    /// Build an address from its numeric fields.
    pub fn new(fields: &[u8]) -> CodecResult<Address> {
        if !(MIN_ADDRESS_FIELDS..=MAX_ADDRESS_FIELDS).contains(&fields.len()) {
            return Err(CodecError::InvalidAddress {
                input: format!("{fields:?}"),
                reason: "expected 3 to 5 fields",
            });
        }
        if fields.iter().any(|&field| field > MAX_ADDRESS_FIELD) {
            return Err(CodecError::InvalidAddress {
                input: format!("{fields:?}"),
                reason: "field exceeds 99",
            });
        }
        let mut address = Address {
            fields: [0; MAX_ADDRESS_FIELDS],
            len: fields.len() as u8,
        };
        address.fields[..fields.len()].copy_from_slice(fields);
        Ok(address)
    }

    /// The numeric fields of this address
    pub fn fields(&self) -> &[u8] {
        &self.fields[..self.len as usize]
    }
}

impl FromStr for Address {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason| CodecError::InvalidAddress {
            input: s.to_string(),
            reason,
        };
        let inner = s
            .trim()
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .ok_or_else(|| invalid("expected a bracketed address"))?;

        let mut fields = [0u8; MAX_ADDRESS_FIELDS];
        let mut len = 0;
        for part in inner.split(':') {
            if len == MAX_ADDRESS_FIELDS {
                return Err(invalid("expected 3 to 5 fields"));
            }
            if part.is_empty() || part.len() > 2 || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid("fields must be one or two decimal digits"));
            }
            // Two ASCII digits always fit in a u8.
            fields[len] = part.parse().map_err(|_| invalid("unparsable field"))?;
            len += 1;
        }
        Address::new(&fields[..len])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (index, field) in self.fields().iter().enumerate() {
            if index > 0 {
                f.write_str(":")?;
            }
            write!(f, "{field:02}")?;
        }
        f.write_str("]")
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}
