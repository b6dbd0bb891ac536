// Copyright 2023 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Property value conversions for the cell-based device tree encoding.
//!
//! Every multi-cell value is built by left-to-right concatenation of 4-byte
//! big-endian cells; the concatenation order is part of the consumer's
//! contract, not a presentation detail.

use std::mem::size_of_val;

use crate::tree::Error;
use crate::tree::Result;

pub(crate) const SIZE_U32: usize = std::mem::size_of::<u32>();
pub(crate) const SIZE_U64: usize = std::mem::size_of::<u64>();

/// Conversion into an encoded property value.
///
/// Implementing `ToPropval` for a type defines its conversion to the raw
/// property bytes handed to the tree cursor.
pub trait ToPropval {
    // Convert the type to its byte representation as a property value.
    fn to_propval(self) -> Result<Vec<u8>>;
}

#[inline]
fn u32_to_bytes(value: &[u32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(size_of_val(value));
    for val in value {
        bytes.extend_from_slice(&val.to_be_bytes())
    }
    bytes
}

impl ToPropval for () {
    fn to_propval(self) -> Result<Vec<u8>> {
        Ok(vec![])
    }
}

impl ToPropval for &[u8] {
    fn to_propval(self) -> Result<Vec<u8>> {
        Ok(self.into())
    }
}

impl<const N: usize> ToPropval for &[u8; N] {
    fn to_propval(self) -> Result<Vec<u8>> {
        Ok(self.to_vec())
    }
}

impl ToPropval for Vec<u8> {
    fn to_propval(self) -> Result<Vec<u8>> {
        Ok(self)
    }
}

impl ToPropval for u32 {
    fn to_propval(self) -> Result<Vec<u8>> {
        Ok(u32_to_bytes(std::slice::from_ref(&self)))
    }
}

// Signed values occupy one cell in two's complement; the firmware uses -1
// for "present but not populated" placeholder properties.
impl ToPropval for i32 {
    fn to_propval(self) -> Result<Vec<u8>> {
        (self as u32).to_propval()
    }
}

impl ToPropval for &[u32] {
    fn to_propval(self) -> Result<Vec<u8>> {
        Ok(u32_to_bytes(self))
    }
}

impl<const N: usize> ToPropval for &[u32; N] {
    fn to_propval(self) -> Result<Vec<u8>> {
        Ok(u32_to_bytes(self))
    }
}

impl ToPropval for Vec<u32> {
    fn to_propval(self) -> Result<Vec<u8>> {
        Ok(u32_to_bytes(self.as_slice()))
    }
}

// A 64-bit address encodes as two cells, high half first.
impl ToPropval for u64 {
    fn to_propval(self) -> Result<Vec<u8>> {
        Ok(self.to_be_bytes().to_vec())
    }
}

#[inline]
fn is_valid_string_property(val: &str) -> bool {
    // The consumer terminates on the first NUL, so an embedded one would
    // silently truncate the value.
    !val.contains('\0')
}

impl ToPropval for &str {
    fn to_propval(self) -> Result<Vec<u8>> {
        if !is_valid_string_property(self) {
            return Err(Error::InvalidString(self.to_owned()));
        }
        let mut bytes = Vec::with_capacity(self.len() + 1);
        bytes.extend_from_slice(self.as_bytes());
        bytes.push(0);
        Ok(bytes)
    }
}

impl ToPropval for String {
    fn to_propval(self) -> Result<Vec<u8>> {
        if !is_valid_string_property(&self) {
            Err(Error::InvalidString(self))
        } else {
            let mut bytes = self.into_bytes();
            bytes.push(0);
            Ok(bytes)
        }
    }
}

/// Conversion from an encoded property value.
///
/// Implementing `FromPropval` for a type defines its construction from the
/// raw property bytes stored on a committed node.
pub trait FromPropval {
    // Try to convert property bytes to `Self`, return `None` if impossible.
    fn from_propval(propval: &[u8]) -> Option<Self>
    where
        Self: Sized;
}

impl FromPropval for () {
    fn from_propval(propval: &[u8]) -> Option<Self> {
        propval.is_empty().then_some(())
    }
}

impl FromPropval for Vec<u8> {
    fn from_propval(propval: &[u8]) -> Option<Self> {
        Some(propval.into())
    }
}

impl FromPropval for u32 {
    fn from_propval(propval: &[u8]) -> Option<Self> {
        if propval.len() == SIZE_U32 {
            Some(u32::from_be_bytes(propval.try_into().unwrap()))
        } else {
            None
        }
    }
}

impl FromPropval for Vec<u32> {
    fn from_propval(propval: &[u8]) -> Option<Self> {
        if propval.len() % SIZE_U32 != 0 {
            None
        } else {
            Some(
                propval
                    .chunks(SIZE_U32)
                    .map(|v| u32::from_be_bytes(v.try_into().unwrap()))
                    .collect(),
            )
        }
    }
}

impl FromPropval for u64 {
    fn from_propval(propval: &[u8]) -> Option<Self> {
        if propval.len() == SIZE_U64 {
            Some(u64::from_be_bytes(propval.try_into().unwrap()))
        } else {
            None
        }
    }
}

impl FromPropval for String {
    fn from_propval(propval: &[u8]) -> Option<Self> {
        match propval.split_last() {
            Some((0, rest)) if !rest.contains(&0) => String::from_utf8(rest.into()).ok(),
            _ => None,
        }
    }
}
