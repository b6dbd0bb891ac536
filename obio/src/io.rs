// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Register window access over mapped physical ranges.

/// A register window mapped into firmware-addressable memory.
///
/// A handle is a view of the mapping, not its owner: dropping it must not
/// unmap anything. Every window mapped during bus probing stays mapped
/// until boot handoff.
pub trait IoWindow {
    /// The firmware-visible address of the mapping, as advertised in
    /// `address` properties.
    fn mapped_address(&self) -> u32;
    /// Read `data.len()` bytes starting at `offset` into the window.
    fn read(&self, offset: u64, data: &mut [u8]);
    /// Write `data` starting at `offset` into the window.
    fn write(&mut self, offset: u64, data: &[u8]);
}

/// Platform physical-memory mapper.
pub trait PhysMapper {
    /// Map `size` bytes of physical address space starting at `phys`.
    fn map_io(&mut self, phys: u64, size: u64) -> anyhow::Result<Box<dyn IoWindow>>;
}

// Device registers on this bus are big-endian words.

pub fn read_u32(window: &dyn IoWindow, offset: u64) -> u32 {
    let mut buf = [0u8; 4];
    window.read(offset, &mut buf);
    u32::from_be_bytes(buf)
}

pub fn write_u32(window: &mut dyn IoWindow, offset: u64, value: u32) {
    window.write(offset, &value.to_be_bytes());
}
