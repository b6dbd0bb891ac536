// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Fake physical-memory mapper backed by an in-memory bus image.

use std::sync::Arc;
use std::sync::Mutex;

use anyhow::Context;

use crate::io::IoWindow;
use crate::io::PhysMapper;

/// Firmware-visible address handed out for a window at the image base.
pub const FAKE_VIRT_BASE: u32 = 0xf000_0000;

pub struct FakeMapper {
    image_base: u64,
    mem: Arc<Mutex<Vec<u8>>>,
    /// Every `(phys, size)` mapping requested, in order.
    pub map_calls: Vec<(u64, u64)>,
}

impl FakeMapper {
    pub fn new(image_base: u64, len: usize) -> Self {
        FakeMapper {
            image_base,
            mem: Arc::new(Mutex::new(vec![0; len])),
            map_calls: Vec::new(),
        }
    }

    pub fn write_phys(&mut self, phys: u64, data: &[u8]) {
        let start = (phys - self.image_base) as usize;
        self.mem.lock().unwrap()[start..start + data.len()].copy_from_slice(data);
    }

    pub fn read_u32_phys(&self, phys: u64) -> u32 {
        let start = (phys - self.image_base) as usize;
        let mem = self.mem.lock().unwrap();
        u32::from_be_bytes(mem[start..start + 4].try_into().unwrap())
    }
}

impl PhysMapper for FakeMapper {
    fn map_io(&mut self, phys: u64, size: u64) -> anyhow::Result<Box<dyn IoWindow>> {
        let start = phys
            .checked_sub(self.image_base)
            .with_context(|| format!("window {phys:#x} is below the bus image"))?
            as usize;
        let len = size as usize;
        anyhow::ensure!(
            start + len <= self.mem.lock().unwrap().len(),
            "window {phys:#x}+{size:#x} does not fit the bus image"
        );
        self.map_calls.push((phys, size));
        Ok(Box::new(FakeWindow {
            start,
            len,
            mapped: FAKE_VIRT_BASE + start as u32,
            mem: Arc::clone(&self.mem),
        }))
    }
}

// A view of the shared bus image; the backing storage outlives every
// window, mirroring mappings that persist until handoff.
struct FakeWindow {
    start: usize,
    len: usize,
    mapped: u32,
    mem: Arc<Mutex<Vec<u8>>>,
}

impl IoWindow for FakeWindow {
    fn mapped_address(&self) -> u32 {
        self.mapped
    }

    fn read(&self, offset: u64, data: &mut [u8]) {
        let offset = offset as usize;
        assert!(offset + data.len() <= self.len, "read past window end");
        let mem = self.mem.lock().unwrap();
        data.copy_from_slice(&mem[self.start + offset..self.start + offset + data.len()]);
    }

    fn write(&mut self, offset: u64, data: &[u8]) {
        let offset = offset as usize;
        assert!(offset + data.len() <= self.len, "write past window end");
        let mut mem = self.mem.lock().unwrap();
        mem[self.start + offset..self.start + offset + data.len()].copy_from_slice(data);
    }
}
