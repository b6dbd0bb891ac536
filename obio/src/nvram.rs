// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Battery-backed NVRAM and the boot-parameter bridge.
//!
//! The platform writes a fixed-layout configuration record at the start of
//! the NVRAM before firmware runs. Probing the device validates the record,
//! republishes the kernel hand-off fields into the boot context, and
//! exposes the identity blob as the `idprom` root property.

use std::mem::size_of;

use log::error;
use log::info;
use zerocopy::byteorder::BigEndian;
use zerocopy::byteorder::U32;
use zerocopy::FromBytes;
use zerocopy::Immutable;
use zerocopy::IntoBytes;
use zerocopy::KnownLayout;

use crate::boot::BootContext;
use crate::bus::begin_device;
use crate::bus::map_and_publish;
use crate::bus::reg_prop;
use crate::cursor::TreeCursor;
use crate::io::IoWindow;
use crate::io::PhysMapper;
use crate::Error;
use crate::Result;

/// Size of the NVRAM register window.
pub const NVRAM_SIZE: u32 = 0x2000;
/// Offset of the 32-byte identity blob within the window.
pub const NVRAM_IDPROM: u64 = 0x1fd8;
pub const IDPROM_LEN: usize = 32;

const NVRAM_ID: &[u8] = b"QEMU_BIOS";
const NVRAM_VERSION: u32 = 1;

/// Configuration record at the start of the NVRAM. All multi-byte fields
/// are big-endian.
#[repr(C)]
#[derive(Clone, Copy, FromBytes, Immutable, IntoBytes, KnownLayout)]
pub struct NvramHeader {
    pub id_string: [u8; 16],
    pub version: U32<BigEndian>,
    pub kernel_image: U32<BigEndian>,
    pub kernel_size: U32<BigEndian>,
    pub cmdline: U32<BigEndian>,
    pub cmdline_size: U32<BigEndian>,
    pub boot_device: u8,
    pub reserved: [u8; 3],
}

impl NvramHeader {
    // `id_string` up to its NUL terminator.
    fn id(&self) -> &[u8] {
        let end = self
            .id_string
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.id_string.len());
        &self.id_string[..end]
    }
}

/// The mapped NVRAM, held for the remainder of boot.
pub struct Nvram {
    window: Box<dyn IoWindow>,
}

impl std::fmt::Debug for Nvram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Nvram").finish_non_exhaustive()
    }
}

impl Nvram {
    pub fn size(&self) -> usize {
        NVRAM_SIZE as usize
    }

    /// Copy the whole NVRAM contents into `data`.
    pub fn read(&self, data: &mut [u8; NVRAM_SIZE as usize]) {
        self.window.read(0, data);
    }

    /// Overwrite the whole NVRAM contents from `data`.
    pub fn write(&mut self, data: &[u8; NVRAM_SIZE as usize]) {
        self.window.write(0, data);
    }
}

/// Probe the NVRAM: describe it in the tree, validate the boot-parameter
/// record, and republish the hand-off fields.
///
/// A record with an unknown id string or version is an unrecoverable
/// platform mismatch: the error must halt the boot sequence, and no boot
/// field is republished.
pub fn create_nvram_node<C: TreeCursor>(
    cursor: &mut C,
    mapper: &mut dyn PhysMapper,
    boot: &mut BootContext,
    base: u64,
    offset: u64,
) -> Result<Nvram> {
    begin_device(cursor, "eeprom", None)?;
    reg_prop(cursor, offset, NVRAM_SIZE)?;
    // Always mapped: the record must also be read locally.
    let window = map_and_publish(cursor, mapper, base, offset, NVRAM_SIZE as u64)?;

    let mut raw = [0u8; size_of::<NvramHeader>()];
    window.read(0, &mut raw);
    let header: NvramHeader = zerocopy::transmute!(raw);

    let id = String::from_utf8_lossy(header.id());
    info!("nvram id {:?}, version {}", id, header.version.get());
    if header.id() != NVRAM_ID {
        error!("unknown nvram id {:?}, halting boot", id);
        return Err(Error::NvramId(id.into_owned()));
    }
    if header.version.get() != NVRAM_VERSION {
        error!(
            "unsupported nvram version {}, halting boot",
            header.version.get()
        );
        return Err(Error::NvramVersion(header.version.get()));
    }

    boot.kernel_image = header.kernel_image.get();
    boot.kernel_size = header.kernel_size.get();
    boot.cmdline = header.cmdline.get();
    boot.cmdline_size = header.cmdline_size.get();
    boot.boot_device = header.boot_device;

    cursor.set_prop("model", "mk48t08")?;
    cursor.finish_node()?;

    let mut idprom = [0u8; IDPROM_LEN];
    window.read(NVRAM_IDPROM, &mut idprom);
    cursor.set_root_prop("idprom", &idprom)?;

    Ok(Nvram { window })
}
