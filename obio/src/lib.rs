// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Boot-time probing of the on-board I/O (OBIO) bus.
//!
//! Builds the `/obio` subtree of the firmware device tree from the static
//! SLAVIO register layout and performs the little direct register setup
//! (timer limits, interrupt masks) the platform needs before the loaded
//! kernel takes over.

use remain::sorted;
use thiserror::Error as ThisError;

mod boot;
mod bus;
mod cursor;
mod io;
mod nvram;
pub mod slavio;
#[cfg(test)]
mod testing;

pub use boot::BootContext;
pub use bus::init;
pub use cursor::TreeCursor;
pub use io::read_u32;
pub use io::write_u32;
pub use io::IoWindow;
pub use io::PhysMapper;
pub use nvram::Nvram;
pub use nvram::NvramHeader;
pub use nvram::IDPROM_LEN;
pub use nvram::NVRAM_IDPROM;
pub use nvram::NVRAM_SIZE;

#[sorted]
#[derive(ThisError, Debug)]
pub enum Error {
    #[error("failed to map register window at {phys:#x}+{size:#x}")]
    Map {
        phys: u64,
        size: u64,
        #[source]
        source: anyhow::Error,
    },
    #[error("nvram id {0:?} is not supported")]
    NvramId(String),
    #[error("nvram version {0} is not supported")]
    NvramVersion(u32),
    #[error(transparent)]
    Tree(#[from] prom_tree::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
