// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

/// Hand-off state consumed by the kernel loader stage.
///
/// Created empty before bus probing, populated exactly once by the NVRAM
/// bridge, and read-only from then on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BootContext {
    /// Physical load address of the kernel image.
    pub kernel_image: u32,
    /// Size of the kernel image in bytes.
    pub kernel_size: u32,
    /// Physical address of the kernel command line.
    pub cmdline: u32,
    /// Size of the kernel command line in bytes.
    pub cmdline_size: u32,
    /// Identifier byte of the device to boot from.
    pub boot_device: u8,
}
