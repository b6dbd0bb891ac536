// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! SLAVIO register layout, as modeled by QEMU's sun4m machine.
//!
//! Offsets are relative to the bus base address. The counter and interrupt
//! controller each expose a per-CPU block (one page per CPU) and a global
//! block one 64K step above it.

// Device offsets within the bus.
pub const SLAVIO_ZS: u64 = 0x0000_0000;
pub const SLAVIO_ZS1: u64 = 0x0010_0000;
pub const SLAVIO_NVRAM: u64 = 0x0020_0000;
pub const SLAVIO_FD: u64 = 0x0040_0000;
pub const SLAVIO_SCONFIG: u64 = 0x0080_0000;
pub const SLAVIO_AUXIO: u64 = 0x0090_0000;
pub const SLAVIO_POWER: u64 = 0x0091_0000;
pub const SLAVIO_COUNTER: u64 = 0x00d0_0000;
pub const SLAVIO_INTERRUPT: u64 = 0x00e0_0000;

/// Size of the bus address space, for the `ranges` property.
pub const SLAVIO_SIZE: u32 = 0x0100_0000;

// Register-block sizes and interrupt lines per device.
pub const ZS_REGS: u32 = 8;
pub const ZS_INTR: u32 = 12;
pub const FD_REGS: u32 = 15;
pub const FD_INTR: u32 = 11;
pub const SCONFIG_REGS: u32 = 4;
pub const AUXIO_REGS: u32 = 4;
pub const POWER_REGS: u32 = 4;
pub const POWER_INTR: u32 = 2;
pub const COUNTER_REGS: u32 = 16;
pub const INTERRUPT_REGS: u32 = 16;

/// Distance from a per-CPU register block to its global block.
pub const SYS_REGS_OFFSET: u64 = 0x1_0000;

// Counter/timer block. One page of L14 registers per CPU, then the global
// L10 registers.
pub const TIMER_CPU_STRIDE: u64 = 0x1000;
pub const TIMER_L10_LIMIT: u64 = SYS_REGS_OFFSET;
pub const TIMER_L10_COUNT: u64 = SYS_REGS_OFFSET + 0x4;
pub const TIMER_MAP_LEN: u64 = SYS_REGS_OFFSET + 0x8;

/// Offset of a CPU's L14 timer limit register.
pub fn timer_l14_limit(cpu: u64) -> u64 {
    cpu * TIMER_CPU_STRIDE
}

/// The timebase ticks at 1MHz; the limit registers count microseconds
/// shifted left by 10.
pub const TIMER_BASE_HZ: u32 = 1_000_000;
/// System tick rate programmed at boot.
pub const SCHED_HZ: u32 = 100;

// Interrupt controller block. One page of per-CPU mask registers per CPU,
// then the global registers.
pub const INTR_CPU_PENDING: u64 = 0x0;
pub const INTR_CPU_MASK_CLEAR: u64 = 0x4;
pub const INTR_CPU_MASK_SET: u64 = 0x8;
pub const INTR_CPU_STRIDE: u64 = 0x1000;
pub const INTR_SYS_PENDING: u64 = SYS_REGS_OFFSET;
pub const INTR_SYS_MASK: u64 = SYS_REGS_OFFSET + 0x4;
pub const INTR_SYS_MASK_CLEAR: u64 = SYS_REGS_OFFSET + 0x8;
pub const INTR_SYS_MASK_SET: u64 = SYS_REGS_OFFSET + 0xc;
pub const INTR_MAP_LEN: u64 = SYS_REGS_OFFSET + 0x10;

/// Offset of a CPU's mask-clear register.
pub fn intr_cpu_mask_clear(cpu: u64) -> u64 {
    cpu * INTR_CPU_STRIDE + INTR_CPU_MASK_CLEAR
}

/// Master mask-all bit in the global mask register.
pub const INT_MASKALL: u32 = 0x8000_0000;
/// Interrupt sources left unmasked on the boot CPU.
pub const CPU_INT_BASELINE: u32 = 0x0001_7fff;
