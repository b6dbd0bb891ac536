// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Per-device node construction and the bus probe sequence.

use log::debug;

use crate::cursor::TreeCursor;
use crate::io::write_u32;
use crate::io::IoWindow;
use crate::io::PhysMapper;
use crate::nvram::create_nvram_node;
use crate::nvram::Nvram;
use crate::slavio::*;
use crate::BootContext;
use crate::Error;
use crate::Result;

const OBIO_PATH: &str = "/obio";

// Width cell of a published `address` property.
const ADDRESS_WIDTH: u32 = 4;

pub(crate) fn begin_device<C: TreeCursor>(
    cursor: &mut C,
    name: &str,
    device_type: Option<&str>,
) -> Result<()> {
    cursor.begin_node(OBIO_PATH)?;
    cursor.set_name(name)?;
    if let Some(device_type) = device_type {
        cursor.set_type(device_type)?;
    }
    Ok(())
}

/// Emit `reg = [0, offset, size]` for a single register range.
pub(crate) fn reg_prop<C: TreeCursor>(cursor: &mut C, offset: u64, size: u32) -> Result<()> {
    cursor.set_prop("reg", &[0u32, offset as u32, size])
}

fn map_window(mapper: &mut dyn PhysMapper, phys: u64, size: u64) -> Result<Box<dyn IoWindow>> {
    mapper
        .map_io(phys, size)
        .map_err(|source| Error::Map { phys, size, source })
}

/// Map a register window and advertise it as `address = [mapped, 4]`.
pub(crate) fn map_and_publish<C: TreeCursor>(
    cursor: &mut C,
    mapper: &mut dyn PhysMapper,
    base: u64,
    offset: u64,
    size: u64,
) -> Result<Box<dyn IoWindow>> {
    let window = map_window(mapper, base + offset, size)?;
    cursor.set_prop("address", &[window.mapped_address(), ADDRESS_WIDTH])?;
    Ok(window)
}

// Emit `reg` for one range and, when the device's driver needs direct
// register access, map the range and publish the mapping. Descriptive-only
// devices must not touch the mapper at all.
fn reg_window<C: TreeCursor>(
    cursor: &mut C,
    mapper: &mut dyn PhysMapper,
    base: u64,
    offset: u64,
    size: u32,
    publish: bool,
) -> Result<Option<Box<dyn IoWindow>>> {
    reg_prop(cursor, offset, size)?;
    if !publish {
        return Ok(None);
    }
    Ok(Some(map_and_publish(
        cursor,
        mapper,
        base,
        offset,
        size as u64,
    )?))
}

/// Emit `intr = [line, 0]`: the interrupt cell plus a reserved-zero cell.
fn intr_prop<C: TreeCursor>(cursor: &mut C, line: u32) -> Result<()> {
    cursor.set_prop("intr", &[line, 0u32])
}

fn create_serial_node<C: TreeCursor>(
    cursor: &mut C,
    mapper: &mut dyn PhysMapper,
    base: u64,
    offset: u64,
    intr: u32,
    slave: u32,
    keyboard: bool,
) -> Result<()> {
    begin_device(cursor, "zs", Some("serial"))?;
    reg_window(cursor, mapper, base, offset, ZS_REGS, true)?;
    cursor.set_prop("slave", slave)?;
    if keyboard {
        // Placeholders the input stack fills in once it has probed the
        // attached devices.
        cursor.set_prop("keyboard", -1i32)?;
        cursor.set_prop("mouse", -1i32)?;
    }
    intr_prop(cursor, intr)?;
    cursor.finish_node()?;
    Ok(())
}

fn create_floppy_node<C: TreeCursor>(
    cursor: &mut C,
    mapper: &mut dyn PhysMapper,
    base: u64,
    offset: u64,
    intr: u32,
) -> Result<()> {
    begin_device(cursor, "SUNW,fdtwo", Some("block"))?;
    reg_window(cursor, mapper, base, offset, FD_REGS, false)?;
    intr_prop(cursor, intr)?;
    cursor.finish_node()?;
    Ok(())
}

fn create_sconfig_node<C: TreeCursor>(
    cursor: &mut C,
    mapper: &mut dyn PhysMapper,
    base: u64,
    offset: u64,
) -> Result<()> {
    begin_device(cursor, "slavioconfig", None)?;
    reg_window(cursor, mapper, base, offset, SCONFIG_REGS, false)?;
    cursor.finish_node()?;
    Ok(())
}

fn create_auxio_node<C: TreeCursor>(
    cursor: &mut C,
    mapper: &mut dyn PhysMapper,
    base: u64,
    offset: u64,
) -> Result<()> {
    begin_device(cursor, "auxio", None)?;
    reg_window(cursor, mapper, base, offset, AUXIO_REGS, false)?;
    cursor.finish_node()?;
    Ok(())
}

fn create_power_node<C: TreeCursor>(
    cursor: &mut C,
    mapper: &mut dyn PhysMapper,
    base: u64,
    offset: u64,
    intr: u32,
) -> Result<()> {
    begin_device(cursor, "power", None)?;
    reg_window(cursor, mapper, base, offset, POWER_REGS, false)?;
    intr_prop(cursor, intr)?;
    cursor.finish_node()?;
    Ok(())
}

fn create_counter_node<C: TreeCursor>(
    cursor: &mut C,
    mapper: &mut dyn PhysMapper,
    base: u64,
    offset: u64,
) -> Result<()> {
    begin_device(cursor, "counter", None)?;
    // Two ranges: the per-CPU L14 block and the global L10 block.
    cursor.set_prop(
        "reg",
        &[
            0u32,
            offset as u32,
            COUNTER_REGS,
            0,
            (offset + SYS_REGS_OFFSET) as u32,
            COUNTER_REGS,
        ],
    )?;
    cursor.finish_node()?;

    let mut regs = map_window(mapper, base + offset, TIMER_MAP_LEN)?;
    let limit = ((TIMER_BASE_HZ / SCHED_HZ) + 1) << 10;
    write_u32(&mut *regs, TIMER_L10_LIMIT, limit);
    write_u32(&mut *regs, timer_l14_limit(0), 0);
    Ok(())
}

fn create_interrupt_node<C: TreeCursor>(
    cursor: &mut C,
    mapper: &mut dyn PhysMapper,
    base: u64,
    offset: u64,
) -> Result<()> {
    begin_device(cursor, "interrupt", None)?;
    cursor.set_prop(
        "reg",
        &[
            0u32,
            offset as u32,
            INTERRUPT_REGS,
            0,
            (offset + SYS_REGS_OFFSET) as u32,
            INTERRUPT_REGS,
        ],
    )?;

    // The masks must be programmed before the mapped pointer is advertised
    // so nothing can poke a half-initialized controller.
    let mut regs = map_window(mapper, base + offset, INTR_MAP_LEN)?;
    write_u32(&mut *regs, INTR_SYS_MASK_SET, !INT_MASKALL);
    write_u32(&mut *regs, intr_cpu_mask_clear(0), !CPU_INT_BASELINE);

    let addr = regs.mapped_address();
    // TODO: the second cell repeats the mapped pointer; check what real OBP
    // puts here.
    cursor.set_prop("address", &[addr, addr])?;
    cursor.finish_node()?;
    Ok(())
}

fn create_bus_node<C: TreeCursor>(cursor: &mut C, base: u64) -> Result<()> {
    cursor.begin_node("/")?;
    cursor.set_name("obio")?;
    cursor.set_type("hierarchical")?;
    cursor.set_prop("#address-cells", 2u32)?;
    cursor.set_prop("#size-cells", 1u32)?;
    cursor.set_prop("ranges", &[0u32, 0, 0, base as u32, SLAVIO_SIZE])?;
    cursor.finish_node()?;
    Ok(())
}

/// Probe the OBIO bus at `base`: commit the `/obio` subtree and program the
/// timer and interrupt controller for handoff.
///
/// Returns the mapped NVRAM; the only fatal outcome is a boot-parameter
/// record the firmware does not understand.
pub fn init<C: TreeCursor>(
    cursor: &mut C,
    mapper: &mut dyn PhysMapper,
    boot: &mut BootContext,
    base: u64,
) -> Result<Nvram> {
    debug!("probing obio devices at {base:#x}");

    create_bus_node(cursor, base)?;

    // The console line must come up before zs@0,0: kernel console
    // auto-detection picks the first serial node it enumerates.
    create_serial_node(cursor, mapper, base, SLAVIO_ZS1, ZS_INTR, 0, false)?;
    create_serial_node(cursor, mapper, base, SLAVIO_ZS, ZS_INTR, 1, true)?;

    let nvram = create_nvram_node(cursor, mapper, boot, base, SLAVIO_NVRAM)?;

    create_floppy_node(cursor, mapper, base, SLAVIO_FD, FD_INTR)?;
    create_sconfig_node(cursor, mapper, base, SLAVIO_SCONFIG)?;
    create_auxio_node(cursor, mapper, base, SLAVIO_AUXIO)?;
    create_power_node(cursor, mapper, base, SLAVIO_POWER, POWER_INTR)?;
    create_counter_node(cursor, mapper, base, SLAVIO_COUNTER)?;
    create_interrupt_node(cursor, mapper, base, SLAVIO_INTERRUPT)?;

    Ok(nvram)
}

#[cfg(test)]
mod tests {
    use prom_tree::PromTree;
    use zerocopy::byteorder::BigEndian;
    use zerocopy::byteorder::U32;
    use zerocopy::IntoBytes;

    use super::*;
    use crate::nvram::NvramHeader;
    use crate::nvram::NVRAM_IDPROM;
    use crate::testing::FakeMapper;
    use crate::testing::FAKE_VIRT_BASE;

    const BUS_BASE: u64 = 0x7100_0000;

    fn test_header() -> NvramHeader {
        NvramHeader {
            id_string: *b"QEMU_BIOS\0\0\0\0\0\0\0",
            version: U32::<BigEndian>::new(1),
            kernel_image: U32::new(0x4000),
            kernel_size: U32::new(0x80_0000),
            cmdline: U32::new(0x1_0000),
            cmdline_size: U32::new(64),
            boot_device: b'd',
            reserved: [0; 3],
        }
    }

    fn seeded_mapper(header: &NvramHeader, idprom: &[u8; 32]) -> FakeMapper {
        let mut mapper = FakeMapper::new(BUS_BASE, SLAVIO_SIZE as usize);
        mapper.write_phys(BUS_BASE + SLAVIO_NVRAM, header.as_bytes());
        mapper.write_phys(BUS_BASE + SLAVIO_NVRAM + NVRAM_IDPROM, idprom);
        mapper
    }

    #[test]
    fn serial_node_properties() {
        let mut tree = PromTree::new();
        let mut mapper = FakeMapper::new(0x1000, 0x100);
        create_bus_node(&mut tree, 0x1000).unwrap();
        create_serial_node(&mut tree, &mut mapper, 0x1000, 0, 5, 1, true).unwrap();

        let node = tree.node("/obio/zs").unwrap();
        assert_eq!(node.device_type(), Some("serial"));
        assert_eq!(node.prop::<Vec<u32>>("reg").unwrap(), [0, 0, ZS_REGS]);
        assert_eq!(
            node.prop::<Vec<u32>>("address").unwrap(),
            [FAKE_VIRT_BASE, 4]
        );
        assert_eq!(node.prop::<u32>("slave").unwrap(), 1);
        assert_eq!(node.prop::<u32>("keyboard").unwrap(), u32::MAX);
        assert_eq!(node.prop::<u32>("mouse").unwrap(), u32::MAX);
        assert_eq!(node.prop::<Vec<u32>>("intr").unwrap(), [5, 0]);
        assert_eq!(
            node.prop_names().collect::<Vec<_>>(),
            ["reg", "address", "slave", "keyboard", "mouse", "intr"]
        );
    }

    #[test]
    fn console_serial_has_no_keyboard_props() {
        let mut tree = PromTree::new();
        let mut mapper = FakeMapper::new(0x1000, 0x100);
        create_bus_node(&mut tree, 0x1000).unwrap();
        create_serial_node(&mut tree, &mut mapper, 0x1000, 0, ZS_INTR, 0, false).unwrap();

        let node = tree.node("/obio/zs").unwrap();
        assert_eq!(node.prop::<u32>("slave").unwrap(), 0);
        assert!(node.prop_raw("keyboard").is_none());
        assert!(node.prop_raw("mouse").is_none());
    }

    #[test]
    fn intr_prop_is_two_cells() {
        let mut tree = PromTree::new();
        tree.begin_node("/").unwrap();
        tree.set_name("power").unwrap();
        intr_prop(&mut tree, 2).unwrap();
        tree.finish_node().unwrap();
        assert_eq!(
            tree.node("/power").unwrap().prop_raw("intr").unwrap(),
            [0, 0, 0, 2, 0, 0, 0, 0]
        );
    }

    #[test]
    fn describe_only_never_maps() {
        let mut tree = PromTree::new();
        let mut mapper = FakeMapper::new(BUS_BASE, SLAVIO_SIZE as usize);
        create_bus_node(&mut tree, BUS_BASE).unwrap();
        create_sconfig_node(&mut tree, &mut mapper, BUS_BASE, SLAVIO_SCONFIG).unwrap();

        assert!(mapper.map_calls.is_empty());
        let node = tree.node("/obio/slavioconfig").unwrap();
        assert!(node.prop_raw("address").is_none());
        assert_eq!(
            node.prop::<Vec<u32>>("reg").unwrap(),
            [0, SLAVIO_SCONFIG as u32, SCONFIG_REGS]
        );
    }

    #[test]
    fn init_commits_devices_in_probe_order() {
        let mut tree = PromTree::new();
        let mut mapper = seeded_mapper(&test_header(), &[0xa5; 32]);
        let mut boot = BootContext::default();
        init(&mut tree, &mut mapper, &mut boot, BUS_BASE).unwrap();

        let bus = tree.node("/obio").unwrap();
        assert_eq!(bus.device_type(), Some("hierarchical"));
        assert_eq!(bus.prop::<u32>("#address-cells").unwrap(), 2);
        assert_eq!(bus.prop::<u32>("#size-cells").unwrap(), 1);
        assert_eq!(
            bus.prop::<Vec<u32>>("ranges").unwrap(),
            [0, 0, 0, BUS_BASE as u32, SLAVIO_SIZE]
        );

        let names: Vec<_> = bus.children().iter().map(|c| c.name()).collect();
        assert_eq!(
            names,
            [
                "zs",
                "zs",
                "eeprom",
                "SUNW,fdtwo",
                "slavioconfig",
                "auxio",
                "power",
                "counter",
                "interrupt"
            ]
        );

        // The keyboard line strictly follows the console line.
        assert_eq!(bus.children()[0].prop::<u32>("slave").unwrap(), 0);
        assert!(bus.children()[0].prop_raw("keyboard").is_none());
        assert_eq!(bus.children()[1].prop::<u32>("slave").unwrap(), 1);
        assert!(bus.children()[1].prop_raw("keyboard").is_some());
    }

    #[test]
    fn init_republishes_boot_params() {
        let mut tree = PromTree::new();
        let idprom = [0x5a; 32];
        let mut mapper = seeded_mapper(&test_header(), &idprom);
        let mut boot = BootContext::default();
        init(&mut tree, &mut mapper, &mut boot, BUS_BASE).unwrap();

        assert_eq!(
            boot,
            BootContext {
                kernel_image: 0x4000,
                kernel_size: 0x80_0000,
                cmdline: 0x1_0000,
                cmdline_size: 64,
                boot_device: b'd',
            }
        );
        assert_eq!(tree.root().prop_raw("idprom").unwrap(), idprom);
        assert_eq!(
            tree.node("/obio/eeprom")
                .unwrap()
                .prop::<String>("model")
                .unwrap(),
            "mk48t08"
        );
    }

    #[test]
    fn init_programs_timer_limits() {
        let mut tree = PromTree::new();
        let mut mapper = seeded_mapper(&test_header(), &[0; 32]);
        let mut boot = BootContext::default();
        init(&mut tree, &mut mapper, &mut boot, BUS_BASE).unwrap();

        let counter = BUS_BASE + SLAVIO_COUNTER;
        assert_eq!(
            mapper.read_u32_phys(counter + TIMER_L10_LIMIT),
            ((1_000_000 / 100) + 1) << 10
        );
        assert_eq!(mapper.read_u32_phys(counter + timer_l14_limit(0)), 0);
    }

    #[test]
    fn init_programs_interrupt_masks() {
        let mut tree = PromTree::new();
        let mut mapper = seeded_mapper(&test_header(), &[0; 32]);
        let mut boot = BootContext::default();
        init(&mut tree, &mut mapper, &mut boot, BUS_BASE).unwrap();

        let intc = BUS_BASE + SLAVIO_INTERRUPT;
        assert_eq!(mapper.read_u32_phys(intc + INTR_SYS_MASK_SET), 0x7fff_ffff);
        assert_eq!(
            mapper.read_u32_phys(intc + intr_cpu_mask_clear(0)),
            0xfffe_8000
        );
    }

    // The original firmware advertises the mapped pointer in both cells of
    // the interrupt controller's `address` property instead of a pointer
    // and a width; that quirk is load-bearing until proven otherwise.
    #[test]
    fn interrupt_address_carries_pointer_twice() {
        let mut tree = PromTree::new();
        let mut mapper = seeded_mapper(&test_header(), &[0; 32]);
        let mut boot = BootContext::default();
        init(&mut tree, &mut mapper, &mut boot, BUS_BASE).unwrap();

        let mapped = FAKE_VIRT_BASE + SLAVIO_INTERRUPT as u32;
        assert_eq!(
            tree.node("/obio/interrupt")
                .unwrap()
                .prop::<Vec<u32>>("address")
                .unwrap(),
            [mapped, mapped]
        );
    }

    #[test]
    fn bad_nvram_id_halts_before_republishing() {
        let mut header = test_header();
        header.id_string = *b"OTHER_BIOS\0\0\0\0\0\0";
        let mut tree = PromTree::new();
        let mut mapper = seeded_mapper(&header, &[0; 32]);
        let mut boot = BootContext::default();

        let err = init(&mut tree, &mut mapper, &mut boot, BUS_BASE).unwrap_err();
        assert!(matches!(err, Error::NvramId(id) if id == "OTHER_BIOS"));
        assert_eq!(boot, BootContext::default());
        assert!(tree.node("/obio/eeprom").is_none());
        assert!(tree.root().prop_raw("idprom").is_none());
    }

    #[test]
    fn bad_nvram_version_halts_before_republishing() {
        let mut header = test_header();
        header.version = U32::new(2);
        let mut tree = PromTree::new();
        let mut mapper = seeded_mapper(&header, &[0; 32]);
        let mut boot = BootContext::default();

        let err = init(&mut tree, &mut mapper, &mut boot, BUS_BASE).unwrap_err();
        assert!(matches!(err, Error::NvramVersion(2)));
        assert_eq!(boot, BootContext::default());
        assert!(tree.node("/obio/eeprom").is_none());
    }

    #[test]
    fn nvram_window_round_trips() {
        let mut tree = PromTree::new();
        let mut mapper = seeded_mapper(&test_header(), &[0; 32]);
        let mut boot = BootContext::default();
        let mut nvram = init(&mut tree, &mut mapper, &mut boot, BUS_BASE).unwrap();

        let mut image = [0u8; 0x2000];
        image[0x100] = 0xab;
        nvram.write(&image);
        assert_eq!(mapper.read_u32_phys(BUS_BASE + SLAVIO_NVRAM + 0x100), 0xab00_0000);

        let mut readback = [0u8; 0x2000];
        nvram.read(&mut readback);
        assert_eq!(readback[0x100], 0xab);
        assert_eq!(nvram.size(), 0x2000);
    }
}
