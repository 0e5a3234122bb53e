//! Reference device model backed by sparse shadow memory and a register map
//! recovered from recorded driver operations.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{
    DeviceDescription, DeviceModel, Direction, InterfaceId, InterfaceKind, InterfaceRegistry,
    ModelFault,
};

/// Directions a described register was observed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RegisterPermissions {
    /// At least one recorded read.
    pub readable: bool,
    /// At least one recorded write.
    pub writable: bool,
}

#[derive(Debug, Clone, Copy)]
struct RegisterSlot {
    size: u64,
    permissions: RegisterPermissions,
}

#[derive(Debug, Clone)]
enum Window {
    Mmio {
        size: u64,
        shadow: BTreeMap<u64, u8>,
        registers: BTreeMap<u64, RegisterSlot>,
    },
    Dma,
}

/// Counters accumulated across every dispatched access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ModelStats {
    /// Accepted MMIO reads.
    pub reads: u64,
    /// Accepted MMIO writes.
    pub writes: u64,
    /// Accepted DMA transfers.
    pub dma_transfers: u64,
    /// Bytes delivered by accepted DMA transfers.
    pub dma_bytes: u64,
    /// Accesses rejected with a fault.
    pub faults: u64,
}

/// Device model enforcing the register directions recorded in a description.
///
/// Offsets never covered by a described register behave as plain memory.
/// Writes land in shadow memory and reads return the last written bytes, or
/// zero for untouched bytes.
#[derive(Debug, Clone)]
pub struct RegisterMapModel {
    windows: Vec<Window>,
    stats: ModelStats,
}

impl RegisterMapModel {
    /// Builds a model for `registry` using the register accesses of `description`.
    ///
    /// The `regionId` of each recorded access is the index of the MMIO window
    /// among the registry's MMIO interfaces; accesses naming a missing window
    /// are ignored.
    #[must_use]
    pub fn new(registry: &InterfaceRegistry, description: &DeviceDescription) -> Self {
        let mut windows: Vec<Window> = registry
            .list()
            .iter()
            .map(|interface| match interface.kind() {
                InterfaceKind::Mmio => Window::Mmio {
                    size: interface.size(),
                    shadow: BTreeMap::new(),
                    registers: BTreeMap::new(),
                },
                InterfaceKind::Dma => Window::Dma,
            })
            .collect();
        let mmio_slots: Vec<usize> = registry
            .list()
            .iter()
            .filter(|interface| interface.kind() == InterfaceKind::Mmio)
            .map(|interface| interface.id().index())
            .collect();

        for access in description.register_accesses() {
            let Some(Window::Mmio { registers, .. }) = mmio_slots
                .get(access.region)
                .and_then(|slot| windows.get_mut(*slot))
            else {
                tracing::debug!(
                    region = access.region,
                    name = %access.name,
                    "register names a missing mmio window"
                );
                continue;
            };
            let slot = registers.entry(access.offset).or_insert(RegisterSlot {
                size: access.size,
                permissions: RegisterPermissions::default(),
            });
            slot.size = slot.size.max(access.size);
            match access.direction {
                Direction::Read => slot.permissions.readable = true,
                Direction::Write => slot.permissions.writable = true,
            }
        }

        Self {
            windows,
            stats: ModelStats::default(),
        }
    }

    /// Model with no described registers: every MMIO offset is plain memory.
    #[must_use]
    pub fn unconstrained(registry: &InterfaceRegistry) -> Self {
        Self::new(registry, &DeviceDescription::named("unconstrained"))
    }

    /// Counters accumulated so far.
    #[must_use]
    pub const fn stats(&self) -> ModelStats {
        self.stats
    }

    /// Number of described registers across all MMIO windows.
    #[must_use]
    pub fn register_count(&self) -> usize {
        self.windows
            .iter()
            .map(|window| match window {
                Window::Mmio { registers, .. } => registers.len(),
                Window::Dma => 0,
            })
            .sum()
    }

    /// Permissions of the register starting exactly at `offset`, if described.
    #[must_use]
    pub fn permissions(&self, interface: InterfaceId, offset: u64) -> Option<RegisterPermissions> {
        match self.windows.get(interface.index()) {
            Some(Window::Mmio { registers, .. }) => {
                registers.get(&offset).map(|slot| slot.permissions)
            }
            _ => None,
        }
    }

    fn fault(&mut self, detail: String) -> ModelFault {
        self.stats.faults += 1;
        ModelFault::new(detail)
    }

    fn check_mmio(
        &mut self,
        interface: InterfaceId,
        offset: u64,
        length: usize,
        direction: Direction,
    ) -> Result<(), ModelFault> {
        let end = offset.saturating_add(u64::try_from(length).unwrap_or(u64::MAX));
        let violation = match self.windows.get(interface.index()) {
            None => Some(format!("access to unregistered interface {interface}")),
            Some(Window::Dma) => Some(format!("mmio access to dma channel {interface}")),
            Some(Window::Mmio {
                size, registers, ..
            }) => {
                if end > *size {
                    Some(format!(
                        "access 0x{offset:x}..0x{end:x} outside {interface} window of 0x{size:x}"
                    ))
                } else {
                    check_registers(registers, offset, end, direction)
                }
            }
        };
        violation.map_or(Ok(()), |detail| Err(self.fault(detail)))
    }

    fn shadow_mut(&mut self, interface: InterfaceId) -> Option<&mut BTreeMap<u64, u8>> {
        match self.windows.get_mut(interface.index()) {
            Some(Window::Mmio { shadow, .. }) => Some(shadow),
            _ => None,
        }
    }
}

fn check_registers(
    registers: &BTreeMap<u64, RegisterSlot>,
    start: u64,
    end: u64,
    direction: Direction,
) -> Option<String> {
    registers
        .range(..end)
        .filter(|(offset, slot)| start < offset.saturating_add(slot.size))
        .find_map(|(offset, slot)| match direction {
            Direction::Write if !slot.permissions.writable => {
                Some(format!("write to read-only register at 0x{offset:x}"))
            }
            Direction::Read if !slot.permissions.readable => {
                Some(format!("read from write-only register at 0x{offset:x}"))
            }
            Direction::Read | Direction::Write => None,
        })
}

impl DeviceModel for RegisterMapModel {
    fn mmio_read(
        &mut self,
        interface: InterfaceId,
        offset: u64,
        data: &mut [u8],
    ) -> Result<(), ModelFault> {
        self.check_mmio(interface, offset, data.len(), Direction::Read)?;
        if let Some(shadow) = self.shadow_mut(interface) {
            for (address, byte) in (offset..).zip(data.iter_mut()) {
                *byte = shadow.get(&address).copied().unwrap_or(0);
            }
        }
        self.stats.reads += 1;
        Ok(())
    }

    fn mmio_write(
        &mut self,
        interface: InterfaceId,
        offset: u64,
        data: &[u8],
    ) -> Result<(), ModelFault> {
        self.check_mmio(interface, offset, data.len(), Direction::Write)?;
        if let Some(shadow) = self.shadow_mut(interface) {
            for (address, byte) in (offset..).zip(data) {
                shadow.insert(address, *byte);
            }
        }
        self.stats.writes += 1;
        Ok(())
    }

    fn dma_transfer(&mut self, interface: InterfaceId, data: &[u8]) -> Result<(), ModelFault> {
        match self.windows.get(interface.index()) {
            Some(Window::Dma) => {
                self.stats.dma_transfers += 1;
                self.stats.dma_bytes += u64::try_from(data.len()).unwrap_or(u64::MAX);
                Ok(())
            }
            Some(Window::Mmio { .. }) => {
                Err(self.fault(format!("dma transfer on mmio window {interface}")))
            }
            None => Err(self.fault(format!("access to unregistered interface {interface}"))),
        }
    }
}
