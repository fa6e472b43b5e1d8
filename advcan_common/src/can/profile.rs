//! Board profile table.
//!
//! Static mapping from a PCI device ID to the board's register layout:
//! how many CAN ports the card has, whether its controllers sit behind
//! I/O ports or memory-mapped registers, and which resource regions hold
//! them. The table is resolved once at bind time into an immutable
//! profile; nothing downstream branches on the device ID again.

use std::sync::LazyLock;

/// How a board exposes its per-port controller registers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessStrategy {
    /// Each port has its own I/O-port region; the region index list has
    /// one entry per port, in port order.
    PortAddressed {
        /// Resource region index per port.
        bars: Vec<usize>,
    },

    /// All ports share one memory-mapped region, `stride` bytes apart.
    MemoryMapped {
        /// Resource region index holding every port's registers.
        bar: usize,
        /// Byte distance between consecutive ports' register windows.
        stride: u64,
    },
}

/// Static description of one supported card model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardProfile {
    /// PCI device ID (vendor is always Advantech).
    pub device_id: u16,
    /// Human-readable model name for logs.
    pub name: &'static str,
    /// Number of CAN ports (1..=4).
    pub ports: usize,
    /// Register access strategy and layout.
    pub access: AccessStrategy,
}

impl BoardProfile {
    /// Region index holding port `port`'s registers.
    pub fn bar_for_port(&self, port: usize) -> usize {
        match &self.access {
            AccessStrategy::PortAddressed { bars } => bars[port],
            AccessStrategy::MemoryMapped { bar, .. } => *bar,
        }
    }

    /// Region indices to acquire, in acquisition order.
    pub fn bars(&self) -> Vec<usize> {
        match &self.access {
            AccessStrategy::PortAddressed { bars } => bars.clone(),
            AccessStrategy::MemoryMapped { bar, .. } => vec![*bar],
        }
    }
}

/// Memory-mapped families: all ports in BAR 0, `stride` bytes per
/// port, port count in the low nibble of the device ID.
fn mmio_board(device_id: u16, name: &'static str, stride: u64) -> BoardProfile {
    BoardProfile {
        device_id,
        name,
        ports: (device_id & 0xf) as usize,
        access: AccessStrategy::MemoryMapped { bar: 0, stride },
    }
}

/// Older port-addressed cards: one I/O-port region per port.
fn pio_board(device_id: u16, name: &'static str, bars: &[usize]) -> BoardProfile {
    BoardProfile {
        device_id,
        name,
        ports: bars.len(),
        access: AccessStrategy::PortAddressed {
            bars: bars.to_vec(),
        },
    }
}

/// All supported boards. Lookup of anything else is a configuration
/// error surfaced to the caller, never a default guess.
static PROFILES: LazyLock<Vec<BoardProfile>> = LazyLock::new(|| {
    vec![
        // I/O-port cards, registers in BAR 2 (and up, one per port).
        pio_board(0x1680, "PCI-1680", &[2, 3]),
        pio_board(0x3680, "MIC-3680", &[2, 3]),
        pio_board(0x2052, "UNO-2052(E)", &[2, 3]),
        pio_board(0x1681, "EAMB-PH07", &[2]),
        pio_board(0x1684, "PCI-1684", &[0, 1, 2, 3]),
        // Memory-mapped cards, BAR 0, 0x100 bytes per port.
        mmio_board(0xc001, "C001 CAN card (1 PORT)", 0x100),
        mmio_board(0xc002, "C002 CAN card (2 PORT)", 0x100),
        mmio_board(0xc004, "C004 CAN card (4 PORT)", 0x100),
        mmio_board(0xc101, "C101 CAN card (1 PORT, CANopen)", 0x100),
        mmio_board(0xc102, "C102 CAN card (2 PORT, CANopen)", 0x100),
        mmio_board(0xc104, "C104 CAN card (4 PORT, CANopen)", 0x100),
        // Memory-mapped cards, BAR 0, 0x400 bytes per port.
        mmio_board(0xc201, "C201 CAN card (1 PORT)", 0x400),
        mmio_board(0xc202, "C202 CAN card (2 PORT)", 0x400),
        mmio_board(0xc204, "C204 CAN card (4 PORT)", 0x400),
        mmio_board(0xc301, "C301 CAN card (1 PORT, CANopen)", 0x400),
        mmio_board(0xc302, "C302, MIOe-3680 (2 PORT, CANopen)", 0x400),
        mmio_board(0xc304, "C304 CAN card (4 PORT, CANopen)", 0x400),
    ]
});

/// Look up the profile for a device ID.
///
/// Pure and side-effect free. Returns `None` for unsupported IDs.
pub fn lookup(device_id: u16) -> Option<&'static BoardProfile> {
    PROFILES.iter().find(|p| p.device_id == device_id)
}

/// All supported board profiles.
pub fn supported() -> &'static [BoardProfile] {
    &PROFILES
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::can::consts::MAX_PORTS;

    #[test]
    fn lookup_known_board() {
        let profile = lookup(0xc302).expect("MIOe-3680 should be in the table");
        assert_eq!(profile.ports, 2);
        assert_eq!(
            profile.access,
            AccessStrategy::MemoryMapped {
                bar: 0,
                stride: 0x400
            }
        );
    }

    #[test]
    fn lookup_unknown_board() {
        assert!(lookup(0xbeef).is_none());
    }

    #[test]
    fn all_profiles_well_formed() {
        for profile in supported() {
            assert!(
                (1..=MAX_PORTS).contains(&profile.ports),
                "{}: port count {} out of range",
                profile.name,
                profile.ports
            );
            match &profile.access {
                AccessStrategy::PortAddressed { bars } => {
                    assert_eq!(
                        bars.len(),
                        profile.ports,
                        "{}: one region per port required",
                        profile.name
                    );
                }
                AccessStrategy::MemoryMapped { stride, .. } => {
                    assert!(*stride > 0, "{}: zero stride", profile.name);
                }
            }
        }
    }

    #[test]
    fn mmio_family_port_count_matches_low_nibble() {
        for profile in supported() {
            if matches!(profile.access, AccessStrategy::MemoryMapped { .. }) {
                assert_eq!(profile.ports, (profile.device_id & 0xf) as usize);
            }
        }
    }

    #[test]
    fn mmio_families_use_expected_strides() {
        for profile in supported() {
            if let AccessStrategy::MemoryMapped { bar, stride } = &profile.access {
                assert_eq!(*bar, 0, "{}: registers live in BAR 0", profile.name);
                let expected = if profile.device_id < 0xc200 { 0x100 } else { 0x400 };
                assert_eq!(*stride, expected, "{}: wrong stride", profile.name);
            }
        }
        // Both packings are actually present in the table.
        let c104 = lookup(0xc104).expect("C104 should be in the table");
        assert_eq!(
            c104.access,
            AccessStrategy::MemoryMapped {
                bar: 0,
                stride: 0x100
            }
        );
        assert_eq!(c104.ports, 4);
        let c204 = lookup(0xc204).expect("C204 should be in the table");
        assert_eq!(
            c204.access,
            AccessStrategy::MemoryMapped {
                bar: 0,
                stride: 0x400
            }
        );
    }

    #[test]
    fn bar_helpers_follow_the_strategy() {
        let mic = lookup(0x3680).expect("MIC-3680 should be in the table");
        assert_eq!(mic.ports, 2);
        assert_eq!(mic.bars(), vec![2, 3]);
        assert_eq!(mic.bar_for_port(0), 2);
        assert_eq!(mic.bar_for_port(1), 3);

        let mioe = lookup(0xc302).expect("MIOe-3680 should be in the table");
        assert_eq!(mioe.bars(), vec![0]);
        assert_eq!(mioe.bar_for_port(1), 0);
    }

    #[test]
    fn device_ids_unique() {
        let mut ids: Vec<u16> = supported().iter().map(|p| p.device_id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), supported().len());
    }
}
