//! Board-family constants.
//!
//! Fixed hardware parameters shared by every supported Advantech CAN
//! card: vendor ID, controller clock, and the output-control / clock-divider
//! register values the boards are wired for.

/// Advantech PCI vendor ID.
pub const ADVANTECH_VENDOR_ID: u16 = 0x13fe;

/// Controller clock in Hz.
///
/// The controller's internal clock is the 16 MHz crystal divided by 2.
pub const CAN_CLOCK_HZ: u32 = 16_000_000 / 2;

/// Output control: TX0 push-pull.
pub const OCR_TX0_PUSHPULL: u8 = 0x18;

/// Output control: TX1 push-pull.
pub const OCR_TX1_PUSHPULL: u8 = 0x60;

/// Output control register value for the board family.
///
/// RX1 is tied to ground and TX1 is unconnected, but TX1 is still driven
/// push-pull so it does not float.
pub const BOARD_OCR: u8 = OCR_TX0_PUSHPULL | OCR_TX1_PUSHPULL;

/// Clock divider: comparator by-pass.
pub const CDR_CBP: u8 = 0x40;

/// Clock divider: CLKOUT divider mask (direct oscillator output).
pub const CDR_CLKOUT_MASK: u8 = 0x07;

/// Clock divider register value for the board family.
///
/// Comparator by-pass for lower latency (external transceiver), CLKOUT at
/// oscillator frequency because it drives the PCI bridge.
pub const BOARD_CDR: u8 = CDR_CBP | CDR_CLKOUT_MASK;

/// Maximum number of ports on any supported card.
pub const MAX_PORTS: usize = 4;
