//! Fuzz-input decoder producing bounded, in-bounds message sequences.
//!
//! Message layout (multi-byte fields little-endian):
//!
//! ```text
//! MMIO: selector:u8 | offset:u16 (u32 for windows > 64 KiB) | control:u8 | payload[length] (WRITE only)
//! DMA:  selector:u8 | length:u16 | payload[length]
//! ```
//!
//! `selector % interface_count` picks the interface by registration index.
//! Control bit 0 selects READ (set) or WRITE (clear); the remaining bits pick
//! the preferred width. Offsets are reduced into the window and rounded down
//! to the interface granule; lengths that would overrun the window shrink.
//! DMA channels have no byte extent: a transfer always starts at offset 0 and
//! its length is bounded by `max_dma_transfer` instead of the channel size.
//! Running out of input at any point ends the sequence without emitting the
//! partial message.

use crate::{
    align_down, fit_length, offset_field_bytes, ByteCursor, ConfigError, CursorError,
    HarnessConfig, HarnessError, Interface, InterfaceKind, InterfaceRegistry, Message,
    MessageSequence, Operation, StateViolation,
};

/// Smallest number of bytes that can hold a complete message header.
pub const MIN_MESSAGE_HEADER_SIZE: usize = 3;

/// Control-byte bit that selects an MMIO read.
pub const CONTROL_READ_BIT: u8 = 0x01;

/// Deterministic decoder bound to a frozen registry.
///
/// Holds no mutable state; one decoder may decode any number of inputs.
#[derive(Debug, Clone, Copy)]
pub struct Decoder<'r> {
    interfaces: &'r [Interface],
    max_messages: usize,
    max_dma_transfer: u16,
}

impl<'r> Decoder<'r> {
    /// Binds a decoder to `registry`. Consumes no input.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyRegistry`] when the registry has no
    /// interfaces, frozen or not, and [`StateViolation::RegistryNotFrozen`]
    /// for an unfrozen registry.
    pub fn new(
        registry: &'r InterfaceRegistry,
        config: &HarnessConfig,
    ) -> Result<Self, HarnessError> {
        if registry.is_empty() {
            return Err(ConfigError::EmptyRegistry.into());
        }
        if !registry.is_frozen() {
            return Err(StateViolation::RegistryNotFrozen.into());
        }
        Ok(Self {
            interfaces: registry.list(),
            max_messages: config.max_messages,
            max_dma_transfer: config.max_dma_transfer.max(1),
        })
    }

    /// Decodes messages until the input, or the message budget, runs out.
    pub fn decode(&self, cursor: &mut ByteCursor<'_>) -> MessageSequence {
        let start = cursor.position();
        let mut sequence = MessageSequence::new();

        while sequence.len() < self.max_messages && cursor.remaining() >= MIN_MESSAGE_HEADER_SIZE {
            match self.decode_message(cursor) {
                Ok(message) => {
                    tracing::trace!(index = sequence.len(), %message, "decoded message");
                    sequence.push(message);
                }
                Err(CursorError::EndOfInput {
                    requested,
                    remaining,
                }) => {
                    tracing::trace!(requested, remaining, "input exhausted mid-message");
                    break;
                }
            }
        }

        tracing::debug!(
            messages = sequence.len(),
            consumed = cursor.position() - start,
            remaining = cursor.remaining(),
            "decoded message sequence"
        );
        sequence
    }

    /// Decodes a whole input buffer.
    pub fn decode_bytes(&self, input: &[u8]) -> MessageSequence {
        self.decode(&mut ByteCursor::new(input))
    }

    fn decode_message(&self, cursor: &mut ByteCursor<'_>) -> Result<Message, CursorError> {
        let selector = cursor.read_u8()?;
        let interface = &self.interfaces[usize::from(selector) % self.interfaces.len()];
        match interface.kind() {
            InterfaceKind::Mmio => Self::decode_mmio(interface, cursor),
            InterfaceKind::Dma => self.decode_dma(interface, cursor),
        }
    }

    fn decode_mmio(
        interface: &Interface,
        cursor: &mut ByteCursor<'_>,
    ) -> Result<Message, CursorError> {
        let raw_offset = cursor.read_uint(offset_field_bytes(interface.size()))?;
        let control = cursor.read_u8()?;

        let offset = align_down(raw_offset % interface.size(), interface.granule());
        let widths = interface.widths();
        let preferred = widths[usize::from(control >> 1) % widths.len()];
        let length = fit_length(widths, preferred, interface.size() - offset);
        let length = usize::try_from(length).unwrap_or(usize::MAX);

        if control & CONTROL_READ_BIT == 0 {
            let payload = read_payload(cursor, length)?;
            Ok(Message::new(interface.id(), Operation::Write, offset, length, payload))
        } else {
            Ok(Message::new(interface.id(), Operation::Read, offset, length, Box::default()))
        }
    }

    fn decode_dma(
        &self,
        interface: &Interface,
        cursor: &mut ByteCursor<'_>,
    ) -> Result<Message, CursorError> {
        let raw_length = cursor.read_u16()?;
        let length = usize::from(raw_length % self.max_dma_transfer) + 1;
        let payload = read_payload(cursor, length)?;
        Ok(Message::new(interface.id(), Operation::DmaTransfer, 0, length, payload))
    }
}

fn read_payload(cursor: &mut ByteCursor<'_>, length: usize) -> Result<Box<[u8]>, CursorError> {
    let remaining = cursor.remaining();
    let bytes = cursor.read_up_to(length);
    if bytes.len() < length {
        tracing::debug!(
            requested = length,
            remaining,
            "discarding message with short payload"
        );
        return Err(CursorError::EndOfInput {
            requested: length,
            remaining,
        });
    }
    Ok(bytes.into())
}

/// Decodes `cursor` against `registry`.
///
/// # Errors
///
/// Fails before consuming input when the registry is unfrozen or empty; see
/// [`Decoder::new`]. Malformed or short input is never an error.
pub fn decode(
    cursor: &mut ByteCursor<'_>,
    registry: &InterfaceRegistry,
    config: &HarnessConfig,
) -> Result<MessageSequence, HarnessError> {
    Ok(Decoder::new(registry, config)?.decode(cursor))
}
