//! Decoded hardware operations and the owning message sequence.

use std::fmt;

use serde::Serialize;

use crate::{InterfaceId, InterfaceKind, InterfaceRegistry};

/// Operation carried by one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operation {
    /// MMIO read of `length` bytes.
    Read,
    /// MMIO write of `length` payload bytes.
    Write,
    /// DMA transfer of `length` payload bytes.
    DmaTransfer,
}

impl Operation {
    /// Interface kind this operation targets.
    #[must_use]
    pub const fn kind(self) -> InterfaceKind {
        match self {
            Self::Read | Self::Write => InterfaceKind::Mmio,
            Self::DmaTransfer => InterfaceKind::Dma,
        }
    }

    /// Returns `true` when the message carries `length` payload bytes.
    #[must_use]
    pub const fn carries_payload(self) -> bool {
        matches!(self, Self::Write | Self::DmaTransfer)
    }

    /// Upper-case label used in diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Read => "READ",
            Self::Write => "WRITE",
            Self::DmaTransfer => "DMA_TRANSFER",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// One decoded, in-bounds operation against a registered interface.
///
/// Only the decoder creates messages; they are immutable afterwards.
#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct Message {
    interface_id: InterfaceId,
    operation: Operation,
    offset: u64,
    length: usize,
    #[serde(with = "hex_payload")]
    payload: Box<[u8]>,
}

impl Message {
    pub(crate) fn new(
        interface_id: InterfaceId,
        operation: Operation,
        offset: u64,
        length: usize,
        payload: Box<[u8]>,
    ) -> Self {
        debug_assert!(payload.is_empty() || payload.len() == length);
        Self {
            interface_id,
            operation,
            offset,
            length,
            payload,
        }
    }

    /// Target interface.
    #[must_use]
    pub const fn interface_id(&self) -> InterfaceId {
        self.interface_id
    }

    /// Operation kind.
    #[must_use]
    pub const fn operation(&self) -> Operation {
        self.operation
    }

    /// Byte offset inside the interface window.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.offset
    }

    /// Number of bytes touched.
    #[must_use]
    pub const fn length(&self) -> usize {
        self.length
    }

    /// Payload bytes; empty for reads.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Renders the message with the interface label resolved from `registry`.
    #[must_use]
    pub const fn display<'a>(&'a self, registry: &'a InterfaceRegistry) -> MessageDisplay<'a> {
        MessageDisplay {
            message: self,
            registry,
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_message(f, self, None)
    }
}

/// [`Message`] rendering that includes the interface name.
#[derive(Debug, Clone, Copy)]
pub struct MessageDisplay<'a> {
    message: &'a Message,
    registry: &'a InterfaceRegistry,
}

impl fmt::Display for MessageDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self
            .registry
            .get(self.message.interface_id)
            .ok()
            .map(crate::Interface::name);
        write_message(f, self.message, name)
    }
}

fn write_message(f: &mut fmt::Formatter<'_>, message: &Message, name: Option<&str>) -> fmt::Result {
    write!(
        f,
        "{} {}{} offset=0x{:x} len={}",
        message.operation,
        name.unwrap_or("interface"),
        message.interface_id,
        message.offset,
        message.length
    )?;
    if message.operation.carries_payload() {
        write!(f, " payload={}", hex::encode(&message.payload))?;
    }
    Ok(())
}

pub(crate) mod hex_payload {
    use serde::Serializer;

    pub(crate) fn serialize<S: Serializer>(
        payload: &[u8],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(payload))
    }
}

/// Storage released by [`MessageSequence::release`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ReleaseSummary {
    /// Messages dropped.
    pub messages: usize,
    /// Payload bytes dropped.
    pub payload_bytes: usize,
}

/// Ordered, owning container of decoded messages.
///
/// The sequence is move-only: [`release`](Self::release) consumes it, so a
/// second release or a use after release does not compile. Dropping the
/// sequence releases the same storage.
#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct MessageSequence {
    messages: Vec<Message>,
}

impl MessageSequence {
    pub(crate) const fn new() -> Self {
        Self {
            messages: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Number of decoded messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns `true` when nothing was decoded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Messages in decode (and replay) order.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Iterates messages in decode order.
    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    /// Message at `index`, if any.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Message> {
        self.messages.get(index)
    }

    /// Total payload bytes owned by the sequence.
    #[must_use]
    pub fn payload_bytes(&self) -> usize {
        self.messages.iter().map(|message| message.payload.len()).sum()
    }

    /// Frees every message and payload buffer.
    pub fn release(self) -> ReleaseSummary {
        let summary = ReleaseSummary {
            messages: self.len(),
            payload_bytes: self.payload_bytes(),
        };
        drop(self);
        tracing::trace!(
            messages = summary.messages,
            payload_bytes = summary.payload_bytes,
            "released message sequence"
        );
        summary
    }
}

impl<'a> IntoIterator for &'a MessageSequence {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Releases `sequence`; equivalent to [`MessageSequence::release`].
pub fn release(sequence: MessageSequence) -> ReleaseSummary {
    sequence.release()
}
