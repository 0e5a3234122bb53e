//! Registered interface descriptors and their identity types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable registration-order identifier of an interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InterfaceId(usize);

impl InterfaceId {
    /// Wraps a registration index.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Returns the registration index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for InterfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Closed set of device interface kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterfaceKind {
    /// Memory-mapped register window addressed by byte offset.
    Mmio,
    /// Logical DMA channel without a byte extent.
    Dma,
}

impl InterfaceKind {
    /// Upper-case label used in diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mmio => "MMIO",
            Self::Dma => "DMA",
        }
    }
}

impl fmt::Display for InterfaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Immutable descriptor of one registered interface.
///
/// Built only by [`crate::InterfaceRegistry::register`], which validates the
/// geometry and precomputes the permitted access widths and offset granule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    pub(crate) id: InterfaceId,
    pub(crate) kind: InterfaceKind,
    pub(crate) base_address: u64,
    pub(crate) size: u64,
    pub(crate) name: String,
    pub(crate) access_width: u32,
    pub(crate) alignment: u32,
    pub(crate) widths: Vec<u32>,
    pub(crate) granule: u64,
}

impl Interface {
    /// Registration-order identifier.
    #[must_use]
    pub const fn id(&self) -> InterfaceId {
        self.id
    }

    /// Interface kind.
    #[must_use]
    pub const fn kind(&self) -> InterfaceKind {
        self.kind
    }

    /// Guest-physical base address of the window.
    #[must_use]
    pub const fn base_address(&self) -> u64 {
        self.base_address
    }

    /// Window extent in bytes (0 or 1 for DMA channels).
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }

    /// Diagnostic label.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Minimum addressable unit in bytes.
    #[must_use]
    pub const fn access_width(&self) -> u32 {
        self.access_width
    }

    /// Required alignment of generated offsets in bytes.
    #[must_use]
    pub const fn alignment(&self) -> u32 {
        self.alignment
    }

    /// Permitted access lengths in ascending order.
    #[must_use]
    pub fn widths(&self) -> &[u32] {
        &self.widths
    }

    /// Offset granule every decoded offset is a multiple of.
    #[must_use]
    pub const fn granule(&self) -> u64 {
        self.granule
    }

    /// Returns `true` when `[offset, offset + length)` lies inside the window.
    #[must_use]
    pub const fn contains(&self, offset: u64, length: u64) -> bool {
        match offset.checked_add(length) {
            Some(end) => end <= self.size,
            None => false,
        }
    }
}

impl fmt::Display for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {:<10} {:<4} base=0x{:08x} size=0x{:x} width={} align={}",
            self.id.index(),
            self.name,
            self.kind,
            self.base_address,
            self.size,
            self.access_width,
            self.alignment
        )
    }
}
