//! Structured fuzz-input decoding and replay for virtual device models.
//!
//! A fuzzer's flat byte buffer is decoded against a frozen [`InterfaceRegistry`]
//! into a [`MessageSequence`] of in-bounds MMIO reads and writes and DMA
//! transfers, which [`replay`] then dispatches to a [`DeviceModel`].

#![forbid(unsafe_code)]

/// Error taxonomy for registration and decoding.
pub mod error;
pub use error::{ConfigError, HarnessError, StateViolation};

/// Ordered interface registry and geometry helpers.
pub mod registry;
pub use registry::{
    access_granule, align_down, fit_length, offset_field_bytes, permitted_widths,
    validate_geometry, Interface, InterfaceId, InterfaceKind, InterfaceRegistry,
    SHORT_OFFSET_WINDOW,
};

/// Bounds-checked little-endian input cursor.
pub mod cursor;
pub use cursor::{ByteCursor, CursorError};

/// Decoded messages and the owning sequence.
pub mod message;
pub use message::{release, Message, MessageDisplay, MessageSequence, Operation, ReleaseSummary};

/// Harness configuration and defaults.
pub mod config;
pub use config::{
    FaultPolicy, HarnessConfig, DEFAULT_INPUT_BYTES, DEFAULT_MAX_DMA_TRANSFER,
    DEFAULT_MAX_MESSAGES,
};

/// Fuzz-input decoder.
pub mod decoder;
pub use decoder::{decode, Decoder, CONTROL_READ_BIT, MIN_MESSAGE_HEADER_SIZE};

/// Replay engine and device model contract.
pub mod replay;
pub use replay::{replay, DeviceModel, FaultRecord, MessageOutcome, ModelFault, ReplayReport};

/// Device descriptions and the reference register-map model.
pub mod model;
pub use model::{
    default_interfaces, load_description, Address, DeviceDescription, Direction, InterfaceSpec,
    LoadError, ModelStats, OpEntry, OperationSpec, RegisterAccess, RegisterMapModel,
    RegisterPermissions, DEFAULT_MMIO_BASES, DEFAULT_MMIO_SIZE, UNKNOWN_ADDRESS_SENTINELS,
};

/// One-shot decode/replay/release driver.
pub mod harness;
pub use harness::{run_iteration, run_iteration_with, IterationReport};

#[cfg(test)]
use proptest as _;
