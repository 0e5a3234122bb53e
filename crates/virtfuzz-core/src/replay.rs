//! Replay engine dispatching decoded messages to a device model.

use serde::Serialize;
use thiserror::Error;

use crate::{FaultPolicy, InterfaceId, Message, MessageSequence, Operation};

/// Fault raised by a device model while handling one message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error, Serialize)]
#[error("model fault: {detail}")]
pub struct ModelFault {
    detail: String,
}

impl ModelFault {
    /// Creates a fault with a free-form description.
    #[must_use]
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }

    /// Fault description supplied by the model.
    #[must_use]
    pub fn detail(&self) -> &str {
        &self.detail
    }
}

/// Device model contract consumed by [`replay`].
///
/// One handler per interface kind and operation. Handlers receive already
/// validated, in-bounds accesses and report failures as [`ModelFault`].
pub trait DeviceModel {
    /// Reads `data.len()` bytes at `offset` of an MMIO interface into `data`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelFault`] when the model rejects the access.
    fn mmio_read(
        &mut self,
        interface: InterfaceId,
        offset: u64,
        data: &mut [u8],
    ) -> Result<(), ModelFault>;

    /// Writes `data` at `offset` of an MMIO interface.
    ///
    /// # Errors
    ///
    /// Returns [`ModelFault`] when the model rejects the access.
    fn mmio_write(
        &mut self,
        interface: InterfaceId,
        offset: u64,
        data: &[u8],
    ) -> Result<(), ModelFault>;

    /// Delivers a DMA transfer on a DMA channel.
    ///
    /// # Errors
    ///
    /// Returns [`ModelFault`] when the model rejects the transfer.
    fn dma_transfer(&mut self, interface: InterfaceId, data: &[u8]) -> Result<(), ModelFault>;
}

/// Per-message replay result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum MessageOutcome {
    /// Model accepted the message.
    Ok,
    /// Model reported a fault.
    ModelFault(ModelFault),
}

impl MessageOutcome {
    /// Returns `true` for [`MessageOutcome::Ok`].
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

/// Reproduction record for one faulting message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FaultRecord {
    /// Index of the message in its sequence.
    pub index: usize,
    /// Target interface.
    pub interface_id: InterfaceId,
    /// Operation that faulted.
    pub operation: Operation,
    /// Offset of the access.
    pub offset: u64,
    /// Length of the access.
    pub length: usize,
    /// Copy of the message payload.
    #[serde(with = "crate::message::hex_payload")]
    pub payload: Vec<u8>,
    /// Fault reported by the model.
    pub fault: ModelFault,
}

impl FaultRecord {
    fn capture(index: usize, message: &Message, fault: ModelFault) -> Self {
        Self {
            index,
            interface_id: message.interface_id(),
            operation: message.operation(),
            offset: message.offset(),
            length: message.length(),
            payload: message.payload().to_vec(),
            fault,
        }
    }
}

/// Aggregated replay result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplayReport {
    /// Messages in the replayed sequence.
    pub total: usize,
    /// Messages dispatched to the model (outcomes recorded).
    pub replayed: usize,
    /// Outcome per dispatched message, in order.
    pub outcomes: Vec<MessageOutcome>,
    /// Every fault observed, in order. At most one under stop-on-first-fault.
    pub faults: Vec<FaultRecord>,
    /// Policy the replay ran under.
    pub policy: FaultPolicy,
}

impl ReplayReport {
    /// First fault observed, if any.
    #[must_use]
    pub fn first_fault(&self) -> Option<&FaultRecord> {
        self.faults.first()
    }

    /// Index of the first faulting message, if any.
    #[must_use]
    pub fn faulted_at_index(&self) -> Option<usize> {
        self.first_fault().map(|record| record.index)
    }

    /// Messages never dispatched because replay stopped early.
    #[must_use]
    pub const fn skipped(&self) -> usize {
        self.total - self.replayed
    }

    /// Returns `true` when no fault was observed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.faults.is_empty()
    }
}

/// Replays `sequence` in order against `model`.
///
/// Under [`FaultPolicy::StopOnFirstFault`] nothing after the first faulting
/// message is dispatched. The engine never inspects payload contents.
pub fn replay(
    sequence: &MessageSequence,
    model: &mut dyn DeviceModel,
    policy: FaultPolicy,
) -> ReplayReport {
    let mut outcomes = Vec::with_capacity(sequence.len());
    let mut faults = Vec::new();
    let mut scratch = Vec::new();

    for (index, message) in sequence.iter().enumerate() {
        let result = dispatch(message, model, &mut scratch);
        match result {
            Ok(()) => outcomes.push(MessageOutcome::Ok),
            Err(fault) => {
                tracing::warn!(
                    index,
                    interface = %message.interface_id(),
                    operation = %message.operation(),
                    offset = message.offset(),
                    payload = %hex::encode(message.payload()),
                    detail = fault.detail(),
                    "device model fault"
                );
                outcomes.push(MessageOutcome::ModelFault(fault.clone()));
                faults.push(FaultRecord::capture(index, message, fault));
                if policy == FaultPolicy::StopOnFirstFault {
                    break;
                }
            }
        }
    }

    let report = ReplayReport {
        total: sequence.len(),
        replayed: outcomes.len(),
        outcomes,
        faults,
        policy,
    };
    tracing::debug!(
        total = report.total,
        replayed = report.replayed,
        faults = report.faults.len(),
        "replay finished"
    );
    report
}

fn dispatch(
    message: &Message,
    model: &mut dyn DeviceModel,
    scratch: &mut Vec<u8>,
) -> Result<(), ModelFault> {
    let interface = message.interface_id();
    match message.operation() {
        Operation::Read => {
            scratch.clear();
            scratch.resize(message.length(), 0);
            model.mmio_read(interface, message.offset(), scratch)?;
            tracing::trace!(
                %interface,
                offset = message.offset(),
                value = %hex::encode(&scratch[..]),
                "mmio read"
            );
            Ok(())
        }
        Operation::Write => model.mmio_write(interface, message.offset(), message.payload()),
        Operation::DmaTransfer => model.dma_transfer(interface, message.payload()),
    }
}
