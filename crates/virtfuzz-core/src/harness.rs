//! One-shot iteration driver: decode, replay, release.

use serde::Serialize;

use crate::{
    replay, ByteCursor, Decoder, DeviceModel, HarnessConfig, HarnessError, InterfaceRegistry,
    MessageSequence, ReleaseSummary, ReplayReport,
};

/// Result of one fuzz iteration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IterationReport {
    /// Messages decoded from the input.
    pub decoded: usize,
    /// Input bytes consumed by decoding.
    pub consumed: usize,
    /// Replay outcome.
    pub report: ReplayReport,
    /// Storage released after replay.
    pub released: ReleaseSummary,
}

impl IterationReport {
    /// Returns `true` when the model never faulted.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.report.is_clean()
    }
}

/// Decodes `input` against `registry`, replays it on `model` under
/// `config.fault_policy`, then releases the sequence.
///
/// # Errors
///
/// Fails before touching the model when the registry is unfrozen or empty.
pub fn run_iteration(
    input: &[u8],
    registry: &InterfaceRegistry,
    model: &mut dyn DeviceModel,
    config: &HarnessConfig,
) -> Result<IterationReport, HarnessError> {
    run_iteration_with(input, registry, model, config, |_| {})
}

/// Like [`run_iteration`], handing the decoded sequence to `on_decoded`
/// before any message reaches the model.
///
/// # Errors
///
/// Fails before decoding when the registry is empty or unfrozen; `on_decoded`
/// is not called then.
pub fn run_iteration_with(
    input: &[u8],
    registry: &InterfaceRegistry,
    model: &mut dyn DeviceModel,
    config: &HarnessConfig,
    on_decoded: impl FnOnce(&MessageSequence),
) -> Result<IterationReport, HarnessError> {
    let decoder = Decoder::new(registry, config)?;
    let mut cursor = ByteCursor::new(input);
    let sequence = decoder.decode(&mut cursor);
    let decoded = sequence.len();
    on_decoded(&sequence);
    let report = replay(&sequence, model, config.fault_policy);
    let released = sequence.release();

    tracing::debug!(
        input = input.len(),
        consumed = cursor.position(),
        decoded,
        faults = report.faults.len(),
        "iteration finished"
    );
    Ok(IterationReport {
        decoded,
        consumed: cursor.position(),
        report,
        released,
    })
}
