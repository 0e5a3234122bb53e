//! Deterministic interface geometry helpers: registration validation, access
//! widths, offset granules, and in-window length fitting.

use crate::{ConfigError, InterfaceKind};

/// Window sizes up to this bound use a 16-bit offset field.
pub const SHORT_OFFSET_WINDOW: u64 = 0x1_0000;

/// Validates registration parameters for one interface.
///
/// # Errors
///
/// Returns [`ConfigError::ZeroAccessWidth`], [`ConfigError::ZeroAlignment`],
/// or [`ConfigError::EmptyMmioWindow`] for the corresponding violation.
pub fn validate_geometry(
    kind: InterfaceKind,
    size: u64,
    name: &str,
    access_width: u32,
    alignment: u32,
) -> Result<(), ConfigError> {
    if access_width == 0 {
        return Err(ConfigError::ZeroAccessWidth {
            name: name.to_string(),
        });
    }
    if alignment == 0 {
        return Err(ConfigError::ZeroAlignment {
            name: name.to_string(),
        });
    }
    match kind {
        InterfaceKind::Mmio if size == 0 => Err(ConfigError::EmptyMmioWindow {
            name: name.to_string(),
        }),
        InterfaceKind::Mmio | InterfaceKind::Dma => Ok(()),
    }
}

/// Greatest common divisor.
#[must_use]
pub const fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

/// Smallest offset step that satisfies both the access width and the
/// alignment (their least common multiple). Both inputs must be non-zero.
#[must_use]
pub const fn access_granule(access_width: u32, alignment: u32) -> u64 {
    let width = access_width as u64;
    let align = alignment as u64;
    width / gcd(width, align) * align
}

/// Permitted access lengths: `access_width * 2^k` up to the larger of the
/// access width and the alignment.
///
/// A `(1, 4)` interface therefore accepts 1, 2, and 4 byte accesses while a
/// `(4, 4)` interface accepts only 4.
#[must_use]
pub fn permitted_widths(access_width: u32, alignment: u32) -> Vec<u32> {
    let limit = access_width.max(alignment);
    let mut widths = Vec::new();
    let mut width = access_width;
    while width <= limit {
        widths.push(width);
        match width.checked_mul(2) {
            Some(next) => width = next,
            None => break,
        }
    }
    widths
}

/// Byte width of the offset field for a window of `size` bytes.
#[must_use]
pub const fn offset_field_bytes(size: u64) -> usize {
    if size <= SHORT_OFFSET_WINDOW {
        2
    } else {
        4
    }
}

/// Rounds `value` down to a multiple of `granule` (non-zero).
#[must_use]
pub const fn align_down(value: u64, granule: u64) -> u64 {
    value - value % granule
}

/// Picks the access length for a window with `span` bytes left past the offset.
///
/// The preferred width wins when it fits; otherwise the largest permitted
/// width that fits; otherwise the length is truncated to `span`.
#[must_use]
pub fn fit_length(widths: &[u32], preferred: u32, span: u64) -> u32 {
    if u64::from(preferred) <= span {
        return preferred;
    }
    // span < preferred here, so it fits in u32
    let span = u32::try_from(span).unwrap_or(preferred);
    widths
        .iter()
        .rev()
        .copied()
        .find(|width| *width <= span)
        .unwrap_or(span)
}
