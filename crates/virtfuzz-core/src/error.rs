use thiserror::Error;

use crate::InterfaceId;

/// Registration or decode-start configuration failures.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
pub enum ConfigError {
    /// Interface declared a zero minimum access width.
    #[error("interface `{name}` declares a zero access width")]
    ZeroAccessWidth {
        /// Label of the rejected interface.
        name: String,
    },
    /// Interface declared a zero address alignment.
    #[error("interface `{name}` declares a zero alignment")]
    ZeroAlignment {
        /// Label of the rejected interface.
        name: String,
    },
    /// MMIO interface declared an empty address window.
    #[error("mmio interface `{name}` has an empty address window")]
    EmptyMmioWindow {
        /// Label of the rejected interface.
        name: String,
    },
    /// Decoding was requested against a registry with no interfaces.
    #[error("registry has no interfaces to decode against")]
    EmptyRegistry,
}

/// Registry lifecycle violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum StateViolation {
    /// Registration attempted after `freeze`.
    #[error("registry is frozen and no longer accepts interfaces")]
    RegistryFrozen,
    /// Decoding attempted before `freeze`.
    #[error("registry must be frozen before decoding")]
    RegistryNotFrozen,
}

/// First-class errors surfaced by the registry and decoder entry points.
///
/// Malformed fuzz input never produces one of these; it degrades to a shorter
/// message sequence instead.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
pub enum HarnessError {
    /// Invalid interface parameters or an empty registry at decode start.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Lookup of an interface id that was never registered.
    #[error("interface {0} is not registered")]
    NotFound(InterfaceId),
    /// Operation is not legal in the registry's current lifecycle state.
    #[error(transparent)]
    InvalidState(#[from] StateViolation),
}

impl HarnessError {
    /// Returns `true` for errors caused by registrant configuration.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}
