//! Ordered registry of device interfaces.

/// Interface geometry validation and width/offset helpers.
pub mod geometry;
/// Interface descriptor and identity types.
pub mod interface;

use std::fmt;

pub use geometry::{
    access_granule, align_down, fit_length, offset_field_bytes, permitted_widths,
    validate_geometry, SHORT_OFFSET_WINDOW,
};
pub use interface::{Interface, InterfaceId, InterfaceKind};

use crate::{HarnessError, StateViolation};

/// Ordered collection of registered interfaces.
///
/// Registration order assigns ids and biases interface selection during
/// decoding. Once [`freeze`](Self::freeze) is called the registry is read-only
/// and may be shared by any number of decode passes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterfaceRegistry {
    interfaces: Vec<Interface>,
    frozen: bool,
}

impl InterfaceRegistry {
    /// Creates an empty, unfrozen registry.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            interfaces: Vec::new(),
            frozen: false,
        }
    }

    /// Appends a new interface and returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::InvalidState`] after [`freeze`](Self::freeze),
    /// and [`HarnessError::Config`] when the geometry is rejected by
    /// [`validate_geometry`].
    pub fn register(
        &mut self,
        kind: InterfaceKind,
        base_address: u64,
        size: u64,
        name: impl Into<String>,
        access_width: u32,
        alignment: u32,
    ) -> Result<InterfaceId, HarnessError> {
        if self.frozen {
            return Err(StateViolation::RegistryFrozen.into());
        }
        let name = name.into();
        validate_geometry(kind, size, &name, access_width, alignment)?;

        let id = InterfaceId::new(self.interfaces.len());
        tracing::debug!(
            id = id.index(),
            %kind,
            base_address,
            size,
            name = %name,
            access_width,
            alignment,
            "registered interface"
        );
        self.interfaces.push(Interface {
            id,
            kind,
            base_address,
            size,
            name,
            access_width,
            alignment,
            widths: permitted_widths(access_width, alignment),
            granule: access_granule(access_width, alignment),
        });
        Ok(id)
    }

    /// Read-only view in registration order.
    #[must_use]
    pub fn list(&self) -> &[Interface] {
        &self.interfaces
    }

    /// Looks up an interface by id.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::NotFound`] when `id` was never registered.
    pub fn get(&self, id: InterfaceId) -> Result<&Interface, HarnessError> {
        self.interfaces
            .get(id.index())
            .ok_or(HarnessError::NotFound(id))
    }

    /// Marks the registry immutable. Idempotent.
    pub fn freeze(&mut self) {
        if !self.frozen {
            tracing::debug!(interfaces = self.interfaces.len(), "registry frozen");
        }
        self.frozen = true;
    }

    /// Returns `true` after [`freeze`](Self::freeze).
    #[must_use]
    pub const fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Number of registered interfaces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.interfaces.len()
    }

    /// Returns `true` when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.interfaces.is_empty()
    }
}

impl fmt::Display for InterfaceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for interface in &self.interfaces {
            writeln!(f, "  {interface}")?;
        }
        Ok(())
    }
}
