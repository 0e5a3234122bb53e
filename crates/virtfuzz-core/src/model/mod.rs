//! Device descriptions and the reference register-map device model.

/// JSON device description loader.
pub mod description;
/// Register-map device model with shadow memory.
pub mod register_map;

pub use description::{
    default_interfaces, load_description, Address, DeviceDescription, Direction, InterfaceSpec,
    LoadError, OpEntry, OperationSpec, RegisterAccess, DEFAULT_MMIO_BASES, DEFAULT_MMIO_SIZE,
    UNKNOWN_ADDRESS_SENTINELS,
};
pub use register_map::{ModelStats, RegisterMapModel, RegisterPermissions};
