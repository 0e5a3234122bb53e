//! JSON device descriptions: interface layout, recorded register operations,
//! and harness overrides.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{HarnessConfig, HarnessError, InterfaceId, InterfaceKind, InterfaceRegistry};

/// Register addresses recorded when the real address could not be resolved.
pub const UNKNOWN_ADDRESS_SENTINELS: [u64; 2] = [0xdead_beef, 0xdead_c0de];

/// Base addresses of the default MMIO windows.
pub const DEFAULT_MMIO_BASES: [u64; 3] = [0xFFFF_0000, 0xFFFF_1000, 0xFFFF_2000];

/// Size of each default MMIO window.
pub const DEFAULT_MMIO_SIZE: u64 = 0x1000;

/// Failure to load a device description file.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The description file does not exist.
    #[error("device_model_file '{}' does not exist", path.display())]
    NotFound {
        /// Requested path.
        path: PathBuf,
    },
    /// The file exists but could not be read.
    #[error("failed to read '{}': {source}", path.display())]
    Io {
        /// Requested path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The file is not a valid description.
    #[error("failed to parse '{}': {source}", path.display())]
    Parse {
        /// Requested path.
        path: PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },
}

/// Address or size that may be written as a JSON number or a numeric string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawNumber", into = "u64")]
pub struct Address(u64);

impl Address {
    /// Wraps a raw value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Raw value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Returns `true` for the recorded "unknown address" sentinels.
    #[must_use]
    pub fn is_unknown(self) -> bool {
        UNKNOWN_ADDRESS_SENTINELS.contains(&self.0)
    }
}

impl From<Address> for u64 {
    fn from(address: Address) -> Self {
        address.0
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawNumber {
    Number(u64),
    Text(String),
}

impl TryFrom<RawNumber> for Address {
    type Error = String;

    fn try_from(raw: RawNumber) -> Result<Self, Self::Error> {
        match raw {
            RawNumber::Number(value) => Ok(Self(value)),
            RawNumber::Text(text) => parse_number(&text)
                .map(Self)
                .ok_or_else(|| format!("invalid numeric value `{text}`")),
        }
    }
}

fn parse_number(text: &str) -> Option<u64> {
    let text = text.trim();
    text.strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .map_or_else(|| text.parse().ok(), |hex| u64::from_str_radix(hex, 16).ok())
}

/// One interface entry of a description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InterfaceSpec {
    /// Interface kind.
    pub kind: InterfaceKind,
    /// Diagnostic label.
    pub name: String,
    /// Guest-physical base address.
    #[serde(default = "zero_address")]
    pub base: Address,
    /// Window size in bytes.
    pub size: Address,
    /// Minimum access width in bytes.
    pub access_width: u32,
    /// Offset alignment in bytes.
    pub alignment: u32,
}

const fn zero_address() -> Address {
    Address(0)
}

impl InterfaceSpec {
    /// MMIO window entry.
    #[must_use]
    pub fn mmio(
        name: impl Into<String>,
        base: u64,
        size: u64,
        access_width: u32,
        alignment: u32,
    ) -> Self {
        Self {
            kind: InterfaceKind::Mmio,
            name: name.into(),
            base: Address(base),
            size: Address(size),
            access_width,
            alignment,
        }
    }

    /// Byte-granular DMA channel entry.
    #[must_use]
    pub fn dma(name: impl Into<String>) -> Self {
        Self {
            kind: InterfaceKind::Dma,
            name: name.into(),
            base: Address(0),
            size: Address(1),
            access_width: 1,
            alignment: 1,
        }
    }
}

/// Layout used when a description lists no interfaces: three 4 KiB MMIO
/// windows accepting 1 to 4 byte accesses, then one DMA channel.
#[must_use]
pub fn default_interfaces() -> Vec<InterfaceSpec> {
    let mut interfaces: Vec<InterfaceSpec> = DEFAULT_MMIO_BASES
        .iter()
        .enumerate()
        .map(|(index, base)| {
            InterfaceSpec::mmio(format!("mmio-{index:02}"), *base, DEFAULT_MMIO_SIZE, 1, 4)
        })
        .collect();
    interfaces.push(InterfaceSpec::dma("dma-00"));
    interfaces
}

/// Direction of a recorded register operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Driver read the register.
    Read,
    /// Driver wrote the register.
    Write,
}

impl Direction {
    fn parse(rw: &str) -> Option<Self> {
        match rw.trim().to_ascii_lowercase().as_str() {
            "r" => Some(Self::Read),
            "w" => Some(Self::Write),
            _ => None,
        }
    }
}

/// Recorded register operation body.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationSpec {
    /// Operation type; only `mmio` feeds the register map.
    #[serde(rename = "type")]
    pub kind: String,
    /// `r` or `w`.
    pub rw: String,
    /// Register label.
    pub name: String,
    /// Access size in bytes.
    pub size: Option<Address>,
    /// Register addresses; only the first is used.
    pub reg: Vec<Address>,
    /// Index of the MMIO window among the description's MMIO interfaces.
    #[serde(rename = "regionId")]
    pub region_id: usize,
}

/// Entry of the `ops` list: either a register operation or a call record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OpEntry {
    /// Free-form identifier.
    pub id: serde_json::Value,
    /// Register operation, when this entry is one.
    pub operation: Option<OperationSpec>,
    /// Call record; carried but not interpreted.
    pub callee: Option<serde_json::Value>,
}

/// Register access resolved from an [`OpEntry`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisterAccess {
    /// MMIO window index among the description's MMIO interfaces.
    pub region: usize,
    /// Register offset inside the window.
    pub offset: u64,
    /// Register size in bytes (at least 1).
    pub size: u64,
    /// Access direction.
    pub direction: Direction,
    /// Register label.
    pub name: String,
}

/// Parsed device description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceDescription {
    /// Device name.
    pub name: String,
    /// Interface layout; [`default_interfaces`] when absent.
    #[serde(default)]
    pub interfaces: Option<Vec<InterfaceSpec>>,
    /// Recorded driver operations.
    #[serde(default)]
    pub ops: Vec<OpEntry>,
    /// Harness overrides.
    #[serde(default)]
    pub harness: Option<HarnessConfig>,
}

impl DeviceDescription {
    /// Description with the default layout and no recorded operations.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            interfaces: None,
            ops: Vec::new(),
            harness: None,
        }
    }

    /// Parses a description from JSON text.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`serde_json::Error`] for malformed documents.
    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Interfaces to register, in order.
    #[must_use]
    pub fn interface_specs(&self) -> Vec<InterfaceSpec> {
        self.interfaces.clone().unwrap_or_else(default_interfaces)
    }

    /// Harness configuration, falling back to defaults.
    #[must_use]
    pub fn harness_config(&self) -> HarnessConfig {
        self.harness.unwrap_or_default()
    }

    /// Registers every interface into `registry` in listed order.
    ///
    /// # Errors
    ///
    /// Propagates the first registration failure.
    pub fn register_interfaces(
        &self,
        registry: &mut InterfaceRegistry,
    ) -> Result<Vec<InterfaceId>, HarnessError> {
        self.interface_specs()
            .into_iter()
            .map(|spec| {
                registry.register(
                    spec.kind,
                    spec.base.value(),
                    spec.size.value(),
                    spec.name,
                    spec.access_width,
                    spec.alignment,
                )
            })
            .collect()
    }

    /// MMIO register accesses with a known address, in recorded order.
    #[must_use]
    pub fn register_accesses(&self) -> Vec<RegisterAccess> {
        self.ops
            .iter()
            .filter_map(|entry| entry.operation.as_ref())
            .filter_map(|operation| {
                if !operation.kind.eq_ignore_ascii_case("mmio") {
                    return None;
                }
                let direction = Direction::parse(&operation.rw)?;
                let address = operation.reg.first().copied().unwrap_or(Address(0));
                if address.is_unknown() {
                    tracing::trace!(
                        name = %operation.name,
                        "skipping register with unknown address"
                    );
                    return None;
                }
                Some(RegisterAccess {
                    region: operation.region_id,
                    offset: address.value(),
                    size: operation.size.map_or(1, |size| size.value().max(1)),
                    direction,
                    name: operation.name.clone(),
                })
            })
            .collect()
    }
}

/// Reads and parses the description at `path`.
///
/// # Errors
///
/// Returns [`LoadError::NotFound`] for a missing file, [`LoadError::Io`] when it
/// cannot be read, and [`LoadError::Parse`] for malformed JSON.
pub fn load_description(path: impl AsRef<Path>) -> Result<DeviceDescription, LoadError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(LoadError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let text = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let description =
        DeviceDescription::from_json_str(&text).map_err(|source| LoadError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    tracing::debug!(
        path = %path.display(),
        name = %description.name,
        ops = description.ops.len(),
        "loaded device description"
    );
    Ok(description)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::{
        default_interfaces, load_description, Address, DeviceDescription, Direction, LoadError,
    };
    use crate::{FaultPolicy, InterfaceKind, InterfaceRegistry};

    const E1000_OPS: &str = r#"{
        "name": "e1000",
        "ops": [
            { "id": 1, "operation": { "type": "mmio", "rw": "w", "name": "CTRL", "size": 4, "reg": [0], "regionId": 0 } },
            { "id": 2, "operation": { "type": "mmio", "rw": "R", "name": "STATUS", "size": "4", "reg": ["8"], "regionId": 0 } },
            { "id": 3, "operation": { "type": "mmio", "rw": "w", "name": "LOST", "size": 4, "reg": [3735928559], "regionId": 0 } },
            { "id": 4, "operation": { "type": "pio", "rw": "w", "name": "IOADDR", "size": 4, "reg": [0], "regionId": 1 } },
            { "id": 5, "callee": { "name": "e1000_reset" } }
        ]
    }"#;

    #[test]
    fn default_layout_mirrors_driver_registration() {
        let interfaces = default_interfaces();
        let names: Vec<&str> = interfaces.iter().map(|spec| spec.name.as_str()).collect();
        assert_eq!(names, ["mmio-00", "mmio-01", "mmio-02", "dma-00"]);
        assert_eq!(interfaces[1].base, Address::new(0xFFFF_1000));
        assert_eq!(interfaces[3].kind, InterfaceKind::Dma);
    }

    #[test]
    fn register_accesses_skip_unknown_and_non_mmio_entries() {
        let description = DeviceDescription::from_json_str(E1000_OPS).expect("valid json");
        let accesses = description.register_accesses();

        assert_eq!(accesses.len(), 2);
        assert_eq!(accesses[0].direction, Direction::Write);
        assert_eq!(accesses[0].offset, 0);
        assert_eq!(accesses[1].direction, Direction::Read);
        assert_eq!(accesses[1].offset, 8);
        assert_eq!(accesses[1].size, 4);
    }

    #[test]
    fn explicit_interfaces_and_harness_overrides_are_honored() {
        let description = DeviceDescription::from_json_str(
            r#"{
                "name": "tiny",
                "interfaces": [
                    { "kind": "mmio", "name": "bar0", "base": "0xFEB00000", "size": 256, "access_width": 4, "alignment": 4 },
                    { "kind": "dma", "name": "ring", "size": 1, "access_width": 1, "alignment": 1 }
                ],
                "harness": { "fault_policy": "continue" }
            }"#,
        )
        .expect("valid json");

        let mut registry = InterfaceRegistry::new();
        let ids = description
            .register_interfaces(&mut registry)
            .expect("valid geometry");
        assert_eq!(ids.len(), 2);
        let bar0 = registry.get(ids[0]).expect("registered");
        assert_eq!(bar0.base_address(), 0xFEB0_0000);
        assert_eq!(bar0.size(), 256);
        assert_eq!(description.harness_config().fault_policy, FaultPolicy::Continue);
    }

    #[test]
    fn invalid_geometry_in_description_is_reported() {
        let description = DeviceDescription::from_json_str(
            r#"{ "name": "bad", "interfaces": [ { "kind": "mmio", "name": "bar0", "size": 0, "access_width": 4, "alignment": 4 } ] }"#,
        )
        .expect("valid json");
        let mut registry = InterfaceRegistry::new();
        let error = description
            .register_interfaces(&mut registry)
            .expect_err("empty window");
        assert!(error.is_config());
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("absent.json");
        let error = load_description(&missing).expect_err("missing file");
        assert!(matches!(error, LoadError::NotFound { .. }));
        assert!(error.to_string().contains("does not exist"));
    }

    #[test]
    fn load_reads_and_parses_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(E1000_OPS.as_bytes()).expect("write description");

        let description = load_description(file.path()).expect("loadable");
        assert_eq!(description.name, "e1000");
        assert_eq!(description.ops.len(), 5);
        assert_eq!(description.interface_specs(), default_interfaces());
    }

    #[test]
    fn load_reports_parse_errors() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(b"{ \"name\": ").expect("write description");
        let error = load_description(file.path()).expect_err("truncated json");
        assert!(matches!(error, LoadError::Parse { .. }));
    }

    #[test]
    fn string_addresses_accept_hex_and_decimal() {
        let parsed: Vec<Address> =
            serde_json::from_str(r#"[16, "16", "0x10", "0X10"]"#).expect("numeric values");
        assert!(parsed.iter().all(|address| address.value() == 16));
        assert!(serde_json::from_str::<Address>(r#""sixteen""#).is_err());
    }
}
