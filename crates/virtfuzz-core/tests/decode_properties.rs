//! Property coverage for decoder determinism, bounds, and budgets.

#![allow(clippy::pedantic, clippy::nursery)]

use hex as _;
use proptest::prelude::*;
use rstest as _;
use serde as _;
use serde_json as _;
use tempfile as _;
use thiserror as _;
use tracing as _;
use virtfuzz_core::{
    Decoder, HarnessConfig, InterfaceKind, InterfaceRegistry, Operation, MIN_MESSAGE_HEADER_SIZE,
};

/// Mixed geometry: byte-granular window, a window whose size is not a
/// multiple of its width, a window past the 16-bit offset range, and a DMA
/// channel.
fn mixed_registry() -> InterfaceRegistry {
    let mut registry = InterfaceRegistry::new();
    registry
        .register(InterfaceKind::Mmio, 0xFFFF_0000, 0x1000, "mmio-00", 1, 4)
        .expect("valid mmio");
    registry
        .register(InterfaceKind::Mmio, 0xFEB0_0000, 0x1002, "odd", 4, 4)
        .expect("valid mmio");
    registry
        .register(InterfaceKind::Mmio, 0xE000_0000, 0x2_0000, "wide", 2, 8)
        .expect("valid mmio");
    registry
        .register(InterfaceKind::Dma, 0, 1, "dma-00", 1, 1)
        .expect("valid dma");
    registry.freeze();
    registry
}

proptest! {
    #[test]
    fn decoding_is_deterministic(input in proptest::collection::vec(any::<u8>(), 0..512)) {
        let registry = mixed_registry();
        let decoder = Decoder::new(&registry, &HarnessConfig::default()).expect("frozen");
        prop_assert_eq!(decoder.decode_bytes(&input), decoder.decode_bytes(&input));
    }

    #[test]
    fn every_message_is_in_bounds_and_well_formed(
        input in proptest::collection::vec(any::<u8>(), 0..1024),
        max_dma in 1u16..=512,
    ) {
        let registry = mixed_registry();
        let config = HarnessConfig { max_dma_transfer: max_dma, ..HarnessConfig::default() };
        let sequence = Decoder::new(&registry, &config).expect("frozen").decode_bytes(&input);

        let minimum_consumed = sequence.len() * MIN_MESSAGE_HEADER_SIZE;
        prop_assert!(minimum_consumed <= input.len());

        for message in &sequence {
            let interface = registry.get(message.interface_id()).expect("registered id");
            prop_assert_eq!(message.operation().kind(), interface.kind());
            match message.operation() {
                Operation::Read | Operation::Write => {
                    let length = message.length() as u64;
                    prop_assert!(interface.contains(message.offset(), length));
                    prop_assert_eq!(message.offset() % interface.granule(), 0);
                    let span = interface.size() - message.offset();
                    prop_assert!(
                        interface.widths().iter().any(|width| u64::from(*width) == length)
                            || length == span
                    );
                    prop_assert!(length >= 1);
                }
                Operation::DmaTransfer => {
                    prop_assert_eq!(message.offset(), 0);
                    prop_assert!((1..=usize::from(max_dma)).contains(&message.length()));
                }
            }
            if message.operation().carries_payload() {
                prop_assert_eq!(message.payload().len(), message.length());
            } else {
                prop_assert!(message.payload().is_empty());
            }
        }
    }

    #[test]
    fn message_budget_is_never_exceeded(
        input in proptest::collection::vec(any::<u8>(), 0..2048),
        budget in 0usize..16,
    ) {
        let registry = mixed_registry();
        let config = HarnessConfig::default().with_max_messages(budget);
        let sequence = Decoder::new(&registry, &config).expect("frozen").decode_bytes(&input);
        prop_assert!(sequence.len() <= budget);
    }

    #[test]
    fn inputs_shorter_than_a_header_decode_to_nothing(
        input in proptest::collection::vec(any::<u8>(), 0..MIN_MESSAGE_HEADER_SIZE),
    ) {
        let registry = mixed_registry();
        let sequence = Decoder::new(&registry, &HarnessConfig::default())
            .expect("frozen")
            .decode_bytes(&input);
        prop_assert!(sequence.is_empty());
    }
}
