#![no_main]

use libfuzzer_sys::fuzz_target;
use virtfuzz_core::{
    run_iteration, Decoder, DeviceDescription, FaultPolicy, HarnessConfig, InterfaceRegistry,
    Operation, RegisterMapModel,
};

fn driver_registry() -> InterfaceRegistry {
    let mut registry = InterfaceRegistry::new();
    if DeviceDescription::named("fuzz")
        .register_interfaces(&mut registry)
        .is_err()
    {
        return registry;
    }
    registry.freeze();
    registry
}

fuzz_target!(|data: &[u8]| {
    let registry = driver_registry();
    let config = HarnessConfig::default().with_fault_policy(FaultPolicy::Continue);

    let Ok(decoder) = Decoder::new(&registry, &config) else {
        return;
    };
    let sequence = decoder.decode_bytes(data);
    assert!(sequence.len() <= config.max_messages);
    for message in &sequence {
        let Ok(interface) = registry.get(message.interface_id()) else {
            panic!("decoded message targets unknown interface {}", message.interface_id());
        };
        match message.operation() {
            Operation::Read | Operation::Write => {
                assert!(interface.contains(message.offset(), message.length() as u64));
                assert_eq!(message.offset() % interface.granule(), 0);
            }
            Operation::DmaTransfer => {
                assert_eq!(message.offset(), 0);
                assert!((1..=usize::from(config.max_dma_transfer)).contains(&message.length()));
            }
        }
    }
    assert_eq!(sequence, decoder.decode_bytes(data));
    let _ = sequence.release();

    let mut model = RegisterMapModel::unconstrained(&registry);
    if let Ok(iteration) = run_iteration(data, &registry, &mut model, &config) {
        assert!(iteration.is_clean());
        assert_eq!(iteration.report.replayed, iteration.decoded);
    }
});
