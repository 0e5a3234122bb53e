//! Allocation accounting for decoded sequences: releasing a sequence returns
//! every byte the decoder allocated for it.

#![allow(unsafe_code)]

use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::Cell;

use hex as _;
use proptest as _;
use rstest as _;
use serde as _;
use serde_json as _;
use tempfile as _;
use thiserror as _;
use tracing as _;
use virtfuzz_core::{Decoder, DeviceDescription, HarnessConfig, InterfaceRegistry};

struct CountingAlloc;

thread_local! {
    static LIVE_BYTES: Cell<isize> = const { Cell::new(0) };
}

fn track(delta: isize) {
    let _ = LIVE_BYTES.try_with(|live| live.set(live.get() + delta));
}

fn signed(size: usize) -> isize {
    isize::try_from(size).unwrap_or(isize::MAX)
}

fn live_bytes() -> isize {
    LIVE_BYTES.with(Cell::get)
}

unsafe impl GlobalAlloc for CountingAlloc {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc(layout) };
        if !ptr.is_null() {
            track(signed(layout.size()));
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe { System.dealloc(ptr, layout) };
        track(-signed(layout.size()));
    }
}

#[global_allocator]
static GLOBAL: CountingAlloc = CountingAlloc;

#[test]
fn release_frees_every_decoded_allocation() {
    let mut registry = InterfaceRegistry::new();
    DeviceDescription::named("e1000")
        .register_interfaces(&mut registry)
        .expect("default layout");
    registry.freeze();
    let decoder = Decoder::new(&registry, &HarnessConfig::default()).expect("frozen");
    let input: Vec<u8> = (0..4096_u32)
        .map(|index| u8::try_from(index.wrapping_mul(31) % 253).expect("fits in u8"))
        .collect();

    // warm-up: any one-time lazy initialisation happens outside the window
    let _ = decoder.decode_bytes(&input).release();

    let before = live_bytes();
    let sequence = decoder.decode_bytes(&input);
    assert!(!sequence.is_empty());
    assert!(live_bytes() > before);

    let summary = sequence.release();
    assert_eq!(live_bytes(), before);
    assert!(summary.messages > 0);
}
