#![no_main]

use heapscope::{
    analysis::{AnalysisOptions, AnalysisSession},
    snapshot::{Address, MemorySnapshotBuilder, RootKind},
};
use libfuzzer_sys::fuzz_target;

const TYPES: [&str; 6] = [
    "App.Node",
    "App.Form+<>c__DisplayClass2_0",
    "System.Threading.Timer",
    "System.Net.Http.HttpClient",
    "System.Threading.Tasks.Task",
    "System.Byte[]",
];

// Every 4-byte chunk is one instruction: opcode, two small addresses and a size.
fuzz_target!(|data: &[u8]| {
    let mut builder = MemorySnapshotBuilder::new();
    for chunk in data.chunks_exact(4) {
        let (a, b) = (Address::new(u64::from(chunk[1])), Address::new(u64::from(chunk[2])));
        builder = match chunk[0] % 5 {
            0 => builder.object(a, TYPES[usize::from(chunk[3]) % TYPES.len()], u64::from(chunk[3])),
            1 => builder.untyped_object(a, u64::from(chunk[3])),
            2 => builder.reference(a, b),
            3 => builder.root(a, RootKind::Stack),
            _ => builder.pinned_root(a, RootKind::PinnedHandle),
        };
    }

    let options = AnalysisOptions::default();
    let Ok(session) = AnalysisSession::new(builder.build(), options) else {
        return;
    };
    let _ = session.execute();
    let _ = session.cycles();
    for raw in 0..=u8::MAX {
        let _ = session.retention_path(Address::new(u64::from(raw)));
    }
});
