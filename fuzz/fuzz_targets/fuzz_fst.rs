#![no_main]

use libfuzzer_sys::fuzz_target;
use termfst::fst::{Fst, FstBuilder, IntOutput};

fuzz_target!(|data: &[u8]| {
    // Carve arbitrary bytes into keys, sort and dedup them, then check
    // that every key round-trips through build + serialize + reload.
    let mut keys: Vec<&[u8]> = data.split(|&b| b == 0xFF).collect();
    keys.sort();
    keys.dedup();

    let mut builder = FstBuilder::new();
    for (i, key) in keys.iter().enumerate() {
        builder.add(key, IntOutput(i as u64)).unwrap();
    }
    let Some(fst) = builder.finish().unwrap() else {
        return;
    };

    let mut blob = Vec::new();
    fst.write_to(&mut blob).unwrap();
    let reloaded: Fst<IntOutput> = Fst::read_from(&blob).unwrap();

    for (i, key) in keys.iter().enumerate() {
        assert_eq!(reloaded.get(key).unwrap(), Some(IntOutput(i as u64)));
    }
});
