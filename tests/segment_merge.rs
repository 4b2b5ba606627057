//! Cross-component tests: segments written to disk, reopened, merged, and
//! consumed by the taxonomy layer.

use std::path::Path;

use tempfile::tempdir;
use termfst::fst::{FstBuilder, IntOutput};
use termfst::segment::{
    INVALID_ORDINAL, SegmentReader, SegmentWriter, TermStats, merge_segments, open_segments,
};
use termfst::taxonomy::{FacetLabel, OrdinalCache, TaxonomyArrays};

/// Write a taxonomy-shaped segment: every label's parent is added first.
fn write_label_segment(dir: &Path, labels: &[FacetLabel]) {
    let mut sorted: Vec<&FacetLabel> = labels.iter().collect();
    sorted.sort();

    let mut writer = SegmentWriter::create(dir).unwrap();
    let mut ordinals: Vec<(Vec<u8>, u32)> = Vec::new();
    for label in sorted {
        let parent = match label.parent() {
            None => INVALID_ORDINAL,
            Some(parent) if parent.is_empty() => INVALID_ORDINAL,
            Some(parent) => {
                let bytes = parent.to_bytes();
                ordinals
                    .iter()
                    .find(|(key, _)| *key == bytes)
                    .map(|(_, ordinal)| *ordinal)
                    .expect("parent label added before child")
            }
        };
        let ordinal = writer
            .add_term(&label.to_bytes(), TermStats::new(1, 1), parent)
            .unwrap();
        ordinals.push((label.to_bytes(), ordinal));
    }
    writer.finish().unwrap();
}

fn labels(paths: &[&[&str]]) -> Vec<FacetLabel> {
    paths.iter().map(|p| FacetLabel::new(p).unwrap()).collect()
}

#[test]
fn test_fst_round_trip_through_disk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("dict.fst");

    let keys: Vec<Vec<u8>> = (0..500u32)
        .map(|i| format!("term{i:05}").into_bytes())
        .collect();
    let mut builder = FstBuilder::new();
    for (i, key) in keys.iter().enumerate() {
        builder.add(key, IntOutput(i as u64 * 3)).unwrap();
    }
    let fst = builder.finish().unwrap().unwrap();

    let mut file = std::fs::File::create(&path).unwrap();
    fst.write_to(&mut file).unwrap();
    drop(file);

    let reloaded: termfst::fst::Fst<IntOutput> = termfst::fst::Fst::open(&path).unwrap();
    assert_eq!(reloaded.len(), 500);
    for (i, key) in keys.iter().enumerate() {
        assert_eq!(reloaded.get(key).unwrap(), Some(IntOutput(i as u64 * 3)));
    }
    assert_eq!(reloaded.get(b"term99999").unwrap(), None);

    // Enumeration agrees with the input order
    let mut stream = reloaded.stream();
    let mut seen = Vec::new();
    while let Some((key, _)) = stream.next().unwrap() {
        seen.push(key.to_vec());
    }
    assert_eq!(seen, keys);
}

#[test]
fn test_merge_feeds_taxonomy_arrays() {
    let dir = tempdir().unwrap();
    let left = dir.path().join("left");
    let right = dir.path().join("right");
    let merged = dir.path().join("merged");

    write_label_segment(
        &left,
        &labels(&[
            &["color"],
            &["color", "red"],
            &["color", "red", "dark"],
            &["size"],
        ]),
    );
    write_label_segment(
        &right,
        &labels(&[&["color"], &["color", "blue"], &["size"], &["size", "xl"]]),
    );

    let segments = open_segments(&[left, right]).unwrap();
    let result = merge_segments(&segments, &merged).unwrap();
    assert_eq!(result.meta.term_count, 6);

    let reader = SegmentReader::open(&merged).unwrap();
    let arrays = TaxonomyArrays::from_source(&reader, reader.term_count() as usize).unwrap();

    let ordinal_of = |label: &FacetLabel| reader.ordinal(&label.to_bytes()).unwrap().unwrap();
    let color = ordinal_of(&FacetLabel::new(&["color"]).unwrap());
    let red = ordinal_of(&FacetLabel::new(&["color", "red"]).unwrap());
    let blue = ordinal_of(&FacetLabel::new(&["color", "blue"]).unwrap());
    let dark = ordinal_of(&FacetLabel::new(&["color", "red", "dark"]).unwrap());
    let size = ordinal_of(&FacetLabel::new(&["size"]).unwrap());
    let xl = ordinal_of(&FacetLabel::new(&["size", "xl"]).unwrap());

    assert_eq!(arrays.parents()[red as usize], color);
    assert_eq!(arrays.parents()[blue as usize], color);
    assert_eq!(arrays.parents()[dark as usize], red);
    assert_eq!(arrays.parents()[xl as usize], size);

    // Sibling chain under "color" enumerates exactly its children
    let mut children = Vec::new();
    let mut child = arrays.children()[color as usize];
    while child != INVALID_ORDINAL {
        children.push(child);
        child = arrays.siblings()[child as usize];
    }
    children.sort_unstable();
    let mut expected = vec![red, blue];
    expected.sort_unstable();
    assert_eq!(children, expected);
}

#[test]
fn test_merge_statistics_visible_after_reopen() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a");
    let b = dir.path().join("b");
    let c = dir.path().join("c");
    let merged = dir.path().join("merged");

    for (path, freq) in [(&a, 1u32), (&b, 2), (&c, 4)] {
        let mut writer = SegmentWriter::create(path).unwrap();
        writer
            .add_term(b"shared", TermStats::new(freq, freq as u64 * 10), INVALID_ORDINAL)
            .unwrap();
        writer.finish().unwrap();
    }

    let segments = open_segments(&[a, b, c]).unwrap();
    merge_segments(&segments, &merged).unwrap();

    let reader = SegmentReader::open(&merged).unwrap();
    let (_, stats) = reader.get(b"shared").unwrap().unwrap();
    assert_eq!(stats, TermStats::new(7, 70));
}

#[test]
fn test_cache_fronts_segment_lookups() {
    let dir = tempdir().unwrap();
    let segment = dir.path().join("seg");
    let all = labels(&[&["lang"], &["lang", "de"], &["lang", "en"], &["lang", "fr"]]);
    write_label_segment(&segment, &all);

    let reader = SegmentReader::open(&segment).unwrap();
    let mut cache = OrdinalCache::new(3).unwrap();

    // Miss, resolve through the dictionary, then insert; evict in bulk
    // whenever an insert reports the cache full.
    for _ in 0..3 {
        for label in &all {
            let ordinal = match cache.get(label) {
                Some(ordinal) => ordinal,
                None => {
                    let ordinal = reader.ordinal(&label.to_bytes()).unwrap().unwrap();
                    if cache.put(label.clone(), ordinal) {
                        cache.make_room_lru();
                    }
                    ordinal
                }
            };
            assert_eq!(reader.ordinal(&label.to_bytes()).unwrap(), Some(ordinal));
            assert!(cache.len() <= 3);
        }
    }
}
