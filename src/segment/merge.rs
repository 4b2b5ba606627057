//! K-way merge of immutable segments.
//!
//! Merging preserves global term order, sums per-term statistics, assigns
//! fresh dense ordinals to the merged dictionary, and remaps parent
//! pointers through each source segment's old-to-new ordinal map. Source
//! segments are only read; they can stay open for concurrent searches
//! throughout the merge, and the caller swaps readers over once the merged
//! segment is live.

use crate::error::{Error, Result};
use crate::segment::reader::SegmentReader;
use crate::segment::types::*;
use crate::segment::writer::SegmentWriter;
use crate::taxonomy::arrays::ParentSource;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Old-ordinal to new-ordinal translation for one source segment.
#[derive(Debug, Clone)]
pub struct OrdinalMap {
    map: Vec<Ordinal>,
}

impl OrdinalMap {
    fn with_len(len: usize) -> Self {
        Self {
            map: vec![INVALID_ORDINAL; len],
        }
    }

    /// New ordinal for `old`, or [`INVALID_ORDINAL`] if `old` is out of
    /// range.
    pub fn get(&self, old: Ordinal) -> Ordinal {
        self.map
            .get(old as usize)
            .copied()
            .unwrap_or(INVALID_ORDINAL)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Outcome of a merge: the merged segment's metadata plus one ordinal map
/// per source segment, in input order.
pub struct MergeResult {
    pub meta: SegmentMeta,
    pub ordinal_maps: Vec<OrdinalMap>,
}

/// Open several segment directories, in parallel.
pub fn open_segments(dirs: &[PathBuf]) -> Result<Vec<SegmentReader>> {
    dirs.par_iter().map(|dir| SegmentReader::open(dir)).collect()
}

/// Merge `segments` into a new segment at `out_dir`.
pub fn merge_segments(segments: &[SegmentReader], out_dir: &Path) -> Result<MergeResult> {
    let mut writer = SegmentWriter::create(out_dir)?;
    let mut maps: Vec<OrdinalMap> = segments
        .iter()
        .map(|segment| OrdinalMap::with_len(segment.term_count() as usize))
        .collect();

    // One cursor per source segment; heads hold the next undelivered term.
    let mut streams: Vec<_> = segments.iter().map(|segment| segment.terms()).collect();
    let mut heads: Vec<Option<(Vec<u8>, TermOutput)>> = Vec::with_capacity(streams.len());
    for stream in &mut streams {
        heads.push(stream.next()?.map(|(term, output)| (term.to_vec(), output)));
    }

    loop {
        // Smallest head key; segment counts are small enough that a scan
        // beats maintaining a heap.
        let Some(min_term) = heads
            .iter()
            .flatten()
            .map(|(term, _)| term)
            .min()
            .cloned()
        else {
            break;
        };

        let mut stats = TermStats::default();
        let mut parent: Option<Ordinal> = None;
        let mut matched: Vec<(usize, Ordinal)> = Vec::new();
        for (i, head) in heads.iter().enumerate() {
            let Some((term, output)) = head else { continue };
            if *term != min_term {
                continue;
            }
            let old_ordinal = output.first.0 as Ordinal;
            stats = stats.merged(&segments[i].stats_at(output.second.0)?);

            let old_parent = segments[i].parent_of(old_ordinal)?;
            let mapped = if old_parent == INVALID_ORDINAL {
                INVALID_ORDINAL
            } else {
                match maps[i].get(old_parent) {
                    INVALID_ORDINAL => {
                        // A parent term always sorts before its children,
                        // so it must have been merged already
                        return Err(Error::corrupt(
                            old_parent as u64,
                            "parent ordinal not merged before its child",
                        ));
                    }
                    new_parent => new_parent,
                }
            };
            match parent {
                None => parent = Some(mapped),
                Some(existing) if existing != mapped => {
                    return Err(Error::corrupt(
                        old_ordinal as u64,
                        "segments disagree on a merged term's parent",
                    ));
                }
                _ => {}
            }
            matched.push((i, old_ordinal));
        }

        let new_ordinal = writer.add_term(&min_term, stats, parent.unwrap_or(INVALID_ORDINAL))?;
        for (i, old_ordinal) in matched {
            maps[i].map[old_ordinal as usize] = new_ordinal;
            heads[i] = streams[i]
                .next()?
                .map(|(term, output)| (term.to_vec(), output));
        }
    }

    debug!(
        segments = segments.len(),
        terms = writer.term_count(),
        out = %out_dir.display(),
        "segments merged"
    );
    let meta = writer.finish()?;
    Ok(MergeResult {
        meta,
        ordinal_maps: maps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_segment(dir: &Path, terms: &[(&[u8], u32, u64)]) {
        let mut writer = SegmentWriter::create(dir).unwrap();
        for &(term, doc_freq, total) in terms {
            writer
                .add_term(term, TermStats::new(doc_freq, total), INVALID_ORDINAL)
                .unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn test_merge_preserves_order_and_sums_stats() {
        let dir = tempdir().unwrap();
        let left = dir.path().join("left");
        let right = dir.path().join("right");
        let merged = dir.path().join("merged");

        write_segment(&left, &[(b"ant", 2, 4), (b"bee", 1, 1), (b"cow", 3, 9)]);
        write_segment(&right, &[(b"bee", 5, 10), (b"dog", 1, 2)]);

        let segments = open_segments(&[left, right]).unwrap();
        let result = merge_segments(&segments, &merged).unwrap();
        assert_eq!(result.meta.term_count, 4);

        let reader = SegmentReader::open(&merged).unwrap();
        let mut stream = reader.terms();
        let mut terms = Vec::new();
        while let Some((term, _)) = stream.next().unwrap() {
            terms.push(term.to_vec());
        }
        assert_eq!(
            terms,
            vec![b"ant".to_vec(), b"bee".to_vec(), b"cow".to_vec(), b"dog".to_vec()]
        );

        // "bee" appears in both inputs; its statistics are summed
        let (ordinal, stats) = reader.get(b"bee").unwrap().unwrap();
        assert_eq!(ordinal, 1);
        assert_eq!(stats, TermStats::new(6, 11));
    }

    #[test]
    fn test_ordinal_maps_are_total_and_consistent() {
        let dir = tempdir().unwrap();
        let left = dir.path().join("left");
        let right = dir.path().join("right");
        let merged = dir.path().join("merged");

        write_segment(&left, &[(b"ant", 1, 1), (b"cow", 1, 1)]);
        write_segment(&right, &[(b"bee", 1, 1), (b"cow", 1, 1)]);

        let segments = open_segments(&[left, right]).unwrap();
        let result = merge_segments(&segments, &merged).unwrap();

        let reader = SegmentReader::open(&merged).unwrap();
        for (i, old_terms) in [[&b"ant"[..], b"cow"], [&b"bee"[..], b"cow"]]
            .iter()
            .enumerate()
        {
            for (old_ordinal, term) in old_terms.iter().enumerate() {
                let new_ordinal = result.ordinal_maps[i].get(old_ordinal as Ordinal);
                assert_ne!(new_ordinal, INVALID_ORDINAL);
                assert_eq!(reader.ordinal(term).unwrap(), Some(new_ordinal));
            }
        }
        // The shared term maps to the same new ordinal from both sides
        assert_eq!(result.ordinal_maps[0].get(1), result.ordinal_maps[1].get(0));
    }

    #[test]
    fn test_merge_remaps_parents() {
        let dir = tempdir().unwrap();
        let left = dir.path().join("left");
        let right = dir.path().join("right");
        let merged = dir.path().join("merged");

        // Hierarchical labels: parent paths sort before their children
        {
            let mut writer = SegmentWriter::create(&left).unwrap();
            writer
                .add_term(b"color", TermStats::new(1, 1), INVALID_ORDINAL)
                .unwrap();
            writer
                .add_term(b"color\x1Fred", TermStats::new(1, 1), 0)
                .unwrap();
            writer.finish().unwrap();
        }
        {
            let mut writer = SegmentWriter::create(&right).unwrap();
            writer
                .add_term(b"color", TermStats::new(1, 1), INVALID_ORDINAL)
                .unwrap();
            writer
                .add_term(b"color\x1Fblue", TermStats::new(1, 1), 0)
                .unwrap();
            writer
                .add_term(b"shape", TermStats::new(1, 1), INVALID_ORDINAL)
                .unwrap();
            writer.finish().unwrap();
        }

        let segments = open_segments(&[left, right]).unwrap();
        let result = merge_segments(&segments, &merged).unwrap();
        let reader = SegmentReader::open(&merged).unwrap();

        let color = reader.ordinal(b"color").unwrap().unwrap();
        let blue = reader.ordinal(b"color\x1Fblue").unwrap().unwrap();
        let red = reader.ordinal(b"color\x1Fred").unwrap().unwrap();
        let shape = reader.ordinal(b"shape").unwrap().unwrap();

        assert_eq!(reader.parent_of(color).unwrap(), INVALID_ORDINAL);
        assert_eq!(reader.parent_of(blue).unwrap(), color);
        assert_eq!(reader.parent_of(red).unwrap(), color);
        assert_eq!(reader.parent_of(shape).unwrap(), INVALID_ORDINAL);
        assert_eq!(result.meta.term_count, 4);
    }

    #[test]
    fn test_merge_single_segment_is_identity() {
        let dir = tempdir().unwrap();
        let only = dir.path().join("only");
        let merged = dir.path().join("merged");

        write_segment(&only, &[(b"one", 1, 2), (b"two", 3, 4)]);
        let segments = open_segments(&[only]).unwrap();
        let result = merge_segments(&segments, &merged).unwrap();

        assert_eq!(result.meta.term_count, 2);
        assert_eq!(result.ordinal_maps[0].get(0), 0);
        assert_eq!(result.ordinal_maps[0].get(1), 1);

        let reader = SegmentReader::open(&merged).unwrap();
        assert_eq!(
            reader.get(b"two").unwrap().unwrap().1,
            TermStats::new(3, 4)
        );
    }
}
