#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use duplexcall::genomics::{AlignedRead, CigarOp, CigarOpKind, InMemoryReference};

fn snapshot_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("snapshots")
}

pub fn assert_snapshot(name: &str, actual: &str) {
    let path = snapshot_root().join(name);
    if std::env::var("DUPLEXCALL_UPDATE_SNAPSHOTS").is_ok() {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create snapshot directory");
        }
        fs::write(&path, actual).expect("write snapshot");
        return;
    }

    let expected =
        fs::read_to_string(&path).unwrap_or_else(|_| panic!("snapshot {:?} not found", path));
    if normalize(&expected) != normalize(actual) {
        panic!(
            "Snapshot mismatch for {:?}. Set DUPLEXCALL_UPDATE_SNAPSHOTS=1 to regenerate.\nExpected:\n{}\nActual:\n{}",
            path,
            expected,
            actual
        );
    }
}

fn normalize(input: &str) -> String {
    input.replace("\r\n", "\n")
}

/// Fully matched read on `chrom` with uniform base quality 30.
pub fn matched_read(name: &str, chrom: &str, pos: u64, bases: &[u8], is_reverse: bool) -> AlignedRead {
    AlignedRead::new(
        name,
        chrom,
        pos,
        60,
        vec![CigarOp::new(CigarOpKind::Match, bases.len() as u32)],
        bases.to_vec(),
        vec![30; bases.len()],
        is_reverse,
    )
}

/// Collapsed read name for molecule `counter`.
pub fn molecule_name(barcode: &str, positive: bool, family_size: u32, counter: u64) -> String {
    let strand = if positive { '+' } else { '-' };
    format!("{barcode}:{strand}:{family_size}:{counter}")
}

/// `chr1` carries `G` at 0-based 5 inside a `T` run; `chr2` is all `A`.
pub fn locus_reference() -> InMemoryReference {
    InMemoryReference::new("synthetic.fa")
        .with_contig("chr1", b"TTTTTGTTTTTTTTTTTTTT")
        .with_contig("chr2", b"AAAAAAAAAAAAAAAA")
}

/// Two reads of one duplex molecule calling `A` over the chr1 `G`, plus four
/// single-strand molecules calling `G`.
pub fn duplex_locus_reads() -> Vec<AlignedRead> {
    vec![
        matched_read(&molecule_name("TAATGC", true, 4, 7), "chr1", 3, b"TTATT", false),
        matched_read(&molecule_name("TAATGC", false, 4, 7), "chr1", 3, b"TTATT", true),
        matched_read(&molecule_name("GGCATT", true, 3, 1), "chr1", 3, b"TTGTT", false),
        matched_read(&molecule_name("CCTAGA", false, 3, 2), "chr1", 3, b"TTGTT", true),
        matched_read(&molecule_name("ATTACG", true, 3, 3), "chr1", 3, b"TTGTT", false),
        matched_read(&molecule_name("GCGCAA", false, 3, 4), "chr1", 3, b"TTGTT", true),
    ]
}
