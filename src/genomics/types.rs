use std::sync::Arc;

/// Number of tallied nucleotides (A, C, G, T).
pub const NUM_BASES: usize = 4;

/// Tallied nucleotides in index order.
pub const BASES: [u8; NUM_BASES] = [b'A', b'C', b'G', b'T'];

/// Index of a nucleotide in [`BASES`], or `None` for ambiguous symbols.
pub fn base_index(base: u8) -> Option<usize> {
    match base {
        b'A' | b'a' => Some(0),
        b'C' | b'c' => Some(1),
        b'G' | b'g' => Some(2),
        b'T' | b't' => Some(3),
        _ => None,
    }
}

/// Simple CIGAR operation kinds describing how a read aligns to the reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CigarOpKind {
    /// Consuming match/mismatch (`M`).
    Match,
    /// Sequence match (`=`).
    Equal,
    /// Sequence mismatch (`X`).
    Diff,
    /// Insertion relative to the reference.
    Insertion,
    /// Deletion relative to the reference.
    Deletion,
    /// Skipped reference region (`N`).
    RefSkip,
    /// Soft clipping (sequence present in read only).
    SoftClip,
    /// Hard clipping (trimmed sequence not present in read).
    HardClip,
    /// Silent padding.
    Pad,
}

impl CigarOpKind {
    /// Whether the operation consumes read bases.
    pub fn consumes_read(self) -> bool {
        matches!(
            self,
            Self::Match | Self::Equal | Self::Diff | Self::Insertion | Self::SoftClip
        )
    }

    /// Whether the operation consumes reference bases.
    pub fn consumes_reference(self) -> bool {
        matches!(
            self,
            Self::Match | Self::Equal | Self::Diff | Self::Deletion | Self::RefSkip
        )
    }

    /// Whether the operation is an insertion or deletion.
    pub fn is_indel(self) -> bool {
        matches!(self, Self::Insertion | Self::Deletion)
    }
}

/// CIGAR operation with length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CigarOp {
    /// Operation kind.
    pub kind: CigarOpKind,
    /// Number of bases affected by the operation.
    pub len: u32,
}

impl CigarOp {
    /// Construct a new CIGAR operation.
    pub fn new(kind: CigarOpKind, len: u32) -> Self {
        Self { kind, len }
    }
}

/// Reference strand a base was sequenced from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MapStrand {
    /// Read mapped to the forward strand.
    Forward,
    /// Read mapped to the reverse strand.
    Reverse,
    /// Overlapping mates from both strands agree on this base.
    Both,
}

impl MapStrand {
    /// Decode an originating-strand tag character (`F`, `R` or `S`).
    pub fn from_tag(symbol: u8) -> Option<Self> {
        match symbol {
            b'F' | b'f' => Some(Self::Forward),
            b'R' | b'r' => Some(Self::Reverse),
            b'S' | b's' => Some(Self::Both),
            _ => None,
        }
    }

    fn from_orientation(is_reverse: bool) -> Self {
        if is_reverse {
            Self::Reverse
        } else {
            Self::Forward
        }
    }
}

/// Aligned read with sequence and quality information.
#[derive(Debug, Clone)]
pub struct AlignedRead {
    /// Query name carrying the molecule identifier.
    pub name: Arc<str>,
    /// Reference contig/chromosome name.
    pub chrom: Arc<str>,
    /// 0-based leftmost reference coordinate.
    pub pos: u64,
    /// Mapping quality (Phred-scaled).
    pub mapq: u8,
    /// CIGAR describing the alignment.
    pub cigar: Vec<CigarOp>,
    /// Read sequence stored as uppercase ASCII.
    pub sequence: Arc<[u8]>,
    /// Per-base quality scores in Phred space.
    pub qualities: Arc<[u8]>,
    /// Whether the read maps to the reverse complement strand.
    pub is_reverse: bool,
    /// Whether the record is unmapped.
    pub is_unmapped: bool,
    /// Per aligned base originating strand (`F`/`R`/`S`), when the source
    /// carries that annotation.
    pub strand_tags: Option<Arc<[u8]>>,
}

impl AlignedRead {
    /// Construct a new mapped read wrapper.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<Arc<str>>,
        chrom: impl Into<Arc<str>>,
        pos: u64,
        mapq: u8,
        cigar: Vec<CigarOp>,
        sequence: impl Into<Arc<[u8]>>,
        qualities: impl Into<Arc<[u8]>>,
        is_reverse: bool,
    ) -> Self {
        Self {
            name: name.into(),
            chrom: chrom.into(),
            pos,
            mapq,
            cigar,
            sequence: sequence.into(),
            qualities: qualities.into(),
            is_reverse,
            is_unmapped: false,
            strand_tags: None,
        }
    }

    /// Attach a per aligned base originating-strand annotation.
    pub fn with_strand_tags(mut self, tags: impl Into<Arc<[u8]>>) -> Self {
        self.strand_tags = Some(tags.into());
        self
    }

    /// Mark the record as unmapped.
    pub fn unmapped(mut self) -> Self {
        self.is_unmapped = true;
        self
    }

    /// End position (half-open) on the reference.
    pub fn end(&self) -> u64 {
        let span: u64 = self
            .cigar
            .iter()
            .filter(|op| op.kind.consumes_reference())
            .map(|op| u64::from(op.len))
            .sum();
        self.pos + span
    }

    /// Whether the alignment contains an insertion or deletion.
    pub fn has_indel(&self) -> bool {
        self.cigar.iter().any(|op| op.kind.is_indel())
    }

    /// Base at the provided read offset.
    pub fn base_at(&self, offset: usize) -> Option<u8> {
        self.sequence.get(offset).copied()
    }

    /// Quality score at the provided read offset.
    pub fn quality_at(&self, offset: usize) -> Option<u8> {
        self.qualities.get(offset).copied()
    }

    /// Mapping quality associated with the alignment.
    pub fn mapq(&self) -> u8 {
        self.mapq
    }

    /// Mapping strand of the `ordinal`-th aligned base.
    ///
    /// Uses the originating-strand annotation when present and falls back to
    /// the read orientation otherwise.
    pub fn map_strand_at(&self, ordinal: usize) -> MapStrand {
        self.strand_tags
            .as_ref()
            .and_then(|tags| tags.get(ordinal).copied())
            .and_then(MapStrand::from_tag)
            .unwrap_or_else(|| MapStrand::from_orientation(self.is_reverse))
    }

    /// Reference coordinate and read offset of every aligned (non-clipped,
    /// non-inserted) base, in reference order.
    pub fn aligned_pairs(&self) -> Vec<(u64, usize)> {
        let mut pairs = Vec::with_capacity(self.sequence.len());
        let mut ref_pos = self.pos;
        let mut read_offset = 0usize;

        for op in &self.cigar {
            let len = op.len as usize;
            match op.kind {
                CigarOpKind::Match | CigarOpKind::Equal | CigarOpKind::Diff => {
                    for i in 0..len {
                        pairs.push((ref_pos + i as u64, read_offset + i));
                    }
                    ref_pos += u64::from(op.len);
                    read_offset += len;
                }
                kind => {
                    if kind.consumes_reference() {
                        ref_pos += u64::from(op.len);
                    }
                    if kind.consumes_read() {
                        read_offset += len;
                    }
                }
            }
        }

        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(cigar: Vec<CigarOp>, sequence: &[u8]) -> AlignedRead {
        AlignedRead::new(
            "AAAA:+:3:1",
            "chr1",
            100,
            60,
            cigar,
            sequence.to_vec(),
            vec![30; sequence.len()],
            false,
        )
    }

    #[test]
    fn aligned_pairs_skip_soft_clips() {
        let read = read(
            vec![
                CigarOp::new(CigarOpKind::SoftClip, 2),
                CigarOp::new(CigarOpKind::Match, 3),
                CigarOp::new(CigarOpKind::SoftClip, 1),
            ],
            b"NNACGN",
        );

        assert_eq!(read.aligned_pairs(), vec![(100, 2), (101, 3), (102, 4)]);
        assert_eq!(read.end(), 103);
        assert!(!read.has_indel());
    }

    #[test]
    fn ref_skip_advances_reference_only() {
        let read = read(
            vec![
                CigarOp::new(CigarOpKind::Match, 2),
                CigarOp::new(CigarOpKind::RefSkip, 10),
                CigarOp::new(CigarOpKind::Match, 2),
            ],
            b"ACGT",
        );

        assert_eq!(read.aligned_pairs(), vec![(100, 0), (101, 1), (112, 2), (113, 3)]);
        assert_eq!(read.end(), 114);
    }

    #[test]
    fn indels_are_flagged() {
        let read = read(
            vec![
                CigarOp::new(CigarOpKind::Match, 2),
                CigarOp::new(CigarOpKind::Deletion, 1),
                CigarOp::new(CigarOpKind::Match, 2),
            ],
            b"ACGT",
        );
        assert!(read.has_indel());
    }

    #[test]
    fn strand_tags_override_orientation() {
        let read = read(vec![CigarOp::new(CigarOpKind::Match, 3)], b"ACG").with_strand_tags(b"FSR".to_vec());
        assert_eq!(read.map_strand_at(0), MapStrand::Forward);
        assert_eq!(read.map_strand_at(1), MapStrand::Both);
        assert_eq!(read.map_strand_at(2), MapStrand::Reverse);
        // Missing annotation falls back to the read orientation.
        assert_eq!(read.map_strand_at(3), MapStrand::Forward);
    }
}
