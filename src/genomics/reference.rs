//! Reference access for the streaming caller.
//!
//! [`ReferenceSource`] is the seam to the indexed reference; [`ReferenceWindow`]
//! keeps a buffered slice of one chromosome around the active reads so that
//! random access into the source is amortized over many reads.

use std::sync::Arc;

use tracing::debug;

use crate::genomics::CallerError;

/// Symbol returned for coordinates outside the buffered reference.
pub const UNKNOWN_BASE: u8 = b'N';

/// Marker placed at the site slot of a [`HomopolymerWindow`].
pub const SITE_MARKER: u8 = b'M';

/// Name and length of a reference contig.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Contig {
    /// Contig name.
    pub name: Arc<str>,
    /// Contig length in bases.
    pub length: u64,
}

/// Random-access reference sequence keyed by contig name.
pub trait ReferenceSource {
    /// Human-readable identity of the reference (usually its path).
    fn identity(&self) -> &str;

    /// Contigs in reference order.
    fn contigs(&self) -> Result<Vec<Contig>, CallerError>;

    /// Length of a contig.
    fn contig_len(&self, chrom: &str) -> Result<u64, CallerError>;

    /// Bases in the half-open range `[start, end)`. Callers clamp `end` to the
    /// contig length.
    fn fetch(&self, chrom: &str, start: u64, end: u64) -> Result<Vec<u8>, CallerError>;
}

/// Reference held entirely in memory. Used by tests, benches and small panels.
#[derive(Debug, Clone, Default)]
pub struct InMemoryReference {
    identity: String,
    contigs: Vec<(Arc<str>, Arc<[u8]>)>,
}

impl InMemoryReference {
    /// Create an empty reference with the given identity.
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            contigs: Vec::new(),
        }
    }

    /// Append a contig.
    pub fn with_contig(mut self, name: impl Into<Arc<str>>, sequence: impl AsRef<[u8]>) -> Self {
        self.contigs
            .push((name.into(), Arc::from(sequence.as_ref().to_vec().into_boxed_slice())));
        self
    }

    fn sequence(&self, chrom: &str) -> Result<&[u8], CallerError> {
        self.contigs
            .iter()
            .find(|(name, _)| name.as_ref() == chrom)
            .map(|(_, seq)| seq.as_ref())
            .ok_or_else(|| CallerError::Reference(format!("unknown contig '{chrom}'")))
    }
}

impl ReferenceSource for InMemoryReference {
    fn identity(&self) -> &str {
        &self.identity
    }

    fn contigs(&self) -> Result<Vec<Contig>, CallerError> {
        Ok(self
            .contigs
            .iter()
            .map(|(name, seq)| Contig {
                name: Arc::clone(name),
                length: seq.len() as u64,
            })
            .collect())
    }

    fn contig_len(&self, chrom: &str) -> Result<u64, CallerError> {
        Ok(self.sequence(chrom)?.len() as u64)
    }

    fn fetch(&self, chrom: &str, start: u64, end: u64) -> Result<Vec<u8>, CallerError> {
        let seq = self.sequence(chrom)?;
        let end = (end as usize).min(seq.len());
        let start = (start as usize).min(end);
        Ok(seq[start..end].to_vec())
    }
}

/// Reference bases around a candidate site, with the site slot holding
/// [`SITE_MARKER`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct HomopolymerWindow {
    bases: Vec<u8>,
    flank: usize,
}

impl HomopolymerWindow {
    /// Bases upstream of the site, nearest last.
    pub fn upstream(&self) -> &[u8] {
        &self.bases[..self.flank]
    }

    /// Bases downstream of the site, nearest first.
    pub fn downstream(&self) -> &[u8] {
        &self.bases[self.flank + 1..]
    }

    /// Full window including the marked site.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bases
    }

    /// Number of bases on each side of the site.
    pub fn flank(&self) -> usize {
        self.flank
    }
}

impl std::fmt::Display for HomopolymerWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.bases))
    }
}

/// Buffered slice of one chromosome.
#[derive(Debug)]
pub struct ReferenceWindow<R> {
    source: R,
    chrom: Option<Arc<str>>,
    contig_len: u64,
    start: u64,
    bases: Vec<u8>,
    buffer: u64,
    lookbehind: u64,
    lookahead: u64,
    fetches: usize,
}

impl<R: ReferenceSource> ReferenceWindow<R> {
    /// Create a window.
    ///
    /// `buffer` bases are guaranteed on each side of the active read. Refetches
    /// additionally keep `lookbehind` bases behind the buffered start (so that
    /// positions still waiting for eviction stay resolvable) and read
    /// `lookahead` bases past the buffered end.
    pub fn new(source: R, buffer: u64, lookbehind: u64, lookahead: u64) -> Self {
        Self {
            source,
            chrom: None,
            contig_len: 0,
            start: 0,
            bases: Vec::new(),
            buffer,
            lookbehind,
            lookahead,
            fetches: 0,
        }
    }

    /// Underlying reference source.
    pub fn source(&self) -> &R {
        &self.source
    }

    /// Number of slices fetched from the source so far.
    pub fn fetches(&self) -> usize {
        self.fetches
    }

    /// Half-open buffered range on the current chromosome.
    pub fn bounds(&self) -> std::ops::Range<u64> {
        self.start..self.start + self.bases.len() as u64
    }

    /// Make sure `[start - buffer, end + buffer)` of `chrom` is buffered,
    /// refetching a larger slice when it is not.
    pub fn ensure(&mut self, chrom: &Arc<str>, start: u64, end: u64) -> Result<(), CallerError> {
        let same_chrom = self.chrom.as_deref() == Some(chrom.as_ref());
        if !same_chrom {
            self.contig_len = self.source.contig_len(chrom)?;
        }

        let wanted_start = start.saturating_sub(self.buffer).min(self.contig_len);
        let wanted_end = (end + self.buffer).min(self.contig_len);
        let bounds = self.bounds();
        if same_chrom && wanted_start >= bounds.start && wanted_end <= bounds.end {
            return Ok(());
        }

        let fetch_start = wanted_start.saturating_sub(self.lookbehind);
        let fetch_end = (wanted_end + self.lookahead).min(self.contig_len);
        let mut bases = if fetch_start < fetch_end {
            self.source.fetch(chrom, fetch_start, fetch_end)?
        } else {
            Vec::new()
        };
        bases.make_ascii_uppercase();

        debug!(
            chrom = chrom.as_ref(),
            start = fetch_start,
            end = fetch_end,
            "refetched reference window"
        );

        self.chrom = Some(Arc::clone(chrom));
        self.start = fetch_start;
        self.bases = bases;
        self.fetches += 1;
        Ok(())
    }

    /// Reference base at `coord`, or [`UNKNOWN_BASE`] outside the buffer.
    pub fn base_at(&self, coord: u64) -> u8 {
        coord
            .checked_sub(self.start)
            .and_then(|offset| self.bases.get(offset as usize))
            .copied()
            .unwrap_or(UNKNOWN_BASE)
    }

    /// `flank` bases on each side of `coord`, with the site itself marked.
    pub fn context(&self, coord: u64, flank: usize) -> HomopolymerWindow {
        let bases = (0..=2 * flank)
            .map(|slot| {
                if slot == flank {
                    SITE_MARKER
                } else {
                    (coord + slot as u64)
                        .checked_sub(flank as u64)
                        .map_or(UNKNOWN_BASE, |pos| self.base_at(pos))
                }
            })
            .collect();
        HomopolymerWindow { bases, flank }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(sequence: &[u8], buffer: u64, lookbehind: u64, lookahead: u64) -> ReferenceWindow<InMemoryReference> {
        let reference = InMemoryReference::new("test.fa")
            .with_contig("chr1", sequence)
            .with_contig("chr2", b"ttttgggg");
        ReferenceWindow::new(reference, buffer, lookbehind, lookahead)
    }

    #[test]
    fn serves_bases_inside_buffer() {
        let mut window = window(b"ACGTACGTACGTACGTACGT", 2, 0, 0);
        let chrom = Arc::from("chr1");
        window.ensure(&chrom, 4, 8).unwrap();
        assert_eq!(window.bounds(), 2..10);
        assert_eq!(window.base_at(4), b'A');
        assert_eq!(window.base_at(9), b'C');
        assert_eq!(window.base_at(10), UNKNOWN_BASE);
        assert_eq!(window.base_at(1), UNKNOWN_BASE);
    }

    #[test]
    fn refetches_only_when_leaving_buffer() {
        let mut window = window(&[b'A'; 1000], 10, 20, 100);
        let chrom = Arc::from("chr1");
        window.ensure(&chrom, 50, 60).unwrap();
        assert_eq!(window.fetches(), 1);
        assert_eq!(window.bounds(), 20..170);

        window.ensure(&chrom, 100, 150).unwrap();
        assert_eq!(window.fetches(), 1);

        window.ensure(&chrom, 200, 210).unwrap();
        assert_eq!(window.fetches(), 2);
    }

    #[test]
    fn start_is_clamped_and_contig_end_does_not_thrash() {
        let mut window = window(b"ACGTACGT", 200, 1000, 1000);
        let chrom = Arc::from("chr1");
        window.ensure(&chrom, 0, 4).unwrap();
        window.ensure(&chrom, 4, 8).unwrap();
        assert_eq!(window.bounds(), 0..8);
        assert_eq!(window.fetches(), 1);
    }

    #[test]
    fn chromosome_change_refetches_and_uppercases() {
        let mut window = window(b"ACGTACGT", 2, 0, 0);
        window.ensure(&Arc::from("chr1"), 0, 4).unwrap();
        window.ensure(&Arc::from("chr2"), 0, 4).unwrap();
        assert_eq!(window.fetches(), 2);
        assert_eq!(window.base_at(0), b'T');
        assert_eq!(window.base_at(5), b'G');
    }

    #[test]
    fn unknown_contig_is_an_error() {
        let mut window = window(b"ACGT", 2, 0, 0);
        assert!(window.ensure(&Arc::from("chrZ"), 0, 1).is_err());
    }

    #[test]
    fn context_marks_site() {
        let mut window = window(b"AAAACGTTTT", 20, 0, 0);
        window.ensure(&Arc::from("chr1"), 0, 10).unwrap();

        let context = window.context(5, 3);
        assert_eq!(context.as_bytes(), b"AACMTTT");
        assert_eq!(context.upstream(), b"AAC");
        assert_eq!(context.downstream(), b"TTT");
        assert_eq!(context.to_string(), "AACMTTT");

        let edge = window.context(1, 3);
        assert_eq!(edge.as_bytes(), b"NNAMAAC");
    }
}
