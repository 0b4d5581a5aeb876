use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::genomics::{ClassifiedStats, HomopolymerWindow, Verdict};

/// Handle of a variant inside a [`CandidateIndex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VariantId(usize);

/// A finalized position carrying at least one non-reference allele.
///
/// Observations are not kept; the site is summarized before it is recorded.
#[derive(Debug, Clone)]
pub struct CandidateVariant {
    /// Chromosome of the site.
    pub chrom: Arc<str>,
    /// 0-based coordinate of the site.
    pub coord: u64,
    /// Reference base at the site.
    pub reference: u8,
    /// Reference context around the site.
    pub homopolymer: HomopolymerWindow,
    /// Distance upstream searched for neighbours.
    pub noise_window: u64,
    /// Summarizer outcome.
    pub verdict: Verdict,
    /// Statistics, when the position could be classified.
    pub stats: Option<ClassifiedStats>,
    nearby: Vec<VariantId>,
}

impl CandidateVariant {
    /// Create an unlinked candidate.
    pub fn new(
        chrom: Arc<str>,
        coord: u64,
        reference: u8,
        homopolymer: HomopolymerWindow,
        noise_window: u64,
    ) -> Self {
        Self {
            chrom,
            coord,
            reference,
            homopolymer,
            noise_window,
            verdict: Verdict::Pending,
            stats: None,
            nearby: Vec::new(),
        }
    }

    /// Variants within the noise window of this one, in link order.
    pub fn nearby(&self) -> &[VariantId] {
        &self.nearby
    }
}

/// Arena of candidate variants with an ordered per-chromosome index.
#[derive(Debug, Default)]
pub struct CandidateIndex {
    arena: Vec<CandidateVariant>,
    by_chrom: HashMap<Arc<str>, BTreeMap<u64, VariantId>>,
    chrom_order: Vec<Arc<str>>,
}

impl CandidateIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded variants.
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    /// Whether no variant has been recorded.
    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Variant behind a handle.
    pub fn get(&self, id: VariantId) -> &CandidateVariant {
        &self.arena[id.0]
    }

    /// Link `variant` to every recorded variant of its chromosome within
    /// `noise_window` bases upstream (both directions), then record it.
    pub fn insert(&mut self, mut variant: CandidateVariant) -> VariantId {
        let id = VariantId(self.arena.len());
        let chrom = Arc::clone(&variant.chrom);
        if !self.by_chrom.contains_key(&chrom) {
            self.chrom_order.push(Arc::clone(&chrom));
        }
        let sites = self.by_chrom.entry(chrom).or_default();

        let lowest = variant.coord.saturating_sub(variant.noise_window);
        for (_, &neighbour) in sites.range(lowest..variant.coord) {
            self.arena[neighbour.0].nearby.push(id);
            variant.nearby.push(neighbour);
        }

        sites.insert(variant.coord, id);
        self.arena.push(variant);
        id
    }

    /// Every variant in chromosome (first seen) then coordinate order.
    pub fn iter_ordered(&self) -> impl Iterator<Item = &CandidateVariant> + '_ {
        self.chrom_order
            .iter()
            .filter_map(|chrom| self.by_chrom.get(chrom))
            .flat_map(|sites| sites.values())
            .map(|&id| self.get(id))
    }
}
