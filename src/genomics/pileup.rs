use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::genomics::{base_index, MapStrand};

/// A single base observed at a pileup position.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    /// Observed base (uppercase ASCII).
    pub allele: u8,
    /// Base quality (Phred).
    pub quality: u8,
    /// Family size of the consensus read that contributed the base.
    pub family_size: u32,
    /// Whether the read derives from the positive parental strand.
    pub is_positive_parent: bool,
    /// Strand the base was sequenced from.
    pub map_strand: MapStrand,
    /// Distance to the closest end of the read's aligned span.
    pub distance_to_end: u64,
    /// Mapping quality of the contributing read.
    pub mapping_quality: u8,
    /// Molecule identifier (duplex counter) of the contributing read.
    pub molecule_id: Arc<str>,
    /// Number of non-reference bases carried by the contributing read.
    pub read_mismatches: u32,
}

/// Per-coordinate accumulator of every observation covering it.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    reference: u8,
    observations: Vec<Observation>,
    has_alt: bool,
}

impl Position {
    /// Create an empty position over `reference`.
    pub fn new(reference: u8) -> Self {
        Self {
            reference: reference.to_ascii_uppercase(),
            observations: Vec::new(),
            has_alt: false,
        }
    }

    /// Reference base at this coordinate.
    pub fn reference(&self) -> u8 {
        self.reference
    }

    /// Every observation in arrival order.
    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// Number of observations, including ambiguous bases.
    pub fn depth(&self) -> usize {
        self.observations.len()
    }

    /// Whether any A/C/G/T observation differs from the reference.
    pub fn has_alt(&self) -> bool {
        self.has_alt
    }

    /// Append an observation; returns whether it is a non-reference allele.
    pub fn add(&mut self, observation: Observation) -> bool {
        let is_alt = is_non_reference(observation.allele, self.reference);
        self.has_alt |= is_alt;
        self.observations.push(observation);
        is_alt
    }
}

/// Whether `allele` is a tallied base that differs from `reference`.
pub fn is_non_reference(allele: u8, reference: u8) -> bool {
    base_index(allele).is_some() && !allele.eq_ignore_ascii_case(&reference)
}

/// Ordered per-chromosome map from coordinate to [`Position`].
#[derive(Debug, Default)]
pub struct PileupStore {
    chromosomes: HashMap<Arc<str>, BTreeMap<u64, Position>>,
    live: usize,
}

impl PileupStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of positions currently held.
    pub fn live_positions(&self) -> usize {
        self.live
    }

    /// Whether the store holds no positions.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Position at `coord`, if present.
    pub fn get(&self, chrom: &str, coord: u64) -> Option<&Position> {
        self.chromosomes.get(chrom).and_then(|map| map.get(&coord))
    }

    /// Append an observation, creating the position over `reference` when it
    /// does not exist yet. Returns whether the observation is non-reference.
    pub fn deposit(
        &mut self,
        chrom: &Arc<str>,
        coord: u64,
        reference: impl FnOnce() -> u8,
        observation: Observation,
    ) -> bool {
        let positions = self.chromosomes.entry(Arc::clone(chrom)).or_default();
        let live = &mut self.live;
        positions
            .entry(coord)
            .or_insert_with(|| {
                *live += 1;
                Position::new(reference())
            })
            .add(observation)
    }

    /// Remove every position of `chrom` with coordinate `<= coord`, in
    /// ascending order.
    pub fn evict_through(&mut self, chrom: &str, coord: u64) -> Vec<(u64, Position)> {
        let Some(positions) = self.chromosomes.get_mut(chrom) else {
            return Vec::new();
        };
        let retained = match coord.checked_add(1) {
            Some(bound) => positions.split_off(&bound),
            None => BTreeMap::new(),
        };
        let evicted = std::mem::replace(positions, retained);
        self.live -= evicted.len();
        evicted.into_iter().collect()
    }

    /// Remove every position of `chrom`, in ascending order.
    pub fn drain(&mut self, chrom: &str) -> Vec<(u64, Position)> {
        let evicted = self.chromosomes.remove(chrom).unwrap_or_default();
        self.live -= evicted.len();
        evicted.into_iter().collect()
    }
}
