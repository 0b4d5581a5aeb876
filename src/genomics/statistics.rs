//! Molecule-aware classification of a finalized pileup position.
//!
//! Every observation is typed by parental strand and consensus strength, then
//! collapsed per molecule and allele. A molecule read once is a singleton; a
//! molecule read from both parental strands is a duplex.

use std::collections::HashMap;
use std::sync::Arc;

use statrs::distribution::{Discrete, Hypergeometric};

use crate::genomics::{base_index, MapStrand, Position, NUM_BASES};

/// Consensus strength and parental strand of one observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrandType {
    /// Positive parent, family size at or above the strong threshold (`P`).
    StrongPositive,
    /// Positive parent below the strong threshold (`p`).
    WeakPositive,
    /// Negative parent at or above the strong threshold (`N`).
    StrongNegative,
    /// Negative parent below the strong threshold (`n`).
    WeakNegative,
}

impl StrandType {
    /// Type an observation.
    pub fn of(is_positive_parent: bool, family_size: u32, strong_threshold: u32) -> Self {
        let strong = family_size >= strong_threshold;
        match (is_positive_parent, strong) {
            (true, true) => Self::StrongPositive,
            (true, false) => Self::WeakPositive,
            (false, true) => Self::StrongNegative,
            (false, false) => Self::WeakNegative,
        }
    }

    /// One-letter label.
    pub fn symbol(self) -> char {
        match self {
            Self::StrongPositive => 'P',
            Self::WeakPositive => 'p',
            Self::StrongNegative => 'N',
            Self::WeakNegative => 'n',
        }
    }
}

/// Support class of one molecule for one allele.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum MoleculeClass {
    /// Duplex, strong positive and strong negative consensus (`DPN`).
    DuplexStrongStrong,
    /// Duplex, strong positive and weak negative consensus (`DPn`).
    DuplexStrongWeak,
    /// Duplex, weak positive and strong negative consensus (`DpN`).
    DuplexWeakStrong,
    /// Duplex, weak positive and weak negative consensus (`Dpn`).
    DuplexWeakWeak,
    /// Singleton, strong positive consensus (`SP`).
    SingletonStrongPositive,
    /// Singleton, weak positive consensus (`Sp`).
    SingletonWeakPositive,
    /// Singleton, strong negative consensus (`SN`).
    SingletonStrongNegative,
    /// Singleton, weak negative consensus (`Sn`).
    SingletonWeakNegative,
}

impl MoleculeClass {
    /// Number of classes.
    pub const COUNT: usize = 8;

    /// Every class in report order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::DuplexStrongStrong,
        Self::DuplexStrongWeak,
        Self::DuplexWeakStrong,
        Self::DuplexWeakWeak,
        Self::SingletonStrongPositive,
        Self::SingletonWeakPositive,
        Self::SingletonStrongNegative,
        Self::SingletonWeakNegative,
    ];

    /// Report tag.
    pub fn tag(self) -> &'static str {
        match self {
            Self::DuplexStrongStrong => "DPN",
            Self::DuplexStrongWeak => "DPn",
            Self::DuplexWeakStrong => "DpN",
            Self::DuplexWeakWeak => "Dpn",
            Self::SingletonStrongPositive => "SP",
            Self::SingletonWeakPositive => "Sp",
            Self::SingletonStrongNegative => "SN",
            Self::SingletonWeakNegative => "Sn",
        }
    }

    /// Report header description.
    pub fn description(self) -> &'static str {
        match self {
            Self::DuplexStrongStrong => "Duplex Support with Strong Positive and Strong Negative Consensus",
            Self::DuplexStrongWeak => "Duplex Support with Strong Positive and Weak Negative Consensus",
            Self::DuplexWeakStrong => "Duplex Support with Weak Positive and Strong Negative Consensus",
            Self::DuplexWeakWeak => "Duplex Support with Weak Positive and Weak Negative Consensus",
            Self::SingletonStrongPositive => "Singleton Support with Strong Positive Consensus",
            Self::SingletonWeakPositive => "Singleton Support with Weak Positive Consensus",
            Self::SingletonStrongNegative => "Singleton Support with Strong Negative Consensus",
            Self::SingletonWeakNegative => "Singleton Support with Weak Negative Consensus",
        }
    }

    /// Class of a concatenated per-molecule label, or `None` when the label is
    /// not one of the eight recognized forms.
    pub fn from_label(label: &[StrandType]) -> Option<Self> {
        use StrandType::*;
        let class = match label {
            [StrongPositive] => Self::SingletonStrongPositive,
            [WeakPositive] => Self::SingletonWeakPositive,
            [StrongNegative] => Self::SingletonStrongNegative,
            [WeakNegative] => Self::SingletonWeakNegative,
            [StrongPositive, StrongNegative] | [StrongNegative, StrongPositive] => Self::DuplexStrongStrong,
            [StrongPositive, WeakNegative] | [WeakNegative, StrongPositive] => Self::DuplexStrongWeak,
            [WeakPositive, StrongNegative] | [StrongNegative, WeakPositive] => Self::DuplexWeakStrong,
            [WeakPositive, WeakNegative] | [WeakNegative, WeakPositive] => Self::DuplexWeakWeak,
            _ => return None,
        };
        Some(class)
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Which 2x2 contingency table the strand-bias test evaluates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StrandBiasTable {
    /// `[[ref_fwd, ref_rev], [allele_fwd, allele_rev]]`.
    #[default]
    ReferenceVsAllele,
    /// `[[ref_fwd, ref_rev], [allele_fwd, ref_rev]]`, kept for compatibility
    /// with thresholds tuned on earlier releases.
    Legacy,
}

/// A molecule whose per-strand labels do not form a recognized class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplexLabelError {
    /// Molecule identifier.
    pub molecule: Arc<str>,
    /// Concatenated label, e.g. `PNP`.
    pub label: String,
}

/// Statistics computed once per finalized position, indexed by allele
/// (A, C, G, T).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ClassifiedStats {
    /// Reference base.
    pub reference: u8,
    /// Molecule counts per class and allele.
    pub class_counts: [[u32; NUM_BASES]; MoleculeClass::COUNT],
    /// Distinct molecules per allele.
    pub molecule_counts: [u32; NUM_BASES],
    /// Positive parental strand observations per allele.
    pub positive_counts: [u32; NUM_BASES],
    /// Negative parental strand observations per allele.
    pub negative_counts: [u32; NUM_BASES],
    /// Forward mapping-strand observations per allele.
    pub forward_counts: [u32; NUM_BASES],
    /// Reverse mapping-strand observations per allele.
    pub reverse_counts: [u32; NUM_BASES],
    /// Strand-bias probability per allele.
    pub strand_bias: [f64; NUM_BASES],
    /// Allele fraction per allele.
    pub allele_fractions: [f64; NUM_BASES],
    /// Distinct molecules over all alleles.
    pub depth: u32,
    /// Highest base quality among non-reference observations.
    pub max_alt_quality: u8,
}

impl ClassifiedStats {
    /// Molecules of `class` supporting allele `index`.
    pub fn class_count(&self, class: MoleculeClass, index: usize) -> u32 {
        self.class_counts[class.index()][index]
    }

    /// Index of the reference allele.
    pub fn reference_index(&self) -> Option<usize> {
        base_index(self.reference)
    }

    /// Distinct molecules supporting any non-reference allele.
    pub fn alt_molecules(&self) -> u32 {
        self.alternate_indices()
            .map(|index| self.molecule_counts[index])
            .sum()
    }

    /// Indices of non-reference alleles supported by at least one molecule.
    pub fn alternate_indices(&self) -> impl Iterator<Item = usize> + '_ {
        let reference = self.reference_index();
        (0..NUM_BASES).filter(move |&index| Some(index) != reference && self.molecule_counts[index] > 0)
    }
}

impl Position {
    /// Classify every observation at this position.
    ///
    /// Returns `Ok(None)` when the reference base is ambiguous or when no
    /// A/C/G/T observation contributed a molecule (zero depth).
    pub fn classify(
        &self,
        strong_threshold: u32,
        table: StrandBiasTable,
    ) -> Result<Option<ClassifiedStats>, DuplexLabelError> {
        let Some(ref_idx) = base_index(self.reference()) else {
            return Ok(None);
        };

        let mut molecule_counts = [0u32; NUM_BASES];
        let mut positive_counts = [0u32; NUM_BASES];
        let mut negative_counts = [0u32; NUM_BASES];
        let mut forward_counts = [0u32; NUM_BASES];
        let mut reverse_counts = [0u32; NUM_BASES];
        let mut max_alt_quality = 0u8;
        let mut depth = 0u32;
        let mut labels: HashMap<(Arc<str>, usize), Vec<StrandType>> = HashMap::new();

        for observation in self.observations() {
            let Some(idx) = base_index(observation.allele) else {
                continue;
            };

            if idx != ref_idx {
                max_alt_quality = max_alt_quality.max(observation.quality);
            }

            if observation.is_positive_parent {
                positive_counts[idx] += 1;
            } else {
                negative_counts[idx] += 1;
            }

            match observation.map_strand {
                MapStrand::Forward => forward_counts[idx] += 1,
                MapStrand::Reverse => reverse_counts[idx] += 1,
                MapStrand::Both => {
                    forward_counts[idx] += 1;
                    reverse_counts[idx] += 1;
                }
            }

            let strand_type = StrandType::of(
                observation.is_positive_parent,
                observation.family_size,
                strong_threshold,
            );
            labels
                .entry((Arc::clone(&observation.molecule_id), idx))
                .or_insert_with(|| {
                    molecule_counts[idx] += 1;
                    depth += 1;
                    Vec::with_capacity(2)
                })
                .push(strand_type);
        }

        if depth == 0 {
            return Ok(None);
        }

        let mut class_counts = [[0u32; NUM_BASES]; MoleculeClass::COUNT];
        for ((molecule, idx), label) in labels {
            let class = MoleculeClass::from_label(&label).ok_or_else(|| DuplexLabelError {
                molecule,
                label: label.iter().map(|t| t.symbol()).collect(),
            })?;
            class_counts[class.index()][idx] += 1;
        }

        let strand_bias = std::array::from_fn(|idx| {
            if forward_counts[idx] + reverse_counts[idx] == 0 {
                return 1.0;
            }
            let allele_reverse = match table {
                StrandBiasTable::ReferenceVsAllele => reverse_counts[idx],
                StrandBiasTable::Legacy => reverse_counts[ref_idx],
            };
            fisher_exact_two_sided([
                [forward_counts[ref_idx], reverse_counts[ref_idx]],
                [forward_counts[idx], allele_reverse],
            ])
        });

        let allele_fractions =
            std::array::from_fn(|idx| f64::from(molecule_counts[idx]) / f64::from(depth));

        Ok(Some(ClassifiedStats {
            reference: self.reference(),
            class_counts,
            molecule_counts,
            positive_counts,
            negative_counts,
            forward_counts,
            reverse_counts,
            strand_bias,
            allele_fractions,
            depth,
            max_alt_quality,
        }))
    }
}

/// Two-sided Fisher exact test on a 2x2 table.
///
/// Sums the hypergeometric probabilities of every table with the observed
/// margins that is no more likely than the observed one. An all-zero table
/// yields 1.0.
pub fn fisher_exact_two_sided(table: [[u32; 2]; 2]) -> f64 {
    let [[a, b], [c, d]] = table.map(|row| row.map(u64::from));
    let total = a + b + c + d;
    if total == 0 {
        return 1.0;
    }

    let row = a + b;
    let column = a + c;
    let Ok(distribution) = Hypergeometric::new(total, column, row) else {
        return 1.0;
    };

    // Log space: linear binomial coefficients overflow past a few hundred
    // observations per cell.
    let observed = distribution.ln_pmf(a);
    let lowest = (row + column).saturating_sub(total);
    let highest = row.min(column);
    let p_value: f64 = (lowest..=highest)
        .map(|k| distribution.ln_pmf(k))
        .filter(|&ln_p| ln_p <= observed + 1e-7)
        .map(f64::exp)
        .sum();
    p_value.min(1.0)
}
