use crate::genomics::{base_index, ClassifiedStats, DuplexLabelError, Position, StrandBiasTable};
use crate::CallerConfig;

/// Outcome of summarizing a candidate position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Verdict {
    /// Not summarized yet.
    Pending,
    /// Reference base is not A/C/G/T.
    AmbiguousReference,
    /// No A/C/G/T observation contributed a molecule.
    NoDepth,
    /// Fewer molecules than the minimum depth.
    LowDepth,
    /// Fewer non-reference molecules than the minimum.
    LowAltDepth,
    /// Passes every filter.
    Pass,
}

impl Verdict {
    /// Whether the site is reported.
    pub fn is_pass(self) -> bool {
        self == Self::Pass
    }
}

/// Depth and alternate-depth filter applied to finalized positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariantSummarizer {
    min_depth: u32,
    min_alt_depth: u32,
    strong_threshold: u32,
    strand_bias_table: StrandBiasTable,
}

impl VariantSummarizer {
    /// Build a summarizer from the caller configuration.
    pub fn new(config: &CallerConfig) -> Self {
        Self {
            min_depth: config.min_depth,
            min_alt_depth: config.min_alt_molecules,
            strong_threshold: config.strong_molecule_threshold,
            strand_bias_table: config.strand_bias_table,
        }
    }

    /// Classify `position` and decide whether it passes.
    pub fn summarize(
        &self,
        position: &Position,
    ) -> Result<(Verdict, Option<ClassifiedStats>), DuplexLabelError> {
        if base_index(position.reference()).is_none() {
            return Ok((Verdict::AmbiguousReference, None));
        }

        let Some(stats) = position.classify(self.strong_threshold, self.strand_bias_table)? else {
            return Ok((Verdict::NoDepth, None));
        };

        let verdict = if stats.depth < self.min_depth {
            Verdict::LowDepth
        } else if stats.alt_molecules() < self.min_alt_depth {
            Verdict::LowAltDepth
        } else {
            Verdict::Pass
        };
        Ok((verdict, Some(stats)))
    }
}
