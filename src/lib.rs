//! # Streaming duplex-aware SNV calling
//!
//! This library turns a coordinate-sorted stream of collapsed, aligned reads
//! into molecule-level allele statistics and a VCF report, in a single pass
//! and in memory bounded by a retention window rather than by the input size.
//!
//! ## Core Algorithm
//!
//! 1. **Deposit**: every aligned base of a read lands in an ordered pileup,
//!    tagged with its molecule id, parental strand and family size
//! 2. **Evict**: positions that no future read can reach are finalized as the
//!    stream advances
//! 3. **Classify**: observations collapse per molecule into duplex/singleton
//!    classes with strand bias and allele fractions
//! 4. **Cluster**: candidate sites are linked to neighbours within a noise
//!    window and summarized against depth filters
//!
//! ## Usage Example
//!
//! ```ignore
//! use duplexcall::{CallerConfig, genomics::{FastaReference, BamReadSource, StreamingVariantCaller}};
//!
//! let reference = FastaReference::from_path("ref.fa")?;
//! let caller = StreamingVariantCaller::new(reference, CallerConfig::default())?;
//! let report = caller.call_stream(BamReadSource::from_path("sample.bam", None)?)?;
//! ```

#![warn(missing_docs, missing_debug_implementations)]
#![allow(clippy::new_without_default)]

pub mod genomics; // Read model, pileup, classification, report
pub mod space; // Live-position accounting

pub use genomics::{CallerError, StreamingVariantCaller, VariantReport};
pub use genomics::StrandBiasTable;

/// Parameters of a calling run, fixed at engine construction.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CallerConfig {
    /// Minimum distinct molecules at a site.
    pub min_depth: u32,

    /// Minimum distinct molecules supporting non-reference alleles.
    pub min_alt_molecules: u32,

    /// Family size at which a consensus read counts as strong.
    pub strong_molecule_threshold: u32,

    /// Reference bases captured on each side of a candidate site.
    pub homopolymer_window: usize,

    /// Distance upstream within which candidate sites are linked.
    pub noise_window: u64,

    /// Distance behind the current read start after which positions are
    /// finalized. Must exceed the longest read span.
    pub retention_window: u64,

    /// Reference bases buffered on each side of the active read.
    pub reference_buffer: u64,

    /// Contingency table used for strand bias.
    pub strand_bias_table: StrandBiasTable,

    /// Enable detailed live-position profiling.
    pub profile_space: bool,
}

impl Default for CallerConfig {
    fn default() -> Self {
        Self {
            min_depth: 3,
            min_alt_molecules: 2,
            strong_molecule_threshold: 3,
            homopolymer_window: 5,
            noise_window: 150,
            retention_window: 1000,
            reference_buffer: 200,
            strand_bias_table: StrandBiasTable::ReferenceVsAllele,
            profile_space: false,
        }
    }
}

impl CallerConfig {
    /// Set the minimum molecule depth.
    pub fn with_min_depth(mut self, min_depth: u32) -> Self {
        self.min_depth = min_depth;
        self
    }

    /// Set the minimum non-reference molecule count.
    pub fn with_min_alt_molecules(mut self, min_alt_molecules: u32) -> Self {
        self.min_alt_molecules = min_alt_molecules;
        self
    }

    /// Set the strong consensus family-size threshold.
    pub fn with_strong_molecule_threshold(mut self, threshold: u32) -> Self {
        self.strong_molecule_threshold = threshold;
        self
    }

    /// Set the homopolymer context flank.
    pub fn with_homopolymer_window(mut self, flank: usize) -> Self {
        self.homopolymer_window = flank;
        self
    }

    /// Set the noise window.
    pub fn with_noise_window(mut self, noise_window: u64) -> Self {
        self.noise_window = noise_window;
        self
    }

    /// Set the retention window.
    pub fn with_retention_window(mut self, retention_window: u64) -> Self {
        self.retention_window = retention_window;
        self
    }

    /// Set the reference buffer.
    pub fn with_reference_buffer(mut self, reference_buffer: u64) -> Self {
        self.reference_buffer = reference_buffer;
        self
    }

    /// Select the strand-bias contingency table.
    pub fn with_strand_bias_table(mut self, table: StrandBiasTable) -> Self {
        self.strand_bias_table = table;
        self
    }

    /// Enable space profiling.
    pub fn with_space_profiling(mut self, enabled: bool) -> Self {
        self.profile_space = enabled;
        self
    }

    /// Reject parameter combinations the engine cannot honour.
    pub fn validate(&self) -> Result<(), CallerError> {
        if self.retention_window == 0 {
            return Err(CallerError::InvalidConfiguration(
                "retention window must be > 0".to_string(),
            ));
        }
        if self.strong_molecule_threshold == 0 {
            return Err(CallerError::InvalidConfiguration(
                "strong molecule threshold must be >= 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Upper bound on positions held at once for reads no longer than
    /// `max_read_span`.
    pub fn live_position_bound(&self, max_read_span: u64) -> u64 {
        self.retention_window + max_read_span
    }
}
