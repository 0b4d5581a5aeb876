//! Genomics components of the streaming caller.
//!
//! Leaves first: read model and name decoding, the buffered reference window,
//! the pileup store, molecule classification, candidate clustering, the
//! summarizer, and the engine that drives them. `vcf` renders the report and
//! `io` adapts htslib readers to the engine's seams.

mod types;
mod read_name;
mod reference;
mod pileup;
mod statistics;
mod candidates;
mod summarizer;
mod variant_caller;
mod vcf;
mod io;

pub use types::{base_index, AlignedRead, CigarOp, CigarOpKind, MapStrand, BASES, NUM_BASES};
pub use read_name::{MoleculeName, ReadNameError};
pub use reference::{
    Contig, HomopolymerWindow, InMemoryReference, ReferenceSource, ReferenceWindow, SITE_MARKER,
    UNKNOWN_BASE,
};
pub use pileup::{is_non_reference, Observation, PileupStore, Position};
pub use statistics::{
    fisher_exact_two_sided, ClassifiedStats, DuplexLabelError, MoleculeClass, StrandBiasTable,
    StrandType,
};
pub use candidates::{CandidateIndex, CandidateVariant, VariantId};
pub use summarizer::{Verdict, VariantSummarizer};
pub use variant_caller::{
    CallerError, CallerStats, ReportHeader, StreamingVariantCaller, VariantContext, VariantRecord,
    VariantReport,
};
pub use vcf::{render_vcf, write_vcf, write_vcf_file};
pub use io::{BamReadSource, FastaReference};
