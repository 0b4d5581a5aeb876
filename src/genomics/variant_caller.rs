use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, trace};

use crate::genomics::{
    is_non_reference, AlignedRead, CandidateIndex, CandidateVariant, ClassifiedStats, Contig,
    HomopolymerWindow, MoleculeName, Observation, PileupStore, Position, ReadNameError,
    ReferenceSource, ReferenceWindow, VariantSummarizer,
};
use crate::space::{SpaceProfile, SpaceTracker};
use crate::CallerConfig;

const PROGRESS_INTERVAL: u64 = 100_000;

/// Errors originating from variant calling.
#[derive(Debug, Error)]
pub enum CallerError {
    /// A read starts before its predecessor on the same chromosome.
    #[error(
        "input is not coordinate sorted: read '{read}' at {chrom}:{} follows a read at {chrom}:{}",
        .position + 1,
        .previous + 1
    )]
    UnsortedInput {
        /// Offending read name.
        read: String,
        /// Chromosome of both reads.
        chrom: String,
        /// 0-based start of the offending read.
        position: u64,
        /// 0-based start of the preceding read.
        previous: u64,
    },

    /// A read returns to a chromosome that was already completed.
    #[error("input is not coordinate sorted: read '{read}' returns to finished chromosome {chrom}")]
    ChromosomeRevisited {
        /// Offending read name.
        read: String,
        /// Chromosome seen again.
        chrom: String,
    },

    /// Read name does not encode a molecule identifier.
    #[error(
        "read name '{name}' is not a collapsed molecule name \
         (expected '<barcode>:<+|->:<family size>:<counter>', e.g. 'TAATGCATCTTGATTTGG:+:207:0'): {source}"
    )]
    MalformedReadName {
        /// Offending read name.
        name: String,
        /// Parsing failure.
        #[source]
        source: ReadNameError,
    },

    /// Per-molecule strand labels do not form a recognized class.
    #[error("unrecognized duplex label '{label}' for molecule '{molecule}' at {chrom}:{}", .position + 1)]
    UnrecognizedDuplexLabel {
        /// Chromosome of the site.
        chrom: String,
        /// 0-based coordinate of the site.
        position: u64,
        /// Molecule identifier.
        molecule: String,
        /// Concatenated label.
        label: String,
    },

    /// Reference lookup failed.
    #[error("reference error: {0}")]
    Reference(String),

    /// Configuration rejected at construction.
    #[error("invalid caller configuration: {0}")]
    InvalidConfiguration(String),

    /// Error propagated from htslib.
    #[error("htslib error: {0}")]
    Hts(#[from] rust_htslib::errors::Error),

    /// I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Counters describing a calling run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CallerStats {
    /// Records consumed from the stream.
    pub reads_processed: u64,
    /// Unmapped records and records without alignment operations.
    pub reads_unaligned: u64,
    /// Records skipped for carrying insertions or deletions.
    pub reads_with_indels: u64,
    /// Positions finalized.
    pub positions_evicted: u64,
    /// Positions with at least one non-reference allele.
    pub candidate_sites: u64,
    /// Candidate sites passing the summarizer.
    pub passing_sites: u64,
    /// Slices fetched from the reference.
    pub reference_fetches: u64,
    /// Most positions held at once.
    pub peak_live_positions: u64,
}

/// Context attached to a reported site for downstream filtering.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct VariantContext {
    /// Reference bases around the site.
    pub homopolymer: HomopolymerWindow,
    /// 0-based coordinates of candidate sites within the noise window.
    pub nearby_positions: Vec<u64>,
    /// Noise window used for linking.
    pub noise_window: u64,
}

/// Variant identified from streaming pileup analysis.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct VariantRecord {
    /// Chromosome/contig name.
    pub chrom: Arc<str>,
    /// Genomic coordinate (0-based).
    pub position: u64,
    /// Reference base.
    pub reference: u8,
    /// Alternate alleles supported by at least one molecule, in A/C/G/T order.
    pub alternates: Vec<u8>,
    /// Molecule-level statistics.
    pub stats: ClassifiedStats,
    /// Clustering and sequence context.
    pub context: VariantContext,
}

/// Reference identity and contigs described in the report header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportHeader {
    /// Reference identity (usually its path).
    pub reference: String,
    /// Reference contigs in order.
    pub contigs: Vec<Contig>,
}

/// Result of a complete calling run.
#[derive(Debug, Clone)]
pub struct VariantReport {
    /// Header information.
    pub header: ReportHeader,
    /// Passing sites in chromosome then coordinate order.
    pub records: Vec<VariantRecord>,
    /// Run counters.
    pub stats: CallerStats,
    /// Live-position profile (if enabled).
    pub space_profile: Option<SpaceProfile>,
}

#[derive(Debug)]
struct StreamCursor {
    chrom: Arc<str>,
    last_start: u64,
}

/// Single-pass, memory-bounded caller over a coordinate-sorted read stream.
#[derive(Debug)]
pub struct StreamingVariantCaller<R> {
    config: CallerConfig,
    window: ReferenceWindow<R>,
    pileup: PileupStore,
    candidates: CandidateIndex,
    summarizer: VariantSummarizer,
    cursor: Option<StreamCursor>,
    finished: HashSet<Arc<str>>,
    stats: CallerStats,
    space: SpaceTracker,
}

impl<R: ReferenceSource> StreamingVariantCaller<R> {
    /// Create a new caller over `reference`.
    pub fn new(reference: R, config: CallerConfig) -> Result<Self, CallerError> {
        config.validate()?;

        let context = config.retention_window + config.homopolymer_window as u64;
        let window = ReferenceWindow::new(
            reference,
            config.reference_buffer,
            context,
            config.reference_buffer + context,
        );

        info!(
            reference = window.source().identity(),
            min_depth = config.min_depth,
            min_alt_molecules = config.min_alt_molecules,
            retention_window = config.retention_window,
            "starting variant calling"
        );

        Ok(Self {
            summarizer: VariantSummarizer::new(&config),
            space: SpaceTracker::new(config.profile_space),
            config,
            window,
            pileup: PileupStore::new(),
            candidates: CandidateIndex::new(),
            cursor: None,
            finished: HashSet::new(),
            stats: CallerStats::default(),
        })
    }

    /// Counters accumulated so far.
    pub fn stats(&self) -> CallerStats {
        self.stats
    }

    /// Positions currently held by the pileup.
    pub fn live_positions(&self) -> usize {
        self.pileup.live_positions()
    }

    /// Candidate sites finalized so far.
    pub fn candidates(&self) -> &CandidateIndex {
        &self.candidates
    }

    /// Call variants from a batch of aligned reads.
    pub fn call_variants(self, reads: Vec<AlignedRead>) -> Result<VariantReport, CallerError> {
        self.call_stream(reads.into_iter().map(Ok))
    }

    /// Consume a whole read stream and produce the report.
    pub fn call_stream<I>(mut self, reads: I) -> Result<VariantReport, CallerError>
    where
        I: IntoIterator<Item = Result<AlignedRead, CallerError>>,
    {
        for read in reads {
            self.push_read(&read?)?;
        }
        self.finish()
    }

    /// Process one read.
    pub fn push_read(&mut self, read: &AlignedRead) -> Result<(), CallerError> {
        self.stats.reads_processed += 1;
        if self.stats.reads_processed % PROGRESS_INTERVAL == 0 {
            info!(
                reads = self.stats.reads_processed,
                chrom = read.chrom.as_ref(),
                position = read.pos + 1,
                live_positions = self.pileup.live_positions(),
                "reads processed"
            );
        }

        if read.is_unmapped || read.cigar.is_empty() {
            self.stats.reads_unaligned += 1;
            trace!(read = read.name.as_ref(), "skipping unaligned read");
            return Ok(());
        }

        self.advance(read)?;

        let molecule = MoleculeName::parse(&read.name).map_err(|source| {
            CallerError::MalformedReadName {
                name: read.name.to_string(),
                source,
            }
        })?;

        if read.has_indel() {
            self.stats.reads_with_indels += 1;
            trace!(read = read.name.as_ref(), "skipping read with indel");
            return Ok(());
        }

        self.deposit_read(read, &molecule);
        Ok(())
    }

    /// Finalize every remaining position and build the report.
    pub fn finish(mut self) -> Result<VariantReport, CallerError> {
        if let Some(cursor) = self.cursor.take() {
            self.flush_chromosome(&cursor.chrom)?;
        }

        let records: Vec<VariantRecord> = self
            .candidates
            .iter_ordered()
            .filter(|variant| variant.verdict.is_pass())
            .filter_map(|variant| self.record(variant))
            .collect();

        self.stats.reference_fetches = self.window.fetches() as u64;
        self.stats.peak_live_positions = self.space.max_space_used() as u64;

        info!(
            reads = self.stats.reads_processed,
            candidates = self.stats.candidate_sites,
            passing = records.len(),
            peak_live_positions = self.stats.peak_live_positions,
            "variant calling complete"
        );

        let header = ReportHeader {
            reference: self.window.source().identity().to_string(),
            contigs: self.window.source().contigs()?,
        };

        Ok(VariantReport {
            header,
            records,
            stats: self.stats,
            space_profile: self.space.take_profile(),
        })
    }

    /// Sort check, eviction of unreachable positions, reference refresh.
    fn advance(&mut self, read: &AlignedRead) -> Result<(), CallerError> {
        let previous = self
            .cursor
            .as_ref()
            .map(|cursor| (Arc::clone(&cursor.chrom), cursor.last_start));

        match previous {
            Some((chrom, last_start)) if chrom == read.chrom => {
                if read.pos < last_start {
                    return Err(CallerError::UnsortedInput {
                        read: read.name.to_string(),
                        chrom: chrom.to_string(),
                        position: read.pos,
                        previous: last_start,
                    });
                }
                if read.pos > last_start {
                    if let Some(through) = read.pos.checked_sub(self.config.retention_window) {
                        let evicted = self.pileup.evict_through(&chrom, through);
                        self.finalize(&chrom, evicted)?;
                    }
                }
            }
            Some((chrom, _)) => {
                if self.finished.contains(&read.chrom) {
                    return Err(CallerError::ChromosomeRevisited {
                        read: read.name.to_string(),
                        chrom: read.chrom.to_string(),
                    });
                }
                debug!(from = chrom.as_ref(), to = read.chrom.as_ref(), "chromosome transition");
                self.flush_chromosome(&chrom)?;
                self.finished.insert(chrom);
            }
            None => {}
        }

        self.cursor = Some(StreamCursor {
            chrom: Arc::clone(&read.chrom),
            last_start: read.pos,
        });
        self.window.ensure(&read.chrom, read.pos, read.end())
    }

    fn deposit_read(&mut self, read: &AlignedRead, molecule: &MoleculeName) {
        let pairs = read.aligned_pairs();
        let (start, end) = (read.pos, read.end());
        let mismatches = pairs
            .iter()
            .filter(|&&(coord, offset)| {
                read.base_at(offset)
                    .is_some_and(|base| is_non_reference(base, self.window.base_at(coord)))
            })
            .count() as u32;

        let before = self.pileup.live_positions();
        for (ordinal, &(coord, offset)) in pairs.iter().enumerate() {
            let Some(allele) = read.base_at(offset) else {
                continue;
            };
            let observation = Observation {
                allele: allele.to_ascii_uppercase(),
                quality: read.quality_at(offset).unwrap_or(0),
                family_size: molecule.family_size,
                is_positive_parent: molecule.is_positive_parent,
                map_strand: read.map_strand_at(ordinal),
                distance_to_end: (coord - start).min(end - coord),
                mapping_quality: read.mapq(),
                molecule_id: Arc::clone(&molecule.duplex_counter),
                read_mismatches: mismatches,
            };
            let window = &self.window;
            self.pileup
                .deposit(&read.chrom, coord, || window.base_at(coord), observation);
        }
        self.space.allocate(self.pileup.live_positions() - before);
    }

    fn flush_chromosome(&mut self, chrom: &Arc<str>) -> Result<(), CallerError> {
        let evicted = self.pileup.drain(chrom);
        self.finalize(chrom, evicted)
    }

    /// Link and summarize evicted positions carrying a non-reference allele;
    /// reference-matching positions are dropped.
    fn finalize(&mut self, chrom: &Arc<str>, evicted: Vec<(u64, Position)>) -> Result<(), CallerError> {
        if evicted.is_empty() {
            return Ok(());
        }
        self.space.free(evicted.len());
        self.stats.positions_evicted += evicted.len() as u64;

        for (coord, position) in evicted {
            if !position.has_alt() {
                continue;
            }

            let homopolymer = self.window.context(coord, self.config.homopolymer_window);
            let (verdict, stats) = self.summarizer.summarize(&position).map_err(|err| {
                CallerError::UnrecognizedDuplexLabel {
                    chrom: chrom.to_string(),
                    position: coord,
                    molecule: err.molecule.to_string(),
                    label: err.label,
                }
            })?;

            let mut candidate = CandidateVariant::new(
                Arc::clone(chrom),
                coord,
                position.reference(),
                homopolymer,
                self.config.noise_window,
            );
            candidate.verdict = verdict;
            candidate.stats = stats;

            self.stats.candidate_sites += 1;
            if verdict.is_pass() {
                self.stats.passing_sites += 1;
            } else {
                trace!(chrom = chrom.as_ref(), position = coord + 1, ?verdict, "candidate filtered");
            }
            self.candidates.insert(candidate);
        }
        Ok(())
    }

    fn record(&self, variant: &CandidateVariant) -> Option<VariantRecord> {
        let stats = variant.stats.clone()?;
        let alternates = stats
            .alternate_indices()
            .map(|index| crate::genomics::BASES[index])
            .collect();
        let mut nearby_positions: Vec<u64> = variant
            .nearby()
            .iter()
            .map(|&id| self.candidates.get(id).coord)
            .collect();
        nearby_positions.sort_unstable();

        Some(VariantRecord {
            chrom: Arc::clone(&variant.chrom),
            position: variant.coord,
            reference: variant.reference,
            alternates,
            stats,
            context: VariantContext {
                homopolymer: variant.homopolymer.clone(),
                nearby_positions,
                noise_window: variant.noise_window,
            },
        })
    }
}
