use rust_htslib::bam::record::{Aux, Cigar, Record};
use rust_htslib::bam::{self, Read};
use rust_htslib::faidx;
use std::path::Path;
use std::sync::Arc;
use tracing::trace;

use super::{AlignedRead, CallerError, CigarOp, CigarOpKind, Contig, ReferenceSource};

/// Coordinate-sorted BAM/SAM/CRAM input yielding [`AlignedRead`]s.
///
/// When `strand_tag` is set, every record's per-base originating strand is
/// read from that tag; records without it fall back to their orientation.
pub struct BamReadSource {
    reader: bam::Reader,
    record: Record,
    chroms: Vec<Arc<str>>,
    strand_tag: Option<[u8; 2]>,
}

impl std::fmt::Debug for BamReadSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BamReadSource")
            .field("chroms", &self.chroms.len())
            .field("strand_tag", &self.strand_tag)
            .finish()
    }
}

impl BamReadSource {
    /// Open an alignment file.
    pub fn from_path<P: AsRef<Path>>(path: P, strand_tag: Option<[u8; 2]>) -> Result<Self, CallerError> {
        let reader = bam::Reader::from_path(path)?;
        let chroms = reader
            .header()
            .target_names()
            .into_iter()
            .map(|name| Arc::from(String::from_utf8_lossy(name).as_ref()))
            .collect();

        Ok(Self {
            reader,
            record: Record::new(),
            chroms,
            strand_tag,
        })
    }

    fn convert(&self) -> AlignedRead {
        let record = &self.record;
        let name = String::from_utf8_lossy(record.qname()).into_owned();
        let chrom = usize::try_from(record.tid())
            .ok()
            .and_then(|tid| self.chroms.get(tid))
            .cloned();

        let Some(chrom) = chrom.filter(|_| !record.is_unmapped()) else {
            return AlignedRead::new(name, "*", 0, 0, Vec::new(), Vec::new(), Vec::new(), false).unmapped();
        };

        let cigar = record.cigar().iter().map(convert_cigar).collect();
        let read = AlignedRead::new(
            name,
            chrom,
            record.pos().max(0) as u64,
            record.mapq(),
            cigar,
            record.seq().as_bytes(),
            record.qual().to_vec(),
            record.is_reverse(),
        );

        match self.strand_tag.as_ref().map(|tag| record.aux(tag)) {
            Some(Ok(Aux::String(tags))) => read.with_strand_tags(tags.as_bytes().to_vec()),
            Some(Ok(_)) => {
                trace!(read = read.name.as_ref(), "strand tag is not a string, using orientation");
                read
            }
            _ => read,
        }
    }
}

fn convert_cigar(op: &Cigar) -> CigarOp {
    let (kind, len) = match *op {
        Cigar::Match(len) => (CigarOpKind::Match, len),
        Cigar::Equal(len) => (CigarOpKind::Equal, len),
        Cigar::Diff(len) => (CigarOpKind::Diff, len),
        Cigar::Ins(len) => (CigarOpKind::Insertion, len),
        Cigar::Del(len) => (CigarOpKind::Deletion, len),
        Cigar::RefSkip(len) => (CigarOpKind::RefSkip, len),
        Cigar::SoftClip(len) => (CigarOpKind::SoftClip, len),
        Cigar::HardClip(len) => (CigarOpKind::HardClip, len),
        Cigar::Pad(len) => (CigarOpKind::Pad, len),
    };
    CigarOp::new(kind, len)
}

impl Iterator for BamReadSource {
    type Item = Result<AlignedRead, CallerError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.reader.read(&mut self.record)? {
            Ok(()) => Some(Ok(self.convert())),
            Err(err) => Some(Err(err.into())),
        }
    }
}

/// Indexed FASTA reference (`.fai` alongside the file).
pub struct FastaReference {
    reader: faidx::Reader,
    identity: String,
    contigs: Vec<Contig>,
}

impl std::fmt::Debug for FastaReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastaReference")
            .field("identity", &self.identity)
            .field("contigs", &self.contigs.len())
            .finish()
    }
}

impl FastaReference {
    /// Open an indexed FASTA file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, CallerError> {
        let path = path.as_ref();
        let reader = faidx::Reader::from_path(path)?;
        let contigs = reader
            .seq_names()?
            .into_iter()
            .map(|name| {
                let length = reader.fetch_seq_len(&name);
                Contig {
                    name: Arc::from(name),
                    length,
                }
            })
            .collect();

        Ok(Self {
            reader,
            identity: path.display().to_string(),
            contigs,
        })
    }
}

impl ReferenceSource for FastaReference {
    fn identity(&self) -> &str {
        &self.identity
    }

    fn contigs(&self) -> Result<Vec<Contig>, CallerError> {
        Ok(self.contigs.clone())
    }

    fn contig_len(&self, chrom: &str) -> Result<u64, CallerError> {
        self.contigs
            .iter()
            .find(|contig| contig.name.as_ref() == chrom)
            .map(|contig| contig.length)
            .ok_or_else(|| CallerError::Reference(format!("contig '{chrom}' is not in {}", self.identity)))
    }

    fn fetch(&self, chrom: &str, start: u64, end: u64) -> Result<Vec<u8>, CallerError> {
        if start >= end {
            return Ok(Vec::new());
        }
        let bases = self
            .reader
            .fetch_seq(chrom, start as usize, end as usize - 1)
            .map_err(|err| CallerError::Reference(format!("failed to fetch {chrom}:{}-{end}: {err}", start + 1)))?;
        Ok(bases.to_vec())
    }
}
