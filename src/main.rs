use std::io::{self, BufWriter};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use duplexcall::genomics::{write_vcf, write_vcf_file, BamReadSource, FastaReference};
use duplexcall::{CallerConfig, StrandBiasTable, StreamingVariantCaller};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "duplexcall", about = "Streaming duplex-aware SNV caller for collapsed UMI reads")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Call SNVs from a coordinate-sorted alignment file.
    Call(CallArgs),
}

#[derive(Args, Debug)]
struct CallArgs {
    /// Coordinate-sorted BAM/SAM/CRAM of collapsed reads.
    #[arg(short, long)]
    input: PathBuf,
    /// Indexed FASTA reference.
    #[arg(short, long)]
    reference: PathBuf,
    /// Output VCF path, or `-` for stdout.
    #[arg(short, long, default_value = "-")]
    output: PathBuf,
    /// Minimum distinct molecules at a site.
    #[arg(long, default_value_t = 3)]
    min_depth: u32,
    /// Minimum distinct molecules supporting non-reference alleles.
    #[arg(long, default_value_t = 2)]
    min_alt: u32,
    /// Family size at which a consensus read counts as strong.
    #[arg(long, default_value_t = 3)]
    strong_threshold: u32,
    /// Reference bases reported on each side of a site.
    #[arg(long, default_value_t = 5)]
    homopolymer_window: usize,
    /// Distance within which candidate sites are linked.
    #[arg(long, default_value_t = 150)]
    noise_window: u64,
    /// Distance behind the current read after which positions are finalized.
    #[arg(long, default_value_t = 1000)]
    retention_window: u64,
    /// Reference bases buffered around the active read.
    #[arg(long, default_value_t = 200)]
    reference_buffer: u64,
    /// Two-letter aux tag holding per-base mapping strands (F/R/S).
    #[arg(long)]
    strand_tag: Option<String>,
    /// Use the legacy strand-bias table, which pairs each allele's forward
    /// count with the reference reverse count.
    #[arg(long)]
    legacy_strand_bias: bool,
    /// Record a live-position timeline and log it on completion.
    #[arg(long)]
    profile_space: bool,
}

impl CallArgs {
    fn config(&self) -> CallerConfig {
        let table = if self.legacy_strand_bias {
            StrandBiasTable::Legacy
        } else {
            StrandBiasTable::ReferenceVsAllele
        };
        CallerConfig::default()
            .with_min_depth(self.min_depth)
            .with_min_alt_molecules(self.min_alt)
            .with_strong_molecule_threshold(self.strong_threshold)
            .with_homopolymer_window(self.homopolymer_window)
            .with_noise_window(self.noise_window)
            .with_retention_window(self.retention_window)
            .with_reference_buffer(self.reference_buffer)
            .with_strand_bias_table(table)
            .with_space_profiling(self.profile_space)
    }

    fn strand_tag(&self) -> Result<Option<[u8; 2]>> {
        match self.strand_tag.as_deref().map(str::as_bytes) {
            None => Ok(None),
            Some(&[a, b]) => Ok(Some([a, b])),
            Some(_) => bail!("strand tag must be exactly two characters"),
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Call(args) => run_call(&args),
    };

    if let Err(err) = result {
        error!("{err:#}");
        std::process::exit(1);
    }
}

fn run_call(args: &CallArgs) -> Result<()> {
    let config = args.config();
    let reference = FastaReference::from_path(&args.reference)
        .with_context(|| format!("failed to open reference {}", args.reference.display()))?;
    let reads = BamReadSource::from_path(&args.input, args.strand_tag()?)
        .with_context(|| format!("failed to open alignments {}", args.input.display()))?;

    let caller = StreamingVariantCaller::new(reference, config)
        .context("failed to initialize variant caller")?;
    let report = caller.call_stream(reads).context("variant calling failed")?;

    if let Some(profile) = &report.space_profile {
        info!("{}", profile.report());
    }

    if args.output.as_os_str() == "-" {
        let stdout = io::stdout();
        let mut writer = BufWriter::new(stdout.lock());
        write_vcf(&mut writer, &report.header, &report.records)?;
    } else {
        write_vcf_file(&args.output, &report)
            .with_context(|| format!("failed to write {}", args.output.display()))?;
    }

    info!(
        records = report.records.len(),
        reads = report.stats.reads_processed,
        skipped_indel_reads = report.stats.reads_with_indels,
        "report written"
    );
    Ok(())
}
