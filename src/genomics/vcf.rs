use anyhow::{anyhow, Context, Result};
use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use super::{MoleculeClass, ReportHeader, VariantRecord, VariantReport};

const FILEFORMAT: &str = "##fileformat=VCFv4.3";
const SOURCE: &str = "##source=duplexcall";
const COLUMNS: &str = "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO";

const SUMMARY_FIELDS: [(&str, &str, &str); 5] = [
    ("MC", "Integer", "Distinct molecules supporting each allele"),
    ("STP", "Float", "Strand bias probability (two-sided Fisher exact test against the reference allele) for each allele"),
    ("PC", "Integer", "Positive parental strand observations for each allele"),
    ("NC", "Integer", "Negative parental strand observations for each allele"),
    ("VAF", "Float", "Fraction of molecules supporting each allele"),
];

fn write_header<W: Write>(writer: &mut W, header: &ReportHeader) -> Result<()> {
    writeln!(writer, "{FILEFORMAT}")?;
    writeln!(writer, "{SOURCE}")?;
    writeln!(writer, "##reference={}", header.reference)?;
    for contig in &header.contigs {
        writeln!(writer, "##contig=<ID={},length={}>", contig.name, contig.length)?;
    }
    for class in MoleculeClass::ALL {
        writeln!(
            writer,
            "##INFO=<ID={},Number=R,Type=Integer,Description=\"{}\">",
            class.tag(),
            class.description()
        )?;
    }
    for (id, kind, description) in SUMMARY_FIELDS {
        writeln!(
            writer,
            "##INFO=<ID={id},Number=R,Type={kind},Description=\"{description}\">"
        )?;
    }
    writeln!(writer, "{COLUMNS}")?;
    Ok(())
}

fn join<T>(alleles: &[usize], values: impl Fn(usize) -> T, render: impl Fn(T) -> String) -> String {
    alleles
        .iter()
        .map(|&index| render(values(index)))
        .collect::<Vec<_>>()
        .join(",")
}

fn info_column(record: &VariantRecord, alleles: &[usize]) -> String {
    let stats = &record.stats;
    let mut info = String::new();

    for class in MoleculeClass::ALL {
        let counts = join(alleles, |i| stats.class_count(class, i), |c| c.to_string());
        let _ = write!(info, "{}={};", class.tag(), counts);
    }

    let integer = |c: u32| c.to_string();
    let float = |v: f64| format!("{v:.4}");
    let _ = write!(
        info,
        "MC={};STP={};PC={};NC={};VAF={}",
        join(alleles, |i| stats.molecule_counts[i], integer),
        join(alleles, |i| stats.strand_bias[i], float),
        join(alleles, |i| stats.positive_counts[i], integer),
        join(alleles, |i| stats.negative_counts[i], integer),
        join(alleles, |i| stats.allele_fractions[i], float),
    );
    info
}

fn format_record(record: &VariantRecord) -> Result<String> {
    let reference_index = record
        .stats
        .reference_index()
        .ok_or_else(|| anyhow!("record at {}:{} has an ambiguous reference", record.chrom, record.position + 1))?;
    let alleles: Vec<usize> = std::iter::once(reference_index)
        .chain(record.stats.alternate_indices())
        .collect();
    let alternates: Vec<String> = record
        .alternates
        .iter()
        .map(|&base| (base as char).to_string())
        .collect();

    Ok(format!(
        "{chrom}\t{pos}\t.\t{ref_base}\t{alt_bases}\t{qual}\t.\t{info}\n",
        chrom = record.chrom,
        pos = record.position + 1,
        ref_base = record.reference as char,
        alt_bases = alternates.join(","),
        qual = record.stats.max_alt_quality,
        info = info_column(record, &alleles),
    ))
}

/// Write the header and records in VCF form.
pub fn write_vcf<W: Write>(writer: &mut W, header: &ReportHeader, records: &[VariantRecord]) -> Result<()> {
    write_header(writer, header)?;

    for record in records {
        writer.write_all(format_record(record)?.as_bytes())?;
    }

    writer.flush()?;
    Ok(())
}

/// Render a report into a VCF string (useful for tests and snapshots).
pub fn render_vcf(header: &ReportHeader, records: &[VariantRecord]) -> Result<String> {
    let mut buffer = Vec::new();
    write_vcf(&mut buffer, header, records)?;
    String::from_utf8(buffer).map_err(|_| anyhow!("rendered VCF is not valid UTF-8"))
}

/// Write a report to `path`.
///
/// The VCF is written to a `.partial` sibling and renamed into place once
/// complete, so an interrupted run never leaves a file that looks finished.
pub fn write_vcf_file(path: &Path, report: &VariantReport) -> Result<()> {
    let mut partial = path.as_os_str().to_owned();
    partial.push(".partial");
    let partial = PathBuf::from(partial);

    if let Err(err) = write_partial(&partial, report) {
        let _ = fs::remove_file(&partial);
        return Err(err);
    }
    fs::rename(&partial, path)
        .with_context(|| format!("failed to move {} into place", partial.display()))
}

fn write_partial(partial: &Path, report: &VariantReport) -> Result<()> {
    let file = File::create(partial)
        .with_context(|| format!("failed to create {}", partial.display()))?;
    let mut writer = BufWriter::new(file);
    write_vcf(&mut writer, &report.header, &report.records)?;
    writer.get_ref().sync_all()?;
    Ok(())
}
