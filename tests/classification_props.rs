#[path = "common/mod.rs"]
mod common;

use std::collections::HashMap;
use std::sync::Arc;

use common::{matched_read, molecule_name};
use duplexcall::genomics::{
    render_vcf, AlignedRead, InMemoryReference, MapStrand, MoleculeClass, Observation, Position,
    StrandBiasTable, BASES,
};
use duplexcall::{CallerConfig, StreamingVariantCaller};
use proptest::prelude::*;

/// (allele, parental strands present: 1 = +, 2 = -, 3 = both, positive
/// family size, negative family size, negative observed first)
type Molecule = (usize, u8, u32, u32, bool);

fn molecules() -> impl Strategy<Value = Vec<Molecule>> {
    proptest::collection::vec((0usize..4, 1u8..=3, 1u32..6, 1u32..6, any::<bool>()), 1..24)
}

fn observation(allele: usize, counter: usize, positive: bool, family_size: u32) -> Observation {
    Observation {
        allele: BASES[allele],
        quality: 20 + counter as u8 % 20,
        family_size,
        is_positive_parent: positive,
        map_strand: if positive { MapStrand::Forward } else { MapStrand::Reverse },
        distance_to_end: 3,
        mapping_quality: 60,
        molecule_id: Arc::from(counter.to_string()),
        read_mismatches: 1,
    }
}

fn observations(molecules: &[Molecule]) -> Vec<Observation> {
    let mut out = Vec::new();
    for (counter, &(allele, strands, positive_family, negative_family, negative_first)) in
        molecules.iter().enumerate()
    {
        let mut pair = Vec::with_capacity(2);
        if strands & 1 != 0 {
            pair.push(observation(allele, counter, true, positive_family));
        }
        if strands & 2 != 0 {
            pair.push(observation(allele, counter, false, negative_family));
        }
        if negative_first {
            pair.reverse();
        }
        out.extend(pair);
    }
    out
}

fn position(observations: impl IntoIterator<Item = Observation>) -> Position {
    let mut position = Position::new(b'G');
    for observation in observations {
        position.add(observation);
    }
    position
}

/// (gap to previous start, length, bases, positive parent, family size)
type SyntheticRead = (u64, usize, Vec<u8>, bool, u32);

fn synthetic_reads() -> impl Strategy<Value = Vec<SyntheticRead>> {
    proptest::collection::vec(
        (
            0u64..4,
            1usize..=8,
            proptest::collection::vec(prop_oneof![Just(b'A'), Just(b'C'), Just(b'G'), Just(b'T')], 8),
            any::<bool>(),
            1u32..5,
        ),
        1..40,
    )
}

fn build_reads(layout: &[SyntheticRead]) -> Vec<AlignedRead> {
    let mut start = 0u64;
    layout.iter()
        .enumerate()
        .map(|(counter, (gap, len, bases, positive, family))| {
            start += gap;
            let name = molecule_name("PROP", *positive, *family, counter as u64);
            matched_read(&name, "chr1", start, &bases[..*len], !positive)
        })
        .collect()
}

fn cycle_reference() -> InMemoryReference {
    let contig: Vec<u8> = b"ACGT".iter().copied().cycle().take(256).collect();
    InMemoryReference::new("cycle.fa").with_contig("chr1", contig)
}

proptest! {
    #[test]
    fn class_counts_sum_to_molecule_counts(molecules in molecules(), threshold in 1u32..6) {
        let stats = position(observations(&molecules))
            .classify(threshold, StrandBiasTable::ReferenceVsAllele)
            .expect("every generated label is recognized")
            .expect("reference is unambiguous and depth is positive");

        for allele in 0..BASES.len() {
            let classified: u32 = MoleculeClass::ALL
                .iter()
                .map(|&class| stats.class_count(class, allele))
                .sum();
            prop_assert_eq!(classified, stats.molecule_counts[allele]);
        }
        prop_assert_eq!(stats.depth as usize, molecules.len());

        let vaf_total: f64 = stats.allele_fractions.iter().sum();
        prop_assert!((vaf_total - 1.0).abs() < 1e-9);
        for (fraction, bias) in stats.allele_fractions.iter().zip(stats.strand_bias) {
            prop_assert!((0.0..=1.0).contains(fraction));
            prop_assert!((0.0..=1.0 + 1e-9).contains(&bias));
        }
    }

    #[test]
    fn classification_ignores_arrival_order(molecules in molecules(), threshold in 1u32..6) {
        let forward = observations(&molecules);
        let reversed: Vec<Observation> = forward.iter().rev().cloned().collect();

        let expected = position(forward).classify(threshold, StrandBiasTable::ReferenceVsAllele);
        let actual = position(reversed).classify(threshold, StrandBiasTable::ReferenceVsAllele);
        prop_assert_eq!(expected, actual);
    }

    #[test]
    fn short_retention_matches_unbounded_retention(layout in synthetic_reads()) {
        let config = CallerConfig::default()
            .with_min_depth(1)
            .with_min_alt_molecules(1)
            .with_noise_window(20);

        let bounded = StreamingVariantCaller::new(cycle_reference(), config.clone().with_retention_window(8))
            .expect("caller initialises")
            .call_variants(build_reads(&layout))
            .expect("variant calling succeeds");
        let unbounded = StreamingVariantCaller::new(cycle_reference(), config.with_retention_window(100_000))
            .expect("caller initialises")
            .call_variants(build_reads(&layout))
            .expect("variant calling succeeds");

        prop_assert_eq!(
            render_vcf(&bounded.header, &bounded.records).expect("rendering succeeds"),
            render_vcf(&unbounded.header, &unbounded.records).expect("rendering succeeds")
        );
        prop_assert!(bounded.stats.peak_live_positions <= unbounded.stats.peak_live_positions);
    }

    #[test]
    fn nearby_links_are_symmetric(layout in synthetic_reads(), noise_window in 1u64..30) {
        let config = CallerConfig::default()
            .with_min_depth(1)
            .with_min_alt_molecules(1)
            .with_noise_window(noise_window)
            .with_retention_window(8);
        let report = StreamingVariantCaller::new(cycle_reference(), config)
            .expect("caller initialises")
            .call_variants(build_reads(&layout))
            .expect("variant calling succeeds");

        let by_position: HashMap<u64, &Vec<u64>> = report
            .records
            .iter()
            .map(|record| (record.position, &record.context.nearby_positions))
            .collect();

        for record in &report.records {
            for &neighbour in &record.context.nearby_positions {
                prop_assert!(neighbour != record.position);
                prop_assert!(neighbour.abs_diff(record.position) <= noise_window);
                let back = by_position.get(&neighbour).expect("every candidate passes");
                prop_assert!(back.contains(&record.position));
            }
        }
    }
}
