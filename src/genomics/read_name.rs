//! Decoding of the molecule identifier embedded in consensus read names.
//!
//! Collapsed reads are named `<barcode>:<+|->:<family size>:<duplex counter>`,
//! e.g. `TAATGCATCTTGATTTGGTTGCGAGTTGCAAT:+:207:0`. The duplex counter is shared
//! by the two strands of one original molecule.

use std::sync::Arc;

use thiserror::Error;

const FIELD_COUNT: usize = 4;

/// Reasons a read name does not follow the molecule naming scheme.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadNameError {
    /// Wrong number of colon-delimited fields.
    #[error("expected {FIELD_COUNT} colon-delimited fields, found {0}")]
    FieldCount(usize),
    /// Parental strand field is neither `+` nor `-`.
    #[error("parental strand must be '+' or '-', found '{0}'")]
    ParentalStrand(String),
    /// Family size field is not a positive integer.
    #[error("family size must be a positive integer, found '{0}'")]
    FamilySize(String),
    /// Duplex counter field is empty.
    #[error("duplex counter is empty")]
    EmptyCounter,
}

/// Fields decoded from a read name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoleculeName {
    /// Adapter barcode of the molecule.
    pub barcode: Arc<str>,
    /// Whether the read derives from the positive parental strand.
    pub is_positive_parent: bool,
    /// Number of raw reads collapsed into this consensus read.
    pub family_size: u32,
    /// Counter shared by both strands of one molecule; used as the molecule id.
    pub duplex_counter: Arc<str>,
}

impl MoleculeName {
    /// Parse a read name.
    pub fn parse(name: &str) -> Result<Self, ReadNameError> {
        let fields: Vec<&str> = name.split(':').collect();
        let [barcode, strand, family_size, counter] = fields[..] else {
            return Err(ReadNameError::FieldCount(fields.len()));
        };

        let is_positive_parent = match strand {
            "+" => true,
            "-" => false,
            other => return Err(ReadNameError::ParentalStrand(other.to_string())),
        };

        let family_size = family_size
            .parse::<u32>()
            .ok()
            .filter(|&size| size >= 1)
            .ok_or_else(|| ReadNameError::FamilySize(family_size.to_string()))?;

        if counter.is_empty() {
            return Err(ReadNameError::EmptyCounter);
        }

        Ok(Self {
            barcode: Arc::from(barcode),
            is_positive_parent,
            family_size,
            duplex_counter: Arc::from(counter),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn parses_well_formed_name() {
        let name = MoleculeName::parse("TAATGCATCTTGATTTGGTTGCGAGTTGCAAT:+:207:0").unwrap();
        assert_eq!(name.barcode.as_ref(), "TAATGCATCTTGATTTGGTTGCGAGTTGCAAT");
        assert!(name.is_positive_parent);
        assert_eq!(name.family_size, 207);
        assert_eq!(name.duplex_counter.as_ref(), "0");
    }

    #[test]
    fn negative_parent() {
        let name = MoleculeName::parse("ACGT:-:1:42").unwrap();
        assert!(!name.is_positive_parent);
        assert_eq!(name.family_size, 1);
    }

    #[test_case("ACGT:+:3", ReadNameError::FieldCount(3); "three fields")]
    #[test_case("ACGT:+:3:1:9", ReadNameError::FieldCount(5); "five fields")]
    #[test_case("read_1", ReadNameError::FieldCount(1); "plain name")]
    #[test_case("ACGT:x:3:1", ReadNameError::ParentalStrand("x".into()); "bad strand")]
    #[test_case("ACGT:+:three:1", ReadNameError::FamilySize("three".into()); "non numeric family")]
    #[test_case("ACGT:+:0:1", ReadNameError::FamilySize("0".into()); "zero family")]
    #[test_case("ACGT:-:2:", ReadNameError::EmptyCounter; "empty counter")]
    fn rejects_malformed_names(name: &str, expected: ReadNameError) {
        assert_eq!(MoleculeName::parse(name), Err(expected));
    }
}
