//! Attack arcs derived from a batch of threat records

use super::places::{normalize_code, ReferenceTable};
use super::projection::GeoPoint;
use crate::feed::ThreatRecord;
use rand::seq::SliceRandom;
use rand::Rng;

/// A directed origin -> destination connection with its pulse offset.
#[derive(Clone, Debug, PartialEq)]
pub struct ThreatArc {
    pub start: GeoPoint,
    pub end: GeoPoint,
    /// Starting offset of the pulse along the curve, in [0, 1).
    pub phase: f32,
    pub origin_code: String,
    pub destination_code: String,
    pub confidence: u8,
}

/// Build one arc per record.
///
/// The reference codes are shuffled once per call; every record targets the
/// first shuffled code that differs from its own, or the table's default
/// destination when nothing else is left.
pub fn generate_arcs<R: Rng>(
    records: &[ThreatRecord],
    table: &ReferenceTable,
    rng: &mut R,
) -> Vec<ThreatArc> {
    if records.is_empty() {
        return Vec::new();
    }

    let mut candidates: Vec<&str> = table.codes().collect();
    candidates.shuffle(rng);

    records
        .iter()
        .map(|record| {
            let origin_code = normalize_code(&record.country_code);
            let destination_code = candidates
                .iter()
                .find(|&&code| code != origin_code)
                .copied()
                .unwrap_or_else(|| table.default_code())
                .to_string();

            ThreatArc {
                start: table.resolve(&origin_code),
                end: table.resolve(&destination_code),
                phase: rng.gen_range(0.0..1.0),
                origin_code,
                destination_code,
                confidence: record.confidence,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::globe::places::SENTINEL;
    use chrono::{DateTime, Utc};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn record(code: &str, confidence: u32) -> ThreatRecord {
        ThreatRecord::new("203.0.113.7", code, confidence, DateTime::<Utc>::UNIX_EPOCH)
    }

    fn two_point_table() -> ReferenceTable {
        ReferenceTable::new(
            vec![
                ("US".to_string(), GeoPoint::new(39.8, -98.6)),
                ("IN".to_string(), GeoPoint::new(20.6, 78.9)),
            ],
            "US",
        )
    }

    #[test]
    fn empty_records_give_no_arcs() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(generate_arcs(&[], &ReferenceTable::builtin(), &mut rng).is_empty());
    }

    #[test]
    fn destination_never_matches_origin() {
        let table = ReferenceTable::builtin();
        let codes: Vec<String> = table.codes().map(str::to_string).collect();
        let records: Vec<_> = codes.iter().map(|c| record(c, 80)).collect();

        for seed in 0..25 {
            let mut rng = StdRng::seed_from_u64(seed);
            for arc in generate_arcs(&records, &table, &mut rng) {
                assert_ne!(arc.origin_code, arc.destination_code);
                assert!((0.0..1.0).contains(&arc.phase));
            }
        }
    }

    #[test]
    fn single_entry_table_falls_back_to_default() {
        let table = ReferenceTable::new(vec![("DE".to_string(), GeoPoint::new(51.2, 10.5))], "DE");
        let mut rng = StdRng::seed_from_u64(3);
        let arcs = generate_arcs(&[record("DE", 50), record("FR", 50)], &table, &mut rng);
        assert_eq!(arcs[0].destination_code, "DE");
        assert_eq!(arcs[1].destination_code, "DE");
        // FR is not in the table
        assert_eq!(arcs[1].start, SENTINEL);
    }

    #[test]
    fn unknown_codes_use_sentinel_and_are_kept() {
        let mut rng = StdRng::seed_from_u64(11);
        let arcs = generate_arcs(
            &[record("US", 90), record("IN", 40), record("??", 100)],
            &two_point_table(),
            &mut rng,
        );
        assert_eq!(arcs.len(), 3);
        assert_eq!(arcs[2].start, SENTINEL);
        assert_eq!(arcs[0].destination_code, "IN");
        assert_eq!(arcs[1].destination_code, "US");
        assert_eq!(arcs[2].confidence, 100);
    }

    #[test]
    fn same_seed_same_arcs() {
        let table = ReferenceTable::builtin();
        let records = vec![record("CN", 99), record("RU", 95), record("BR", 91)];
        let a = generate_arcs(&records, &table, &mut StdRng::seed_from_u64(42));
        let b = generate_arcs(&records, &table, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }
}
