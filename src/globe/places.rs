//! Country code to coordinate lookup used to place threat origins

use super::projection::GeoPoint;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Placeholder code for records without a usable country.
pub const UNKNOWN_CODE: &str = "??";

/// Where unknown or unmapped countries land.
pub const SENTINEL: GeoPoint = GeoPoint { lat: 0.0, lon: 0.0 };

/// Destination used when no other reference point is available.
pub const DEFAULT_DESTINATION: &str = "US";

// Representative points for countries that show up most in abuse feeds
static BUILTIN_POINTS: LazyLock<Vec<(&'static str, f32, f32)>> = LazyLock::new(|| vec![
    ("US", 39.8, -98.6),   ("CA", 56.1, -106.3),  ("MX", 23.6, -102.6),
    ("BR", -14.2, -51.9),  ("AR", -38.4, -63.6),  ("CO", 4.6, -74.3),
    ("CL", -35.7, -71.5),  ("GB", 55.4, -3.4),    ("FR", 46.2, 2.2),
    ("DE", 51.2, 10.5),    ("NL", 52.1, 5.3),     ("ES", 40.5, -3.7),
    ("IT", 41.9, 12.6),    ("SE", 60.1, 18.6),    ("PL", 51.9, 19.1),
    ("LT", 55.2, 23.9),    ("UA", 48.4, 31.2),    ("RO", 45.9, 25.0),
    ("BG", 42.7, 25.5),    ("TR", 39.0, 35.2),    ("RU", 61.5, 105.3),
    ("KZ", 48.0, 66.9),    ("IR", 32.4, 53.7),    ("IL", 31.0, 34.9),
    ("AE", 23.4, 53.8),    ("EG", 26.8, 30.8),    ("NG", 9.1, 8.7),
    ("ZA", -30.6, 22.9),   ("SC", -4.7, 55.5),    ("PK", 30.4, 69.3),
    ("IN", 20.6, 78.9),    ("BD", 23.7, 90.4),    ("CN", 35.9, 104.2),
    ("HK", 22.3, 114.2),   ("TW", 23.7, 121.0),   ("KR", 35.9, 127.8),
    ("JP", 36.2, 138.3),   ("VN", 14.1, 108.3),   ("TH", 15.9, 101.0),
    ("MY", 4.2, 102.0),    ("SG", 1.4, 103.8),    ("PH", 12.9, 121.8),
    ("ID", -0.8, 113.9),   ("AU", -25.3, 133.8),
]);

/// Normalize a raw feed country code: trimmed, upper-case, two ASCII
/// letters, otherwise [`UNKNOWN_CODE`].
pub fn normalize_code(raw: &str) -> String {
    let code = raw.trim();
    if code.len() == 2 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        code.to_ascii_uppercase()
    } else {
        UNKNOWN_CODE.to_string()
    }
}

/// Immutable, ordered table of reference points.
#[derive(Debug, Clone)]
pub struct ReferenceTable {
    entries: Vec<(String, GeoPoint)>,
    index: HashMap<String, usize>,
    default_code: String,
}

impl ReferenceTable {
    pub fn new(entries: Vec<(String, GeoPoint)>, default_code: &str) -> Self {
        let mut deduped: Vec<(String, GeoPoint)> = Vec::with_capacity(entries.len());
        let mut index = HashMap::with_capacity(entries.len());
        for (code, point) in entries {
            let code = normalize_code(&code);
            if code == UNKNOWN_CODE || index.contains_key(&code) {
                continue;
            }
            index.insert(code.clone(), deduped.len());
            deduped.push((code, point));
        }

        Self {
            entries: deduped,
            index,
            default_code: normalize_code(default_code),
        }
    }

    /// The built-in country table.
    pub fn builtin() -> Self {
        let entries = BUILTIN_POINTS
            .iter()
            .map(|&(code, lat, lon)| (code.to_string(), GeoPoint::new(lat, lon)))
            .collect();
        Self::new(entries, DEFAULT_DESTINATION)
    }

    pub fn get(&self, code: &str) -> Option<GeoPoint> {
        self.index.get(code).map(|&i| self.entries[i].1)
    }

    /// Look up a code, falling back to the sentinel point.
    pub fn resolve(&self, code: &str) -> GeoPoint {
        self.get(code).unwrap_or(SENTINEL)
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(code, _)| code.as_str())
    }

    pub fn default_code(&self) -> &str {
        &self.default_code
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_accepts_two_letters() {
        assert_eq!(normalize_code(" us "), "US");
        assert_eq!(normalize_code("In"), "IN");
    }

    #[test]
    fn normalize_rejects_garbage() {
        assert_eq!(normalize_code(""), UNKNOWN_CODE);
        assert_eq!(normalize_code("??"), UNKNOWN_CODE);
        assert_eq!(normalize_code("USA"), UNKNOWN_CODE);
        assert_eq!(normalize_code("1A"), UNKNOWN_CODE);
    }

    #[test]
    fn unknown_codes_resolve_to_sentinel() {
        let table = ReferenceTable::builtin();
        assert_eq!(table.resolve("??"), SENTINEL);
        assert_eq!(table.resolve("ZZ"), SENTINEL);
        assert_ne!(table.resolve("US"), SENTINEL);
    }

    #[test]
    fn builtin_table_has_default_destination() {
        let table = ReferenceTable::builtin();
        assert!(table.get(table.default_code()).is_some());
        assert!(table.len() > 30);
    }

    #[test]
    fn duplicate_and_invalid_entries_are_dropped() {
        let table = ReferenceTable::new(
            vec![
                ("de".to_string(), GeoPoint::new(51.0, 10.0)),
                ("DE".to_string(), GeoPoint::new(0.0, 0.0)),
                ("bogus".to_string(), GeoPoint::new(1.0, 1.0)),
            ],
            "de",
        );
        assert_eq!(table.len(), 1);
        assert_eq!(table.default_code(), "DE");
        assert_eq!(table.resolve("DE").lat, 51.0);
    }
}
