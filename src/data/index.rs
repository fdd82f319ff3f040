// ---------------------------------------------------------------------------
// Compound index decomposition: YYYY MM REGION...
// ---------------------------------------------------------------------------

/// Character widths of the fixed-position fields.
const YEAR_WIDTH: usize = 4;
const MONTH_WIDTH: usize = 2;

/// Year, month and region code of one compound index.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DecomposedIndex {
    pub year: String,
    pub month: String,
    pub region: String,
}

/// Split a compound index by fixed position: chars `[0,4)` are the year,
/// `[4,6)` the month and the rest the region code.
///
/// Nothing is validated. Inputs shorter than six characters give truncated
/// or empty parts: `"203"` becomes `("203", "", "")`. Slicing is by `char`,
/// so non-ASCII input never splits a code point.
pub fn decompose(raw: &str) -> DecomposedIndex {
    let mut chars = raw.chars();
    let year = chars.by_ref().take(YEAR_WIDTH).collect();
    let month = chars.by_ref().take(MONTH_WIDTH).collect();
    let region = chars.collect();
    DecomposedIndex {
        year,
        month,
        region,
    }
}

/// Parallel year / month / region columns for a whole index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexColumns {
    pub years: Vec<String>,
    pub months: Vec<String>,
    pub regions: Vec<String>,
}

impl IndexColumns {
    pub fn len(&self) -> usize {
        self.years.len()
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    /// Number of rows whose index was too short to carry a region code.
    pub fn short_count(&self) -> usize {
        self.regions.iter().filter(|r| r.is_empty()).count()
    }
}

pub fn decompose_all<S: AsRef<str>>(index: &[S]) -> IndexColumns {
    let mut out = IndexColumns {
        years: Vec::with_capacity(index.len()),
        months: Vec::with_capacity(index.len()),
        regions: Vec::with_capacity(index.len()),
    };
    for raw in index {
        let DecomposedIndex {
            year,
            month,
            region,
        } = decompose(raw.as_ref());
        out.years.push(year);
        out.months.push(month);
        out.regions.push(region);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_splits_full_index() {
        let d = decompose("2023073304557");
        assert_eq!(d.year, "2023");
        assert_eq!(d.month, "07");
        assert_eq!(d.region, "3304557");
    }

    #[test]
    fn test_exactly_six_chars_has_empty_region() {
        let d = decompose("202301");
        assert_eq!((d.year.as_str(), d.month.as_str(), d.region.as_str()), ("2023", "01", ""));
    }

    #[test]
    fn test_short_inputs_truncate() {
        assert_eq!(
            decompose("203"),
            DecomposedIndex {
                year: "203".into(),
                month: String::new(),
                region: String::new(),
            }
        );
        let d = decompose("20231");
        assert_eq!((d.year.as_str(), d.month.as_str(), d.region.as_str()), ("2023", "1", ""));
        assert_eq!(decompose(""), DecomposedIndex::default());
    }

    #[test]
    fn test_multibyte_input_does_not_panic() {
        let d = decompose("2023ãbRJ");
        assert_eq!(d.month, "ãb");
        assert_eq!(d.region, "RJ");
    }

    #[test]
    fn test_decompose_all_is_parallel() {
        let cols = decompose_all(&["202001A", "202102B", "19"]);
        assert_eq!(cols.len(), 3);
        assert_eq!(cols.years, vec!["2020", "2021", "19"]);
        assert_eq!(cols.months, vec!["01", "02", ""]);
        assert_eq!(cols.regions, vec!["A", "B", ""]);
        assert_eq!(cols.short_count(), 1);
    }

    proptest! {
        #[test]
        fn prop_long_index_round_trips(raw in "[0-9A-Za-z]{6,24}") {
            let d = decompose(&raw);
            prop_assert_eq!(d.year.chars().count(), 4);
            prop_assert_eq!(d.month.chars().count(), 2);
            prop_assert_eq!(&d.year, &raw[0..4]);
            prop_assert_eq!(&d.month, &raw[4..6]);
            prop_assert_eq!(&d.region, &raw[6..]);
            prop_assert_eq!(format!("{}{}{}", d.year, d.month, d.region), raw);
        }

        #[test]
        fn prop_short_index_never_fails(raw in "\\PC{0,5}") {
            let d = decompose(&raw);
            prop_assert!(d.region.is_empty());
            prop_assert_eq!(format!("{}{}", d.year, d.month), raw);
        }
    }
}
