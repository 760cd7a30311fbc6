use crate::types::FireRecord;

/// Matches shown by the record listing.
pub const LIST_LIMIT: usize = 10;
/// Markers placed on a generated map.
pub const MAP_LIMIT: usize = 100;
/// Records geocoded one by one for a region map.
pub const REGION_MAP_LIMIT: usize = 30;

/// Region / period filter over the record store.
///
/// Both predicates are plain case-sensitive substring tests: `province` against
/// `location`, `year` against the whole `fire_date` text. A year string can
/// therefore also match in the month/day/time part of a date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordQuery {
    pub province: Option<String>,
    pub year: Option<String>,
}

impl RecordQuery {
    /// Empty strings are treated as "not given".
    pub fn new(province: Option<&str>, year: Option<&str>) -> Self {
        let keep = |s: Option<&str>| s.filter(|v| !v.is_empty()).map(str::to_string);
        RecordQuery {
            province: keep(province),
            year: keep(year),
        }
    }

    pub fn matches(&self, r: &FireRecord) -> bool {
        self.province.as_deref().map_or(true, |p| r.location.contains(p))
            && self.year.as_deref().map_or(true, |y| r.fire_date.contains(y))
    }

    /// Matching records in their stored order.
    pub fn filter<'a>(&self, records: &'a [FireRecord]) -> Vec<&'a FireRecord> {
        records.iter().filter(|r| self.matches(r)).collect()
    }

    /// `(province, year)` labels for messages, with "전체" for an absent filter.
    pub fn labels(&self) -> (&str, &str) {
        (
            self.province.as_deref().unwrap_or("전체"),
            self.year.as_deref().unwrap_or("전체"),
        )
    }
}

/// The first `limit` matches plus the full match count.
#[derive(Debug, Clone)]
pub struct Page<'a> {
    pub total: usize,
    pub shown: Vec<&'a FireRecord>,
}

impl<'a> Page<'a> {
    pub fn of(mut matches: Vec<&'a FireRecord>, limit: usize) -> Self {
        let total = matches.len();
        matches.truncate(limit);
        Page { total, shown: matches }
    }

    pub fn is_truncated(&self) -> bool {
        self.shown.len() < self.total
    }
}
