use crate::error::{Error, Result};
use crate::query::RecordQuery;
use crate::types::{CountRow, FireRecord};
use crate::util::{char_prefix, char_range};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;

/// Bucket for records whose year, region or cause cannot be determined.
pub const UNKNOWN: &str = "unknown";

const TOP_REGIONS: usize = 5;
const TOP_CAUSES: usize = 3;
const TOP_MONTHS: usize = 3;
const TREND_YEARS: usize = 5;

static MONTH_LABELS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("01", "1월"),
        ("02", "2월"),
        ("03", "3월"),
        ("04", "4월"),
        ("05", "5월"),
        ("06", "6월"),
        ("07", "7월"),
        ("08", "8월"),
        ("09", "9월"),
        ("10", "10월"),
        ("11", "11월"),
        ("12", "12월"),
    ])
});

/// Insertion-ordered counter; ties in a descending sort keep first-seen order.
type Counts = IndexMap<String, usize>;

fn bump(counts: &mut Counts, key: &str) {
    *counts.entry(key.to_string()).or_insert(0) += 1;
}

/// Entries by descending count. The sort is stable, so equal counts stay in
/// encounter order.
fn by_count_desc(counts: &Counts) -> Vec<(&str, usize)> {
    let mut v: Vec<(&str, usize)> = counts.iter().map(|(k, c)| (k.as_str(), *c)).collect();
    v.sort_by(|a, b| b.1.cmp(&a.1));
    v
}

pub fn year_of(r: &FireRecord) -> &str {
    char_prefix(&r.fire_date, 4).unwrap_or(UNKNOWN)
}

pub fn region_of(r: &FireRecord) -> &str {
    if r.location.is_empty() {
        UNKNOWN
    } else if r.location.contains(' ') {
        r.location.split_whitespace().next().unwrap_or(UNKNOWN)
    } else {
        &r.location
    }
}

pub fn cause_of(r: &FireRecord) -> &str {
    if r.fire_cause.is_empty() {
        UNKNOWN
    } else {
        &r.fire_cause
    }
}

pub fn month_label(month: &str) -> &str {
    MONTH_LABELS.get(month).copied().unwrap_or(month)
}

/// Counts over a whole record set. Every map includes the `unknown` bucket, so
/// each one sums to `total`.
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub total: usize,
    pub years: Counts,
    pub regions: Counts,
    pub causes: Counts,
}

impl StatsSummary {
    /// Known years, ascending.
    pub fn year_rows(&self) -> Vec<CountRow> {
        let mut rows: Vec<CountRow> = self
            .years
            .iter()
            .filter(|(k, _)| k.as_str() != UNKNOWN)
            .map(|(k, c)| CountRow { key: k.clone(), count: *c })
            .collect();
        rows.sort_by(|a, b| a.key.cmp(&b.key));
        rows
    }

    /// The five busiest regions.
    pub fn top_region_rows(&self) -> Vec<CountRow> {
        by_count_desc(&self.regions)
            .into_iter()
            .take(TOP_REGIONS)
            .map(|(k, c)| CountRow { key: k.to_string(), count: c })
            .collect()
    }

    /// Every known cause, most frequent first.
    pub fn cause_rows(&self) -> Vec<CountRow> {
        by_count_desc(&self.causes)
            .into_iter()
            .filter(|(k, _)| *k != UNKNOWN)
            .map(|(k, c)| CountRow { key: k.to_string(), count: c })
            .collect()
    }
}

pub fn stats(records: &[FireRecord]) -> StatsSummary {
    let mut summary = StatsSummary {
        total: records.len(),
        ..StatsSummary::default()
    };
    for r in records {
        bump(&mut summary.years, year_of(r));
        bump(&mut summary.regions, region_of(r));
        bump(&mut summary.causes, cause_of(r));
    }
    summary
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl RiskLevel {
    /// Tier for an average number of fires per year. Each threshold is
    /// exclusive: exactly 30.0 is `High`.
    pub fn from_average(avg: f64) -> Self {
        if avg > 30.0 {
            RiskLevel::VeryHigh
        } else if avg > 20.0 {
            RiskLevel::High
        } else if avg > 10.0 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::Low => "낮음",
            RiskLevel::Medium => "중간",
            RiskLevel::High => "높음",
            RiskLevel::VeryHigh => "매우 높음",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trend {
    pub direction: TrendDirection,
    /// Number of years compared (2..=5).
    pub span_years: usize,
}

impl Trend {
    /// Compare the first and last of the most recent (up to five) years.
    /// `None` with fewer than two years of data.
    pub fn from_years(years: &Counts) -> Option<Self> {
        let mut keys: Vec<&String> = years.keys().collect();
        keys.sort();
        let recent = &keys[keys.len().saturating_sub(TREND_YEARS)..];
        if recent.len() < 2 {
            return None;
        }
        let first = years[recent[0]];
        let last = years[recent[recent.len() - 1]];
        let direction = match last.cmp(&first) {
            std::cmp::Ordering::Greater => TrendDirection::Increasing,
            std::cmp::Ordering::Less => TrendDirection::Decreasing,
            std::cmp::Ordering::Equal => TrendDirection::Stable,
        };
        Some(Trend { direction, span_years: recent.len() })
    }

    pub fn sentence(&self) -> String {
        let n = self.span_years;
        match self.direction {
            TrendDirection::Increasing => format!("최근 {n}년간 산불 발생이 증가하는 추세입니다."),
            TrendDirection::Decreasing => format!("최근 {n}년간 산불 발생이 감소하는 추세입니다."),
            TrendDirection::Stable => format!("최근 {n}년간 산불 발생이 비슷한 수준을 유지하고 있습니다."),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RiskReport {
    pub province: String,
    pub total: usize,
    pub years_with_data: usize,
    pub avg_per_year: f64,
    pub level: RiskLevel,
    pub top_causes: Vec<(String, usize)>,
    /// Labels of the busiest months, most fires first.
    pub high_risk_months: Vec<String>,
    pub trend: Option<Trend>,
}

/// Outcome of a risk analysis that passed argument validation.
#[derive(Debug, Clone)]
pub enum RiskOutcome {
    NoData { province: String },
    Report(RiskReport),
}

/// Risk analysis needs a non-empty province name.
pub fn require_province(province: &str) -> Result<()> {
    if province.is_empty() {
        return Err(Error::InvalidArgument("지역을 지정해주세요.".to_string()));
    }
    Ok(())
}

pub fn analyze_risk(records: &[FireRecord], province: &str) -> Result<RiskOutcome> {
    require_province(province)?;
    let matched = RecordQuery::new(Some(province), None).filter(records);
    if matched.is_empty() {
        return Ok(RiskOutcome::NoData { province: province.to_string() });
    }

    let mut years = Counts::new();
    let mut months = Counts::new();
    let mut causes = Counts::new();
    for r in &matched {
        if let Some(year) = char_prefix(&r.fire_date, 4) {
            bump(&mut years, year);
        }
        if let Some(month) = char_range(&r.fire_date, 4, 6) {
            bump(&mut months, month);
        }
        bump(&mut causes, cause_of(r));
    }

    let mut ranked = by_count_desc(&causes);
    if ranked.iter().any(|(k, _)| *k != UNKNOWN) {
        ranked.retain(|(k, _)| *k != UNKNOWN);
    }
    let top_causes = ranked
        .into_iter()
        .take(TOP_CAUSES)
        .map(|(k, c)| (k.to_string(), c))
        .collect();

    let high_risk_months = by_count_desc(&months)
        .into_iter()
        .take(TOP_MONTHS)
        .map(|(m, _)| month_label(m).to_string())
        .collect();

    let total = matched.len();
    let avg_per_year = total as f64 / years.len().max(1) as f64;

    Ok(RiskOutcome::Report(RiskReport {
        province: province.to_string(),
        total,
        years_with_data: years.len(),
        avg_per_year,
        level: RiskLevel::from_average(avg_per_year),
        top_causes,
        high_risk_months,
        trend: Trend::from_years(&years),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(location: &str, date: &str, cause: &str) -> FireRecord {
        FireRecord {
            location: location.into(),
            fire_date: date.into(),
            fire_cause: cause.into(),
            ..Default::default()
        }
    }

    fn report(outcome: RiskOutcome) -> RiskReport {
        match outcome {
            RiskOutcome::Report(r) => r,
            RiskOutcome::NoData { province } => panic!("no data for {province}"),
        }
    }

    #[test]
    fn empty_cause_is_unknown() {
        let data = vec![
            rec("강원도 고성군", "202203011200", "입산자실화"),
            rec("강원도 인제군", "202204021300", ""),
        ];
        let s = stats(&data);
        let expected: Counts = [("입산자실화".to_string(), 1), (UNKNOWN.to_string(), 1)]
            .into_iter()
            .collect();
        assert_eq!(s.causes, expected);
        assert_eq!(s.cause_rows().len(), 1);
    }

    #[test]
    fn buckets_for_short_dates_and_locations() {
        let data = vec![rec("", "202", ""), rec("서울특별시", "2021", "쓰레기소각")];
        let s = stats(&data);
        assert_eq!(s.years.get(UNKNOWN), Some(&1));
        assert_eq!(s.regions.get(UNKNOWN), Some(&1));
        assert_eq!(s.regions.get("서울특별시"), Some(&1));
        let years: Vec<String> = s.year_rows().into_iter().map(|r| r.key).collect();
        assert_eq!(years, ["2021"]);
    }

    #[test]
    fn counts_are_conserved() {
        let data = vec![
            rec("강원도 고성군", "202103010800", "입산자실화"),
            rec("강원도 강릉시", "2022", ""),
            rec("", "", ""),
            rec("경기도", "19", "논밭두렁소각"),
            rec("경상북도 안동시 풍천면", "202304050101", "입산자실화"),
        ];
        let s = stats(&data);
        let sum = |c: &Counts| c.values().sum::<usize>();
        assert_eq!(sum(&s.years), data.len());
        assert_eq!(sum(&s.regions), data.len());
        assert_eq!(sum(&s.causes), data.len());
        assert_eq!(s.total, data.len());
    }

    #[test]
    fn region_listing_is_top_five_ties_in_encounter_order() {
        let mut data = Vec::new();
        for region in ["가", "나", "다", "라", "마", "바"] {
            data.push(rec(&format!("{region} 군"), "2020", "x"));
        }
        data.push(rec("바 군", "2020", "x"));
        let keys: Vec<String> = stats(&data).top_region_rows().into_iter().map(|r| r.key).collect();
        assert_eq!(keys, ["바", "가", "나", "다", "라"]);
    }

    #[test]
    fn risk_level_boundaries() {
        assert_eq!(RiskLevel::from_average(10.0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_average(10.01), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_average(20.0), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_average(20.01), RiskLevel::High);
        assert_eq!(RiskLevel::from_average(30.0), RiskLevel::High);
        assert_eq!(RiskLevel::from_average(30.01), RiskLevel::VeryHigh);
        assert_eq!(RiskLevel::VeryHigh.to_string(), "매우 높음");
    }

    #[test]
    fn thirty_five_fires_in_one_year_is_very_high() {
        let data: Vec<FireRecord> = (0..35)
            .map(|i| rec("강원도 삼척시", &format!("2023{:02}011200", i % 12 + 1), "입산자실화"))
            .collect();
        let r = report(analyze_risk(&data, "강원도").unwrap());
        assert_eq!(r.total, 35);
        assert_eq!(r.years_with_data, 1);
        assert_eq!(r.level, RiskLevel::VeryHigh);
        assert_eq!(r.trend, None);
    }

    #[test]
    fn empty_province_is_invalid_argument() {
        assert!(matches!(analyze_risk(&[], ""), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn no_match_is_distinct_from_error() {
        let data = vec![rec("강원도 고성군", "202103010800", "")];
        assert!(matches!(
            analyze_risk(&data, "경기도").unwrap(),
            RiskOutcome::NoData { .. }
        ));
    }

    #[test]
    fn trend_uses_last_five_years() {
        let mut data = Vec::new();
        // 2016 is outside the window; compare 2017 (2) with 2021 (1).
        let per_year = [("2016", 1), ("2017", 2), ("2018", 5), ("2019", 5), ("2020", 5), ("2021", 1)];
        for (year, n) in per_year {
            for _ in 0..n {
                data.push(rec("강원도 정선군", &format!("{year}03011200"), "입산자실화"));
            }
        }
        let r = report(analyze_risk(&data, "강원도").unwrap());
        assert_eq!(
            r.trend,
            Some(Trend { direction: TrendDirection::Decreasing, span_years: 5 })
        );
        assert_eq!(r.years_with_data, 6);
    }

    #[test]
    fn trend_increasing_and_stable() {
        let mut years = Counts::new();
        years.insert("2020".into(), 1);
        years.insert("2021".into(), 4);
        assert_eq!(Trend::from_years(&years).unwrap().direction, TrendDirection::Increasing);
        years.insert("2022".into(), 1);
        assert_eq!(Trend::from_years(&years).unwrap().direction, TrendDirection::Stable);
        assert!(Trend::from_years(&Counts::new()).is_none());
    }

    #[test]
    fn causes_and_months() {
        let data = vec![
            rec("경상북도 안동시", "202003151200", "입산자실화"),
            rec("경상북도 안동시", "202003201200", "입산자실화"),
            rec("경상북도 울진군", "202104011200", "담뱃불실화"),
            rec("경상북도 울진군", "202104021200", ""),
            rec("경상북도 울진군", "202104031200", ""),
            rec("경상북도 울진군", "202111031200", "쓰레기소각"),
            rec("경상북도 봉화군", "202205031200", "성묘객실화"),
            rec("경상북도 봉화군", "2022", "성묘객실화"),
        ];
        let r = report(analyze_risk(&data, "경상북도").unwrap());
        let causes: Vec<&str> = r.top_causes.iter().map(|(c, _)| c.as_str()).collect();
        assert_eq!(causes, ["입산자실화", "성묘객실화", "담뱃불실화"]);
        assert_eq!(r.high_risk_months, ["4월", "3월", "11월"]);
        assert!((r.avg_per_year - 8.0 / 3.0).abs() < 1e-9);
        assert_eq!(r.level, RiskLevel::Low);
    }

    #[test]
    fn only_unknown_causes_fall_back_to_unknown() {
        let data = vec![rec("제주특별자치도 제주시", "202101011200", "")];
        let r = report(analyze_risk(&data, "제주").unwrap());
        assert_eq!(r.top_causes, vec![(UNKNOWN.to_string(), 1)]);
    }

    #[test]
    fn unmapped_month_code_is_shown_raw() {
        assert_eq!(month_label("13"), "13");
        assert_eq!(month_label("07"), "7월");
    }
}
