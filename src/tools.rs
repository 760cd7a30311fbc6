//! Operation surface handed to the calling agent.
//!
//! Every operation returns human-readable text. Failures are rendered into
//! that text rather than returned as errors, because the caller only ever sees
//! strings.
//!
//! The record store and cache files are read, modified and rewritten as a
//! whole with no locking. Only one process may run a conversion batch against
//! the same files at a time.

use crate::cache::CoordinateCache;
use crate::config::Config;
use crate::error::Result;
use crate::geo::StrategyChain;
use crate::kakao::GeoLookup;
use crate::loader::{load_records, save_records};
use crate::map::{self, Marker};
use crate::normalize::CoordinateNormalizer;
use crate::output::{render_table_rows, write_csv, write_json_pretty};
use crate::query::{Page, RecordQuery, LIST_LIMIT, MAP_LIMIT, REGION_MAP_LIMIT};
use crate::reports::{self, RiskOutcome};
use crate::types::{CountRow, FireRecord, StatsOverview};
use crate::util::{format_fire_date, format_int, or_placeholder};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

const PREVENTION_ADVICE: &str = "예방 권고사항:
1. 건조한 시기에 입산 시 화기 소지 금지
2. 농경지, 과수원 등 소각 작업 자제
3. 등산로 외 지역 출입 자제
4. 산림 인접 지역에서의 흡연 및 취사 금지";

const SAFETY_TIPS: &str = "산불 예방 및 대처 요령:

[산불 예방법]
1. 입산 시 라이터, 성냥 등 화기물 소지 금지
2. 산림 내 흡연 금지 및 담배꽁초 완전 소화
3. 등산로 외 지역 출입 금지
4. 취사행위 및 모닥불 피우기 금지
5. 농촌에서 농업 부산물 소각 금지
6. 쓰레기 소각 금지
7. 논·밭두렁 및 농산폐기물 등 소각 금지

[산불 발생 시 대처법]
1. 산불 발견 즉시 119 또는 산림청 신고
2. 바람을 등지고 산불의 진행 반대 방향으로 대피
3. 산불은 빠른 속도로 확산되므로 신속히 대피
4. 대피 장소는 타버린 지역, 도로, 바위 뒤, 물가 등
5. 연기를 마시지 않도록 젖은 수건 등으로 코와 입을 보호
6. 불길에 휩싸일 경우 바람 부는 방향의 직각으로 대피

[산불 발생 시 신고]
- 산림청 신고: 042-481-4119
- 소방서 신고: 119

[산불 위험 등급]
- 위험 경보(적색): 산불 발생 위험이 매우 높음
- 주의 경보(황색): 산불 발생 위험이 높음
- 관심 경보(청색): 산불 발생 위험이 다소 높음
- 평상 경보(녹색): 산불 발생 위험이 낮음

[기타 산불 관련 정보]
- 산불 조심 기간: 봄철(2월 1일 ~ 5월 15일), 가을철(11월 1일 ~ 12월 15일)";

fn as_text(result: Result<String>) -> String {
    result.unwrap_or_else(|e| {
        error!("{}", e);
        e.to_string()
    })
}

fn no_match_message(q: &RecordQuery) -> String {
    let (province, year) = q.labels();
    format!("조건에 맞는 산불 데이터가 없습니다. (지역: {province}, 연도: {year})")
}

/// Write a finished batch back: the cache first, then the store. A failed
/// cache write leaves the store untouched; a failed store write leaves the
/// cache already saved.
fn persist_batch(
    cache: &CoordinateCache,
    cache_path: &Path,
    records: &[FireRecord],
    store_path: &Path,
) -> Result<()> {
    cache.save(cache_path)?;
    save_records(store_path, records)
}

fn count_lines<'a>(rows: impl IntoIterator<Item = &'a CountRow>) -> String {
    rows.into_iter()
        .map(|r| format!("- {}: {}건", r.key, format_int(r.count)))
        .collect::<Vec<_>>()
        .join("\n")
}

pub struct FireService {
    config: Config,
    lookup: Arc<dyn GeoLookup>,
}

impl FireService {
    pub fn new(config: Config, lookup: Arc<dyn GeoLookup>) -> Self {
        Self { config, lookup }
    }

    fn records(&self) -> Result<Vec<FireRecord>> {
        load_records(&self.config.data_path).map(|(records, _)| records)
    }

    fn chain(&self) -> StrategyChain {
        if self.config.geocoding.remote_transcode {
            StrategyChain::with_remote()
        } else {
            StrategyChain::local()
        }
    }

    fn normalizer(&self, cache: CoordinateCache) -> CoordinateNormalizer<'_> {
        CoordinateNormalizer::new(
            self.lookup.as_ref(),
            self.chain(),
            cache,
            self.config.geocoding.throttle(),
        )
    }

    /// Matching records, at most ten of them spelled out.
    pub fn get_records(&self, province: Option<&str>, year: Option<&str>) -> String {
        as_text(self.try_get_records(province, year))
    }

    fn try_get_records(&self, province: Option<&str>, year: Option<&str>) -> Result<String> {
        let records = self.records()?;
        let q = RecordQuery::new(province, year);
        let page = Page::of(q.filter(&records), LIST_LIMIT);
        if page.total == 0 {
            return Ok(no_match_message(&q));
        }

        let mut entries: Vec<String> = page
            .shown
            .iter()
            .map(|r| {
                format!(
                    "- 위치: {}\n  날짜: {}\n  규모: {}\n  원인: {}",
                    or_placeholder(&r.location, "위치 정보 없음"),
                    or_placeholder(&format_fire_date(&r.fire_date), "날짜 정보 없음"),
                    or_placeholder(&r.fire_size, "크기 정보 없음"),
                    or_placeholder(&r.fire_cause, "원인 정보 없음"),
                )
            })
            .collect();
        if page.is_truncated() {
            entries.push(format!(
                "※ 총 {}건 중 {}건만 표시됩니다.",
                format_int(page.total),
                page.shown.len()
            ));
        }
        let (p, y) = q.labels();
        Ok(format!("산불 발생 정보 (지역: {p}, 연도: {y}):\n\n{}", entries.join("\n\n")))
    }

    pub fn get_stats(&self) -> String {
        as_text(self.records().map(|records| {
            let s = reports::stats(&records);
            format!(
                "산불 발생 통계 정보:\n\n총 산불 발생 건수: {}건\n\n연도별 발생 건수:\n{}\n\n지역별 발생 건수 (상위 5개):\n{}\n\n원인별 발생 건수:\n{}\n",
                format_int(s.total),
                count_lines(&s.year_rows()),
                count_lines(&s.top_region_rows()),
                count_lines(&s.cause_rows()),
            )
        }))
    }

    pub fn analyze_risk(&self, province: &str) -> String {
        as_text(self.try_analyze_risk(province))
    }

    fn try_analyze_risk(&self, province: &str) -> Result<String> {
        reports::require_province(province)?;
        let records = self.records()?;
        let r = match reports::analyze_risk(&records, province)? {
            RiskOutcome::NoData { province } => {
                return Ok(format!("{province} 지역의 산불 데이터가 없습니다."))
            }
            RiskOutcome::Report(r) => r,
        };

        let causes = r
            .top_causes
            .iter()
            .map(|(c, n)| format!("- {}: {}건", c, format_int(*n)))
            .collect::<Vec<_>>()
            .join("\n");
        let trend = r.trend.map(|t| t.sentence()).unwrap_or_default();
        Ok(format!(
            "{} 지역 산불 위험도 분석:\n\n총 산불 발생 건수: {}건\n연평균 발생 건수: {:.1}건 (총 {}년 데이터 기준)\n산불 발생 위험도: {}\n\n주요 발생 원인:\n{}\n\n산불 발생 위험이 높은 시기: {}\n\n{}\n\n{}\n",
            r.province,
            format_int(r.total),
            r.avg_per_year,
            r.years_with_data,
            r.level,
            causes,
            r.high_risk_months.join(", "),
            trend,
            PREVENTION_ADVICE,
        ))
    }

    /// Attach WGS84 positions to up to `count` (max 100) more records and
    /// write the cache and the store back.
    pub async fn convert_coordinates_batch(&self, count: usize) -> String {
        as_text(self.try_convert(count).await)
    }

    async fn try_convert(&self, count: usize) -> Result<String> {
        let mut records = self.records()?;
        let cache = CoordinateCache::load(&self.config.cache_path)?;
        let mut normalizer = self.normalizer(cache);
        let report = normalizer.convert_batch(&mut records, count).await;
        info!(
            "conversion batch: {} new, {} cached, {} fallbacks, {} skipped (limit {})",
            report.newly_converted, report.already_cached, report.fallbacks, report.skipped, report.limit
        );

        persist_batch(
            &normalizer.into_cache(),
            &self.config.cache_path,
            &records,
            &self.config.data_path,
        )?;

        let mut text = format!(
            "좌표계 변환 완료: 총 {}개의 좌표가 변환되었습니다.",
            format_int(report.total_converted())
        );
        text.push_str(&format!(
            "\n(신규 변환 {}개, 캐시 사용 {}개",
            report.newly_converted, report.already_cached
        ));
        if report.fallbacks > 0 {
            text.push_str(&format!(", 기본 좌표 대체 {}개", report.fallbacks));
        }
        text.push(')');
        Ok(text)
    }

    pub async fn search_location(&self, name: &str) -> String {
        let p = self.normalizer(CoordinateCache::new()).normalize_by_name(name).await;
        format!("{name}의 좌표: 경도 {}, 위도 {}", p.lng, p.lat)
    }

    /// Write a map page for up to 100 matching records and return where it is.
    pub fn visualize(&self, province: Option<&str>, year: Option<&str>) -> String {
        as_text(self.try_visualize(province, year))
    }

    fn try_visualize(&self, province: Option<&str>, year: Option<&str>) -> Result<String> {
        let records = self.records()?;
        let q = RecordQuery::new(province, year);
        let page = Page::of(q.filter(&records), MAP_LIMIT);
        if page.total == 0 {
            return Ok(no_match_message(&q));
        }

        let (p, y) = q.labels();
        let markers = map::markers(&page.shown, &self.chain());
        let html = map::render_html(
            &format!("산불 발생 위치 지도 ({p}, {y})"),
            map::center_of(&markers),
            &markers,
            &self.config.map.api_key,
        )?;
        let path = self.write_map_page(&html)?;
        info!("map with {} markers written to {}", markers.len(), path.display());

        Ok(format!(
            "산불 발생 위치 지도를 생성했습니다.\n지역: {p}\n연도: {y}\n데이터 수: {}개 (조건에 맞는 전체 {}건)\n지도에 표시된 위치: {}개\n\n브라우저에서 다음 파일을 열어주세요: {}",
            page.shown.len(),
            format_int(page.total),
            markers.len(),
            path.display()
        ))
    }

    /// Map of up to 30 fires in `region`, each placed by searching its
    /// location text. A failed search falls back to the record's stored or
    /// locally approximated position; records with neither are left off.
    pub async fn visualize_region(&self, region: &str) -> String {
        as_text(self.try_visualize_region(region).await)
    }

    async fn try_visualize_region(&self, region: &str) -> Result<String> {
        let records = self.records()?;
        let matched = RecordQuery::new(Some(region), None).filter(&records);
        if matched.is_empty() {
            return Ok(format!("{region} 지역에서 산불 발생 데이터를 찾을 수 없습니다."));
        }

        let center = match self.lookup.search_address(region).await {
            Ok(p) => Some(p),
            Err(e) => {
                warn!("center lookup for '{}' failed: {}", region, e);
                None
            }
        };

        let chain = self.chain();
        let pause = self.config.geocoding.address_throttle();
        let mut placed = Vec::new();
        for r in matched.iter().take(REGION_MAP_LIMIT) {
            if r.location.is_empty() {
                continue;
            }
            let found = self.lookup.search_address(&r.location).await;
            tokio::time::sleep(pause).await;
            let point = match found {
                Ok(p) if chain.accepts(p) => Some(p),
                Ok(p) => {
                    debug!("address of {} is off the map at ({}, {})", r.location, p.lng, p.lat);
                    map::approximate(r, &chain)
                }
                Err(e) => {
                    debug!("address search for {} failed: {}", r.location, e);
                    map::approximate(r, &chain)
                }
            };
            match point {
                Some(p) => placed.push(Marker::at(r, p)),
                None => debug!("no position for {}", r.location),
            }
        }

        if placed.is_empty() {
            return Ok(format!(
                "{region} 지역의 산불 위치를 지도에 표시할 수 없습니다. 주소 검색에 실패했습니다."
            ));
        }

        let html = map::render_html(
            &format!("{region} 산불 발생 지도"),
            center.unwrap_or_else(|| map::center_of(&placed)),
            &placed,
            &self.config.map.api_key,
        )?;
        let path = self.write_map_page(&html)?;
        info!("region map for {} with {} markers written to {}", region, placed.len(), path.display());

        Ok(format!(
            "{region} 지역의 산불 발생 지점 {}개 중 {}개의 위치를 지도에 표시했습니다.\n브라우저에서 다음 파일을 열어주세요: {}",
            format_int(matched.len()),
            placed.len(),
            path.display()
        ))
    }

    fn write_map_page(&self, html: &str) -> Result<PathBuf> {
        let dir = self
            .config
            .map
            .output_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir);
        let mut file = tempfile::Builder::new()
            .prefix("forest_fire_map_")
            .suffix(".html")
            .tempfile_in(&dir)?;
        file.write_all(html.as_bytes())?;
        let (_, path) = file.keep().map_err(|e| e.error)?;
        Ok(path)
    }

    /// The whole record store as indented JSON text.
    pub fn data_resource(&self) -> String {
        as_text(
            self.records()
                .and_then(|records| Ok(serde_json::to_string_pretty(&records)?)),
        )
    }

    /// Write year/region/cause tables as CSV plus a JSON overview into `dir`,
    /// and return markdown previews of the tables.
    pub fn export_stats(&self, dir: &Path) -> String {
        as_text(self.try_export_stats(dir))
    }

    fn try_export_stats(&self, dir: &Path) -> Result<String> {
        let records = self.records()?;
        let s = reports::stats(&records);
        std::fs::create_dir_all(dir)?;

        let tables = [
            ("연도별 발생 건수", "stats_by_year.csv", s.year_rows()),
            ("지역별 발생 건수 (상위 5개)", "stats_top_regions.csv", s.top_region_rows()),
            ("원인별 발생 건수", "stats_by_cause.csv", s.cause_rows()),
        ];
        let mut out = Vec::new();
        for (title, file, rows) in &tables {
            let path = dir.join(file);
            write_csv(&path, rows)?;
            out.push(format!("{title}\n\n{}\n\n(전체 표: {})", render_table_rows(rows, 10), path.display()));
        }

        let overview = StatsOverview {
            total_fires: s.total,
            distinct_years: s.year_rows().len(),
            distinct_regions: s.regions.len(),
            distinct_causes: s.cause_rows().len(),
            converted_records: records.iter().filter(|r| r.wgs84.is_some()).count(),
        };
        let summary_path = dir.join("stats_summary.json");
        write_json_pretty(&summary_path, &overview)?;
        out.push(format!("요약: {}", summary_path.display()));
        Ok(out.join("\n\n"))
    }

    pub fn safety_tips(&self) -> &'static str {
        SAFETY_TIPS
    }
}
