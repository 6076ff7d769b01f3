//! 卡片补全服务 - 业务能力层
//!
//! 为原始 CSV 行补全 `reference_url`（分类页面链接）和 `attribution`（照片署名）。
//!
//! 处理规则：
//! 1. 没有学名的行直接丢弃
//! 2. 已有真实值（非空且不是 "N/A"）的字段原样保留，不发起查询
//! 3. 单个字段查询失败只影响该字段（置为 "N/A"），不影响其他行
//! 4. 输出顺序与输入一致，只包含五个标准字段

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use tracing::{debug, error, info, warn};

use crate::clients::inat_client::taxon_page_url;
use crate::clients::SpeciesLookup;
use crate::error::LookupError;
use crate::models::species::{
    present_value, raw_value, RawRow, SpeciesRow, COL_ATTRIBUTION, COL_COMMON_NAME, COL_IMAGE_URL,
    COL_OBSERVATION_URL, COL_REFERENCE_URL, COL_SCIENTIFIC_NAME, NOT_AVAILABLE,
};

/// 补全统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EnrichStats {
    pub total: usize,
    pub emitted: usize,
    pub dropped: usize,
}

/// 卡片补全服务
pub struct RowEnricher<L> {
    lookup: L,
    site_url: String,
}

impl<L: SpeciesLookup> RowEnricher<L> {
    /// `site_url` 用于拼接分类页面链接，例如 `https://www.inaturalist.org`
    pub fn new(lookup: L, site_url: impl Into<String>) -> Self {
        Self {
            lookup,
            site_url: site_url.into(),
        }
    }

    pub fn lookup(&self) -> &L {
        &self.lookup
    }

    /// 补全一批原始行
    pub async fn enrich(&self, rows: &[RawRow]) -> Vec<SpeciesRow> {
        self.enrich_with_stats(rows).await.0
    }

    /// 补全一批原始行，同时返回统计
    ///
    /// 某一行处理过程中发生 panic 时停止处理，返回此前已完成的行。
    pub async fn enrich_with_stats(&self, rows: &[RawRow]) -> (Vec<SpeciesRow>, EnrichStats) {
        let mut processed = Vec::with_capacity(rows.len());
        let mut stats = EnrichStats {
            total: rows.len(),
            ..Default::default()
        };

        for (index, row) in rows.iter().enumerate() {
            match AssertUnwindSafe(self.enrich_row(index, row))
                .catch_unwind()
                .await
            {
                Ok(Some(species)) => processed.push(species),
                Ok(None) => stats.dropped += 1,
                Err(_) => {
                    error!(
                        "处理第 {} 行时发生意外错误，停止处理并返回已完成的 {} 行",
                        index + 1,
                        processed.len()
                    );
                    break;
                }
            }
        }

        stats.emitted = processed.len();
        info!(
            "✓ 补全完成: 输入 {} 行, 输出 {} 行, 丢弃 {} 行",
            stats.total, stats.emitted, stats.dropped
        );
        (processed, stats)
    }

    async fn enrich_row(&self, index: usize, row: &RawRow) -> Option<SpeciesRow> {
        let Some(scientific_name) = raw_value(row, &[COL_SCIENTIFIC_NAME]) else {
            warn!("第 {} 行缺少 scientific_name，已丢弃", index + 1);
            return None;
        };

        // 查询时去除空白，输出保留原值
        let query_name = scientific_name.trim();
        let reference_url = self.resolve_reference_url(query_name, row).await;
        let attribution = self.resolve_attribution(query_name, row).await;

        Some(SpeciesRow {
            scientific_name: scientific_name.to_string(),
            common_name: or_not_available(raw_value(row, &[COL_COMMON_NAME])),
            image_url: or_not_available(raw_value(row, &[COL_IMAGE_URL])),
            reference_url,
            attribution,
        })
    }

    async fn resolve_reference_url(&self, scientific_name: &str, row: &RawRow) -> String {
        if let Some(existing) = present_value(row, COL_REFERENCE_URL) {
            return existing.to_string();
        }

        match self.lookup.find_taxon_id(scientific_name).await {
            Ok(taxon_id) => taxon_page_url(&self.site_url, taxon_id),
            Err(e) => {
                log_lookup_miss("taxon", scientific_name, &e);
                NOT_AVAILABLE.to_string()
            }
        }
    }

    async fn resolve_attribution(&self, scientific_name: &str, row: &RawRow) -> String {
        if let Some(existing) = present_value(row, &[COL_ATTRIBUTION]) {
            return existing.to_string();
        }

        let Some(observation_url) = raw_value(row, COL_OBSERVATION_URL) else {
            return NOT_AVAILABLE.to_string();
        };

        match self.lookup.find_observation(observation_url).await {
            Ok(details) => details
                .first_photo_attribution()
                .flatten()
                .unwrap_or(NOT_AVAILABLE)
                .to_string(),
            Err(e) => {
                log_lookup_miss("observation", scientific_name, &e);
                NOT_AVAILABLE.to_string()
            }
        }
    }
}

fn or_not_available(value: Option<&str>) -> String {
    value.unwrap_or(NOT_AVAILABLE).to_string()
}

fn log_lookup_miss(kind: &str, scientific_name: &str, err: &LookupError) {
    if err.is_not_found() {
        debug!("[{}] {} 查询无结果", kind, scientific_name);
    } else {
        warn!("[{}] {} 查询失败: {}", kind, scientific_name, err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LookupResult;
    use crate::models::ObservationDetails;
    use crate::models::ObservationPhoto;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const SITE: &str = "https://www.inaturalist.org";

    /// 可控的查询替身
    #[derive(Default)]
    struct FakeLookup {
        taxon_id: Option<u64>,
        attribution: Option<&'static str>,
        fail_transport: bool,
        panic_on: Option<&'static str>,
        taxon_calls: AtomicUsize,
        observation_calls: AtomicUsize,
    }

    #[async_trait]
    impl SpeciesLookup for FakeLookup {
        async fn find_taxon_id(&self, scientific_name: &str) -> LookupResult<u64> {
            self.taxon_calls.fetch_add(1, Ordering::SeqCst);
            if self.panic_on == Some(scientific_name) {
                panic!("unexpected failure for {}", scientific_name);
            }
            if self.fail_transport {
                return Err(LookupError::Status {
                    endpoint: "/taxa".to_string(),
                    status: 500,
                });
            }
            self.taxon_id.ok_or_else(|| LookupError::NotFound {
                query: scientific_name.to_string(),
            })
        }

        async fn find_observation(&self, observation_url: &str) -> LookupResult<ObservationDetails> {
            self.observation_calls.fetch_add(1, Ordering::SeqCst);
            match self.attribution {
                Some(attribution) => Ok(ObservationDetails {
                    id: Some(1),
                    photos: vec![ObservationPhoto {
                        attribution: Some(attribution.to_string()),
                        url: None,
                    }],
                }),
                None => Err(LookupError::NotFound {
                    query: observation_url.to_string(),
                }),
            }
        }
    }

    fn row(pairs: &[(&str, &str)]) -> RawRow {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_rows_without_name_are_dropped() {
        let enricher = RowEnricher::new(FakeLookup::default(), SITE);
        let rows = vec![
            row(&[]),
            row(&[("scientific_name", "Amanita muscaria")]),
            row(&[("scientific_name", "   "), ("common_name", "nothing")]),
        ];

        let (out, stats) = enricher.enrich_with_stats(&rows).await;

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].scientific_name, "Amanita muscaria");
        assert_eq!(stats.dropped, 2);
        assert_eq!(stats.emitted, 1);
    }

    #[tokio::test]
    async fn test_all_lookups_absent_yields_not_available() {
        let enricher = RowEnricher::new(FakeLookup::default(), SITE);
        let rows = vec![
            row(&[
                ("scientific_name", "Amanita muscaria"),
                ("url", "https://www.inaturalist.org/observations/1"),
            ]),
            row(&[("scientific_name", "Boletus edulis")]),
        ];

        let out = enricher.enrich(&rows).await;

        assert_eq!(out.len(), 2);
        for species in &out {
            assert_eq!(species.reference_url, NOT_AVAILABLE);
            assert_eq!(species.attribution, NOT_AVAILABLE);
            assert_eq!(species.common_name, NOT_AVAILABLE);
            assert_eq!(species.image_url, NOT_AVAILABLE);
        }
        // 没有 url 的行不会查询观察记录
        assert_eq!(enricher.lookup().observation_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_transport_errors_only_affect_the_field() {
        let lookup = FakeLookup {
            fail_transport: true,
            attribution: Some("(c) Jane Doe, some rights reserved (CC BY)"),
            ..Default::default()
        };
        let enricher = RowEnricher::new(lookup, SITE);
        let rows = vec![row(&[
            ("scientific_name", "Amanita muscaria"),
            ("url", "https://www.inaturalist.org/observations/1"),
        ])];

        let out = enricher.enrich(&rows).await;

        assert_eq!(out[0].reference_url, NOT_AVAILABLE);
        assert_eq!(
            out[0].attribution,
            "(c) Jane Doe, some rights reserved (CC BY)"
        );
    }

    #[tokio::test]
    async fn test_fills_reference_url_and_attribution() {
        let lookup = FakeLookup {
            taxon_id: Some(48715),
            attribution: Some("(c) someone"),
            ..Default::default()
        };
        let enricher = RowEnricher::new(lookup, SITE);
        let rows = vec![row(&[
            ("scientific_name", "Amanita muscaria"),
            ("common_name", "Fly agaric"),
            ("image_url", "https://static.inaturalist.org/photos/1/medium.jpg"),
            ("taxa_url", "N/A"),
            ("attribution", "N/A"),
            ("url", "https://www.inaturalist.org/observations/1"),
            ("observed_on", "2024-05-01"),
        ])];

        let out = enricher.enrich(&rows).await;

        assert_eq!(
            out,
            vec![SpeciesRow {
                scientific_name: "Amanita muscaria".to_string(),
                common_name: "Fly agaric".to_string(),
                image_url: "https://static.inaturalist.org/photos/1/medium.jpg".to_string(),
                reference_url: "https://www.inaturalist.org/taxa/48715".to_string(),
                attribution: "(c) someone".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_existing_values_skip_lookups() {
        let lookup = FakeLookup {
            taxon_id: Some(1),
            attribution: Some("should not be used"),
            ..Default::default()
        };
        let enricher = RowEnricher::new(lookup, SITE);
        let rows = vec![row(&[
            ("scientific_name", "Amanita muscaria"),
            ("reference_url", "https://example/already-set"),
            ("attribution", "(c) original"),
            ("url", "https://www.inaturalist.org/observations/1"),
        ])];

        let out = enricher.enrich(&rows).await;

        assert_eq!(out[0].reference_url, "https://example/already-set");
        assert_eq!(out[0].attribution, "(c) original");
        assert_eq!(enricher.lookup().taxon_calls.load(Ordering::SeqCst), 0);
        assert_eq!(enricher.lookup().observation_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_sentinel_reference_url_falls_back_to_legacy_column() {
        let lookup = FakeLookup {
            taxon_id: Some(1),
            ..Default::default()
        };
        let enricher = RowEnricher::new(lookup, SITE);
        let rows = vec![row(&[
            ("scientific_name", "Amanita muscaria"),
            ("reference_url", "N/A"),
            ("taxa_url", "https://www.inaturalist.org/taxa/48715"),
        ])];

        let out = enricher.enrich(&rows).await;

        assert_eq!(out[0].reference_url, "https://www.inaturalist.org/taxa/48715");
        assert_eq!(enricher.lookup().taxon_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_existing_values_are_kept_verbatim() {
        let enricher = RowEnricher::new(FakeLookup::default(), SITE);
        let rows = vec![row(&[
            ("scientific_name", "Amanita muscaria"),
            ("reference_url", " https://example/with-spaces "),
            ("attribution", "(c) Jane Doe  "),
        ])];

        let out = enricher.enrich(&rows).await;

        assert_eq!(out[0].reference_url, " https://example/with-spaces ");
        assert_eq!(out[0].attribution, "(c) Jane Doe  ");
        assert_eq!(enricher.lookup().taxon_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_observation_without_photos() {
        struct NoPhotos;

        #[async_trait]
        impl SpeciesLookup for NoPhotos {
            async fn find_taxon_id(&self, _: &str) -> LookupResult<u64> {
                Ok(5)
            }

            async fn find_observation(&self, _: &str) -> LookupResult<ObservationDetails> {
                Ok(ObservationDetails::default())
            }
        }

        let enricher = RowEnricher::new(NoPhotos, SITE);
        let rows = vec![row(&[
            ("scientific_name", "Boletus edulis"),
            ("url", "https://www.inaturalist.org/observations/9"),
        ])];

        let out = enricher.enrich(&rows).await;
        assert_eq!(out[0].attribution, NOT_AVAILABLE);
        assert_eq!(out[0].reference_url, "https://www.inaturalist.org/taxa/5");
    }

    #[tokio::test]
    async fn test_panic_returns_rows_processed_so_far() {
        let lookup = FakeLookup {
            panic_on: Some("Boom boom"),
            ..Default::default()
        };
        let enricher = RowEnricher::new(lookup, SITE);
        let rows = vec![
            row(&[("scientific_name", "Amanita muscaria")]),
            row(&[("scientific_name", "Boletus edulis")]),
            row(&[("scientific_name", "Boom boom")]),
            row(&[("scientific_name", "Trametes versicolor")]),
        ];

        let out = enricher.enrich(&rows).await;

        let names: Vec<_> = out.iter().map(|r| r.scientific_name.as_str()).collect();
        assert_eq!(names, vec!["Amanita muscaria", "Boletus edulis"]);
    }
}
