/// iNaturalist API 客户端
///
/// 封装分类搜索和观察记录查询，不持有任何状态
use crate::config::Config;
use crate::error::{LookupError, LookupResult};
use crate::models::inat::{ObservationDetails, ObservationResponse, TaxaResponse};
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::debug;

use super::SpeciesLookup;

static OBSERVATION_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[^?#]*/)?(\d+)/?(?:[?#].*)?$").expect("observation id pattern")
});

/// iNaturalist 客户端
#[derive(Debug, Clone)]
pub struct INaturalistClient {
    http: Client,
    api_base_url: String,
    site_url: String,
}

impl INaturalistClient {
    /// 创建新的 iNaturalist 客户端
    pub fn new(config: &Config) -> reqwest::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            api_base_url: config.inat_api_base_url.trim_end_matches('/').to_string(),
            site_url: config.inat_site_url.trim_end_matches('/').to_string(),
        })
    }

    /// 由分类 ID 构造页面链接
    pub fn taxon_url(&self, taxon_id: u64) -> String {
        taxon_page_url(&self.site_url, taxon_id)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> LookupResult<T> {
        let url = format!("{}{}", self.api_base_url, endpoint);
        debug!("GET {} {:?}", url, query);

        let response = self
            .http
            .get(&url)
            .query(query)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|source| LookupError::Transport {
                endpoint: endpoint.to_string(),
                source,
            })?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(LookupError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| LookupError::Transport {
                endpoint: endpoint.to_string(),
                source,
            })?;

        serde_json::from_slice(&body).map_err(|source| LookupError::Malformed {
            endpoint: endpoint.to_string(),
            source,
        })
    }
}

#[async_trait]
impl SpeciesLookup for INaturalistClient {
    async fn find_taxon_id(&self, scientific_name: &str) -> LookupResult<u64> {
        let response: TaxaResponse = self
            .get_json("/taxa", &[("q", scientific_name), ("rank", "species")])
            .await?;

        response
            .results
            .first()
            .map(|taxon| taxon.id)
            .ok_or_else(|| LookupError::NotFound {
                query: scientific_name.to_string(),
            })
    }

    async fn find_observation(&self, observation_url: &str) -> LookupResult<ObservationDetails> {
        let observation_id = observation_id_from_url(observation_url)?;
        let endpoint = format!("/observations/{}", observation_id);

        let response: ObservationResponse = self.get_json(&endpoint, &[]).await?;

        response
            .results
            .into_iter()
            .next()
            .ok_or(LookupError::NotFound {
                query: observation_url.to_string(),
            })
    }
}

/// 从观察记录 URL 中取出末尾的数字 ID
///
/// 允许末尾斜杠和查询参数：`.../observations/123/?tab=photos` → `123`；
/// 只有 ID 本身（`123`）也可以
pub fn observation_id_from_url(observation_url: &str) -> LookupResult<u64> {
    OBSERVATION_ID
        .captures(observation_url.trim())
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .ok_or_else(|| LookupError::InvalidUrl {
            url: observation_url.to_string(),
        })
}

pub fn taxon_page_url(site_url: &str, taxon_id: u64) -> String {
    format!("{}/taxa/{}", site_url.trim_end_matches('/'), taxon_id)
}
