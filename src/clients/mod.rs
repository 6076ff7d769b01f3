//! 外部服务客户端
//!
//! 每个客户端同时提供两层接口：
//! - `find_*` / `generate`：返回带类型的 `Result`，调用方可以区分"没有结果"和"请求出错"
//! - `lookup_*` / `generate_pronunciation`：把所有失败折叠为 `None`，永不向外报错

pub mod inat_client;
pub mod llm_client;

pub use inat_client::INaturalistClient;
pub use llm_client::LlmClient;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{GenerationResult, LookupError, LookupResult};
use crate::models::ObservationDetails;

/// 物种查询能力（分类 ID、观察记录）
#[async_trait]
pub trait SpeciesLookup: Send + Sync {
    /// 按学名查询 species 级分类 ID
    async fn find_taxon_id(&self, scientific_name: &str) -> LookupResult<u64>;

    /// 按观察记录 URL 查询详情
    async fn find_observation(&self, observation_url: &str) -> LookupResult<ObservationDetails>;

    async fn lookup_taxon_id(&self, scientific_name: &str) -> Option<u64> {
        collapse(self.find_taxon_id(scientific_name).await)
    }

    async fn lookup_observation(&self, observation_url: &str) -> Option<ObservationDetails> {
        collapse(self.find_observation(observation_url).await)
    }
}

/// 发音文本生成能力
#[async_trait]
pub trait PronunciationGenerator: Send + Sync {
    async fn generate(&self, scientific_name: &str) -> GenerationResult<String>;

    async fn generate_pronunciation(&self, scientific_name: &str) -> Option<String> {
        match self.generate(scientific_name).await {
            Ok(text) => Some(text),
            Err(e) => {
                warn!("生成发音失败 ({}): {}", scientific_name, e);
                None
            }
        }
    }
}

fn collapse<T>(result: LookupResult<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(LookupError::NotFound { query }) => {
            debug!("未找到结果: {}", query);
            None
        }
        Err(e) => {
            warn!("{}", e);
            None
        }
    }
}
