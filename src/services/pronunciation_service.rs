//! 发音服务 - 业务能力层
//!
//! 先查缓存，未命中时调用 LLM 生成，并写回缓存（内存 + 文件）

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::clients::PronunciationGenerator;
use crate::error::{AppResult, BusinessError};
use crate::services::pronunciation_cache::PronunciationCache;
use crate::utils::logging::truncate_text;

pub const FALLBACK_WARNING: &str = "Using fallback pronunciation";
pub const NOT_CACHED_WARNING: &str = "Pronunciation generated but not cached";

/// 发音查询结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PronunciationReply {
    pub pronunciation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl PronunciationReply {
    fn ok(pronunciation: impl Into<String>) -> Self {
        Self {
            pronunciation: pronunciation.into(),
            warning: None,
        }
    }

    fn with_warning(pronunciation: impl Into<String>, warning: &str) -> Self {
        Self {
            pronunciation: pronunciation.into(),
            warning: Some(warning.to_string()),
        }
    }
}

/// 生成服务不可用时的提示文本
pub fn fallback_pronunciation(scientific_name: &str) -> String {
    format!(
        "Pronunciation for {} is unavailable. Please try again later.",
        scientific_name
    )
}

/// 发音服务
pub struct PronunciationService<G> {
    cache: Arc<PronunciationCache>,
    generator: G,
}

impl<G: PronunciationGenerator> PronunciationService<G> {
    pub fn new(cache: Arc<PronunciationCache>, generator: G) -> Self {
        Self { cache, generator }
    }

    pub fn cache(&self) -> &Arc<PronunciationCache> {
        &self.cache
    }

    /// 查询学名的发音
    ///
    /// 只有学名为空时返回错误；生成失败或写文件失败都以 `warning` 的形式返回。
    /// 学名原样作为缓存键，不做任何规范化。
    pub async fn get_pronunciation(&self, scientific_name: &str) -> AppResult<PronunciationReply> {
        if scientific_name.trim().is_empty() {
            return Err(BusinessError::EmptyScientificName.into());
        }

        // 空的缓存值视为未命中
        if let Some(cached) = self.cache.get(scientific_name).filter(|text| !text.is_empty()) {
            debug!("发音缓存命中: {}", scientific_name);
            return Ok(PronunciationReply::ok(cached));
        }

        let Some(pronunciation) = self.generator.generate_pronunciation(scientific_name).await
        else {
            warn!("LLM 不可用，使用兜底发音: {}", scientific_name);
            return Ok(PronunciationReply::with_warning(
                fallback_pronunciation(scientific_name),
                FALLBACK_WARNING,
            ));
        };

        debug!("生成发音: {} -> {}", scientific_name, truncate_text(&pronunciation, 60));
        self.cache.add(scientific_name, &pronunciation);

        if self.persist(scientific_name, &pronunciation).await {
            Ok(PronunciationReply::ok(pronunciation))
        } else {
            warn!("发音未能写入缓存文件: {}", scientific_name);
            Ok(PronunciationReply::with_warning(
                pronunciation,
                NOT_CACHED_WARNING,
            ))
        }
    }

    async fn persist(&self, scientific_name: &str, pronunciation: &str) -> bool {
        let cache = Arc::clone(&self.cache);
        let name = scientific_name.to_string();
        let text = pronunciation.to_string();

        match tokio::task::spawn_blocking(move || cache.append_persist(&name, &text)).await {
            Ok(saved) => saved,
            Err(e) => {
                error!("写入缓存任务失败: {}", e);
                false
            }
        }
    }
}
