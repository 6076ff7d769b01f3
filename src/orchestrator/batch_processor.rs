//! 批量文件处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责资源创建和批量处理。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：创建目录、打开发音缓存、创建外部服务客户端
//! 2. **批量补全**：扫描导入目录中的所有 CSV 文件
//! 3. **并发控制**：使用 Semaphore 限制同时处理的文件数量
//! 4. **发音查询**：委托 `PronunciationService`
//! 5. **有序退出**：没有并发写入时整体重写缓存文件
//!
//! ## 设计特点
//!
//! - **资源所有者**：唯一持有缓存和客户端的模块，其余模块只拿引用
//! - **向下委托**：委托 file_processor 处理单个文件

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::clients::{INaturalistClient, LlmClient};
use crate::config::Config;
use crate::error::AppResult;
use crate::models::list_csv_files;
use crate::orchestrator::file_processor;
use crate::services::{PronunciationCache, PronunciationReply, PronunciationService, RowEnricher};
use crate::utils::logging::{log_files_found, log_startup, print_final_stats};

/// 应用主结构
pub struct App {
    config: Config,
    cache: Arc<PronunciationCache>,
    enricher: Arc<RowEnricher<INaturalistClient>>,
    pronunciation: PronunciationService<LlmClient>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        config.init_directories()?;

        let cache_path = config.pronunciation_cache_file.clone();
        let cache = tokio::task::spawn_blocking(move || PronunciationCache::open(cache_path))
            .await
            .context("无法打开发音缓存")?;
        let cache = Arc::new(cache);

        let lookup = INaturalistClient::new(&config).context("无法创建 HTTP 客户端")?;
        let enricher = Arc::new(RowEnricher::new(lookup, config.inat_site_url.clone()));

        let llm = LlmClient::new(&config);
        log_startup(config.max_concurrent_files, cache.len(), llm.is_configured());
        let pronunciation = PronunciationService::new(Arc::clone(&cache), llm);

        Ok(Self {
            config,
            cache,
            enricher,
            pronunciation,
        })
    }

    /// 补全导入目录中的所有 CSV 文件
    pub async fn run(&self) -> Result<()> {
        info!("\n📁 正在扫描待处理的文件...");
        let files = list_csv_files(&self.config.import_dir).await;

        if files.is_empty() {
            warn!(
                "⚠️ {} 中没有找到待处理的 CSV 文件，程序结束",
                self.config.import_dir.display()
            );
            return Ok(());
        }

        log_files_found(files.len(), self.config.max_concurrent_files);

        let stats = self.process_all_files(files).await?;
        print_final_stats(stats.success, stats.failed, stats.total, stats.rows_written);

        Ok(())
    }

    /// 查询发音
    pub async fn pronounce(&self, scientific_name: &str) -> AppResult<PronunciationReply> {
        self.pronunciation.get_pronunciation(scientific_name).await
    }

    /// 有序退出：整体重写缓存文件，合并重复记录
    ///
    /// 调用时不能再有并发的发音请求。
    pub async fn shutdown(self) -> Result<()> {
        let cache = Arc::clone(&self.cache);
        drop(self);

        tokio::task::spawn_blocking(move || cache.rewrite_all())
            .await
            .context("缓存写回任务失败")?
            .context("缓存写回失败")?;
        Ok(())
    }

    /// 处理所有文件
    async fn process_all_files(&self, files: Vec<String>) -> Result<ProcessingStats> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_files.max(1)));
        let mut stats = ProcessingStats {
            total: files.len(),
            ..Default::default()
        };

        let mut handles = Vec::new();
        for file_name in files {
            let permit = semaphore.clone().acquire_owned().await?;
            let enricher = Arc::clone(&self.enricher);
            let source = self.config.import_dir.join(&file_name);
            let destination = self.config.uploads_dir.join(&file_name);

            let handle = tokio::spawn(async move {
                let _permit = permit;
                file_processor::process_file(&enricher, &source, &destination).await
            });
            handles.push((file_name, handle));
        }

        // 等待所有任务完成
        for (file_name, handle) in handles {
            match handle.await {
                Ok(Ok(file_stats)) => {
                    stats.success += 1;
                    stats.rows_written += file_stats.emitted;
                }
                Ok(Err(e)) => {
                    error!("[{}] ❌ 处理过程中发生错误: {}", file_name, e);
                    stats.failed += 1;
                }
                Err(e) => {
                    error!("[{}] 任务执行失败: {}", file_name, e);
                    stats.failed += 1;
                }
            }
        }

        Ok(stats)
    }
}

/// 处理统计
#[derive(Debug, Default)]
struct ProcessingStats {
    success: usize,
    failed: usize,
    total: usize,
    rows_written: usize,
}
