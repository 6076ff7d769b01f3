//! 单个 CSV 文件处理器 - 编排层
//!
//! ## 处理流程
//!
//! 1. **读取**：按表头读取原始行
//! 2. **补全**：委托 `RowEnricher` 逐行补全
//! 3. **写出**：以同名文件写入上传目录
//! 4. **文件清理**：删除已处理的原始文件

use std::path::Path;
use tracing::{info, warn};

use crate::clients::SpeciesLookup;
use crate::error::AppResult;
use crate::models::{load_raw_rows, save_species_rows};
use crate::services::{EnrichStats, RowEnricher};
use crate::utils::logging::log_file_complete;

/// 处理单个原始 CSV 文件，返回补全统计
pub async fn process_file<L: SpeciesLookup>(
    enricher: &RowEnricher<L>,
    source: &Path,
    destination: &Path,
) -> AppResult<EnrichStats> {
    let file_name = source
        .file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();

    info!("📄 开始处理: {}", file_name);
    let raw_rows = load_raw_rows(source).await?;
    info!("[{}] 读取到 {} 行", file_name, raw_rows.len());

    let (rows, stats) = enricher.enrich_with_stats(&raw_rows).await;
    save_species_rows(destination, &rows).await?;

    cleanup_file(source, &file_name).await;
    log_file_complete(&file_name, stats.emitted, stats.total);

    Ok(stats)
}

/// 删除已处理的原始文件，失败只记录警告
async fn cleanup_file(source: &Path, file_name: &str) {
    match tokio::fs::remove_file(source).await {
        Ok(()) => info!("[{}] 🗑️ 原始文件已删除", file_name),
        Err(e) => warn!("[{}] 无法删除原始文件: {}", file_name, e),
    }
}
