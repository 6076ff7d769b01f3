/// 日志工具模块
///
/// 提供日志初始化和格式化输出的辅助函数
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 初始化 tracing 日志
///
/// 优先使用 `RUST_LOG`，否则按 `verbose` 选择 debug / info 级别。重复调用无副作用。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("species_flashcards={},warn", default_level)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(max_concurrent: usize, cached: usize, llm_enabled: bool) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 物种卡片补全");
    info!("📊 最大并发文件数: {}", max_concurrent);
    info!("📖 已缓存发音: {} 条", cached);
    info!(
        "🤖 发音生成: {}",
        if llm_enabled { "已启用" } else { "未启用" }
    );
    info!("{}", "=".repeat(60));
}

/// 记录待处理文件信息
pub fn log_files_found(total: usize, max_concurrent: usize) {
    info!("✓ 找到 {} 个待补全的 CSV 文件", total);
    info!("📋 最多同时处理 {} 个文件\n", max_concurrent);
}

/// 记录单个文件完成信息
pub fn log_file_complete(file_name: &str, emitted: usize, total: usize) {
    info!("{}", "─".repeat(60));
    info!("✓ {} 完成: 输出 {}/{} 行", file_name, emitted, total);
    info!("{}", "─".repeat(60));
}

/// 打印最终统计信息
pub fn print_final_stats(success: usize, failed: usize, total: usize, rows_written: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", success, total);
    info!("❌ 失败: {}", failed);
    info!("🃏 写出卡片: {} 张", rows_written);
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("Amanita", 10), "Amanita");
        assert_eq!(truncate_text("Amanita muscaria", 7), "Amanita...");
        // 按字符而不是字节截断
        assert_eq!(truncate_text("蘑菇蘑菇", 2), "蘑菇...");
    }
}
