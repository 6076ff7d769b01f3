use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// 程序配置
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 数据根目录
    pub data_dir: PathBuf,
    /// 内置物种卡片目录
    pub species_data_dir: PathBuf,
    /// 已处理的上传卡片目录
    pub uploads_dir: PathBuf,
    /// 待导入（待补全）的原始 CSV 目录
    pub import_dir: PathBuf,
    /// 发音缓存文件
    pub pronunciation_cache_file: PathBuf,
    /// 同时处理的 CSV 文件数量
    pub max_concurrent_files: usize,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    // --- iNaturalist 配置 ---
    pub inat_api_base_url: String,
    pub inat_site_url: String,
    pub http_timeout_secs: u64,
    // --- LLM 配置 ---
    /// 未设置时发音生成功能停用
    pub llm_api_key: Option<String>,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = PathBuf::from("data");
        Self {
            species_data_dir: data_dir.join("mmaforays"),
            uploads_dir: data_dir.join("uploads"),
            import_dir: data_dir.join("incoming"),
            pronunciation_cache_file: data_dir.join("pronounce.csv"),
            data_dir,
            max_concurrent_files: 4,
            verbose_logging: false,
            inat_api_base_url: "https://api.inaturalist.org/v1".to_string(),
            inat_site_url: "https://www.inaturalist.org".to_string(),
            http_timeout_secs: 30,
            llm_api_key: None,
            llm_api_base_url: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            llm_model_name: "gemini-1.5-flash-latest".to_string(),
        }
    }
}

impl Config {
    /// 读取配置：先读可选的 TOML 文件（`FLASHCARDS_CONFIG`），再用环境变量覆盖
    pub fn load() -> Result<Self> {
        let base = match std::env::var("FLASHCARDS_CONFIG") {
            Ok(path) => Self::from_toml_file(&path)?,
            Err(_) => Self::default(),
        };
        Ok(base.with_env_overrides())
    }

    /// 只从环境变量读取配置
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// 从 TOML 文件读取配置，缺省字段使用默认值
    pub fn from_toml_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("无法读取配置文件: {}", path))?;
        Self::from_toml_str(&content).with_context(|| format!("无法解析配置文件: {}", path))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    fn with_env_overrides(self) -> Self {
        Self {
            data_dir: env_path("DATA_DIR").unwrap_or(self.data_dir),
            species_data_dir: env_path("SPECIES_DATA_DIR").unwrap_or(self.species_data_dir),
            uploads_dir: env_path("UPLOADS_DIR").unwrap_or(self.uploads_dir),
            import_dir: env_path("IMPORT_DIR").unwrap_or(self.import_dir),
            pronunciation_cache_file: env_path("PRONUNCIATION_CACHE_FILE").unwrap_or(self.pronunciation_cache_file),
            max_concurrent_files: std::env::var("MAX_CONCURRENT_FILES").ok().and_then(|v| v.parse().ok()).unwrap_or(self.max_concurrent_files),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(self.verbose_logging),
            inat_api_base_url: std::env::var("INAT_API_BASE_URL").unwrap_or(self.inat_api_base_url),
            inat_site_url: std::env::var("INAT_SITE_URL").unwrap_or(self.inat_site_url),
            http_timeout_secs: std::env::var("HTTP_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(self.http_timeout_secs),
            llm_api_key: std::env::var("GEMINI_API_KEY")
                .or_else(|_| std::env::var("LLM_API_KEY"))
                .ok()
                .filter(|key| !key.trim().is_empty())
                .or(self.llm_api_key),
            llm_api_base_url: std::env::var("LLM_API_BASE_URL").unwrap_or(self.llm_api_base_url),
            llm_model_name: std::env::var("LLM_MODEL_NAME").unwrap_or(self.llm_model_name),
        }
    }

    /// 创建所有需要的目录
    pub fn init_directories(&self) -> Result<()> {
        for dir in [&self.species_data_dir, &self.uploads_dir, &self.import_dir] {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("无法创建目录: {}", dir.display()))?;
        }
        Ok(())
    }
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var(name).ok().map(PathBuf::from)
}
