use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 物种查询错误
    #[error("查询错误: {0}")]
    Lookup(#[from] LookupError),
    /// 文本生成错误
    #[error("生成错误: {0}")]
    Generation(#[from] GenerationError),
    /// 发音缓存错误
    #[error("缓存错误: {0}")]
    Cache(#[from] CacheError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 业务逻辑错误
    #[error("业务错误: {0}")]
    Business(#[from] BusinessError),
}

/// iNaturalist 查询错误
///
/// `NotFound` 表示服务正常但没有结果，其余变体都是传输层或数据层的问题。
/// 对外的 `lookup_*` 接口会把它们统一折叠为 `None`。
#[derive(Debug, Error)]
pub enum LookupError {
    /// 没有匹配结果
    #[error("未找到结果: {query}")]
    NotFound { query: String },
    /// 观察记录 URL 无法解析出 ID
    #[error("无效的观察记录 URL: '{url}'")]
    InvalidUrl { url: String },
    /// 网络请求失败
    #[error("请求失败 ({endpoint}): {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    /// 非 200 响应
    #[error("响应状态异常 ({endpoint}): {status}")]
    Status { endpoint: String, status: u16 },
    /// 响应体格式错误
    #[error("响应解析失败 ({endpoint}): {source}")]
    Malformed {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },
}

impl LookupError {
    /// 是否只是"没有结果"，而不是请求本身出错
    pub fn is_not_found(&self) -> bool {
        matches!(self, LookupError::NotFound { .. })
    }
}

/// 文本生成（LLM）错误
#[derive(Debug, Error)]
pub enum GenerationError {
    /// 未配置 API 密钥
    #[error("LLM 客户端未配置")]
    NotConfigured,
    /// API 调用失败
    #[error("LLM API 调用失败 (模型: {model}): {source}")]
    Request {
        model: String,
        #[source]
        source: async_openai::error::OpenAIError,
    },
    /// 返回内容为空
    #[error("LLM 返回内容为空 (模型: {model})")]
    EmptyContent { model: String },
}

/// 发音缓存文件错误
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("缓存文件 I/O 失败 ({path}): {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("缓存文件 CSV 处理失败 ({path}): {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
    /// 文件锁获取失败
    #[error("无法锁定缓存文件 ({path}): {source}")]
    Lock {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 文件不存在
    #[error("文件不存在: {path}")]
    NotFound { path: String },
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: csv::Error,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: csv::Error,
    },
    /// 缺少必需的列
    #[error("缺少必需的列 ({path}): {column}")]
    MissingColumn { path: String, column: String },
}

/// 业务逻辑错误
#[derive(Debug, Error)]
pub enum BusinessError {
    /// 学名为空
    #[error("Scientific name is required")]
    EmptyScientificName,
    /// 答案为空
    #[error("Answer is required")]
    EmptyAnswer,
    /// 卡片数据无效
    #[error("Invalid card data received.")]
    InvalidCard,
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 是否属于调用方输入错误（对应 HTTP 层的 4xx）
    pub fn is_client_error(&self) -> bool {
        matches!(self, AppError::Business(_))
    }

    /// 创建文件读取错误
    pub fn file_read_failed(path: impl Into<String>, source: csv::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source,
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(path: impl Into<String>, source: csv::Error) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source,
        })
    }
}

impl CacheError {
    pub(crate) fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        CacheError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn csv(path: impl Into<String>, source: csv::Error) -> Self {
        CacheError::Csv {
            path: path.into(),
            source,
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

/// 查询结果类型
pub type LookupResult<T> = Result<T, LookupError>;

/// 生成结果类型
pub type GenerationResult<T> = Result<T, GenerationError>;

/// 缓存操作结果类型
pub type CacheResult<T> = Result<T, CacheError>;
