//! # Species Flashcards
//!
//! 物种识别卡片的后端核心：补全卡片数据、缓存学名发音
//!
//! ## 架构设计
//!
//! ### ① 外部服务层（Clients）
//! - `clients/` - 只负责请求 / 响应，不持有状态
//! - `INaturalistClient` - 分类 ID 查询、观察记录查询
//! - `LlmClient` - 生成学名发音
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `PronunciationCache` - 发音的内存映射 + 只追加的 CSV 文件
//! - `PronunciationService` - 缓存 → 生成 → 写回
//! - `RowEnricher` - 补全 reference_url / attribution
//! - `check_answer` - 答案校验
//!
//! ### ③ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 应用生命周期、并发控制
//! - `orchestrator/file_processor` - 单个 CSV 文件的补全流程
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;

// 重新导出常用类型
pub use clients::{INaturalistClient, LlmClient, PronunciationGenerator, SpeciesLookup};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{RawRow, SpeciesRow, NOT_AVAILABLE};
pub use orchestrator::App;
pub use services::{PronunciationCache, PronunciationReply, PronunciationService, RowEnricher};
