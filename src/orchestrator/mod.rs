//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 应用入口
//! - 管理应用生命周期（初始化、运行、有序退出）
//! - 持有发音缓存和外部服务客户端
//! - 控制并发数量（Semaphore）
//!
//! ### `file_processor` - 单个文件处理器
//! - 读取 → 补全 → 写出 → 清理
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<文件>)
//!     ↓
//! file_processor (处理 Vec<RawRow>)
//!     ↓
//! services (能力层：enrich / pronounce / cache)
//!     ↓
//! clients (外部服务：iNaturalist / LLM)
//! ```

pub mod batch_processor;
pub mod file_processor;

pub use batch_processor::App;
pub use file_processor::process_file;
