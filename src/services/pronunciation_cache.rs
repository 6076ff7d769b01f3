//! 发音缓存 - 业务能力层
//!
//! 学名 → 发音文本的持久化映射。内存中的 `HashMap` 是权威数据，
//! 磁盘上是只追加的 CSV 文件（表头 `scientific_name,pronunciation`）。
//!
//! ## 文件写入约定
//! - `append_persist`：每次写一条记录，写入期间持有整个文件的排他锁（flock），
//!   多线程 / 多进程并发追加是安全的
//! - `rewrite_all`：整体覆盖文件，**不**与追加互斥，只能在没有并发请求时调用（例如退出前）
//!
//! 文件中可能残留同一学名的多条记录，加载时以最后一条为准，下次整体重写时消除。

use crate::error::{CacheError, CacheResult};
use fs2::FileExt;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use tracing::{debug, error, info, warn};

/// 缓存文件表头
pub const CACHE_HEADER: [&str; 2] = ["scientific_name", "pronunciation"];
const CACHE_HEADER_LINE: &str = "scientific_name,pronunciation";

/// 发音缓存
///
/// 由调用方显式创建并持有（通常包在 `Arc` 里共享给各个请求）。
/// 同一个缓存文件只应由一个 `PronunciationCache` 负责整体重写。
pub struct PronunciationCache {
    path: PathBuf,
    entries: RwLock<HashMap<String, String>>,
}

impl PronunciationCache {
    /// 打开缓存：校验文件表头（缺失或损坏时重建），然后加载所有记录
    ///
    /// 重建文件时原有内容被丢弃，缓存从空开始。
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let recreated = ensure_cache_file(&path);
        let entries = if recreated {
            HashMap::new()
        } else {
            Self::load(&path)
        };

        info!(
            "📖 发音缓存已加载: {} 条记录 ({})",
            entries.len(),
            path.display()
        );

        Self {
            path,
            entries: RwLock::new(entries),
        }
    }

    /// 从文件读取所有记录
    ///
    /// 跳过表头、字段数不为 2 的行和学名或发音为空的行；同一学名出现多次时最后一条生效。
    /// 文件不存在或读取失败时返回空映射（失败会记录日志）。
    pub fn load(path: &Path) -> HashMap<String, String> {
        if !path.exists() {
            return HashMap::new();
        }

        match read_entries(path) {
            Ok(entries) => entries,
            Err(e) => {
                error!("加载发音缓存失败: {}", e);
                HashMap::new()
            }
        }
    }

    /// 确保缓存文件存在且表头正确，返回是否重建了文件
    pub fn ensure_file(&self) -> bool {
        ensure_cache_file(&self.path)
    }

    /// 查询内存中的发音
    pub fn get(&self, scientific_name: &str) -> Option<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(scientific_name)
            .cloned()
    }

    /// 写入内存（不落盘）
    pub fn add(&self, scientific_name: &str, pronunciation: &str) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(scientific_name.to_string(), pronunciation.to_string());
    }

    /// 追加一条记录到缓存文件
    ///
    /// 返回是否写入成功，失败只记录日志，不向外报错。
    pub fn append_persist(&self, scientific_name: &str, pronunciation: &str) -> bool {
        match self.try_append(scientific_name, pronunciation) {
            Ok(()) => {
                info!("✓ 已将 {} 的发音写入缓存文件", scientific_name);
                true
            }
            Err(e) => {
                error!("写入发音缓存失败 ({}): {}", scientific_name, e);
                false
            }
        }
    }

    fn try_append(&self, scientific_name: &str, pronunciation: &str) -> CacheResult<()> {
        // 表头修复不在追加锁的范围内
        if !matches!(header_is_valid(&self.path), Ok(true)) {
            warn!("发音缓存文件缺失或表头异常，重新创建");
            ensure_cache_file(&self.path);
        }

        let record = encode_record(&[scientific_name, pronunciation])
            .map_err(|e| CacheError::csv(self.path_str(), e))?;

        let file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|e| CacheError::io(self.path_str(), e))?;

        let mut locked = LockedFile::lock(file, &self.path)?;
        locked
            .write_all(&record)
            .and_then(|()| locked.flush())
            .map_err(|e| CacheError::io(self.path_str(), e))?;

        Ok(())
    }

    /// 用内存中的全部记录覆盖缓存文件
    ///
    /// 与 `append_persist` 不互斥，调用方需保证期间没有并发写入。
    /// 记录顺序不固定。
    pub fn rewrite_all(&self) -> CacheResult<()> {
        let snapshot: Vec<(String, String)> = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(name, pronunciation)| (name.clone(), pronunciation.clone()))
            .collect();

        let file = File::create(&self.path).map_err(|e| CacheError::io(self.path_str(), e))?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        writer
            .write_record(CACHE_HEADER)
            .map_err(|e| CacheError::csv(self.path_str(), e))?;
        for (name, pronunciation) in &snapshot {
            writer
                .write_record([name.as_str(), pronunciation.as_str()])
                .map_err(|e| CacheError::csv(self.path_str(), e))?;
        }
        writer
            .flush()
            .map_err(|e| CacheError::io(self.path_str(), e))?;

        info!(
            "💾 发音缓存已整体写回: {} 条记录 ({})",
            snapshot.len(),
            self.path.display()
        );
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn path_str(&self) -> String {
        self.path.display().to_string()
    }
}

/// 持有排他锁的文件，drop 时解锁
struct LockedFile {
    file: File,
}

impl LockedFile {
    fn lock(file: File, path: &Path) -> CacheResult<Self> {
        file.lock_exclusive().map_err(|source| CacheError::Lock {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self { file })
    }
}

impl Write for LockedFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Drop for LockedFile {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

/// 文件缺失或表头不对时重建为只有表头的文件，返回是否重建
fn ensure_cache_file(path: &Path) -> bool {
    match header_is_valid(path) {
        Ok(true) => return false,
        Ok(false) => warn!("发音缓存文件表头异常，重新创建: {}", path.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("发音缓存文件不存在: {}", path.display())
        }
        Err(e) => error!("读取发音缓存文件失败 ({}): {}", path.display(), e),
    }

    match write_header_only(path) {
        Ok(()) => info!("已创建新的发音缓存文件: {}", path.display()),
        Err(e) => error!("初始化发音缓存文件失败: {}", e),
    }
    true
}

fn write_header_only(path: &Path) -> CacheResult<()> {
    let path_str = path.display().to_string();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| CacheError::io(&path_str, e))?;
    }

    let header = encode_record(&CACHE_HEADER).map_err(|e| CacheError::csv(&path_str, e))?;
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .map_err(|e| CacheError::io(&path_str, e))?;

    // 截断也在锁内完成
    let mut locked = LockedFile::lock(file, path)?;
    locked
        .file
        .set_len(0)
        .and_then(|()| locked.write_all(&header))
        .and_then(|()| locked.flush())
        .map_err(|e| CacheError::io(&path_str, e))
}

fn header_is_valid(path: &Path) -> io::Result<bool> {
    let mut first_line = String::new();
    BufReader::new(File::open(path)?).read_line(&mut first_line)?;
    Ok(first_line.trim() == CACHE_HEADER_LINE)
}

fn read_entries(path: &Path) -> CacheResult<HashMap<String, String>> {
    let path_str = path.display().to_string();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| CacheError::csv(&path_str, e))?;

    let mut entries = HashMap::new();
    for record in reader.records() {
        let record = record.map_err(|e| CacheError::csv(&path_str, e))?;
        if record.len() != 2 || record[0].is_empty() || record[1].is_empty() {
            debug!("跳过无效的缓存记录: {:?}", record);
            continue;
        }
        entries.insert(record[0].to_string(), record[1].to_string());
    }
    Ok(entries)
}

/// 编码单条 CSV 记录（标准引号转义，逗号和换行会被加引号）
fn encode_record(fields: &[&str]) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(fields)?;
    writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn cache_path(dir: &tempfile::TempDir) -> PathBuf {
        dir.path().join("data").join("pronounce.csv")
    }

    #[test]
    fn test_open_creates_header_only_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = cache_path(&dir);

        let cache = PronunciationCache::open(&path);

        assert!(cache.is_empty());
        assert_eq!(
            fs::read_to_string(&path).unwrap().trim(),
            "scientific_name,pronunciation"
        );
    }

    #[test]
    fn test_get_is_idempotent_and_add_is_visible() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PronunciationCache::open(cache_path(&dir));

        assert_eq!(cache.get("Amanita muscaria"), None);
        cache.add("Amanita muscaria", "am-uh-NY-tuh mus-KAIR-ee-uh");
        assert_eq!(
            cache.get("Amanita muscaria").as_deref(),
            Some("am-uh-NY-tuh mus-KAIR-ee-uh")
        );
        assert_eq!(cache.get("Amanita muscaria"), cache.get("Amanita muscaria"));

        cache.add("Amanita muscaria", "second");
        assert_eq!(cache.get("Amanita muscaria").as_deref(), Some("second"));
        // 键区分大小写
        assert_eq!(cache.get("amanita muscaria"), None);
    }

    #[test]
    fn test_append_is_durable() {
        let dir = tempfile::tempdir().unwrap();
        let path = cache_path(&dir);
        let cache = PronunciationCache::open(&path);

        assert!(cache.append_persist("Trametes versicolor", "tra-MEE-teez"));

        let reloaded = PronunciationCache::load(&path);
        assert_eq!(
            reloaded.get("Trametes versicolor").map(String::as_str),
            Some("tra-MEE-teez")
        );
        // append 不改变内存
        assert_eq!(cache.get("Trametes versicolor"), None);
    }

    #[test]
    fn test_load_last_record_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = cache_path(&dir);
        let cache = PronunciationCache::open(&path);

        assert!(cache.append_persist("Amanita muscaria", "old"));
        assert!(cache.append_persist("Amanita muscaria", "new"));

        let reopened = PronunciationCache::open(&path);
        assert_eq!(reopened.len(), 1);
        assert_eq!(reopened.get("Amanita muscaria").as_deref(), Some("new"));
    }

    #[test]
    fn test_load_skips_rows_with_wrong_arity() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pronounce.csv");
        fs::write(
            &path,
            "scientific_name,pronunciation\n\
             Amanita muscaria,am-uh-NY-tuh\n\
             lonely\n\
             a,b,c\n\
             Boletus edulis,boh-LEE-tus\n",
        )
        .unwrap();

        let cache = PronunciationCache::open(&path);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("Boletus edulis").as_deref(), Some("boh-LEE-tus"));
        assert_eq!(cache.get("lonely"), None);
    }

    #[test]
    fn test_load_skips_empty_pronunciation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pronounce.csv");
        fs::write(
            &path,
            "scientific_name,pronunciation\n\
             Amanita muscaria,\n\
             Boletus edulis,boh-LEE-tus\n",
        )
        .unwrap();

        let cache = PronunciationCache::open(&path);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("Amanita muscaria"), None);
    }

    #[test]
    fn test_corrupted_header_is_rebuilt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pronounce.csv");
        fs::write(&path, "name,text\nAmanita muscaria,am-uh-NY-tuh\n").unwrap();

        let cache = PronunciationCache::open(&path);

        assert!(cache.is_empty());
        assert_eq!(
            fs::read_to_string(&path).unwrap().trim(),
            "scientific_name,pronunciation"
        );
    }

    #[test]
    fn test_append_repairs_deleted_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = cache_path(&dir);
        let cache = PronunciationCache::open(&path);

        fs::remove_file(&path).unwrap();
        assert!(cache.append_persist("Boletus edulis", "boh-LEE-tus"));

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("scientific_name,pronunciation"));
        assert_eq!(PronunciationCache::load(&path).len(), 1);
    }

    #[test]
    fn test_append_repairs_overwritten_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = cache_path(&dir);
        let cache = PronunciationCache::open(&path);
        assert!(cache.append_persist("Amanita muscaria", "am-uh-NY-tuh"));

        fs::write(&path, "garbage\n").unwrap();
        assert!(cache.append_persist("Boletus edulis", "boh-LEE-tus"));

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("scientific_name,pronunciation"));
        let reloaded = PronunciationCache::load(&path);
        assert_eq!(reloaded.len(), 1);
        assert_eq!(
            reloaded.get("Boletus edulis").map(String::as_str),
            Some("boh-LEE-tus")
        );
    }

    #[test]
    fn test_append_failure_returns_false() {
        let dir = tempfile::tempdir().unwrap();
        // 路径是目录，无法作为文件写入
        let path = dir.path().join("pronounce.csv");
        fs::create_dir_all(&path).unwrap();

        let cache = PronunciationCache::open(&path);
        assert!(!cache.append_persist("Amanita muscaria", "x"));
    }

    #[test]
    fn test_commas_and_newlines_are_quoted() {
        let dir = tempfile::tempdir().unwrap();
        let path = cache_path(&dir);
        let cache = PronunciationCache::open(&path);
        let text = "am-uh-NY-tuh, mus-KAIR-ee-uh\n\n\"Amanita\" is Greek";

        assert!(cache.append_persist("Amanita muscaria", text));
        assert!(cache.append_persist("Boletus edulis", "boh-LEE-tus"));

        let reloaded = PronunciationCache::load(&path);
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded["Amanita muscaria"], text);
    }

    #[test]
    fn test_rewrite_all_compacts_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let path = cache_path(&dir);
        let cache = PronunciationCache::open(&path);

        for (name, text) in [("A a", "1"), ("A a", "2"), ("B b", "3")] {
            cache.add(name, text);
            assert!(cache.append_persist(name, text));
        }
        cache.rewrite_all().unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 3);
        assert!(content.starts_with("scientific_name,pronunciation"));

        let reloaded = PronunciationCache::load(&path);
        assert_eq!(reloaded["A a"], "2");
        assert_eq!(reloaded["B b"], "3");
    }

    #[test]
    fn test_concurrent_appends_are_all_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = cache_path(&dir);
        let cache = Arc::new(PronunciationCache::open(&path));
        let n = 32;

        let handles: Vec<_> = (0..n)
            .map(|i| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    let name = format!("Species number{}", i);
                    let text = format!("pronunciation, with comma {}", i);
                    cache.add(&name, &text);
                    cache.append_persist(&name, &text)
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap());
        }

        let reloaded = PronunciationCache::load(&path);
        assert_eq!(reloaded.len(), n);
        for i in 0..n {
            assert_eq!(
                reloaded[&format!("Species number{}", i)],
                format!("pronunciation, with comma {}", i)
            );
        }
        assert_eq!(cache.len(), n);
    }
}
