//! 规则缓存管理
//! 每个规则源对应缓存目录下的一个 `<identifier>.json`，以文件修改时间判定新鲜度

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::debug;

use super::source::FilterSource;
use crate::config::LoaderConfig;
use crate::error::RsbResult;

const CACHE_FILE_SUFFIX: &str = ".json";

/// 缓存条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub identifier: String,
    pub path: PathBuf,
    pub last_modified: SystemTime,
}

impl CacheEntry {
    /// 条目年龄，修改时间晚于当前时间时视为0
    pub fn age(&self, now: SystemTime) -> Duration {
        now.duration_since(self.last_modified).unwrap_or_default()
    }
}

/// 规则缓存管理器
#[derive(Debug, Clone)]
pub struct RuleCacheManager {
    cache_dir: PathBuf,
    retention: Duration,
}

impl RuleCacheManager {
    pub fn new(cache_dir: impl Into<PathBuf>, retention: Duration) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            retention,
        }
    }

    pub fn from_config(config: &LoaderConfig) -> Self {
        Self::new(config.cache_dir.clone(), config.retention)
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// 规则源对应的缓存文件路径（标识原样作为文件名）
    pub fn cache_path(&self, identifier: &str) -> PathBuf {
        self.cache_dir.join(format!("{}{}", identifier, CACHE_FILE_SUFFIX))
    }

    /// 整批新鲜度检查：任一缓存缺失、不可读或过期都返回 None
    pub async fn check_freshness(&self, sources: &[FilterSource]) -> Option<Vec<CacheEntry>> {
        let now = SystemTime::now();
        let mut entries = Vec::with_capacity(sources.len());

        for source in sources {
            let path = self.cache_path(&source.identifier);
            let entry = match Self::stat_entry(&source.identifier, &path).await {
                Ok(entry) => entry,
                Err(e) => {
                    debug!("Cache file for [{}] unusable: {}", source.identifier, e);
                    return None;
                }
            };

            let age = entry.age(now);
            if age >= self.retention {
                debug!(
                    "Cache file for [{}] is stale ({}s old), batch invalidated",
                    source.identifier,
                    age.as_secs()
                );
                return None;
            }
            entries.push(entry);
        }

        debug!("All {} cache files are fresh", entries.len());
        Some(entries)
    }

    /// 写入编码后的规则列表（非原子写入）
    pub async fn write(&self, identifier: &str, encoded: &str) -> RsbResult<PathBuf> {
        tokio::fs::create_dir_all(&self.cache_dir).await?;
        let path = self.cache_path(identifier);
        tokio::fs::write(&path, encoded).await?;
        debug!("Cached [{}] to {} ({} bytes)", identifier, path.display(), encoded.len());
        Ok(path)
    }

    /// 读取缓存的编码规则列表
    pub async fn read(&self, entry: &CacheEntry) -> RsbResult<String> {
        Ok(tokio::fs::read_to_string(&entry.path).await?)
    }

    /// 扫描缓存目录，无法还原出标识的文件会被跳过
    pub async fn entries(&self) -> RsbResult<Vec<CacheEntry>> {
        let mut dir = match tokio::fs::read_dir(&self.cache_dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        while let Some(item) = dir.next_entry().await? {
            let path = item.path();
            let Some(identifier) = Self::identifier_from_path(&path) else {
                debug!("Skipping unrecognised cache file {}", path.display());
                continue;
            };
            match Self::stat_entry(&identifier, &path).await {
                Ok(entry) => entries.push(entry),
                Err(e) => debug!("Skipping unreadable cache file {}: {}", path.display(), e),
            }
        }

        entries.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        Ok(entries)
    }

    /// 清除全部缓存文件，返回删除数量
    pub async fn clear(&self) -> RsbResult<usize> {
        let entries = self.entries().await?;
        for entry in &entries {
            tokio::fs::remove_file(&entry.path).await?;
        }
        Ok(entries.len())
    }

    /// 打开文件确认可读，并取得修改时间
    async fn stat_entry(identifier: &str, path: &Path) -> std::io::Result<CacheEntry> {
        let file = tokio::fs::File::open(path).await?;
        let metadata = file.metadata().await?;
        if !metadata.is_file() {
            return Err(std::io::Error::new(ErrorKind::InvalidInput, "not a regular file"));
        }
        Ok(CacheEntry {
            identifier: identifier.to_string(),
            path: path.to_path_buf(),
            last_modified: metadata.modified()?,
        })
    }

    fn identifier_from_path(path: &Path) -> Option<String> {
        let file_name = path.file_name()?.to_str()?;
        let identifier = file_name.strip_suffix(CACHE_FILE_SUFFIX)?;
        if identifier.is_empty() {
            return None;
        }
        Some(identifier.to_string())
    }
}
