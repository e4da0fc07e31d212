//! 规则加载管理器
//! 负责从本地缓存或远程拉取过滤列表，并编译为规则列表
//!
//! 加载顺序：
//! 1. 整批缓存新鲜时，逐源优先查询注册表中已编译的列表，未命中则读取缓存文件重新编译
//! 2. 缓存不可用、强制刷新或缓存路径任一源失败时，全部源走 拉取 -> 转换 -> 写缓存 -> 编译
//!
//! 各源并发执行，等待全部完成后再汇总；结果按源的配置顺序返回，任一源失败则整体失败

use futures_util::future::join_all;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

use super::cache::{CacheEntry, RuleCacheManager};
use super::fetcher::{HttpTransport, RuleFetcher, Transport};
use super::source::{validate_sources, FilterSource};
use crate::compiler::{
    ArtifactRegistry, CompiledRuleList, ContentBlockerTranslator, ListCompiler, MemoryRegistry,
    RuleTranslator,
};
use crate::config::LoaderConfig;
use crate::error::{RsbResult, RsblockerError};

/// 缓存状态（用于展示）
#[derive(Debug, Clone)]
pub struct CacheStatus {
    pub entry: CacheEntry,
    pub age: Duration,
    pub fresh: bool,
}

/// 规则加载管理器
pub struct RuleLoader {
    sources: Vec<FilterSource>,
    cache: RuleCacheManager,
    fetcher: RuleFetcher,
    compiler: ListCompiler,
    retention: Duration,
}

impl RuleLoader {
    /// 使用默认组件（HTTP 传输、内置转换器、进程内注册表）
    pub fn new(config: &LoaderConfig, sources: Vec<FilterSource>) -> RsbResult<Self> {
        let transport = Arc::new(HttpTransport::new(config)?);
        Self::with_components(
            config,
            sources,
            transport,
            Arc::new(ContentBlockerTranslator),
            Some(Arc::new(MemoryRegistry::new()) as Arc<dyn ArtifactRegistry>),
        )
    }

    /// 注入自定义传输、转换器和注册表
    pub fn with_components(
        config: &LoaderConfig,
        sources: Vec<FilterSource>,
        transport: Arc<dyn Transport>,
        translator: Arc<dyn RuleTranslator>,
        registry: Option<Arc<dyn ArtifactRegistry>>,
    ) -> RsbResult<Self> {
        validate_sources(&sources)?;
        if registry.is_none() {
            warn!("Rule loader created without a registry, every load will fail");
        }

        Ok(Self {
            sources,
            cache: RuleCacheManager::from_config(config),
            fetcher: RuleFetcher::new(transport),
            compiler: ListCompiler::new(translator, registry, config.rule_limit, config.optimize),
            retention: config.retention,
        })
    }

    pub fn sources(&self) -> &[FilterSource] {
        &self.sources
    }

    /// 获取全部规则列表，结果与源配置顺序一致
    ///
    /// 缓存路径失败时自动以强制刷新重试一次；强制刷新本身失败则直接返回 NotFound
    pub async fn get_lists(&self, force_refresh: bool) -> RsbResult<Vec<Arc<CompiledRuleList>>> {
        if !force_refresh {
            match self.cache.check_freshness(&self.sources).await {
                Some(entries) => match self.load_from_cache(&entries).await {
                    Ok(lists) => {
                        info!("Loaded {} rule lists from cache", lists.len());
                        return Ok(lists);
                    }
                    Err(_) => warn!("Cached rule lists unusable, refreshing from network"),
                },
                None => debug!("No usable cache, refreshing from network"),
            }
        }

        // 强制刷新不会再回退
        let lists = self.refresh_all().await?;
        info!("Refreshed {} rule lists from network", lists.len());
        Ok(lists)
    }

    /// 缓存路径：注册表命中直接复用，否则读取缓存文件编译
    async fn load_from_cache(&self, entries: &[CacheEntry]) -> RsbResult<Vec<Arc<CompiledRuleList>>> {
        let settled = join_all(entries.iter().map(|entry| self.load_cached_entry(entry))).await;
        collect_settled(entries.iter().map(|e| e.identifier.as_str()), settled)
    }

    async fn load_cached_entry(&self, entry: &CacheEntry) -> RsbResult<Arc<CompiledRuleList>> {
        if let Some(list) = self.compiler.lookup_compiled(&entry.identifier).await? {
            debug!("[{}] already compiled, reusing", entry.identifier);
            return Ok(list);
        }
        let encoded = self.cache.read(entry).await?;
        self.compiler.compile(&entry.identifier, &encoded).await
    }

    /// 刷新路径：全部源并发拉取
    async fn refresh_all(&self) -> RsbResult<Vec<Arc<CompiledRuleList>>> {
        let settled = join_all(self.sources.iter().map(|source| self.refresh_source(source))).await;
        collect_settled(self.sources.iter().map(|s| s.identifier.as_str()), settled)
    }

    async fn refresh_source(&self, source: &FilterSource) -> RsbResult<Arc<CompiledRuleList>> {
        let lines = self.fetcher.fetch(&source.location).await?;
        let encoded = self.compiler.translate(lines).await?;

        // 缓存写入失败不影响本次结果
        if let Err(e) = self.cache.write(&source.identifier, &encoded).await {
            warn!("[{}] failed to write cache: {}", source.identifier, e);
        }

        self.compiler.compile(&source.identifier, &encoded).await
    }

    /// 缓存目录中的条目及新鲜度
    pub async fn cache_status(&self) -> RsbResult<Vec<CacheStatus>> {
        let now = SystemTime::now();
        let entries = self.cache.entries().await?;
        Ok(entries
            .into_iter()
            .map(|entry| {
                let age = entry.age(now);
                CacheStatus {
                    fresh: age < self.retention,
                    age,
                    entry,
                }
            })
            .collect())
    }

    /// 清除缓存文件并移除已注册的规则列表，返回删除的缓存文件数
    pub async fn clear_cache(&self) -> RsbResult<usize> {
        let removed = self.cache.clear().await?;
        for source in &self.sources {
            if let Err(e) = self.compiler.evict(&source.identifier).await {
                warn!("[{}] failed to evict compiled list: {}", source.identifier, e);
            }
        }
        info!("Removed {} cached rule lists", removed);
        Ok(removed)
    }
}

/// 汇总各源结果：全部成功则按顺序返回，否则记录每个失败并返回 NotFound
fn collect_settled<'a, T>(
    identifiers: impl Iterator<Item = &'a str>,
    settled: Vec<RsbResult<T>>,
) -> RsbResult<Vec<T>> {
    let mut lists = Vec::with_capacity(settled.len());
    let mut failed = 0usize;

    for (identifier, result) in identifiers.zip(settled) {
        match result {
            Ok(list) => lists.push(list),
            Err(e) => {
                warn!("[{}] failed: {}", identifier, e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        debug!("{} of {} rule lists failed", failed, failed + lists.len());
        return Err(RsblockerError::NotFound);
    }
    Ok(lists)
}
