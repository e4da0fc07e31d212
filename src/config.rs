//! 全局配置管理,存储所有可配置项

use std::path::PathBuf;
use std::time::Duration;

/// 单个规则列表允许的最大规则数
pub const DEFAULT_RULE_LIMIT: usize = 50_000;

/// 缓存保留时长（7天）
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// 加载器配置
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    // 编码后规则列表的缓存目录
    pub cache_dir: PathBuf,
    // 缓存有效期
    pub retention: Duration,
    // 转换时的规则数上限
    pub rule_limit: usize,
    // 转换时是否启用优化
    pub optimize: bool,
    // 超时配置（单位：秒）
    pub http_timeout: u64,
    pub user_agent: String,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from(".cache/rsblocker/abp-lists"),
            retention: DEFAULT_RETENTION,
            rule_limit: DEFAULT_RULE_LIMIT,
            optimize: true,
            http_timeout: 30,
            user_agent: format!("Rsblocker/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// 配置管理器
pub struct ConfigManager;

impl ConfigManager {
    /// 获取默认配置
    pub fn get_default() -> LoaderConfig {
        LoaderConfig::default()
    }

    /// 自定义配置
    pub fn custom() -> CustomConfigBuilder {
        CustomConfigBuilder::new()
    }
}

/// 配置构建器（便于自定义配置）
#[derive(Debug, Clone, Default)]
pub struct CustomConfigBuilder {
    config: LoaderConfig,
}

impl CustomConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: LoaderConfig::default(),
        }
    }

    pub fn cache_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.cache_dir = path.into();
        self
    }

    pub fn retention(mut self, retention: Duration) -> Self {
        self.config.retention = retention;
        self
    }

    pub fn rule_limit(mut self, limit: usize) -> Self {
        self.config.rule_limit = limit;
        self
    }

    pub fn optimize(mut self, optimize: bool) -> Self {
        self.config.optimize = optimize;
        self
    }

    pub fn http_timeout(mut self, timeout: u64) -> Self {
        self.config.http_timeout = timeout;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    pub fn build(self) -> LoaderConfig {
        self.config
    }
}
