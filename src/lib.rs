//! rsblocker - 过滤列表获取流水线：拉取、转换、缓存并编译内容拦截规则列表

// 导出全局错误类型
pub use self::error::{RsblockerError, RsbResult};

// 导出配置模块
pub use self::config::{ConfigManager, CustomConfigBuilder, LoaderConfig, DEFAULT_RETENTION, DEFAULT_RULE_LIMIT};

// 导出规则模块核心接口
pub use self::rule::{
    default_sources, normalize_identifier, CacheEntry, CacheStatus, FilterSource, HttpTransport,
    RuleCacheManager, RuleFetcher, RuleLoader, Transport,
};

// 导出编译模块核心接口
pub use self::compiler::{
    ArtifactRegistry, BlockerRule, CompiledRule, CompiledRuleList, ContentBlockerTranslator,
    ListCompiler, MemoryRegistry, RuleListCompiler, RuleTranslator,
};

// 声明所有子模块
pub mod config;
pub mod error;
pub mod rule;
pub mod compiler;
