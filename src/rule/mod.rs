//! 规则模块：负责过滤列表源定义、拉取、缓存与加载
pub mod source;
pub mod fetcher;
pub mod cache;
pub mod loader;

// 导出核心接口
pub use self::source::{default_sources, normalize_identifier, validate_sources, FilterSource};
pub use self::fetcher::{split_rule_lines, HttpTransport, RuleFetcher, Transport};
pub use self::cache::{CacheEntry, RuleCacheManager};
pub use self::loader::{CacheStatus, RuleLoader};
