//! 规则列表注册表
//! 按标识编译并持有规则列表，可直接查询已编译的列表而无需重新编译

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use super::compiler::RuleListCompiler;
use super::pattern::CompiledRuleList;
use crate::error::{RsbResult, RsblockerError};

/// 注册表抽象，实现需自身保证线程安全
#[async_trait]
pub trait ArtifactRegistry: Send + Sync {
    /// 查询已编译的规则列表，不存在时返回 None
    async fn lookup(&self, identifier: &str) -> RsbResult<Option<Arc<CompiledRuleList>>>;

    /// 编译并注册规则列表，同名列表会被替换
    async fn compile(&self, identifier: &str, encoded: &str) -> RsbResult<Arc<CompiledRuleList>>;

    /// 移除已注册的规则列表，返回是否存在
    async fn remove(&self, identifier: &str) -> RsbResult<bool>;

    /// 全部已注册标识
    async fn identifiers(&self) -> RsbResult<Vec<String>>;
}

/// 进程内注册表
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    lists: RwLock<HashMap<String, Arc<CompiledRuleList>>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册表键不允许空白字符和路径分隔符
    fn validate_key(identifier: &str) -> RsbResult<()> {
        if identifier.is_empty()
            || identifier.chars().any(|c| c.is_whitespace() || c == '/' || c == '\\')
        {
            return Err(RsblockerError::RegistryError(format!(
                "invalid rule list identifier [{}]",
                identifier
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ArtifactRegistry for MemoryRegistry {
    async fn lookup(&self, identifier: &str) -> RsbResult<Option<Arc<CompiledRuleList>>> {
        Self::validate_key(identifier)?;
        Ok(self.lists.read().await.get(identifier).cloned())
    }

    async fn compile(&self, identifier: &str, encoded: &str) -> RsbResult<Arc<CompiledRuleList>> {
        Self::validate_key(identifier)?;
        // 逐条构建正则，放到阻塞线程池执行
        let (key, encoded) = (identifier.to_string(), encoded.to_string());
        let list = tokio::task::spawn_blocking(move || RuleListCompiler::compile(&key, &encoded))
            .await
            .map_err(|e| RsblockerError::RegistryError(format!("compile task failed: {}", e)))??;
        let list = Arc::new(list);
        self.lists
            .write()
            .await
            .insert(identifier.to_string(), Arc::clone(&list));
        debug!("Registered rule list [{}] with {} rules", identifier, list.rule_count());
        Ok(list)
    }

    async fn remove(&self, identifier: &str) -> RsbResult<bool> {
        Self::validate_key(identifier)?;
        Ok(self.lists.write().await.remove(identifier).is_some())
    }

    async fn identifiers(&self) -> RsbResult<Vec<String>> {
        let mut identifiers: Vec<String> = self.lists.read().await.keys().cloned().collect();
        identifiers.sort();
        Ok(identifiers)
    }
}
