//! 转换器与注册表的适配层
//! 固定转换策略（规则数上限、优化开关），注册表缺失或失败统一为 RegistryError

use std::sync::Arc;

use super::pattern::CompiledRuleList;
use super::registry::ArtifactRegistry;
use super::translator::RuleTranslator;
use crate::error::{RsbResult, RsblockerError};
use crate::rule::source::normalize_identifier;

#[derive(Clone)]
pub struct ListCompiler {
    translator: Arc<dyn RuleTranslator>,
    registry: Option<Arc<dyn ArtifactRegistry>>,
    rule_limit: usize,
    optimize: bool,
}

impl ListCompiler {
    pub fn new(
        translator: Arc<dyn RuleTranslator>,
        registry: Option<Arc<dyn ArtifactRegistry>>,
        rule_limit: usize,
        optimize: bool,
    ) -> Self {
        Self {
            translator,
            registry,
            rule_limit,
            optimize,
        }
    }

    /// 转换规则行，输出必须是非空 JSON 数组
    /// 转换为 CPU 密集操作，放到阻塞线程池执行
    pub async fn translate(&self, lines: Vec<String>) -> RsbResult<String> {
        let translator = Arc::clone(&self.translator);
        let (limit, optimize) = (self.rule_limit, self.optimize);
        let encoded = tokio::task::spawn_blocking(move || translator.translate(&lines, limit, optimize))
            .await
            .map_err(|e| RsblockerError::ParseError(format!("translation task failed: {}", e)))?
            .map_err(|e| match e {
                RsblockerError::ParseError(_) => e,
                other => RsblockerError::ParseError(other.to_string()),
            })?;

        match serde_json::from_str::<serde_json::Value>(&encoded) {
            Ok(serde_json::Value::Array(rules)) if !rules.is_empty() => Ok(encoded),
            _ => Err(RsblockerError::ParseError(
                "translator did not produce a rule array".to_string(),
            )),
        }
    }

    /// 按规范化标识查询已编译的规则列表
    pub async fn lookup_compiled(&self, identifier: &str) -> RsbResult<Option<Arc<CompiledRuleList>>> {
        let registry = self.registry()?;
        registry
            .lookup(&normalize_identifier(identifier))
            .await
            .map_err(into_registry_error)
    }

    /// 按规范化标识编译并注册
    pub async fn compile(&self, identifier: &str, encoded: &str) -> RsbResult<Arc<CompiledRuleList>> {
        let registry = self.registry()?;
        registry
            .compile(&normalize_identifier(identifier), encoded)
            .await
            .map_err(into_registry_error)
    }

    /// 从注册表移除，返回是否存在
    pub async fn evict(&self, identifier: &str) -> RsbResult<bool> {
        let registry = self.registry()?;
        registry
            .remove(&normalize_identifier(identifier))
            .await
            .map_err(into_registry_error)
    }

    fn registry(&self) -> RsbResult<&Arc<dyn ArtifactRegistry>> {
        self.registry
            .as_ref()
            .ok_or_else(|| RsblockerError::RegistryError("rule list registry unavailable".to_string()))
    }
}

fn into_registry_error(e: RsblockerError) -> RsblockerError {
    match e {
        RsblockerError::RegistryError(_) => e,
        other => RsblockerError::RegistryError(other.to_string()),
    }
}
