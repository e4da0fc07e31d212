//! 规则列表编译器核心
//! 仅负责将编码后的 JSON 规则列表编译为可执行的正则规则

use std::time::Instant;
use regex::RegexBuilder;
use tracing::debug;

use super::model::{ActionType, BlockerRule};
use super::pattern::{CompiledRule, CompiledRuleList};
use crate::error::{RsbResult, RsblockerError};

/// 编译后单条规则的正则体积上限
const REGEX_SIZE_LIMIT: usize = 1 << 20;

/// 规则列表编译器
pub struct RuleListCompiler;

impl RuleListCompiler {
    /// 编译规则列表，任一规则非法则整体失败
    pub fn compile(identifier: &str, encoded: &str) -> RsbResult<CompiledRuleList> {
        let start = Instant::now();
        let rules: Vec<BlockerRule> = serde_json::from_str(encoded).map_err(|e| {
            RsblockerError::RegistryError(format!("[{}] malformed rule list: {}", identifier, e))
        })?;
        if rules.is_empty() {
            return Err(RsblockerError::RegistryError(format!(
                "[{}] rule list is empty",
                identifier
            )));
        }

        let compiled = rules
            .into_iter()
            .enumerate()
            .map(|(idx, rule)| Self::compile_rule(identifier, idx, rule))
            .collect::<RsbResult<Vec<_>>>()?;

        let list = CompiledRuleList {
            identifier: identifier.to_string(),
            rules: compiled,
            encoded_len: encoded.len(),
        };

        debug!(
            "Compiled [{}] in {:?}: block {}, css-display-none {}, ignore-previous-rules {}",
            identifier,
            start.elapsed(),
            list.count_by_action(ActionType::Block),
            list.count_by_action(ActionType::CssDisplayNone),
            list.count_by_action(ActionType::IgnorePreviousRules)
        );

        Ok(list)
    }

    /// 编译单条规则
    fn compile_rule(identifier: &str, idx: usize, rule: BlockerRule) -> RsbResult<CompiledRule> {
        let trigger = rule.trigger;
        if trigger.if_domain.is_some() && trigger.unless_domain.is_some() {
            return Err(RsblockerError::RegistryError(format!(
                "[{}] rule {}: if-domain and unless-domain are mutually exclusive",
                identifier, idx
            )));
        }
        if rule.action.action_type == ActionType::CssDisplayNone && rule.action.selector.is_none() {
            return Err(RsblockerError::RegistryError(format!(
                "[{}] rule {}: css-display-none requires a selector",
                identifier, idx
            )));
        }

        let url_filter = RegexBuilder::new(&trigger.url_filter)
            .case_insensitive(!trigger.url_filter_is_case_sensitive)
            .size_limit(REGEX_SIZE_LIMIT)
            .build()
            .map_err(|e| {
                RsblockerError::RegistryError(format!(
                    "[{}] rule {}: invalid url-filter {}: {}",
                    identifier, idx, trigger.url_filter, e
                ))
            })?;

        Ok(CompiledRule {
            url_filter,
            if_domain: trigger.if_domain,
            unless_domain: trigger.unless_domain,
            resource_type: trigger.resource_type,
            load_type: trigger.load_type,
            action: rule.action,
        })
    }
}
