//! 编译后规则列表模型
//! 注册表持有，流水线只以 `Arc` 引用观察

use regex::Regex;

use super::model::{Action, ActionType, LoadType, ResourceType};

/// 编译后的单条规则
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub url_filter: Regex,
    pub if_domain: Option<Vec<String>>,
    pub unless_domain: Option<Vec<String>>,
    pub resource_type: Option<Vec<ResourceType>>,
    pub load_type: Option<Vec<LoadType>>,
    pub action: Action,
}

/// 编译后的规则列表
#[derive(Debug, Clone)]
pub struct CompiledRuleList {
    /// 注册表键（规范化后的标识）
    pub identifier: String,
    pub rules: Vec<CompiledRule>,
    /// 编码格式的原始字节数
    pub encoded_len: usize,
}

impl CompiledRuleList {
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// 按动作类型统计规则数
    pub fn count_by_action(&self, action_type: ActionType) -> usize {
        self.rules
            .iter()
            .filter(|rule| rule.action.action_type == action_type)
            .count()
    }
}
