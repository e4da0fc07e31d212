//! 内容拦截规则的编码格式（JSON）
//! 转换器输出、缓存文件内容以及注册表的编译输入均为该格式

use serde::{Deserialize, Serialize};

/// 单条编码规则
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockerRule {
    pub trigger: Trigger,
    pub action: Action,
}

/// 触发条件
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Trigger {
    pub url_filter: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub url_filter_is_case_sensitive: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub if_domain: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unless_domain: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<Vec<ResourceType>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_type: Option<Vec<LoadType>>,
}

/// 命中后的动作
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub action_type: ActionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
}

impl Action {
    pub fn block() -> Self {
        Self { action_type: ActionType::Block, selector: None }
    }

    pub fn ignore_previous() -> Self {
        Self { action_type: ActionType::IgnorePreviousRules, selector: None }
    }

    pub fn hide(selector: impl Into<String>) -> Self {
        Self {
            action_type: ActionType::CssDisplayNone,
            selector: Some(selector.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionType {
    Block,
    BlockCookies,
    CssDisplayNone,
    IgnorePreviousRules,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceType {
    Document,
    Image,
    StyleSheet,
    Script,
    Font,
    Raw,
    SvgDocument,
    Media,
    Popup,
}

impl ResourceType {
    /// Adblock Plus 选项名 -> 资源类型
    pub fn from_option(option: &str) -> Option<Self> {
        let resource_type = match option {
            "document" | "subdocument" => ResourceType::Document,
            "image" => ResourceType::Image,
            "stylesheet" => ResourceType::StyleSheet,
            "script" => ResourceType::Script,
            "font" => ResourceType::Font,
            "media" | "object" => ResourceType::Media,
            "popup" => ResourceType::Popup,
            "xmlhttprequest" | "websocket" | "ping" | "other" => ResourceType::Raw,
            _ => return None,
        };
        Some(resource_type)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoadType {
    FirstParty,
    ThirdParty,
}
