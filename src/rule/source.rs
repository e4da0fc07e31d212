//! 规则源配置
//! 定义远程过滤列表源及其标识规范化

use std::collections::HashSet;
use url::Url;

use crate::error::{RsbResult, RsblockerError};

/// 远程过滤列表源
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSource {
    /// 源标识（缓存文件名，原样保留空格）
    pub identifier: String,
    /// 拉取地址
    pub location: String,
}

impl FilterSource {
    /// 创建规则源，校验标识非空且地址为合法URL
    pub fn new(identifier: impl Into<String>, location: impl Into<String>) -> RsbResult<Self> {
        let identifier = identifier.into();
        let location = location.into();

        if identifier.trim().is_empty() {
            return Err(RsblockerError::InvalidInput(
                "source identifier must not be empty".to_string(),
            ));
        }
        if identifier.contains(['/', '\\']) {
            return Err(RsblockerError::InvalidInput(format!(
                "source identifier [{}] must not contain path separators",
                identifier
            )));
        }
        Url::parse(&location)?;

        Ok(Self { identifier, location })
    }

    /// 注册表使用的规范化标识
    pub fn registry_key(&self) -> String {
        normalize_identifier(&self.identifier)
    }
}

/// 去除空格，注册表键空间不允许空格
pub fn normalize_identifier(identifier: &str) -> String {
    identifier.chars().filter(|c| !c.is_whitespace()).collect()
}

/// 校验源集合内标识唯一（规范化后也必须唯一）
pub fn validate_sources(sources: &[FilterSource]) -> RsbResult<()> {
    let mut seen = HashSet::with_capacity(sources.len());
    for source in sources {
        if !seen.insert(source.registry_key()) {
            return Err(RsblockerError::InvalidInput(format!(
                "duplicate source identifier [{}]",
                source.identifier
            )));
        }
    }
    Ok(())
}

/// 内置的默认过滤列表
pub fn default_sources() -> Vec<FilterSource> {
    const DEFAULT_LISTS: &[(&str, &str)] = &[
        ("EasyList", "https://easylist.to/easylist/easylist.txt"),
        ("EasyPrivacy", "https://easylist.to/easylist/easyprivacy.txt"),
        ("Fanboy Annoyances", "https://secure.fanboy.co.nz/fanboy-annoyance.txt"),
        ("Fanboy Social", "https://easylist.to/easylist/fanboy-social.txt"),
        (
            "Peter Lowe Ad Servers",
            "https://pgl.yoyo.org/adservers/serverlist.php?hostformat=adblockplus&showintro=0&mimetype=plaintext",
        ),
    ];

    DEFAULT_LISTS
        .iter()
        .map(|(identifier, location)| FilterSource {
            identifier: identifier.to_string(),
            location: location.to_string(),
        })
        .collect()
}
