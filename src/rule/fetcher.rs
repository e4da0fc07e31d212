//! 远程过滤列表拉取
//! 每个规则源每次流水线只请求一次，不做传输层重试

use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::config::LoaderConfig;
use crate::error::{RsbResult, RsblockerError};

/// 注释行前缀
const COMMENT_MARKER: char = '!';

/// 传输层抽象：返回完整响应体或失败
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, uri: &str) -> RsbResult<String>;
}

/// 基于 reqwest 的 HTTP 传输
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    user_agent: String,
}

impl HttpTransport {
    pub fn new(config: &LoaderConfig) -> RsbResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout))
            .build()?;
        Ok(Self {
            client,
            user_agent: config.user_agent.clone(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, uri: &str) -> RsbResult<String> {
        let response = self
            .client
            .get(uri)
            .header("User-Agent", &self.user_agent)
            .header("Accept-Encoding", "gzip, deflate")
            .send()
            .await
            .map_err(|e| RsblockerError::RequestFailed(format!("{}: {}", uri, e)))?;

        if !response.status().is_success() {
            return Err(RsblockerError::RequestFailed(format!(
                "URL {} returned status code {}",
                uri,
                response.status()
            )));
        }

        response.text().await.map_err(|e| {
            RsblockerError::RequestFailed(format!("failed to read body of {}: {}", uri, e))
        })
    }
}

/// 过滤列表拉取器
#[derive(Clone)]
pub struct RuleFetcher {
    transport: Arc<dyn Transport>,
}

impl RuleFetcher {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// 拉取并规范化为规则行，结果为空时返回 NoRules
    pub async fn fetch(&self, uri: &str) -> RsbResult<Vec<String>> {
        let body = self.transport.get(uri).await?;
        let lines = split_rule_lines(&body);
        if lines.is_empty() {
            return Err(RsblockerError::NoRules(uri.to_string()));
        }
        debug!("Fetched {} rule lines from {}", lines.len(), uri);
        Ok(lines)
    }
}

/// 按行切分响应体，丢弃空行、注释行和 `[Adblock Plus x.y]` 头
pub fn split_rule_lines(body: &str) -> Vec<String> {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !line.starts_with(COMMENT_MARKER))
        .filter(|line| !is_list_header(line))
        .map(str::to_string)
        .collect()
}

fn is_list_header(line: &str) -> bool {
    line.starts_with('[') && line.ends_with(']') && line.to_ascii_lowercase().contains("adblock")
}
