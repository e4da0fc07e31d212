//! 全局错误类型定义

use thiserror::Error;
use serde_json::Error as SerdeJsonError;
use std::io::Error as IoError;
use url::ParseError as UrlParseError;

#[derive(Error, Debug)]
pub enum RsblockerError {
    // 单个规则源的流水线错误
    #[error("request failed: {0}")]
    RequestFailed(String),
    #[error("no rules in list: {0}")]
    NoRules(String),
    #[error("rule translation failed: {0}")]
    ParseError(String),
    #[error("rule list registry failed: {0}")]
    RegistryError(String),

    // 流水线对外唯一错误
    #[error("filter lists not found")]
    NotFound,

    // 网络相关错误
    #[error("http client error: {0}")]
    HttpError(#[from] reqwest::Error),

    // 序列化/反序列化错误
    #[error("json error: {0}")]
    JsonError(#[from] SerdeJsonError),

    // 基础错误
    #[error("io error: {0}")]
    IoError(#[from] IoError),
    #[error("invalid url: {0}")]
    UrlError(#[from] UrlParseError),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

// 全局Result类型
pub type RsbResult<T> = Result<T, RsblockerError>;
