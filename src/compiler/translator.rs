//! 规则转换器
//! 将 Adblock Plus 语法的规则行转换为内容拦截 JSON 编码格式

use std::collections::{BTreeSet, HashSet};
use tracing::{debug, warn};

use super::model::{Action, ActionType, BlockerRule, LoadType, ResourceType, Trigger};
use crate::error::{RsbResult, RsblockerError};

/// `||` 域名锚点对应的正则前缀
const DOMAIN_ANCHOR: &str = "^[^:]+://+([^:/]+\\.)?";
/// `^` 分隔符
const SEPARATOR: &str = "[/:&?=]";
/// 匹配任意URL
const MATCH_ALL: &str = ".*";
/// 合并通用元素隐藏规则时每组的选择器上限
const SELECTOR_GROUP_SIZE: usize = 250;

/// 规则转换器：规则行 + 规则数上限 + 优化开关 -> 编码后的规则列表
pub trait RuleTranslator: Send + Sync {
    fn translate(&self, lines: &[String], limit: usize, optimize: bool) -> RsbResult<String>;
}

/// 转换结果的归类，决定输出顺序（拦截 -> 元素隐藏 -> 例外）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuleKind {
    Blocking,
    Cosmetic,
    Exception,
}

#[derive(Debug, Default)]
struct TranslateStats {
    blocking: usize,
    cosmetic: usize,
    exception: usize,
    skipped: usize,
}

/// 默认转换器（Adblock Plus -> 内容拦截 JSON）
#[derive(Debug, Default, Clone)]
pub struct ContentBlockerTranslator;

impl RuleTranslator for ContentBlockerTranslator {
    fn translate(&self, lines: &[String], limit: usize, optimize: bool) -> RsbResult<String> {
        let mut blocking = Vec::new();
        let mut cosmetic = Vec::new();
        let mut exceptions = Vec::new();
        let mut stats = TranslateStats::default();

        for line in lines {
            match Self::convert_line(line) {
                Some((RuleKind::Blocking, rule)) => {
                    stats.blocking += 1;
                    blocking.push(rule);
                }
                Some((RuleKind::Cosmetic, rule)) => {
                    stats.cosmetic += 1;
                    cosmetic.push(rule);
                }
                Some((RuleKind::Exception, rule)) => {
                    stats.exception += 1;
                    exceptions.push(rule);
                }
                None => stats.skipped += 1,
            }
        }

        debug!(
            "Converted rules: blocking {}, cosmetic {}, exception {}, skipped {}",
            stats.blocking, stats.cosmetic, stats.exception, stats.skipped
        );

        if optimize {
            blocking = dedup_rules(blocking);
            cosmetic = merge_generic_selectors(dedup_rules(cosmetic));
            exceptions = dedup_rules(exceptions);
        }

        let mut rules: Vec<BlockerRule> = blocking
            .into_iter()
            .chain(cosmetic)
            .chain(exceptions)
            .collect();

        if rules.len() > limit {
            warn!("Rule list has {} rules, truncated to limit {}", rules.len(), limit);
            rules.truncate(limit);
        }
        if rules.is_empty() {
            return Err(RsblockerError::ParseError(format!(
                "no convertible rules among {} lines",
                lines.len()
            )));
        }

        Ok(serde_json::to_string(&rules)?)
    }
}

impl ContentBlockerTranslator {
    /// 转换单行规则，不支持的语法返回 None
    fn convert_line(line: &str) -> Option<(RuleKind, BlockerRule)> {
        let line = line.trim();
        if line.is_empty() || !line.is_ascii() {
            return None;
        }

        // 元素隐藏例外、扩展CSS、脚本注入、HTML过滤均不支持
        if ["#@#", "#?#", "#$#", "#%#", "$$"].iter().any(|marker| line.contains(marker)) {
            return None;
        }
        if let Some(idx) = line.find("##") {
            return Self::convert_cosmetic(&line[..idx], &line[idx + 2..])
                .map(|rule| (RuleKind::Cosmetic, rule));
        }
        if is_hosts_line(line) {
            let domain = parse_hosts_domain(line)?;
            let rule = Self::convert_network(&format!("||{}^", domain), Action::block())?;
            return Some((RuleKind::Blocking, rule));
        }

        match line.strip_prefix("@@") {
            Some(rest) => Self::convert_network(rest, Action::ignore_previous())
                .map(|rule| (RuleKind::Exception, rule)),
            None => Self::convert_network(line, Action::block()).map(|rule| (RuleKind::Blocking, rule)),
        }
    }

    fn convert_cosmetic(domains: &str, selector: &str) -> Option<BlockerRule> {
        let selector = selector.trim();
        if selector.is_empty() || selector.starts_with("+js(") {
            return None;
        }

        let (include, exclude) = split_domains(domains.split(','));
        let mut trigger = Trigger {
            url_filter: MATCH_ALL.to_string(),
            ..Trigger::default()
        };
        apply_domains(&mut trigger, include, exclude);

        Some(BlockerRule {
            trigger,
            action: Action::hide(selector),
        })
    }

    fn convert_network(rule: &str, action: Action) -> Option<BlockerRule> {
        let (pattern, options) = match rule.rfind('$') {
            Some(idx) => (&rule[..idx], Some(&rule[idx + 1..])),
            None => (rule, None),
        };

        // 正则规则不支持（含带选项的 `/re/$opts`）
        if is_regex_pattern(rule) || is_regex_pattern(pattern) {
            return None;
        }

        let mut trigger = Trigger {
            url_filter: pattern_to_url_filter(pattern.trim()),
            ..Trigger::default()
        };
        if let Some(options) = options {
            apply_options(&mut trigger, options)?;
        }

        // 无任何限制条件的全匹配规则过于宽泛
        let unrestricted = trigger.if_domain.is_none()
            && trigger.unless_domain.is_none()
            && trigger.resource_type.is_none()
            && trigger.load_type.is_none();
        if trigger.url_filter == MATCH_ALL && unrestricted {
            return None;
        }

        Some(BlockerRule { trigger, action })
    }
}

fn is_regex_pattern(pattern: &str) -> bool {
    pattern.len() > 1 && pattern.starts_with('/') && pattern.ends_with('/')
}

/// Adblock Plus 模式 -> url-filter 正则
fn pattern_to_url_filter(pattern: &str) -> String {
    let mut rest = pattern;
    let mut out = String::with_capacity(pattern.len() * 2);

    if let Some(stripped) = rest.strip_prefix("||") {
        out.push_str(DOMAIN_ANCHOR);
        rest = stripped;
    } else if let Some(stripped) = rest.strip_prefix('|') {
        out.push('^');
        rest = stripped;
    }

    let (rest, end_anchor) = match rest.strip_suffix('|') {
        Some(stripped) => (stripped, true),
        None => (rest, false),
    };

    let last = rest.len().saturating_sub(1);
    for (idx, c) in rest.char_indices() {
        match c {
            '*' => out.push_str(MATCH_ALL),
            '^' if idx == last => {
                out.push_str(SEPARATOR);
                out.push('?');
            }
            '^' => out.push_str(SEPARATOR),
            '.' | '+' | '?' | '$' | '{' | '}' | '(' | ')' | '[' | ']' | '\\' | '|' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }

    if end_anchor {
        out.push('$');
    }
    if out.is_empty() || out == "^" {
        return MATCH_ALL.to_string();
    }
    out
}

/// 解析 `$` 之后的选项，遇到不支持的选项返回 None
fn apply_options(trigger: &mut Trigger, options: &str) -> Option<()> {
    let mut resource_types = BTreeSet::new();

    for option in options.split(',').map(str::trim).filter(|o| !o.is_empty()) {
        let option = option.to_ascii_lowercase();
        match option.as_str() {
            "third-party" | "3p" => trigger.load_type = Some(vec![LoadType::ThirdParty]),
            "~third-party" | "first-party" | "1p" => trigger.load_type = Some(vec![LoadType::FirstParty]),
            "match-case" => trigger.url_filter_is_case_sensitive = true,
            "important" => {}
            other => {
                if let Some(list) = other.strip_prefix("domain=") {
                    let (include, exclude) = split_domains(list.split('|'));
                    apply_domains(trigger, include, exclude);
                } else {
                    resource_types.insert(ResourceType::from_option(other)?);
                }
            }
        }
    }

    if !resource_types.is_empty() {
        trigger.resource_type = Some(resource_types.into_iter().collect());
    }
    Some(())
}

fn split_domains<'a>(domains: impl Iterator<Item = &'a str>) -> (Vec<String>, Vec<String>) {
    let mut include = Vec::new();
    let mut exclude = Vec::new();
    for domain in domains.map(str::trim).filter(|d| !d.is_empty()) {
        match domain.strip_prefix('~') {
            Some(excluded) => exclude.push(format!("*{}", excluded.to_ascii_lowercase())),
            None => include.push(format!("*{}", domain.to_ascii_lowercase())),
        }
    }
    (include, exclude)
}

/// if-domain 与 unless-domain 不能同时出现，优先保留 if-domain
fn apply_domains(trigger: &mut Trigger, include: Vec<String>, exclude: Vec<String>) {
    if !include.is_empty() {
        trigger.if_domain = Some(include);
    } else if !exclude.is_empty() {
        trigger.unless_domain = Some(exclude);
    }
}

/// hosts 文件格式：`0.0.0.0 ads.example.com`
fn is_hosts_line(line: &str) -> bool {
    matches!(line.split_whitespace().next(), Some("0.0.0.0" | "127.0.0.1"))
}

fn parse_hosts_domain(line: &str) -> Option<&str> {
    let domain = line.split_whitespace().nth(1)?;
    if domain == "localhost" || !domain.contains('.') {
        return None;
    }
    Some(domain)
}

fn dedup_rules(rules: Vec<BlockerRule>) -> Vec<BlockerRule> {
    let mut seen = HashSet::with_capacity(rules.len());
    rules.into_iter().filter(|rule| seen.insert(rule.clone())).collect()
}

/// 将不带域名限制的元素隐藏规则合并为选择器组
fn merge_generic_selectors(rules: Vec<BlockerRule>) -> Vec<BlockerRule> {
    let generic_trigger = Trigger {
        url_filter: MATCH_ALL.to_string(),
        ..Trigger::default()
    };

    let (generic, specific): (Vec<_>, Vec<_>) = rules.into_iter().partition(|rule| {
        rule.trigger == generic_trigger && rule.action.action_type == ActionType::CssDisplayNone
    });

    let selectors: Vec<String> = generic.into_iter().filter_map(|rule| rule.action.selector).collect();
    let mut merged: Vec<BlockerRule> = selectors
        .chunks(SELECTOR_GROUP_SIZE)
        .map(|group| BlockerRule {
            trigger: generic_trigger.clone(),
            action: Action::hide(group.join(", ")),
        })
        .collect();

    merged.extend(specific);
    merged
}
