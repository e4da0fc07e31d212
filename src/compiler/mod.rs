//! 编译模块：规则转换、编码格式、注册表编译
pub mod model;
pub mod translator;
pub mod pattern;
pub mod compiler;
pub mod registry;
pub mod adapter;

pub use self::model::{Action, ActionType, BlockerRule, LoadType, ResourceType, Trigger};
pub use self::translator::{ContentBlockerTranslator, RuleTranslator};
pub use self::pattern::{CompiledRule, CompiledRuleList};
pub use self::compiler::RuleListCompiler;
pub use self::registry::{ArtifactRegistry, MemoryRegistry};
pub use self::adapter::ListCompiler;
