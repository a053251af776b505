//! 模型注册表
//!
//! 别名到后端描述的固定映射，运行期只读

use crate::domain::BackendDescriptor;
use crate::errors::{RelayError, Result};

/// 默认别名
pub const DEFAULT_ALIAS: &str = "haiku";

/// 模型注册表
///
/// 条目保持声明顺序；反查时返回第一个匹配的别名。
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    entries: Vec<(String, BackendDescriptor)>,
    default_alias: String,
    default_descriptor: BackendDescriptor,
}

impl ModelRegistry {
    /// 用自定义条目创建注册表
    ///
    /// 默认别名必须存在于条目中。
    pub fn new(
        entries: Vec<(String, BackendDescriptor)>,
        default_alias: impl Into<String>,
    ) -> Result<Self> {
        let default_alias = default_alias.into();
        let default_descriptor = entries
            .iter()
            .find(|(alias, _)| *alias == default_alias)
            .map(|(_, descriptor)| descriptor.clone())
            .ok_or_else(|| {
                RelayError::Config(format!(
                    "default alias '{}' is not registered",
                    default_alias
                ))
            })?;

        Ok(Self {
            entries,
            default_alias,
            default_descriptor,
        })
    }

    /// 内置模型表
    pub fn builtin() -> Self {
        let haiku = BackendDescriptor::anthropic("claude-3-5-haiku-latest");
        let entries = [
            ("sonnet", BackendDescriptor::anthropic("claude-3-5-sonnet-latest")),
            (DEFAULT_ALIAS, haiku.clone()),
            ("gpt4", BackendDescriptor::openai("gpt-4")),
            ("gpt4t", BackendDescriptor::openai("gpt-4-turbo")),
            ("gpt4o", BackendDescriptor::openai("gpt-4o-mini")),
            // 大小写不敏感查找时被 gpt4o 遮蔽，保留以便列出
            ("gpt4O", BackendDescriptor::openai("gpt-4o")),
            ("gpto1", BackendDescriptor::openai("o1-mini")),
        ]
        .into_iter()
        .map(|(alias, descriptor)| (alias.to_string(), descriptor))
        .collect();

        Self {
            entries,
            default_alias: DEFAULT_ALIAS.to_string(),
            default_descriptor: haiku,
        }
    }

    /// 按别名查找后端（大小写不敏感）
    pub fn resolve(&self, alias: &str) -> Result<&BackendDescriptor> {
        let wanted = alias.to_lowercase();
        self.entries
            .iter()
            .find(|(name, _)| name.to_lowercase() == wanted)
            .map(|(_, descriptor)| descriptor)
            .ok_or_else(|| RelayError::InvalidAlias {
                alias: alias.to_string(),
                available: self.list_aliases(),
            })
    }

    /// 全部别名，按声明顺序
    pub fn list_aliases(&self) -> Vec<String> {
        self.entries.iter().map(|(alias, _)| alias.clone()).collect()
    }

    /// 反查别名
    pub fn describe(&self, descriptor: &BackendDescriptor) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, d)| d == descriptor)
            .map(|(alias, _)| alias.as_str())
    }

    pub fn default_alias(&self) -> &str {
        &self.default_alias
    }

    pub fn default_descriptor(&self) -> &BackendDescriptor {
        &self.default_descriptor
    }

    /// 描述是否属于本注册表
    pub fn contains(&self, descriptor: &BackendDescriptor) -> bool {
        self.describe(descriptor).is_some()
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
