//! 模型标识哈希
//!
//! 每个模型由一个 32 位哈希标识。文本形式是 8 位十六进制数字，
//! 按小端字节序书写：`"C325BB80"` 对应的数值是 `0x80BB25C3`。

use std::fmt;
use std::str::FromStr;

use crate::core::error::{ConfigError, RenderError};

/// 32 位模型哈希
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshHash(u32);

impl MeshHash {
    /// 未赋值的哈希
    pub const INVALID: MeshHash = MeshHash(u32::MAX);

    pub const fn from_raw(value: u32) -> Self {
        Self(value)
    }

    pub const fn raw(&self) -> u32 {
        self.0
    }

    /// 0 与 0xFFFFFFFF 不标识任何模型
    pub const fn is_valid(&self) -> bool {
        self.0 != 0 && self.0 != u32::MAX
    }
}

impl Default for MeshHash {
    fn default() -> Self {
        Self::INVALID
    }
}

impl FromStr for MeshHash {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| {
            RenderError::Config(ConfigError::InvalidValue {
                field: "model.hash".to_string(),
                reason: format!("'{}' {}", s, reason),
            })
        };

        if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid("must be exactly 8 hex digits"));
        }
        let value = u32::from_str_radix(s, 16).map_err(|_| invalid("is not hexadecimal"))?;
        Ok(Self(value.swap_bytes()))
    }
}

impl fmt::Display for MeshHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08X}", self.0.swap_bytes())
    }
}
