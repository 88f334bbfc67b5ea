//! 客户引用
//!
//! 客户实体归客户管理子系统所有，OTP 只读取投递所需的联系方式。

use taller_common::ClientId;
use thiserror::Error;

/// 身份证件号（cédula）
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cedula(String);

impl Cedula {
    pub const MAX_LEN: usize = 20;

    /// 解析外部输入：去除首尾空白，只允许 ASCII 字母、数字和 `-`
    ///
    /// 大小写保持原样，客户表按原值精确匹配。
    pub fn parse(raw: &str) -> Result<Self, CedulaError> {
        let value = raw.trim();

        if value.is_empty() {
            return Err(CedulaError::Empty);
        }
        if value.len() > Self::MAX_LEN {
            return Err(CedulaError::TooLong(value.len()));
        }
        if let Some(c) = value
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-'))
        {
            return Err(CedulaError::InvalidCharacter(c));
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CedulaError {
    #[error("identifier is empty")]
    Empty,

    #[error("identifier is {0} characters long, at most {max} allowed", max = Cedula::MAX_LEN)]
    TooLong(usize),

    #[error("identifier contains invalid character {0:?}")]
    InvalidCharacter(char),
}

/// 客户联系方式
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientContact {
    pub id: ClientId,
    pub cedula: Cedula,
    pub name: String,
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trims_and_keeps_case() {
        let cedula = Cedula::parse("  ab-123 ").unwrap();
        assert_eq!(cedula.as_str(), "ab-123");
        assert_ne!(cedula, Cedula::parse("AB-123").unwrap());
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert_eq!(Cedula::parse("   "), Err(CedulaError::Empty));
    }

    #[test]
    fn test_parse_rejects_too_long() {
        let raw = "1".repeat(Cedula::MAX_LEN + 1);
        assert_eq!(Cedula::parse(&raw), Err(CedulaError::TooLong(21)));
    }

    #[test]
    fn test_parse_rejects_injection_characters() {
        assert_eq!(
            Cedula::parse("17'; DROP TABLE"),
            Err(CedulaError::InvalidCharacter('\''))
        );
    }
}
