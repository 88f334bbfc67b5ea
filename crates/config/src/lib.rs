//! taller-config - 配置加载库
//!
//! 加载顺序：`{dir}/default.toml` → `{dir}/{APP_ENV}.toml` → `APP__` 前缀的环境变量
//! （嵌套字段用 `__` 分隔，例如 `APP__DATABASE__URL`）。

use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use secrecy::Secret;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Load(Box::new(err))
    }
}

/// 数据库配置
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: Secret<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_connect_attempts")]
    pub connect_attempts: u32,
}

fn default_max_connections() -> u32 {
    // 开发环境: 10, 生产环境: 30
    match std::env::var("APP_ENV").as_deref() {
        Ok("production") => 30,
        _ => 10,
    }
}

fn default_connect_attempts() -> u32 {
    5
}

/// 服务器配置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_max_body_size() -> usize {
    16 * 1024
}

/// 遥测配置
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json: false,
        }
    }
}

/// 邮件配置
#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: Secret<String>,
    pub from_email: String,
    pub from_name: String,
    #[serde(default)]
    pub use_tls: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

/// 同一客户存在多条未使用验证码时，哪些记录参与校验
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OtpPrecedence {
    /// 只有最近签发的一条有效，新签发即作废旧码
    #[default]
    LatestOnly,
    /// 任意一条未使用且匹配的记录都可通过
    AnyUnconsumed,
}

/// OTP 配置
#[derive(Debug, Clone, Deserialize)]
pub struct OtpConfig {
    #[serde(default = "default_ttl_minutes")]
    pub ttl_minutes: i64,
    #[serde(default = "default_code_length")]
    pub code_length: usize,
    #[serde(default)]
    pub precedence: OtpPrecedence,
    /// 每个客户 24 小时内最多签发次数，0 表示不限制
    #[serde(default = "default_max_per_day")]
    pub max_per_day: u32,
    /// 单条验证码允许的错误提交次数，0 表示不限制
    #[serde(default = "default_max_failed_attempts")]
    pub max_failed_attempts: u32,
    /// 过期后保留多久再清理
    #[serde(default = "default_retention_hours")]
    pub retention_hours: i64,
    /// 清理任务间隔，0 表示不启动
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
}

fn default_ttl_minutes() -> i64 {
    10
}

fn default_code_length() -> usize {
    6
}

fn default_max_per_day() -> u32 {
    10
}

fn default_max_failed_attempts() -> u32 {
    5
}

fn default_retention_hours() -> i64 {
    24
}

fn default_cleanup_interval_secs() -> u64 {
    3600
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: default_ttl_minutes(),
            code_length: default_code_length(),
            precedence: OtpPrecedence::default(),
            max_per_day: default_max_per_day(),
            max_failed_attempts: default_max_failed_attempts(),
            retention_hours: default_retention_hours(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
        }
    }
}

impl OtpConfig {
    pub const MIN_TTL_MINUTES: i64 = 1;
    pub const MAX_TTL_MINUTES: i64 = 60;
    pub const MIN_CODE_LENGTH: usize = 4;
    pub const MAX_CODE_LENGTH: usize = 10;

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(Self::MIN_TTL_MINUTES..=Self::MAX_TTL_MINUTES).contains(&self.ttl_minutes) {
            return Err(ConfigError::Invalid(format!(
                "otp.ttl_minutes must be between {} and {}, got {}",
                Self::MIN_TTL_MINUTES,
                Self::MAX_TTL_MINUTES,
                self.ttl_minutes
            )));
        }
        if !(Self::MIN_CODE_LENGTH..=Self::MAX_CODE_LENGTH).contains(&self.code_length) {
            return Err(ConfigError::Invalid(format!(
                "otp.code_length must be between {} and {}, got {}",
                Self::MIN_CODE_LENGTH,
                Self::MAX_CODE_LENGTH,
                self.code_length
            )));
        }
        if self.retention_hours < 0 {
            return Err(ConfigError::Invalid(
                "otp.retention_hours must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// 应用配置
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app_name: String,
    #[serde(default = "default_app_env")]
    pub app_env: String,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    /// 未配置时验证码只写日志，不发送邮件
    pub email: Option<EmailConfig>,
    #[serde(default)]
    pub otp: OtpConfig,
}

fn default_app_env() -> String {
    "development".to_string()
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    pub fn load(config_dir: &str) -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| default_app_env());
        Self::from_figment(Self::figment(config_dir, &env))
    }

    /// 构建配置源
    pub fn figment(config_dir: &str, env: &str) -> Figment {
        Figment::new()
            .merge(Toml::file(format!("{}/default.toml", config_dir)))
            .merge(Toml::file(format!("{}/{}.toml", config_dir, env)))
            .merge(Env::prefixed("APP__").split("__"))
    }

    /// 从给定配置源提取并校验
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract()?;
        config.otp.validate()?;
        Ok(config)
    }

    /// 是否为生产环境
    pub fn is_production(&self) -> bool {
        self.app_env == "production"
    }

    /// 监听地址
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests;
