//! 配置系统
//! 从环境变量加载所有配置，使用 Secret 包装敏感信息

use config::{Config, ConfigError, Environment};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// 监听地址，例如 "0.0.0.0:3000"
    pub addr: String,
    /// 请求体大小上限（字节）
    pub body_limit_bytes: usize,
}

/// 凭据存储后端
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// 存储后端: postgres, memory
    pub backend: StoreBackend,
    /// 数据库连接 URL（使用 Secret 包装，防止日志泄露）
    pub url: Option<Secret<String>>,
    /// 最大连接数
    pub max_connections: u32,
    /// 最小连接数
    pub min_connections: u32,
    /// 获取连接超时时间（秒）
    pub acquire_timeout_secs: u64,
    /// 空闲连接超时时间（秒）
    pub idle_timeout_secs: u64,
    /// 连接最大生命周期（秒）
    pub max_lifetime_secs: u64,
    /// 单次存储操作超时时间（毫秒）
    pub operation_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别: trace, debug, info, warn, error
    pub level: String,
    /// 日志格式: json, pretty
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    /// 访问令牌密钥；未配置时在签发时报错，而不是启动时
    pub access_token_secret: Option<Secret<String>>,
    /// 访问令牌过期时间（秒）
    pub access_token_exp_secs: u64,
    /// 刷新令牌密钥，必须与访问令牌密钥不同
    pub refresh_token_secret: Option<Secret<String>>,
    /// 刷新令牌过期时间（秒）
    pub refresh_token_exp_secs: u64,
    /// Argon2 迭代次数（按记录保存）
    pub password_hash_cost: u32,
    /// Argon2 内存开销（KiB）
    pub password_hash_memory_kib: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub security: SecurityConfig,
}

impl AppConfig {
    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut settings = Config::builder();

        // 添加默认配置
        settings = settings
            .set_default("server.addr", "0.0.0.0:3000")?
            .set_default("server.body_limit_bytes", 64 * 1024)?
            .set_default("database.backend", "postgres")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("database.acquire_timeout_secs", 30)?
            .set_default("database.idle_timeout_secs", 600)?
            .set_default("database.max_lifetime_secs", 1800)?
            .set_default("database.operation_timeout_ms", 5000)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "json")?
            .set_default("security.access_token_exp_secs", 900)?
            .set_default("security.refresh_token_exp_secs", 604800)?
            .set_default("security.password_hash_cost", 2)?
            .set_default("security.password_hash_memory_kib", 19456)?;

        // 从环境变量加载配置（前缀为 AUTH_）
        settings = settings.add_source(
            Environment::with_prefix("AUTH")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = settings.build()?.try_deserialize()?;

        // 验证配置
        config.validate()?;

        Ok(config)
    }

    /// 验证配置合法性
    pub fn validate(&self) -> Result<(), ConfigError> {
        // 验证端口范围
        if let Some(port_str) = self.server.addr.split(':').next_back() {
            if let Ok(port) = port_str.parse::<u16>() {
                if port != 0 && port < 1024 {
                    return Err(ConfigError::Message("Server port should be >= 1024".to_string()));
                }
            }
        }

        // 验证日志级别
        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::Message(format!(
                    "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                    self.logging.level
                )))
            }
        }

        // 验证日志格式
        match self.logging.format.to_lowercase().as_str() {
            "json" | "pretty" => {}
            _ => {
                return Err(ConfigError::Message(format!(
                    "Invalid log format: {}. Must be one of: json, pretty",
                    self.logging.format
                )))
            }
        }

        // 验证数据库配置
        if self.database.backend == StoreBackend::Postgres && self.database.url.is_none() {
            return Err(ConfigError::Message(
                "database.url is required for the postgres backend".to_string(),
            ));
        }

        if self.database.max_connections < self.database.min_connections {
            return Err(ConfigError::Message(
                "max_connections must be >= min_connections".to_string(),
            ));
        }

        if self.database.operation_timeout_ms == 0 {
            return Err(ConfigError::Message(
                "operation_timeout_ms must be greater than 0".to_string(),
            ));
        }

        // 验证令牌过期时间：访问令牌必须严格短于刷新令牌
        if self.security.access_token_exp_secs == 0 {
            return Err(ConfigError::Message(
                "access_token_exp_secs must be greater than 0".to_string(),
            ));
        }

        if self.security.access_token_exp_secs >= self.security.refresh_token_exp_secs {
            return Err(ConfigError::Message(
                "access_token_exp_secs must be shorter than refresh_token_exp_secs".to_string(),
            ));
        }

        // 两类令牌不能共用同一个密钥
        if let (Some(access), Some(refresh)) =
            (&self.security.access_token_secret, &self.security.refresh_token_secret)
        {
            if access.expose_secret() == refresh.expose_secret() {
                return Err(ConfigError::Message(
                    "access and refresh token secrets must differ".to_string(),
                ));
            }
        }

        // 验证密码哈希参数
        if !(1..=10).contains(&self.security.password_hash_cost) {
            return Err(ConfigError::Message(
                "password_hash_cost must be between 1 and 10".to_string(),
            ));
        }

        if self.security.password_hash_memory_kib < 8 {
            return Err(ConfigError::Message(
                "password_hash_memory_kib must be at least 8".to_string(),
            ));
        }

        Ok(())
    }
}
