use serde::{Deserialize, Serialize};

/// 默认配置文件路径
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// 环境变量前缀，分隔符为 `__`，例如 `SHORTENER__STORAGE__DATABASE_DSN`
pub const ENV_PREFIX: &str = "SHORTENER";

/// 旧版环境变量名到配置键的映射（优先级最高）
const LEGACY_ENV_KEYS: [(&str, &str); 4] = [
    ("SERVER_ADDRESS", "server.address"),
    ("BASE_URL", "server.base_url"),
    ("FILE_STORAGE_PATH", "storage.file_storage_path"),
    ("DATABASE_DSN", "storage.database_dsn"),
];

/// 静态配置（启动时加载）
///
/// 包含：
/// - server: 服务地址与短链接前缀
/// - storage: 存储后端选择与调优参数
/// - logging: 日志配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StaticConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl StaticConfig {
    /// 从默认路径加载配置
    pub fn load() -> Self {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// 从 TOML 文件和环境变量加载配置，失败时回退到默认值
    ///
    /// 优先级：旧版 ENV > SHORTENER__* ENV > 配置文件 > 默认值
    pub fn load_from(path: &str) -> Self {
        match Self::try_load_from(path) {
            Ok(config) => {
                if std::path::Path::new(path).exists() {
                    eprintln!("[INFO] Configuration loaded from: {}", path);
                }
                config
            }
            Err(e) => {
                eprintln!("[ERROR] Failed to load config: {}", e);
                Self::default()
            }
        }
    }

    pub fn try_load_from(path: &str) -> Result<Self, config::ConfigError> {
        use config::{Config, Environment, File};

        let mut builder = Config::builder()
            // 1. 从配置文件加载（可选）
            .add_source(File::with_name(path).required(false))
            // 2. 从环境变量覆盖
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            );

        // 3. 兼容旧版环境变量
        for (env_key, config_key) in LEGACY_ENV_KEYS {
            let value = std::env::var(env_key).ok().filter(|v| !v.is_empty());
            builder = builder.set_override_option(config_key, value)?;
        }

        builder.build()?.try_deserialize::<StaticConfig>()
    }

    /// 生成示例 TOML 配置文件
    pub fn generate_sample_config() -> String {
        let sample_config = Self::default();
        toml::to_string_pretty(&sample_config)
            .unwrap_or_else(|e| format!("Error generating sample config: {}", e))
    }
}

/// 服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_address")]
    pub address: String,
    /// 短链接前缀，生成 `{base_url}/{id}`
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

/// 存储配置
///
/// `database_dsn` 为空时使用内存存储；`file_storage_path` 仅对内存存储生效。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub database_dsn: String,
    #[serde(default)]
    pub file_storage_path: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,
    #[serde(default = "default_delete_flush_interval_secs")]
    pub delete_flush_interval_secs: u64,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,
    #[serde(default = "default_enable_rotation")]
    pub enable_rotation: bool,
}

// ============================================================
// Default value functions for static config
// ============================================================

fn default_server_address() -> String {
    "localhost:8080".to_string()
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_pool_size() -> u32 {
    10
}

fn default_query_timeout_secs() -> u64 {
    5
}

fn default_delete_flush_interval_secs() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_max_backups() -> u32 {
    5
}

fn default_enable_rotation() -> bool {
    true
}

// ============================================================
// Default implementations
// ============================================================

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_server_address(),
            base_url: default_base_url(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_dsn: String::new(),
            file_storage_path: String::new(),
            pool_size: default_pool_size(),
            query_timeout_secs: default_query_timeout_secs(),
            delete_flush_interval_secs: default_delete_flush_interval_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
            max_backups: default_max_backups(),
            enable_rotation: default_enable_rotation(),
        }
    }
}

impl StorageConfig {
    pub fn query_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.query_timeout_secs)
    }

    pub fn delete_flush_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.delete_flush_interval_secs.max(1))
    }
}
