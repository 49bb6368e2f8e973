use std::fmt;

#[derive(Debug, Clone)]
pub enum ShortenerError {
    Conflict(String),
    Gone(String),
    DatabaseConfig(String),
    DatabaseConnection(String),
    DatabaseOperation(String),
    Timeout(String),
    FileOperation(String),
    Serialization(String),
    Session(String),
}

impl ShortenerError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            ShortenerError::Conflict(_) => "E001",
            ShortenerError::Gone(_) => "E002",
            ShortenerError::DatabaseConfig(_) => "E003",
            ShortenerError::DatabaseConnection(_) => "E004",
            ShortenerError::DatabaseOperation(_) => "E005",
            ShortenerError::Timeout(_) => "E006",
            ShortenerError::FileOperation(_) => "E007",
            ShortenerError::Serialization(_) => "E008",
            ShortenerError::Session(_) => "E009",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            ShortenerError::Conflict(_) => "Conflict",
            ShortenerError::Gone(_) => "Resource Gone",
            ShortenerError::DatabaseConfig(_) => "Database Configuration Error",
            ShortenerError::DatabaseConnection(_) => "Database Connection Error",
            ShortenerError::DatabaseOperation(_) => "Database Operation Error",
            ShortenerError::Timeout(_) => "Operation Timed Out",
            ShortenerError::FileOperation(_) => "File Operation Error",
            ShortenerError::Serialization(_) => "Serialization Error",
            ShortenerError::Session(_) => "Session Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            ShortenerError::Conflict(msg) => msg,
            ShortenerError::Gone(msg) => msg,
            ShortenerError::DatabaseConfig(msg) => msg,
            ShortenerError::DatabaseConnection(msg) => msg,
            ShortenerError::DatabaseOperation(msg) => msg,
            ShortenerError::Timeout(msg) => msg,
            ShortenerError::FileOperation(msg) => msg,
            ShortenerError::Serialization(msg) => msg,
            ShortenerError::Session(msg) => msg,
        }
    }

    /// 唯一性约束冲突（重复 URL / 重复短码 / 重复会话）
    pub fn is_conflict(&self) -> bool {
        matches!(self, ShortenerError::Conflict(_))
    }

    /// 记录存在但已被软删除
    pub fn is_gone(&self) -> bool {
        matches!(self, ShortenerError::Gone(_))
    }

    /// 格式化为彩色输出（用于终端）
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        format!(
            "{} {} {}\n  {}",
            "[ERROR]".red().bold(),
            self.code().yellow(),
            self.error_type().red(),
            self.message().white()
        )
    }

    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for ShortenerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for ShortenerError {}

// 便捷的构造函数
impl ShortenerError {
    pub fn conflict<T: Into<String>>(msg: T) -> Self {
        ShortenerError::Conflict(msg.into())
    }

    pub fn gone<T: Into<String>>(msg: T) -> Self {
        ShortenerError::Gone(msg.into())
    }

    pub fn database_config<T: Into<String>>(msg: T) -> Self {
        ShortenerError::DatabaseConfig(msg.into())
    }

    pub fn database_connection<T: Into<String>>(msg: T) -> Self {
        ShortenerError::DatabaseConnection(msg.into())
    }

    pub fn database_operation<T: Into<String>>(msg: T) -> Self {
        ShortenerError::DatabaseOperation(msg.into())
    }

    pub fn timeout<T: Into<String>>(msg: T) -> Self {
        ShortenerError::Timeout(msg.into())
    }

    pub fn file_operation<T: Into<String>>(msg: T) -> Self {
        ShortenerError::FileOperation(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        ShortenerError::Serialization(msg.into())
    }

    pub fn session<T: Into<String>>(msg: T) -> Self {
        ShortenerError::Session(msg.into())
    }
}

// 为常见的错误类型实现 From trait
impl From<sea_orm::DbErr> for ShortenerError {
    fn from(err: sea_orm::DbErr) -> Self {
        ShortenerError::DatabaseOperation(err.to_string())
    }
}

impl From<std::io::Error> for ShortenerError {
    fn from(err: std::io::Error) -> Self {
        ShortenerError::FileOperation(err.to_string())
    }
}

impl From<csv::Error> for ShortenerError {
    fn from(err: csv::Error) -> Self {
        ShortenerError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ShortenerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct() {
        let errors = [
            ShortenerError::conflict("a"),
            ShortenerError::gone("a"),
            ShortenerError::database_config("a"),
            ShortenerError::database_connection("a"),
            ShortenerError::database_operation("a"),
            ShortenerError::timeout("a"),
            ShortenerError::file_operation("a"),
            ShortenerError::serialization("a"),
            ShortenerError::session("a"),
        ];
        let mut codes: Vec<&str> = errors.iter().map(|e| e.code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_predicates() {
        assert!(ShortenerError::conflict("dup").is_conflict());
        assert!(!ShortenerError::conflict("dup").is_gone());
        assert!(ShortenerError::gone("deleted").is_gone());
        assert!(!ShortenerError::timeout("slow").is_conflict());
    }

    #[test]
    fn test_display_uses_simple_format() {
        let err = ShortenerError::gone("URL with id abc is deleted");
        assert_eq!(err.to_string(), "Resource Gone: URL with id abc is deleted");
    }

    #[test]
    fn test_from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: ShortenerError = io.into();
        assert!(matches!(err, ShortenerError::FileOperation(_)));
    }
}
