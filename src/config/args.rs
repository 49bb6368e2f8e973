//! Command-line argument parsing
//!
//! Only the configuration file path is taken from the command line;
//! everything else comes from the config file and environment.

/// Parse configuration file path from command-line arguments
///
/// Supports `-c path`, `--config path`, `-c=path` and `--config=path`.
/// The last occurrence wins.
///
/// # Examples
/// ```
/// use shortener::config::args::parse_config_path;
/// let args = vec!["program".to_string(), "-c".to_string(), "custom.toml".to_string()];
/// assert_eq!(parse_config_path(&args), Some("custom.toml".to_string()));
/// ```
pub fn parse_config_path(args: &[String]) -> Option<String> {
    let mut found = None;
    let mut iter = args.iter().skip(1); // Skip program name

    while let Some(arg) = iter.next() {
        if arg == "-c" || arg == "--config" {
            if let Some(value) = iter.next() {
                found = Some(value.clone());
            }
        } else if let Some(path) = arg
            .strip_prefix("-c=")
            .or_else(|| arg.strip_prefix("--config="))
        {
            found = Some(path.to_string());
        }
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_config_path_short_flag() {
        assert_eq!(
            parse_config_path(&args(&["program", "-c", "custom.toml"])),
            Some("custom.toml".to_string())
        );
    }

    #[test]
    fn test_parse_config_path_long_equals() {
        assert_eq!(
            parse_config_path(&args(&["program", "--config=custom.toml"])),
            Some("custom.toml".to_string())
        );
    }

    #[test]
    fn test_parse_config_path_last_wins() {
        assert_eq!(
            parse_config_path(&args(&["program", "-c", "a.toml", "--config", "b.toml"])),
            Some("b.toml".to_string())
        );
    }

    #[test]
    fn test_parse_config_path_dangling_flag() {
        assert_eq!(parse_config_path(&args(&["program", "-c"])), None);
    }

    #[test]
    fn test_parse_config_path_none() {
        assert_eq!(parse_config_path(&args(&["program", "serve"])), None);
    }
}
