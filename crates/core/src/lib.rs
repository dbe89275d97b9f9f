pub mod board;
pub mod domain;
pub mod error;
pub mod ingest;
pub mod time;
pub mod timeline;
pub mod view;

pub mod config {
    use anyhow::Context;
    use std::path::PathBuf;
    use std::str::FromStr;

    const DEFAULT_TIMEOUT_SECS: u64 = 10;
    const DEFAULT_RETRIES: u32 = 3;
    const DEFAULT_REFRESH_SECS: u64 = 300;
    const DEFAULT_HISTORY_WINDOW: usize = 30;
    const DEFAULT_PORT: u16 = 3000;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub content_base_url: Option<String>,
        pub content_dir: Option<PathBuf>,
        pub content_timeout_secs: u64,
        pub content_retries: u32,
        pub board_refresh_secs: u64,
        pub history_window: usize,
        pub sentry_dsn: Option<String>,
        pub port: u16,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                content_base_url: non_empty_var("CONTENT_BASE_URL"),
                content_dir: non_empty_var("CONTENT_DIR").map(PathBuf::from),
                content_timeout_secs: parse_var("CONTENT_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?,
                content_retries: parse_var("CONTENT_RETRIES", DEFAULT_RETRIES)?,
                board_refresh_secs: parse_var("BOARD_REFRESH_SECS", DEFAULT_REFRESH_SECS)?,
                history_window: parse_var("HISTORY_WINDOW", DEFAULT_HISTORY_WINDOW)?,
                sentry_dsn: non_empty_var("SENTRY_DSN"),
                port: parse_var("PORT", DEFAULT_PORT)?,
            })
        }

        pub fn require_content_base_url(&self) -> anyhow::Result<&str> {
            self.content_base_url
                .as_deref()
                .context("CONTENT_BASE_URL is required (or set CONTENT_DIR)")
        }
    }

    fn non_empty_var(key: &str) -> Option<String> {
        std::env::var(key)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    // Unset falls back to the default; a set but unparseable value is an error.
    fn parse_var<T: FromStr>(key: &str, default: T) -> anyhow::Result<T> {
        match non_empty_var(key) {
            Some(s) => s
                .parse::<T>()
                .ok()
                .with_context(|| format!("{key} is not a valid value: {s:?}")),
            None => Ok(default),
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn unset_numeric_var_uses_default() {
            let v: u32 = parse_var("REGIMEBOARD_TEST_UNSET_RETRIES", 3).unwrap();
            assert_eq!(v, 3);
        }

        #[test]
        fn malformed_numeric_var_is_an_error() {
            std::env::set_var("REGIMEBOARD_TEST_BAD_TIMEOUT", "ten");
            let res: anyhow::Result<u64> = parse_var("REGIMEBOARD_TEST_BAD_TIMEOUT", 10);
            assert!(res.is_err());
        }

        #[test]
        fn out_of_range_port_is_an_error() {
            std::env::set_var("REGIMEBOARD_TEST_BAD_PORT", "70000");
            let res: anyhow::Result<u16> = parse_var("REGIMEBOARD_TEST_BAD_PORT", DEFAULT_PORT);
            assert!(res.is_err());
        }

        #[test]
        fn blank_var_counts_as_unset() {
            std::env::set_var("REGIMEBOARD_TEST_BLANK_URL", "   ");
            assert_eq!(non_empty_var("REGIMEBOARD_TEST_BLANK_URL"), None);
        }
    }
}
