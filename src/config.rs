use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{DashboardError, Result};
use crate::table::DEFAULT_PAGE_SIZE;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub api_base_url: String,
    pub page_size: usize,
    pub export_dir: PathBuf,
}

/// Values given on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub config_file: Option<PathBuf>,
    pub api_base_url: Option<String>,
    pub page_size: Option<usize>,
    pub export_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    api_base_url: Option<String>,
    page_size: Option<usize>,
    export_dir: Option<PathBuf>,
}

fn load_file(path: &Path) -> Result<FileConfig> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        DashboardError::Config(format!("cannot read {}: {e}", path.display()))
    })?;
    toml::from_str(&raw)
        .map_err(|e| DashboardError::Config(format!("invalid {}: {e}", path.display())))
}

/// Flags and env first, then the TOML file, then defaults.
pub fn resolve(overrides: Overrides) -> Result<Settings> {
    let file = match overrides.config_file.as_deref() {
        Some(path) => load_file(path)?,
        None => FileConfig::default(),
    };

    let api_base_url = overrides
        .api_base_url
        .or(file.api_base_url)
        .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
    let page_size = overrides
        .page_size
        .or(file.page_size)
        .unwrap_or(DEFAULT_PAGE_SIZE);
    let export_dir = overrides
        .export_dir
        .or(file.export_dir)
        .unwrap_or_else(|| PathBuf::from("."));

    if page_size == 0 {
        return Err(DashboardError::Config("page_size must be at least 1".into()));
    }
    if api_base_url.trim().is_empty() {
        return Err(DashboardError::Config("api_base_url is empty".into()));
    }

    Ok(Settings {
        api_base_url: api_base_url.trim_end_matches('/').to_string(),
        page_size,
        export_dir,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn config_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_apply_without_file_or_flags() {
        let settings = resolve(Overrides::default()).unwrap();
        assert_eq!(settings.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(settings.page_size, 10);
        assert_eq!(settings.export_dir, PathBuf::from("."));
    }

    #[test]
    fn flags_win_over_file() {
        let file = config_file("api_base_url = \"http://file:9000/\"\npage_size = 25\n");
        let settings = resolve(Overrides {
            config_file: Some(file.path().to_path_buf()),
            api_base_url: Some("http://flag:8080".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(settings.api_base_url, "http://flag:8080");
        assert_eq!(settings.page_size, 25);
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let file = config_file("api_base_url = \"http://file:9000/\"\n");
        let settings = resolve(Overrides {
            config_file: Some(file.path().to_path_buf()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(settings.api_base_url, "http://file:9000");
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let err = resolve(Overrides {
            page_size: Some(0),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, DashboardError::Config(_)));
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let file = config_file("page_size = \"many\"\n");
        let err = resolve(Overrides {
            config_file: Some(file.path().to_path_buf()),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, DashboardError::Config(_)));
    }
}
