//! Path utilities for cross-platform support

use std::path::{Path, PathBuf};

/// Expand a path, replacing `~` with the user's home directory
pub fn expand_path(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}

fn home_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE").ok().map(PathBuf::from)
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME").ok().map(PathBuf::from)
    }
}

/// Get the default config directory for the current platform
///
/// - macOS: `~/Library/Application Support/RewardCraft`
/// - Linux: `$XDG_CONFIG_HOME/rewardcraft` or `~/.config/rewardcraft`
/// - Windows: `%APPDATA%\RewardCraft`
pub fn default_config_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        home_dir()
            .map(|h| h.join("Library/Application Support/RewardCraft"))
            .unwrap_or_else(|| PathBuf::from(".rewardcraft"))
    }
    #[cfg(target_os = "linux")]
    {
        std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                home_dir()
                    .map(|h| h.join(".config"))
                    .unwrap_or_else(|| PathBuf::from("."))
            })
            .join("rewardcraft")
    }
    #[cfg(target_os = "windows")]
    {
        std::env::var("APPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."))
            .join("RewardCraft")
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        home_dir()
            .map(|h| h.join(".rewardcraft"))
            .unwrap_or_else(|| PathBuf::from(".rewardcraft"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_plain_path_unchanged() {
        let path = PathBuf::from("/etc/rewardcraft.json");
        assert_eq!(expand_path(&path), path);
    }

    #[test]
    fn test_expand_tilde() {
        if let Some(home) = home_dir() {
            let expanded = expand_path(Path::new("~/rc/settings.json"));
            assert_eq!(expanded, home.join("rc/settings.json"));
        }
    }

    #[test]
    fn test_config_dir_is_app_specific() {
        let dir = default_config_dir();
        let name = dir.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        assert!(name.eq_ignore_ascii_case("rewardcraft") || name == ".rewardcraft");
    }
}
