//! Centralized path resolution for stead
//!
//! Every path is resolved below a root directory, which is `/` on a live
//! system. Pointing the root somewhere else lets stead operate on a
//! chroot or image, or on a scratch directory in tests.
//!
//! # Environment Variables
//!
//! - `STEAD_ROOT_DIR` - Root directory (default `/`)
//! - `STEAD_CONFIG_DIR` - Directory holding `stead.toml` (default `<root>/etc/stead`)
//! - `STEAD_DEFINITIONS_DIR` - Declaration files (default `<root>/usr/share/stead`)
//! - `STEAD_STATE_DIR` - Directory of `registry.toml` (default `<root>/var/lib/stead`)
//! - `STEAD_MOCK` - When set to `1`, print mutation commands instead of running them

use std::path::{Path, PathBuf};

/// Environment variable for the root directory
pub const ENV_ROOT_DIR: &str = "STEAD_ROOT_DIR";

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "STEAD_CONFIG_DIR";

/// Environment variable for definitions directory override
pub const ENV_DEFINITIONS_DIR: &str = "STEAD_DEFINITIONS_DIR";

/// Environment variable for state directory override
pub const ENV_STATE_DIR: &str = "STEAD_STATE_DIR";

/// Environment variable enabling mock command execution
pub const ENV_MOCK: &str = "STEAD_MOCK";

/// Name of the registry file inside the state directory
pub const REGISTRY_FILE: &str = "registry.toml";

/// Get the root directory
pub fn root_dir() -> PathBuf {
    match std::env::var(ENV_ROOT_DIR) {
        Ok(dir) if !dir.is_empty() => {
            let path = expand(&dir);
            log::debug!("Using root dir from {}: {}", ENV_ROOT_DIR, path.display());
            path
        }
        _ => PathBuf::from("/"),
    }
}

/// Get the directory holding `stead.toml`
pub fn config_dir(root: &Path) -> PathBuf {
    from_env_or(ENV_CONFIG_DIR, || root.join("etc").join("stead"))
}

/// Get the directory holding declaration files
///
/// Priority:
/// 1. `STEAD_DEFINITIONS_DIR` env var
/// 2. `definitions_dir` from `stead.toml` (below the root)
/// 3. `<root>/usr/share/stead`
pub fn definitions_dir(root: &Path, configured: Option<&str>) -> PathBuf {
    from_env_or(ENV_DEFINITIONS_DIR, || match configured {
        Some(dir) => under_root(root, &expand(dir)),
        None => root.join("usr").join("share").join("stead"),
    })
}

/// Get the registry file path
///
/// Priority:
/// 1. `STEAD_STATE_DIR` env var (the registry file inside it)
/// 2. `registry_path` from `stead.toml` (below the root)
/// 3. `<root>/var/lib/stead/registry.toml`
pub fn registry_path(root: &Path, configured: Option<&str>) -> PathBuf {
    if let Ok(dir) = std::env::var(ENV_STATE_DIR)
        && !dir.is_empty()
    {
        return expand(&dir).join(REGISTRY_FILE);
    }
    match configured {
        Some(path) => under_root(root, &expand(path)),
        None => root.join("var").join("lib").join("stead").join(REGISTRY_FILE),
    }
}

/// Whether mutation commands should only be printed
pub fn mock_enabled() -> bool {
    std::env::var(ENV_MOCK).is_ok_and(|v| v == "1")
}

fn from_env_or(key: &str, default: impl FnOnce() -> PathBuf) -> PathBuf {
    if let Ok(dir) = std::env::var(key)
        && !dir.is_empty()
    {
        let path = expand(&dir);
        log::debug!("Using {} from environment: {}", key, path.display());
        return path;
    }
    default()
}

/// Expand ~ and environment variables in a path string.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

/// Resolve `path` below `root` unless it is already relative to it
pub fn under_root(root: &Path, path: &Path) -> PathBuf {
    if path.starts_with(root) {
        return path.to_path_buf();
    }
    match path.strip_prefix("/") {
        Ok(relative) => root.join(relative),
        Err(_) => root.join(path),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    /// Helper to run a test with temporary env var
    ///
    /// Each test touches a different variable, so concurrent tests do not
    /// observe each other.
    fn with_env_var<F, R>(key: &str, value: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let original = env::var(key).ok();
        // SAFETY: no other test reads this variable
        unsafe { env::set_var(key, value) };
        let result = f();
        match original {
            // SAFETY: as above
            Some(v) => unsafe { env::set_var(key, v) },
            None => unsafe { env::remove_var(key) },
        }
        result
    }

    #[test]
    fn test_defaults_below_root() {
        let root = Path::new("/srv/image");
        if env::var(ENV_DEFINITIONS_DIR).is_err() {
            assert_eq!(
                definitions_dir(root, None),
                PathBuf::from("/srv/image/usr/share/stead")
            );
            assert_eq!(
                definitions_dir(root, Some("/etc/stead/defs")),
                PathBuf::from("/srv/image/etc/stead/defs")
            );
        }
        assert_eq!(
            under_root(root, Path::new("/etc/group")),
            PathBuf::from("/srv/image/etc/group")
        );
    }

    #[test]
    fn test_state_dir_env_override() {
        with_env_var(ENV_STATE_DIR, "/custom/state/path", || {
            let result = registry_path(Path::new("/"), Some("/elsewhere/registry.toml"));
            assert_eq!(result, PathBuf::from("/custom/state/path/registry.toml"));
        });
    }

    #[test]
    fn test_config_dir_env_override() {
        with_env_var(ENV_CONFIG_DIR, "/custom/config", || {
            assert_eq!(config_dir(Path::new("/")), PathBuf::from("/custom/config"));
        });
    }

    #[test]
    fn test_mock_flag() {
        with_env_var(ENV_MOCK, "1", || assert!(mock_enabled()));
        with_env_var(ENV_MOCK, "yes", || assert!(!mock_enabled()));
    }

    #[test]
    fn test_under_root_keeps_rooted_paths() {
        let root = Path::new("/srv/image");
        let path = Path::new("/srv/image/var/lib/stead/registry.toml");
        assert_eq!(under_root(root, path), path.to_path_buf());
        assert_eq!(
            under_root(root, Path::new("defs")),
            PathBuf::from("/srv/image/defs")
        );
    }

    #[test]
    fn test_expand_absolute() {
        let result = expand("/absolute/path");
        assert_eq!(result, PathBuf::from("/absolute/path"));
    }

    #[test]
    fn test_expand_with_env_var() {
        with_env_var("STEAD_TEST_EXPAND_VAR", "test_value", || {
            let result = expand("/path/$STEAD_TEST_EXPAND_VAR/file");
            assert_eq!(result, PathBuf::from("/path/test_value/file"));
        });
    }
}
