//! Configuration utility functions.

use std::path::{Path, PathBuf};

/// Find config file by searching upward from current directory
///
/// Starts from cwd and walks up parent directories until finding `config_name`
/// Returns the absolute path to the config file if found
///
/// # Example
/// ```text
/// /home/user/site/app/pages/    ← cwd
/// /home/user/site/sitepipe.toml ← found!
/// ```
pub fn find_config_file(config_name: &Path) -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    find_config_from(&cwd, config_name)
}

fn find_config_from(start: &Path, config_name: &Path) -> Option<PathBuf> {
    if config_name.is_absolute() {
        return config_name.exists().then(|| config_name.to_path_buf());
    }

    let mut current = start;
    loop {
        let candidate = current.join(config_name);
        if candidate.is_file() {
            return Some(candidate);
        }
        current = current.parent()?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_find_config_walks_upward() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("app/pages");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join("sitepipe.toml"), "").unwrap();

        let found = find_config_from(&nested, Path::new("sitepipe.toml")).unwrap();
        assert_eq!(found, dir.path().join("sitepipe.toml"));
    }

    #[test]
    fn test_find_config_missing() {
        let dir = TempDir::new().unwrap();
        assert!(find_config_from(dir.path(), Path::new("no-such-config-4f2a.toml")).is_none());
    }

    #[test]
    fn test_find_config_absolute() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        fs::write(&path, "").unwrap();
        assert_eq!(find_config_from(Path::new("/"), &path), Some(path.clone()));
    }
}
