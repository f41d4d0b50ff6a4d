use std::env;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = ".use-methods.toml";

/// Load config file content from CWD first, then home directory
///
/// Returns the file content if found, None otherwise.
pub fn load_config_file() -> Option<String> {
    let home = env::var_os("HOME").map(PathBuf::from);
    load_config_file_from(Path::new("."), home.as_deref())
}

/// Look for [`CONFIG_FILE`] in `cwd`, then in `home`
pub fn load_config_file_from(cwd: &Path, home: Option<&Path>) -> Option<String> {
    std::iter::once(cwd)
        .chain(home)
        .map(|dir| dir.join(CONFIG_FILE))
        .find_map(|path| match std::fs::read_to_string(&path) {
            Ok(content) => {
                log::debug!("Loaded config from {}", path.display());
                Some(content)
            }
            Err(e) => {
                log::trace!("No config at {}: {}", path.display(), e);
                None
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn dir_with_config(content: Option<&str>) -> TempDir {
        let dir = TempDir::new().unwrap();
        if let Some(content) = content {
            std::fs::write(dir.path().join(CONFIG_FILE), content).unwrap();
        }
        dir
    }

    #[test]
    fn test_working_directory_wins_over_home() {
        let cwd = dir_with_config(Some("log_actions = true"));
        let home = dir_with_config(Some("log_actions = false"));

        let content = load_config_file_from(cwd.path(), Some(home.path()));
        assert_eq!(content.as_deref(), Some("log_actions = true"));
    }

    #[test]
    fn test_falls_back_to_home() {
        let cwd = dir_with_config(None);
        let home = dir_with_config(Some("enable_loading = true"));

        let content = load_config_file_from(cwd.path(), Some(home.path()));
        assert_eq!(content.as_deref(), Some("enable_loading = true"));
    }

    #[test]
    fn test_missing_everywhere_is_none() {
        let cwd = dir_with_config(None);
        assert_eq!(load_config_file_from(cwd.path(), None), None);

        let home = dir_with_config(None);
        assert_eq!(load_config_file_from(cwd.path(), Some(home.path())), None);
    }
}
