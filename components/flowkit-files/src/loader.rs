use crate::config::Config;
use crate::env::EnvLookup;
use crate::{json, paths, ConfigError, ReaderWriter};

pub const DEFAULT_CONFIG_FILE: &str = "flow.json";
pub const CONFIG_FILE_PERMISSIONS: u32 = 0o644;

/// `$HOME/flow.json`, when a home directory is known.
pub fn global_path() -> Option<String> {
    dirs::home_dir().map(|home| {
        home.join(DEFAULT_CONFIG_FILE)
            .to_string_lossy()
            .to_string()
    })
}

pub fn local_path() -> String {
    DEFAULT_CONFIG_FILE.to_string()
}

/// Global then local configuration path.
pub fn default_paths() -> Vec<String> {
    let mut paths = vec![];
    if let Some(global) = global_path() {
        paths.push(global);
    }
    paths.push(local_path());
    paths
}

pub fn is_default_paths(paths: &[String]) -> bool {
    paths == default_paths().as_slice()
}

/// Reads and merges configuration files, remembering which ones were loaded.
pub struct Loader<'a> {
    rw: &'a dyn ReaderWriter,
    lookup: &'a EnvLookup,
    loaded_paths: Vec<String>,
}

impl<'a> Loader<'a> {
    pub fn new(rw: &'a dyn ReaderWriter, lookup: &'a EnvLookup) -> Loader<'a> {
        Loader {
            rw,
            lookup,
            loaded_paths: vec![],
        }
    }

    /// Merges `paths` in order, later files overriding earlier ones.
    ///
    /// Missing files are skipped for the default path pair; any other
    /// missing path fails the load.
    pub fn load(&mut self, config_paths: &[String]) -> Result<Config, ConfigError> {
        let tolerate_missing = is_default_paths(config_paths);
        let mut merged: Option<Config> = None;
        for path in config_paths {
            let bytes = match self.rw.read_file(&paths::from_slash(path)) {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    if tolerate_missing {
                        continue;
                    }
                    return Err(ConfigError::Missing);
                }
                Err(e) => {
                    return Err(ConfigError::Io(format!(
                        "could not read configuration {path}: {e}"
                    )))
                }
            };
            let config = json::decode(&bytes, self.lookup)?;
            self.loaded_paths.push(path.clone());
            match merged.as_mut() {
                Some(base) => base.merge(config),
                None => merged = Some(config),
            }
        }
        merged.ok_or(ConfigError::Missing)
    }

    pub fn save(&self, config: &Config, path: &str) -> Result<(), ConfigError> {
        let bytes = json::encode(config)?;
        self.rw
            .write_file(&paths::from_slash(path), &bytes, CONFIG_FILE_PERMISSIONS)
            .map_err(|e| ConfigError::Io(format!("could not write configuration {path}: {e}")))
    }

    pub fn loaded_paths(&self) -> &[String] {
        &self.loaded_paths
    }

    /// Directory of the configuration, when exactly one file was loaded.
    pub fn config_dir(&self) -> Option<String> {
        match self.loaded_paths.as_slice() {
            [single] => Some(paths::dir(single)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryReaderWriter;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn later_files_win() {
        let rw = MemoryReaderWriter::new()
            .with_file("a/flow.json", r#"{ "networks": { "emulator": "127.0.0.1:3569", "testnet": "a:9000" } }"#)
            .with_file("b/flow.json", r#"{ "networks": { "testnet": "b:9000" } }"#);
        let mut loader = Loader::new(&rw, &no_env);
        let config = loader
            .load(&["a/flow.json".to_string(), "b/flow.json".to_string()])
            .unwrap();
        assert_eq!(config.networks.by_name("testnet").unwrap().host, "b:9000");
        assert_eq!(config.networks.len(), 2);
        assert_eq!(loader.loaded_paths().len(), 2);
        assert_eq!(loader.config_dir(), None);
    }

    #[test]
    fn missing_explicit_path_fails() {
        let rw = MemoryReaderWriter::new();
        let mut loader = Loader::new(&rw, &no_env);
        assert!(matches!(
            loader.load(&["nowhere/flow.json".to_string()]),
            Err(ConfigError::Missing)
        ));
    }

    #[test]
    fn single_file_sets_config_dir() {
        let rw = MemoryReaderWriter::new().with_file("project/flow.json", "{}");
        let mut loader = Loader::new(&rw, &no_env);
        loader.load(&["project/flow.json".to_string()]).unwrap();
        assert_eq!(loader.config_dir(), Some("project".to_string()));
    }
}
