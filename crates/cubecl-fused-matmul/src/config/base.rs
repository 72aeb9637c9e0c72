use alloc::{string::String, sync::Arc};

use super::dispatch::{DispatchConfig, DispatchLogLevel, LaunchConfig};

/// Static mutex holding the global configuration, initialized as `None`.
static FUSED_MATMUL_GLOBAL_CONFIG: spin::Mutex<Option<Arc<GlobalConfig>>> = spin::Mutex::new(None);

/// Global configuration of the fused matmul dispatch.
///
/// It lives in the same `cubecl.toml` file as the runtime configuration; sections it does not
/// know about are ignored.
#[derive(Default, Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct GlobalConfig {
    /// Logging of variant probing and launches.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Default timing of launches.
    #[serde(default)]
    pub launch: LaunchConfig,
}

impl GlobalConfig {
    /// Retrieves the current global configuration, loading it from the current directory if not set.
    ///
    /// If no configuration is set, it attempts to load one from `cubecl.toml` or `CubeCL.toml` in the
    /// current directory or its parents, then applies environment overrides. If no file is found, a
    /// default configuration is used.
    pub fn get() -> Arc<Self> {
        let mut state = FUSED_MATMUL_GLOBAL_CONFIG.lock();

        if let Some(config) = state.as_ref() {
            return config.clone();
        }

        cfg_if::cfg_if! {
            if #[cfg(std_io)] {
                let config = Self::from_current_dir().override_from_env();
            } else {
                let config = Self::default();
            }
        }

        let config = Arc::new(config);
        *state = Some(config.clone());
        config
    }

    /// Sets the global configuration to the provided value.
    ///
    /// # Panics
    /// Panics if the configuration has already been set or read, as it cannot be overridden.
    pub fn set(config: Self) {
        let mut state = FUSED_MATMUL_GLOBAL_CONFIG.lock();
        if state.is_some() {
            panic!("Cannot set the global configuration multiple times.");
        }
        *state = Some(Arc::new(config));
    }

    /// Parses a configuration from the content of a toml file.
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    #[cfg(std_io)]
    /// Save the current configuration to the provided file path.
    pub fn save_default<P: AsRef<std::path::Path>>(path: P) -> std::io::Result<()> {
        use std::io::Write;

        let config = Self::get();
        let content = toml::to_string_pretty(config.as_ref())
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))?;
        let mut file = std::fs::File::create(path)?;
        file.write_all(content.as_bytes())?;

        Ok(())
    }

    /// Overrides configuration fields based on environment variables.
    pub fn override_from_env(self) -> Self {
        self.override_from_vars(|name| std::env::var(name).ok())
    }

    /// Overrides configuration fields from variables looked up with `var`.
    ///
    /// - `CUBECL_DEBUG_LOG`: `stdout`, `stderr`, `1|true` for `/tmp/cubecl.log`, `0|false` to
    ///   disable, anything else is a file path.
    /// - `CUBECL_DEBUG_OPTION`: `debug` logs every descriptor.
    /// - `CUBECL_TIME_KERNEL`: `1|true` or `0|false`.
    pub fn override_from_vars<F: Fn(&str) -> Option<String>>(mut self, var: F) -> Self {
        let logger = &mut self.dispatch.logger;

        if let Some(val) = var("CUBECL_DEBUG_LOG") {
            logger.level = DispatchLogLevel::Basic;

            match val.as_str() {
                "stdout" => logger.stdout = true,
                "stderr" => logger.stderr = true,
                #[cfg(std_io)]
                "1" | "true" => logger.file = Some("/tmp/cubecl.log".into()),
                "0" | "false" => logger.level = DispatchLogLevel::Disabled,
                #[cfg(std_io)]
                file_path => logger.file = Some(file_path.into()),
                #[cfg(not(std_io))]
                _ => {}
            }
        }

        if let Some("debug") = var("CUBECL_DEBUG_OPTION").as_deref() {
            logger.level = DispatchLogLevel::Full;
        }

        if let Some(val) = var("CUBECL_TIME_KERNEL") {
            match val.as_str() {
                "1" | "true" => self.launch.time_kernel = true,
                "0" | "false" => self.launch.time_kernel = false,
                _ => {}
            }
        }

        self
    }

    // Loads configuration from `cubecl.toml` or `CubeCL.toml` in the current directory or its parents.
    //
    // Traverses up the directory tree until a valid configuration file is found or the root is reached.
    // Returns a default configuration if no file is found.
    #[cfg(std_io)]
    fn from_current_dir() -> Self {
        let Ok(mut dir) = std::env::current_dir() else {
            return Self::default();
        };

        loop {
            for name in ["cubecl.toml", "CubeCL.toml"] {
                if let Some(config) = Self::from_file_path(dir.join(name)) {
                    return config;
                }
            }

            if !dir.pop() {
                break;
            }
        }

        Self::default()
    }

    // Loads configuration from a specified file path, skipping files with an invalid format.
    #[cfg(std_io)]
    fn from_file_path<P: AsRef<std::path::Path>>(path: P) -> Option<Self> {
        let content = std::fs::read_to_string(path.as_ref()).ok()?;

        match Self::from_toml_str(&content) {
            Ok(config) => Some(config),
            Err(err) => {
                log::warn!(
                    "Ignoring {}, it doesn't have the right format => {err}",
                    path.as_ref().display()
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hashbrown::HashMap;
    use serial_test::serial;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test_log::test]
    fn parses_known_sections_and_ignores_others() {
        let config = GlobalConfig::from_toml_str(
            r#"
            [autotune]
            level = "full"

            [dispatch.logger]
            stdout = true
            level = "full"

            [launch]
            time_kernel = true
            timed_iterations = 10
            "#,
        )
        .unwrap();

        assert!(config.dispatch.logger.stdout);
        assert_eq!(config.dispatch.logger.level, DispatchLogLevel::Full);
        assert!(config.launch.time_kernel);
        assert_eq!(config.launch.cold_iterations, 5);
        assert_eq!(config.launch.timed_iterations, 10);
    }

    #[test_log::test]
    fn defaults_are_silent_and_untimed() {
        let config = GlobalConfig::from_toml_str("").unwrap();

        assert!(!config.dispatch.logger.stdout);
        assert!(!config.dispatch.logger.stderr);
        assert!(config.dispatch.logger.log.is_none());
        assert!(!config.launch.time_kernel);
    }

    #[test_log::test]
    fn env_overrides() {
        let config = GlobalConfig::default().override_from_vars(vars(&[
            ("CUBECL_DEBUG_LOG", "stderr"),
            ("CUBECL_DEBUG_OPTION", "debug"),
            ("CUBECL_TIME_KERNEL", "1"),
        ]));

        assert!(config.dispatch.logger.stderr);
        assert_eq!(config.dispatch.logger.level, DispatchLogLevel::Full);
        assert!(config.launch.time_kernel);

        let config = GlobalConfig::default().override_from_vars(vars(&[("CUBECL_DEBUG_LOG", "0")]));
        assert_eq!(config.dispatch.logger.level, DispatchLogLevel::Disabled);
    }

    #[test_log::test]
    #[serial]
    fn global_config_is_loaded_once() {
        let first = GlobalConfig::get();
        let second = GlobalConfig::get();

        assert!(Arc::ptr_eq(&first, &second));
    }
}
