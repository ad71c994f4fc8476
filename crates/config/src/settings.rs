use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

/// Environment variables starting with this prefix override file values.
/// Nested keys are separated by a double underscore, so
/// `MULTIREAD_CONTAINER__SUFFIX` sets `container.suffix`.
pub const ENV_PREFIX: &str = "MULTIREAD_";

const DEFAULT_BATCH_SIZE: NonZeroUsize = match NonZeroUsize::new(4000) {
    Some(size) => size,
    None => unreachable!(),
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub container: ContainerSettings,
    /// Records per output container when converting.
    pub batch_size: NonZeroUsize,
    /// Scan input directories recursively.
    pub recursive: bool,
    /// Output containers are named `{filename_base}_{index}{suffix}`.
    pub filename_base: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            container: ContainerSettings::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            recursive: false,
            filename_base: String::from("batch"),
        }
    }
}

/// Naming conventions for containers and the records inside them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerSettings {
    /// File suffix identifying a container.
    pub suffix: String,
    /// Joins a container stem and a record id in a virtual path.
    pub separator: String,
    /// Top-level entries starting with this are records.
    pub record_prefix: String,
    /// Section every single-record container is expected to carry.
    pub analyses_section: String,
    /// Oldest container library version that handles multi-record files.
    pub minimum_version: String,
}

impl Default for ContainerSettings {
    fn default() -> Self {
        Self {
            suffix: String::from(".fast5"),
            separator: String::from("___read_"),
            record_prefix: String::from("read_"),
            analyses_section: String::from("Analyses"),
            minimum_version: String::from("2.9.0"),
        }
    }
}

impl Settings {
    /// Load settings from defaults, an optional config file, then the
    /// environment (each layer overriding the last).
    ///
    /// The file format is picked from its extension.
    #[tracing::instrument(skip_all, fields(path = ?path.map(Path::display)))]
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()));
        if let Some(path) = path {
            if !path.is_file() {
                exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
            }
            let extension = path.extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase);
            figment = match extension.as_deref() {
                Some("toml") => figment.merge(Toml::file(path)),
                Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
                Some("json") => figment.merge(Json::file(path)),
                _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
            };
        }
        let settings: Settings =
            figment.merge(Env::prefixed(ENV_PREFIX).split("__")).extract().or_raise(|| ErrorKind::Load)?;
        settings.validate()?;
        tracing::debug!(batch_size = settings.batch_size.get(), recursive = settings.recursive, "Loaded settings");
        Ok(settings)
    }

    /// Load from the per-user config file if there is one.
    pub fn load_user() -> Result<Self> {
        let path = Self::default_path().filter(|path| path.is_file());
        Self::load(path.as_deref())
    }

    /// Per-user config file location (e.g. `~/.config/multiread/config.toml`).
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "multiread").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    pub fn validate(&self) -> Result<()> {
        let container = &self.container;
        if container.suffix.len() < 2 || !container.suffix.starts_with('.') {
            return invalid("container.suffix", "must be a dot followed by at least one character");
        }
        if container.separator.is_empty() {
            return invalid("container.separator", "must not be empty");
        }
        if container.separator.contains(['/', '\\']) {
            return invalid("container.separator", "must not contain a path separator");
        }
        if container.record_prefix.is_empty() {
            return invalid("container.record_prefix", "must not be empty");
        }
        if container.analyses_section.is_empty() {
            return invalid("container.analyses_section", "must not be empty");
        }
        if container.minimum_version.trim().is_empty() {
            return invalid("container.minimum_version", "must not be empty");
        }
        if self.filename_base.is_empty() || self.filename_base.contains(['/', '\\']) {
            return invalid("filename_base", "must be a non-empty file name");
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: &'static str) -> Result<()> {
    exn::bail!(ErrorKind::Invalid { field, reason })
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use rstest::rstest;

    #[test]
    fn test_defaults() {
        Jail::expect_with(|_| {
            let settings = Settings::load(None).unwrap();
            assert_eq!(settings, Settings::default());
            assert_eq!(settings.batch_size.get(), 4000);
            assert_eq!(settings.container.separator, "___read_");
            Ok(())
        });
    }

    #[rstest]
    #[case("multiread.toml", "batch_size = 10\n[container]\nsuffix = \".f5\"\n")]
    #[case("multiread.yaml", "batch_size: 10\ncontainer:\n  suffix: .f5\n")]
    #[case("multiread.JSON", r#"{"batch_size": 10, "container": {"suffix": ".f5"}}"#)]
    fn test_file_layer(#[case] name: &str, #[case] contents: &str) {
        Jail::expect_with(|jail| {
            jail.create_file(name, contents)?;
            let settings = Settings::load(Some(Path::new(name))).unwrap();
            assert_eq!(settings.batch_size.get(), 10);
            assert_eq!(settings.container.suffix, ".f5");
            // Untouched keys keep their defaults.
            assert_eq!(settings.container.record_prefix, "read_");
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("multiread.toml", "batch_size = 10\nrecursive = false\n")?;
            jail.set_env("MULTIREAD_BATCH_SIZE", "25");
            jail.set_env("MULTIREAD_RECURSIVE", "true");
            jail.set_env("MULTIREAD_CONTAINER__MINIMUM_VERSION", "3.1.4");
            let settings = Settings::load(Some(Path::new("multiread.toml"))).unwrap();
            assert_eq!(settings.batch_size.get(), 25);
            assert!(settings.recursive);
            assert_eq!(settings.container.minimum_version, "3.1.4");
            Ok(())
        });
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        Jail::expect_with(|jail| {
            jail.set_env("MULTIREAD_BATCH_SIZE", "0");
            let err = Settings::load(None).unwrap_err();
            assert_eq!(*err, ErrorKind::Load);
            Ok(())
        });
    }

    #[test]
    fn test_missing_file() {
        let err = Settings::load(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("multiread.ini");
        std::fs::write(&path, "batch_size = 10").unwrap();
        let err = Settings::load(Some(&path)).unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnsupportedFormat(_)));
    }

    #[rstest]
    #[case::no_dot(|s: &mut Settings| s.container.suffix = String::from("fast5"), "container.suffix")]
    #[case::bare_dot(|s: &mut Settings| s.container.suffix = String::from("."), "container.suffix")]
    #[case::empty_separator(|s: &mut Settings| s.container.separator.clear(), "container.separator")]
    #[case::slash_separator(|s: &mut Settings| s.container.separator = String::from("_/_"), "container.separator")]
    #[case::empty_prefix(|s: &mut Settings| s.container.record_prefix.clear(), "container.record_prefix")]
    #[case::empty_section(|s: &mut Settings| s.container.analyses_section.clear(), "container.analyses_section")]
    #[case::blank_version(
        |s: &mut Settings| s.container.minimum_version = String::from(" "),
        "container.minimum_version"
    )]
    #[case::nested_base(|s: &mut Settings| s.filename_base = String::from("out/batch"), "filename_base")]
    fn test_validate(#[case] tweak: fn(&mut Settings), #[case] expected: &str) {
        let mut settings = Settings::default();
        assert!(settings.validate().is_ok());
        tweak(&mut settings);
        match &*settings.validate().unwrap_err() {
            ErrorKind::Invalid { field, .. } => assert_eq!(*field, expected),
            other => panic!("unexpected error: {other}"),
        }
    }
}
