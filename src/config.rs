use crate::filter::{ScopeRule, DEFAULT_CAP, EMPLOYEE_ID_FIELD, EMPLOYEE_SCOPE, MAX_CAP};
use crate::{Error, Result};
use directories::ProjectDirs;
use log::debug;
use serde::{Serialize, Deserialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Settings loaded once at start-up and shared by reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory server address
    pub url: String,
    /// Search base used when a query names no scope
    pub base: String,
    /// Suffix appended to the operator's account name when binding
    pub domain: String,
    /// Account to bind as when none is given on the command line
    pub username: Option<String>,
    pub employee_id_field: String,
    pub employee_scope: String,
    pub default_cap: usize,
    /// Reprompt after an invalid selection instead of giving up
    pub retry_on_invalid_selection: bool,
    /// Groups help desk staff must never change, by name or DN
    pub protected_groups: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            url: "ldaps://corp.example.com/".to_owned(),
            base: "DC=corp,DC=example,DC=com".to_owned(),
            domain: "corp.example.com".to_owned(),
            username: None,
            employee_id_field: EMPLOYEE_ID_FIELD.to_owned(),
            employee_scope: EMPLOYEE_SCOPE.to_owned(),
            default_cap: DEFAULT_CAP,
            retry_on_invalid_selection: true,
            protected_groups: Vec::new(),
        }
    }
}

impl Config {
    /// Load from `path`, or the per-user config file, or fall back to defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Config::from_file(path),
            None => match default_path() {
                Some(path) if path.is_file() => Config::from_file(&path),
                _ => {
                    debug!("no config file, using defaults");
                    Ok(Config::default())
                }
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("reading config from {}", path.display());
        let text = fs::read_to_string(path)?;
        Config::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text)?;
        if !(1..=MAX_CAP).contains(&config.default_cap) {
            return Err(Error::InvalidConfig(format!(
                "default_cap must be between 1 and {}, not {}",
                MAX_CAP, config.default_cap,
            )));
        }
        Ok(config)
    }

    pub fn scope_rule(&self) -> ScopeRule {
        ScopeRule {
            field: self.employee_id_field.clone(),
            scope: self.employee_scope.clone(),
        }
    }

    /// Whether a group, known by `name` and `dn`, is on the protected list
    pub fn is_protected(&self, name: &str, dn: &str) -> bool {
        self.protected_groups
            .iter()
            .any(|group| group.eq_ignore_ascii_case(name) || group.eq_ignore_ascii_case(dn))
    }
}

fn default_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "ad-lookup").map(|dirs| dirs.config_dir().join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_file_keeps_defaults() {
        let config = Config::parse(r#"
            url = "ldaps://dc01.corp.example.com/"
            protected_groups = ["Domain Admins", "CN=Enterprise Admins,CN=Users,DC=corp,DC=example,DC=com"]
            retry_on_invalid_selection = false
        "#).unwrap();

        assert_eq!(config.url, "ldaps://dc01.corp.example.com/");
        assert_eq!(config.default_cap, DEFAULT_CAP);
        assert!(!config.retry_on_invalid_selection);
        assert_eq!(config.scope_rule(), ScopeRule::default());
    }

    #[test]
    fn protected_groups_match_name_or_dn() {
        let config = Config {
            protected_groups: vec![
                "Domain Admins".into(),
                "CN=Enterprise Admins,CN=Users,DC=corp,DC=example,DC=com".into(),
            ],
            ..Config::default()
        };
        assert!(config.is_protected("domain admins", "CN=Domain Admins,CN=Users"));
        assert!(config.is_protected(
            "Enterprise Admins",
            "CN=Enterprise Admins,CN=Users,DC=corp,DC=example,DC=com",
        ));
        assert!(!config.is_protected("Help Desk", "CN=Help Desk,OU=Groups"));
    }

    #[test]
    fn bad_files_are_rejected() {
        assert!(matches!(Config::parse("default_cap = 0"), Err(Error::InvalidConfig(_))));
        assert!(matches!(Config::parse("default_cap = 500"), Err(Error::InvalidConfig(_))));
        assert!(matches!(Config::parse("colour = true"), Err(Error::Toml(_))));
    }

    #[test]
    fn loads_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "default_cap = 50").unwrap();
        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.default_cap, 50);
    }

    #[test]
    fn missing_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(matches!(Config::load(Some(&missing)), Err(Error::Io(_))));
    }
}
