use serde::{Deserialize, Serialize};
use std::path::Path;
use crate::error::{Result, SyncError};

fn default_endpoint_path() -> String {
    "/api/crowdin-sync".to_string()
}

fn default_api_version() -> String {
    "2024-04-30".to_string()
}

fn default_language_field() -> String {
    "locale".to_string()
}

fn default_pathname_field() -> String {
    "pathname".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub vendor: VendorConfig,
    pub i18n: I18nConfig,
    #[serde(default)]
    pub codec: CodecConfig,
    #[serde(default)]
    pub directories: Vec<DirectoryRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind the endpoint to
    pub bind_addr: String,
    /// Port to listen on
    pub port: u16,
    /// Route of the sync endpoint
    #[serde(default = "default_endpoint_path")]
    pub endpoint_path: String,
    /// Origin used for preview links when the request has no Host header
    pub public_origin: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// Sanity HTTP API
    Sanity,
    /// In-process store, nothing survives a restart
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub kind: StoreKind,
    /// Sanity project id
    pub project_id: String,
    pub dataset: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Write token; overridden by SANITY_API_TOKEN
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub use_cdn: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorConfig {
    /// Crowdin personal access token; overridden by CROWDIN_ACCESS_TOKEN
    #[serde(default)]
    pub access_token: String,
    /// Crowdin project id; overridden by CROWDIN_PROJECT_ID
    pub project_id: u64,
    /// Crowdin Enterprise organization; overridden by CROWDIN_ORGANIZATION
    pub organization: Option<String>,
    /// API base URL override, mostly for proxies
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct I18nConfig {
    /// Language of source documents
    pub source_lang: String,
    /// Every locale the site supports, source included
    pub supported_langs: Vec<String>,
    /// Document field holding the language tag
    #[serde(default = "default_language_field")]
    pub language_field: String,
    /// Document field holding `{ current }` with the route of the document
    #[serde(default = "default_pathname_field")]
    pub pathname_field: String,
}

impl I18nConfig {
    pub fn supported_target_langs(&self) -> Vec<String> {
        self.supported_langs
            .iter()
            .filter(|lang| !lang.eq_ignore_ascii_case(&self.source_lang))
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CodecConfig {
    /// Field names never shown to translators, on top of the built-in ones
    #[serde(default)]
    pub hidden_fields: Vec<String>,
    /// Object type names never shown to translators
    #[serde(default)]
    pub hidden_objects: Vec<String>,
}

/// Documents of `doc_type` are uploaded into the Crowdin directory `name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectoryRule {
    pub doc_type: String,
    pub name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                bind_addr: "127.0.0.1".to_string(),
                port: 3000,
                endpoint_path: default_endpoint_path(),
                public_origin: None,
            },
            store: StoreConfig {
                kind: StoreKind::Sanity,
                project_id: String::new(),
                dataset: "production".to_string(),
                api_version: default_api_version(),
                token: String::new(),
                use_cdn: false,
            },
            vendor: VendorConfig {
                access_token: String::new(),
                project_id: 0,
                organization: None,
                base_url: None,
            },
            i18n: I18nConfig {
                source_lang: "en".to_string(),
                supported_langs: vec!["en".to_string(), "fr".to_string()],
                language_field: default_language_field(),
                pathname_field: default_pathname_field(),
            },
            codec: CodecConfig::default(),
            directories: vec![DirectoryRule {
                doc_type: "quoteItem".to_string(),
                name: "Customer Quotes".to_string(),
            }],
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SyncError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| SyncError::Config(format!("Failed to parse config file: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| SyncError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| SyncError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Secrets come from the environment when present.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup("SANITY_API_TOKEN") {
            self.store.token = token;
        }
        if let Some(token) = lookup("CROWDIN_ACCESS_TOKEN") {
            self.vendor.access_token = token;
        }
        if let Some(project_id) = lookup("CROWDIN_PROJECT_ID") {
            self.vendor.project_id = project_id.trim().parse().map_err(|_| {
                SyncError::Config(format!("CROWDIN_PROJECT_ID is not a number: {}", project_id))
            })?;
        }
        if let Some(organization) = lookup("CROWDIN_ORGANIZATION") {
            self.vendor.organization = if organization.is_empty() {
                None
            } else {
                Some(organization)
            };
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.store.kind == StoreKind::Sanity {
            if self.store.project_id.is_empty() {
                return Err(SyncError::Config("Missing store project_id".to_string()));
            }
            if self.store.token.is_empty() {
                return Err(SyncError::Config(
                    "Missing write token in content store config".to_string(),
                ));
            }
        }

        if self.vendor.access_token.is_empty() {
            return Err(SyncError::Config("Missing vendor access_token".to_string()));
        }

        for field in [&self.i18n.language_field, &self.i18n.pathname_field] {
            if !is_identifier(field) {
                return Err(SyncError::Config(format!("Invalid field name: {}", field)));
            }
        }

        Ok(())
    }
}

/// Field names end up inside store queries.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.vendor.project_id = 42;
        config.save_to_file(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.vendor.project_id, 42);
        assert_eq!(loaded.server.endpoint_path, "/api/crowdin-sync");
        assert_eq!(loaded.directories, config.directories);
    }

    #[test]
    fn test_minimal_file_uses_defaults() {
        let content = r#"
            [server]
            bind_addr = "0.0.0.0"
            port = 8080

            [store]
            kind = "memory"
            project_id = ""
            dataset = "test"

            [vendor]
            project_id = 7

            [i18n]
            source_lang = "en"
            supported_langs = ["en", "fr", "pt-br"]
        "#;
        let config: Config = toml::from_str(content).unwrap();
        assert_eq!(config.store.kind, StoreKind::Memory);
        assert_eq!(config.i18n.language_field, "locale");
        assert_eq!(config.i18n.supported_target_langs(), vec!["fr", "pt-br"]);
        assert!(config.directories.is_empty());
    }

    #[test]
    fn test_overrides_and_validation() {
        let mut config = Config::default();
        config.store.project_id = "abc123".to_string();
        assert!(config.validate().is_err());

        config
            .apply_overrides(|key| match key {
                "SANITY_API_TOKEN" => Some("sk-write".to_string()),
                "CROWDIN_ACCESS_TOKEN" => Some("crowdin".to_string()),
                "CROWDIN_PROJECT_ID" => Some("99".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.vendor.project_id, 99);
        config.validate().unwrap();

        config.i18n.language_field = "locale) || true".to_string();
        assert!(config.validate().is_err());

        let bad = config.apply_overrides(|key| {
            (key == "CROWDIN_PROJECT_ID").then(|| "abc".to_string())
        });
        assert!(bad.is_err());
    }
}
