use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "novelbug", about = "Bedtime story server")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Path to data directory
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub email: EmailConfig,
    pub writer: WriterConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AuthConfig {
    /// Kinde tenant, e.g. `novelbug.kinde.com`
    pub kinde_domain: Option<String>,
    pub audience: Option<String>,
    pub session_cookie: String,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct EmailConfig {
    pub resend_api_key: Option<String>,
    pub from: String,
    /// Inbox that receives contact and feedback messages
    pub contact_to: String,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct WriterConfig {
    pub base_url: Option<String>,
    pub agent_id: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            kinde_domain: None,
            audience: None,
            session_cookie: "access_token".to_string(),
        }
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            resend_api_key: None,
            from: "NovelBug <hello@novelbug.app>".to_string(),
            contact_to: "support@novelbug.app".to_string(),
        }
    }
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            agent_id: "storyAgent".to_string(),
            api_key: None,
            timeout_secs: 120,
        }
    }
}

impl Config {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        Self::load_with_env(cli, |key| std::env::var(key).ok())
    }

    /// `env` looks up a variable by name; tests pass a closure instead of
    /// touching the process environment.
    pub fn load_with_env(cli: &Cli, env: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let data_dir = Self::data_dir(cli)?;
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| data_dir.join("config.toml"));

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };

        // Secrets usually arrive through the environment
        let var = |key: &str| env(key).filter(|v| !v.trim().is_empty());
        if let Some(domain) = var("KINDE_DOMAIN") {
            config.auth.kinde_domain = Some(domain);
        }
        if let Some(audience) = var("KINDE_AUDIENCE") {
            config.auth.audience = Some(audience);
        }
        if let Some(key) = var("RESEND_API_KEY") {
            config.email.resend_api_key = Some(key);
        }
        if let Some(url) = var("STORY_AGENT_URL") {
            config.writer.base_url = Some(url);
        }
        if let Some(key) = var("STORY_AGENT_API_KEY") {
            config.writer.api_key = Some(key);
        }

        // CLI overrides
        if let Some(ref host) = cli.host {
            config.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            config.server.port = port;
        }

        if config.database.path.is_none() {
            config.database.path = Some(data_dir.join("novelbug.db"));
        }

        Ok(config)
    }

    pub fn data_dir(cli: &Cli) -> anyhow::Result<PathBuf> {
        match &cli.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => dirs::home_dir()
                .map(|home| home.join(".novelbug"))
                .ok_or_else(|| anyhow::anyhow!("Could not determine home directory")),
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from("novelbug.db"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn cli(data_dir: PathBuf) -> Cli {
        Cli {
            config: None,
            host: None,
            port: None,
            data_dir: Some(data_dir),
        }
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn default_config_has_expected_values() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.auth.session_cookie, "access_token");
        assert!(config.auth.kinde_domain.is_none());
        assert!(config.email.resend_api_key.is_none());
        assert!(config.writer.base_url.is_none());
        assert_eq!(config.writer.timeout_secs, 120);
        assert!(config.database.path.is_none());
    }

    #[test]
    fn data_dir_uses_cli_override() {
        let cli = cli(PathBuf::from("/tmp/test-novelbug"));
        assert_eq!(
            Config::data_dir(&cli).unwrap(),
            PathBuf::from("/tmp/test-novelbug")
        );
    }

    #[test]
    fn data_dir_defaults_to_home_dot_novelbug() {
        let cli = Cli {
            config: None,
            host: None,
            port: None,
            data_dir: None,
        };
        let dir = Config::data_dir(&cli).unwrap();
        assert!(dir.ends_with(".novelbug"));
    }

    #[test]
    fn load_with_no_config_file_uses_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::load_with_env(&cli(tmp.path().to_path_buf()), no_env).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.db_path(), tmp.path().join("novelbug.db"));
    }

    #[test]
    fn load_reads_toml_file() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
[server]
port = 9000

[auth]
kinde_domain = "novelbug.kinde.com"
session_cookie = "kinde_token"

[email]
contact_to = "team@example.com"

[writer]
base_url = "http://localhost:4111"
timeout_secs = 30
"#,
        )
        .unwrap();

        let cli = Cli {
            config: Some(config_path),
            ..cli(tmp.path().to_path_buf())
        };
        let config = Config::load_with_env(&cli, no_env).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.auth.kinde_domain.as_deref(), Some("novelbug.kinde.com"));
        assert_eq!(config.auth.session_cookie, "kinde_token");
        assert_eq!(config.email.contact_to, "team@example.com");
        assert_eq!(config.email.from, "NovelBug <hello@novelbug.app>");
        assert_eq!(config.writer.base_url.as_deref(), Some("http://localhost:4111"));
        assert_eq!(config.writer.agent_id, "storyAgent");
        assert_eq!(config.writer.timeout_secs, 30);
    }

    #[test]
    fn environment_overrides_secrets() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(&config_path, "[email]\nresend_api_key = \"from-file\"\n").unwrap();

        let vars: HashMap<&str, &str> = [
            ("RESEND_API_KEY", "re_env"),
            ("KINDE_DOMAIN", "env.kinde.com"),
            ("STORY_AGENT_URL", ""),
        ]
        .into_iter()
        .collect();
        let cli = Cli {
            config: Some(config_path),
            ..cli(tmp.path().to_path_buf())
        };
        let config =
            Config::load_with_env(&cli, |k| vars.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(config.email.resend_api_key.as_deref(), Some("re_env"));
        assert_eq!(config.auth.kinde_domain.as_deref(), Some("env.kinde.com"));
        // Empty values do not count
        assert!(config.writer.base_url.is_none());
    }

    #[test]
    fn cli_overrides_beat_toml_values() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
[server]
host = "192.168.1.1"
port = 9000
"#,
        )
        .unwrap();

        let cli = Cli {
            config: Some(config_path),
            host: Some("10.0.0.1".to_string()),
            port: Some(4000),
            data_dir: Some(tmp.path().to_path_buf()),
        };
        let config = Config::load_with_env(&cli, no_env).unwrap();
        assert_eq!(config.server.host, "10.0.0.1");
        assert_eq!(config.server.port, 4000);
    }
}
