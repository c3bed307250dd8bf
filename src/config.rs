use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};

use crate::email::MailSettings;
use crate::models::user::NewUser;
use crate::routes::LocalStores;
use crate::publish::{
    BlobStore, EdgeConfig, HttpBlobStore, HttpEdgeConfig, LocalBlobStore, LocalEdgeConfig,
    Publisher,
};

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";
pub const DEFAULT_PUBLIC_URL: &str = "http://localhost:3000";
pub const DEFAULT_BLOB_DIR: &str = "./blob";
pub const DEFAULT_NOTIFY_ADDRESS: &str = "office@swimfed.org";
pub const DEFAULT_ADMIN_NAME: &str = "Administrator";

/// The account created on startup when the database has no users yet.
#[derive(Clone)]
pub struct InitialAdmin {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl fmt::Debug for InitialAdmin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InitialAdmin")
            .field("name", &self.name)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

impl InitialAdmin {
    pub fn new_user(&self) -> NewUser {
        NewUser {
            name: self.name.clone(),
            email: self.email.clone(),
            password: self.password.clone(),
            group_id: None,
            admin: true,
        }
    }
}

/// Where snapshots and uploads go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobSettings {
    Hosted { api_url: String, token: String },
    Local { dir: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeSettings {
    Hosted {
        api_url: String,
        config_id: String,
        token: String,
    },
    Local,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_address: SocketAddr,
    pub public_url: String,
    pub blob: BlobSettings,
    pub edge: EdgeSettings,
    pub notify_address: String,
    pub mail_enabled: bool,
    pub initial_admin: Option<InitialAdmin>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let database_url = var("DATABASE_URL").context("No database URL provided")?;
        let bind_address = var("BIND_ADDRESS")
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_owned())
            .parse()
            .context("BIND_ADDRESS must look like 0.0.0.0:3000")?;
        let public_url = var("PUBLIC_URL").unwrap_or_else(|| DEFAULT_PUBLIC_URL.to_owned());

        let blob = match var("BLOB_READ_WRITE_TOKEN") {
            Some(token) => BlobSettings::Hosted {
                api_url: var("BLOB_API_URL")
                    .unwrap_or_else(|| HttpBlobStore::DEFAULT_API_URL.to_owned()),
                token,
            },
            None => BlobSettings::Local {
                dir: PathBuf::from(var("BLOB_DIR").unwrap_or_else(|| DEFAULT_BLOB_DIR.to_owned())),
            },
        };

        let edge = match (var("EDGE_CONFIG_ID"), var("EDGE_CONFIG_TOKEN")) {
            (Some(config_id), Some(token)) => EdgeSettings::Hosted {
                api_url: var("EDGE_CONFIG_API_URL")
                    .unwrap_or_else(|| HttpEdgeConfig::DEFAULT_API_URL.to_owned()),
                config_id,
                token,
            },
            _ => EdgeSettings::Local,
        };

        let initial_admin = match (var("INITIAL_ADMIN_EMAIL"), var("INITIAL_ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(InitialAdmin {
                name: var("INITIAL_ADMIN_NAME").unwrap_or_else(|| DEFAULT_ADMIN_NAME.to_owned()),
                email,
                password,
            }),
            (None, None) => None,
            _ => bail!("INITIAL_ADMIN_EMAIL and INITIAL_ADMIN_PASSWORD must be set together"),
        };

        Ok(Self {
            database_url,
            bind_address,
            public_url,
            blob,
            edge,
            notify_address: var("SPONSORSHIP_NOTIFY_ADDRESS")
                .unwrap_or_else(|| DEFAULT_NOTIFY_ADDRESS.to_owned()),
            mail_enabled: var("MAILGUN_TOKEN").is_some(),
            initial_admin,
        })
    }

    pub fn blob_store(&self) -> Arc<dyn BlobStore> {
        match &self.blob {
            BlobSettings::Hosted { api_url, token } => {
                Arc::new(HttpBlobStore::new(api_url.as_str(), token.as_str()))
            }
            BlobSettings::Local { dir } => {
                Arc::new(LocalBlobStore::new(dir.clone(), self.public_url.as_str()))
            }
        }
    }

    pub fn edge_config(&self) -> Arc<dyn EdgeConfig> {
        match &self.edge {
            EdgeSettings::Hosted {
                api_url,
                config_id,
                token,
            } => Arc::new(HttpEdgeConfig::new(
                api_url.as_str(),
                config_id.as_str(),
                token.as_str(),
            )),
            EdgeSettings::Local => Arc::new(LocalEdgeConfig::default()),
        }
    }

    pub fn mail_settings(&self) -> MailSettings {
        MailSettings {
            enabled: self.mail_enabled,
            office_address: self.notify_address.clone(),
        }
    }

    pub fn local_stores(&self) -> LocalStores {
        LocalStores {
            blob_dir: match &self.blob {
                BlobSettings::Local { dir } => Some(dir.clone()),
                BlobSettings::Hosted { .. } => None,
            },
            edge: self.edge == EdgeSettings::Local,
        }
    }

    pub fn publisher(&self) -> Publisher {
        Publisher::new(self.blob_store(), self.edge_config())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn database_url_is_required() {
        assert!(config(&[]).is_err());
    }

    #[test]
    fn defaults_to_local_stores() {
        let config = config(&[("DATABASE_URL", "postgres://localhost/swimfed")]).unwrap();

        assert_eq!(config.bind_address.port(), 3000);
        assert_eq!(
            config.blob,
            BlobSettings::Local {
                dir: PathBuf::from("./blob")
            }
        );
        assert_eq!(config.edge, EdgeSettings::Local);
        assert!(!config.mail_enabled);
    }

    #[test]
    fn initial_admin_needs_email_and_password() {
        let none = config(&[("DATABASE_URL", "postgres://localhost/swimfed")]).unwrap();
        assert!(none.initial_admin.is_none());

        assert!(config(&[
            ("DATABASE_URL", "postgres://localhost/swimfed"),
            ("INITIAL_ADMIN_EMAIL", "office@swimfed.org"),
        ])
        .is_err());

        let config = config(&[
            ("DATABASE_URL", "postgres://localhost/swimfed"),
            ("INITIAL_ADMIN_EMAIL", "office@swimfed.org"),
            ("INITIAL_ADMIN_PASSWORD", "change me please"),
        ])
        .unwrap();
        let admin = config.initial_admin.as_ref().unwrap().new_user();
        assert_eq!(admin.name, "Administrator");
        assert!(admin.admin);
        assert_eq!(admin.group_id, None);
        assert!(!format!("{:?}", config.initial_admin).contains("change me"));
    }

    #[test]
    fn hosted_edge_config_needs_id_and_token() {
        let only_id = config(&[
            ("DATABASE_URL", "postgres://localhost/swimfed"),
            ("EDGE_CONFIG_ID", "ecfg_123"),
        ])
        .unwrap();
        assert_eq!(only_id.edge, EdgeSettings::Local);

        let hosted = config(&[
            ("DATABASE_URL", "postgres://localhost/swimfed"),
            ("EDGE_CONFIG_ID", "ecfg_123"),
            ("EDGE_CONFIG_TOKEN", "secret"),
            ("BLOB_READ_WRITE_TOKEN", "vercel_blob_rw"),
        ])
        .unwrap();
        assert!(matches!(hosted.edge, EdgeSettings::Hosted { .. }));
        assert!(matches!(hosted.blob, BlobSettings::Hosted { .. }));
    }
}
