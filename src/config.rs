// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Broker Connection Settings
//!
//! Connection settings are read from a flat JSON document:
//!
//! ```json
//! {
//!     "username": "guest",
//!     "password": "Z3Vlc3Q=",
//!     "address": "localhost",
//!     "port": "5672"
//! }
//! ```
//!
//! The password is stored base64 encoded and decoded only when the broker
//! URI is built.

use crate::errors::AmqpError;
use base64::{engine::general_purpose, Engine};
use lapin::uri::{AMQPAuthority, AMQPQueryString, AMQPScheme, AMQPUri, AMQPUserInfo};
use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use std::{fmt, fs, path::Path};
use tracing::{error, info};

const AMQP_URI_PREFIX: &str = "amqp://";
const DEFAULT_VHOST: &str = "/";

/// Settings needed to reach a RabbitMQ instance.
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct RabbitMQConfigs {
    /// User connected to the RabbitMQ instance
    pub username: String,
    /// Password of the user, base64 encoded
    pub password: String,
    /// Host of the RabbitMQ instance
    pub address: String,
    /// Port on which the RabbitMQ instance listens
    #[serde(deserialize_with = "port_from_text_or_number")]
    pub port: String,
}

impl RabbitMQConfigs {
    /// Loads the connection settings from a JSON file.
    ///
    /// # Errors
    /// * `AmqpError::ReadConfigError` if the file cannot be read
    /// * `AmqpError::ParseConfigError` if the content is not a valid settings document
    pub fn load<P: AsRef<Path>>(path: P) -> Result<RabbitMQConfigs, AmqpError> {
        load_json(path, "rabbitmq")
    }

    /// Decodes the base64 password.
    pub fn decoded_password(&self) -> Result<String, AmqpError> {
        let bytes = match general_purpose::STANDARD.decode(self.password.trim()) {
            Err(err) => {
                error!(error = err.to_string(), "base64 decoded error");
                Err(AmqpError::InvalidPassword)
            }
            Ok(v) => Ok(v),
        }?;

        match String::from_utf8(bytes) {
            Err(err) => {
                error!(error = err.to_string(), "error to convert to String");
                Err(AmqpError::InvalidPassword)
            }
            Ok(s) => Ok(s),
        }
    }

    /// The broker host, without scheme or trailing slash.
    pub fn host(&self) -> &str {
        let address = self.address.trim();
        address
            .strip_prefix(AMQP_URI_PREFIX)
            .unwrap_or(address)
            .trim_end_matches('/')
    }

    /// `host:port`, safe to log.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host(), self.port.trim())
    }

    /// Builds the broker URI with the decoded credentials on the default vhost.
    pub fn uri(&self) -> Result<AMQPUri, AmqpError> {
        let port = match self.port.trim().parse::<u16>() {
            Err(err) => {
                error!(error = err.to_string(), port = self.port, "invalid port");
                Err(AmqpError::InvalidPort(self.port.clone()))
            }
            Ok(p) => Ok(p),
        }?;

        Ok(AMQPUri {
            scheme: AMQPScheme::AMQP,
            authority: AMQPAuthority {
                userinfo: AMQPUserInfo {
                    username: self.username.clone(),
                    password: self.decoded_password()?,
                },
                host: self.host().to_owned(),
                port,
            },
            vhost: DEFAULT_VHOST.to_owned(),
            query: AMQPQueryString::default(),
        })
    }
}

impl fmt::Debug for RabbitMQConfigs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RabbitMQConfigs")
            .field("username", &self.username)
            .field("password", &"***")
            .field("address", &self.address)
            .field("port", &self.port)
            .finish()
    }
}

/// Reads and deserializes a JSON settings file.
pub(crate) fn load_json<T, P>(path: P, what: &str) -> Result<T, AmqpError>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let shown = path.display().to_string();
    info!(path = shown, "loading {} configs", what);

    let content = match fs::read(path) {
        Err(err) => {
            error!(error = err.to_string(), path = shown, "failure to read config file");
            Err(AmqpError::ReadConfigError(shown.clone()))
        }
        Ok(c) => Ok(c),
    }?;

    serde_json::from_slice(&content).map_err(|err| {
        error!(error = err.to_string(), path = shown, "failure to parse config file");
        AmqpError::ParseConfigError(shown)
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Port {
    Text(String),
    Number(u64),
}

fn port_from_text_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Port::deserialize(deserializer)? {
        Port::Text(p) => p,
        Port::Number(p) => p.to_string(),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::path::PathBuf;
    use uuid::Uuid;

    pub(crate) fn write_temp(content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("rmq-client-{}.json", Uuid::new_v4()));
        fs::write(&path, content).unwrap();
        path
    }

    fn configs() -> RabbitMQConfigs {
        RabbitMQConfigs {
            username: "guest".to_owned(),
            password: "Z3Vlc3Q=".to_owned(),
            address: "localhost".to_owned(),
            port: "5672".to_owned(),
        }
    }

    #[test]
    fn load_successfully() {
        let path = write_temp(
            r#"{"username":"admin","password":"c2VjcmV0","address":"rabbit.local","port":"5673"}"#,
        );

        let cfg = RabbitMQConfigs::load(&path).unwrap();
        fs::remove_file(path).unwrap();

        assert_eq!(cfg.username, "admin");
        assert_eq!(cfg.password, "c2VjcmV0");
        assert_eq!(cfg.address, "rabbit.local");
        assert_eq!(cfg.port, "5673");
    }

    #[test]
    fn load_numeric_port_and_missing_keys() {
        let path = write_temp(r#"{"address":"localhost","port":5672}"#);

        let cfg = RabbitMQConfigs::load(&path).unwrap();
        fs::remove_file(path).unwrap();

        assert_eq!(cfg.port, "5672");
        assert_eq!(cfg.username, "");
        assert_eq!(cfg.password, "");
    }

    #[test]
    fn load_missing_file() {
        let path = std::env::temp_dir().join(format!("rmq-client-{}.json", Uuid::new_v4()));

        let res = RabbitMQConfigs::load(&path);

        assert_eq!(
            res.unwrap_err(),
            AmqpError::ReadConfigError(path.display().to_string())
        );
    }

    #[test]
    fn load_invalid_json() {
        let path = write_temp(r#"{"username": "guest", "#);

        let res = RabbitMQConfigs::load(&path);
        fs::remove_file(&path).unwrap();

        assert_eq!(
            res.unwrap_err(),
            AmqpError::ParseConfigError(path.display().to_string())
        );
    }

    #[test]
    fn decode_password() {
        assert_eq!(configs().decoded_password().unwrap(), "guest");

        let mut cfg = configs();
        cfg.password = "not base64!".to_owned();
        assert_eq!(cfg.decoded_password(), Err(AmqpError::InvalidPassword));

        // 0xff 0xfe is valid base64 but not UTF-8
        cfg.password = "//4=".to_owned();
        assert_eq!(cfg.decoded_password(), Err(AmqpError::InvalidPassword));
    }

    #[test]
    fn host_strips_scheme() {
        let mut cfg = configs();
        assert_eq!(cfg.host(), "localhost");

        cfg.address = "amqp://rabbit.local/".to_owned();
        assert_eq!(cfg.host(), "rabbit.local");
        assert_eq!(cfg.endpoint(), "rabbit.local:5672");
    }

    #[test]
    fn build_uri() {
        let mut cfg = configs();
        cfg.password = general_purpose::STANDARD.encode("p@ss:w/rd");

        let uri = cfg.uri().unwrap();

        assert!(matches!(uri.scheme, AMQPScheme::AMQP));
        assert_eq!(uri.authority.userinfo.username, "guest");
        assert_eq!(uri.authority.userinfo.password, "p@ss:w/rd");
        assert_eq!(uri.authority.host, "localhost");
        assert_eq!(uri.authority.port, 5672);
        assert_eq!(uri.vhost, "/");
    }

    #[test]
    fn build_uri_with_invalid_port() {
        let mut cfg = configs();
        cfg.port = "amqp".to_owned();
        assert_eq!(cfg.uri().unwrap_err(), AmqpError::InvalidPort("amqp".to_owned()));

        cfg.port = "".to_owned();
        assert_eq!(cfg.uri().unwrap_err(), AmqpError::InvalidPort("".to_owned()));
    }

    #[test]
    fn debug_hides_password() {
        let out = format!("{:?}", configs());
        assert!(!out.contains("Z3Vlc3Q="));
        assert!(out.contains("localhost"));
    }
}
