//! Startup config validation. Accumulates every problem found instead of
//! failing on the first one, so an operator fixing a config sees the whole
//! list in one run rather than playing whack-a-mole.

use std::path::Path;

use thiserror::Error;

use super::Config;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("server.name must not be empty")]
    EmptyServerName,
    #[error("server.network must not be empty")]
    EmptyNetworkName,
    #[error("channel name pattern must be [A-Za-z0-9_-]{{3,30}}, got {0:?}")]
    InvalidAdminNickname(String),
    #[error("tls.cert_path {0:?} does not exist")]
    MissingTlsCert(String),
    #[error("tls.key_path {0:?} does not exist")]
    MissingTlsKey(String),
    #[error("tls is only configured with one of cert_path/key_path; both are required")]
    IncompleteTls,
    #[error("database.path parent directory {0:?} does not exist")]
    MissingDbParentDir(String),
    #[error("limits.max_msg_bytes must be > 0")]
    ZeroMaxMsgBytes,
    #[error("limits.outbound_queue_depth must be > 0")]
    ZeroOutboundDepth,
    #[error("listen.enable_websocket is set but wss_bind is configured without tls")]
    WssWithoutTls,
}

pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.name.trim().is_empty() {
        errors.push(ValidationError::EmptyServerName);
    }
    if config.server.network.trim().is_empty() {
        errors.push(ValidationError::EmptyNetworkName);
    }
    if let Some(nick) = &config.server.admin_nickname {
        if !is_valid_nickname(nick) {
            errors.push(ValidationError::InvalidAdminNickname(nick.clone()));
        }
    }

    match (&config.tls.cert_path, &config.tls.key_path) {
        (Some(cert), Some(key)) => {
            if !Path::new(cert).exists() {
                errors.push(ValidationError::MissingTlsCert(cert.clone()));
            }
            if !Path::new(key).exists() {
                errors.push(ValidationError::MissingTlsKey(key.clone()));
            }
        }
        (None, None) => {
            let wss_bind_customized =
                config.listen.wss_bind != super::defaults::default_wss_bind();
            if config.listen.enable_websocket && wss_bind_customized {
                errors.push(ValidationError::WssWithoutTls);
            }
        }
        _ => errors.push(ValidationError::IncompleteTls),
    }

    if let Some(parent) = Path::new(&config.database.path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            errors.push(ValidationError::MissingDbParentDir(
                parent.display().to_string(),
            ));
        }
    }

    if config.limits.max_msg_bytes == 0 {
        errors.push(ValidationError::ZeroMaxMsgBytes);
    }
    if config.limits.outbound_queue_depth == 0 {
        errors.push(ValidationError::ZeroOutboundDepth);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_valid_nickname(nick: &str) -> bool {
    let len = nick.chars().count();
    (1..=20).contains(&len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn parse(toml_str: &str) -> Config {
        toml::from_str(toml_str).expect("valid toml")
    }

    #[test]
    fn minimal_config_is_valid() {
        let config = parse(
            r#"
            [server]
            name = "Test"
            network = "test-net"
            "#,
        );
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn empty_server_name_is_rejected() {
        let config = parse(
            r#"
            [server]
            name = ""
            network = "test-net"
            "#,
        );
        let errors = validate(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::EmptyServerName));
    }

    #[test]
    fn partial_tls_is_rejected() {
        let config = parse(
            r#"
            [server]
            name = "Test"
            network = "test-net"

            [tls]
            cert_path = "cert.pem"
            "#,
        );
        let errors = validate(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::IncompleteTls));
    }

    #[test]
    fn missing_db_parent_dir_is_rejected() {
        let config = parse(
            r#"
            [server]
            name = "Test"
            network = "test-net"

            [database]
            path = "/definitely/not/a/real/path/db.sqlite"
            "#,
        );
        let errors = validate(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::MissingDbParentDir(_))));
    }
}
