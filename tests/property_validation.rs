//! Property-based tests for configuration validation.

mod common;

use common::SECRET;
use dbadmin_config::infrastructure::config::raw::{RawConfig, RawServer, Scalar};
use dbadmin_config::{ConfigError, ConfigLoader};
use proptest::prelude::*;

fn open_server() -> RawServer {
    RawServer {
        allow_no_password: true,
        ..RawServer::default()
    }
}

fn config(servers: Vec<RawServer>) -> RawConfig {
    RawConfig {
        blowfish_secret: SECRET.to_string(),
        servers,
        ..RawConfig::default()
    }
}

proptest! {
    #[test]
    fn prop_secret_of_wrong_length_rejected(secret in "[ -~]{0,64}") {
        prop_assume!(secret.len() != 32);
        let raw = RawConfig {
            blowfish_secret: secret.clone(),
            ..config(vec![open_server()])
        };
        match ConfigLoader::validate(raw) {
            Err(ConfigError::InvalidSecret { actual }) => prop_assert_eq!(actual, secret.len()),
            other => prop_assert!(false, "expected InvalidSecret, got {:?}", other),
        }
    }

    #[test]
    fn prop_any_32_byte_secret_accepted(secret in "[ -~]{32}") {
        let raw = RawConfig {
            blowfish_secret: secret,
            ..config(vec![open_server()])
        };
        prop_assert!(ConfigLoader::validate(raw).is_ok());
    }

    #[test]
    fn prop_server_index_outside_range_rejected(count in 1usize..6, index in -10i64..20) {
        let raw = RawConfig {
            server_default: index,
            ..config(vec![open_server(); count])
        };
        let in_range = index >= 1 && index <= count as i64;
        match ConfigLoader::validate(raw) {
            Ok(settings) => {
                prop_assert!(in_range);
                prop_assert_eq!(settings.app().default_server_index as i64, index);
                prop_assert_eq!(settings.default_server(), &settings.servers()[(index - 1) as usize]);
            }
            Err(ConfigError::InvalidServerIndex { index: i, count: c }) => {
                prop_assert!(!in_range);
                prop_assert_eq!(i, index);
                prop_assert_eq!(c, count);
            }
            Err(other) => prop_assert!(false, "unexpected error {:?}", other),
        }
    }

    #[test]
    fn prop_first_server_without_credentials_reported(
        allow in proptest::collection::vec(any::<bool>(), 1..6),
    ) {
        let servers = allow
            .iter()
            .map(|&allow_no_password| RawServer { allow_no_password, ..RawServer::default() })
            .collect();
        let first_missing = allow.iter().position(|a| !a).map(|pos| pos + 1);

        match (ConfigLoader::validate(config(servers)), first_missing) {
            (Ok(_), None) => {}
            (Err(ConfigError::MissingCredential { index, .. }), Some(expected)) => {
                prop_assert_eq!(index, expected);
            }
            (result, expected) => {
                prop_assert!(false, "got {:?}, expected missing credential at {:?}", result, expected);
            }
        }
    }

    #[test]
    fn prop_password_satisfies_credential_check(password in "[a-zA-Z0-9@#!]{1,24}") {
        let server = RawServer { password: password.clone(), ..RawServer::default() };
        let settings = ConfigLoader::validate(config(vec![server])).unwrap();
        prop_assert_eq!(settings.default_server().password.expose(), password.as_str());
    }

    #[test]
    fn prop_valid_ports_accepted(port in 1u16..=u16::MAX, as_text in any::<bool>()) {
        let value = if as_text {
            Scalar::Text(port.to_string())
        } else {
            Scalar::Int(i64::from(port))
        };
        let server = RawServer { port: Some(value), ..open_server() };
        let settings = ConfigLoader::validate(config(vec![server])).unwrap();
        prop_assert_eq!(settings.default_server().port, port);
    }

    #[test]
    fn prop_out_of_range_ports_rejected(port in prop_oneof![i64::MIN..=0, 65536i64..=i64::MAX]) {
        let server = RawServer { port: Some(Scalar::Int(port)), ..open_server() };
        let is_invalid_port = matches!(
            ConfigLoader::validate(config(vec![server])),
            Err(ConfigError::InvalidPort { index: 1, .. })
        );
        prop_assert!(is_invalid_port);
    }
}
