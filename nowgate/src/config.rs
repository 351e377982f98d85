//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable
//! overrides. The configuration file path defaults to `config.yaml` but can
//! be specified via `-f` flag or the `NOWGATE_CONFIG` environment variable.
//!
//! ## Loading Priority
//!
//! Configuration sources are merged in the following order (later sources
//! override earlier ones):
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `NOWGATE_` override
//!    YAML values
//!
//! For nested config values, use double underscores in environment variables.
//! For example, `NOWGATE_GATEWAY__API_KEY=...` sets `gateway.api_key`.
//!
//! ## Environment Variable Examples
//!
//! ```bash
//! # Override server port
//! NOWGATE_PORT=8080
//!
//! # Gateway credentials (preferred over putting them in the file)
//! NOWGATE_GATEWAY__API_KEY="..."
//! NOWGATE_GATEWAY__IPN_SECRET="..."
//!
//! # Enable the sandbox API
//! NOWGATE_GATEWAY__SANDBOX_MODE=true
//! ```

use std::time::Duration;

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::billing::Invoice;
use crate::errors::Error;

/// Simple CLI args - just for specifying the config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "NOWGATE_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    /// Useful for CI/CD pipelines to catch config errors before deployment.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
///
/// Loaded from YAML and environment variables. All fields have defaults,
/// but the gateway credentials must be provided for validation to pass.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Base URL where this service is reachable from the internet.
    /// Used to build the `ipn_callback_url` handed to the processor.
    pub public_url: Url,
    /// Base URL of the host billing system's invoice pages. The invoice id
    /// is appended to build the checkout success/cancel return URLs.
    pub invoice_page_url: Url,
    /// NOWPayments API credentials and behavior
    pub gateway: GatewayConfig,
    /// Payment session cache TTLs
    pub sessions: SessionCacheConfig,
    /// Billing system backend (the invoice store payments settle against)
    pub billing: BillingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            public_url: Url::parse("http://localhost:3000").expect("default public_url is valid"),
            invoice_page_url: Url::parse("http://localhost:8000/invoices").expect("default invoice_page_url is valid"),
            gateway: GatewayConfig::default(),
            sessions: SessionCacheConfig::default(),
            billing: BillingConfig::default(),
        }
    }
}

/// NOWPayments gateway configuration.
///
/// Credentials should be set via environment variables for security:
/// - `NOWGATE_GATEWAY__API_KEY` - NOWPayments API key
/// - `NOWGATE_GATEWAY__IPN_SECRET` - IPN secret used as the webhook HMAC key
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct GatewayConfig {
    /// NOWPayments API key (required)
    pub api_key: String,
    /// IPN secret key used to verify webhook signatures (required)
    pub ipn_secret: String,
    /// Fiat currency used for pricing when an invoice doesn't carry one
    pub currency: String,
    /// Use the sandbox API root instead of production
    pub sandbox_mode: bool,
    /// Explicit API root override. Takes precedence over `sandbox_mode`;
    /// mainly useful for tests and API-compatible proxies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<Url>,
    /// Timeout applied to every outbound NOWPayments request
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            ipn_secret: String::new(),
            currency: "USD".to_string(),
            sandbox_mode: false,
            api_url: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Payment session cache TTLs.
///
/// Mirrors the lifetimes of the corresponding objects at the processor:
/// hosted checkout URLs are good for about an hour, payment ids for a day.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionCacheConfig {
    #[serde(with = "humantime_serde")]
    pub checkout_url_ttl: Duration,
    #[serde(with = "humantime_serde")]
    pub payment_id_ttl: Duration,
}

impl Default for SessionCacheConfig {
    fn default() -> Self {
        Self {
            checkout_url_ttl: Duration::from_secs(3600),
            payment_id_ttl: Duration::from_secs(86400),
        }
    }
}

/// Billing system backend configuration.
///
/// Selects the [`crate::billing::InvoiceStore`] implementation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingConfig {
    /// Talk to the host billing system over its REST API.
    /// Set credentials via `NOWGATE_BILLING__HTTP__API_KEY`.
    Http(HttpBillingConfig),
    /// In-process store for local development and tests.
    Memory(MemoryBillingConfig),
}

impl Default for BillingConfig {
    fn default() -> Self {
        BillingConfig::Memory(MemoryBillingConfig::default())
    }
}

/// REST billing backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HttpBillingConfig {
    /// Base URL of the billing system API
    pub url: Url,
    /// Bearer token for the billing API
    pub api_key: String,
    /// Timeout applied to every billing API request
    #[serde(with = "humantime_serde", default = "default_billing_timeout")]
    pub timeout: Duration,
}

fn default_billing_timeout() -> Duration {
    Duration::from_secs(30)
}

/// In-memory billing backend configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct MemoryBillingConfig {
    /// Invoices to seed the store with at startup
    pub invoices: Vec<Invoice>,
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let mut config: Self = Self::figment(args).extract()?;

        // Credentials are often pasted with stray whitespace; a trailing
        // newline in the IPN secret would reject every webhook.
        config.gateway.api_key = config.gateway.api_key.trim().to_string();
        config.gateway.ipn_secret = config.gateway.ipn_secret.trim().to_string();

        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required fields
    pub fn validate(&self) -> Result<(), Error> {
        if self.gateway.api_key.is_empty() {
            return Err(Error::Internal {
                operation: "Config validation: gateway.api_key is not configured. \
                 Please set NOWGATE_GATEWAY__API_KEY or add gateway.api_key to the config file."
                    .to_string(),
            });
        }

        if self.gateway.ipn_secret.is_empty() {
            return Err(Error::Internal {
                operation: "Config validation: gateway.ipn_secret is not configured. \
                 Please set NOWGATE_GATEWAY__IPN_SECRET or add gateway.ipn_secret to the config file."
                    .to_string(),
            });
        }

        if self.gateway.currency.trim().is_empty() {
            return Err(Error::Internal {
                operation: "Config validation: gateway.currency must not be empty.".to_string(),
            });
        }

        if let BillingConfig::Http(http) = &self.billing
            && http.api_key.is_empty()
        {
            return Err(Error::Internal {
                operation: "Config validation: billing.http.api_key is not configured.".to_string(),
            });
        }

        Ok(())
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            // Load base config file
            .merge(Yaml::file(&args.config))
            // Environment variables can still override specific values
            .merge(Env::prefixed("NOWGATE_").split("__"))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    fn args_for(path: &str) -> Args {
        Args {
            config: path.to_string(),
            validate: false,
        }
    }

    #[test]
    fn test_load_from_yaml() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.yaml",
                r#"
                port: 8080
                public_url: "https://pay.example.com"
                gateway:
                  api_key: "np-key"
                  ipn_secret: "np-secret"
                  currency: "EUR"
                  sandbox_mode: true
                sessions:
                  checkout_url_ttl: "30m"
                "#,
            )?;

            let config = Config::load(&args_for("config.yaml")).expect("config should load");
            assert_eq!(config.port, 8080);
            assert_eq!(config.public_url.as_str(), "https://pay.example.com/");
            assert_eq!(config.gateway.currency, "EUR");
            assert!(config.gateway.sandbox_mode);
            assert_eq!(config.sessions.checkout_url_ttl, Duration::from_secs(1800));
            // Unset values keep their defaults
            assert_eq!(config.sessions.payment_id_ttl, Duration::from_secs(86400));
            assert_eq!(config.host, "0.0.0.0");
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_yaml() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.yaml",
                r#"
                port: 8080
                gateway:
                  api_key: "file-key"
                  ipn_secret: "np-secret"
                "#,
            )?;
            jail.set_env("NOWGATE_PORT", "9090");
            jail.set_env("NOWGATE_GATEWAY__API_KEY", "env-key");

            let config = Config::load(&args_for("config.yaml")).expect("config should load");
            assert_eq!(config.port, 9090);
            assert_eq!(config.gateway.api_key, "env-key");
            Ok(())
        });
    }

    #[test]
    fn test_credentials_are_trimmed() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.yaml",
                r#"
                gateway:
                  api_key: "  np-key  "
                  ipn_secret: "\tnp-secret\n"
                "#,
            )?;

            let config = Config::load(&args_for("config.yaml")).expect("config should load");
            assert_eq!(config.gateway.api_key, "np-key");
            assert_eq!(config.gateway.ipn_secret, "np-secret");
            Ok(())
        });
    }

    #[test]
    fn test_missing_api_key_fails_validation() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.yaml",
                r#"
                gateway:
                  ipn_secret: "np-secret"
                "#,
            )?;

            let err = Config::load(&args_for("config.yaml")).unwrap_err();
            assert!(err.to_string().contains("api_key"));
            Ok(())
        });
    }

    #[test]
    fn test_missing_ipn_secret_fails_validation() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.yaml",
                r#"
                gateway:
                  api_key: "np-key"
                "#,
            )?;

            let err = Config::load(&args_for("config.yaml")).unwrap_err();
            assert!(err.to_string().contains("ipn_secret"));
            Ok(())
        });
    }

    #[test]
    fn test_http_billing_backend() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.yaml",
                r#"
                gateway:
                  api_key: "np-key"
                  ipn_secret: "np-secret"
                billing:
                  http:
                    url: "https://billing.example.com"
                    api_key: "billing-key"
                    timeout: "10s"
                "#,
            )?;

            let config = Config::load(&args_for("config.yaml")).expect("config should load");
            match &config.billing {
                BillingConfig::Http(http) => {
                    assert_eq!(http.url.as_str(), "https://billing.example.com/");
                    assert_eq!(http.timeout, Duration::from_secs(10));
                }
                other => panic!("expected http billing backend, got {other:?}"),
            }
            Ok(())
        });
    }

    #[test]
    fn test_memory_billing_seed_invoices() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.yaml",
                r#"
                gateway:
                  api_key: "np-key"
                  ipn_secret: "np-secret"
                billing:
                  memory:
                    invoices:
                      - id: "42"
                        currency_code: "EUR"
                "#,
            )?;

            let config = Config::load(&args_for("config.yaml")).expect("config should load");
            match &config.billing {
                BillingConfig::Memory(memory) => {
                    assert_eq!(memory.invoices.len(), 1);
                    assert_eq!(memory.invoices[0].id, "42");
                }
                other => panic!("expected memory billing backend, got {other:?}"),
            }
            Ok(())
        });
    }

    #[test]
    fn test_unknown_fields_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.yaml",
                r#"
                gateway:
                  api_key: "np-key"
                  ipn_secret: "np-secret"
                  api_secret: "typo"
                "#,
            )?;

            assert!(Config::load(&args_for("config.yaml")).is_err());
            Ok(())
        });
    }
}
