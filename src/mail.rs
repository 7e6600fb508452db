//! Account mail notifications behind a provider seam.
//! The server only depends on the `Mailer` trait; the default implementation
//! records the notification in the log together with the configured SMTP
//! endpoint. Delivery failures must never affect request outcomes, so the
//! trait is fire-and-forget.

use std::sync::Arc;

use crate::config::AppConfig;

pub trait Mailer: Send + Sync {
    fn send_account_created(&self, name: &str, email: &str);
    fn send_login_notice(&self, name: &str, email: &str);
}

/// Logs notifications instead of delivering them. Carries the SMTP endpoint
/// from configuration so the log shows where a real transport would connect.
pub struct LogMailer {
    smtp_endpoint: Option<String>,
}

impl LogMailer {
    pub fn new(smtp_endpoint: Option<String>) -> Self {
        Self { smtp_endpoint }
    }
}

impl Mailer for LogMailer {
    fn send_account_created(&self, name: &str, email: &str) {
        tracing::info!(
            target: "mail",
            smtp = self.smtp_endpoint.as_deref().unwrap_or("<unconfigured>"),
            %email,
            "account created notification for {name}"
        );
    }

    fn send_login_notice(&self, name: &str, email: &str) {
        tracing::info!(
            target: "mail",
            smtp = self.smtp_endpoint.as_deref().unwrap_or("<unconfigured>"),
            %email,
            "login notification for {name}"
        );
    }
}

pub fn from_config(config: &AppConfig) -> Arc<dyn Mailer> {
    let endpoint = match (&config.smtp_host, &config.smtp_port) {
        (Some(host), Some(port)) => Some(format!("{host}:{port}")),
        (Some(host), None) => Some(host.clone()),
        _ => None,
    };
    Arc::new(LogMailer::new(endpoint))
}
