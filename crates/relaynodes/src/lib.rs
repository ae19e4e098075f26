//! Standard action library
//!
//! Executors for the built-in node kinds: `api` and `email`.

mod api;
mod email;

pub use api::{ApiExecutor, ApiExecutorFactory};
pub use email::{
    EmailExecutor, EmailExecutorFactory, MailError, MailTransport, OutgoingMail, SmtpConfig,
    SmtpTransport,
};
use relayruntime::ExecutorRegistry;

use std::sync::Arc;

/// Register all standard executors with a registry
pub fn register_all(registry: &mut ExecutorRegistry, smtp: SmtpConfig) {
    registry.register(Arc::new(ApiExecutorFactory::new()));
    registry.register(Arc::new(EmailExecutorFactory::smtp(smtp)));
}
