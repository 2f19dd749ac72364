//! Startup: connect the configured tool servers and build the registry.
//!
//! A server that fails to start is logged and left out; the run continues
//! with whatever connected, even if that is nothing.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{info, warn};

use browsebot_core::config::{CollisionPolicy, McpServerConfig};
use browsebot_mcp::McpConnection;

use crate::error::RegistryError;
use crate::tools::{RegistrationReport, ToolProvider, ToolRegistry};

/// A provider that could not be brought up.
#[derive(Clone, Debug, PartialEq)]
pub struct StartupFailure {
    pub provider: String,
    pub reason: String,
}

/// Result of startup.
pub struct RegistryInit {
    pub registry: ToolRegistry,
    pub reports: Vec<RegistrationReport>,
    pub failures: Vec<StartupFailure>,
}

impl RegistryInit {
    /// Every duplicate tool rejected during registration.
    pub fn duplicates(&self) -> impl Iterator<Item = &RegistryError> {
        self.reports.iter().flat_map(|r| r.rejected.iter())
    }
}

/// Connect every server (concurrently) and register them in config order.
pub async fn init_registry(servers: &[McpServerConfig], policy: CollisionPolicy) -> RegistryInit {
    let attempts = join_all(servers.iter().map(McpConnection::connect)).await;

    let mut providers: Vec<Arc<dyn ToolProvider>> = Vec::new();
    let mut failures = Vec::new();
    for (server, attempt) in servers.iter().zip(attempts) {
        match attempt {
            Ok(conn) => providers.push(Arc::new(conn)),
            Err(e) => {
                warn!(server = %server.name, error = %e, "failed to connect MCP server");
                failures.push(StartupFailure {
                    provider: server.name.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    let mut init = register_providers(providers, policy).await;
    failures.append(&mut init.failures);
    init.failures = failures;
    init
}

/// Register already-connected providers in order.
///
/// Providers the registry refuses are closed and reported as failures.
pub async fn register_providers(
    providers: Vec<Arc<dyn ToolProvider>>,
    policy: CollisionPolicy,
) -> RegistryInit {
    let mut registry = ToolRegistry::new(policy);
    let mut reports = Vec::new();
    let mut failures = Vec::new();

    for provider in providers {
        let name = provider.name().to_string();
        match registry.register(provider.clone()).await {
            Ok(report) => reports.push(report),
            Err(e) => {
                warn!(provider = %name, error = %e, "provider not registered");
                provider.close().await;
                failures.push(StartupFailure {
                    provider: name,
                    reason: e.to_string(),
                });
            }
        }
    }

    if registry.is_empty() {
        warn!("no tools available; the model will answer without tools");
    } else {
        info!(
            providers = registry.provider_names().len(),
            tools = registry.len(),
            policy = ?registry.policy(),
            "tool registry ready"
        );
    }

    RegistryInit {
        registry,
        reports,
        failures,
    }
}
