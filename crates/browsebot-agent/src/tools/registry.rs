//! Tool Registry: one namespace over the catalogs of every connected provider.
//!
//! Providers are registered before the orchestration loop starts and closed
//! after it ends; during the loop the registry is shared read-only.

use std::collections::HashMap;
use std::sync::Arc;

use browsebot_core::config::CollisionPolicy;
use browsebot_core::types::ToolDefinition;
use jsonschema::JSONSchema;
use tracing::{debug, info, warn};

use super::provider::ToolProvider;
use super::ToolDescriptor;
use crate::error::RegistryError;

/// Separator between provider and tool name under [`CollisionPolicy::Prefix`].
pub const TOOL_SEPARATOR: &str = "__";

/// Outcome of registering one provider.
#[derive(Debug, Default)]
pub struct RegistrationReport {
    pub provider: String,
    /// Exposed names that were added.
    pub registered: Vec<String>,
    /// `DuplicateTool` errors for names that were skipped.
    pub rejected: Vec<RegistryError>,
}

// ─────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────

/// Stores tool descriptors keyed by exposed name, plus the providers that own them.
pub struct ToolRegistry {
    policy: CollisionPolicy,
    /// Registration order.
    providers: Vec<Arc<dyn ToolProvider>>,
    /// Registration order.
    tools: Vec<ToolDescriptor>,
    /// Exposed name → position in `tools`.
    index: HashMap<String, usize>,
    /// Compiled argument schemas by exposed name. Tools whose schema does
    /// not compile have no entry.
    validators: HashMap<String, JSONSchema>,
}

impl ToolRegistry {
    /// Create an empty registry with the given collision policy.
    pub fn new(policy: CollisionPolicy) -> Self {
        Self {
            policy,
            providers: Vec::new(),
            tools: Vec::new(),
            index: HashMap::new(),
            validators: HashMap::new(),
        }
    }

    pub fn policy(&self) -> CollisionPolicy {
        self.policy
    }

    /// Pull the catalog of a Ready provider and add its tools.
    ///
    /// Name clashes never fail the call: a tool of a Ready provider stays and
    /// the clash is listed in the report. A name held only by a provider that
    /// is no longer Ready passes to the new one.
    pub async fn register(
        &mut self,
        provider: Arc<dyn ToolProvider>,
    ) -> Result<RegistrationReport, RegistryError> {
        let provider_name = provider.name().to_string();

        if self.provider(&provider_name).is_some() {
            return Err(RegistryError::DuplicateProvider(provider_name));
        }
        if !provider.is_ready() {
            return Err(RegistryError::ProviderUnavailable {
                provider: provider_name,
                reason: "not ready".to_string(),
            });
        }
        let remote_tools =
            provider
                .list_tools()
                .await
                .map_err(|e| RegistryError::ProviderUnavailable {
                    provider: provider_name.clone(),
                    reason: e.to_string(),
                })?;

        let mut report = RegistrationReport {
            provider: provider_name.clone(),
            ..Default::default()
        };

        for tool in remote_tools {
            let exposed = match self.policy {
                CollisionPolicy::Reject => tool.name.clone(),
                CollisionPolicy::Prefix => {
                    format!("{provider_name}{TOOL_SEPARATOR}{}", tool.name)
                }
            };

            let descriptor = ToolDescriptor {
                name: exposed.clone(),
                remote_name: tool.name,
                owner: provider_name.clone(),
                description: tool.description,
                parameters: tool.parameters,
            };

            if let Some(&existing) = self.index.get(&exposed) {
                let owner = self.tools[existing].owner.clone();
                if owner == provider_name || self.owner_ready(&owner) {
                    warn!(
                        tool = %exposed,
                        owner = %owner,
                        rejected = %provider_name,
                        "duplicate tool name, keeping the first registration"
                    );
                    report.rejected.push(RegistryError::DuplicateTool {
                        tool: exposed,
                        owner,
                        rejected: provider_name.clone(),
                    });
                    continue;
                }

                // Nobody can call the stale one; the name goes to the live provider.
                debug!(tool = %exposed, stale_owner = %owner, provider = %provider_name, "took over tool name");
                self.store_validator(&descriptor);
                self.tools[existing] = descriptor;
                report.registered.push(exposed);
                continue;
            }

            debug!(tool = %exposed, provider = %provider_name, "registered tool");
            self.index.insert(exposed.clone(), self.tools.len());
            report.registered.push(exposed);
            self.store_validator(&descriptor);
            self.tools.push(descriptor);
        }

        info!(
            provider = %provider_name,
            tools = report.registered.len(),
            rejected = report.rejected.len(),
            "registered provider"
        );
        self.providers.push(provider);
        Ok(report)
    }

    /// Remove a provider and every tool it owns. Does not close it.
    pub fn unregister(&mut self, provider_name: &str) -> Option<Arc<dyn ToolProvider>> {
        let pos = self
            .providers
            .iter()
            .position(|p| p.name() == provider_name)?;
        let provider = self.providers.remove(pos);

        self.tools.retain(|t| t.owner != provider_name);
        self.rebuild_index();
        self.validators.retain(|name, _| self.index.contains_key(name));

        info!(provider = provider_name, "unregistered provider");
        Some(provider)
    }

    fn rebuild_index(&mut self) {
        self.index = self
            .tools
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name.clone(), i))
            .collect();
    }

    fn store_validator(&mut self, descriptor: &ToolDescriptor) {
        match JSONSchema::compile(&descriptor.parameters) {
            Ok(schema) => {
                self.validators.insert(descriptor.name.clone(), schema);
            }
            Err(e) => {
                warn!(
                    tool = %descriptor.name,
                    error = %e,
                    "tool schema does not compile; arguments will not be validated"
                );
                self.validators.remove(&descriptor.name);
            }
        }
    }

    /// Compiled argument schema of a tool, if its schema compiled.
    pub fn validator(&self, name: &str) -> Option<&JSONSchema> {
        self.validators.get(name)
    }

    /// Look up a callable tool. Tools of providers that are not Ready are absent.
    pub fn resolve(&self, name: &str) -> Result<&ToolDescriptor, RegistryError> {
        self.index
            .get(name)
            .map(|&i| &self.tools[i])
            .filter(|t| self.owner_ready(&t.owner))
            .ok_or_else(|| RegistryError::UnknownTool(name.to_string()))
    }

    fn owner_ready(&self, owner: &str) -> bool {
        self.provider(owner).is_some_and(|p| p.is_ready())
    }

    /// Callable tools in registration order.
    pub fn catalog(&self) -> Vec<&ToolDescriptor> {
        self.tools
            .iter()
            .filter(|t| self.owner_ready(&t.owner))
            .collect()
    }

    /// The model-facing schema payload for [`catalog`](Self::catalog).
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.catalog()
            .into_iter()
            .map(|t| ToolDefinition::new(&t.name, &t.description, t.parameters.clone()))
            .collect()
    }

    /// Look up a registered provider by name.
    pub fn provider(&self, name: &str) -> Option<&Arc<dyn ToolProvider>> {
        self.providers.iter().find(|p| p.name() == name)
    }

    /// Names of registered providers, in registration order.
    pub fn provider_names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    /// Whether a callable tool with this name exists.
    pub fn has(&self, name: &str) -> bool {
        self.resolve(name).is_ok()
    }

    /// Number of callable tools.
    pub fn len(&self) -> usize {
        self.catalog().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Close every provider. Their tools drop out of `catalog` and `resolve`
    /// because the owners stop being Ready.
    pub async fn shutdown(&self) {
        for provider in &self.providers {
            debug!(provider = provider.name(), "closing provider");
            provider.close().await;
        }
        info!(providers = self.providers.len(), "tool providers shut down");
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new(CollisionPolicy::default())
    }
}
