//! Agent construction from validated configuration.
//!
//! The factory turns the validated model plus resolved prompts and tool
//! capabilities into a registry of [`AgentNode`]s. Construction is a single
//! generic path parameterized by the [`AgentSpec`] fields: the `type` tag
//! only selects the default prompt; there is no per-type construction code.
//!
//! Nodes never own each other. The registry is the single owner (a flat map
//! keyed by agent id) and the coordinator holds its sub-agents as ids,
//! resolved through the registry, so there are no ownership cycles.

use crate::config::{AgentSpec, DelegationStrategy, Permission, ProjectConfig};
use crate::discovery::ProjectRoot;
use crate::error::{AracError, Result};
use crate::prompt::{self, ResolvedPrompt};
use crate::tools::{BoundTool, ToolHost, required_permission};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A constructed, runtime-ready agent.
#[derive(Debug, Clone)]
pub struct AgentNode {
    /// Agent id (the key in the configuration's `agents` map).
    pub id: String,
    /// Type tag carried through for downstream consumers.
    pub agent_type: String,
    /// Human-readable description handed to the runtime.
    pub description: String,
    /// Provider-qualified model binding.
    pub model: String,
    /// Output token cap for the model binding, when configured.
    pub max_output_tokens: Option<u32>,
    /// Context window cap for the model binding, when configured.
    pub max_context_tokens: Option<u32>,
    /// Resolved prompt text and its provenance.
    pub prompt: ResolvedPrompt,
    /// Permission set this agent holds.
    pub permissions: Vec<Permission>,
    /// Tools bound to this agent.
    pub tools: Vec<BoundTool>,
    /// Sub-agent ids (populated on the coordinator only).
    pub sub_agents: Vec<String>,
    /// Opaque configuration passed through verbatim.
    pub custom_config: BTreeMap<String, serde_json::Value>,
}

impl AgentNode {
    /// Whether this agent holds a permission.
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }

    /// Look up a bound tool by id.
    pub fn tool(&self, tool_id: &str) -> Option<&BoundTool> {
        self.tools.iter().find(|t| t.tool_id() == tool_id)
    }

    /// Whether any bound tool permits this invocation.
    pub fn permits(&self, operation: &str, path: &Path) -> bool {
        self.tools.iter().any(|t| t.permits(operation, path))
    }
}

/// Flat registry of constructed agents, keyed by id.
///
/// The registry owns every node for the lifetime of the assembly; nodes
/// reference each other by id through it.
#[derive(Debug, Clone)]
pub struct AgentRegistry {
    nodes: BTreeMap<String, AgentNode>,
    default_agent: String,
}

impl AgentRegistry {
    pub(crate) fn new(nodes: BTreeMap<String, AgentNode>, default_agent: String) -> Self {
        Self {
            nodes,
            default_agent,
        }
    }

    /// Look up a node by id.
    pub fn get(&self, id: &str) -> Option<&AgentNode> {
        self.nodes.get(id)
    }

    /// The designated default/coordinator agent id.
    pub fn default_agent_id(&self) -> &str {
        &self.default_agent
    }

    /// The designated default/coordinator node.
    pub fn default_agent(&self) -> Option<&AgentNode> {
        self.nodes.get(&self.default_agent)
    }

    /// All agent ids, sorted.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    /// Iterate over all nodes.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AgentNode)> {
        self.nodes.iter().map(|(id, n)| (id.as_str(), n))
    }

    /// Number of constructed agents.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the registry holds no agents.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Factory for constructing the agent registry from a validated configuration.
pub struct AgentFactory<'a> {
    config: &'a ProjectConfig,
    root: &'a ProjectRoot,
    host: &'a dyn ToolHost,
}

impl<'a> AgentFactory<'a> {
    /// Create a factory over a validated configuration.
    pub fn new(config: &'a ProjectConfig, root: &'a ProjectRoot, host: &'a dyn ToolHost) -> Self {
        Self { config, root, host }
    }

    /// Construct every enabled agent, then wire the coordinator's sub-agent
    /// references.
    ///
    /// Construction is order-independent: nodes only reference each other by
    /// id, resolved in the second pass. Two builds over the same
    /// configuration produce registries with identical ids, permissions, and
    /// bound operation sets.
    ///
    /// # Errors
    ///
    /// `AracError::Factory` when the configured default agent resolves to no
    /// constructed node, or when a declared, enabled tool binding fails to
    /// materialize from the host.
    pub fn build(&self) -> Result<AgentRegistry> {
        let mut nodes = BTreeMap::new();

        for (id, spec) in self.config.enabled_agents() {
            let node = self.build_node(id, spec)?;
            debug!(
                agent = id,
                agent_type = %node.agent_type,
                tools = node.tools.len(),
                "constructed agent"
            );
            nodes.insert(id.to_string(), node);
        }

        let default_agent = self.config.workflow.default_agent.clone();
        if !nodes.contains_key(&default_agent) {
            // Validation should have caught this; kept as a defensive check.
            return Err(AracError::Factory(format!(
                "default agent '{}' was not constructed",
                default_agent
            )));
        }

        if self.config.workflow.delegation_strategy == DelegationStrategy::LlmDriven {
            let sub_agents: Vec<String> = nodes
                .keys()
                .filter(|id| **id != default_agent)
                .cloned()
                .collect();
            if let Some(coordinator) = nodes.get_mut(&default_agent) {
                coordinator.sub_agents = sub_agents;
            }
        }

        Ok(AgentRegistry::new(nodes, default_agent))
    }

    fn build_node(&self, id: &str, spec: &AgentSpec) -> Result<AgentNode> {
        let prompt = prompt::resolve(spec, self.root);
        let permissions = spec.parsed_permissions();

        let mut tools = Vec::new();
        for tool_id in &spec.tools {
            let Some(tool_spec) = self.config.mcp_tools.get(tool_id) else {
                return Err(AracError::Factory(format!(
                    "agent '{}' references undeclared tool '{}'",
                    id, tool_id
                )));
            };

            // Already surfaced as a warning during validation.
            if !tool_spec.enabled {
                continue;
            }

            let tool_root = self.tool_root(tool_spec.root_path.as_deref());
            let capability = self.host.capability(tool_id, &tool_root).ok_or_else(|| {
                AracError::Factory(format!(
                    "tool binding '{}' for agent '{}' failed to materialize",
                    tool_id, id
                ))
            })?;

            let declared = if tool_spec.operations.is_empty() {
                &capability.operations
            } else {
                &tool_spec.operations
            };
            let operations: Vec<String> = declared
                .iter()
                .filter(|op| {
                    capability.operations.iter().any(|exposed| exposed == *op)
                        && permissions.contains(&required_permission(op))
                })
                .cloned()
                .collect();

            tools.push(BoundTool::new(
                tool_id,
                &capability.root,
                operations,
                &spec.target_directories,
            )?);
        }

        Ok(AgentNode {
            id: id.to_string(),
            agent_type: spec.agent_type.clone(),
            description: format!("Agent: {} (type: {})", id, spec.agent_type),
            model: spec.model.clone(),
            max_output_tokens: spec.max_output_tokens,
            max_context_tokens: spec.max_context_tokens,
            prompt,
            permissions,
            tools,
            sub_agents: Vec::new(),
            custom_config: spec.custom_config.clone(),
        })
    }

    fn tool_root(&self, override_path: Option<&str>) -> PathBuf {
        match override_path {
            Some(p) if Path::new(p).is_absolute() => PathBuf::from(p),
            Some(p) => self.root.path().join(p),
            None => self.root.path().to_path_buf(),
        }
    }
}
