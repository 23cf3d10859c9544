use super::{Flow, FlowKey};
use crate::error::ConfigError;
use ahash::AHashMap;
use std::sync::Arc;
use tracing::debug;

/// Every flow known to the application, keyed by `(defining document id, flow id)`.
#[derive(Debug, Clone, Default)]
pub struct FlowRegistry {
    flows: AHashMap<FlowKey, Arc<Flow>>,
    by_flow_id: AHashMap<String, Vec<Arc<Flow>>>,
    order: Vec<FlowKey>,
}

impl FlowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a flow. The id must be non-empty and the key unused.
    pub fn add(&mut self, flow: impl Into<Arc<Flow>>) -> Result<Arc<Flow>, ConfigError> {
        let flow = flow.into();
        if flow.id().is_empty() {
            return Err(ConfigError::EmptyFlowId(
                flow.defining_document_id().to_string(),
            ));
        }
        if self.flows.contains_key(flow.key()) {
            return Err(ConfigError::DuplicateFlow {
                document_id: flow.defining_document_id().to_string(),
                flow_id: flow.id().to_string(),
            });
        }

        debug!(flow = %flow.key(), nodes = flow.nodes().len(), "Registered flow");
        self.flows.insert(flow.key().clone(), flow.clone());
        self.by_flow_id
            .entry(flow.id().to_string())
            .or_default()
            .push(flow.clone());
        self.order.push(flow.key().clone());
        Ok(flow)
    }

    pub fn get(&self, document_id: &str, flow_id: &str) -> Option<Arc<Flow>> {
        self.flows
            .get(&FlowKey::new(document_id, flow_id))
            .cloned()
    }

    /// Every registered flow with the given id, across defining documents.
    pub fn by_flow_id(&self, flow_id: &str) -> &[Arc<Flow>] {
        self.by_flow_id
            .get(flow_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Flows in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Flow>> {
        self.order.iter().filter_map(|key| self.flows.get(key))
    }

    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }
}
