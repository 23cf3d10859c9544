use super::NavigationMap;
use crate::case::NavigationRule;
use crate::flow::{Flow, FlowKey, SwitchNode};
use ahash::AHashMap;
use tracing::{debug, info};

/// The rules and switch nodes visible in one scope.
#[derive(Debug, Clone, Default)]
pub struct NavigationInfo {
    pub rule_set: Option<NavigationMap>,
    pub switches: Option<AHashMap<String, SwitchNode>>,
}

impl NavigationInfo {
    /// Builds the scope of a flow; `None` when it declares neither rules nor switches.
    pub fn from_flow(flow: &Flow) -> Option<Self> {
        let switches: AHashMap<String, SwitchNode> = flow
            .switches()
            .map(|switch| (switch.id.clone(), switch.clone()))
            .collect();
        if flow.navigation_rules().is_empty() && switches.is_empty() {
            return None;
        }

        let rule_set = (!flow.navigation_rules().is_empty()).then(|| {
            let mut map = NavigationMap::new();
            for rule in flow.navigation_rules() {
                map.put_rule(rule);
            }
            map
        });
        Some(Self {
            rule_set,
            switches: (!switches.is_empty()).then_some(switches),
        })
    }

    pub fn switch(&self, id: &str) -> Option<&SwitchNode> {
        self.switches.as_ref().and_then(|switches| switches.get(id))
    }
}

/// The root scope plus one scope per inspected flow.
#[derive(Debug, Clone, Default)]
pub struct NavigationRegistry {
    root: NavigationMap,
    flows: AHashMap<FlowKey, NavigationInfo>,
    empty: NavigationMap,
}

impl NavigationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_rule(&mut self, rule: &NavigationRule) {
        debug!(from_view_id = %rule.from_view_id, cases = rule.cases.len(), "Adding navigation rule");
        self.root.put_rule(rule);
    }

    /// Records the navigation scope of `flow`. A flow seen before is left as it was.
    pub fn inspect_flow(&mut self, flow: &Flow) {
        if self.flows.contains_key(flow.key()) {
            info!(flow = %flow.key(), "Navigation for flow already registered, skipping");
            return;
        }
        if let Some(info) = NavigationInfo::from_flow(flow) {
            self.flows.insert(flow.key().clone(), info);
        }
    }

    pub fn root(&self) -> &NavigationMap {
        &self.root
    }

    pub fn flow_info(&self, key: &FlowKey) -> Option<&NavigationInfo> {
        self.flows.get(key)
    }

    /// The rule map in effect: the flow's own (possibly empty) map inside a flow,
    /// the root map otherwise.
    pub fn navigation_map(&self, current_flow: Option<&Flow>) -> &NavigationMap {
        match current_flow {
            Some(flow) => self
                .flows
                .get(flow.key())
                .and_then(|info| info.rule_set.as_ref())
                .unwrap_or(&self.empty),
            None => &self.root,
        }
    }
}
