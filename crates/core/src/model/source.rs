use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::arena::NodeArena;
use super::details::NodeId;

/// Lowercase identifier of the plugin, mod, or library a frame executed in.
pub type SourceKey = Arc<str>;

/// Display metadata for one installed source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMetadata {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub built_in: bool,
}

impl SourceMetadata {
    /// `v1.2` stays as is, `1.2` becomes `v1.2`.
    pub fn display_version(&self) -> String {
        if self.version.starts_with('v') {
            self.version.clone()
        } else {
            format!("v{}", self.version)
        }
    }
}

/// Source information handed over by the decoder, keyed by arena id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceInput {
    #[serde(default)]
    pub node_sources: HashMap<NodeId, String>,
    #[serde(default)]
    pub metadata: HashMap<String, SourceMetadata>,
}

/// Direct and inherited source keys for every arena node.
#[derive(Debug, Clone, Default)]
pub struct SourceAttribution {
    direct: Vec<Option<SourceKey>>,
    resolved: Vec<Option<SourceKey>>,
    metadata: BTreeMap<SourceKey, SourceMetadata>,
}

impl SourceAttribution {
    /// Resolve every node's key in one pass over the arena. A node without a
    /// key of its own inherits the nearest ancestor's; threads never carry one.
    pub fn resolve(arena: &NodeArena, input: &SourceInput) -> Self {
        let mut interned: HashMap<String, SourceKey> = HashMap::new();
        let mut intern = |raw: &str| -> SourceKey {
            let key = raw.to_lowercase();
            interned
                .entry(key.clone())
                .or_insert_with(|| Arc::from(key.as_str()))
                .clone()
        };

        let mut direct: Vec<Option<SourceKey>> = vec![None; arena.len()];
        let mut ignored = 0usize;
        for (&id, raw) in &input.node_sources {
            match arena.node(id) {
                Some(node) if !node.details.is_thread() && !raw.is_empty() => {
                    direct[id as usize] = Some(intern(raw));
                }
                _ => ignored += 1,
            }
        }

        // Parents always have smaller ids than their children, so a forward
        // scan sees every parent resolved before its children.
        let mut resolved: Vec<Option<SourceKey>> = Vec::with_capacity(arena.len());
        for node in arena.nodes() {
            let own = direct[node.id as usize].clone();
            let inherited = arena
                .parent_id(node.id)
                .and_then(|parent| resolved[parent as usize].clone());
            resolved.push(own.or(inherited));
        }

        let metadata = input
            .metadata
            .iter()
            .map(|(key, meta)| (intern(key), meta.clone()))
            .collect();

        if ignored > 0 {
            debug!(ignored, "source entries did not point at a stack frame");
        }

        Self {
            direct,
            resolved,
            metadata,
        }
    }

    /// Key recorded for this node itself, without inheritance.
    pub fn direct(&self, id: NodeId) -> Option<&SourceKey> {
        self.direct.get(id as usize).and_then(Option::as_ref)
    }

    /// Key of the node, inherited from the nearest ancestor when absent.
    pub fn source(&self, id: NodeId) -> Option<&SourceKey> {
        self.resolved.get(id as usize).and_then(Option::as_ref)
    }

    pub fn has_sources(&self) -> bool {
        self.direct.iter().any(Option::is_some)
    }

    pub fn metadata(&self, key: &str) -> Option<&SourceMetadata> {
        self.metadata.get(key)
    }

    /// Installed, non-built-in sources whose name is not in `shown`,
    /// ordered by name.
    pub fn unused_sources(&self, shown: &[SourceKey]) -> Vec<&SourceMetadata> {
        let mut unused: Vec<&SourceMetadata> = self
            .metadata
            .values()
            .filter(|meta| !meta.built_in)
            .filter(|meta| !shown.iter().any(|s| s.eq_ignore_ascii_case(&meta.name)))
            .collect();
        unused.sort_by(|a, b| a.name.cmp(&b.name));
        unused
    }
}
