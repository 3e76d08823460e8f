//! Arena-backed playlist tree.
//!
//! One [`Playlist`] owns every node it ever allocates, including the group
//! wrappers created for derived views. Parent links are lookup-only
//! back-references; ownership flows strictly from a group to its children.

use serde_json::{Map, Value};

use crate::error::TreeError;
use crate::query::parse_path;

/// Identity of a node within its [`Playlist`].
///
/// Assigned once when the node is created and never reused, so two
/// structurally equal tracks always carry distinct ids.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

#[derive(Clone, Debug)]
pub(crate) enum NodeKind {
    Group {
        children: Vec<NodeId>,
    },
    Track {
        source_ref: String,
        props: Map<String, Value>,
    },
}

#[derive(Clone, Debug)]
pub(crate) struct Node {
    pub(crate) name: String,
    pub(crate) parent: Option<NodeId>,
    pub(crate) kind: NodeKind,
}

/// A playlist tree plus every derived view built over it.
///
/// Transform operations allocate fresh group nodes here but reference the
/// existing track ids, so status recorded against a track stays valid when
/// seen through any derived tree. Nodes detached by removal stay allocated
/// until the playlist is dropped; their ids are never reused.
#[derive(Debug)]
pub struct Playlist {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Playlist {
    /// Create a playlist holding only an empty, unnamed root group.
    pub fn new() -> Self {
        let mut playlist = Playlist {
            nodes: Vec::new(),
            root: NodeId(0),
        };
        playlist.root = playlist.alloc_group(String::new());
        playlist
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Total number of nodes ever allocated, detached ones included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn name(&self, id: NodeId) -> &str {
        &self.node(id).name
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn is_group(&self, id: NodeId) -> bool {
        matches!(self.node(id).kind, NodeKind::Group { .. })
    }

    pub fn is_track(&self, id: NodeId) -> bool {
        !self.is_group(id)
    }

    /// Child ids of a group, in order. Empty for tracks.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match &self.node(id).kind {
            NodeKind::Group { children } => children,
            NodeKind::Track { .. } => &[],
        }
    }

    /// The opaque downloader argument of a track.
    pub fn source_ref(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Track { source_ref, .. } => Some(source_ref),
            NodeKind::Group { .. } => None,
        }
    }

    /// Extra key/value pairs carried by a track.
    pub fn props(&self, id: NodeId) -> Option<&Map<String, Value>> {
        match &self.node(id).kind {
            NodeKind::Track { props, .. } => Some(props),
            NodeKind::Group { .. } => None,
        }
    }

    pub fn prop(&self, id: NodeId, key: &str) -> Option<&Value> {
        self.props(id)?.get(key)
    }

    /// Detach the entry at `path` from its parent's children.
    ///
    /// Returns `Ok(true)` when an entry was removed. An unresolved path is
    /// a warn-logged no-op returning `Ok(false)`; removing the root fails
    /// with [`TreeError::CannotRemoveRoot`].
    pub fn remove_by_path(&mut self, path: &str) -> Result<bool, TreeError> {
        let segments = parse_path(path);
        let found = self.resolve_path(self.root, &segments);
        if let Some(segment) = found.unmatched {
            tracing::warn!(path, segment, "no entry at path, nothing removed");
            return Ok(false);
        }
        self.detach(found.entry)?;
        Ok(true)
    }

    /// Detach `id` from its parent's children by identity.
    pub fn detach(&mut self, id: NodeId) -> Result<(), TreeError> {
        let Some(parent) = self.node(id).parent else {
            return Err(TreeError::CannotRemoveRoot);
        };
        if let NodeKind::Group { children } = &mut self.node_mut(parent).kind {
            children.retain(|child| *child != id);
        }
        self.node_mut(id).parent = None;
        Ok(())
    }

    pub(crate) fn alloc_group(&mut self, name: String) -> NodeId {
        self.alloc(Node {
            name,
            parent: None,
            kind: NodeKind::Group {
                children: Vec::new(),
            },
        })
    }

    pub(crate) fn alloc_track(
        &mut self,
        name: String,
        source_ref: String,
        props: Map<String, Value>,
    ) -> NodeId {
        self.alloc(Node {
            name,
            parent: None,
            kind: NodeKind::Track { source_ref, props },
        })
    }

    /// Append `child` to `parent` and stamp the back-reference.
    pub(crate) fn push_child(&mut self, parent: NodeId, child: NodeId) {
        if let NodeKind::Group { children } = &mut self.node_mut(parent).kind {
            children.push(child);
        }
        self.node_mut(child).parent = Some(parent);
    }

    /// Append `child` to a derived group without touching the child's
    /// canonical parent link.
    pub(crate) fn push_view_child(&mut self, group: NodeId, child: NodeId) {
        if let NodeKind::Group { children } = &mut self.node_mut(group).kind {
            children.push(child);
        }
    }

    pub(crate) fn set_name(&mut self, id: NodeId, name: String) {
        self.node_mut(id).name = name;
    }

    pub(crate) fn set_source_ref(&mut self, id: NodeId, source_ref: String) {
        if let NodeKind::Track { source_ref: slot, .. } = &mut self.node_mut(id).kind {
            *slot = source_ref;
        }
    }

    pub(crate) fn insert_prop(&mut self, id: NodeId, key: String, value: Value) {
        if let NodeKind::Track { props, .. } = &mut self.node_mut(id).kind {
            props.insert(key, value);
        }
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0 as usize]
    }
}

impl Default for Playlist {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::normalize::normalize;

    #[test]
    fn parents_track_the_containing_group() {
        let playlist = normalize(&json!({
            "children": [
                {"name": "A", "children": [{"name": "t1", "sourceRef": "s1"}]},
                {"name": "t2", "sourceRef": "s2"},
            ]
        }))
        .unwrap();

        let root = playlist.root();
        let a = playlist.children(root)[0];
        let t1 = playlist.children(a)[0];
        let t2 = playlist.children(root)[1];

        assert_eq!(playlist.parent(root), None);
        assert_eq!(playlist.parent(a), Some(root));
        assert_eq!(playlist.parent(t1), Some(a));
        assert_eq!(playlist.parent(t2), Some(root));
    }

    #[test]
    fn remove_by_path_detaches_the_subtree() {
        let mut playlist = normalize(&json!({
            "children": [
                {"name": "A", "children": [{"name": "t1", "sourceRef": "s1"}]},
                {"name": "t2", "sourceRef": "s2"},
            ]
        }))
        .unwrap();

        let root = playlist.root();
        let a = playlist.children(root)[0];

        assert!(playlist.remove_by_path("A").unwrap());
        assert_eq!(playlist.children(root).len(), 1);
        assert_eq!(playlist.parent(a), None);
    }

    #[test]
    fn remove_by_path_is_a_noop_for_unknown_paths() {
        let mut playlist = normalize(&json!({
            "children": [{"name": "A", "children": []}]
        }))
        .unwrap();

        assert!(!playlist.remove_by_path("A/missing").unwrap());
        assert_eq!(playlist.children(playlist.root()).len(), 1);
    }

    #[test]
    fn the_root_cannot_be_removed() {
        let mut playlist = normalize(&json!({"children": []})).unwrap();
        let err = playlist.remove_by_path("").unwrap_err();
        assert!(matches!(err, crate::TreeError::CannotRemoveRoot));
    }
}
