use super::value::{LeafShape, LeafValue};
use super::StateError;
use crate::kernel::path::FieldPath;
use serde_json::{Map, Value};
use std::collections::HashMap;

type NodeId = usize;

const ROOT: NodeId = 0;

#[derive(Debug, Clone)]
enum Node {
    /// Children in insertion order. Order carries no meaning for scoring,
    /// it only keeps snapshots readable.
    Branch(Vec<(String, NodeId)>),
    Leaf(LeafValue),
}

/// The in-progress record: an arena of typed nodes addressed by key path.
///
/// Exactly one `FormSession` owns a tree. Every write goes through [`set`],
/// which creates intermediate branches on demand and, for bound paths,
/// rejects values whose shape disagrees with the field kind.
///
/// [`set`]: StateTree::set
#[derive(Debug, Clone)]
pub struct StateTree {
    nodes: Vec<Option<Node>>,
    free: Vec<NodeId>,
    shapes: HashMap<FieldPath, LeafShape>,
    version: u64,
}

impl Default for StateTree {
    fn default() -> Self {
        Self {
            nodes: vec![Some(Node::Branch(Vec::new()))],
            free: Vec::new(),
            shapes: HashMap::new(),
            version: 0,
        }
    }
}

impl StateTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// A tree with the given empty top-level sections, in order.
    pub fn with_sections<'a>(keys: impl IntoIterator<Item = &'a str>) -> Self {
        let mut tree = Self::new();
        for key in keys {
            tree.ensure_branch_at(ROOT, key);
        }
        tree
    }

    /// Rebuild a tree from a snapshot. Pair-shaped objects become scoring
    /// pairs, `null` leaves are dropped. No shapes are registered.
    pub fn from_json(value: &Value) -> Self {
        let mut tree = Self::new();
        if let Value::Object(map) = value {
            tree.load_object(ROOT, map);
        }
        tree
    }

    fn load_object(&mut self, parent: NodeId, map: &Map<String, Value>) {
        for (key, value) in map {
            match LeafValue::from_json(value) {
                Some(leaf) => {
                    let id = self.alloc(Node::Leaf(leaf));
                    self.push_child(parent, key, id);
                }
                None => {
                    if let Value::Object(inner) = value {
                        let id = self.ensure_branch_at(parent, key);
                        self.load_object(id, inner);
                    }
                }
            }
        }
    }

    /// Monotonic mutation counter.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn root(&self) -> NodeRef<'_> {
        NodeRef { tree: self, id: ROOT }
    }

    /// The node at `path`, branch or leaf. The empty path is the root.
    pub fn node(&self, path: &FieldPath) -> Option<NodeRef<'_>> {
        self.resolve(path).map(|id| NodeRef { tree: self, id })
    }

    /// The leaf at `path`. `None` on any missing or non-branch intermediate,
    /// and when the addressed node is itself a branch.
    pub fn get(&self, path: &FieldPath) -> Option<&LeafValue> {
        self.node(path).and_then(|node| node.leaf())
    }

    /// The shape registered for `path` by [`bind`](StateTree::bind), if any.
    pub fn shape_of(&self, path: &FieldPath) -> Option<LeafShape> {
        self.shapes.get(path).copied()
    }

    /// Assign `value` at `path`, creating intermediate branches as needed and
    /// overwriting any unbound leaf found where a branch is required.
    ///
    /// Fails with [`StateError::ShapeMismatch`] when the write would change
    /// the shape of a bound field, either directly, by nesting under it, or
    /// by replacing a branch that holds one.
    pub fn set(&mut self, path: &FieldPath, value: impl Into<LeafValue>) -> Result<(), StateError> {
        let value = value.into();
        let (parents, key) = path.split_last().ok_or(StateError::EmptyPath)?;

        if let Some(expected) = self.shapes.get(path) {
            let actual = value.shape();
            if *expected != actual {
                return Err(StateError::ShapeMismatch {
                    path: path.clone(),
                    expected: expected.name(),
                    actual: actual.name(),
                });
            }
        }
        self.check_bound_ancestors(path)?;

        // A leaf here would replace the branch holding bound fields.
        if self
            .shapes
            .keys()
            .any(|bound| bound.len() > path.len() && bound.starts_with(path))
        {
            return Err(StateError::ShapeMismatch {
                path: path.clone(),
                expected: "branch",
                actual: value.shape().name(),
            });
        }

        let mut cursor = ROOT;
        for segment in parents {
            cursor = self.ensure_branch_at(cursor, segment);
        }

        match self.child_of(cursor, key) {
            Some(existing) => {
                self.release_children(existing);
                self.nodes[existing] = Some(Node::Leaf(value));
            }
            None => {
                let id = self.alloc(Node::Leaf(value));
                self.push_child(cursor, key, id);
            }
        }

        self.version += 1;
        Ok(())
    }

    /// Ensure an (initially empty) branch exists at `path`.
    pub fn ensure_branch(&mut self, path: &FieldPath) -> Result<(), StateError> {
        if path.is_empty() {
            return Err(StateError::EmptyPath);
        }
        if let Some(shape) = self.shapes.get(path) {
            return Err(StateError::ShapeMismatch {
                path: path.clone(),
                expected: shape.name(),
                actual: "branch",
            });
        }
        self.check_bound_ancestors(path)?;
        let mut cursor = ROOT;
        for segment in path.segments() {
            cursor = self.ensure_branch_at(cursor, segment);
        }
        Ok(())
    }

    /// Register the shape of a field and give it its default, unless a leaf of
    /// the same shape is already present (re-binding keeps the user's value).
    pub fn bind(&mut self, path: &FieldPath, default: LeafValue) -> Result<(), StateError> {
        if path.is_empty() {
            return Err(StateError::EmptyPath);
        }
        let shape = default.shape();
        let keep = self.get(path).is_some_and(|current| current.shape() == shape);
        self.shapes.insert(path.clone(), shape);
        if !keep {
            self.set(path, default)?;
        }
        Ok(())
    }

    /// JSON snapshot of the whole tree, suitable as a submission payload.
    pub fn snapshot(&self) -> Value {
        self.root().to_json()
    }

    /// Bound leaves cannot be turned into branches by writing beneath them.
    fn check_bound_ancestors(&self, path: &FieldPath) -> Result<(), StateError> {
        let ancestor = self
            .shapes
            .iter()
            .find(|(bound, _)| bound.len() < path.len() && path.starts_with(bound));
        match ancestor {
            Some((bound, shape)) => Err(StateError::ShapeMismatch {
                path: bound.clone(),
                expected: shape.name(),
                actual: "branch",
            }),
            None => Ok(()),
        }
    }

    // --- arena plumbing ---

    fn resolve(&self, path: &FieldPath) -> Option<NodeId> {
        path.segments()
            .iter()
            .try_fold(ROOT, |id, segment| self.child_of(id, segment))
    }

    fn child_of(&self, id: NodeId, key: &str) -> Option<NodeId> {
        match self.nodes.get(id)? {
            Some(Node::Branch(children)) => children
                .iter()
                .find(|(name, _)| name == key)
                .map(|(_, child)| *child),
            _ => None,
        }
    }

    /// Returns the branch under `parent` named `key`, converting a leaf in the
    /// way into an empty branch.
    fn ensure_branch_at(&mut self, parent: NodeId, key: &str) -> NodeId {
        match self.child_of(parent, key) {
            Some(id) => {
                if !matches!(self.nodes[id], Some(Node::Branch(_))) {
                    self.nodes[id] = Some(Node::Branch(Vec::new()));
                }
                id
            }
            None => {
                let id = self.alloc(Node::Branch(Vec::new()));
                self.push_child(parent, key, id);
                id
            }
        }
    }

    fn push_child(&mut self, parent: NodeId, key: &str, child: NodeId) {
        if let Some(Some(Node::Branch(children))) = self.nodes.get_mut(parent) {
            children.push((key.to_string(), child));
        }
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        match self.free.pop() {
            Some(id) => {
                self.nodes[id] = Some(node);
                id
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        }
    }

    /// Free every descendant of `id` (not `id` itself).
    fn release_children(&mut self, id: NodeId) {
        let children = match self.nodes.get_mut(id) {
            Some(Some(Node::Branch(children))) => std::mem::take(children),
            _ => return,
        };
        for (_, child) in children {
            self.release_children(child);
            self.nodes[child] = None;
            self.free.push(child);
        }
    }
}

/// Read-only view of one node of a [`StateTree`].
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'a> {
    tree: &'a StateTree,
    id: NodeId,
}

impl<'a> NodeRef<'a> {
    pub fn leaf(&self) -> Option<&'a LeafValue> {
        match self.tree.nodes.get(self.id) {
            Some(Some(Node::Leaf(value))) => Some(value),
            _ => None,
        }
    }

    pub fn is_branch(&self) -> bool {
        matches!(self.tree.nodes.get(self.id), Some(Some(Node::Branch(_))))
    }

    pub fn child(&self, key: &str) -> Option<NodeRef<'a>> {
        self.tree
            .child_of(self.id, key)
            .map(|id| NodeRef { tree: self.tree, id })
    }

    /// Children in insertion order; empty for leaves.
    pub fn entries(&self) -> impl Iterator<Item = (&'a str, NodeRef<'a>)> + 'a {
        let tree = self.tree;
        let children: &'a [(String, NodeId)] = match tree.nodes.get(self.id) {
            Some(Some(Node::Branch(children))) => children.as_slice(),
            _ => &[],
        };
        children
            .iter()
            .map(move |(key, id)| (key.as_str(), NodeRef { tree, id: *id }))
    }

    pub fn to_json(&self) -> Value {
        match self.tree.nodes.get(self.id) {
            Some(Some(Node::Leaf(value))) => value.to_json(),
            Some(Some(Node::Branch(_))) => {
                let mut map = Map::new();
                for (key, child) in self.entries() {
                    map.insert(key.to_string(), child.to_json());
                }
                Value::Object(map)
            }
            _ => Value::Null,
        }
    }
}
