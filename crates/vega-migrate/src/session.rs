use std::collections::{BTreeSet, HashMap};

use vega_model::{ElementId, FileId, ProgramModel, TypeRef};

use crate::host::{CancellationToken, Cancelled};
use crate::labeler::{FailedConversion, LabelerOptions, MigrateError, TypeMigrationLabeler};
use crate::usage::UsageHandle;

/// Index of a node in the session's node table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug)]
struct MigrationNode {
    usage: UsageHandle,
    migration_type: TypeRef,
    parent: Option<NodeId>,
    /// Set when an earlier node already claims this usage. A duplicate is a
    /// render-only pointer at the canonical node, never a structural edge,
    /// and always stays a leaf.
    duplicate_of: Option<NodeId>,
    /// `None` means "not yet expanded". Computed once and memoized.
    children: Option<Vec<NodeId>>,
}

/// One interactive migration session: the labeler plus a lazy, dedup-aware
/// tree view over its roots tree.
///
/// The session owns all mutable state (node table, processed-set, labeler
/// maps); independent sessions over the same model never share anything, so
/// a rerun is simply a fresh `MigrationSession`.
pub struct MigrationSession<'m> {
    labeler: TypeMigrationLabeler<'m>,
    nodes: Vec<MigrationNode>,
    /// Processed-set: element -> nodes claiming it. The first claimant is
    /// canonical; later claimants become duplicates of it.
    processed: HashMap<ElementId, Vec<NodeId>>,
    root: NodeId,
}

impl std::fmt::Debug for MigrationSession<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationSession")
            .field("nodes", &self.nodes)
            .field("processed", &self.processed)
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl<'m> MigrationSession<'m> {
    pub fn new(
        model: &'m dyn ProgramModel,
        root_element: ElementId,
        target_type: TypeRef,
    ) -> Result<Self, MigrateError> {
        Self::with_options(model, root_element, target_type, LabelerOptions::default())
    }

    pub fn with_options(
        model: &'m dyn ProgramModel,
        root_element: ElementId,
        target_type: TypeRef,
        options: LabelerOptions,
    ) -> Result<Self, MigrateError> {
        let mut labeler = TypeMigrationLabeler::with_options(model, options);
        let usage = labeler.add_migration_root(root_element, target_type.clone())?;
        let root = NodeId(0);
        let mut processed = HashMap::new();
        processed.insert(root_element, vec![root]);
        Ok(Self {
            labeler,
            nodes: vec![MigrationNode {
                usage,
                migration_type: target_type,
                parent: None,
                duplicate_of: None,
                children: None,
            }],
            processed,
            root,
        })
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn labeler(&self) -> &TypeMigrationLabeler<'m> {
        &self.labeler
    }

    pub fn usage(&self, node: NodeId) -> &UsageHandle {
        &self.nodes[node.index()].usage
    }

    pub fn migration_type(&self, node: NodeId) -> &TypeRef {
        &self.nodes[node.index()].migration_type
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.index()].parent
    }

    /// The canonical node this one duplicates, if any.
    pub fn duplicate_of(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.index()].duplicate_of
    }

    /// True iff the child list has been computed.
    pub fn is_expanded(&self, node: NodeId) -> bool {
        self.nodes[node.index()].children.is_some()
    }

    pub fn is_excluded(&self, node: NodeId) -> bool {
        self.nodes[node.index()].usage.is_excluded()
    }

    /// Flip the excluded flag on the node's (shared) usage. Visible from
    /// every node referencing the same element.
    pub fn toggle_excluded(&mut self, node: NodeId) {
        let usage = &self.nodes[node.index()].usage;
        usage.set_excluded(!usage.is_excluded());
    }

    pub fn set_excluded(&mut self, node: NodeId, excluded: bool) {
        self.nodes[node.index()].usage.set_excluded(excluded);
    }

    /// The node's children, expanding it on first call.
    ///
    /// Discovery runs at most once per node, enforced by the memoized list.
    /// A discovery failure turns the node into a leaf; duplicates are leaves
    /// by construction. Dependents already on the ancestor path are skipped,
    /// which breaks cycles while still letting the same usage appear through
    /// a different, non-cyclic path.
    pub fn children(&mut self, node: NodeId) -> &[NodeId] {
        if self.nodes[node.index()].children.is_none() {
            let computed = self.compute_children(node);
            self.nodes[node.index()].children = Some(computed);
        }
        self.nodes[node.index()]
            .children
            .as_deref()
            .unwrap_or(&[])
    }

    fn compute_children(&mut self, node: NodeId) -> Vec<NodeId> {
        if self.nodes[node.index()].duplicate_of.is_some() {
            return Vec::new();
        }

        let usage = self.nodes[node.index()].usage.clone();
        let migration_type = self.nodes[node.index()].migration_type.clone();

        let raw = match self.labeler.mark_root_usages(usage.element(), &migration_type) {
            Ok(raw) => raw,
            Err(err) => {
                // Discovery failure is local: the node renders as a leaf.
                tracing::debug!(element = usage.element().0, %err, "discovery failed");
                return Vec::new();
            }
        };
        self.labeler.set_root_and_migrate(&usage, &migration_type, raw);

        let edges: Vec<(UsageHandle, TypeRef)> =
            self.labeler.root_edges(usage.element()).to_vec();
        let mut children = Vec::with_capacity(edges.len());
        for (child_usage, child_type) in edges {
            if self.on_ancestor_path(node, child_usage.element()) {
                continue;
            }
            children.push(self.new_node(child_usage, child_type, node));
        }
        children
    }

    fn new_node(&mut self, usage: UsageHandle, migration_type: TypeRef, parent: NodeId) -> NodeId {
        let element = usage.element();
        let id = NodeId(self.nodes.len() as u32);
        let claimants = self.processed.entry(element).or_default();
        let duplicate_of = claimants.first().copied();
        claimants.push(id);
        self.nodes.push(MigrationNode {
            usage,
            migration_type,
            parent: Some(parent),
            duplicate_of,
            children: None,
        });
        id
    }

    fn on_ancestor_path(&self, node: NodeId, element: ElementId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            let n = &self.nodes[id.index()];
            if n.usage.element() == element {
                return true;
            }
            current = n.parent;
        }
        false
    }

    /// Force full expansion of the tree.
    ///
    /// A node that is excluded and has never been opened is not expanded:
    /// nothing under it can contribute further migrations, and expanding it
    /// could recurse into large unrelated subtrees. Cancellation aborts the
    /// walk without committing anything.
    pub fn expand_all(&mut self, token: &CancellationToken) -> Result<(), Cancelled> {
        let mut stack = vec![self.root];
        while let Some(node) = stack.pop() {
            if token.is_cancelled() {
                return Err(Cancelled);
            }
            if self.is_excluded(node) && !self.is_expanded(node) {
                continue;
            }
            stack.extend(self.children(node).iter().rev().copied());
        }
        Ok(())
    }

    /// Accepted usages: every migrated usage whose excluded flag is off, in
    /// discovery order.
    pub fn collect_accepted(&self) -> Vec<UsageHandle> {
        self.labeler
            .migrated()
            .iter()
            .filter(|(usage, _)| !usage.is_excluded())
            .map(|(usage, _)| usage.clone())
            .collect()
    }

    /// Files owning the accepted usages' declarations.
    pub fn affected_files(&self) -> BTreeSet<FileId> {
        let model = self.labeler.model();
        self.collect_accepted()
            .iter()
            .filter_map(|usage| model.containing_file(usage.element()))
            .collect()
    }

    /// Failures recorded during this node's own expansion, not its
    /// descendants', keeping the conflict report scoped to what the user is
    /// inspecting.
    pub fn failed_usages(&self, node: NodeId) -> Vec<FailedConversion> {
        self.labeler
            .failed_usages_for(self.nodes[node.index()].usage.element())
            .into_iter()
            .cloned()
            .collect()
    }
}
