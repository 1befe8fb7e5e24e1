//! Component D — Hierarchy Manager.
//!
//! A second, pure-in-memory view of field relationships, independent of the
//! PDF's own object graph. Modeled as an arena of nodes keyed by
//! `FormField.id` (string edges, no `Rc<RefCell<_>>` cycles) per spec §9's
//! design note, generalized from the parent/child walk in
//! `original_source/.../hierarchy_manager.py`'s `HierarchyTree`.

use std::collections::{HashMap, HashSet};

use crate::model::{FormField, HierarchyNode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    Orphaned,
    Cycle,
    SiblingConflict,
    QualifiedNameConflict,
    ParentChildSelfConflict,
    MixedTypeRadioGroup,
    BrokenEdge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Critical,
}

#[derive(Debug, Clone)]
pub struct HierarchyConflict {
    pub kind: ConflictKind,
    pub field_id: Option<String>,
    pub message: String,
    pub severity: Severity,
}

/// The independent hierarchy view: one [`HierarchyNode`] per field.
#[derive(Debug, Clone)]
pub struct HierarchyTree {
    nodes: HashMap<String, HierarchyNode>,
    roots: Vec<String>,
    /// Original `parent_id`/`children_ids` as extracted, kept for broken-edge
    /// and orphan checks independent of whatever `validate` mutates.
    declared_parent: HashMap<String, Option<String>>,
    declared_children: HashMap<String, Vec<String>>,
    kind_by_id: HashMap<String, crate::flags::FieldKind>,
}

impl HierarchyTree {
    /// `build(fields)` — spec §4.D.
    pub fn build(fields: &[FormField]) -> Self {
        let mut declared_parent = HashMap::new();
        let mut declared_children = HashMap::new();
        let mut kind_by_id = HashMap::new();
        let known_ids: HashSet<&str> = fields.iter().map(|f| f.id.as_str()).collect();

        for field in fields {
            declared_parent.insert(field.id.clone(), field.parent_id.clone());
            declared_children.insert(field.id.clone(), field.children_ids.clone());
            kind_by_id.insert(field.id.clone(), field.kind);
        }

        let mut roots = Vec::new();
        let mut nodes = HashMap::new();
        for field in fields {
            let parent = field.parent_id.clone().filter(|p| known_ids.contains(p.as_str()));
            if parent.is_none() {
                roots.push(field.id.clone());
            }
            nodes.insert(
                field.id.clone(),
                HierarchyNode {
                    field_id: field.id.clone(),
                    parent,
                    children: field.children_ids.clone(),
                    depth: 0,
                    qualified_name: field.name.clone(),
                },
            );
        }

        let mut tree = HierarchyTree {
            nodes,
            roots,
            declared_parent,
            declared_children,
            kind_by_id,
        };
        tree.recompute_depth_and_qualified_names(fields);
        tree
    }

    fn recompute_depth_and_qualified_names(&mut self, fields: &[FormField]) {
        let name_by_id: HashMap<&str, &str> = fields.iter().map(|f| (f.id.as_str(), f.name.as_str())).collect();
        let roots = self.roots.clone();
        for root in roots {
            self.walk_qualified(&root, 0, None, &name_by_id);
        }
    }

    fn walk_qualified(
        &mut self,
        id: &str,
        depth: u32,
        parent_qualified: Option<String>,
        name_by_id: &HashMap<&str, &str>,
    ) {
        let name = self
            .nodes
            .get(id)
            .map(|n| {
                name_by_id
                    .get(id)
                    .copied()
                    .unwrap_or(n.qualified_name.as_str())
                    .to_string()
            })
            .unwrap_or_default();
        let qualified = match &parent_qualified {
            Some(parent_q) => format!("{parent_q}.{name}"),
            None => name.clone(),
        };

        let children = if let Some(node) = self.nodes.get_mut(id) {
            node.depth = depth;
            node.qualified_name = qualified.clone();
            node.children.clone()
        } else {
            return;
        };

        for child in children {
            if self.nodes.contains_key(&child) {
                self.walk_qualified(&child, depth + 1, Some(qualified.clone()), name_by_id);
            }
        }
    }

    pub fn node(&self, id: &str) -> Option<&HierarchyNode> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &HierarchyNode> {
        self.nodes.values()
    }

    /// `apply_renames(mapping)` — mutate node names then recompute all
    /// qualified names (spec §4.D).
    pub fn apply_renames(&mut self, mapping: &HashMap<String, String>) {
        let mut name_by_id: HashMap<String, String> = self
            .nodes
            .keys()
            .map(|id| {
                let current = self
                    .nodes
                    .get(id)
                    .map(|n| n.qualified_name.rsplit('.').next().unwrap_or_default().to_string())
                    .unwrap_or_default();
                (id.clone(), current)
            })
            .collect();

        for (id, new_name) in mapping {
            name_by_id.insert(id.clone(), new_name.clone());
        }

        let borrowed: HashMap<&str, &str> = name_by_id.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        let roots = self.roots.clone();
        for root in roots {
            self.walk_qualified(&root, 0, None, &borrowed);
        }
    }

    /// `validate(tree)` — spec §4.D.
    pub fn validate(&self) -> Vec<HierarchyConflict> {
        let mut conflicts = Vec::new();

        // Orphaned: parent id present on the FormField but no matching node.
        for (id, parent) in &self.declared_parent {
            if let Some(parent_id) = parent {
                if !self.nodes.contains_key(parent_id) {
                    conflicts.push(HierarchyConflict {
                        kind: ConflictKind::Orphaned,
                        field_id: Some(id.clone()),
                        message: format!("field {id} references missing parent {parent_id}"),
                        severity: Severity::Warning,
                    });
                }
            }
        }

        conflicts.extend(self.detect_cycles());
        conflicts.extend(self.detect_sibling_conflicts());
        conflicts.extend(self.detect_qualified_name_conflicts());
        conflicts.extend(self.detect_parent_child_self_conflicts());
        conflicts.extend(self.detect_mixed_type_radio_groups());
        conflicts.extend(self.detect_broken_edges());

        conflicts
    }

    fn detect_cycles(&self) -> Vec<HierarchyConflict> {
        let mut visited = HashSet::new();
        let mut stack = HashSet::new();
        let mut conflicts = Vec::new();

        for id in self.nodes.keys() {
            if !visited.contains(id) {
                self.dfs_cycle(id, &mut visited, &mut stack, &mut conflicts);
            }
        }
        conflicts
    }

    fn dfs_cycle(
        &self,
        id: &str,
        visited: &mut HashSet<String>,
        stack: &mut HashSet<String>,
        conflicts: &mut Vec<HierarchyConflict>,
    ) {
        visited.insert(id.to_string());
        stack.insert(id.to_string());

        if let Some(node) = self.nodes.get(id) {
            for child in &node.children {
                if !self.nodes.contains_key(child) {
                    continue;
                }
                if stack.contains(child) {
                    conflicts.push(HierarchyConflict {
                        kind: ConflictKind::Cycle,
                        field_id: Some(child.clone()),
                        message: format!("cycle detected involving {child}"),
                        severity: Severity::Critical,
                    });
                } else if !visited.contains(child) {
                    self.dfs_cycle(child, visited, stack, conflicts);
                }
            }
        }
        stack.remove(id);
    }

    fn detect_sibling_conflicts(&self) -> Vec<HierarchyConflict> {
        let mut conflicts = Vec::new();
        for node in self.nodes.values() {
            let mut seen: HashMap<String, String> = HashMap::new();
            for child_id in &node.children {
                let Some(child) = self.nodes.get(child_id) else { continue };
                let local_name = child.qualified_name.rsplit('.').next().unwrap_or_default();
                if let Some(existing) = seen.insert(local_name.to_string(), child_id.clone()) {
                    conflicts.push(HierarchyConflict {
                        kind: ConflictKind::SiblingConflict,
                        field_id: Some(child_id.clone()),
                        message: format!("sibling name conflict between {existing} and {child_id}"),
                        severity: Severity::Warning,
                    });
                }
            }
        }
        conflicts
    }

    fn detect_qualified_name_conflicts(&self) -> Vec<HierarchyConflict> {
        let mut seen: HashMap<&str, &str> = HashMap::new();
        let mut conflicts = Vec::new();
        for node in self.nodes.values() {
            if let Some(existing) = seen.insert(node.qualified_name.as_str(), node.field_id.as_str()) {
                conflicts.push(HierarchyConflict {
                    kind: ConflictKind::QualifiedNameConflict,
                    field_id: Some(node.field_id.clone()),
                    message: format!(
                        "qualified name '{}' duplicated between {} and {}",
                        node.qualified_name, existing, node.field_id
                    ),
                    severity: Severity::Critical,
                });
            }
        }
        conflicts
    }

    fn detect_parent_child_self_conflicts(&self) -> Vec<HierarchyConflict> {
        let mut conflicts = Vec::new();
        for node in self.nodes.values() {
            let parent_local = node.qualified_name.rsplit('.').next().unwrap_or_default();
            for child_id in &node.children {
                let Some(child) = self.nodes.get(child_id) else { continue };
                let child_local = child.qualified_name.rsplit('.').next().unwrap_or_default();
                if parent_local == child_local {
                    conflicts.push(HierarchyConflict {
                        kind: ConflictKind::ParentChildSelfConflict,
                        field_id: Some(child_id.clone()),
                        message: format!("{} shares its name with parent {}", child_id, node.field_id),
                        severity: Severity::Warning,
                    });
                }
            }
        }
        conflicts
    }

    fn detect_mixed_type_radio_groups(&self) -> Vec<HierarchyConflict> {
        let mut conflicts = Vec::new();
        for node in self.nodes.values() {
            if self.kind_by_id.get(&node.field_id) != Some(&crate::flags::FieldKind::Radio) {
                continue;
            }
            let mut kinds = node.children.iter().filter_map(|c| self.kind_by_id.get(c));
            if let Some(first) = kinds.next() {
                if kinds.any(|k| k != first) {
                    conflicts.push(HierarchyConflict {
                        kind: ConflictKind::MixedTypeRadioGroup,
                        field_id: Some(node.field_id.clone()),
                        message: format!("radio group {} has mixed-type children", node.field_id),
                        severity: Severity::Warning,
                    });
                }
            }
        }
        conflicts
    }

    fn detect_broken_edges(&self) -> Vec<HierarchyConflict> {
        let mut conflicts = Vec::new();
        for (id, parent) in &self.declared_parent {
            let Some(parent_id) = parent else { continue };
            let Some(declared_children) = self.declared_children.get(parent_id) else { continue };
            if !declared_children.contains(id) {
                conflicts.push(HierarchyConflict {
                    kind: ConflictKind::BrokenEdge,
                    field_id: Some(id.clone()),
                    message: format!("{id} declares parent {parent_id} but is not in its children list"),
                    severity: Severity::Warning,
                });
            }
        }
        conflicts
    }

    /// `propose(mapping)` — dry-run rename/validate/revert, returning only
    /// the conflict list (spec §4.D).
    pub fn propose(&self, mapping: &HashMap<String, String>) -> Vec<HierarchyConflict> {
        let mut scratch = self.clone();
        scratch.apply_renames(mapping);
        scratch.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::{FieldFlags, FieldKind};

    fn field(id: &str, name: &str, parent: Option<&str>, children: &[&str], kind: FieldKind) -> FormField {
        FormField {
            id: id.to_string(),
            name: name.to_string(),
            kind,
            page: 1,
            rect: [0.0; 4],
            value: String::new(),
            flags: FieldFlags::empty(),
            options: Vec::new(),
            tooltip: None,
            mapping_name: None,
            max_length: None,
            default_appearance: None,
            parent_id: parent.map(str::to_string),
            children_ids: children.iter().map(|c| c.to_string()).collect(),
            is_group_container: !children.is_empty(),
        }
    }

    #[test]
    fn builds_qualified_names_depth_first() {
        let fields = vec![
            field("a", "owner", None, &["b"], FieldKind::Radio),
            field("b", "gender", Some("a"), &[], FieldKind::Text),
        ];
        let tree = HierarchyTree::build(&fields);
        assert_eq!(tree.node("a").unwrap().qualified_name, "owner");
        assert_eq!(tree.node("b").unwrap().qualified_name, "owner.gender");
    }

    #[test]
    fn detects_duplicate_qualified_names() {
        let fields = vec![
            field("a", "dup", None, &[], FieldKind::Text),
            field("b", "dup", None, &[], FieldKind::Text),
        ];
        let tree = HierarchyTree::build(&fields);
        let conflicts = tree.validate();
        assert!(conflicts
            .iter()
            .any(|c| c.kind == ConflictKind::QualifiedNameConflict));
    }

    #[test]
    fn detects_cycle() {
        let fields = vec![
            field("a", "a", Some("b"), &["b"], FieldKind::Text),
            field("b", "b", Some("a"), &["a"], FieldKind::Text),
        ];
        let tree = HierarchyTree::build(&fields);
        let conflicts = tree.validate();
        assert!(conflicts.iter().any(|c| c.kind == ConflictKind::Cycle));
    }

    #[test]
    fn propose_does_not_mutate_original() {
        let fields = vec![field("a", "owner", None, &[], FieldKind::Text)];
        let tree = HierarchyTree::build(&fields);
        let mut mapping = HashMap::new();
        mapping.insert("a".to_string(), "renamed".to_string());
        let _ = tree.propose(&mapping);
        assert_eq!(tree.node("a").unwrap().qualified_name, "owner");
    }
}
