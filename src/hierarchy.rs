// 🧬 Hierarchical Joiner - 3-level self-join over a flattened taxonomy
//
// Input:  roots, level-1 rows, level-2 rows (each row knows its parent_id)
// Output: one row per root → (level 1) → (level 2) path
//
//   root ⟕ level1 ON level1.parent_id = root.id
//        ⟕ level2 ON level2.parent_id = level1.id
//
// Every root appears even without children; every level-1 node appears
// under its root even without children. Column names stay distinct per
// level, and `id_especifico` is the deepest id present on the path.

use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

// ============================================================================
// ROW TYPES
// ============================================================================

/// Minimal view of a flattened tree node: what the join needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxonomyRow {
    pub id: i64,
    pub descricao: String,
    pub parent_id: Option<i64>,
}

impl TaxonomyRow {
    pub fn new(id: i64, descricao: &str, parent_id: Option<i64>) -> Self {
        TaxonomyRow {
            id,
            descricao: descricao.to_string(),
            parent_id,
        }
    }
}

/// One root→leaf path with every ancestor's description attached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HierarchyRow {
    pub raiz_id: i64,
    pub raiz_descricao: String,
    pub nivel_1_id: Option<i64>,
    pub nivel_1_descricao: Option<String>,
    pub nivel_2_id: Option<i64>,
    pub nivel_2_descricao: Option<String>,

    /// Deepest id on the path (level 2, else level 1, else root)
    pub id_especifico: i64,
}

impl HierarchyRow {
    fn path(root: &TaxonomyRow, level1: Option<&TaxonomyRow>, level2: Option<&TaxonomyRow>) -> Self {
        let nivel_1_id = level1.map(|r| r.id);
        let nivel_2_id = level2.map(|r| r.id);

        HierarchyRow {
            raiz_id: root.id,
            raiz_descricao: root.descricao.clone(),
            nivel_1_id,
            nivel_1_descricao: level1.map(|r| r.descricao.clone()),
            nivel_2_id,
            nivel_2_descricao: level2.map(|r| r.descricao.clone()),
            id_especifico: most_specific_id(root.id, nivel_1_id, nivel_2_id),
        }
    }

    /// Description of the deepest node on the path
    pub fn descricao_especifica(&self) -> &str {
        self.nivel_2_descricao
            .as_deref()
            .or(self.nivel_1_descricao.as_deref())
            .unwrap_or(&self.raiz_descricao)
    }

    /// 0 = root only, 1 = ends at level 1, 2 = ends at level 2
    pub fn depth(&self) -> usize {
        match (self.nivel_1_id, self.nivel_2_id) {
            (_, Some(_)) => 2,
            (Some(_), None) => 1,
            (None, None) => 0,
        }
    }

    /// Same path cut after `depth` (descendant columns cleared)
    pub fn truncated(&self, depth: usize) -> HierarchyRow {
        let mut row = self.clone();
        if depth < 2 {
            row.nivel_2_id = None;
            row.nivel_2_descricao = None;
        }
        if depth < 1 {
            row.nivel_1_id = None;
            row.nivel_1_descricao = None;
        }
        row.id_especifico = most_specific_id(row.raiz_id, row.nivel_1_id, row.nivel_2_id);
        row
    }
}

/// First non-null of (level 2, level 1, root)
pub fn most_specific_id(root: i64, level1: Option<i64>, level2: Option<i64>) -> i64 {
    level2.or(level1).unwrap_or(root)
}

// ============================================================================
// JOIN
// ============================================================================

fn group_by_parent(rows: &[TaxonomyRow]) -> HashMap<i64, Vec<&TaxonomyRow>> {
    let mut groups: HashMap<i64, Vec<&TaxonomyRow>> = HashMap::new();
    for row in rows {
        if let Some(parent_id) = row.parent_id {
            groups.entry(parent_id).or_default().push(row);
        }
    }
    groups
}

fn log_orphans(label: &str, rows: &[TaxonomyRow], parents: &HashSet<i64>) {
    for row in rows {
        let attached = row.parent_id.is_some_and(|p| parents.contains(&p));
        if !attached {
            debug!(
                "{} node {} ('{}') has no parent at the level above, left out of the join",
                label, row.id, row.descricao
            );
        }
    }
}

/// Left-outer 3-level self-join. Output order follows root order, then
/// level-1 order, then level-2 order.
pub fn join_hierarchy(
    roots: &[TaxonomyRow],
    level1: &[TaxonomyRow],
    level2: &[TaxonomyRow],
) -> Vec<HierarchyRow> {
    let level1_by_parent = group_by_parent(level1);
    let level2_by_parent = group_by_parent(level2);

    log_orphans("level-1", level1, &roots.iter().map(|r| r.id).collect());
    log_orphans("level-2", level2, &level1.iter().map(|r| r.id).collect());

    let mut rows = Vec::new();

    for root in roots {
        let Some(children) = level1_by_parent.get(&root.id) else {
            rows.push(HierarchyRow::path(root, None, None));
            continue;
        };

        for child in children {
            match level2_by_parent.get(&child.id) {
                None => rows.push(HierarchyRow::path(root, Some(child), None)),
                Some(grandchildren) => {
                    for grandchild in grandchildren {
                        rows.push(HierarchyRow::path(root, Some(child), Some(grandchild)));
                    }
                }
            }
        }
    }

    rows
}

// ============================================================================
// LOOKUP INDEX
// ============================================================================

/// Id → path lookup used by the ledger join.
///
/// Keyed on each path's `id_especifico`. Nodes that are never a path end
/// (roots and level-1 nodes that have children) are also indexed, to their
/// truncated path, so entries booked on a non-leaf node still resolve.
/// Path ends always take precedence.
#[derive(Debug, Clone, Default)]
pub struct TaxonomyIndex {
    by_id: HashMap<i64, HierarchyRow>,
}

impl TaxonomyIndex {
    pub fn build(rows: &[HierarchyRow]) -> Self {
        let mut by_id: HashMap<i64, HierarchyRow> = HashMap::new();

        for row in rows {
            by_id.entry(row.id_especifico).or_insert_with(|| row.clone());
        }

        for row in rows {
            if row.depth() >= 1 {
                by_id.entry(row.raiz_id).or_insert_with(|| row.truncated(0));
            }
            if let (Some(level1_id), 2) = (row.nivel_1_id, row.depth()) {
                by_id.entry(level1_id).or_insert_with(|| row.truncated(1));
            }
        }

        TaxonomyIndex { by_id }
    }

    pub fn resolve(&self, id: Option<i64>) -> Option<&HierarchyRow> {
        id.and_then(|id| self.by_id.get(&id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(id: i64, parent_id: Option<i64>) -> TaxonomyRow {
        TaxonomyRow::new(id, &format!("cat {}", id), parent_id)
    }

    #[test]
    fn test_most_specific_id() {
        assert_eq!(most_specific_id(1, None, None), 1);
        assert_eq!(most_specific_id(1, Some(2), None), 2);
        assert_eq!(most_specific_id(1, Some(2), Some(3)), 3);
    }

    #[test]
    fn test_root_without_children() {
        let rows = join_hierarchy(&[r(1, None)], &[], &[]);

        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.raiz_id, 1);
        assert_eq!(row.nivel_1_id, None);
        assert_eq!(row.nivel_1_descricao, None);
        assert_eq!(row.nivel_2_id, None);
        assert_eq!(row.nivel_2_descricao, None);
        assert_eq!(row.id_especifico, 1);
    }

    #[test]
    fn test_two_children_each_with_one_grandchild() {
        let rows = join_hierarchy(
            &[r(1, None)],
            &[r(2, Some(1)), r(3, Some(1))],
            &[r(4, Some(2)), r(5, Some(3))],
        );

        assert_eq!(rows.len(), 2);
        assert_eq!((rows[0].nivel_1_id, rows[0].nivel_2_id), (Some(2), Some(4)));
        assert_eq!((rows[1].nivel_1_id, rows[1].nivel_2_id), (Some(3), Some(5)));
        assert_eq!(rows[0].id_especifico, 4);
        assert_eq!(rows[1].id_especifico, 5);
    }

    #[test]
    fn test_child_without_grandchildren_is_kept() {
        let rows = join_hierarchy(
            &[r(1, None)],
            &[r(2, Some(1)), r(3, Some(1))],
            &[r(4, Some(2))],
        );

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].nivel_1_id, Some(3));
        assert_eq!(rows[1].nivel_2_id, None);
        assert_eq!(rows[1].id_especifico, 3);
        assert_eq!(rows[1].descricao_especifica(), "cat 3");
    }

    #[test]
    fn test_multiple_roots_and_paths() {
        let rows = join_hierarchy(
            &[r(1, None), r(10, None)],
            &[r(2, Some(1))],
            &[r(3, Some(2)), r(4, Some(2))],
        );

        let paths: Vec<i64> = rows.iter().map(|row| row.id_especifico).collect();
        assert_eq!(paths, vec![3, 4, 10]);
        assert!(rows.iter().take(2).all(|row| row.raiz_descricao == "cat 1"));
    }

    #[test]
    fn test_orphans_are_left_out() {
        let rows = join_hierarchy(&[r(1, None)], &[r(2, Some(99))], &[r(3, Some(77))]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id_especifico, 1);
    }

    #[test]
    fn test_index_resolves_leaves_and_inner_nodes() {
        let rows = join_hierarchy(
            &[r(1, None), r(10, None)],
            &[r(2, Some(1)), r(5, Some(1))],
            &[r(3, Some(2))],
        );
        let index = TaxonomyIndex::build(&rows);

        // path ends
        assert_eq!(index.resolve(Some(3)).unwrap().nivel_1_id, Some(2));
        assert_eq!(index.resolve(Some(5)).unwrap().depth(), 1);
        assert_eq!(index.resolve(Some(10)).unwrap().depth(), 0);

        // inner nodes resolve to truncated paths
        let inner = index.resolve(Some(2)).unwrap();
        assert_eq!(inner.id_especifico, 2);
        assert_eq!(inner.nivel_2_id, None);
        let root = index.resolve(Some(1)).unwrap();
        assert_eq!(root.id_especifico, 1);
        assert_eq!(root.nivel_1_id, None);

        assert!(index.resolve(Some(999)).is_none());
        assert!(index.resolve(None).is_none());
        for id in [1, 2, 3, 5, 10] {
            assert!(index.resolve(Some(id)).is_some());
        }
    }

    #[test]
    fn test_index_path_end_wins_over_inner_node_with_same_id() {
        // id 2 is both an inner level-1 node (under root 1) and a childless root
        let rows = join_hierarchy(
            &[r(1, None), r(2, None)],
            &[r(2, Some(1))],
            &[r(3, Some(2))],
        );
        let index = TaxonomyIndex::build(&rows);

        let hit = index.resolve(Some(2)).unwrap();
        assert_eq!(hit.raiz_id, 2);
        assert_eq!(hit.depth(), 0);
        assert_eq!(hit.nivel_1_id, None);

        assert_eq!(index.resolve(Some(3)).unwrap().raiz_id, 1);
        assert_eq!(index.resolve(Some(1)).unwrap().depth(), 0);
    }
}
