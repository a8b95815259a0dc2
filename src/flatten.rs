// 🌳 Tree Flattener - nested parent/child arrays → flat per-depth tables
//
// Reference trees arrive as roots with their children embedded. Flattening
// one level collects every child of every parent; flattening to a depth
// repeats that step, so level k holds every node k steps below a root.

// ============================================================================
// TREE NODE
// ============================================================================

/// A record that embeds its children as a sub-collection of the same type
pub trait TreeNode: Clone {
    /// Flat shape persisted for one node (no children column)
    type Row;

    fn id(&self) -> i64;

    /// Direct parent id; None for roots
    fn parent_id(&self) -> Option<i64>;

    fn children(&self) -> &[Self];

    fn to_row(&self) -> Self::Row;
}

// ============================================================================
// FLATTENING
// ============================================================================

/// Every child of every parent, in parent order then child order.
///
/// Children keep all of their own fields, including their `parent_id` and
/// their own embedded children (so the result can be unnested again).
/// Parents without children contribute nothing; all-empty input gives an
/// empty output.
pub fn unnest_children<T: TreeNode>(parents: &[T]) -> Vec<T> {
    parents
        .iter()
        .flat_map(|parent| parent.children().iter().cloned())
        .collect()
}

/// Split a forest into `depth` levels: `[roots, level 1, level 2, ...]`.
///
/// Always returns exactly `depth` entries; levels below the deepest node are
/// empty. `depth == 0` returns no levels.
pub fn flatten_levels<T: TreeNode>(roots: Vec<T>, depth: usize) -> Vec<Vec<T>> {
    if depth == 0 {
        return Vec::new();
    }

    let below = unnest_children(&roots);
    let mut levels = vec![roots];
    levels.extend(flatten_levels(below, depth - 1));
    levels
}

/// Project every level to its persisted row shape
pub fn level_rows<T: TreeNode>(levels: &[Vec<T>]) -> Vec<Vec<T::Row>> {
    levels
        .iter()
        .map(|level| level.iter().map(TreeNode::to_row).collect())
        .collect()
}
