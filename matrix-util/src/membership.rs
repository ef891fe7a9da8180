use std::collections::BTreeMap;

/// partition membership vector into groups of indexes
/// # Arguments
/// * `membership` - a vector of membership (E.g., cluster assignment)
/// # Returns
/// An ordered map: cluster/group name -> indexes of the elements (ascending)
pub fn partition_by_membership<T>(membership: &[T]) -> BTreeMap<T, Vec<usize>>
where
    T: Ord + Clone,
{
    let mut groups: BTreeMap<T, Vec<usize>> = BTreeMap::new();
    for (i, k) in membership.iter().enumerate() {
        groups.entry(k.clone()).or_default().push(i);
    }
    groups
}

/// Row indexes stably sorted by their membership, for display of a
/// matrix with rows grouped by cluster
pub fn order_by_membership<T>(membership: &[T]) -> Vec<usize>
where
    T: Ord + Clone,
{
    partition_by_membership(membership)
        .into_values()
        .flatten()
        .collect()
}
