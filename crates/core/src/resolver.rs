use crate::calculation::TreeRecord;
use crate::ids::CalculationId;
use crate::CoreError;

/// Upper bound on ancestor hops before a chain is declared corrupt.
pub const DEFAULT_MAX_DEPTH: usize = 10_000;

/// Walk parent links from `node_id` up to its root.
///
/// Returns `Ok(None)` when `node_id` itself does not exist. If an ancestor is
/// missing from the store, the walk stops at the deepest record whose parent
/// could not be fetched and returns that record as the root: for A -> B -> C
/// with B gone, resolving C yields C. More than `max_steps` hops fails with
/// `CorruptTree`.
pub fn resolve_root<T, F, E>(
    node_id: CalculationId,
    max_steps: usize,
    mut fetch: F,
) -> Result<Option<CalculationId>, E>
where
    T: TreeRecord,
    F: FnMut(CalculationId) -> Result<Option<T>, E>,
    E: From<CoreError>,
{
    let Some(mut current) = fetch(node_id)? else {
        return Ok(None);
    };

    let mut steps = 0;
    while let Some(parent_id) = current.parent_id() {
        if steps >= max_steps {
            return Err(CoreError::CorruptTree { start: node_id, steps }.into());
        }
        steps += 1;
        match fetch(parent_id)? {
            Some(parent) => current = parent,
            None => break,
        }
    }

    Ok(Some(current.id()))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[derive(Debug, Clone)]
    struct Link {
        id: CalculationId,
        parent: Option<CalculationId>,
    }

    impl TreeRecord for Link {
        fn id(&self) -> CalculationId {
            self.id
        }

        fn parent_id(&self) -> Option<CalculationId> {
            self.parent
        }
    }

    fn store(links: &[(i64, Option<i64>)]) -> HashMap<CalculationId, Link> {
        links
            .iter()
            .map(|&(id, parent)| {
                let id = CalculationId::new(id);
                (id, Link { id, parent: parent.map(CalculationId::new) })
            })
            .collect()
    }

    fn resolve(
        links: &HashMap<CalculationId, Link>,
        id: i64,
        max: usize,
    ) -> Result<Option<CalculationId>, CoreError> {
        resolve_root(CalculationId::new(id), max, |id| Ok(links.get(&id).cloned()))
    }

    #[test]
    fn chain_resolves_to_top() {
        let links = store(&[(1, None), (2, Some(1)), (3, Some(2))]);
        assert_eq!(resolve(&links, 3, DEFAULT_MAX_DEPTH), Ok(Some(CalculationId::new(1))));
        assert_eq!(resolve(&links, 1, DEFAULT_MAX_DEPTH), Ok(Some(CalculationId::new(1))));
    }

    #[test]
    fn broken_chain_returns_last_reachable() {
        let mut links = store(&[(1, None), (2, Some(1)), (3, Some(2))]);
        assert_eq!(resolve(&links, 3, DEFAULT_MAX_DEPTH), Ok(Some(CalculationId::new(1))));

        // With the middle link gone the walk stops at 3, the last record it
        // could fetch. With only the root gone it stops at 2.
        links.remove(&CalculationId::new(2));
        assert_eq!(resolve(&links, 3, DEFAULT_MAX_DEPTH), Ok(Some(CalculationId::new(3))));

        let mut links = store(&[(1, None), (2, Some(1)), (3, Some(2))]);
        links.remove(&CalculationId::new(1));
        assert_eq!(resolve(&links, 3, DEFAULT_MAX_DEPTH), Ok(Some(CalculationId::new(2))));
    }

    #[test]
    fn walk_stops_below_the_gap() {
        let mut links = store(&[(1, None), (2, Some(1)), (3, Some(2)), (4, Some(3)), (5, Some(4))]);
        links.remove(&CalculationId::new(3));
        assert_eq!(resolve(&links, 5, DEFAULT_MAX_DEPTH), Ok(Some(CalculationId::new(4))));
        assert_eq!(resolve(&links, 2, DEFAULT_MAX_DEPTH), Ok(Some(CalculationId::new(1))));
    }

    #[test]
    fn missing_start_is_none() {
        let links = store(&[(1, None)]);
        assert_eq!(resolve(&links, 999, DEFAULT_MAX_DEPTH), Ok(None));
    }

    #[test]
    fn cycle_hits_the_cap() {
        let links = store(&[(1, Some(2)), (2, Some(1))]);
        assert_eq!(
            resolve(&links, 1, 50),
            Err(CoreError::CorruptTree { start: CalculationId::new(1), steps: 50 })
        );
    }

    #[test]
    fn cap_equal_to_depth_is_enough() {
        let links = store(&[(1, None), (2, Some(1)), (3, Some(2))]);
        assert_eq!(resolve(&links, 3, 2), Ok(Some(CalculationId::new(1))));
        assert!(matches!(resolve(&links, 3, 1), Err(CoreError::CorruptTree { .. })));
    }

    #[test]
    fn fetch_errors_propagate() {
        #[derive(Debug, PartialEq)]
        enum TestError {
            Core(CoreError),
            Offline,
        }
        impl From<CoreError> for TestError {
            fn from(e: CoreError) -> Self {
                Self::Core(e)
            }
        }

        let result: Result<Option<CalculationId>, TestError> =
            resolve_root(CalculationId::new(1), 10, |_| Err::<Option<Link>, _>(TestError::Offline));
        assert_eq!(result, Err(TestError::Offline));
    }
}
