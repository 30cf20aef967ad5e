//! Read-only overview of every stone in a route.

use anyhow::Result;
use serde::Serialize;

use crate::io::artifacts::resolve_artifacts;
use crate::io::catalog::load_stones;
use crate::io::ledger::PassageLedger;
use crate::io::paths::RoutePaths;
use crate::io::store::KeyValueStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoneStatus {
    pub name: String,
    pub guarded: bool,
    pub artifact_count: usize,
    pub passed: bool,
    pub approved: bool,
}

/// Status of each catalog stone, in selection order.
pub fn route_status<S: KeyValueStore>(paths: &RoutePaths, store: &S) -> Result<Vec<StoneStatus>> {
    let ledger = PassageLedger::new(store);
    let mut status = Vec::new();
    for stone in load_stones(paths)? {
        status.push(StoneStatus {
            artifact_count: resolve_artifacts(paths.root(), &stone)?.len(),
            guarded: stone.guard.is_some(),
            passed: ledger.is_passed(&stone.name)?,
            approved: ledger.is_approved(&stone.name)?,
            name: stone.name,
        });
    }
    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::store::MemoryStore;
    use crate::test_support::TempRoute;

    #[test]
    fn reports_each_stone_in_order() {
        let route = TempRoute::new().expect("route");
        route.write_stone("2.b", Some("judges:\n  - judge\n")).expect("stone");
        route.write_stone("1.a", None).expect("stone");
        route.write_file("1.a.md", "a").expect("artifact");
        let store = MemoryStore::new();
        PassageLedger::new(&store).mark_passed("1.a").expect("mark");
        PassageLedger::new(&store).mark_approved("2.b").expect("mark");

        let status = route_status(&route.paths(), &store).expect("status");
        assert_eq!(
            status,
            vec![
                StoneStatus {
                    name: "1.a".to_string(),
                    guarded: false,
                    artifact_count: 1,
                    passed: true,
                    approved: false,
                },
                StoneStatus {
                    name: "2.b".to_string(),
                    guarded: true,
                    artifact_count: 0,
                    passed: false,
                    approved: true,
                },
            ]
        );
    }
}
