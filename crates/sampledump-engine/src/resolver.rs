//! Dependency-ordered manifest iteration
//!
//! Walks the manifest's tables depth-first along their foreign-key edges and
//! yields each table only after every table it references has been yielded.
//! Referenced tables the manifest omits are inserted as synthetic default
//! entries, so the emitted script never violates a foreign-key constraint
//! when replayed into an empty schema.

use crate::error::DumpError;
use sampledump_catalog::SourceAdapter;
use sampledump_core::{Manifest, ManifestItem};
use std::collections::{HashMap, HashSet, VecDeque};

/// Lazy, dependency-correct iterator over a manifest's table entries
///
/// Traversal order among declared tables follows manifest declaration order.
/// Order among one table's foreign-key targets follows the catalog's row
/// order, deliberately not re-sorted, so dumps stay byte-comparable across
/// runs against the same catalog.
///
/// Manifest entries are keyed by table name with last-wins semantics: when
/// two entries declare the same table, the later declaration replaces the
/// earlier one.
pub struct ManifestResolver<'a, S: SourceAdapter + ?Sized> {
    source: &'a S,

    /// Declared or discovered entries not yet emitted, keyed by table name
    todo: HashMap<String, ManifestItem>,

    /// Tables already emitted
    done: HashSet<String>,

    /// Work-list driving traversal order
    pending: VecDeque<String>,

    /// Requeue counts, used to detect circular references
    requeues: HashMap<String, usize>,
}

impl<'a, S: SourceAdapter + ?Sized> ManifestResolver<'a, S> {
    /// Create a resolver over a manifest
    pub fn new(source: &'a S, manifest: &Manifest) -> Self {
        let mut todo = HashMap::new();
        let mut pending = VecDeque::new();

        for item in &manifest.tables {
            pending.push_back(item.table.clone());
            todo.insert(item.table.clone(), item.clone());
        }

        Self {
            source,
            todo,
            done: HashSet::new(),
            pending,
            requeues: HashMap::new(),
        }
    }

    /// Produce the next entry ready for emission, or `None` when exhausted
    ///
    /// Fails with [`DumpError::Metadata`] if a foreign-key lookup fails and
    /// with [`DumpError::Cycle`] if the foreign-key graph contains a cycle.
    pub async fn next_item(&mut self) -> Result<Option<ManifestItem>, DumpError> {
        loop {
            let Some(table) = self.pending.pop_front() else {
                return Ok(None);
            };

            // Duplicate or already-resolved entries re-pushed during
            // dependency expansion are absorbed here.
            if !self.todo.contains_key(&table) {
                continue;
            }

            let deps = self
                .source
                .table_dependencies(&table)
                .await
                .map_err(|source| DumpError::Metadata {
                    table: table.clone(),
                    source,
                })?;

            let mut outstanding: Vec<String> = Vec::new();
            for dep in deps {
                if !self.todo.contains_key(&dep) && !self.done.contains(&dep) {
                    // A referenced table not present in the manifest was
                    // found, create a default entry for it
                    self.todo.insert(dep.clone(), ManifestItem::new(dep.clone()));
                }
                if self.todo.contains_key(&dep) && dep != table && !outstanding.contains(&dep) {
                    outstanding.push(dep);
                }
            }

            if !outstanding.is_empty() {
                let count = self.requeues.entry(table.clone()).or_insert(0);
                *count += 1;

                // In an acyclic graph a table requeues at most once per live
                // dependent, so exceeding the number of known tables proves
                // a cycle.
                if *count > self.todo.len() + self.done.len() {
                    return Err(DumpError::Cycle(table));
                }

                tracing::debug!(table = %table, deps = ?outstanding, "deferring table behind its dependencies");

                self.pending.push_front(table);
                for dep in outstanding.into_iter().rev() {
                    self.pending.push_front(dep);
                }
                continue;
            }

            let Some(item) = self.todo.remove(&table) else {
                continue;
            };
            self.done.insert(table);

            tracing::debug!(table = %item.table, "resolved table for emission");

            return Ok(Some(item));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sampledump_catalog::{MockAdapterBuilder, SourceError};

    fn manifest_of(tables: &[&str]) -> Manifest {
        Manifest {
            vars: HashMap::new(),
            tables: tables.iter().map(|t| ManifestItem::new(*t)).collect(),
        }
    }

    async fn resolve_all<S: SourceAdapter>(
        source: &S,
        manifest: &Manifest,
    ) -> Result<Vec<String>, DumpError> {
        let mut resolver = ManifestResolver::new(source, manifest);
        let mut order = Vec::new();
        while let Some(item) = resolver.next_item().await? {
            order.push(item.table);
        }
        Ok(order)
    }

    #[tokio::test]
    async fn manifest_order_without_dependencies() {
        let adapter = MockAdapterBuilder::new()
            .with_table("a", &["id"], &[], "")
            .with_table("b", &["id"], &[], "")
            .with_table("c", &["id"], &[], "")
            .build();

        let order = resolve_all(&adapter, &manifest_of(&["b", "c", "a"]))
            .await
            .unwrap();
        assert_eq!(order, vec!["b", "c", "a"]);
    }

    #[tokio::test]
    async fn dependency_precedes_dependent_in_either_declared_order() {
        let adapter = MockAdapterBuilder::new()
            .with_table("a", &["id"], &[], "")
            .with_table("b", &["id", "a_id"], &["a"], "")
            .build();

        let order = resolve_all(&adapter, &manifest_of(&["a", "b"]))
            .await
            .unwrap();
        assert_eq!(order, vec!["a", "b"]);

        let order = resolve_all(&adapter, &manifest_of(&["b", "a"]))
            .await
            .unwrap();
        assert_eq!(order, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn chain_declared_in_reverse_emits_in_dependency_order() {
        let adapter = MockAdapterBuilder::new()
            .with_table("a", &["id"], &[], "")
            .with_table("b", &["id"], &["a"], "")
            .with_table("c", &["id"], &["b"], "")
            .build();

        let order = resolve_all(&adapter, &manifest_of(&["c", "b", "a"]))
            .await
            .unwrap();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn undeclared_dependency_gets_synthetic_entry() {
        let adapter = MockAdapterBuilder::new()
            .with_table("users", &["id"], &[], "")
            .with_table("orders", &["id", "user_id"], &["users"], "")
            .build();

        let manifest = manifest_of(&["orders"]);
        let mut resolver = ManifestResolver::new(&adapter, &manifest);

        let first = resolver.next_item().await.unwrap().unwrap();
        assert_eq!(first, ManifestItem::new("users"));
        assert_eq!(first.query, None);
        assert!(first.columns.is_empty());
        assert!(first.post_actions.is_empty());

        let second = resolver.next_item().await.unwrap().unwrap();
        assert_eq!(second.table, "orders");

        assert!(resolver.next_item().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn no_table_is_emitted_twice() {
        // Diamond: both x and y reference a and b.
        let adapter = MockAdapterBuilder::new()
            .with_table("a", &["id"], &[], "")
            .with_table("b", &["id"], &[], "")
            .with_table("x", &["id"], &["a", "b"], "")
            .with_table("y", &["id"], &["a", "b"], "")
            .build();

        let order = resolve_all(&adapter, &manifest_of(&["x", "y", "a", "b"]))
            .await
            .unwrap();

        let unique: HashSet<&String> = order.iter().collect();
        assert_eq!(unique.len(), order.len());
        assert_eq!(order.len(), 4);

        let pos = |t: &str| order.iter().position(|x| x == t).unwrap();
        assert!(pos("a") < pos("x") && pos("b") < pos("x"));
        assert!(pos("a") < pos("y") && pos("b") < pos("y"));
    }

    #[tokio::test]
    async fn duplicate_edges_to_one_table_collapse() {
        // Two foreign keys from orders to users produce two catalog rows.
        let adapter = MockAdapterBuilder::new()
            .with_table("users", &["id"], &[], "")
            .with_table("orders", &["id"], &["users", "users"], "")
            .build();

        let order = resolve_all(&adapter, &manifest_of(&["orders"]))
            .await
            .unwrap();
        assert_eq!(order, vec!["users", "orders"]);
    }

    #[tokio::test]
    async fn self_reference_is_ignored() {
        let adapter = MockAdapterBuilder::new()
            .with_table("employees", &["id", "manager_id"], &["employees"], "")
            .build();

        let order = resolve_all(&adapter, &manifest_of(&["employees"]))
            .await
            .unwrap();
        assert_eq!(order, vec!["employees"]);
    }

    #[tokio::test]
    async fn duplicate_manifest_entries_last_wins() {
        let adapter = MockAdapterBuilder::new()
            .with_table("users", &["id", "name"], &[], "")
            .build();

        let manifest = Manifest {
            vars: HashMap::new(),
            tables: vec![
                ManifestItem::new("users"),
                ManifestItem {
                    table: "users".to_string(),
                    columns: vec!["id".to_string()],
                    ..ManifestItem::default()
                },
            ],
        };

        let mut resolver = ManifestResolver::new(&adapter, &manifest);

        let item = resolver.next_item().await.unwrap().unwrap();
        assert_eq!(item.columns, vec!["id"]);

        assert!(resolver.next_item().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn two_table_cycle_is_detected() {
        let adapter = MockAdapterBuilder::new()
            .with_table("a", &["id"], &["b"], "")
            .with_table("b", &["id"], &["a"], "")
            .build();

        let mut resolver = ManifestResolver::new(&adapter, &manifest_of(&["a", "b"]));

        // Bounded: the resolver must fail instead of looping forever.
        let mut iterations = 0;
        let err = loop {
            iterations += 1;
            assert!(iterations < 100, "resolver did not terminate on a cycle");
            match resolver.next_item().await {
                Ok(Some(_)) => continue,
                Ok(None) => panic!("cycle resolved without error"),
                Err(err) => break err,
            }
        };

        assert!(matches!(err, DumpError::Cycle(_)));
    }

    #[tokio::test]
    async fn longer_cycle_is_detected() {
        let adapter = MockAdapterBuilder::new()
            .with_table("a", &["id"], &["c"], "")
            .with_table("b", &["id"], &["a"], "")
            .with_table("c", &["id"], &["b"], "")
            .build();

        let mut resolver = ManifestResolver::new(&adapter, &manifest_of(&["a"]));

        let mut iterations = 0;
        loop {
            iterations += 1;
            assert!(iterations < 100, "resolver did not terminate on a cycle");
            match resolver.next_item().await {
                Ok(Some(_)) => continue,
                Ok(None) => panic!("cycle resolved without error"),
                Err(DumpError::Cycle(_)) => break,
                Err(other) => panic!("unexpected error: {}", other),
            }
        }
    }

    #[tokio::test]
    async fn metadata_failure_aborts_with_table_name() {
        let adapter = MockAdapterBuilder::new()
            .with_table_meta("users", &["id"], &[])
            .with_error(
                "users",
                SourceError::PermissionDenied("no catalog access".to_string()),
            )
            .build();

        let mut resolver = ManifestResolver::new(&adapter, &manifest_of(&["users"]));

        let err = resolver.next_item().await.unwrap_err();
        match err {
            DumpError::Metadata { table, .. } => assert_eq!(table, "users"),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn exhausted_resolver_keeps_returning_none() {
        let adapter = MockAdapterBuilder::new()
            .with_table("a", &["id"], &[], "")
            .build();

        let mut resolver = ManifestResolver::new(&adapter, &manifest_of(&["a"]));
        assert!(resolver.next_item().await.unwrap().is_some());
        assert!(resolver.next_item().await.unwrap().is_none());
        assert!(resolver.next_item().await.unwrap().is_none());
    }
}
