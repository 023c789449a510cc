//! Structured field migration
//!
//! Provides [`migrate_structured_field`] for a single holder and
//! [`migrate_page_types_and_fields`], the batch driver that walks every live
//! node of the targeted types and then each node's snapshots, newest first,
//! inside one atomic block.

use crate::directive::MigrationDirective;
use crate::error::{EntityKind, MigrateError};
use crate::holder::{get_structured_value, set_structured_value, ContentHolder};
use crate::schema::{NodeSchema, SchemaRegistry};
use crate::store::ContentStore;
use serde::Serialize;
use strata_stream::{migrate_structured_value, BlockTransform};

/// Counts gathered by a batch migration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    /// Live nodes read
    pub nodes_visited: usize,
    /// Snapshots read
    pub snapshots_visited: usize,
    /// Live nodes rewritten and persisted
    pub nodes_migrated: usize,
    /// Snapshots rewritten and persisted
    pub snapshots_migrated: usize,
}

impl MigrationReport {
    /// Check if anything was persisted
    #[inline]
    #[must_use]
    pub fn changed(&self) -> bool {
        self.nodes_migrated + self.snapshots_migrated > 0
    }

    fn record(&mut self, holder: &ContentHolder, changed: bool) {
        if holder.is_live() {
            self.nodes_visited += 1;
            self.nodes_migrated += usize::from(changed);
        } else {
            self.snapshots_visited += 1;
            self.snapshots_migrated += usize::from(changed);
        }
    }
}

/// Rewrite one structured field of one holder
///
/// Reads the field, rewrites every `block_type` block with `transform` and,
/// only when something matched, writes the field back and persists the
/// holder once. A holder with no matching block is left untouched.
///
/// Returns whether the holder was changed.
///
/// # Errors
/// Propagates read, transformation and persistence errors; the holder may
/// be left modified in memory but nothing is persisted on error.
pub fn migrate_structured_field<S, T>(
    store: &S,
    holder: &mut ContentHolder,
    schema: &NodeSchema,
    field: &str,
    block_type: &str,
    transform: &T,
) -> Result<bool, MigrateError>
where
    S: ContentStore + ?Sized,
    T: BlockTransform<ContentHolder> + ?Sized,
{
    let data = get_structured_value(holder, field, schema)?;
    let (migrated, changed) = migrate_structured_value(&*holder, block_type, data, transform)?;

    if changed {
        tracing::debug!(holder = %holder.label(), field, block_type, "rewrote structured field");
        set_structured_value(store, holder, field, &migrated, schema, true)?;
    }
    Ok(changed)
}

/// Run a batch of directives atomically
///
/// For each directive, in order, every live node of the directive's type is
/// migrated, then each of that node's snapshots from newest to oldest. The
/// schema used for a node is the registered one matching the node's own
/// schema version.
///
/// Either every change persists or, on the first error, none does.
///
/// # Errors
/// - [`MigrateError::NotFound`] if a type, schema version or field is not
///   registered
/// - any error from reading, transforming or persisting a holder
pub fn migrate_page_types_and_fields<S: ContentStore>(
    store: &S,
    registry: &SchemaRegistry,
    directives: &[MigrationDirective],
) -> Result<MigrationReport, MigrateError> {
    let report = store.atomic(|store| {
        let mut report = MigrationReport::default();

        for directive in directives {
            run_directive(store, registry, directive, &mut report)?;
        }
        Ok(report)
    })?;

    tracing::info!(
        nodes_migrated = report.nodes_migrated,
        snapshots_migrated = report.snapshots_migrated,
        "Migrated {} directives",
        directives.len()
    );
    Ok(report)
}

fn run_directive<S: ContentStore>(
    store: &S,
    registry: &SchemaRegistry,
    directive: &MigrationDirective,
    report: &mut MigrationReport,
) -> Result<(), MigrateError> {
    let node_type = directive.node_type();
    if !registry.contains_type(node_type) {
        return Err(MigrateError::not_found(EntityKind::NodeType, node_type));
    }

    let nodes = store.nodes_of_type(node_type)?;
    tracing::info!(
        "Migrating {} '{}' blocks in {} nodes of {}",
        directive.field(),
        directive.block_type(),
        nodes.len(),
        node_type
    );

    for node in nodes {
        let schema = registry.resolve(&node.node_type, node.schema_version)?;
        schema.codec(directive.field())?;
        let node_id = node.id;

        let mut holder = ContentHolder::Live(node);
        let changed = migrate_structured_field(
            store,
            &mut holder,
            schema,
            directive.field(),
            directive.block_type(),
            directive.transform(),
        )?;
        report.record(&holder, changed);

        for snapshot in store.snapshots_of(node_id)? {
            let mut holder = ContentHolder::Historical(snapshot);
            let changed = migrate_structured_field(
                store,
                &mut holder,
                schema,
                directive.field(),
                directive.block_type(),
                directive.transform(),
            )?;
            report.record(&holder, changed);
        }
    }
    Ok(())
}
