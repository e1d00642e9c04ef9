//! Process-wide record registry.
//!
//! `#[derive(Record)]` submits a [`RecordRegistration`] for every record type, so
//! [`Session::migrate_registered`](crate::Session::migrate_registered) can migrate
//! all of them without listing each type.

use crate::error::OrmResult;
use crate::schema::TableSchema;

/// Registration entry for auto-registering records.
pub struct RecordRegistration {
    /// Table name of the record.
    pub table: &'static str,
    /// Builds the record's schema.
    pub describe: fn() -> OrmResult<TableSchema>,
}

inventory::collect!(RecordRegistration);

/// All registered records, sorted by table name.
pub fn registered() -> Vec<&'static RecordRegistration> {
    let mut regs: Vec<&'static RecordRegistration> =
        inventory::iter::<RecordRegistration>.into_iter().collect();
    regs.sort_by_key(|r| r.table);
    regs
}

/// Schemas of all registered records, sorted by table name.
pub fn registered_schemas() -> OrmResult<Vec<TableSchema>> {
    registered().into_iter().map(|r| (r.describe)()).collect()
}
