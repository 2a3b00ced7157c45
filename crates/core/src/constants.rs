//! Retention defaults and entity names.

/// Default number of records each store retains.
pub const DEFAULT_STORE_CAPACITY: usize = 1000;

/// Entity name used for value reports as `__typename` in stored and served entities.
pub const VALUE_REPORT_ENTITY: &str = "NewReportEntity";

/// Entity name used for tip fundings as `__typename` in stored and served entities.
pub const TIP_ADDED_ENTITY: &str = "TipAddedEntity";
