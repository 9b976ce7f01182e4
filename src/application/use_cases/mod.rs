pub mod column_selection;
pub mod file_intake;
pub mod merge;
pub mod schema_unification;
