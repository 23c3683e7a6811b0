// Re-export the Database struct and other public items
mod advisory;
pub mod core;
mod schema;

pub use self::core::Database;
pub use self::core::DbConstraintErrorExt;
