// Logical Plan Module
//
// Plan nodes, expression nodes and the DDL value records they own.

// Re-export public components
pub mod ddl;
pub mod expr;
pub mod node;

// Export key types
pub use self::ddl::QualifiedName;
pub use self::expr::{Expression, SortField, Value, WindowDefinition};
pub use self::node::LogicalPlan;
