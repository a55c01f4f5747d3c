// SQL Front End

pub mod compile;
pub mod error;
pub mod parser;
pub mod plan;
pub mod session;

// Re-export key items for convenient access
pub use error::ParseError;
pub use error::ParseResult;
pub use parser::parse;
pub use parser::parse_one;
pub use plan::expr::Expression;
pub use plan::expr::Value;
pub use plan::node::LogicalPlan;
pub use session::Session;
