// ============================================================================
// Order Domain
// ============================================================================
//
// - Value objects (Order, OrderedProduct, OrderId, RequestedItem)
// - Errors (OrderError)
// - Aggregation (store rows <-> order aggregates)
// - Composer (cross-service write and read paths)
//
// ============================================================================

pub mod value_objects;
pub mod errors;
pub mod aggregate;
pub mod composer;

pub use value_objects::*;
pub use errors::*;
pub use aggregate::{flatten, fold_rows};
pub use composer::OrderComposer;
