// ============================================================================
// Domain Layer - Order composition
// ============================================================================
//
// Orders are owned here; accounts and products belong to other services and
// are reached through `crate::directory`.
//
// ============================================================================

pub mod order;
