//! Cross-crate end-to-end scenarios (§8): nothing here is unit-testable
//! inside a single crate, because the point is exercising the worker's HTTP
//! surface the way the tool adapter and the CLI actually call it.
