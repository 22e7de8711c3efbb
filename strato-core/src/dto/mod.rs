//! Request bodies for the Strato HTTP API
//!
//! DTOs are explicit structs with named optional fields; presence is
//! validated explicitly instead of through dynamic lookups.

pub mod stack;
