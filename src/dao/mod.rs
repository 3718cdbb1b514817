//! Persistence layer: entity models, the storage error type and the quest store backends.

/// Database model definitions.
pub mod models;
/// Typed queries over every game entity, with memory and MongoDB backends.
pub mod quest_store;
/// Storage abstraction layer for database operations.
pub mod storage;
