/// REST backend client and the game seam used by the services.
pub mod backend;
/// Key-value store persisted to a JSON file.
pub mod file_store;
/// Guest statistics accumulator.
pub mod guest_stats;
/// Mirror of the signed-in user's per-level stats.
pub mod level_stats;
/// Volatile key-value store.
pub mod memory_store;
/// Credentials and instrument choices.
pub mod session;
/// Storage abstraction shared by the local stores.
pub mod storage;
