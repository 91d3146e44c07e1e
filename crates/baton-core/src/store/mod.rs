pub mod state_store;

pub use state_store::StateStore;
pub(crate) use state_store::write_atomic;
