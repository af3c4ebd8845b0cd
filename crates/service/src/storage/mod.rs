pub mod counter_store;
pub mod registry;

pub use counter_store::CounterStore;
pub use registry::StoreRegistry;
