pub mod errors;
pub mod runtime;
pub mod storage;
