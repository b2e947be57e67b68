// Adapters layer: concrete implementations for external systems (http sources, local storage).

pub mod http;
pub mod storage;
