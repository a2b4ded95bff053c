//! Remote interfaces: the analysis backend and the hosted record store.
//!
//! Both are trait seams so the controller can run against scripted fakes
//! in tests.

pub mod backend;
pub mod store;

pub use backend::{AnalysisBackend, HttpBackend, NoopBackend};
pub use store::{ContentStore, StoreError, SupabaseStore};
