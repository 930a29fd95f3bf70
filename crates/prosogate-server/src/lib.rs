pub mod http;
pub mod worker;

pub use http::{router, AppState, AssessRequest};
pub use worker::SessionWorker;
