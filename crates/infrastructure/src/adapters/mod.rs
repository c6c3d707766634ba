//! Runtime adapters: clock, timer and the HTTP backend.

mod reqwest_backend;
mod system_clock;
mod tokio_timer;

pub use reqwest_backend::ReqwestAuthBackend;
pub use system_clock::SystemClock;
pub use tokio_timer::TokioTimer;
