//! In-memory implementations for testing.
//!
//! Available behind the `test-utils` feature flag. These are minimal
//! implementations that prove the trait APIs are usable, and the
//! fixtures the workspace integration tests are built from.

mod counting_backend;
mod echo_adapter;
mod echo_agent;
mod failing_agent;
mod silent_agent;
mod sleepy_agent;
mod stub_context;

pub use counting_backend::CountingBackend;
pub use echo_adapter::EchoAdapter;
pub use echo_agent::EchoAgent;
pub use failing_agent::FailingAgent;
pub use silent_agent::SilentAgent;
pub use sleepy_agent::SleepyAgent;
pub use stub_context::StubContext;
