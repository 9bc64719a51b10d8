pub mod batch;
pub mod gate;
pub mod gateway;
pub mod rate_limit;
pub mod retry;

pub use batch::{parse_identifiers, BatchCoordinator};
pub use gate::{ConcurrencyGate, GatePermit};
pub use gateway::GatewayClient;
pub use rate_limit::RateLimiter;
pub use retry::RetryPolicy;
