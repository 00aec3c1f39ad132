use crate::proxy::Backend;
use std::time::Instant;

#[derive(Clone)]
pub struct GatewayState {
    pub files: Backend,
    pub works: Backend,
    pub analysis: Backend,
    pub started_at: Instant,
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
