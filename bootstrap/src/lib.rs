//! taller-bootstrap - 服务启动骨架
//!
//! 优雅关闭、健康检查与 metrics 端点

mod health;
mod metrics;
mod shutdown;

pub use health::*;
pub use metrics::*;
pub use shutdown::*;
