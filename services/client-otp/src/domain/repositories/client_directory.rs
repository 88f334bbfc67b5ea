//! 客户目录接口（只读）

use async_trait::async_trait;
use taller_errors::AppResult;

use crate::domain::client::{Cedula, ClientContact};

#[async_trait]
pub trait ClientDirectory: Send + Sync {
    /// 按证件号查找客户，不存在时返回 `Ok(None)`
    async fn find_by_cedula(&self, cedula: &Cedula) -> AppResult<Option<ClientContact>>;
}
