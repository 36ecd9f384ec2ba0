use crate::client::ClientError;
use thiserror::Error;
use uuid::Uuid;

/// 提取流水线错误分类
///
/// 编排器把所有失败折叠为这四类并返回给调度方,
/// 由调度方根据 `is_retryable` 决定重试, 核心自身不重试。
#[derive(Error, Debug)]
pub enum ProcessError {
    /// 发票不存在, 重试无意义
    #[error("invoice {0} not found")]
    NotFound(Uuid),

    /// 网络/超时/非 2xx
    #[error("model call failed: {0}")]
    Transport(String),

    /// 响应不是合法 JSON 对象
    #[error("invalid model response: {0}")]
    Parse(String),

    /// 事务写回失败 (未提交任何部分状态)
    #[error("persistence failed: {0}")]
    Persistence(String),
}

impl ProcessError {
    /// Parse 与 Transport 在重试策略上不做区分
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ProcessError::NotFound(_))
    }
}

impl From<ClientError> for ProcessError {
    fn from(e: ClientError) -> Self {
        ProcessError::Transport(e.to_string())
    }
}

impl From<sqlx::Error> for ProcessError {
    fn from(e: sqlx::Error) -> Self {
        ProcessError::Persistence(e.to_string())
    }
}
