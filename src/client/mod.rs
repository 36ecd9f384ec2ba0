pub mod openai;

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use thiserror::Error;

pub use openai::OpenAiClient;

/// 外部模型调用错误 (全部归为传输层, 适配器内不重试)
#[derive(Error, Debug, Clone)]
pub enum ClientError {
    #[error("request timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("model API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("empty completion in model response")]
    EmptyResponse,
}

/// 提取客户端: 发送指令提示词 + 文档引用, 返回模型原始文本输出
#[async_trait]
pub trait ExtractionClient: Send + Sync {
    async fn extract(&self, prompt: &str, file_url: &str) -> Result<String, ClientError>;
}

/// 测试用确定性客户端: 按入队顺序吐出预设响应, 不触网
#[derive(Clone)]
pub struct MockClient {
    default_response: String,
    scripted: Arc<Mutex<VecDeque<Result<String, ClientError>>>>,
    call_count: Arc<Mutex<usize>>,
}

impl MockClient {
    /// 对所有调用返回固定响应
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: response.into(),
            scripted: Arc::new(Mutex::new(VecDeque::new())),
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    /// 对所有调用返回固定错误
    pub fn failing(error: ClientError) -> Self {
        let client = Self::new("");
        client.push_error(error);
        client
    }

    pub fn push_response(&self, response: impl Into<String>) {
        self.scripted.lock().unwrap().push_back(Ok(response.into()));
    }

    pub fn push_error(&self, error: ClientError) {
        self.scripted.lock().unwrap().push_back(Err(error));
    }

    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

#[async_trait]
impl ExtractionClient for MockClient {
    async fn extract(&self, _prompt: &str, _file_url: &str) -> Result<String, ClientError> {
        *self.call_count.lock().unwrap() += 1;

        let mut scripted = self.scripted.lock().unwrap();
        match scripted.pop_front() {
            Some(result) => {
                // 单条脚本视为固定应答, 循环复用
                if scripted.is_empty() {
                    scripted.push_back(result.clone());
                }
                result
            }
            None => Ok(self.default_response.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_returns_default_response() {
        let client = MockClient::new("{}");
        assert_eq!(client.extract("p", "doc-1").await.unwrap(), "{}");
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn mock_replays_scripted_error() {
        let client = MockClient::failing(ClientError::Timeout);
        assert!(matches!(
            client.extract("p", "doc-1").await,
            Err(ClientError::Timeout)
        ));
        // 固定应答可重复触发
        assert!(client.extract("p", "doc-1").await.is_err());
        assert_eq!(client.call_count(), 2);
    }
}
