//! 欺诈评分 Provider 抽象层
//!
//! 统一的欺诈评分接口，根据配置自动选择实现：
//! 1. 配置了 api_url → RemoteFraudApi
//! 2. 未配置 → 禁用，始终返回 fail-open 默认值

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info};

use super::remote::RemoteFraudApi;
use crate::config::FraudConfig;

/// 欺诈评估结果
///
/// 纯值对象，不落库。Default 即 fail-open：零分、无标记。
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FraudAssessment {
    /// 0.0 ~ 1.0 的欺诈评分
    pub fraud_score: f64,
    pub is_suspicious: bool,
    pub is_fraudulent: bool,
    /// 评分依据说明
    pub reasons: Vec<String>,
}

/// 欺诈评分 trait
#[async_trait]
pub trait FraudCheck: Send + Sync {
    /// 评估一次点击
    ///
    /// 任何失败都返回 Default（fail-open），绝不向上传播错误
    async fn assess(
        &self,
        affiliate_link_id: i64,
        visitor_ip: &str,
        user_agent: Option<&str>,
    ) -> FraudAssessment;

    /// 获取 provider 名称（用于日志）
    fn name(&self) -> &'static str;
}

/// 统一欺诈评分入口
///
/// 启动时根据配置决定是否启用远端评分
pub struct FraudScreen {
    inner: Option<Arc<dyn FraudCheck>>,
}

impl FraudScreen {
    /// 根据 FraudConfig 初始化
    pub fn new(config: &FraudConfig) -> Self {
        let inner: Option<Arc<dyn FraudCheck>> = match config.api_url {
            Some(ref url) if !url.is_empty() => {
                let provider = RemoteFraudApi::new(url, config);
                info!("Fraud: initialized with {} provider", provider.name());
                Some(Arc::new(provider))
            }
            _ => {
                debug!("Fraud: no scorer URL configured, screening disabled");
                None
            }
        };
        Self { inner }
    }

    /// 评估一次点击；未配置时直接返回 fail-open 默认值
    pub async fn assess(
        &self,
        affiliate_link_id: i64,
        visitor_ip: &str,
        user_agent: Option<&str>,
    ) -> FraudAssessment {
        match self.inner {
            Some(ref provider) => {
                provider
                    .assess(affiliate_link_id, visitor_ip, user_agent)
                    .await
            }
            None => FraudAssessment::default(),
        }
    }

    /// 是否启用了远端评分
    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }
}

impl Clone for FraudScreen {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.as_ref().map(Arc::clone),
        }
    }
}
