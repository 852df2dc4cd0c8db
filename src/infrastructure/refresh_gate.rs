use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use futures_util::future::{BoxFuture, FutureExt, Shared};

use super::auth::{AuthError, RefreshedAccess, TokenManager};
use crate::utils::token_digest;

type SharedRefresh = Shared<BoxFuture<'static, Result<RefreshedAccess, AuthError>>>;

/// 合并并发的刷新请求
///
/// 同一个刷新令牌同一时刻只有一次刷新在执行，其余请求等待并共享结果。
/// 每个账户只有一个有效的刷新令牌，所以按令牌合并等价于按账户合并。
#[derive(Default)]
pub struct RefreshGate {
    in_flight: Mutex<HashMap<String, SharedRefresh>>,
}

impl RefreshGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn refresh(
        &self,
        manager: Arc<TokenManager>,
        refresh_token: &str,
    ) -> Result<RefreshedAccess, AuthError> {
        let key = token_digest(refresh_token);

        let shared = {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
            match in_flight.get(&key) {
                Some(existing) => {
                    tracing::debug!("Joining in-flight token refresh");
                    existing.clone()
                }
                None => {
                    let token = refresh_token.to_string();
                    let fut = async move { manager.refresh(&token).await }
                        .boxed()
                        .shared();
                    in_flight.insert(key.clone(), fut.clone());
                    fut
                }
            }
        };

        let result = shared.clone().await;

        // 任何完成等待的请求都负责清理，避免发起者被取消后留下残留
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if in_flight
            .get(&key)
            .is_some_and(|current| current.ptr_eq(&shared))
        {
            in_flight.remove(&key);
        }

        result
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}
