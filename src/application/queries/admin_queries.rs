//! Admin Queries - 管理端查询

/// 最近日志查询
#[derive(Debug, Clone)]
pub struct RecentLogs {
    /// 期望条数，超出上限时按上限处理
    pub limit: Option<usize>,
    /// 请求携带的 Bearer token
    pub bearer_token: Option<String>,
}
