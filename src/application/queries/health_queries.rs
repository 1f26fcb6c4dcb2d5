//! Health Queries - 上游健康检查

/// 检查各上游服务状态
#[derive(Debug, Clone)]
pub struct ServiceHealth;
