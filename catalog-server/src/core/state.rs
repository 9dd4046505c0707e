use sqlx::SqlitePool;

use crate::core::Config;
use crate::db::DbService;

/// 服务器状态 - 持有所有共享资源
///
/// ServerState 是所有 handler 的 axum State。SqlitePool 内部是
/// Arc，Clone 成本极低。
///
/// # 使用示例
///
/// ```ignore
/// let pool = state.pool();
/// let category = category::find_by_id(pool, id).await?;
/// ```
#[derive(Clone, Debug)]
pub struct ServerState {
    /// 服务器配置
    pub config: Config,
    /// SQLite 连接池
    pub pool: SqlitePool,
}

impl ServerState {
    pub fn new(config: Config, pool: SqlitePool) -> Self {
        Self { config, pool }
    }

    /// 初始化服务器状态
    ///
    /// 按顺序初始化：
    /// 1. 工作目录 (确保存在)
    /// 2. 数据库 (work_dir/catalog.db, 自动迁移)
    pub async fn initialize(config: &Config) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&config.work_dir)?;

        let db = DbService::new(&config.database_path()).await?;

        Ok(Self::new(config.clone(), db.pool))
    }

    /// 获取连接池
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
