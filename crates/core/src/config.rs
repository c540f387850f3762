use serde::Deserialize;

/// Process configuration, loaded from TOML and then overridden field-by-field
/// from the environment in `main.rs`, mirroring the teacher's
/// read-env/parse/override `async_main` pattern.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub crawl: CrawlConfig,
    pub worker: WorkerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CrawlConfig {
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    #[serde(default = "default_per_host_limit")]
    pub per_host_limit: usize,
    #[serde(default = "default_dns_cache_ttl")]
    pub dns_cache_ttl_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WorkerConfig {
    #[serde(default = "default_worker_id")]
    pub worker_id: String,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_search_id")]
    pub search_id: i64,
}

fn default_pool_size() -> u32 {
    100
}
fn default_max_depth() -> u32 {
    3
}
fn default_timeout() -> u64 {
    30
}
fn default_max_concurrent() -> usize {
    1000
}
fn default_per_host_limit() -> usize {
    50
}
fn default_dns_cache_ttl() -> u64 {
    300
}
fn default_poll_interval() -> u64 {
    5
}
fn default_search_id() -> i64 {
    1
}
fn default_worker_id() -> String {
    format!("worker-{}", std::process::id())
}

impl DatabaseConfig {
    /// MySQL connection URL, `sqlx::mysql::MySqlPoolOptions` ready.
    pub fn connection_url(&self) -> String {
        format!(
            "mysql://{}:{}@{}:{}/{}?charset=utf8mb4",
            self.user, self.password, self.host, self.port, self.name
        )
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                host: "localhost".to_string(),
                port: 3306,
                user: "root".to_string(),
                password: String::new(),
                name: "mailharvest".to_string(),
                pool_size: default_pool_size(),
            },
            crawl: CrawlConfig {
                max_depth: default_max_depth(),
                timeout_secs: default_timeout(),
                max_concurrent: default_max_concurrent(),
                per_host_limit: default_per_host_limit(),
                dns_cache_ttl_secs: default_dns_cache_ttl(),
            },
            worker: WorkerConfig {
                worker_id: default_worker_id(),
                poll_interval_secs: default_poll_interval(),
                search_id: default_search_id(),
            },
        }
    }
}
