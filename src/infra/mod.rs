use crate::config::environment::AppConfig;
use mongodb::Client as MongoClient;
use mongodb::Database;
use redis::Client as RedisClient;

pub const RULES_COLLECTION: &str = "rules";
pub const SUBMISSIONS_COLLECTION: &str = "submissions";
pub const VIOLATIONS_COLLECTION: &str = "violations";
pub const CONTENT_CHUNKS_COLLECTION: &str = "content_chunks";
pub const AUDIT_LOG_COLLECTION: &str = "audit_log";

pub const SCREEN_CACHE_PREFIX: &str = "screen:rule:";
pub const SCREEN_CACHE_TTL_SECONDS: u64 = 300;

#[derive(Debug, Clone)]
pub struct InfraClients {
    pub mongo_db: Database,
    pub redis: RedisClient,
}

pub async fn init_infra(config: &AppConfig) -> Result<Option<InfraClients>, String> {
    let Some(mongo_url) = &config.mongodb_url else {
        return Ok(None);
    };
    let Some(mongo_db_name) = &config.mongodb_database else {
        return Ok(None);
    };
    let Some(redis_url) = &config.redis_url else {
        return Ok(None);
    };

    let mongo_client = MongoClient::with_uri_str(mongo_url)
        .await
        .map_err(|e| format!("mongodb client init failed: {e}"))?;
    let mongo_db = mongo_client.database(mongo_db_name);

    let redis =
        RedisClient::open(redis_url.clone()).map_err(|e| format!("redis client init failed: {e}"))?;
    Ok(Some(InfraClients { mongo_db, redis }))
}
