use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub rust_env: String,
    pub api_host: String,
    pub api_port: u16,
    pub mongodb_url: Option<String>,
    pub mongodb_database: Option<String>,
    pub redis_url: Option<String>,
    pub generation_api_url: Option<String>,
    pub generation_api_key: Option<String>,
    pub generation_model: String,
    pub generation_max_retries: u32,
    pub generation_timeout_seconds: u64,
    pub review_api_url: Option<String>,
    pub review_api_key: Option<String>,
    pub review_model: String,
    pub review_timeout_seconds: u64,
    pub similarity_threshold: f32,
    pub similarity_top_k: usize,
    pub semantic_trigger_threshold: f32,
    pub chunk_min_tokens: usize,
    pub chunk_max_tokens: usize,
    pub reference_docs_dir: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        load_dotenv_layers();
        Ok(Self {
            rust_env: read_var("RUST_ENV")?,
            api_host: read_var("API_HOST")?,
            api_port: read_var("API_PORT")?
                .parse::<u16>()
                .map_err(|e| format!("invalid API_PORT: {e}"))?,
            mongodb_url: env::var("MONGODB_URL").ok(),
            mongodb_database: env::var("MONGODB_DATABASE").ok(),
            redis_url: env::var("REDIS_URL").ok(),
            generation_api_url: env::var("GENERATION_API_URL").ok(),
            generation_api_key: env::var("GENERATION_API_KEY").ok(),
            generation_model: read_optional_string("GENERATION_MODEL", "gemini-1.5-flash"),
            generation_max_retries: read_optional_u32("GENERATION_MAX_RETRIES", 2)?,
            generation_timeout_seconds: read_optional_u64("GENERATION_TIMEOUT_SECONDS", 30)?,
            review_api_url: env::var("REVIEW_API_URL").ok(),
            review_api_key: env::var("REVIEW_API_KEY").ok(),
            review_model: read_optional_string("REVIEW_MODEL", "llama-3.1-70b-versatile"),
            review_timeout_seconds: read_optional_u64("REVIEW_TIMEOUT_SECONDS", 20)?,
            similarity_threshold: read_optional_f32("SIMILARITY_THRESHOLD", 0.85)?,
            similarity_top_k: read_optional_usize("SIMILARITY_TOP_K", 3)?,
            semantic_trigger_threshold: read_optional_f32("SEMANTIC_TRIGGER_THRESHOLD", 0.92)?,
            chunk_min_tokens: read_optional_usize("CHUNK_MIN_TOKENS", 300)?,
            chunk_max_tokens: read_optional_usize("CHUNK_MAX_TOKENS", 500)?,
            reference_docs_dir: read_optional_string("REFERENCE_DOCS_DIR", "reference_documents"),
        })
    }
}

fn read_var(key: &str) -> Result<String, String> {
    env::var(key).map_err(|_| format!("missing required env var: {key}"))
}

fn read_optional_string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn read_optional_u32(key: &str, default: u32) -> Result<u32, String> {
    match env::var(key) {
        Ok(v) => v.parse::<u32>().map_err(|e| format!("invalid {key}: {e}")),
        Err(_) => Ok(default),
    }
}

fn read_optional_u64(key: &str, default: u64) -> Result<u64, String> {
    match env::var(key) {
        Ok(v) => v.parse::<u64>().map_err(|e| format!("invalid {key}: {e}")),
        Err(_) => Ok(default),
    }
}

fn read_optional_usize(key: &str, default: usize) -> Result<usize, String> {
    match env::var(key) {
        Ok(v) => v.parse::<usize>().map_err(|e| format!("invalid {key}: {e}")),
        Err(_) => Ok(default),
    }
}

fn read_optional_f32(key: &str, default: f32) -> Result<f32, String> {
    match env::var(key) {
        Ok(v) => v.parse::<f32>().map_err(|e| format!("invalid {key}: {e}")),
        Err(_) => Ok(default),
    }
}

fn load_dotenv_layers() {
    for path in [".env", "../.env", "../../.env"] {
        let _ = dotenvy::from_path(path);
    }
}
