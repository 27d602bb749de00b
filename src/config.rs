use serde::Deserialize;

pub const DEFAULT_USER_IMAGE_URL: &str =
    "https://th.bing.com/th/id/OIP.R9HMSxN_IRyxw9-iE1usugAAAA?rs=1&pid=ImgDetMain";

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// S3-compatible bucket that holds uploaded recipe and avatar images.
#[derive(Debug, Clone, Deserialize)]
pub struct ImageStoreConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    pub public_base_url: String,
    pub folder: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub images: ImageStoreConfig,
    pub default_user_image_url: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "mealshare".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "mealshare-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(3 * 60),
        };

        let endpoint = std::env::var("S3_ENDPOINT")?;
        let bucket = std::env::var("S3_BUCKET")?;
        let public_base_url = std::env::var("IMAGE_PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("{}/{}", endpoint.trim_end_matches('/'), bucket));
        let images = ImageStoreConfig {
            access_key: std::env::var("S3_ACCESS_KEY")?,
            secret_key: std::env::var("S3_SECRET_KEY")?,
            region: std::env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".into()),
            folder: std::env::var("IMAGE_FOLDER").unwrap_or_else(|_| "meals-app".into()),
            public_base_url,
            endpoint,
            bucket,
        };

        let default_user_image_url = std::env::var("DEFAULT_USER_IMAGE_URL")
            .unwrap_or_else(|_| DEFAULT_USER_IMAGE_URL.into());

        Ok(Self {
            database_url,
            jwt,
            images,
            default_user_image_url,
        })
    }
}
