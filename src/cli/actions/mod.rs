pub mod server;

use secrecy::SecretString;

#[derive(Debug)]
pub enum Action {
    Server {
        port: u16,
        dsn: String,
        redis_url: Option<String>,
        jwt_secret: SecretString,
        frontend_url: String,
        access_token_ttl: i64,
        refresh_token_ttl: i64,
        lockout_threshold: i32,
        lockout_duration: i64,
    },
}
