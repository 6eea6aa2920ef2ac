use crate::api;
use crate::api::handlers::auth::AuthConfig;
use crate::cli::actions::Action;
use anyhow::Result;

/// Handle the server action
pub async fn handle(action: Action) -> Result<()> {
    match action {
        Action::Server {
            port,
            dsn,
            redis_url,
            jwt_secret,
            frontend_url,
            access_token_ttl,
            refresh_token_ttl,
            lockout_threshold,
            lockout_duration,
        } => {
            let auth_config = AuthConfig::new(jwt_secret, frontend_url)
                .with_access_token_ttl_seconds(access_token_ttl)
                .with_refresh_token_ttl_seconds(refresh_token_ttl)
                .with_lockout_threshold(lockout_threshold)
                .with_lockout_duration_seconds(lockout_duration);

            api::new(port, dsn, redis_url, auth_config).await?;
        }
    }

    Ok(())
}
