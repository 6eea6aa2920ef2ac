use crate::cli::actions::Action;
use anyhow::Result;
use secrecy::SecretString;

pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    Ok(Action::Server {
        port: matches.get_one::<u16>("port").copied().unwrap_or(8080),
        dsn: matches
            .get_one("dsn")
            .map(|s: &String| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --dsn"))?,
        redis_url: matches.get_one("redis-url").map(|s: &String| s.to_string()),
        jwt_secret: matches
            .get_one("jwt-secret")
            .map(|s: &String| SecretString::from(s.clone()))
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --jwt-secret"))?,
        frontend_url: matches
            .get_one("frontend-url")
            .map_or_else(|| "http://localhost:3000".to_string(), |s: &String| s.clone()),
        access_token_ttl: matches
            .get_one::<i64>("access-token-ttl")
            .copied()
            .unwrap_or(900),
        refresh_token_ttl: matches
            .get_one::<i64>("refresh-token-ttl")
            .copied()
            .unwrap_or(604_800),
        lockout_threshold: matches
            .get_one::<i32>("lockout-threshold")
            .copied()
            .unwrap_or(5),
        lockout_duration: matches
            .get_one::<i64>("lockout-duration")
            .copied()
            .unwrap_or(1800),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;

    #[test]
    fn handler_builds_server_action() {
        let matches = commands::new().get_matches_from(vec![
            "sesamo",
            "--dsn",
            "postgres://localhost/sesamo",
            "--jwt-secret",
            "secret",
            "--redis-url",
            "redis://localhost:6379",
        ]);

        let action = handler(&matches).expect("handler should succeed");
        let Action::Server {
            port,
            dsn,
            redis_url,
            access_token_ttl,
            lockout_threshold,
            ..
        } = action;
        assert_eq!(port, 8080);
        assert_eq!(dsn, "postgres://localhost/sesamo");
        assert_eq!(redis_url.as_deref(), Some("redis://localhost:6379"));
        assert_eq!(access_token_ttl, 900);
        assert_eq!(lockout_threshold, 5);
    }
}
