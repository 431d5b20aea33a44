use crate::auth::{AccessTokenIssuer, ConfirmationCodeIssuer};
use crate::config::Config;
use crate::db::Store;
use crate::mail::Mailer;

/// Everything a request handler needs, built once at startup.
#[derive(Clone)]
pub struct SharedState {
    pub config: Config,

    pub store: Store,

    pub mailer: Mailer,

    pub confirmation: ConfirmationCodeIssuer,

    pub access_tokens: AccessTokenIssuer,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_url,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let mailer = Mailer::from_config(&config.mail);
        let confirmation = ConfirmationCodeIssuer::new(
            &config.auth.token_secret,
            config.auth.confirmation_code_ttl_seconds,
        );
        let access_tokens =
            AccessTokenIssuer::new(&config.auth.token_secret, config.auth.access_token_ttl_hours);

        Ok(Self {
            config,
            store,
            mailer,
            confirmation,
            access_tokens,
        })
    }
}
