use anyhow::Context;
use drivemirror_core::{DriveClient, OAuthClient};

use crate::config::SyncConfig;
use crate::oauth_flow::OAuthFlow;
use crate::storage::{OAuthState, TokenStorage};
use crate::sync::driver::SyncDriver;
use crate::sync::state::{StateStore, SyncState};
use crate::token_provider::TokenProvider;

const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive.file";

/// One configured sync run: an authorized client, the loaded state, and
/// the driver wired together.
pub struct SyncRuntime {
    config: SyncConfig,
    driver: SyncDriver,
    state: SyncState,
}

impl SyncRuntime {
    pub async fn bootstrap(config: SyncConfig) -> anyhow::Result<Self> {
        anyhow::ensure!(
            config.local_folder.is_dir(),
            "local_folder {} is not a directory",
            config.local_folder.display()
        );

        let token = resolve_valid_token().await?;
        let client = DriveClient::new(token)?;
        let store = StateStore::new(&config.state_path);
        let state = store.load();
        let driver = SyncDriver::new(client, store).with_ignore_rules(config.ignore.clone());

        Ok(Self {
            config,
            driver,
            state,
        })
    }

    pub async fn run(mut self) -> anyhow::Result<()> {
        eprintln!(
            "[drivemirror] started: local_folder={}, root_folder_id={}",
            self.config.local_folder.display(),
            self.config.root_folder_id
        );
        self.driver
            .run(
                &mut self.state,
                &self.config.local_folder,
                &self.config.root_folder_id,
            )
            .await?;
        eprintln!("[drivemirror] sync finished");
        Ok(())
    }
}

/// Runs the interactive authorization flow and saves the resulting token,
/// replacing any previously saved one.
pub async fn login() -> anyhow::Result<()> {
    let storage = TokenStorage::new()?;
    authenticate_and_store(&storage).await?;
    Ok(())
}

pub fn logout() -> anyhow::Result<()> {
    let storage = TokenStorage::new()?;
    storage.delete_state()?;
    eprintln!("[drivemirror] saved token removed");
    Ok(())
}

async fn resolve_valid_token() -> anyhow::Result<String> {
    if let Ok(token) = std::env::var("DRIVEMIRROR_TOKEN") {
        return Ok(token);
    }

    let storage = TokenStorage::new().context("failed to initialize token storage")?;
    let state = match storage.get_state() {
        Ok(state) => state,
        Err(_) => authenticate_and_store(&storage).await?,
    };
    let oauth_client = oauth_client_from_env()?;
    let mut provider = TokenProvider::new(state, oauth_client);
    let token = provider
        .valid_access_token()
        .await
        .context("failed to obtain a valid access token")?;
    // Keep the refreshed expiry for the next run.
    storage.save_state(provider.state())?;
    Ok(token)
}

async fn authenticate_and_store(storage: &TokenStorage) -> anyhow::Result<OAuthState> {
    let client = oauth_client_from_env()?.context(
        "DRIVEMIRROR_CLIENT_ID and DRIVEMIRROR_CLIENT_SECRET are required for first-run authorization",
    )?;
    let flow = OAuthFlow::new(client, DRIVE_SCOPE);
    let token = flow.authenticate().await?;
    let state = OAuthState::from_oauth_token(&token);
    storage.save_state(&state)?;
    eprintln!("[drivemirror] authorization saved");
    Ok(state)
}

fn oauth_client_from_env() -> anyhow::Result<Option<OAuthClient>> {
    match (
        std::env::var("DRIVEMIRROR_CLIENT_ID"),
        std::env::var("DRIVEMIRROR_CLIENT_SECRET"),
    ) {
        (Ok(client_id), Ok(client_secret)) => {
            Ok(Some(OAuthClient::new(client_id, client_secret)?))
        }
        _ => Ok(None),
    }
}
