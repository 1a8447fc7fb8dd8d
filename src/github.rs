//! GitHub implementation of the repository lister
//!
//! One octocrab client is built per account from its personal token; every
//! listing call re-enumerates the account's repositories from the API.

use async_trait::async_trait;
use octocrab::models::Repository;
use octocrab::Octocrab;
use tracing::{debug, info, warn};

use crate::config::Account;
use crate::listing::{ListingError, RemoteRepository, RepositoryLister};

/// Repository lister backed by the GitHub API
#[derive(Debug, Default, Clone)]
pub struct GitHubLister;

impl GitHubLister {
    pub fn new() -> Self {
        Self
    }

    fn client_for(account: &Account) -> Result<Octocrab, ListingError> {
        Octocrab::builder()
            .personal_token(account.secret.clone())
            .build()
            .map_err(|e| ListingError::Transport {
                account: account.username.clone(),
                reason: e.into(),
            })
    }

    fn classify(account: &Account, error: octocrab::Error) -> ListingError {
        match &error {
            octocrab::Error::GitHub { source, .. }
                if matches!(source.status_code.as_u16(), 401 | 403) =>
            {
                ListingError::Auth {
                    account: account.username.clone(),
                    message: source.message.clone(),
                }
            }
            _ => ListingError::Transport {
                account: account.username.clone(),
                reason: error.into(),
            },
        }
    }

    fn to_remote(account: &Account, repo: Repository) -> Option<RemoteRepository> {
        let full_name = repo
            .full_name
            .clone()
            .unwrap_or_else(|| format!("{}/{}", account.username, repo.name));

        match &repo.clone_url {
            Some(url) => Some(RemoteRepository {
                full_name,
                clone_url: url.to_string(),
            }),
            None => {
                warn!("Repository {} has no clone URL, skipping", full_name);
                None
            }
        }
    }
}

#[async_trait]
impl RepositoryLister for GitHubLister {
    async fn list_repositories(
        &self,
        account: &Account,
    ) -> Result<Vec<RemoteRepository>, ListingError> {
        debug!("Fetching repositories for account: {}", account.username);

        let client = Self::client_for(account)?;

        let mut repositories = Vec::new();
        let mut page = 1u8;

        loop {
            let page_repos = client
                .current()
                .list_repos_for_authenticated_user()
                .per_page(100)
                .page(page)
                .send()
                .await
                .map_err(|e| Self::classify(account, e))?;

            let items = page_repos.items;
            if items.is_empty() {
                break;
            }

            repositories.extend(
                items
                    .into_iter()
                    .filter_map(|repo| Self::to_remote(account, repo)),
            );

            // GitHub API pagination limit for u8
            if page >= 255 {
                warn!(
                    "Reached maximum pagination limit (255 pages) for account: {}",
                    account.username
                );
                break;
            }
            page += 1;
        }

        info!(
            "Found {} repositories for account: {}",
            repositories.len(),
            account.username
        );
        Ok(repositories)
    }
}
