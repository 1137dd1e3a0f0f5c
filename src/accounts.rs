use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("no accounts configured")]
    NoAccounts,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Invidious,
    Piped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AppCapabilities {
    pub supports_subscriptions: bool,
    pub supports_trending_categories: bool,
}

impl Backend {
    pub fn capabilities(&self) -> AppCapabilities {
        match self {
            Backend::Invidious => AppCapabilities {
                supports_subscriptions: true,
                supports_trending_categories: true,
            },
            Backend::Piped => AppCapabilities {
                supports_subscriptions: true,
                supports_trending_categories: false,
            },
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Backend::Invidious => "Invidious",
            Backend::Piped => "Piped",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub name: String,
    #[serde(default)]
    pub backend: Backend,
    pub url: String,
    /// Invidious `SID` cookie or Piped auth token.
    #[serde(default)]
    pub token: Option<String>,
}

impl Account {
    pub fn signed_in(&self) -> bool {
        self.token
            .as_deref()
            .map(|token| !token.trim().is_empty())
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccountState {
    pub app: AppCapabilities,
    pub signed_in: bool,
}

pub struct Manager {
    active: Account,
}

impl Manager {
    pub fn new(mut accounts: Vec<Account>, active_name: &str) -> Result<Self> {
        if accounts.is_empty() {
            return Err(AccountError::NoAccounts.into());
        }
        let idx = accounts
            .iter()
            .position(|account| account.name == active_name)
            .unwrap_or_else(|| {
                if !active_name.is_empty() {
                    log::warn!("accounts: {active_name} not configured, using {}", accounts[0].name);
                }
                0
            });
        Ok(Self {
            active: accounts.swap_remove(idx),
        })
    }

    pub fn active(&self) -> &Account {
        &self.active
    }

    pub fn state(&self) -> AccountState {
        AccountState {
            app: self.active.backend.capabilities(),
            signed_in: self.active.signed_in(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(name: &str, backend: Backend, token: Option<&str>) -> Account {
        Account {
            name: name.into(),
            backend,
            url: format!("https://{name}.example"),
            token: token.map(str::to_string),
        }
    }

    #[test]
    fn piped_lacks_trending_categories() {
        let caps = Backend::Piped.capabilities();
        assert!(caps.supports_subscriptions);
        assert!(!caps.supports_trending_categories);
        assert!(Backend::Invidious.capabilities().supports_trending_categories);
    }

    #[test]
    fn blank_token_is_not_signed_in() {
        assert!(!account("a", Backend::Invidious, Some("  ")).signed_in());
        assert!(!account("a", Backend::Invidious, None).signed_in());
        assert!(account("a", Backend::Invidious, Some("sid")).signed_in());
    }

    #[test]
    fn state_follows_named_account() {
        let accounts = vec![
            account("inv", Backend::Invidious, None),
            account("pip", Backend::Piped, Some("tok")),
        ];
        let manager = Manager::new(accounts.clone(), "inv").unwrap();
        assert_eq!(manager.active().name, "inv");
        assert!(!manager.state().signed_in);

        let manager = Manager::new(accounts, "pip").unwrap();
        let state = manager.state();
        assert!(state.signed_in);
        assert!(!state.app.supports_trending_categories);
    }

    #[test]
    fn unknown_name_falls_back_to_first() {
        let manager = Manager::new(
            vec![
                account("inv", Backend::Invidious, None),
                account("pip", Backend::Piped, Some("tok")),
            ],
            "missing",
        )
        .unwrap();
        assert_eq!(manager.active().name, "inv");
    }

    #[test]
    fn empty_account_list_is_rejected() {
        assert!(Manager::new(Vec::new(), "").is_err());
    }
}
