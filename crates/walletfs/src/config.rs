//! Engine configuration.
//!
//! Everything here has a default, so an empty JSON object is a valid config:
//!
//! ```
//! use walletfs::EngineConfig;
//!
//! let config: EngineConfig = serde_json::from_str(r#"{
//!     "limits": { "max_path_depth": 32 },
//!     "owner": { "wallet": "0xABC", "tethered": ["0xDEF"] }
//! }"#).unwrap();
//! assert_eq!(config.limits.max_path_depth, 32);
//! assert_eq!(config.resolve.home_token, "~");
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::fs::PathLimits;
use crate::identity::Identity;
use crate::logging_impl::LogConfig;
use crate::resolver::ResolveRules;

/// Configuration shared by every engine operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub resolve: ResolveRules,
    pub limits: PathLimits,
    pub log: LogConfig,
    pub owner: OwnerPolicy,
}

impl EngineConfig {
    /// Parse a JSON config document.
    pub fn from_json(text: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Which identities may use this node.
///
/// With no owner wallet configured every well-formed identity is served.
/// Otherwise only the owner and its tethered wallets are, compared ignoring
/// ASCII case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OwnerPolicy {
    pub wallet: Option<String>,
    pub tethered: Vec<String>,
}

impl OwnerPolicy {
    /// Policy serving only `wallet`.
    pub fn owned_by(wallet: impl Into<String>) -> Self {
        Self {
            wallet: Some(wallet.into()),
            tethered: Vec::new(),
        }
    }

    pub fn tether(mut self, wallet: impl Into<String>) -> Self {
        self.tethered.push(wallet.into());
        self
    }

    /// Fails with [`Error::Unauthorized`] when `identity` may not use this node.
    pub fn authorize(&self, identity: &Identity) -> Result<()> {
        let Some(owner) = self.wallet.as_deref().filter(|w| !w.trim().is_empty()) else {
            return Ok(());
        };
        let allowed = std::iter::once(owner)
            .chain(self.tethered.iter().map(String::as_str))
            .any(|w| identity.matches_segment(w.trim()));
        if allowed {
            Ok(())
        } else {
            Err(Error::Unauthorized(
                "identity is not the owner or a tethered wallet".into(),
            ))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_is_default() {
        let config = EngineConfig::from_json("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn open_node_serves_everyone() {
        let policy = OwnerPolicy::default();
        assert!(policy.authorize(&Identity::new("0xANY").unwrap()).is_ok());
    }

    #[test]
    fn owned_node_checks_owner_and_tethered() {
        let policy = OwnerPolicy::owned_by("0xABC").tether("0xDEF");
        assert!(policy.authorize(&Identity::new("0xabc").unwrap()).is_ok());
        assert!(policy.authorize(&Identity::new("0xDEF").unwrap()).is_ok());
        assert!(matches!(
            policy.authorize(&Identity::new("0x999").unwrap()),
            Err(Error::Unauthorized(_))
        ));
    }
}
