use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{debug, info, instrument, warn};

use crate::config::Partner;

/// Pluggable identity check. The shipped implementation compares against the
/// two configured partner pairs; it is a convenience gate for a two-person
/// app, not a security boundary, and nothing should treat it as one.
pub trait IdentityCheck {
    fn verify(&self, identity: &str, secret: &str) -> bool;
}

#[derive(Debug, Clone)]
pub struct PartnerPairs {
    pairs: Vec<(String, String)>,
}

impl PartnerPairs {
    pub fn new(partners: &[Partner]) -> Self {
        Self {
            pairs: partners
                .iter()
                .map(|partner| (partner.name.clone(), partner.secret.clone()))
                .collect(),
        }
    }
}

impl IdentityCheck for PartnerPairs {
    fn verify(&self, identity: &str, secret: &str) -> bool {
        self.pairs
            .iter()
            .any(|(name, pass)| name == identity && pass == secret)
    }
}

/// Remembers the signed-in identity across invocations: one string in one
/// file under the data directory.
#[derive(Debug)]
pub struct SessionFile {
    path: PathBuf,
    known: Vec<String>,
}

impl SessionFile {
    pub fn open(data_dir: &Path, known: Vec<String>) -> Self {
        let path = data_dir.join("session.data");
        debug!(path = %path.display(), "opened session file");
        Self { path, known }
    }

    /// The persisted identity, if any. A stored name that no longer matches
    /// a configured partner is ignored.
    #[instrument(skip(self))]
    pub fn current(&self) -> anyhow::Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed reading {}", self.path.display()))?;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }

        if !self.known.iter().any(|name| name == trimmed) {
            warn!(identity = %trimmed, "persisted identity is not a configured partner; ignoring");
            return Ok(None);
        }

        Ok(Some(trimmed.to_string()))
    }

    /// Returns true and persists the identity iff the pair passes the check.
    /// A failed attempt leaves the persisted identity untouched.
    #[instrument(skip(self, check, secret))]
    pub fn authenticate(
        &self,
        check: &dyn IdentityCheck,
        identity: &str,
        secret: &str,
    ) -> anyhow::Result<bool> {
        if !check.verify(identity, secret) {
            info!(identity, "sign-in rejected");
            return Ok(false);
        }

        fs::write(&self.path, identity)
            .with_context(|| format!("failed writing {}", self.path.display()))?;
        info!(identity, "signed in");
        Ok(true)
    }

    /// Clears the persisted identity unconditionally.
    #[instrument(skip(self))]
    pub fn logout(&self) -> anyhow::Result<()> {
        fs::write(&self.path, "")
            .with_context(|| format!("failed writing {}", self.path.display()))?;
        info!("signed out");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::{IdentityCheck, PartnerPairs, SessionFile};
    use crate::config::Partner;

    fn pairs() -> PartnerPairs {
        PartnerPairs::new(&[
            Partner {
                name: "Imran".to_string(),
                secret: "Imran".to_string(),
                timezone: "Europe/London".to_string(),
                location: "Manchester".to_string(),
            },
            Partner {
                name: "Ajsa".to_string(),
                secret: "Ajsa".to_string(),
                timezone: "America/Chicago".to_string(),
                location: "Texas".to_string(),
            },
        ])
    }

    #[test]
    fn verify_accepts_exactly_the_configured_pairs() {
        let check = pairs();
        assert!(check.verify("Imran", "Imran"));
        assert!(check.verify("Ajsa", "Ajsa"));
        assert!(!check.verify("Imran", "Ajsa"));
        assert!(!check.verify("imran", "Imran"));
        assert!(!check.verify("Someone", "Someone"));
    }

    #[test]
    fn authenticate_persists_only_on_success() {
        let temp = tempdir().expect("tempdir");
        let session = SessionFile::open(
            temp.path(),
            vec!["Imran".to_string(), "Ajsa".to_string()],
        );

        assert!(
            !session
                .authenticate(&pairs(), "Imran", "wrong")
                .expect("authenticate")
        );
        assert_eq!(session.current().expect("current"), None);

        assert!(
            session
                .authenticate(&pairs(), "Imran", "Imran")
                .expect("authenticate")
        );
        assert_eq!(
            session.current().expect("current"),
            Some("Imran".to_string())
        );

        // A later failed attempt must not clobber the signed-in identity.
        assert!(
            !session
                .authenticate(&pairs(), "Ajsa", "nope")
                .expect("authenticate")
        );
        assert_eq!(
            session.current().expect("current"),
            Some("Imran".to_string())
        );
    }

    #[test]
    fn logout_clears_unconditionally() {
        let temp = tempdir().expect("tempdir");
        let session = SessionFile::open(temp.path(), vec!["Imran".to_string()]);

        session.logout().expect("logout without session");
        assert_eq!(session.current().expect("current"), None);

        assert!(
            session
                .authenticate(&pairs(), "Imran", "Imran")
                .expect("authenticate")
        );
        session.logout().expect("logout");
        assert_eq!(session.current().expect("current"), None);
    }

    #[test]
    fn unknown_persisted_identity_is_ignored() {
        let temp = tempdir().expect("tempdir");
        std::fs::write(temp.path().join("session.data"), "Stranger").expect("seed file");

        let session = SessionFile::open(temp.path(), vec!["Imran".to_string()]);
        assert_eq!(session.current().expect("current"), None);
    }
}
