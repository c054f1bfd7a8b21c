//! Anonymous player identity.
//!
//! A random id plus a generated display name, stored next to the score
//! database so the same player keeps the same name between runs.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::app_dirs::AppDirs;
use crate::error::IdentityError;

const ADJECTIVES: [&str; 8] = [
    "Swift",
    "Lightning",
    "Rapid",
    "Quick",
    "Fast",
    "Speedy",
    "Turbo",
    "Blazing",
];
const NOUNS: [&str; 8] = [
    "Typer", "Fingers", "Keys", "Words", "Writer", "Coder", "Master", "Pro",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
    pub display_name: String,
}

impl Identity {
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            user_id: generate_user_id(rng),
            display_name: generate_username(rng),
        }
    }
}

/// 128 random bits as 32 lowercase hex characters
pub fn generate_user_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("{:032x}", rng.gen::<u128>())
}

/// `<Adjective><Noun><0..999>`, e.g. `TurboKeys42`
pub fn generate_username<R: Rng + ?Sized>(rng: &mut R) -> String {
    let adj = ADJECTIVES.choose(rng).copied().unwrap_or("Swift");
    let noun = NOUNS.choose(rng).copied().unwrap_or("Typer");
    let num = rng.gen_range(0..1000);
    format!("{adj}{noun}{num}")
}

/// Supplies the identity scores are recorded under
pub trait IdentityProvider: Send {
    fn provision(&self) -> Result<Identity, IdentityError>;
}

/// Identity persisted as JSON on the local filesystem
#[derive(Debug, Clone)]
pub struct LocalIdentityProvider {
    path: Option<PathBuf>,
    name_override: Option<String>,
}

impl LocalIdentityProvider {
    pub fn new() -> Self {
        Self {
            path: AppDirs::identity_path(),
            name_override: None,
        }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: Some(p.as_ref().to_path_buf()),
            name_override: None,
        }
    }

    /// Replace the stored display name on the next provision
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.name_override = Some(name.into());
        self
    }

    fn load(path: &Path) -> Result<Option<Identity>, IdentityError> {
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(path)?;
        match serde_json::from_slice::<Identity>(&bytes) {
            Ok(identity) if !identity.user_id.is_empty() => Ok(Some(identity)),
            Ok(_) => Ok(None),
            Err(e) => {
                log::warn!("regenerating identity, {} is malformed: {e}", path.display());
                Ok(None)
            }
        }
    }

    fn store(path: &Path, identity: &Identity) -> Result<(), IdentityError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_vec_pretty(identity)?)?;
        Ok(())
    }
}

impl Default for LocalIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityProvider for LocalIdentityProvider {
    fn provision(&self) -> Result<Identity, IdentityError> {
        let path = self.path.as_deref().ok_or(IdentityError::NoLocation)?;
        let existing = Self::load(path)?;

        let generated = existing.is_none();
        let mut identity = match existing {
            Some(identity) => identity,
            None => {
                let identity = Identity::generate(&mut rand::thread_rng());
                log::info!("created anonymous identity {}", identity.display_name);
                identity
            }
        };

        let renamed = match &self.name_override {
            Some(name) if *name != identity.display_name => {
                identity.display_name = name.clone();
                true
            }
            _ => false,
        };

        if generated || renamed {
            Self::store(path, &identity)?;
        }
        Ok(identity)
    }
}

/// Fixed identity, for tests and embedding
#[derive(Debug, Clone)]
pub struct StaticIdentityProvider {
    identity: Identity,
}

impl StaticIdentityProvider {
    pub fn new(user_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            identity: Identity {
                user_id: user_id.into(),
                display_name: display_name.into(),
            },
        }
    }
}

impl IdentityProvider for StaticIdentityProvider {
    fn provision(&self) -> Result<Identity, IdentityError> {
        Ok(self.identity.clone())
    }
}
