use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Archive backend types
///
/// Selects where watermarked artifacts are archived. Defined in core because
/// configuration needs it before the storage crate is wired up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveBackend {
    Github,
    Local,
}

impl FromStr for ArchiveBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "github" => Ok(ArchiveBackend::Github),
            "local" => Ok(ArchiveBackend::Local),
            _ => Err(anyhow::anyhow!("Invalid archive backend: {}", s)),
        }
    }
}

impl Display for ArchiveBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ArchiveBackend::Github => write!(f, "github"),
            ArchiveBackend::Local => write!(f, "local"),
        }
    }
}
