use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// Deployment
// ============================================================================

/// A deployment step that failed on the appliance.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("BIG-IP configuration out of sync. Cannot continue. All further operations aborted.")]
    OutOfSync,

    #[error("Failed checking sync status. Aborting all further operations.")]
    SyncStatus(#[source] tmsh::Error),

    #[error("Failed installing {label} `{name}` on remote")]
    Install {
        label: &'static str,
        name: String,
        #[source]
        source: tmsh::Error,
    },

    #[error("Failed verifying {object_type} `{name}` present on remote")]
    Verify {
        object_type: &'static str,
        name: String,
        #[source]
        source: tmsh::Error,
    },

    #[error("Failed to match certificate fingerprint in `{name}` on remote")]
    FingerprintMismatch { name: String },

    #[error("Failed to create profile `{profile}` on remote")]
    CreateProfile {
        profile: String,
        #[source]
        source: tmsh::Error,
    },

    #[error("Unexpected failure when trying to update the profile `{profile}` to use the new cert")]
    ModifyProfile {
        profile: String,
        #[source]
        source: tmsh::Error,
    },

    #[error("Failed creating an empty local file to overwrite `{remote}` with")]
    ScratchFile {
        remote: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed saving configuration on remote")]
    SaveConfig(#[source] tmsh::Error),

    #[error("Failed to sync to device group `{group}`")]
    Sync {
        group: String,
        #[source]
        source: tmsh::Error,
    },

    /// Anything other than the step's own command exiting non-zero
    #[error(transparent)]
    Remote(#[from] tmsh::Error),
}

// ============================================================================
// Certificate bundle
// ============================================================================

#[derive(Debug, Error)]
pub enum BundleError {
    #[error("Certificate bundle file not found: {}", .0.display())]
    MissingComponent(PathBuf),

    #[error("Could not read {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid PEM in {}: {reason}", .path.display())]
    Pem { path: PathBuf, reason: String },

    #[error("Invalid X.509 certificate in {}: {reason}", .path.display())]
    Certificate { path: PathBuf, reason: String },

    #[error("Certificate in {} has no subject common name", .0.display())]
    NoCommonName(PathBuf),

    #[error("Certificate in {} has an unrepresentable expiry date", .0.display())]
    InvalidExpiry(PathBuf),
}

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No target host given. Use --host, the HOST variable or `host` in the config file")]
    MissingHost,

    #[error("--profile-name and --profile-type must be given together")]
    IncompleteProfile,

    #[error("Staging directory `{0}` must be an absolute path on the appliance")]
    RelativeStagingDir(String),

    #[error("No certificate lineage given. Use --renewed-lineage or the RENEWED_LINEAGE variable")]
    MissingLineage,

    #[error("Could not read config file {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
