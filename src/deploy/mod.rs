//! Certificate deployment workflow.
//!
//! [`Deployer::workflow`] turns the configuration into a fixed sequence of
//! [`Step`]s without touching the network:
//!
//! ```text
//! [Verify Sync]                        sync group only
//! Put / Install / Verify   cert        fullchain.pem
//! Put / Install / Verify   key         privkey.pem
//! Zero out cert, Zero out key          overwrite staged copies
//! Save config
//! [Create/modify profile]              profile only
//! [Sync]                               sync group only
//! ```
//!
//! Each step runs against a [`Channel`] passed in at execution time.

mod steps;

#[cfg(test)]
pub mod fake;

use std::io::Write;
use std::path::PathBuf;

use log::{info, warn};
use tmsh::Channel;
use workflow::{Operation, RunSummary, Task, Workflow};

use crate::bundle::{AppliedCertificate, ComponentLabel};
use crate::config::{DeployConfig, Profile};
use crate::error::{BundleError, DeployError};

/// A bundle file and where it is staged on the appliance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub label: ComponentLabel,
    pub local_path: PathBuf,
    pub remote_path: String,
}

impl Artifact {
    /// tmsh crypto object type the artifact installs as.
    pub const fn object_type(&self) -> &'static str {
        self.label.object_type()
    }
}

/// One deployment step with everything it needs bound in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    VerifySync,
    Upload(Artifact),
    Install {
        artifact: Artifact,
        name: String,
    },
    /// Certificates carry the fingerprint the listing must show; keys are
    /// checked by name only.
    VerifyInstalled {
        artifact: Artifact,
        name: String,
        fingerprint: Option<String>,
    },
    Zero(Artifact),
    SaveConfig,
    ManageProfile {
        profile: Profile,
        name: String,
    },
    Sync {
        group: String,
    },
}

impl Operation for Step {
    type Context = dyn Channel;
    type Error = DeployError;

    fn run(&self, channel: &mut Self::Context) -> Result<(), DeployError> {
        match self {
            Self::VerifySync => steps::verify_sync(channel),
            Self::Upload(artifact) => steps::upload(channel, artifact),
            Self::Install { artifact, name } => steps::install(channel, artifact, name),
            Self::VerifyInstalled {
                artifact,
                name,
                fingerprint,
            } => steps::verify_installed(channel, artifact, name, fingerprint.as_deref()),
            Self::Zero(artifact) => steps::zero(channel, artifact),
            Self::SaveConfig => steps::save_config(channel),
            Self::ManageProfile { profile, name } => steps::manage_profile(channel, profile, name),
            Self::Sync { group } => steps::sync(channel, group),
        }
    }
}

/// Builds and runs the deployment workflow for one appliance.
#[derive(Debug, Clone)]
pub struct Deployer {
    host: String,
    certificate: AppliedCertificate,
    sync_group: Option<String>,
    profile: Option<Profile>,
    cert: Artifact,
    key: Artifact,
}

impl Deployer {
    /// Stage the certificate chain and key under `dest_dir`.
    pub fn new(
        host: impl Into<String>,
        dest_dir: &str,
        certificate: AppliedCertificate,
    ) -> Result<Self, BundleError> {
        let cert = artifact(&certificate, ComponentLabel::Fullchain, dest_dir)?;
        let key = artifact(&certificate, ComponentLabel::Key, dest_dir)?;

        Ok(Self {
            host: host.into(),
            certificate,
            sync_group: None,
            profile: None,
            cert,
            key,
        })
    }

    pub fn from_config(
        config: &DeployConfig,
        certificate: AppliedCertificate,
    ) -> Result<Self, BundleError> {
        Ok(Self::new(&config.host, &config.dest_temp_dir, certificate)?
            .with_sync_group(config.sync_group.clone())
            .with_profile(config.profile.clone()))
    }

    /// Verify sync before and synchronize to this device group after.
    pub fn with_sync_group(mut self, group: Option<String>) -> Self {
        self.sync_group = group;
        self
    }

    /// Create or modify this profile to use the new certificate.
    pub fn with_profile(mut self, profile: Option<Profile>) -> Self {
        self.profile = profile;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn certificate(&self) -> &AppliedCertificate {
        &self.certificate
    }

    /// The ordered steps for this configuration.
    pub fn workflow(&self) -> Workflow<Step> {
        let name = &self.certificate.name;
        let mut workflow = Workflow::new();

        if self.sync_group.is_some() {
            workflow.push(Task::named("Verify Sync", Step::VerifySync));
        }

        workflow.extend([
            Task::named("Put cert file to remote", Step::Upload(self.cert.clone())),
            Task::named(
                "Install cert",
                Step::Install {
                    artifact: self.cert.clone(),
                    name: name.clone(),
                },
            ),
            Task::named(
                "Verify cert installed",
                Step::VerifyInstalled {
                    artifact: self.cert.clone(),
                    name: name.clone(),
                    fingerprint: Some(self.certificate.fingerprint.clone()),
                },
            ),
            Task::named("Put key file to remote", Step::Upload(self.key.clone())),
            Task::named(
                "Install key",
                Step::Install {
                    artifact: self.key.clone(),
                    name: name.clone(),
                },
            ),
            Task::named(
                "Verify key installed",
                Step::VerifyInstalled {
                    artifact: self.key.clone(),
                    name: name.clone(),
                    fingerprint: None,
                },
            ),
            Task::named("Zero out cert file on remote", Step::Zero(self.cert.clone())),
            Task::named("Zero out key file on remote", Step::Zero(self.key.clone())),
            Task::named("Save config", Step::SaveConfig),
        ]);

        if let Some(profile) = &self.profile {
            workflow.push(Task::named(
                "Create/modify profile",
                Step::ManageProfile {
                    profile: profile.clone(),
                    name: name.clone(),
                },
            ));
        }

        if let Some(group) = &self.sync_group {
            workflow.push(Task::named(
                "Sync",
                Step::Sync {
                    group: group.clone(),
                },
            ));
        }

        workflow
    }

    /// Run the workflow, or list it when `dry_run` is set.
    pub fn deploy<W: Write + ?Sized>(
        &self,
        channel: &mut (dyn Channel + 'static),
        dry_run: bool,
        out: &mut W,
    ) -> Result<RunSummary, workflow::Error<DeployError>> {
        let workflow = self.workflow();
        if dry_run {
            warn!("In dry run mode. Will not run actual deployment tasks.");
        } else {
            info!(
                "Deploying `{}` to {} in {} steps",
                self.certificate.name,
                self.host,
                workflow.len()
            );
        }
        workflow.run(channel, dry_run, out)
    }
}

fn artifact(
    certificate: &AppliedCertificate,
    label: ComponentLabel,
    dest_dir: &str,
) -> Result<Artifact, BundleError> {
    let component = certificate.bundle.component(label).ok_or_else(|| {
        BundleError::MissingComponent(certificate.bundle.path.join(label.file_name()))
    })?;

    Ok(Artifact {
        label,
        local_path: component.path.clone(),
        remote_path: remote_join(dest_dir, &component.filename),
    })
}

/// Join POSIX paths: an absolute `file` replaces `dir`.
fn remote_join(dir: &str, file: &str) -> String {
    if file.starts_with('/') || dir.is_empty() {
        file.to_string()
    } else if dir.ends_with('/') {
        format!("{dir}{file}")
    } else {
        format!("{dir}/{file}")
    }
}
