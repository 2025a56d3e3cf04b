//! tmsh protocol for each deployment step.
//!
//! Every step catches only its own command exiting non-zero and turns that
//! into a step-specific [`DeployError`]. Transport problems pass through as
//! [`DeployError::Remote`].

use std::sync::LazyLock;

use log::{debug, info};
use regex::Regex;
use tempfile::NamedTempFile;
use tmsh::{Channel, CommandOutput};

use super::Artifact;
use crate::config::Profile;
use crate::error::DeployError;

static IN_SYNC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)^Status.*In Sync$").expect("Invalid sync status regex"));

fn run(channel: &mut dyn Channel, command: &str) -> tmsh::Result<CommandOutput> {
    debug!("`{command}`");
    channel.run(command)
}

/// Map the step's own command failure with `wrap`, pass anything else through.
fn step_failure(err: tmsh::Error, wrap: impl FnOnce(tmsh::Error) -> DeployError) -> DeployError {
    if err.is_command_failure() {
        wrap(err)
    } else {
        DeployError::Remote(err)
    }
}

pub fn verify_sync(channel: &mut dyn Channel) -> Result<(), DeployError> {
    info!("Checking sync status on remote...");
    let output = run(channel, "show /cm sync-status")
        .map_err(|e| step_failure(e, DeployError::SyncStatus))?;

    if IN_SYNC.is_match(&output.stdout_str()) {
        Ok(())
    } else {
        Err(DeployError::OutOfSync)
    }
}

pub fn upload(channel: &mut dyn Channel, artifact: &Artifact) -> Result<(), DeployError> {
    info!(
        "Putting {} `{}` over scp to `{}`",
        artifact.label.as_str(),
        artifact.local_path.display(),
        artifact.remote_path
    );
    channel.put(&artifact.local_path, &artifact.remote_path)?;
    Ok(())
}

pub fn install(
    channel: &mut dyn Channel,
    artifact: &Artifact,
    name: &str,
) -> Result<(), DeployError> {
    let object_type = artifact.object_type();
    info!("Installing {object_type}");
    let command = format!(
        "install /sys crypto {object_type} {name} from-local-file {}",
        artifact.remote_path
    );

    run(channel, &command).map_err(|e| {
        step_failure(e, |source| DeployError::Install {
            label: artifact.label.as_str(),
            name: name.to_string(),
            source,
        })
    })?;
    Ok(())
}

/// Check the object exists and, when a fingerprint is given, that the
/// listing shows it.
pub fn verify_installed(
    channel: &mut dyn Channel,
    artifact: &Artifact,
    name: &str,
    fingerprint: Option<&str>,
) -> Result<(), DeployError> {
    let object_type = artifact.object_type();
    let command = format!("list /sys crypto {object_type} {name}");

    let output = run(channel, &command).map_err(|e| {
        step_failure(e, |source| DeployError::Verify {
            object_type,
            name: name.to_string(),
            source,
        })
    })?;

    let Some(fingerprint) = fingerprint else {
        return Ok(());
    };
    if !output.stdout_str().contains(fingerprint) {
        debug!("Expected `{fingerprint}` in listing of `{name}`");
        return Err(DeployError::FingerprintMismatch {
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Overwrite the staged copy with an empty file. The operating account
/// cannot delete files on the appliance.
pub fn zero(channel: &mut dyn Channel, artifact: &Artifact) -> Result<(), DeployError> {
    let empty = NamedTempFile::new().map_err(|source| DeployError::ScratchFile {
        remote: artifact.remote_path.clone(),
        source,
    })?;
    info!(
        "Putting empty file `{}` to remote `{}` over scp...",
        empty.path().display(),
        artifact.remote_path
    );
    channel.put(empty.path(), &artifact.remote_path)?;
    Ok(())
}

pub fn save_config(channel: &mut dyn Channel) -> Result<(), DeployError> {
    info!("Saving configuration on remote");
    run(channel, "save /sys config").map_err(|e| step_failure(e, DeployError::SaveConfig))?;
    Ok(())
}

/// Modify the profile if it exists, otherwise create it.
pub fn manage_profile(
    channel: &mut dyn Channel,
    profile: &Profile,
    name: &str,
) -> Result<(), DeployError> {
    info!("Checking for existing profile on BIG-IP..");
    // tmsh exits non-zero when the object does not exist
    let list = format!("list /ltm profile {} {}", profile.kind, profile.name);
    let exists = match run(channel, &list) {
        Ok(_) => true,
        Err(e) if e.is_command_failure() => false,
        Err(e) => return Err(DeployError::Remote(e)),
    };

    let bindings = format!("{} {} cert {name} key {name}", profile.kind, profile.name);
    if exists {
        run(channel, &format!("modify /ltm profile {bindings}")).map_err(|e| {
            step_failure(e, |source| DeployError::ModifyProfile {
                profile: profile.name.clone(),
                source,
            })
        })?;
    } else {
        run(channel, &format!("create /ltm profile {bindings}")).map_err(|e| {
            step_failure(e, |source| DeployError::CreateProfile {
                profile: profile.name.clone(),
                source,
            })
        })?;
    }
    Ok(())
}

pub fn sync(channel: &mut dyn Channel, group: &str) -> Result<(), DeployError> {
    info!("Synchronizing to device group `{group}`");
    run(channel, &format!("run /cm config-sync to-group {group}")).map_err(|e| {
        step_failure(e, |source| DeployError::Sync {
            group: group.to_string(),
            source,
        })
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::fake::FakeChannel;
    use super::*;
    use crate::bundle::ComponentLabel;
    use std::path::PathBuf;

    const NAME: &str = "test_common_name.2099-01-01T00:00:00";
    const FINGERPRINT: &str = "SHA256/44:D6:7E:66:11:B4:16:8C:5A:FD:36:F1:24:8E:18:30:60:5F:98:47:7C:1C:B3:1B:9F:76:74:8F:A5:62:9D:92";

    fn artifact(label: ComponentLabel) -> Artifact {
        Artifact {
            label,
            local_path: PathBuf::from("/etc/letsencrypt/live/example.com").join(label.file_name()),
            remote_path: format!("/var/tmp/{}", label.file_name()),
        }
    }

    fn profile() -> Profile {
        Profile {
            name: "web_clientssl".to_string(),
            kind: "client-ssl".to_string(),
        }
    }

    #[test]
    fn test_verify_sync_in_sync() {
        let mut channel = FakeChannel::new().respond(
            "show /cm sync-status",
            "CM::Sync Status\nColor   green\nStatus  In Sync\nMode    high-availability\n",
        );
        verify_sync(&mut channel).unwrap();
    }

    #[test]
    fn test_verify_sync_case_insensitive() {
        let mut channel = FakeChannel::new().respond("show /cm sync-status", "status: in sync\n");
        verify_sync(&mut channel).unwrap();
    }

    #[test]
    fn test_verify_sync_bad_status() {
        let mut channel = FakeChannel::new().respond("show /cm sync-status", "Status: Bad\n");
        let err = verify_sync(&mut channel).unwrap_err();
        assert!(matches!(err, DeployError::OutOfSync));
    }

    #[test]
    fn test_verify_sync_command_failure() {
        let mut channel = FakeChannel::new().fail("show /cm sync-status");
        let err = verify_sync(&mut channel).unwrap_err();
        assert!(matches!(err, DeployError::SyncStatus(_)));
        assert_eq!(
            err.to_string(),
            "Failed checking sync status. Aborting all further operations."
        );
    }

    #[test]
    fn test_install_cert_labels() {
        for label in [ComponentLabel::Cert, ComponentLabel::Fullchain] {
            let mut channel = FakeChannel::new();
            install(&mut channel, &artifact(label), NAME).unwrap();
            assert_eq!(
                channel.commands,
                vec![format!(
                    "install /sys crypto cert {NAME} from-local-file /var/tmp/{}",
                    label.file_name()
                )]
            );
        }
    }

    #[test]
    fn test_install_key() {
        let mut channel = FakeChannel::new();
        install(&mut channel, &artifact(ComponentLabel::Key), NAME).unwrap();
        assert_eq!(
            channel.commands,
            vec![format!(
                "install /sys crypto key {NAME} from-local-file /var/tmp/privkey.pem"
            )]
        );
    }

    #[test]
    fn test_install_failure_names_artifact() {
        let mut channel = FakeChannel::new().fail(&format!(
            "install /sys crypto cert {NAME} from-local-file /var/tmp/fullchain.pem"
        ));
        let err = install(&mut channel, &artifact(ComponentLabel::Fullchain), NAME).unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("Failed installing fullchain `{NAME}` on remote")
        );
    }

    #[test]
    fn test_verify_cert_fingerprint_present() {
        let mut channel = FakeChannel::new().respond(
            &format!("list /sys crypto cert {NAME}"),
            &format!("sys crypto cert {NAME} {{\n    fingerprint {FINGERPRINT}\n}}\n"),
        );
        let cert = artifact(ComponentLabel::Fullchain);
        verify_installed(&mut channel, &cert, NAME, Some(FINGERPRINT)).unwrap();
    }

    #[test]
    fn test_verify_cert_fingerprint_mismatch() {
        let mut channel = FakeChannel::new().respond(
            &format!("list /sys crypto cert {NAME}"),
            "sys crypto cert other {\n    fingerprint SHA256/00:11\n}\n",
        );
        let cert = artifact(ComponentLabel::Fullchain);
        let err = verify_installed(&mut channel, &cert, NAME, Some(FINGERPRINT)).unwrap_err();
        assert!(matches!(err, DeployError::FingerprintMismatch { .. }));
    }

    #[test]
    fn test_verify_key_presence_only() {
        let mut channel = FakeChannel::new().respond(&format!("list /sys crypto key {NAME}"), "");
        verify_installed(&mut channel, &artifact(ComponentLabel::Key), NAME, None).unwrap();
        assert_eq!(channel.commands, vec![format!("list /sys crypto key {NAME}")]);
    }

    #[test]
    fn test_verify_key_missing() {
        let mut channel = FakeChannel::new().fail(&format!("list /sys crypto key {NAME}"));
        let key = artifact(ComponentLabel::Key);
        let err = verify_installed(&mut channel, &key, NAME, None).unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("Failed verifying key `{NAME}` present on remote")
        );
    }

    #[test]
    fn test_upload_puts_to_staged_path() {
        let mut channel = FakeChannel::new();
        upload(&mut channel, &artifact(ComponentLabel::Key)).unwrap();

        assert_eq!(channel.transfers.len(), 1);
        assert_eq!(channel.transfers[0].remote, "/var/tmp/privkey.pem");
        assert_eq!(
            channel.transfers[0].local,
            PathBuf::from("/etc/letsencrypt/live/example.com/privkey.pem")
        );
    }

    #[test]
    fn test_upload_transfer_failure_passes_through() {
        let mut channel = FakeChannel::new().fail_transfers();
        let err = upload(&mut channel, &artifact(ComponentLabel::Fullchain)).unwrap_err();
        assert!(matches!(err, DeployError::Remote(e) if e.is_transfer_failure()));
    }

    #[test]
    fn test_zero_sends_empty_file() {
        let mut channel = FakeChannel::new();
        zero(&mut channel, &artifact(ComponentLabel::Fullchain)).unwrap();

        assert_eq!(channel.transfers.len(), 1);
        assert_eq!(channel.transfers[0].remote, "/var/tmp/fullchain.pem");
        assert_eq!(channel.transfers[0].size, 0);
        assert!(channel.commands.is_empty());
    }

    #[test]
    fn test_save_config() {
        let mut channel = FakeChannel::new();
        save_config(&mut channel).unwrap();
        assert_eq!(channel.commands, vec!["save /sys config"]);
    }

    #[test]
    fn test_manage_profile_creates_when_missing() {
        let mut channel = FakeChannel::new().fail("list /ltm profile client-ssl web_clientssl");
        manage_profile(&mut channel, &profile(), NAME).unwrap();

        assert_eq!(
            channel.commands,
            vec![
                "list /ltm profile client-ssl web_clientssl".to_string(),
                format!("create /ltm profile client-ssl web_clientssl cert {NAME} key {NAME}"),
            ]
        );
    }

    #[test]
    fn test_manage_profile_modifies_when_present() {
        let mut channel = FakeChannel::new();
        manage_profile(&mut channel, &profile(), NAME).unwrap();

        assert_eq!(
            channel.commands,
            vec![
                "list /ltm profile client-ssl web_clientssl".to_string(),
                format!("modify /ltm profile client-ssl web_clientssl cert {NAME} key {NAME}"),
            ]
        );
    }

    #[test]
    fn test_manage_profile_create_failure() {
        let mut channel = FakeChannel::new()
            .fail("list /ltm profile client-ssl web_clientssl")
            .fail(&format!(
                "create /ltm profile client-ssl web_clientssl cert {NAME} key {NAME}"
            ));
        let err = manage_profile(&mut channel, &profile(), NAME).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to create profile `web_clientssl` on remote"
        );
    }

    #[test]
    fn test_manage_profile_modify_failure() {
        let mut channel = FakeChannel::new().fail(&format!(
            "modify /ltm profile client-ssl web_clientssl cert {NAME} key {NAME}"
        ));
        let err = manage_profile(&mut channel, &profile(), NAME).unwrap_err();
        assert!(matches!(err, DeployError::ModifyProfile { .. }));
        assert_eq!(channel.commands.len(), 2);
    }

    #[test]
    fn test_manage_profile_transport_failure_is_not_a_missing_profile() {
        let mut channel = FakeChannel::new().disconnected();
        let err = manage_profile(&mut channel, &profile(), NAME).unwrap_err();
        assert!(matches!(err, DeployError::Remote(_)));
        assert!(channel.commands.iter().all(|c| !c.starts_with("create")));
    }

    #[test]
    fn test_sync() {
        let mut channel = FakeChannel::new();
        sync(&mut channel, "failover-group").unwrap();
        assert_eq!(
            channel.commands,
            vec!["run /cm config-sync to-group failover-group"]
        );

        let mut channel = FakeChannel::new().fail("run /cm config-sync to-group failover-group");
        let err = sync(&mut channel, "failover-group").unwrap_err();
        assert_eq!(err.to_string(), "Failed to sync to device group `failover-group`");
    }
}
