use std::path::PathBuf;

use clap::Parser;

use crate::config::{ProfileSettings, Settings};

#[derive(Parser, Debug)]
#[command(name = "bigip-deploy")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Deploy a certbot certificate to an F5 BIG-IP over ssh", long_about = None)]
#[command(after_help = "Examples:
  # Install the certificate named `<common name>.<expiry>`
  bigip-deploy --host bigip.domain.tld

  # Install, then synchronize the change to a device group
  bigip-deploy --host bigip.domain.tld --sync-group yoursyncgroup

  # Install and bind to a client-ssl profile, creating it if needed
  bigip-deploy --host bigip.domain.tld --profile-name yourprofile --profile-type client-ssl

  # Show the deployment tasks without running them
  bigip-deploy --host bigip.domain.tld --dry-run")]
pub struct Cli {
    /// BIG-IP host to target with changes (any ssh destination)
    #[arg(short = 'H', long, env = "HOST")]
    pub host: Option<String>,

    /// Temp path on the BIG-IP for uploads, zeroed out after install [default: /var/tmp]
    #[arg(short = 't', long, env = "DEST_TEMP_DIR")]
    pub dest_temp_dir: Option<String>,

    /// Name for the certificate objects [default: <common name>.<not after>]
    #[arg(short = 'c', long)]
    pub cert_name: Option<String>,

    /// Profile to create or modify to use the certificate
    #[arg(short = 'p', long, requires = "profile_type")]
    pub profile_name: Option<String>,

    /// Type of that profile, e.g. `client-ssl`
    #[arg(short = 'r', long, requires = "profile_name")]
    pub profile_type: Option<String>,

    /// Device group to check before and synchronize after deployment
    #[arg(short = 's', long)]
    pub sync_group: Option<String>,

    /// Report the workflow steps that would run without running them
    #[arg(short = 'd', long)]
    pub dry_run: bool,

    /// Certbot live directory holding the certificate bundle
    #[arg(short = 'l', long, env = "RENEWED_LINEAGE")]
    pub renewed_lineage: Option<PathBuf>,

    /// Extra ssh option (`-o`) for ssh and scp, repeatable
    #[arg(short = 'o', long = "ssh-option", value_name = "OPTION")]
    pub ssh_options: Vec<String>,

    /// Config file [default: ~/.config/bigip-deploy/config.toml]
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only print errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Command-line values as the highest-precedence settings layer.
    pub fn settings(&self) -> Settings {
        let profile = (self.profile_name.is_some() || self.profile_type.is_some()).then(|| {
            ProfileSettings {
                name: self.profile_name.clone(),
                kind: self.profile_type.clone(),
            }
        });

        Settings {
            host: self.host.clone(),
            dest_temp_dir: self.dest_temp_dir.clone(),
            cert_name: self.cert_name.clone(),
            sync_group: self.sync_group.clone(),
            ssh_options: (!self.ssh_options.is_empty()).then(|| self.ssh_options.clone()),
            profile,
        }
    }
}
