//! Certbot lineage loading.
//!
//! A lineage is the `live/<domain>` directory certbot maintains. Only
//! `cert.pem` is parsed; the other files are uploaded as they are.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime};
use x509_parser::certificate::X509Certificate;
use x509_parser::pem::parse_x509_pem;
use x509_parser::prelude::FromDer;

use crate::error::BundleError;
use crate::fingerprint::fingerprint;

/// What a bundle file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentLabel {
    Cert,
    Intermediates,
    Fullchain,
    Key,
}

impl ComponentLabel {
    pub const ALL: [Self; 4] = [Self::Cert, Self::Intermediates, Self::Fullchain, Self::Key];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cert => "cert",
            Self::Intermediates => "intermediates",
            Self::Fullchain => "fullchain",
            Self::Key => "key",
        }
    }

    /// File name inside a certbot lineage.
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Cert => "cert.pem",
            Self::Intermediates => "chain.pem",
            Self::Fullchain => "fullchain.pem",
            Self::Key => "privkey.pem",
        }
    }

    /// tmsh crypto object type. Leaf and chain are both installed as `cert`.
    pub const fn object_type(self) -> &'static str {
        match self {
            Self::Key => "key",
            Self::Cert | Self::Intermediates | Self::Fullchain => "cert",
        }
    }
}

/// One file of a bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateComponent {
    pub label: ComponentLabel,
    pub path: PathBuf,
    /// Name the file keeps in the staging directory
    pub filename: String,
}

impl CertificateComponent {
    fn in_lineage(dir: &Path, label: ComponentLabel) -> Self {
        Self {
            label,
            path: dir.join(label.file_name()),
            filename: label.file_name().to_string(),
        }
    }
}

/// Parsed certbot lineage.
#[derive(Debug, Clone)]
pub struct CertificateBundle {
    pub path: PathBuf,
    pub common_name: String,
    pub not_after: NaiveDateTime,
    pub components: Vec<CertificateComponent>,
    der: Vec<u8>,
}

impl CertificateBundle {
    /// Load a lineage directory. Every component file must exist.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, BundleError> {
        let dir = dir.as_ref();

        let components: Vec<CertificateComponent> = ComponentLabel::ALL
            .iter()
            .map(|label| CertificateComponent::in_lineage(dir, *label))
            .collect();
        if let Some(missing) = components.iter().find(|c| !c.path.is_file()) {
            return Err(BundleError::MissingComponent(missing.path.clone()));
        }

        let cert_path = dir.join(ComponentLabel::Cert.file_name());
        let bytes = fs::read(&cert_path).map_err(|source| BundleError::Read {
            path: cert_path.clone(),
            source,
        })?;
        let (_, pem) = parse_x509_pem(&bytes).map_err(|e| BundleError::Pem {
            path: cert_path.clone(),
            reason: e.to_string(),
        })?;
        let (common_name, not_after) = {
            let (_, cert) =
                X509Certificate::from_der(&pem.contents).map_err(|e| BundleError::Certificate {
                    path: cert_path.clone(),
                    reason: e.to_string(),
                })?;

            let common_name = cert
                .subject()
                .iter_common_name()
                .next()
                .and_then(|attr| attr.as_str().ok())
                .map(str::to_string)
                .ok_or_else(|| BundleError::NoCommonName(cert_path.clone()))?;

            let not_after = DateTime::from_timestamp(cert.validity().not_after.timestamp(), 0)
                .map(|dt| dt.naive_utc())
                .ok_or_else(|| BundleError::InvalidExpiry(cert_path.clone()))?;

            (common_name, not_after)
        };

        log::debug!(
            "Loaded certificate `{common_name}` expiring {not_after} from {}",
            dir.display()
        );

        Ok(Self {
            path: dir.to_path_buf(),
            common_name,
            not_after,
            components,
            der: pem.contents,
        })
    }

    /// DER bytes of the leaf certificate.
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    pub fn component(&self, label: ComponentLabel) -> Option<&CertificateComponent> {
        self.components.iter().find(|c| c.label == label)
    }

    /// Expiry as `YYYY-MM-DDTHH:MM:SS`.
    pub fn expires(&self) -> String {
        self.not_after.format("%Y-%m-%dT%H:%M:%S").to_string()
    }
}

/// A bundle plus the object name and fingerprint used on the appliance.
#[derive(Debug, Clone)]
pub struct AppliedCertificate {
    pub bundle: CertificateBundle,
    pub name: String,
    pub fingerprint: String,
}

impl AppliedCertificate {
    /// Without an explicit name, the object is named `<common name>.<expiry>`.
    pub fn new(bundle: CertificateBundle, name: Option<String>) -> Self {
        let name = name.unwrap_or_else(|| {
            format!(
                "{}.{}",
                sanitize_name(&bundle.common_name),
                bundle.expires()
            )
        });
        let fingerprint = fingerprint(bundle.der());
        Self {
            bundle,
            name,
            fingerprint,
        }
    }
}

/// Replace everything outside `[A-Za-z0-9_.-]` with `_`.
pub fn sanitize_name(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
pub mod fixtures {
    use super::*;

    /// Self-signed, CN `test common name`, valid until 2099-01-01 00:00:00.
    pub const STATIC_TEST_CERT: &str = "-----BEGIN CERTIFICATE-----
MIIC2TCCAcGgAwIBAgIUD5bm1RAbxJ7dqTIlZL2GwF+B8FkwDQYJKoZIhvcNAQEL
BQAwGzEZMBcGA1UEAwwQdGVzdCBjb21tb24gbmFtZTAgFw0yMDAxMDEwMDAwMDBa
GA8yMDk5MDEwMTAwMDAwMFowGzEZMBcGA1UEAwwQdGVzdCBjb21tb24gbmFtZTCC
ASIwDQYJKoZIhvcNAQEBBQADggEPADCCAQoCggEBAMdnRQoxdW9vrQcXlH1MsDuA
Vi/mc/Tq6LJB6wKoaHLiT+aVa0Md1IQtlceL/Y9OMdjWiRR5xex2lsRZ0IdcMO+7
1txrG2u2NmZ6HSG8CyzMZmPbUClLYySwv7aLgj76Q3I3E/WVnatja9W1PQxSw0Sz
dDsC2L5jc4hiD/tCAR0PvGv8eiAnjYhIsKfU5Odcoe5dw4YGqmYRbcBYqRAisQgy
ekB1VXqsRlmqm+HQSwwon7rL0p4Nzaub7ZTM7qsc8dWs3RFZlWzFRrfrwo2Le7zh
gPZdul5rz9JUcBttOVqZVES8xKG3+6iLU6/RlGsWFyyaflxWjtU0GAJZWW/ho28C
AwEAAaMTMBEwDwYDVR0TAQH/BAUwAwEB/zANBgkqhkiG9w0BAQsFAAOCAQEAk5N/
c6nfPbCMzvs1SGzkTyN6gyY7dnZwuIPSbr0iN1+tWC3UJclGRPCMqD62/T+UjKYA
6VNyTkUqMmib0qbHo67kfidEGe+A1BV9v0MxdVaa8WAop7D6PtHMLNHiIQBYkc02
QvcY6OT8evsG6zbiR8+Tj4pMIBom0AHTt3HqSfoynEpyonwutVJxwQpAqs6ZxAGT
mgNgBLNbTLrwk5ScmaASmjl3Ua24QRT48oK16Gz/JjrRv1TgEl7NBX0fPuljjyhw
qSlAqJRr0ANRfarf+M62Cq9qV/JzKFDGlPvAY7aQemMaIXrqwEPuLRP3SvBL+NBm
ahH6YxA25wiuaynPpw==
-----END CERTIFICATE-----
";

    pub const STATIC_TEST_CERT_FINGERPRINT: &str = "SHA256/44:D6:7E:66:11:B4:16:8C:5A:FD:36:F1:24:8E:18:30:60:5F:98:47:7C:1C:B3:1B:9F:76:74:8F:A5:62:9D:92";

    /// Write a complete lineage using the static certificate.
    pub fn write_lineage(dir: &Path) {
        fs::write(dir.join("cert.pem"), STATIC_TEST_CERT).unwrap();
        fs::write(dir.join("chain.pem"), STATIC_TEST_CERT).unwrap();
        fs::write(dir.join("fullchain.pem"), STATIC_TEST_CERT).unwrap();
        fs::write(dir.join("privkey.pem"), "not a real key\n").unwrap();
    }

    pub fn applied_certificate(dir: &Path) -> AppliedCertificate {
        write_lineage(dir);
        AppliedCertificate::new(CertificateBundle::load(dir).unwrap(), None)
    }
}
