use crate::{
    configs::FileContent,
    error::{AppError, AppResult},
    types::ParsedCertificate,
};
use rustls_pki_types::CertificateDer;
use std::{collections::HashSet, io::Cursor};
use x509_certificate::X509Certificate;

/// Answers whether a subject name is a recognized trust anchor.
pub trait TrustAnchorChecker {
    fn is_trust_anchor(&self, subject: &str) -> bool;
}

/// Subject names of the trusted roots, rendered the same way as the
/// subjects and issuers of the inspected chain.
#[derive(Clone, Debug, Default)]
pub struct RootStore {
    subjects: HashSet<String>,
}

impl RootStore {
    pub fn from_subjects<I, S>(subjects: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            subjects: subjects.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_pem(data: &[u8]) -> AppResult<Self> {
        let mut buf = Cursor::new(data);
        let certs = rustls_pemfile::certs(&mut buf).collect::<std::io::Result<Vec<_>>>()?;
        Ok(Self::from_der_certificates(certs))
    }

    pub fn from_native() -> AppResult<Self> {
        let certs = rustls_native_certs::load_native_certs()?;
        Ok(Self::from_der_certificates(certs))
    }

    pub async fn load(source: &FileContent) -> AppResult<Self> {
        let data = source.load_file().await?;
        let store = Self::from_pem(&data)?;
        debug!(
            "Loaded {} trusted roots from {}",
            store.len(),
            source.describe()
        );
        Ok(store)
    }

    /// Undecodable roots are skipped with a warning.
    fn from_der_certificates<'a>(certs: impl IntoIterator<Item = CertificateDer<'a>>) -> Self {
        let mut subjects = HashSet::new();
        for der in certs {
            let subject = X509Certificate::from_der(der.as_ref())
                .map_err(AppError::from)
                .and_then(|cert| ParsedCertificate(cert).subject_dn());
            match subject {
                Ok(subject) => {
                    subjects.insert(subject);
                }
                Err(e) => warn!("Skipping undecodable trusted root: {}", e),
            }
        }
        Self { subjects }
    }

    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }
}

impl TrustAnchorChecker for RootStore {
    fn is_trust_anchor(&self, subject: &str) -> bool {
        self.subjects.contains(subject)
    }
}
