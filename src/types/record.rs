use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    ops::Index,
    slice::Iter,
};

/// One decoded certificate.
///
/// Subject and issuer are kept exactly as the decoder rendered them; the
/// issuance relation compares them byte for byte.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CertificateRecord {
    /// 1-based position in the source bundle.
    pub index: usize,
    pub subject: String,
    pub issuer: String,
    pub signature_algorithm: String,
    pub san_list: Vec<String>,
    pub raw_text: String,
}

impl CertificateRecord {
    /// A record with no index yet; [`CertificateRecords`] assigns it.
    pub fn new(subject: impl Into<String>, issuer: impl Into<String>) -> Self {
        Self {
            index: 0,
            subject: subject.into(),
            issuer: issuer.into(),
            signature_algorithm: String::new(),
            san_list: Vec::new(),
            raw_text: String::new(),
        }
    }

    pub fn with_signature_algorithm(mut self, algorithm: impl Into<String>) -> Self {
        self.signature_algorithm = algorithm.into();
        self
    }

    pub fn with_san_list<I, S>(mut self, sans: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.san_list = sans.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_raw_text(mut self, raw_text: impl Into<String>) -> Self {
        self.raw_text = raw_text.into();
        self
    }

    pub fn is_self_signed(&self) -> bool {
        self.subject == self.issuer
    }

    pub fn is_sha1_signed(&self) -> bool {
        is_sha1_algorithm(&self.signature_algorithm)
    }
}

impl Display for CertificateRecord {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "#{} {}", self.index, self.subject)
    }
}

/// Matches `sha1WithRSAEncryption`, `ecdsa-with-SHA1`, `dsaWithSHA1` and
/// the like.
pub fn is_sha1_algorithm(algorithm: &str) -> bool {
    let lower = algorithm.to_ascii_lowercase();
    lower.contains("sha1") || lower.contains("sha-1")
}

/// Ordered, read-only set of records built once per run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CertificateRecords {
    records: Vec<CertificateRecord>,
}

impl CertificateRecords {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Look up by 1-based index.
    pub fn get(&self, index: usize) -> Option<&CertificateRecord> {
        index.checked_sub(1).and_then(|i| self.records.get(i))
    }

    pub fn iter(&self) -> Iter<'_, CertificateRecord> {
        self.records.iter()
    }
}

impl FromIterator<CertificateRecord> for CertificateRecords {
    fn from_iter<T: IntoIterator<Item = CertificateRecord>>(iter: T) -> Self {
        let records = iter
            .into_iter()
            .enumerate()
            .map(|(i, mut record)| {
                record.index = i + 1;
                record
            })
            .collect();
        Self { records }
    }
}

impl Index<usize> for CertificateRecords {
    type Output = CertificateRecord;

    /// Panics when `index` is 0 or past the end, like slice indexing.
    fn index(&self, index: usize) -> &Self::Output {
        &self.records[index - 1]
    }
}

impl<'a> IntoIterator for &'a CertificateRecords {
    type Item = &'a CertificateRecord;
    type IntoIter = Iter<'a, CertificateRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
