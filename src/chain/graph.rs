use super::IssuerIndex;
use crate::{
    trust_store::TrustAnchorChecker,
    types::{CertificateRecord, CertificateRecords},
};

/// Trust status of a chain top.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChainTopStatus {
    /// Issued by a certificate outside the set.
    ExternalIssuer { issuer: String, issuer_trusted: bool },
    SelfSigned { trusted: bool },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainTop<'a> {
    pub record: &'a CertificateRecord,
    pub status: ChainTopStatus,
}

impl ChainTop<'_> {
    pub fn is_trusted(&self) -> bool {
        match self.status {
            ChainTopStatus::ExternalIssuer { issuer_trusted, .. } => issuer_trusted,
            ChainTopStatus::SelfSigned { trusted } => trusted,
        }
    }
}

/// The issuance forest of a record set.
#[derive(Clone, Debug)]
pub struct ChainGraph<'a> {
    index: IssuerIndex<'a>,
    tops: Vec<usize>,
}

impl<'a> ChainGraph<'a> {
    pub fn build(records: &'a CertificateRecords) -> Self {
        let index = IssuerIndex::new(records);
        let tops: Vec<usize> = records
            .iter()
            .map(|record| record.index)
            .filter(|&i| index.find_issuer(i).is_none())
            .collect();
        debug!("Found {} chain tops in {} records", tops.len(), records.len());

        Self { index, tops }
    }

    pub fn index(&self) -> &IssuerIndex<'a> {
        &self.index
    }

    pub fn records(&self) -> &'a CertificateRecords {
        self.index.records()
    }

    /// Indices of records with no issuer inside the set, ascending.
    pub fn chain_tops(&self) -> &[usize] {
        &self.tops
    }

    pub fn is_chain_top(&self, index: usize) -> bool {
        self.tops.binary_search(&index).is_ok()
    }

    /// Classify a chain top against the root store.
    pub fn classify<T>(&self, top: usize, roots: &T) -> Option<ChainTop<'a>>
    where
        T: TrustAnchorChecker + ?Sized,
    {
        if !self.is_chain_top(top) {
            return None;
        }
        let record = self.records().get(top)?;

        let status = if record.is_self_signed() {
            ChainTopStatus::SelfSigned {
                trusted: roots.is_trust_anchor(&record.subject),
            }
        } else {
            ChainTopStatus::ExternalIssuer {
                issuer: record.issuer.clone(),
                issuer_trusted: roots.is_trust_anchor(&record.issuer),
            }
        };

        Some(ChainTop { record, status })
    }
}
