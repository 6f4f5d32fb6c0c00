use crate::types::CertificateRecords;
use std::collections::HashMap;

/// "Who issued X" and "what did X issue" lookups over a record set.
///
/// Both maps hold record indices in ascending order, so the first usable
/// entry is always the lowest index.
#[derive(Clone, Debug)]
pub struct IssuerIndex<'a> {
    records: &'a CertificateRecords,
    by_subject: HashMap<&'a str, Vec<usize>>,
    by_issuer: HashMap<&'a str, Vec<usize>>,
}

impl<'a> IssuerIndex<'a> {
    pub fn new(records: &'a CertificateRecords) -> Self {
        let mut by_subject: HashMap<&str, Vec<usize>> = HashMap::new();
        let mut by_issuer: HashMap<&str, Vec<usize>> = HashMap::new();

        for record in records {
            by_subject
                .entry(record.subject.as_str())
                .or_default()
                .push(record.index);
            by_issuer
                .entry(record.issuer.as_str())
                .or_default()
                .push(record.index);
        }

        for (subject, indices) in by_subject.iter().filter(|(_, v)| v.len() > 1) {
            debug!("Ambiguous issuer {:?} shared by records {:?}", subject, indices);
        }
        for (issuer, indices) in by_issuer.iter().filter(|(_, v)| v.len() > 1) {
            debug!("Forked issuance from {:?} to records {:?}", issuer, indices);
        }

        Self {
            records,
            by_subject,
            by_issuer,
        }
    }

    pub fn records(&self) -> &'a CertificateRecords {
        self.records
    }

    /// Lowest-indexed other record whose subject equals the issuer of
    /// `index`. A record never issues itself.
    pub fn find_issuer(&self, index: usize) -> Option<usize> {
        let record = self.records.get(index)?;
        self.by_subject
            .get(record.issuer.as_str())?
            .iter()
            .copied()
            .find(|&candidate| candidate != index)
    }

    /// Every other record whose issuer equals the subject of `index`,
    /// in ascending index order.
    pub fn find_issued(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        self.records
            .get(index)
            .and_then(|record| self.by_issuer.get(record.subject.as_str()))
            .into_iter()
            .flatten()
            .copied()
            .filter(move |&child| child != index)
    }
}
