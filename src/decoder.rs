//! Turns raw certificate bytes into [`CertificateRecords`].

use crate::{
    error::{AppResult, ErrorReason},
    types::{CertificateRecord, CertificateRecords, ParsedCertificate},
};
use pem::Pem;
use x509_certificate::X509Certificate;

const CERTIFICATE_TAG: &str = "CERTIFICATE";

/// Decode every `CERTIFICATE` block of a PEM bundle, in bundle order.
/// Other block types (keys, CRLs) are skipped.
pub fn decode_pem_bundle(data: &[u8]) -> AppResult<CertificateRecords> {
    let pems = pem::parse_many(data)?;

    let mut records = Vec::with_capacity(pems.len());
    for pem in pems {
        if pem.tag() != CERTIFICATE_TAG {
            warn!("Skipping PEM block with tag: {}", pem.tag());
            continue;
        }
        records.push(decode_block(&pem)?);
    }

    finish(records)
}

/// Decode a DER chain as presented by a TLS peer.
pub fn decode_der_chain<I, D>(ders: I) -> AppResult<CertificateRecords>
where
    I: IntoIterator<Item = D>,
    D: AsRef<[u8]>,
{
    let records = ders
        .into_iter()
        .map(|der| decode_block(&Pem::new(CERTIFICATE_TAG, der.as_ref())))
        .collect::<AppResult<Vec<_>>>()?;

    finish(records)
}

fn decode_block(pem: &Pem) -> AppResult<CertificateRecord> {
    let der = pem.contents();
    let cert = ParsedCertificate(X509Certificate::from_der(der)?);
    let record = cert.to_record(der, pem::encode(pem))?;
    trace!("Decoded certificate: {}", record.subject);
    Ok(record)
}

fn finish(records: Vec<CertificateRecord>) -> AppResult<CertificateRecords> {
    if records.is_empty() {
        return Err(ErrorReason::NoCertificates.into());
    }
    Ok(records.into_iter().collect())
}
