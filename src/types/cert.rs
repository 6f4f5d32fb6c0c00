use crate::{error::AppResult, types::CertificateRecord};
use std::{
    net::{Ipv4Addr, Ipv6Addr},
    ops::Deref,
};
use x509_certificate::X509Certificate;
use x509_parser::extensions::GeneralName;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedCertificate(pub X509Certificate);

impl ParsedCertificate {
    pub fn subject_dn(&self) -> AppResult<String> {
        Ok(self.0.subject_name().user_friendly_str()?)
    }

    pub fn issuer_dn(&self) -> AppResult<String> {
        Ok(self.0.issuer_name().user_friendly_str()?)
    }

    /// OpenSSL style name of the outer signature algorithm, or the dotted
    /// OID when it is not one we know.
    pub fn signature_algorithm_name(&self) -> String {
        let oid = self.0.as_ref().signature_algorithm.algorithm.to_string();
        signature_algorithm_long_name(&oid)
            .map(str::to_owned)
            .unwrap_or(oid)
    }

    /// `der` must be the encoding this certificate was decoded from.
    pub fn to_record(&self, der: &[u8], raw_text: String) -> AppResult<CertificateRecord> {
        Ok(CertificateRecord::new(self.subject_dn()?, self.issuer_dn()?)
            .with_signature_algorithm(self.signature_algorithm_name())
            .with_san_list(subject_alt_names(der))
            .with_raw_text(raw_text))
    }
}

impl Deref for ParsedCertificate {
    type Target = X509Certificate;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Rendered subjectAltName entries of a DER certificate. Empty when the
/// extension is absent or cannot be parsed.
pub fn subject_alt_names(der: &[u8]) -> Vec<String> {
    let cert = match x509_parser::parse_x509_certificate(der) {
        Ok((_, cert)) => cert,
        Err(e) => {
            warn!("Failed to parse certificate extensions: {}", e);
            return Vec::new();
        }
    };

    match cert.subject_alternative_name() {
        Ok(Some(san)) => san
            .value
            .general_names
            .iter()
            .filter_map(describe_general_name)
            .collect(),
        Ok(None) => Vec::new(),
        Err(e) => {
            warn!("Invalid subjectAltName extension: {}", e);
            Vec::new()
        }
    }
}

fn describe_general_name(name: &GeneralName<'_>) -> Option<String> {
    let rendered = match name {
        GeneralName::DNSName(val) => format!("DNS:{val}"),
        GeneralName::URI(val) => format!("URI:{val}"),
        GeneralName::RFC822Name(val) => format!("email:{val}"),
        GeneralName::IPAddress(bytes) => format!("IP Address:{}", format_ip(bytes)),
        GeneralName::DirectoryName(dir) => format!("DirName:{dir}"),
        GeneralName::RegisteredID(oid) => format!("Registered ID:{oid}"),
        other => {
            debug!("Skipping unsupported general name: {:?}", other);
            return None;
        }
    };
    Some(rendered)
}

fn format_ip(bytes: &[u8]) -> String {
    if let Ok(octets) = <[u8; 4]>::try_from(bytes) {
        Ipv4Addr::from(octets).to_string()
    } else if let Ok(octets) = <[u8; 16]>::try_from(bytes) {
        Ipv6Addr::from(octets).to_string()
    } else {
        bytes.iter().map(|b| format!("{b:02X}")).collect()
    }
}

fn signature_algorithm_long_name(oid: &str) -> Option<&'static str> {
    let name = match oid {
        "1.2.840.113549.1.1.2" => "md2WithRSAEncryption",
        "1.2.840.113549.1.1.4" => "md5WithRSAEncryption",
        "1.2.840.113549.1.1.5" => "sha1WithRSAEncryption",
        "1.2.840.113549.1.1.10" => "rsassaPss",
        "1.2.840.113549.1.1.11" => "sha256WithRSAEncryption",
        "1.2.840.113549.1.1.12" => "sha384WithRSAEncryption",
        "1.2.840.113549.1.1.13" => "sha512WithRSAEncryption",
        "1.2.840.113549.1.1.14" => "sha224WithRSAEncryption",
        "1.2.840.10040.4.3" => "dsaWithSHA1",
        "2.16.840.1.101.3.4.3.2" => "dsa_with_SHA256",
        "1.2.840.10045.4.1" => "ecdsa-with-SHA1",
        "1.2.840.10045.4.3.2" => "ecdsa-with-SHA256",
        "1.2.840.10045.4.3.3" => "ecdsa-with-SHA384",
        "1.2.840.10045.4.3.4" => "ecdsa-with-SHA512",
        "1.3.101.112" => "ED25519",
        "1.3.101.113" => "ED448",
        _ => return None,
    };
    Some(name)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::decoder::test::sample_chain;

    #[test]
    fn known_signature_oids_have_long_names() {
        assert_eq!(
            signature_algorithm_long_name("1.2.840.113549.1.1.5"),
            Some("sha1WithRSAEncryption")
        );
        assert_eq!(
            signature_algorithm_long_name("1.2.840.10045.4.3.2"),
            Some("ecdsa-with-SHA256")
        );
        assert_eq!(signature_algorithm_long_name("1.2.3.4"), None);
    }

    #[test]
    fn names_render_from_real_certificates() {
        let chain = sample_chain();
        let der = chain[0].cert.der().to_vec();
        let cert = ParsedCertificate(X509Certificate::from_der(&der).unwrap());

        let subject = cert.subject_dn().unwrap();
        let issuer = cert.issuer_dn().unwrap();
        assert!(subject.contains("CN=leaf.example.com"));
        assert!(issuer.contains("CN=Test Intermediate"));

        let record = cert.to_record(&der, String::new()).unwrap();
        assert_eq!(record.subject, subject);
        assert_eq!(record.issuer, issuer);
    }

    #[test]
    fn subject_alt_names_come_from_the_given_der() {
        let chain = sample_chain();

        assert_eq!(
            subject_alt_names(chain[0].cert.der()),
            vec![
                "DNS:leaf.example.com".to_owned(),
                "DNS:www.example.com".to_owned(),
                "IP Address:192.0.2.7".to_owned(),
            ]
        );
        assert!(subject_alt_names(chain[2].cert.der()).is_empty());
        assert!(subject_alt_names(&[0x30, 0x00]).is_empty());
    }

    #[test]
    fn ip_addresses_render_like_openssl() {
        assert_eq!(format_ip(&[192, 0, 2, 1]), "192.0.2.1");
        let mut v6 = [0u8; 16];
        v6[15] = 1;
        assert_eq!(format_ip(&v6), "::1");
        assert_eq!(format_ip(&[0xde, 0xad]), "DEAD");
    }
}
