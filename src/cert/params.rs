use std::str::FromStr;
use std::time::SystemTime;

use bon::Builder;
use der::asn1::UtcTime;
use time::Duration;
use time::OffsetDateTime;
use x509_cert::name::RdnSequence;
use x509_cert::time::Time;

use crate::error::{IdentityKitError, Result};

/// Parameters for issuing an X.509 certificate.
///
/// # Fields
/// * `subject` - The distinguished name of the certificate subject.
/// * `validity` - The validity period, one year from now unless set.
/// * `is_ca` - Indicates if the certificate may sign other certificates.
#[derive(Clone, Debug, Builder)]
pub struct CertificateParams {
    pub subject: DistinguishedName,
    #[builder(default = Validity::for_days(365))]
    pub validity: Validity,
    #[builder(default)]
    pub is_ca: bool,
}

/// Distinguished name parameters for building an X.509 certificate.
///
/// # Fields
/// * `common_name` - The common name (CN).
/// * `organization` - The organization (O).
/// * `organization_unit` - The organizational unit (OU).
/// * `country` - The country (C).
#[derive(Clone, Debug, Builder, Default)]
pub struct DistinguishedName {
    #[builder(into)]
    pub common_name: String,
    pub organization: Option<String>,
    pub organization_unit: Option<String>,
    pub country: Option<String>,
}

impl DistinguishedName {
    /// Converts the distinguished name to an X.509-compatible format.
    ///
    /// Attributes that are not set are left out of the name.
    pub fn as_x509_name(&self) -> Result<x509_cert::name::Name> {
        let mut parts = vec![format!("CN={}", escape_rfc4514(&self.common_name))];
        let optional = [
            ("OU", &self.organization_unit),
            ("O", &self.organization),
            ("C", &self.country),
        ];
        for (label, value) in optional {
            if let Some(value) = value {
                parts.push(format!("{label}={}", escape_rfc4514(value)));
            }
        }
        RdnSequence::from_str(&parts.join(","))
            .map_err(|e| IdentityKitError::InvalidInput(format!("invalid subject name: {e}")))
    }
}

/// Escapes the characters RFC 4514 reserves in attribute values.
fn escape_rfc4514(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    let last = value.chars().count().saturating_sub(1);
    for (i, c) in value.chars().enumerate() {
        let leading = i == 0 && (c == ' ' || c == '#');
        let trailing = i == last && c == ' ';
        if leading || trailing || matches!(c, ',' | '+' | '"' | '\\' | '<' | '>' | ';' | '=') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Certificate validity period.
///
/// This struct represents the `notBefore` and `notAfter` fields in a certificate.
#[derive(Clone, Debug)]
pub struct Validity {
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
}

impl Validity {
    /// Creates a validity period starting now for the given number of days.
    pub fn for_days(days: i64) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            not_before: now,
            not_after: now + Duration::days(days),
        }
    }

    pub(crate) fn to_x509(&self) -> Result<x509_cert::time::Validity> {
        if self.not_after <= self.not_before {
            return Err(IdentityKitError::InvalidInput(
                "certificate validity ends before it starts".to_string(),
            ));
        }
        Ok(x509_cert::time::Validity {
            not_before: utc_time(self.not_before)?,
            not_after: utc_time(self.not_after)?,
        })
    }
}

fn utc_time(at: OffsetDateTime) -> Result<Time> {
    let utc = UtcTime::from_system_time(SystemTime::from(at))
        .map_err(|e| IdentityKitError::InvalidInput(format!("unsupported validity time: {e}")))?;
    Ok(Time::UtcTime(utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_reserved_characters() {
        assert_eq!(escape_rfc4514("a,b"), "a\\,b");
        assert_eq!(escape_rfc4514("#lead"), "\\#lead");
        assert_eq!(escape_rfc4514("plain"), "plain");
    }

    #[test]
    fn escapes_leading_and_trailing_spaces_only() {
        assert_eq!(escape_rfc4514("a "), "a\\ ");
        assert_eq!(escape_rfc4514(" "), "\\ ");
        assert_eq!(escape_rfc4514(""), "");

        let long = format!("{} ", "x y".repeat(20_000));
        let escaped = escape_rfc4514(&long);
        assert_eq!(escaped.len(), long.len() + 1);
        assert!(escaped.ends_with("y\\ "));
    }

    #[test]
    fn name_with_organization_parses() {
        let dn = DistinguishedName::builder()
            .common_name("device-01")
            .organization("Acme, Inc.".to_string())
            .build();
        let name = dn.as_x509_name().unwrap();
        assert_eq!(name.0.len(), 2);
    }

    #[test]
    fn inverted_validity_is_rejected() {
        let now = OffsetDateTime::now_utc();
        let validity = Validity {
            not_before: now,
            not_after: now - Duration::days(1),
        };
        assert!(validity.to_x509().is_err());
    }
}
