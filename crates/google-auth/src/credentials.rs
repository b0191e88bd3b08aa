//! Credential Set and its session-field encoding
//!
//! A `CredentialSet` is either fully present in a `SessionRecord` or absent.
//! Decoding never default-fills a missing field: a record with an access
//! token but no expiry is an error, not a half-built credential. A token
//! that never expires is stored with an empty `expiry` value.

use std::fmt;

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::constants::{
    FIELD_ACCESS_TOKEN, FIELD_AUTHORIZATION_CODE, FIELD_EXPIRY, FIELD_REFRESH_TOKEN,
    FIELD_TOKEN_TYPE,
};
use crate::error::{Error, Result};
use crate::session::SessionRecord;
use crate::token::TokenResponse;

/// A delegated-access grant for one browser session.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialSet {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Absolute UTC instant, whole seconds. `None` never expires.
    pub expiry: Option<OffsetDateTime>,
    /// The one-time code that produced this credential. Kept for diagnostics, never reused.
    pub authorization_code: String,
}

impl CredentialSet {
    /// Build a credential from a fresh token response received at `now`.
    pub fn from_token_response(
        token: &TokenResponse,
        authorization_code: &str,
        now: OffsetDateTime,
    ) -> Result<Self> {
        let expiry = match token.expires_in {
            None | Some(0) => None,
            Some(secs) => {
                let delta = i64::try_from(secs).unwrap_or(i64::MAX);
                let at = OffsetDateTime::from_unix_timestamp(
                    now.unix_timestamp().saturating_add(delta),
                )
                .map_err(|e| Error::InvalidField {
                    field: FIELD_EXPIRY,
                    message: format!("expires_in {secs} out of range: {e}"),
                })?;
                Some(at)
            }
        };

        Ok(Self {
            access_token: token.access_token.clone(),
            refresh_token: token.refresh_token.clone(),
            token_type: token.token_type.clone(),
            expiry,
            authorization_code: authorization_code.to_string(),
        })
    }

    /// Read the credential from a session record.
    ///
    /// `Ok(None)` when the session has never been authenticated (no access
    /// token). Any other missing or malformed field is an error.
    pub fn from_record(record: &SessionRecord) -> Result<Option<Self>> {
        if record.get(FIELD_ACCESS_TOKEN).is_none() {
            return Ok(None);
        }
        Self::decode(record).map(Some)
    }

    /// Strict decode: every field must be present.
    pub fn decode(record: &SessionRecord) -> Result<Self> {
        let field = |key: &'static str| {
            record
                .get(key)
                .map(str::to_string)
                .ok_or(Error::MissingField(key))
        };

        let access_token = field(FIELD_ACCESS_TOKEN)?;
        if access_token.is_empty() {
            return Err(Error::InvalidField {
                field: FIELD_ACCESS_TOKEN,
                message: "empty".into(),
            });
        }

        let raw_expiry = field(FIELD_EXPIRY)?;
        let expiry = if raw_expiry.is_empty() {
            None
        } else {
            let at = OffsetDateTime::parse(&raw_expiry, &Rfc3339).map_err(|e| {
                Error::InvalidField {
                    field: FIELD_EXPIRY,
                    message: format!("{raw_expiry:?} is not RFC3339: {e}"),
                }
            })?;
            Some(at)
        };

        Ok(Self {
            access_token,
            refresh_token: field(FIELD_REFRESH_TOKEN)?,
            token_type: field(FIELD_TOKEN_TYPE)?,
            expiry,
            authorization_code: field(FIELD_AUTHORIZATION_CODE)?,
        })
    }

    /// Write every field into `record`, replacing any previous credential.
    pub fn apply_to(&self, record: &mut SessionRecord) -> Result<()> {
        let expiry = match self.expiry {
            Some(at) => at.format(&Rfc3339).map_err(|e| Error::InvalidField {
                field: FIELD_EXPIRY,
                message: format!("cannot format expiry: {e}"),
            })?,
            None => String::new(),
        };

        record.set(FIELD_ACCESS_TOKEN, self.access_token.clone());
        record.set(FIELD_REFRESH_TOKEN, self.refresh_token.clone());
        record.set(FIELD_TOKEN_TYPE, self.token_type.clone());
        record.set(FIELD_EXPIRY, expiry);
        record.set(FIELD_AUTHORIZATION_CODE, self.authorization_code.clone());
        Ok(())
    }

    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expiry.is_some_and(|at| at <= now)
    }
}

impl From<&CredentialSet> for provider::TokenInfo {
    fn from(credential: &CredentialSet) -> Self {
        Self {
            access_token: credential.access_token.clone(),
            refresh_token: credential.refresh_token.clone(),
            token_type: credential.token_type.clone(),
            expiry_unix: credential.expiry.map(OffsetDateTime::unix_timestamp),
        }
    }
}

impl fmt::Debug for CredentialSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialSet")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("expiry", &self.expiry)
            .field("authorization_code", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn instant(unix: i64) -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(unix).unwrap()
    }

    fn credential() -> CredentialSet {
        CredentialSet {
            access_token: "ya29.access".into(),
            refresh_token: "1//refresh".into(),
            token_type: "Bearer".into(),
            expiry: Some(instant(1_767_225_600)),
            authorization_code: "4/0AbCdEf".into(),
        }
    }

    fn encoded() -> SessionRecord {
        let mut record = SessionRecord::default();
        credential().apply_to(&mut record).unwrap();
        record
    }

    #[test]
    fn roundtrip_through_session_fields() {
        let record = encoded();
        assert_eq!(record.get(FIELD_EXPIRY), Some("2026-01-01T00:00:00Z"));

        let decoded = CredentialSet::decode(&record).unwrap();
        assert_eq!(decoded, credential());
    }

    #[test]
    fn sub_second_expiry_survives_roundtrip_to_the_second() {
        let mut original = credential();
        original.expiry = Some(instant(1_767_225_600) + Duration::milliseconds(750));

        let mut record = SessionRecord::default();
        original.apply_to(&mut record).unwrap();
        let decoded = CredentialSet::decode(&record).unwrap();

        assert_eq!(
            decoded.expiry.map(OffsetDateTime::unix_timestamp),
            Some(1_767_225_600)
        );
    }

    #[test]
    fn decode_rejects_each_missing_field() {
        for key in [
            FIELD_ACCESS_TOKEN,
            FIELD_REFRESH_TOKEN,
            FIELD_TOKEN_TYPE,
            FIELD_EXPIRY,
            FIELD_AUTHORIZATION_CODE,
        ] {
            let mut record = encoded();
            record.remove(key);
            match CredentialSet::decode(&record) {
                Err(Error::MissingField(missing)) => assert_eq!(missing, key),
                other => panic!("removing {key} should fail, got {other:?}"),
            }
        }
    }

    #[test]
    fn from_record_without_access_token_is_absent() {
        assert!(
            CredentialSet::from_record(&SessionRecord::default())
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn from_record_with_partial_credential_errors() {
        let mut record = encoded();
        record.remove(FIELD_EXPIRY);
        assert!(matches!(
            CredentialSet::from_record(&record),
            Err(Error::MissingField(FIELD_EXPIRY))
        ));
    }

    #[test]
    fn decode_rejects_unparsable_expiry() {
        let mut record = encoded();
        record.set(FIELD_EXPIRY, "2026-01-01 00:00:00 +0000 UTC".to_string());
        assert!(matches!(
            CredentialSet::decode(&record),
            Err(Error::InvalidField {
                field: FIELD_EXPIRY,
                ..
            })
        ));
    }

    #[test]
    fn decode_accepts_empty_refresh_token() {
        let mut record = encoded();
        record.set(FIELD_REFRESH_TOKEN, String::new());
        let decoded = CredentialSet::decode(&record).unwrap();
        assert_eq!(decoded.refresh_token, "");
    }

    #[test]
    fn from_token_response_computes_absolute_expiry() {
        let token = TokenResponse {
            access_token: "ya29.access".into(),
            refresh_token: "1//refresh".into(),
            token_type: "Bearer".into(),
            expires_in: Some(3599),
        };
        let now = instant(1_767_225_600) + Duration::milliseconds(400);
        let credential = CredentialSet::from_token_response(&token, "4/0AbCdEf", now).unwrap();

        assert_eq!(credential.expiry, Some(instant(1_767_225_600 + 3599)));
        assert_eq!(credential.authorization_code, "4/0AbCdEf");
    }

    #[test]
    fn token_without_lifetime_never_expires() {
        let now = instant(1_767_225_600);
        for expires_in in [None, Some(0)] {
            let token = TokenResponse {
                access_token: "ya29.access".into(),
                refresh_token: String::new(),
                token_type: "Bearer".into(),
                expires_in,
            };
            let credential = CredentialSet::from_token_response(&token, "4/0AbCdEf", now).unwrap();
            assert_eq!(credential.expiry, None);
            assert!(!credential.is_expired(now));
            assert!(!credential.is_expired(now + Duration::days(365)));
        }
    }

    #[test]
    fn non_expiring_credential_roundtrips_as_empty_expiry() {
        let mut original = credential();
        original.expiry = None;

        let mut record = SessionRecord::default();
        original.apply_to(&mut record).unwrap();
        assert_eq!(record.get(FIELD_EXPIRY), Some(""));

        assert_eq!(CredentialSet::decode(&record).unwrap(), original);
    }

    #[test]
    fn expiry_check_is_inclusive() {
        let credential = credential();
        assert!(!credential.is_expired(instant(1_767_225_599)));
        assert!(credential.is_expired(instant(1_767_225_600)));
    }

    #[test]
    fn converts_to_provider_token() {
        let token = provider::TokenInfo::from(&credential());
        assert_eq!(token.access_token, "ya29.access");
        assert_eq!(token.expiry_unix, Some(1_767_225_600));
        assert_eq!(token.authorization(), "Bearer ya29.access");
    }

    #[test]
    fn debug_redacts_tokens() {
        let debug = format!("{:?}", credential());
        assert!(!debug.contains("ya29.access"));
        assert!(!debug.contains("1//refresh"));
        assert!(!debug.contains("4/0AbCdEf"));
    }
}
