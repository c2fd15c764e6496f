//! [Doc](https://docs.github.com/en/apps/creating-github-apps/authenticating-with-a-github-app/generating-a-json-web-token-jwt-for-a-github-app)

use core::time::Duration;

use chrono::{serde::ts_seconds, DateTime, Duration as ChronoDuration, Utc};
use jsonwebtoken::{encode, errors::Error as JsonwebtokenError, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

// iat is backdated to tolerate clock drift against GitHub
pub const CLOCK_SKEW_SECONDS: u64 = 60;
// 10 minutes, counted from iat
pub const EXPIRATION_TIME_DURATION_SECONDS_MAX: u64 = 60 * 10;
// 9 minutes, counted from now
pub const EXPIRATION_TIME_DURATION_SECONDS_DEFAULT: u64 = 60 * 9;

//
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    pub iss: Box<str>,
    #[serde(with = "ts_seconds")]
    pub iat: DateTime<Utc>,
    #[serde(with = "ts_seconds")]
    pub exp: DateTime<Utc>,
}

impl Claims {
    pub fn new(
        app_id: impl AsRef<str>,
        now: impl Into<Option<DateTime<Utc>>>,
        expiration_time_dur: impl Into<Option<Duration>>,
    ) -> Result<Self, CreateError> {
        let app_id = app_id.as_ref().trim();
        if app_id.is_empty() {
            return Err(CreateError::AppIdEmpty);
        }

        let now = now.into().unwrap_or_else(Utc::now);
        let mut expiration_time_dur = expiration_time_dur
            .into()
            .unwrap_or_else(|| Duration::from_secs(EXPIRATION_TIME_DURATION_SECONDS_DEFAULT));
        if expiration_time_dur.as_secs() == 0 {
            return Err(CreateError::ExpirationTimeDurationZero);
        }
        if expiration_time_dur.as_secs() + CLOCK_SKEW_SECONDS > EXPIRATION_TIME_DURATION_SECONDS_MAX
        {
            expiration_time_dur =
                Duration::from_secs(EXPIRATION_TIME_DURATION_SECONDS_MAX - CLOCK_SKEW_SECONDS);
        }

        Ok(Self {
            iss: app_id.into(),
            iat: now - ChronoDuration::seconds(CLOCK_SKEW_SECONDS as i64),
            exp: now + ChronoDuration::seconds(expiration_time_dur.as_secs() as i64),
        })
    }

    pub fn is_expired_at(&self, at: DateTime<Utc>) -> bool {
        at >= self.exp
    }

    /// True when fewer than `margin` remain before `exp`.
    pub fn expires_within(&self, at: DateTime<Utc>, margin: Duration) -> bool {
        at + ChronoDuration::seconds(margin.as_secs() as i64) >= self.exp
    }
}

/// Signs `claims` with RS256 using a PKCS#1 RSA PEM key, the format GitHub issues.
pub fn sign(
    claims: &Claims,
    rsa_private_key_pem_bytes: impl AsRef<[u8]>,
) -> Result<String, CreateError> {
    let key = EncodingKey::from_rsa_pem(rsa_private_key_pem_bytes.as_ref())
        .map_err(CreateError::MakeEncodingKeyFailed)?;

    let header = Header::new(Algorithm::RS256);

    encode(&header, claims, &key).map_err(CreateError::EncodeFailed)
}

pub fn create(
    app_id: impl AsRef<str>,
    rsa_private_key_pem_bytes: impl AsRef<[u8]>,
    now: impl Into<Option<DateTime<Utc>>>,
    expiration_time_dur: impl Into<Option<Duration>>,
) -> Result<String, CreateError> {
    let claims = Claims::new(app_id, now, expiration_time_dur)?;

    sign(&claims, rsa_private_key_pem_bytes)
}

#[derive(Debug)]
pub enum CreateError {
    AppIdEmpty,
    ExpirationTimeDurationZero,
    MakeEncodingKeyFailed(JsonwebtokenError),
    EncodeFailed(JsonwebtokenError),
}

impl CreateError {
    pub fn is_invalid_key(&self) -> bool {
        matches!(
            self,
            Self::MakeEncodingKeyFailed(_) | Self::EncodeFailed(_)
        )
    }
}

impl core::fmt::Display for CreateError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{self:?}")
    }
}
impl std::error::Error for CreateError {}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone as _;
    use jsonwebtoken::{decode, DecodingKey, Validation};

    /*
    openssl genrsa -traditional -out rsa-private-key.pem 2048
    openssl rsa -in rsa-private-key.pem -pubout -out rsa-public-key.pem
    */
    const RSA_PRIVATE_KEY: &str = include_str!("../testdata/rsa-private-key.pem");
    const RSA_PUBLIC_KEY: &str = include_str!("../testdata/rsa-public-key.pem");
    const RSA_PRIVATE_KEY_OTHER: &str = include_str!("../testdata/rsa-private-key-other.pem");
    const RSA_PUBLIC_KEY_OTHER: &str = include_str!("../testdata/rsa-public-key-other.pem");
    const EC_PRIVATE_KEY: &str = include_str!("../testdata/ec-private-key.pk8.pem");

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1700000000, 0).unwrap()
    }

    fn decode_claims(token: &str, public_key_pem: &str) -> Result<Claims, JsonwebtokenError> {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_exp = false;
        validation.set_issuer(&["12345"]);

        decode::<Claims>(
            token,
            &DecodingKey::from_rsa_pem(public_key_pem.as_bytes())?,
            &validation,
        )
        .map(|data| data.claims)
    }

    #[test]
    fn test_create() {
        let token = create("12345", RSA_PRIVATE_KEY, now(), None).unwrap();

        println!("{token}");
        let mut split = token.split('.');
        assert_eq!(split.next().unwrap(), "eyJ0eXAiOiJKV1QiLCJhbGciOiJSUzI1NiJ9");
        assert_eq!(
            split.next().unwrap(),
            "eyJpc3MiOiIxMjM0NSIsImlhdCI6MTY5OTk5OTk0MCwiZXhwIjoxNzAwMDAwNTQwfQ"
        );
        assert_eq!(split.next().unwrap(), "c9lnC-UoLTsbUgXwD6_Tjvc-rEzpu4D4BV7iSoFRh_O3NNNa_-EG1uGcY9R4idCssxYaqzn7i5XT3EFIz3i1PdTPbO5eL9-6Yn1mVeYVVl3e2t5RDjVExNFa7LMCd-ou_nTJULsAXaAPaHup8bLpBb3VYjTEcl7F10tdpiEonsZV_Mk2IxXihGk7VqKedraZBdM50_S9srA1VKh_9q-DO4285lV_BzMKBRsEN3sKV_pYMUqzb5xuaLs6H8i9lmzAqAq9RKhzZYzGFpAB641MpgcXJsFEgmx_Km10fWchvMo7qCaFrHVKWYTtgpnx3SJAAtn0GABKPX6xJUOGh__SWg");
        assert!(split.next().is_none());
    }

    #[test]
    fn test_create_is_deterministic() {
        let a = create("12345", RSA_PRIVATE_KEY, now(), None).unwrap();
        let b = create("12345", RSA_PRIVATE_KEY, now(), None).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_claims_window() {
        let token = create("12345", RSA_PRIVATE_KEY, now(), None).unwrap();
        let claims = decode_claims(&token, RSA_PUBLIC_KEY).unwrap();

        assert_eq!(claims.iss.as_ref(), "12345");
        assert!(claims.iat <= now());
        assert!(now() < claims.exp);
        assert!(
            (claims.exp - claims.iat).num_seconds() <= EXPIRATION_TIME_DURATION_SECONDS_MAX as i64
        );
        assert!(!claims.is_expired_at(now()));
        assert!(claims.is_expired_at(claims.exp));
    }

    #[test]
    fn test_claims_window_is_clamped() {
        let claims = Claims::new("12345", now(), Duration::from_secs(60 * 60)).unwrap();
        assert_eq!(
            (claims.exp - claims.iat).num_seconds(),
            EXPIRATION_TIME_DURATION_SECONDS_MAX as i64
        );

        let claims = Claims::new("12345", now(), Duration::from_secs(120)).unwrap();
        assert_eq!(claims.exp.timestamp(), 1700000120);
        assert!(claims.expires_within(now() + ChronoDuration::seconds(61), Duration::from_secs(60)));
        assert!(!claims.expires_within(now(), Duration::from_secs(60)));
    }

    #[test]
    fn test_verify() {
        let token = create("12345", RSA_PRIVATE_KEY, now(), None).unwrap();

        assert!(decode_claims(&token, RSA_PUBLIC_KEY).is_ok());
        assert!(decode_claims(&token, RSA_PUBLIC_KEY_OTHER).is_err());
    }

    #[test]
    fn test_create_with_other_key() {
        let token = create("12345", RSA_PRIVATE_KEY_OTHER, now(), None).unwrap();

        assert!(decode_claims(&token, RSA_PUBLIC_KEY_OTHER).is_ok());
        assert!(decode_claims(&token, RSA_PUBLIC_KEY).is_err());
    }

    #[test]
    fn test_create_with_invalid_key() {
        let err = create("12345", EC_PRIVATE_KEY, now(), None).unwrap_err();
        assert!(err.is_invalid_key(), "{err}");

        let err = create("12345", "not a pem", now(), None).unwrap_err();
        assert!(err.is_invalid_key(), "{err}");
    }

    #[test]
    fn test_create_with_invalid_argument() {
        match create("", RSA_PRIVATE_KEY, now(), None) {
            Err(CreateError::AppIdEmpty) => {}
            x => panic!("{x:?}"),
        }
        match create("  ", RSA_PRIVATE_KEY, now(), None) {
            Err(CreateError::AppIdEmpty) => {}
            x => panic!("{x:?}"),
        }
        match create("12345", RSA_PRIVATE_KEY, now(), Duration::from_secs(0)) {
            Err(CreateError::ExpirationTimeDurationZero) => {}
            x => panic!("{x:?}"),
        }
    }
}
