use crate::error::AppError;
use crate::schemas::{User, UserId};
use crate::store::Store;
use actix_web::cookie::{Cookie, SameSite};
use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use bson::oid::ObjectId;
use futures::future::LocalBoxFuture;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

pub const SESSION_COOKIE: &str = "session";

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let mut salt_bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|err| AppError::Internal(format!("salt encoding failed: {err}")))?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AppError::Internal(format!("password hashing failed: {err}")))
}

/// False for a wrong password and for a hash that cannot be parsed.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(err) => {
            tracing::warn!(error = %err, "stored password hash is malformed");
            false
        }
    }
}

/// Signs and checks the session cookie, `<user id hex>.<hmac hex>`.
pub struct SessionSigner {
    key: Vec<u8>,
    secure: bool,
}

impl SessionSigner {
    pub fn new(secret: &str, secure: bool) -> Self {
        let mut sha256_hasher = Sha256::new();
        sha256_hasher.update(secret.as_bytes());
        Self {
            key: sha256_hasher.finalize().to_vec(),
            secure,
        }
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(&self.key).expect("HMAC accepts any key length")
    }

    pub fn sign(&self, user_id: UserId) -> String {
        let id = user_id.to_hex();
        let mut hmac_hasher = self.mac();
        hmac_hasher.update(id.as_bytes());
        let signature = hex::encode(hmac_hasher.finalize().into_bytes());
        format!("{id}.{signature}")
    }

    pub fn verify(&self, token: &str) -> Option<UserId> {
        let (id, signature) = token.split_once('.')?;
        let signature = hex::decode(signature).ok()?;
        let mut hmac_hasher = self.mac();
        hmac_hasher.update(id.as_bytes());
        hmac_hasher.verify_slice(&signature).ok()?;
        ObjectId::parse_str(id).ok()
    }

    pub fn session_cookie(&self, user_id: UserId) -> Cookie<'static> {
        Cookie::build(SESSION_COOKIE, self.sign(user_id))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .finish()
    }

    pub fn removal_cookie(&self) -> Cookie<'static> {
        let mut cookie = Cookie::build(SESSION_COOKIE, "").path("/").finish();
        cookie.make_removal();
        cookie
    }
}

/// The authenticated user of the current request.
///
/// Handlers that take this as an argument require a valid session; anything
/// else short-circuits with [`AppError::Unauthenticated`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl FromRequest for CurrentUser {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move {
            let signer = req
                .app_data::<web::Data<SessionSigner>>()
                .cloned()
                .ok_or_else(|| AppError::Internal("session signer not configured".to_string()))?;
            let store = req
                .app_data::<web::Data<dyn Store>>()
                .cloned()
                .ok_or_else(|| AppError::Internal("store not configured".to_string()))?;

            let cookie = req.cookie(SESSION_COOKIE).ok_or(AppError::Unauthenticated)?;
            let Some(user_id) = signer.verify(cookie.value()) else {
                tracing::debug!("rejecting session cookie with bad signature");
                return Err(AppError::Unauthenticated);
            };
            match store.find_user(user_id).await? {
                Some(user) => Ok(CurrentUser(user)),
                None => Err(AppError::Unauthenticated),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("hunter2").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("hunter2", &hash));
        assert!(!verify_password("hunter3", &hash));
    }

    #[test]
    fn password_hashes_are_salted() {
        assert_ne!(hash_password("same").unwrap(), hash_password("same").unwrap());
    }

    #[test]
    fn malformed_hash_never_verifies() {
        assert!(!verify_password("anything", "pbkdf2:sha256:not-a-phc-string"));
        assert!(!verify_password("", ""));
    }

    #[test]
    fn session_token_round_trip() {
        let signer = SessionSigner::new("secret", false);
        let user_id = ObjectId::new();
        assert_eq!(signer.verify(&signer.sign(user_id)), Some(user_id));
    }

    #[test]
    fn tampered_session_token_is_rejected() {
        let signer = SessionSigner::new("secret", false);
        let token = signer.sign(ObjectId::new());
        let (_, signature) = token.split_once('.').unwrap();

        let forged = format!("{}.{}", ObjectId::new().to_hex(), signature);
        assert_eq!(signer.verify(&forged), None);

        let mut flipped = token.clone();
        let last = flipped.pop().unwrap();
        flipped.push(if last == '0' { '1' } else { '0' });
        assert_eq!(signer.verify(&flipped), None);

        assert_eq!(signer.verify("no-dot-here"), None);
        assert_eq!(signer.verify("abc.zz"), None);
    }

    #[test]
    fn session_token_from_other_key_is_rejected() {
        let token = SessionSigner::new("one", false).sign(ObjectId::new());
        assert_eq!(SessionSigner::new("two", false).verify(&token), None);
    }

    #[test]
    fn session_cookie_attributes() {
        let cookie = SessionSigner::new("secret", true).session_cookie(ObjectId::new());
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
    }
}
