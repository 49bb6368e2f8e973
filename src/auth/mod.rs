//! Anonymous visitor sessions
//!
//! A session is a random owner id paired with a random opaque value. The
//! opaque value is stored by the backend; the client only ever sees it
//! sealed with AES-256-GCM and hex-encoded.
//!
//! The nonce is taken from the tail of the fixed key, so sealing is
//! deterministic: equal opaque values produce equal tokens.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::errors::{Result, ShortenerError};
use crate::storage::Storage;

/// 会话密钥（32 字节，hex）
pub const SESSION_KEY_HEX: &str =
    "9cc1ee455a3363ffc504f40006f70d0c8276648a5d3eb3f9524e94d1b7a83aef";

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;
const OPAQUE_LEN: usize = 16;

/// 会话的持久化端
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load_user(&self, session: &str) -> Result<Option<String>>;
    async fn store_session(&self, owner_id: &str, session: &str) -> Result<()>;
}

#[async_trait]
impl SessionStore for Storage {
    async fn load_user(&self, session: &str) -> Result<Option<String>> {
        Storage::load_user(self, session).await
    }

    async fn store_session(&self, owner_id: &str, session: &str) -> Result<()> {
        Storage::store_session(self, owner_id, session).await
    }
}

pub struct SessionSealer {
    cipher: Aes256Gcm,
    nonce: [u8; NONCE_LEN],
}

impl SessionSealer {
    pub fn from_hex_key(key_hex: &str) -> Result<Self> {
        let key = hex::decode(key_hex)
            .map_err(|e| ShortenerError::session(format!("会话密钥不是合法的 hex: {}", e)))?;
        if key.len() < KEY_LEN {
            return Err(ShortenerError::session(format!(
                "会话密钥长度不足: {} 字节 (需要 {})",
                key.len(),
                KEY_LEN
            )));
        }

        let cipher = Aes256Gcm::new_from_slice(&key[..KEY_LEN])
            .map_err(|e| ShortenerError::session(format!("无法初始化 AES-GCM: {}", e)))?;
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&key[key.len() - NONCE_LEN..]);

        Ok(Self { cipher, nonce })
    }

    /// 内置密钥
    pub fn builtin() -> Result<Self> {
        Self::from_hex_key(SESSION_KEY_HEX)
    }

    pub fn seal(&self, opaque: &str) -> Result<String> {
        let sealed = self
            .cipher
            .encrypt(Nonce::from_slice(&self.nonce), opaque.as_bytes())
            .map_err(|e| ShortenerError::session(format!("会话加密失败: {}", e)))?;
        Ok(hex::encode(sealed))
    }

    pub fn unseal(&self, token: &str) -> Result<String> {
        let sealed = hex::decode(token)
            .map_err(|e| ShortenerError::session(format!("token 不是合法的 hex: {}", e)))?;
        let opened = self
            .cipher
            .decrypt(Nonce::from_slice(&self.nonce), sealed.as_slice())
            .map_err(|_| ShortenerError::session("token 校验失败"))?;
        String::from_utf8(opened)
            .map_err(|_| ShortenerError::session("token 内容不是合法的 UTF-8"))
    }
}

/// 创建新会话，返回 `(owner_id, token)`
pub async fn open_session<S>(store: &S) -> Result<(String, String)>
where
    S: SessionStore + ?Sized,
{
    let owner_id = uuid::Uuid::new_v4().to_string();
    let opaque = hex::encode(rand::random::<[u8; OPAQUE_LEN]>());
    let token = SessionSealer::builtin()?.seal(&opaque)?;

    store.store_session(&owner_id, &opaque).await?;
    debug!("Opened session for {}", owner_id);
    Ok((owner_id, token))
}

/// 解析 token 对应的 owner id
///
/// 无法解封的 token 返回 `Ok(None)`，由调用方开启新会话。
pub async fn load_user<S>(token: &str, store: &S) -> Result<Option<String>>
where
    S: SessionStore + ?Sized,
{
    let opaque = match SessionSealer::builtin()?.unseal(token) {
        Ok(opaque) => opaque,
        Err(e) => {
            warn!("Rejected session token: {}", e);
            return Ok(None);
        }
    };

    store.load_user(&opaque).await
}
