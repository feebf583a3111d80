//! Signed direct uploads to Cloudinary
//!
//! Clients upload straight to the CDN with a short-lived signature computed
//! here, so the API secret never leaves the server.

use std::collections::BTreeMap;

use common::settings::CloudinarySettings;
use serde::Serialize;
use sha1::{Digest, Sha1};
use thiserror::Error;

pub const FOLDER_ROOT: &str = "moueene";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Cloudinary is not configured on the server (missing: {})", .0.join(", "))]
    NotConfigured(Vec<&'static str>),

    #[error("Upload folder must be inside moueene")]
    InvalidFolder,
}

/// What the browser needs to post a file to Cloudinary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadSignature {
    pub cloud_name: String,
    pub api_key: String,
    pub timestamp: i64,
    pub signature: String,
    pub folder: String,
    pub resource_type: &'static str,
}

/// Signs upload parameters with the configured credentials
#[derive(Clone)]
pub struct UploadSigner {
    cloud_name: String,
    api_key: String,
    api_secret: String,
}

impl UploadSigner {
    /// Fails with every missing setting named
    pub fn from_settings(settings: &CloudinarySettings) -> Result<Self, SignatureError> {
        fn filled(value: &Option<String>) -> Option<String> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        }

        let cloud_name = filled(&settings.cloud_name);
        let api_key = filled(&settings.api_key);
        let api_secret = filled(&settings.api_secret);

        match (cloud_name, api_key, api_secret) {
            (Some(cloud_name), Some(api_key), Some(api_secret)) => Ok(Self {
                cloud_name,
                api_key,
                api_secret,
            }),
            (cloud_name, api_key, api_secret) => {
                let missing = [
                    (cloud_name.is_none(), "MARKET__CLOUDINARY__CLOUD_NAME"),
                    (api_key.is_none(), "MARKET__CLOUDINARY__API_KEY"),
                    (api_secret.is_none(), "MARKET__CLOUDINARY__API_SECRET"),
                ]
                .into_iter()
                .filter_map(|(missing, name)| missing.then_some(name))
                .collect();
                Err(SignatureError::NotConfigured(missing))
            }
        }
    }

    pub fn sign(
        &self,
        folder: Option<&str>,
        account_id: i64,
        timestamp: i64,
    ) -> Result<UploadSignature, SignatureError> {
        let folder = upload_folder(folder, account_id)?;

        let mut params = BTreeMap::new();
        params.insert("folder", folder.clone());
        params.insert("timestamp", timestamp.to_string());

        Ok(UploadSignature {
            cloud_name: self.cloud_name.clone(),
            api_key: self.api_key.clone(),
            timestamp,
            signature: sign_params(&params, &self.api_secret),
            folder,
            resource_type: "image",
        })
    }
}

/// Resolve the requested folder, keeping uploads under [`FOLDER_ROOT`]
pub fn upload_folder(requested: Option<&str>, account_id: i64) -> Result<String, SignatureError> {
    let sanitized: String = requested
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '/'))
        .collect();

    if sanitized.is_empty() {
        return Ok(format!("{}/providers/{}", FOLDER_ROOT, account_id));
    }
    if !sanitized.starts_with(FOLDER_ROOT) {
        return Err(SignatureError::InvalidFolder);
    }
    Ok(sanitized)
}

/// Lowercase hex SHA-1 of the sorted `k=v` pairs joined by `&`, secret appended
///
/// Empty values are left out.
pub fn sign_params(params: &BTreeMap<&str, String>, api_secret: &str) -> String {
    let to_sign = params
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha1::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(cloud_name: &str, api_key: &str, api_secret: &str) -> CloudinarySettings {
        let value = |v: &str| (!v.is_empty()).then(|| v.to_string());
        CloudinarySettings {
            cloud_name: value(cloud_name),
            api_key: value(api_key),
            api_secret: value(api_secret),
        }
    }

    #[test]
    fn matches_cloudinary_reference_signature() {
        let mut params = BTreeMap::new();
        params.insert("timestamp", "1315060510".to_string());
        params.insert("public_id", "sample_image".to_string());
        params.insert("eager", "w_400,h_300,c_pad|w_260,h_200,c_crop".to_string());
        params.insert("tags", String::new());

        assert_eq!(
            sign_params(&params, "abcd"),
            "bfd09f95f331f558cbd1320e67aa8d488770583e"
        );
    }

    #[test]
    fn default_folder_is_per_account() {
        assert_eq!(upload_folder(None, 7).expect("folder"), "moueene/providers/7");
        assert_eq!(upload_folder(Some("  "), 7).expect("folder"), "moueene/providers/7");
    }

    #[test]
    fn folder_is_sanitized_and_confined() {
        assert_eq!(
            upload_folder(Some("moueene/offers/<script> 1"), 1).expect("folder"),
            "moueene/offers/script1"
        );
        assert_eq!(upload_folder(Some("other/place"), 1), Err(SignatureError::InvalidFolder));
    }

    #[test]
    fn missing_settings_are_named() {
        let err = UploadSigner::from_settings(&settings("demo", "", "")).err().expect("error");
        assert_eq!(
            err,
            SignatureError::NotConfigured(vec![
                "MARKET__CLOUDINARY__API_KEY",
                "MARKET__CLOUDINARY__API_SECRET"
            ])
        );
        assert!(err.to_string().contains("MARKET__CLOUDINARY__API_KEY"));
    }

    #[test]
    fn signature_response_never_carries_the_secret() {
        let signer = UploadSigner::from_settings(&settings("demo", "123", "secret")).expect("signer");
        let signed = signer.sign(None, 7, 1_700_000_000).expect("signature");

        assert_eq!(signed.folder, "moueene/providers/7");
        assert_eq!(signed.resource_type, "image");
        assert_eq!(signed.signature, "fbdd3b0370c286a34ced56c3f23d4f2062bb3dee");

        let body = serde_json::to_string(&signed).expect("json");
        assert!(!body.contains("secret"));
    }
}
