//! Storage configuration resolution
//!
//! Turns the connection fields of an option bag into a concrete
//! [`StorageConfig`]. Resolution is pure: no network call happens here.

use s3relay_core::{ActionError, OptionBag};
use serde::Serialize;

use crate::url::build_file_url;

pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_PROVIDER: &str = "aws";

/// Logical backend selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Aws,
    Custom,
}

impl Provider {
    /// Only the exact string `custom` selects a custom backend; anything else is AWS
    pub fn parse(value: &str) -> Self {
        if value == "custom" {
            Self::Custom
        } else {
            Self::Aws
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aws => "aws",
            Self::Custom => "custom",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How object URLs address the bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressingMode {
    /// `{endpoint}/{bucket}/{key}`
    PathStyle,
    /// `https://{bucket}.s3.{region}.amazonaws.com/{key}`
    VirtualHosted,
}

impl AddressingMode {
    pub fn select(force_path_style: bool, provider: Provider) -> Self {
        if force_path_style || provider == Provider::Custom {
            Self::PathStyle
        } else {
            Self::VirtualHosted
        }
    }
}

/// Static access key pair
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .finish()
    }
}

/// Connection fields as supplied by the caller, defaults applied
#[derive(Debug, Clone)]
pub struct ConnectionOptions {
    pub credentials: Credentials,
    pub region: String,
    pub provider: String,
    pub endpoint: String,
    pub force_path_style: bool,
}

impl ConnectionOptions {
    pub fn from_bag(bag: &OptionBag) -> Result<Self, ActionError> {
        let access_key_id = bag.required_str("accessKeyId", "Access key ID is required")?;
        let secret_access_key =
            bag.required_str("secretAccessKey", "Secret access key is required")?;

        Ok(Self {
            credentials: Credentials {
                access_key_id,
                secret_access_key,
            },
            region: bag.optional_str("region", DEFAULT_REGION)?,
            provider: bag.optional_str("provider", DEFAULT_PROVIDER)?,
            endpoint: bag.optional_str("endpoint", "")?,
            force_path_style: bag.optional_bool("forcePathStyle", false)?,
        })
    }

    /// Derive the working configuration
    ///
    /// The endpoint override only applies to custom providers. A custom
    /// provider without an override keeps the AWS regional endpoint.
    pub fn resolve(self) -> StorageConfig {
        let provider = Provider::parse(&self.provider);
        let endpoint = if provider == Provider::Custom && !self.endpoint.is_empty() {
            self.endpoint
        } else {
            aws_endpoint(&self.region)
        };

        StorageConfig {
            region: self.region,
            credentials: self.credentials,
            endpoint,
            force_path_style: self.force_path_style,
            provider,
        }
    }
}

/// Resolved client configuration, built fresh for every action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub region: String,
    pub credentials: Credentials,
    pub endpoint: String,
    pub force_path_style: bool,
    pub provider: Provider,
}

impl StorageConfig {
    pub fn from_bag(bag: &OptionBag) -> Result<Self, ActionError> {
        ConnectionOptions::from_bag(bag).map(ConnectionOptions::resolve)
    }

    pub fn addressing_mode(&self) -> AddressingMode {
        AddressingMode::select(self.force_path_style, self.provider)
    }

    /// Externally reachable URL of an object under this configuration
    pub fn object_url(&self, bucket: &str, key: &str) -> String {
        build_file_url(
            &self.endpoint,
            bucket,
            key,
            &self.region,
            self.provider,
            self.force_path_style,
        )
    }
}

/// AWS regional S3 endpoint
pub fn aws_endpoint(region: &str) -> String {
    format!("https://s3.{}.amazonaws.com", region)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bag(value: serde_json::Value) -> OptionBag {
        OptionBag::from_value(value).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = StorageConfig::from_bag(&bag(json!({
            "accessKeyId": "AK",
            "secretAccessKey": "SK",
        })))
        .unwrap();

        assert_eq!(config.region, "us-east-1");
        assert_eq!(config.provider, Provider::Aws);
        assert_eq!(config.endpoint, "https://s3.us-east-1.amazonaws.com");
        assert!(!config.force_path_style);
        assert_eq!(config.addressing_mode(), AddressingMode::VirtualHosted);
        assert_eq!(config.credentials.access_key_id, "AK");
        assert_eq!(config.credentials.secret_access_key, "SK");
    }

    #[test]
    fn test_region_drives_default_endpoint() {
        let config = StorageConfig::from_bag(&bag(json!({
            "accessKeyId": "AK",
            "secretAccessKey": "SK",
            "region": "eu-west-3",
        })))
        .unwrap();

        assert_eq!(config.endpoint, "https://s3.eu-west-3.amazonaws.com");
    }

    #[test]
    fn test_custom_provider_uses_override_verbatim() {
        let config = StorageConfig::from_bag(&bag(json!({
            "accessKeyId": "AK",
            "secretAccessKey": "SK",
            "provider": "custom",
            "endpoint": "minio.internal:9000/",
        })))
        .unwrap();

        assert_eq!(config.provider, Provider::Custom);
        assert_eq!(config.endpoint, "minio.internal:9000/");
        assert_eq!(config.addressing_mode(), AddressingMode::PathStyle);
    }

    #[test]
    fn test_endpoint_ignored_for_aws_provider() {
        let config = StorageConfig::from_bag(&bag(json!({
            "accessKeyId": "AK",
            "secretAccessKey": "SK",
            "endpoint": "https://minio.internal:9000",
        })))
        .unwrap();

        assert_eq!(config.endpoint, "https://s3.us-east-1.amazonaws.com");
    }

    #[test]
    fn test_custom_provider_without_override_falls_back_to_aws() {
        let config = StorageConfig::from_bag(&bag(json!({
            "accessKeyId": "AK",
            "secretAccessKey": "SK",
            "provider": "custom",
            "region": "ap-south-1",
        })))
        .unwrap();

        assert_eq!(config.endpoint, "https://s3.ap-south-1.amazonaws.com");
        assert_eq!(config.addressing_mode(), AddressingMode::PathStyle);
    }

    #[test]
    fn test_unknown_provider_is_aws() {
        assert_eq!(Provider::parse("minio"), Provider::Aws);
        assert_eq!(Provider::parse("Custom"), Provider::Aws);
        assert_eq!(Provider::parse("custom"), Provider::Custom);
    }

    #[test]
    fn test_force_path_style_selects_path_style() {
        assert_eq!(
            AddressingMode::select(true, Provider::Aws),
            AddressingMode::PathStyle
        );
        assert_eq!(
            AddressingMode::select(false, Provider::Aws),
            AddressingMode::VirtualHosted
        );
    }

    #[test]
    fn test_missing_credentials() {
        let err = StorageConfig::from_bag(&bag(json!({ "secretAccessKey": "SK" }))).unwrap_err();
        assert!(matches!(err, ActionError::Validation(ref m) if m == "Access key ID is required"));

        let err = StorageConfig::from_bag(&bag(json!({ "accessKeyId": "AK" }))).unwrap_err();
        assert!(
            matches!(err, ActionError::Validation(ref m) if m == "Secret access key is required")
        );
    }

    #[test]
    fn test_credentials_debug_redacts_secret() {
        let creds = Credentials {
            access_key_id: "AK".into(),
            secret_access_key: "very-secret".into(),
        };
        let debug = format!("{:?}", creds);
        assert!(debug.contains("AK"));
        assert!(!debug.contains("very-secret"));
    }
}
