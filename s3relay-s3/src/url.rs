//! Object URL construction

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::config::{AddressingMode, Provider};

/// Characters left alone by URI component encoding
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Same as `URI_COMPONENT` but keeps `/` so keys stay path-like
const KEY_PATH: &AsciiSet = &URI_COMPONENT.remove(b'/');

/// Percent-encode an object key as a single URI component (`/` becomes `%2F`)
pub fn encode_key(key: &str) -> String {
    utf8_percent_encode(key, URI_COMPONENT).to_string()
}

/// `x-amz-copy-source` value for a source object
pub fn copy_source(bucket: &str, key: &str) -> String {
    format!("{}/{}", bucket, utf8_percent_encode(key, KEY_PATH))
}

/// Build the externally reachable URL of an object
///
/// Path style (forced, or any custom provider) hangs the bucket off the
/// endpoint. Otherwise the AWS virtual-hosted form is used and the endpoint
/// is not consulted.
pub fn build_file_url(
    endpoint: &str,
    bucket: &str,
    key: &str,
    region: &str,
    provider: Provider,
    force_path_style: bool,
) -> String {
    match AddressingMode::select(force_path_style, provider) {
        AddressingMode::PathStyle => format!(
            "{}/{}/{}",
            endpoint.strip_suffix('/').unwrap_or(endpoint),
            bucket,
            encode_key(key)
        ),
        AddressingMode::VirtualHosted => format!(
            "https://{}.s3.{}.amazonaws.com/{}",
            bucket,
            region,
            encode_key(key)
        ),
    }
}
