/// Update manifest parsing
///
/// The manifest is a tiny text file served next to the firmware:
///
/// ```text
/// https://myserver/ota/lastBuild.bin   <- full URL of the firmware binary
/// 3                                    <- integer version of that build
/// 5d41402abc4b2a76b9719d911017c592     <- [optional] MD5 of the binary, may be empty
/// 1.3                                  <- [optional] version label, logging only
/// ```
use crate::digest::{IntegrityDigest, DIGEST_HEX_LEN};
use crate::error::ManifestError;

/// Number of newline-delimited fields read from the body
pub const MANIFEST_FIELDS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateManifest {
    pub binary_url: String,
    pub version: u32,
    pub digest: Option<IntegrityDigest>,
    pub version_label: Option<String>,
}

impl UpdateManifest {
    pub fn parse(body: &str) -> Result<Self, ManifestError> {
        let mut fields = body.split('\n').map(|f| f.strip_suffix('\r').unwrap_or(f));
        let mut next = || fields.next().unwrap_or("");

        let binary_url = next();
        let version = parse_version(next());
        let digest = next();
        let label = next();

        if binary_url.is_empty() {
            return Err(ManifestError::MissingBinaryUrl);
        }

        if version == 0 {
            return Err(ManifestError::MissingVersion);
        }

        let digest = match digest.len() {
            0 => None,
            DIGEST_HEX_LEN => Some(IntegrityDigest::parse(digest).ok_or(ManifestError::MalformedDigest)?),
            _ => return Err(ManifestError::MalformedDigest),
        };

        Ok(Self {
            binary_url: binary_url.to_string(),
            version,
            digest,
            version_label: (!label.is_empty()).then(|| label.to_string()),
        })
    }

    /// Strictly newer than the running build
    pub fn is_newer_than(&self, current_version: u32) -> bool {
        self.version > current_version
    }
}

/// Leading decimal digits of the field; anything unparsable reads as 0
fn parse_version(field: &str) -> u32 {
    let field = field.trim_start();
    let field = field.strip_prefix('+').unwrap_or(field);
    let end = field.find(|c: char| !c.is_ascii_digit()).unwrap_or(field.len());
    field[..end].parse().unwrap_or(0)
}
