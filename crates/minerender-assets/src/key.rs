//! Asset keys.
//!
//! An [`AssetKey`] names one loadable file inside a resource pack: an optional
//! namespace, a slash-separated path and an extension. Its serialized form is
//! the only identity used by every cache in this crate, including the durable
//! one, so it must stay stable across releases.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Namespace assumed by [`AssetKey::parse`] when the name carries none.
pub const DEFAULT_NAMESPACE: &str = "minecraft";

/// Extension suffix of texture metadata files.
pub const META_SUFFIX: &str = ".mcmeta";

/// Separates the path from the extension in the serialized form.
///
/// Paths may contain dots, so the extension needs a separator that neither
/// field can contain.
const EXTENSION_SEPARATOR: char = '#';

/// Identifier for a loadable asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawAssetKey", into = "RawAssetKey")]
pub struct AssetKey {
    namespace: Option<String>,
    path: String,
    extension: String,
}

impl AssetKey {
    /// Create a key, validating every field.
    ///
    /// Namespaces allow `[a-z0-9_.-]`, paths additionally allow `/`, and
    /// extensions allow `[a-z0-9_.]`.
    pub fn new(
        namespace: Option<&str>,
        path: impl Into<String>,
        extension: impl Into<String>,
    ) -> Result<Self> {
        let path = path.into();
        let extension = extension.into();

        if let Some(namespace) = namespace {
            validate("namespace", namespace, |c| {
                c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '.' | '-')
            })?;
        }
        validate("path", &path, |c| {
            c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '.' | '-' | '/')
        })?;
        validate("extension", &extension, |c| {
            c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '.')
        })?;

        Ok(Self {
            namespace: namespace.map(str::to_owned),
            path,
            extension,
        })
    }

    /// Build a key for a logical name inside an asset category.
    ///
    /// `name` may carry a namespace prefix (`"minecraft:stone"`); otherwise
    /// [`DEFAULT_NAMESPACE`] is used. The category becomes the leading path
    /// segment and picks the extension: textures are PNG files, everything
    /// else is JSON.
    pub fn parse(category: &str, name: &str) -> Result<Self> {
        let (namespace, name) = match name.split_once(':') {
            Some((namespace, name)) => (namespace, name),
            None => (DEFAULT_NAMESPACE, name),
        };
        let extension = if category == "textures" { "png" } else { "json" };
        Self::new(Some(namespace), format!("{category}/{name}"), extension)
    }

    /// Derive the metadata key for this key.
    ///
    /// Appends [`META_SUFFIX`] to the extension unless it is already there.
    #[must_use]
    pub fn derive_meta(&self) -> Self {
        if self.is_meta() {
            return self.clone();
        }
        Self {
            extension: format!("{}{META_SUFFIX}", self.extension),
            ..self.clone()
        }
    }

    /// Canonical string used as cache identity.
    #[must_use]
    pub fn serialize(&self) -> String {
        match &self.namespace {
            Some(namespace) => format!(
                "{namespace}:{}{EXTENSION_SEPARATOR}{}",
                self.path, self.extension
            ),
            None => format!("{}{EXTENSION_SEPARATOR}{}", self.path, self.extension),
        }
    }

    /// Relative file path inside a resource pack (`assets/<ns>/<path>.<ext>`).
    #[must_use]
    pub fn file_path(&self) -> String {
        let namespace = self.namespace.as_deref().unwrap_or(DEFAULT_NAMESPACE);
        format!("assets/{namespace}/{}.{}", self.path, self.extension)
    }

    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Whether this key names a texture metadata file.
    #[must_use]
    pub fn is_meta(&self) -> bool {
        self.extension.ends_with(META_SUFFIX)
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize())
    }
}

fn validate(field: &'static str, value: &str, allowed: impl Fn(char) -> bool) -> Result<()> {
    if value.chars().all(allowed) {
        Ok(())
    } else {
        Err(Error::InvalidKey {
            field,
            value: value.to_owned(),
        })
    }
}

/// Unvalidated wire form, so deserialization goes through [`AssetKey::new`].
#[derive(Serialize, Deserialize)]
struct RawAssetKey {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    namespace: Option<String>,
    path: String,
    extension: String,
}

impl TryFrom<RawAssetKey> for AssetKey {
    type Error = Error;

    fn try_from(raw: RawAssetKey) -> Result<Self> {
        AssetKey::new(raw.namespace.as_deref(), raw.path, raw.extension)
    }
}

impl From<AssetKey> for RawAssetKey {
    fn from(key: AssetKey) -> Self {
        Self {
            namespace: key.namespace,
            path: key.path,
            extension: key.extension,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_includes_every_field() {
        let key = AssetKey::new(Some("minecraft"), "textures/block/stone", "png").unwrap();
        assert_eq!(key.serialize(), "minecraft:textures/block/stone#png");

        let bare = AssetKey::new(None, "stone", "png").unwrap();
        assert_eq!(bare.serialize(), "stone#png");
    }

    #[test]
    fn test_serialize_does_not_collide_on_dots() {
        // Same concatenation, different split between path and extension.
        let a = AssetKey::new(None, "stone.png", "mcmeta").unwrap();
        let b = AssetKey::new(None, "stone", "png.mcmeta").unwrap();
        assert_ne!(a.serialize(), b.serialize());
    }

    #[test]
    fn test_derive_meta_appends_once() {
        let key = AssetKey::new(None, "stone", "png").unwrap();
        let meta = key.derive_meta();

        assert_eq!(meta.extension(), "png.mcmeta");
        assert_eq!(meta.path(), "stone");
        // Input is untouched.
        assert_eq!(key.extension(), "png");
        // Deriving again is a no-op.
        assert_eq!(meta.derive_meta(), meta);
    }

    #[test]
    fn test_parse_defaults_namespace() {
        let key = AssetKey::parse("blockstates", "stone").unwrap();
        assert_eq!(key.namespace(), Some("minecraft"));
        assert_eq!(key.path(), "blockstates/stone");
        assert_eq!(key.extension(), "json");

        let custom = AssetKey::parse("textures", "mymod:block/ore").unwrap();
        assert_eq!(custom.namespace(), Some("mymod"));
        assert_eq!(custom.extension(), "png");
        assert_eq!(custom.file_path(), "assets/mymod/textures/block/ore.png");
    }

    #[test]
    fn test_rejects_separator_characters() {
        assert!(matches!(
            AssetKey::new(None, "a#b", "png"),
            Err(Error::InvalidKey { field: "path", .. })
        ));
        assert!(matches!(
            AssetKey::new(Some("Upper"), "a", "png"),
            Err(Error::InvalidKey {
                field: "namespace",
                ..
            })
        ));
        assert!(AssetKey::new(None, "a", "p/ng").is_err());
    }

    #[test]
    fn test_serde_validates() {
        let key = AssetKey::parse("blockstates", "stone").unwrap();
        let json = serde_json::to_string(&key).unwrap();
        let back: AssetKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);

        let bad = r#"{"path":"A B","extension":"png"}"#;
        assert!(serde_json::from_str::<AssetKey>(bad).is_err());
    }
}
