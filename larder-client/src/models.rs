//! Entry and asset shapes as the content store sends them.
//!
//! Management API fields are localized: `fields.<name>.<locale> = value`. Only the pieces
//! this crate reads are typed; everything else is kept as JSON so an update sends back
//! what it fetched.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub type Fields = serde_json::Map<String, Value>;

macro_rules! string_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }
    };
}

string_id!(EntryId);
string_id!(AssetId);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Sys {
    pub id: String,
    #[serde(default)]
    pub version: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_version: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
pub enum LinkType {
    Asset,
    Entry,
    Upload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkSys {
    #[serde(rename = "type")]
    pub kind: String,
    pub link_type: LinkType,
    pub id: String,
}

/// A reference from one resource to another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub sys: LinkSys,
}

impl Link {
    fn new(link_type: LinkType, id: &str) -> Self {
        Self {
            sys: LinkSys {
                kind: "Link".into(),
                link_type,
                id: id.to_string(),
            },
        }
    }

    pub fn asset(id: &AssetId) -> Self {
        Self::new(LinkType::Asset, id.as_str())
    }

    pub fn upload(id: &str) -> Self {
        Self::new(LinkType::Upload, id)
    }

    /// Read a link to an asset out of a field value, if that's what it is
    pub fn asset_id(value: &Value) -> Option<AssetId> {
        let link: Link = serde_json::from_value(value.clone()).ok()?;
        (link.sys.link_type == LinkType::Asset).then(|| AssetId::from(link.sys.id))
    }
}

fn localized<'a>(fields: &'a Fields, name: &str, locale: &str) -> Option<&'a Value> {
    fields.get(name)?.get(locale)
}

fn set_localized(fields: &mut Fields, name: &str, locale: &str, value: Value) {
    let slot = fields
        .entry(name.to_string())
        .or_insert_with(|| Value::Object(Fields::new()));
    match slot {
        Value::Object(locales) => {
            locales.insert(locale.to_string(), value);
        }
        other => {
            let mut locales = Fields::new();
            locales.insert(locale.to_string(), value);
            *other = Value::Object(locales);
        }
    }
}

/// Build a localized field map from plain values
pub fn localized_fields<'a>(
    locale: &str,
    values: impl IntoIterator<Item = (&'a str, Value)>,
) -> Fields {
    let mut fields = Fields::new();
    for (name, value) in values {
        set_localized(&mut fields, name, locale, value);
    }
    fields
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Entry {
    pub sys: Sys,
    #[serde(default)]
    pub fields: Fields,
}

impl Entry {
    pub fn id(&self) -> EntryId {
        EntryId::from(self.sys.id.as_str())
    }

    pub fn is_published(&self) -> bool {
        self.sys.published_version.is_some()
    }

    pub fn field(&self, name: &str, locale: &str) -> Option<&Value> {
        localized(&self.fields, name, locale)
    }

    pub fn set_field(&mut self, name: &str, locale: &str, value: Value) {
        set_localized(&mut self.fields, name, locale, value)
    }

    /// The asset linked from a field, if any
    pub fn linked_asset(&self, name: &str, locale: &str) -> Option<AssetId> {
        self.field(name, locale).and_then(Link::asset_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AssetFile {
    pub content_type: String,
    pub file_name: String,
    /// Set by the store once the upload has been processed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_from: Option<Link>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Asset {
    pub sys: Sys,
    #[serde(default)]
    pub fields: Fields,
}

impl Asset {
    pub fn id(&self) -> AssetId {
        AssetId::from(self.sys.id.as_str())
    }

    pub fn is_published(&self) -> bool {
        self.sys.published_version.is_some()
    }

    pub fn file(&self, locale: &str) -> Option<AssetFile> {
        localized(&self.fields, "file", locale).and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn is_processed(&self, locale: &str) -> bool {
        self.file(locale).is_some_and(|file| file.url.is_some())
    }
}

/// A page of resources
#[derive(Debug, Clone, Deserialize)]
pub struct Collection<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

/// An uploaded file waiting to be attached to an asset
#[derive(Debug, Clone, Deserialize)]
pub struct Upload {
    pub sys: Sys,
}

/// Asset URLs are often protocol-relative (`//images...`)
pub fn absolute_url(url: &str) -> String {
    if url.starts_with("//") {
        format!("https:{}", url)
    } else {
        url.to_string()
    }
}
