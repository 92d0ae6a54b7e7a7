//! Lenient deserializers for catalog payloads.
//!
//! The catalog is a document store: list fields may be `null`, numeric codes
//! may arrive as strings, and parent references may be either a bare id or a
//! populated document.

use serde::{Deserialize, Deserializer};

/// `null` or missing becomes `T::default()`.
pub(crate) fn null_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Integer(i64),
    Float(f64),
}

impl StringOrNumber {
    fn into_string(self) -> String {
        match self {
            Self::String(s) => s,
            Self::Integer(n) => n.to_string(),
            Self::Float(f) => f.to_string(),
        }
    }
}

/// Accept `"2019"` or `2019`, yielding `"2019"`.
pub(crate) fn string_or_number<'de, D>(d: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<StringOrNumber>::deserialize(d)?
        .map(StringOrNumber::into_string)
        .unwrap_or_default())
}

/// Optional variant of [`string_or_number`].
pub(crate) fn opt_string_or_number<'de, D>(d: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<StringOrNumber>::deserialize(d)?.map(StringOrNumber::into_string))
}

/// Accept `3` or `"3"` as a unit number. Unparseable values sort last.
pub(crate) fn unit_number<'de, D>(d: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<StringOrNumber>::deserialize(d)?;
    Ok(match raw {
        Some(StringOrNumber::Integer(n)) => u32::try_from(n).unwrap_or(u32::MAX),
        Some(other) => other.into_string().trim().parse().unwrap_or(u32::MAX),
        None => u32::MAX,
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IdOrDoc<T> {
    Id(String),
    Doc(T),
}

/// A parent reference that is either a bare id string or a populated
/// document. Bare ids are lifted through `From<String>`.
pub(crate) fn id_or_doc<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + From<String>,
{
    Ok(match Option::<IdOrDoc<T>>::deserialize(d)? {
        Some(IdOrDoc::Id(id)) => Some(T::from(id)),
        Some(IdOrDoc::Doc(doc)) => Some(doc),
        None => None,
    })
}
