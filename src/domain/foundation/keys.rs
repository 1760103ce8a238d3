//! Primary key values and key provider strategies.
//!
//! A session indexes entities by [`KeyValues`], the flattened list of
//! primary key parts. Typed entity keys are turned into key values by a
//! [`KeyProvider`] chosen when the repository is built:
//!
//! - [`SingleKeyProvider`] for keys made of one value (`Uuid`, `i64`, `String`, ...)
//! - [`CompositeKeyProvider`] for tuple keys (`(A, B)` up to four parts)

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// One part of a primary key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum KeyValue {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Text(String),
    Uuid(Uuid),
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValue::Bool(v) => write!(f, "{}", v),
            KeyValue::Int(v) => write!(f, "{}", v),
            KeyValue::UInt(v) => write!(f, "{}", v),
            KeyValue::Text(v) => write!(f, "{}", v),
            KeyValue::Uuid(v) => write!(f, "{}", v),
        }
    }
}

macro_rules! key_value_from {
    ($variant:ident as $target:ty: $($source:ty),+) => {
        $(
            impl From<$source> for KeyValue {
                fn from(value: $source) -> Self {
                    KeyValue::$variant(<$target>::from(value))
                }
            }
        )+
    };
}

key_value_from!(Int as i64: i8, i16, i32, i64);
key_value_from!(UInt as u64: u8, u16, u32, u64);

impl From<bool> for KeyValue {
    fn from(value: bool) -> Self {
        KeyValue::Bool(value)
    }
}

impl From<String> for KeyValue {
    fn from(value: String) -> Self {
        KeyValue::Text(value)
    }
}

impl From<&str> for KeyValue {
    fn from(value: &str) -> Self {
        KeyValue::Text(value.to_string())
    }
}

impl From<Uuid> for KeyValue {
    fn from(value: Uuid) -> Self {
        KeyValue::Uuid(value)
    }
}

/// Ordered primary key parts identifying one entity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyValues(Vec<KeyValue>);

impl KeyValues {
    pub fn new(parts: Vec<KeyValue>) -> Self {
        Self(parts)
    }

    /// Key values for a single-part key.
    pub fn single(part: impl Into<KeyValue>) -> Self {
        Self(vec![part.into()])
    }

    pub fn parts(&self) -> &[KeyValue] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for KeyValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", part)?;
        }
        Ok(())
    }
}

impl FromIterator<KeyValue> for KeyValues {
    fn from_iter<I: IntoIterator<Item = KeyValue>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Strategy turning a typed key into session key values.
pub trait KeyProvider<K>: Send + Sync {
    fn key_values(&self, key: &K) -> KeyValues;
}

/// Key provider for keys made of a single value.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleKeyProvider;

impl<K> KeyProvider<K> for SingleKeyProvider
where
    K: Clone + Into<KeyValue>,
{
    fn key_values(&self, key: &K) -> KeyValues {
        KeyValues::single(key.clone())
    }
}

/// Tuple keys whose parts map one-to-one onto key values.
pub trait CompositeKey {
    fn key_parts(&self) -> Vec<KeyValue>;
}

macro_rules! composite_key_tuple {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name),+> CompositeKey for ($($name,)+)
        where
            $($name: Clone + Into<KeyValue>),+
        {
            fn key_parts(&self) -> Vec<KeyValue> {
                vec![$(self.$idx.clone().into()),+]
            }
        }
    };
}

composite_key_tuple!(A: 0, B: 1);
composite_key_tuple!(A: 0, B: 1, C: 2);
composite_key_tuple!(A: 0, B: 1, C: 2, D: 3);

/// Key provider for composite (tuple) keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompositeKeyProvider;

impl<K> KeyProvider<K> for CompositeKeyProvider
where
    K: CompositeKey,
{
    fn key_values(&self, key: &K) -> KeyValues {
        KeyValues::new(key.key_parts())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_provider_wraps_key_in_one_part() {
        let id = Uuid::new_v4();
        let values = SingleKeyProvider.key_values(&id);

        assert_eq!(values.parts(), &[KeyValue::Uuid(id)]);
    }

    #[test]
    fn composite_provider_flattens_tuple_in_order() {
        let key = ("tenant".to_string(), 42i64);
        let values = CompositeKeyProvider.key_values(&key);

        assert_eq!(
            values.parts(),
            &[KeyValue::Text("tenant".to_string()), KeyValue::Int(42)]
        );
    }

    #[test]
    fn composite_provider_supports_four_parts() {
        let key = (1u8, 2i32, true, "x");
        assert_eq!(CompositeKeyProvider.key_values(&key).len(), 4);
    }

    #[test]
    fn key_values_display_joins_parts() {
        let values = KeyValues::new(vec![KeyValue::Int(1), KeyValue::Text("a".to_string())]);
        assert_eq!(format!("{}", values), "1, a");
    }

    #[test]
    fn integer_widths_normalize_to_same_value() {
        assert_eq!(KeyValue::from(7i32), KeyValue::from(7i64));
        assert_eq!(KeyValue::from(7u16), KeyValue::from(7u64));
    }

    #[test]
    fn key_values_serialize_as_array() {
        let values = KeyValues::single(5i64);
        let json = serde_json::to_string(&values).unwrap();
        assert_eq!(json, r#"[{"Int":5}]"#);
    }
}
