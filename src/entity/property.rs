use super::ReadConversionError;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// Trait for converting a [`Property`] back to `Self`
pub trait TryFromProperty: Sized {
    /// Try to convert `value` to `Self`
    fn try_from_property(value: &Property) -> Result<Self, ReadConversionError>;
}

/// A typed scalar value stored against a property name.
///
/// On the JSON wire each variant is a bare JSON value. Variant order matters for
/// decoding: a JSON integer becomes [`Property::Int`] and only numbers with a
/// fraction or exponent become [`Property::Double`].
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Property {
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
}

pub(crate) const EDM_DOUBLE: &str = "Edm.Double";

impl Property {
    /// Name of the entity data model type this value maps to.
    pub fn edm_type(&self) -> &'static str {
        match self {
            Self::Bool(_) => "Edm.Boolean",
            Self::Int(_) => "Edm.Int64",
            Self::Double(_) => EDM_DOUBLE,
            Self::String(_) => "Edm.String",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        if let Self::String(s) = self {
            Some(s)
        } else {
            None
        }
    }
}

impl Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => Display::fmt(b, f),
            Self::Int(i) => Display::fmt(i, f),
            Self::Double(d) => Display::fmt(d, f),
            Self::String(s) => f.write_str(s),
        }
    }
}

macro_rules! impl_property_conversions {
    () => {};
    (, $($tail:tt)*) => {
        impl_property_conversions!($($tail)*);
    };
    ($ty:ty => Int $($tail:tt)*) => {
        impl From<$ty> for Property {
            fn from(value: $ty) -> Self {
                Property::Int(value.into())
            }
        }

        impl TryFromProperty for $ty {
            fn try_from_property(value: &Property) -> Result<Self, ReadConversionError> {
                let Property::Int(value) = value else {
                    return Err(ReadConversionError::ConversionFailed(stringify!($ty).to_string()));
                };

                <$ty>::try_from(*value)
                    .map_err(|_| ReadConversionError::ConversionFailed(stringify!($ty).to_string()))
            }
        }

        impl_property_conversions!($($tail)*);
    };
    ($ty:ty => Double $($tail:tt)*) => {
        impl From<$ty> for Property {
            fn from(value: $ty) -> Self {
                Property::Double(value.into())
            }
        }

        impl_property_conversions!($($tail)*);
    };
}

impl_property_conversions!(
    i8 => Int,
    i16 => Int,
    i32 => Int,
    i64 => Int,
    u8 => Int,
    u16 => Int,
    u32 => Int,
    f32 => Double,
    f64 => Double
);

impl From<bool> for Property {
    fn from(value: bool) -> Self {
        Property::Bool(value)
    }
}

impl From<String> for Property {
    fn from(value: String) -> Self {
        Property::String(value)
    }
}

impl From<&str> for Property {
    fn from(value: &str) -> Self {
        Property::String(value.to_string())
    }
}

impl TryFromProperty for f64 {
    fn try_from_property(value: &Property) -> Result<Self, ReadConversionError> {
        match value {
            Property::Double(d) => Ok(*d),
            _ => Err(ReadConversionError::ConversionFailed("f64".to_string())),
        }
    }
}

impl TryFromProperty for bool {
    fn try_from_property(value: &Property) -> Result<Self, ReadConversionError> {
        match value {
            Property::Bool(b) => Ok(*b),
            _ => Err(ReadConversionError::ConversionFailed("bool".to_string())),
        }
    }
}

impl TryFromProperty for String {
    fn try_from_property(value: &Property) -> Result<Self, ReadConversionError> {
        match value {
            Property::String(s) => Ok(s.clone()),
            _ => Err(ReadConversionError::ConversionFailed("String".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_decoding_keeps_numeric_type() {
        let values: Vec<Property> =
            serde_json::from_str(r#"[12, 850.0, 7.5e2, true, "Yamba Surfboard"]"#).unwrap();

        assert_eq!(
            values,
            vec![
                Property::Int(12),
                Property::Double(850.0),
                Property::Double(750.0),
                Property::Bool(true),
                Property::String("Yamba Surfboard".into()),
            ]
        );
    }

    #[test]
    fn test_double_encodes_with_fraction() {
        let json = serde_json::to_string(&Property::Double(790.0)).unwrap();
        assert_eq!(json, "790.0");
    }

    #[test]
    fn test_integer_conversions() {
        assert_eq!(Property::from(25u8), Property::Int(25));
        assert_eq!(u8::try_from_property(&Property::Int(25)).unwrap(), 25);
        assert!(u8::try_from_property(&Property::Int(300)).is_err());
        assert!(i32::try_from_property(&Property::Double(1.0)).is_err());
    }

    #[test]
    fn test_scalar_conversions() {
        assert_eq!(Property::from(1.5f32), Property::Double(1.5));
        assert_eq!(f64::try_from_property(&Property::Double(1.5)).unwrap(), 1.5);
        assert!(bool::try_from_property(&Property::Bool(false)).is_ok());
        assert_eq!(
            String::try_from_property(&Property::from("Kiama")).unwrap(),
            "Kiama"
        );
        assert!(String::try_from_property(&Property::Int(1)).is_err());
    }

    #[test]
    fn test_edm_types() {
        assert_eq!(Property::Int(1).edm_type(), "Edm.Int64");
        assert_eq!(Property::Double(1.0).edm_type(), "Edm.Double");
        assert_eq!(Property::Bool(true).edm_type(), "Edm.Boolean");
        assert_eq!(Property::from("x").edm_type(), "Edm.String");
    }
}
