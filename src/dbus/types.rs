use {
    crate::dbus::{
        DbusError, DbusTuple, DbusType, DynamicType, Formatter, Parser, TY_ARRAY, TY_BOOLEAN,
        TY_BYTE, TY_DOUBLE, TY_INT16, TY_INT32, TY_INT64, TY_OBJECT_PATH, TY_SIGNATURE,
        TY_STRING, TY_UINT16, TY_UINT32, TY_UINT64, TY_VARIANT,
    },
    std::ops::Deref,
};

macro_rules! basic {
    ($ty:ty, $sig:expr) => {
        impl DbusType for $ty {
            const ALIGNMENT: usize = size_of::<$ty>();

            fn write_signature(w: &mut String) {
                w.push($sig as char);
            }

            fn marshal(&self, fmt: &mut Formatter) {
                fmt.write_fixed(&self.to_ne_bytes());
            }

            fn unmarshal(parser: &mut Parser) -> Result<Self, DbusError> {
                Ok(<$ty>::from_ne_bytes(parser.read_fixed()?))
            }
        }
    };
}

basic!(i16, TY_INT16);
basic!(u16, TY_UINT16);
basic!(i32, TY_INT32);
basic!(u32, TY_UINT32);
basic!(i64, TY_INT64);
basic!(u64, TY_UINT64);
basic!(f64, TY_DOUBLE);

// D-Bus has no signed byte. Signed bytes travel as `y`.
basic!(i8, TY_BYTE);

impl DbusType for u8 {
    const ALIGNMENT: usize = 1;

    fn write_signature(w: &mut String) {
        w.push(TY_BYTE as char);
    }

    fn marshal(&self, fmt: &mut Formatter) {
        fmt.write_fixed(&[*self]);
    }

    fn unmarshal(parser: &mut Parser) -> Result<Self, DbusError> {
        let [b] = parser.read_fixed()?;
        Ok(b)
    }

    fn marshal_elements(elements: &[Self], fmt: &mut Formatter) {
        fmt.write_bytes(elements);
    }

    fn unmarshal_elements(parser: &mut Parser) -> Result<Vec<Self>, DbusError> {
        Ok(parser.read_remaining().to_vec())
    }
}

impl DbusType for bool {
    const ALIGNMENT: usize = 4;

    fn write_signature(w: &mut String) {
        w.push(TY_BOOLEAN as char);
    }

    fn marshal(&self, fmt: &mut Formatter) {
        fmt.write_fixed(&(*self as u32).to_ne_bytes());
    }

    fn unmarshal(parser: &mut Parser) -> Result<Self, DbusError> {
        parser.read_bool()
    }
}

impl DbusType for String {
    const ALIGNMENT: usize = 4;

    fn write_signature(w: &mut String) {
        w.push(TY_STRING as char);
    }

    fn marshal(&self, fmt: &mut Formatter) {
        fmt.write_str(self);
    }

    fn unmarshal(parser: &mut Parser) -> Result<Self, DbusError> {
        parser.read_string()
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Signature(pub String);

impl Deref for Signature {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DbusType for Signature {
    const ALIGNMENT: usize = 1;

    fn write_signature(w: &mut String) {
        w.push(TY_SIGNATURE as char);
    }

    fn marshal(&self, fmt: &mut Formatter) {
        fmt.write_signature(&self.0);
    }

    fn unmarshal(parser: &mut Parser) -> Result<Self, DbusError> {
        parser.read_signature()
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct ObjectPath(pub String);

impl Deref for ObjectPath {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DbusType for ObjectPath {
    const ALIGNMENT: usize = 4;

    fn write_signature(w: &mut String) {
        w.push(TY_OBJECT_PATH as char);
    }

    fn marshal(&self, fmt: &mut Formatter) {
        fmt.write_str(&self.0);
    }

    fn unmarshal(parser: &mut Parser) -> Result<Self, DbusError> {
        parser.read_object_path()
    }
}

impl<T: DbusType> DbusType for Vec<T> {
    const ALIGNMENT: usize = 4;

    fn write_signature(w: &mut String) {
        w.push(TY_ARRAY as char);
        T::write_signature(w);
    }

    fn marshal(&self, fmt: &mut Formatter) {
        fmt.write_array(self);
    }

    fn unmarshal(parser: &mut Parser) -> Result<Self, DbusError> {
        parser.read_array()
    }
}

impl<T: DbusType, const N: usize> DbusType for [T; N] {
    const ALIGNMENT: usize = 4;

    fn write_signature(w: &mut String) {
        w.push(TY_ARRAY as char);
        T::write_signature(w);
    }

    fn marshal(&self, fmt: &mut Formatter) {
        fmt.write_array(self);
    }

    fn unmarshal(parser: &mut Parser) -> Result<Self, DbusError> {
        let elements = parser.read_array::<T>()?;
        let actual = elements.len();
        elements.try_into().map_err(|_| DbusError::ArrayLength {
            expected: N,
            actual,
        })
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DictEntry<K, V> {
    pub key: K,
    pub value: V,
}

impl<K: DbusType, V: DbusType> DbusType for DictEntry<K, V> {
    const ALIGNMENT: usize = 8;

    fn write_signature(w: &mut String) {
        w.push('{');
        K::write_signature(w);
        V::write_signature(w);
        w.push('}');
    }

    fn marshal(&self, fmt: &mut Formatter) {
        fmt.pad_to(8);
        self.key.marshal(fmt);
        self.value.marshal(fmt);
    }

    fn unmarshal(parser: &mut Parser) -> Result<Self, DbusError> {
        parser.align_to(8)?;
        Ok(Self {
            key: K::unmarshal(parser)?,
            value: V::unmarshal(parser)?,
        })
    }
}

macro_rules! tuple {
    ($($p:ident),*) => {
        #[allow(non_snake_case)]
        impl<$($p: DbusType),*> DbusType for ($($p,)*) {
            const ALIGNMENT: usize = 8;

            fn write_signature(w: &mut String) {
                w.push('(');
                $(
                    $p::write_signature(w);
                )*
                w.push(')');
            }

            fn marshal(&self, fmt: &mut Formatter) {
                let ($($p,)*) = self;
                fmt.pad_to(8);
                $(
                    DbusType::marshal($p, fmt);
                )*
            }

            fn unmarshal(parser: &mut Parser) -> Result<Self, DbusError> {
                parser.align_to(8)?;
                Ok(($(<$p as DbusType>::unmarshal(parser)?,)*))
            }
        }
    }
}

tuple!(A);
tuple!(A, B);
tuple!(A, B, C);
tuple!(A, B, C, D);
tuple!(A, B, C, D, E);
tuple!(A, B, C, D, E, F);
tuple!(A, B, C, D, E, F, G);
tuple!(A, B, C, D, E, F, G, H);
tuple!(A, B, C, D, E, F, G, H, I);
tuple!(A, B, C, D, E, F, G, H, I, J);
tuple!(A, B, C, D, E, F, G, H, I, J, K);
tuple!(A, B, C, D, E, F, G, H, I, J, K, L);

macro_rules! body {
    ($($p:ident),*) => {
        #[allow(non_snake_case, unused_variables)]
        impl<$($p: DbusType),*> DbusTuple for ($($p,)*) {
            fn write_body_signature(w: &mut String) {
                $(
                    $p::write_signature(w);
                )*
            }

            fn marshal_body(&self, fmt: &mut Formatter) {
                let ($($p,)*) = self;
                $(
                    DbusType::marshal($p, fmt);
                )*
            }

            fn unmarshal_body(parser: &mut Parser) -> Result<Self, DbusError> {
                Ok(($(<$p as DbusType>::unmarshal(parser)?,)*))
            }
        }
    }
}

body!();
body!(A);
body!(A, B);
body!(A, B, C);
body!(A, B, C, D);
body!(A, B, C, D, E);
body!(A, B, C, D, E, F);
body!(A, B, C, D, E, F, G);
body!(A, B, C, D, E, F, G, H);
body!(A, B, C, D, E, F, G, H, I);
body!(A, B, C, D, E, F, G, H, I, J);
body!(A, B, C, D, E, F, G, H, I, J, K);
body!(A, B, C, D, E, F, G, H, I, J, K, L);

/// A value whose type is only known at runtime.
#[derive(Clone, Debug, PartialEq)]
pub enum Variant {
    U8(u8),
    Bool(bool),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F64(f64),
    String(String),
    ObjectPath(ObjectPath),
    Signature(Signature),
    Variant(Box<Variant>),
    Array(DynamicType, Vec<Variant>),
    DictEntry(Box<Variant>, Box<Variant>),
    Struct(Vec<Variant>),
}

impl Variant {
    pub fn into_string(self) -> Result<String, DbusError> {
        match self {
            Variant::String(s) => Ok(s),
            _ => Err(DbusError::InvalidVariantType),
        }
    }

    pub fn into_object_path(self) -> Result<ObjectPath, DbusError> {
        match self {
            Variant::ObjectPath(s) => Ok(s),
            _ => Err(DbusError::InvalidVariantType),
        }
    }

    pub fn into_signature(self) -> Result<Signature, DbusError> {
        match self {
            Variant::Signature(s) => Ok(s),
            _ => Err(DbusError::InvalidVariantType),
        }
    }

    pub fn into_u32(self) -> Result<u32, DbusError> {
        match self {
            Variant::U32(s) => Ok(s),
            _ => Err(DbusError::InvalidVariantType),
        }
    }

    pub fn write_signature(&self, w: &mut String) {
        let c = match self {
            Variant::U8(..) => TY_BYTE,
            Variant::Bool(..) => TY_BOOLEAN,
            Variant::I16(..) => TY_INT16,
            Variant::U16(..) => TY_UINT16,
            Variant::I32(..) => TY_INT32,
            Variant::U32(..) => TY_UINT32,
            Variant::I64(..) => TY_INT64,
            Variant::U64(..) => TY_UINT64,
            Variant::F64(..) => TY_DOUBLE,
            Variant::String(..) => TY_STRING,
            Variant::ObjectPath(..) => TY_OBJECT_PATH,
            Variant::Signature(..) => TY_SIGNATURE,
            Variant::Variant(..) => TY_VARIANT,
            Variant::Array(el, _) => {
                w.push(TY_ARRAY as char);
                el.write_signature(w);
                return;
            }
            Variant::DictEntry(k, v) => {
                w.push('{');
                k.write_signature(w);
                v.write_signature(w);
                w.push('}');
                return;
            }
            Variant::Struct(f) => {
                w.push('(');
                for f in f {
                    f.write_signature(w);
                }
                w.push(')');
                return;
            }
        };
        w.push(c as char);
    }

    /// Writes the value without the leading signature.
    pub fn marshal_value(&self, fmt: &mut Formatter) {
        match self {
            Variant::U8(v) => v.marshal(fmt),
            Variant::Bool(v) => v.marshal(fmt),
            Variant::I16(v) => v.marshal(fmt),
            Variant::U16(v) => v.marshal(fmt),
            Variant::I32(v) => v.marshal(fmt),
            Variant::U32(v) => v.marshal(fmt),
            Variant::I64(v) => v.marshal(fmt),
            Variant::U64(v) => v.marshal(fmt),
            Variant::F64(v) => v.marshal(fmt),
            Variant::String(v) => v.marshal(fmt),
            Variant::ObjectPath(v) => v.marshal(fmt),
            Variant::Signature(v) => v.marshal(fmt),
            Variant::Variant(v) => fmt.write_variant(v),
            Variant::Array(el, v) => fmt.write_array_with(el.alignment(), |fmt| {
                for v in v {
                    v.marshal_value(fmt);
                }
            }),
            Variant::DictEntry(k, v) => {
                fmt.pad_to(8);
                k.marshal_value(fmt);
                v.marshal_value(fmt);
            }
            Variant::Struct(f) => {
                fmt.pad_to(8);
                for f in f {
                    f.marshal_value(fmt);
                }
            }
        }
    }
}

impl DbusType for Variant {
    const ALIGNMENT: usize = 1;

    fn write_signature(w: &mut String) {
        w.push(TY_VARIANT as char);
    }

    fn marshal(&self, fmt: &mut Formatter) {
        fmt.write_variant(self);
    }

    fn unmarshal(parser: &mut Parser) -> Result<Self, DbusError> {
        parser.read_variant()
    }
}
