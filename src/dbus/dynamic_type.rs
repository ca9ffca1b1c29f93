use crate::dbus::{
    DbusError, DynamicType, Parser, TY_ARRAY, TY_BOOLEAN, TY_BYTE, TY_DOUBLE, TY_INT16, TY_INT32,
    TY_INT64, TY_OBJECT_PATH, TY_SIGNATURE, TY_STRING, TY_UINT16, TY_UINT32, TY_UINT64,
    TY_VARIANT, Variant,
};

impl DynamicType {
    /// Parses the first complete type of `s` and returns it together with the
    /// unparsed rest.
    pub fn from_signature(mut s: &[u8]) -> Result<(DynamicType, &[u8]), DbusError> {
        if s.is_empty() {
            return Err(DbusError::EmptySignature);
        }
        let first = s[0];
        s = &s[1..];
        let dp = match first {
            TY_BYTE => DynamicType::U8,
            TY_BOOLEAN => DynamicType::Bool,
            TY_INT16 => DynamicType::I16,
            TY_UINT16 => DynamicType::U16,
            TY_INT32 => DynamicType::I32,
            TY_UINT32 => DynamicType::U32,
            TY_INT64 => DynamicType::I64,
            TY_UINT64 => DynamicType::U64,
            TY_DOUBLE => DynamicType::F64,
            TY_STRING => DynamicType::String,
            TY_OBJECT_PATH => DynamicType::ObjectPath,
            TY_SIGNATURE => DynamicType::Signature,
            TY_VARIANT => DynamicType::Variant,
            TY_ARRAY => {
                let (elty, rem) = Self::from_signature(s)?;
                s = rem;
                DynamicType::Array(Box::new(elty))
            }
            b'{' => {
                let (keyty, rem) = Self::from_signature(s)?;
                let (valty, rem) = Self::from_signature(rem)?;
                match rem.first() {
                    None => return Err(DbusError::UnterminatedDict),
                    Some(b'}') => {}
                    Some(_) => return Err(DbusError::DictTrailing),
                }
                s = &rem[1..];
                DynamicType::DictEntry(Box::new(keyty), Box::new(valty))
            }
            b'(' => {
                let mut fields = vec![];
                loop {
                    match s.first() {
                        None => return Err(DbusError::UnterminatedStruct),
                        Some(b')') => {
                            s = &s[1..];
                            break DynamicType::Struct(fields);
                        }
                        Some(_) => {
                            let (fieldty, rem) = Self::from_signature(s)?;
                            s = rem;
                            fields.push(fieldty);
                        }
                    }
                }
            }
            _ => return Err(DbusError::UnknownType),
        };
        Ok((dp, s))
    }

    pub fn alignment(&self) -> usize {
        match self {
            DynamicType::U8 => 1,
            DynamicType::Bool => 4,
            DynamicType::I16 => 2,
            DynamicType::U16 => 2,
            DynamicType::I32 => 4,
            DynamicType::U32 => 4,
            DynamicType::I64 => 8,
            DynamicType::U64 => 8,
            DynamicType::F64 => 8,
            DynamicType::String => 4,
            DynamicType::ObjectPath => 4,
            DynamicType::Signature => 1,
            DynamicType::Variant => 1,
            DynamicType::Array(_) => 4,
            DynamicType::DictEntry(_, _) => 8,
            DynamicType::Struct(_) => 8,
        }
    }

    pub fn write_signature(&self, w: &mut String) {
        let c = match self {
            DynamicType::U8 => TY_BYTE,
            DynamicType::Bool => TY_BOOLEAN,
            DynamicType::I16 => TY_INT16,
            DynamicType::U16 => TY_UINT16,
            DynamicType::I32 => TY_INT32,
            DynamicType::U32 => TY_UINT32,
            DynamicType::I64 => TY_INT64,
            DynamicType::U64 => TY_UINT64,
            DynamicType::F64 => TY_DOUBLE,
            DynamicType::String => TY_STRING,
            DynamicType::ObjectPath => TY_OBJECT_PATH,
            DynamicType::Signature => TY_SIGNATURE,
            DynamicType::Variant => TY_VARIANT,
            DynamicType::Array(el) => {
                w.push(TY_ARRAY as char);
                el.write_signature(w);
                return;
            }
            DynamicType::DictEntry(k, v) => {
                w.push('{');
                k.write_signature(w);
                v.write_signature(w);
                w.push('}');
                return;
            }
            DynamicType::Struct(f) => {
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

    pub fn parse(&self, parser: &mut Parser) -> Result<Variant, DbusError> {
        let var = match self {
            DynamicType::U8 => Variant::U8(parser.unmarshal()?),
            DynamicType::Bool => Variant::Bool(parser.read_bool()?),
            DynamicType::I16 => Variant::I16(parser.unmarshal()?),
            DynamicType::U16 => Variant::U16(parser.unmarshal()?),
            DynamicType::I32 => Variant::I32(parser.unmarshal()?),
            DynamicType::U32 => Variant::U32(parser.unmarshal()?),
            DynamicType::I64 => Variant::I64(parser.unmarshal()?),
            DynamicType::U64 => Variant::U64(parser.unmarshal()?),
            DynamicType::F64 => Variant::F64(parser.unmarshal()?),
            DynamicType::String => Variant::String(parser.read_string()?),
            DynamicType::ObjectPath => Variant::ObjectPath(parser.read_object_path()?),
            DynamicType::Signature => Variant::Signature(parser.read_signature()?),
            DynamicType::Variant => Variant::Variant(Box::new(parser.read_variant()?)),
            DynamicType::Array(el) => {
                let vals = parser.read_array_with(el.alignment(), |parser| {
                    let mut vals = vec![];
                    while !parser.eof() {
                        vals.push(el.parse(parser)?);
                    }
                    Ok(vals)
                })?;
                Variant::Array((**el).clone(), vals)
            }
            DynamicType::DictEntry(k, v) => parser.nested(|parser| {
                parser.align_to(8)?;
                let key = k.parse(parser)?;
                Ok(Variant::DictEntry(Box::new(key), Box::new(v.parse(parser)?)))
            })?,
            DynamicType::Struct(fields) => parser.nested(|parser| {
                parser.align_to(8)?;
                let mut vals = vec![];
                for field in fields {
                    vals.push(field.parse(parser)?);
                }
                Ok(Variant::Struct(vals))
            })?,
        };
        Ok(var)
    }
}
