use {
    crate::dbus::{
        DbusError, DbusType, DynamicType, MAX_ARRAY_LEN, MAX_DEPTH, ObjectPath, Parser, Signature, Variant,
    },
    bstr::ByteSlice,
};

impl<'a> Parser<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            depth: 0,
        }
    }

    pub fn eof(&self) -> bool {
        self.pos == self.buf.len()
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Runs `f` one container level deeper.
    pub fn nested<R>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<R, DbusError>,
    ) -> Result<R, DbusError> {
        if self.depth >= MAX_DEPTH {
            return Err(DbusError::TooDeep);
        }
        self.depth += 1;
        let res = f(self);
        self.depth -= 1;
        res
    }

    pub fn unmarshal<T: DbusType>(&mut self) -> Result<T, DbusError> {
        T::unmarshal(self)
    }

    pub fn align_to(&mut self, n: usize) -> Result<(), DbusError> {
        let new = self.pos + (self.pos.wrapping_neg() & (n - 1));
        if new > self.buf.len() {
            return Err(DbusError::UnexpectedEof);
        }
        self.pos = new;
        Ok(())
    }

    /// Reads a basic value of `N` bytes, aligned to `N`.
    pub fn read_fixed<const N: usize>(&mut self) -> Result<[u8; N], DbusError> {
        self.align_to(N)?;
        let end = self.pos + N;
        if end > self.buf.len() {
            return Err(DbusError::UnexpectedEof);
        }
        let mut res = [0; N];
        res.copy_from_slice(&self.buf[self.pos..end]);
        self.pos = end;
        Ok(res)
    }

    pub(super) fn read_remaining(&mut self) -> &'a [u8] {
        let rem = &self.buf[self.pos..];
        self.pos = self.buf.len();
        rem
    }

    pub fn read_bool(&mut self) -> Result<bool, DbusError> {
        match u32::from_ne_bytes(self.read_fixed()?) {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(DbusError::InvalidBoolValue),
        }
    }

    pub fn read_object_path(&mut self) -> Result<ObjectPath, DbusError> {
        self.read_string().map(ObjectPath)
    }

    pub fn read_string(&mut self) -> Result<String, DbusError> {
        let len = u32::from_ne_bytes(self.read_fixed()?);
        self.read_string_(len as usize).map(|s| s.to_owned())
    }

    pub fn read_signature(&mut self) -> Result<Signature, DbusError> {
        let [len] = self.read_fixed()?;
        self.read_string_(len as usize)
            .map(|s| Signature(s.to_owned()))
    }

    fn read_string_(&mut self, len: usize) -> Result<&'a str, DbusError> {
        if self.buf.len() - self.pos < len + 1 {
            return Err(DbusError::UnexpectedEof);
        }
        let s = &self.buf[self.pos..self.pos + len];
        if self.buf[self.pos + len] != 0 {
            return Err(DbusError::MissingNul);
        }
        self.pos += len + 1;
        s.to_str().map_err(|_| DbusError::InvalidUtf8)
    }

    pub fn read_array<T: DbusType>(&mut self) -> Result<Vec<T>, DbusError> {
        self.read_array_with(T::ALIGNMENT, |parser| T::unmarshal_elements(parser))
    }

    /// Reads the length word of an array and hands `f` a parser that ends
    /// where the array ends.
    pub fn read_array_with<R>(
        &mut self,
        alignment: usize,
        f: impl FnOnce(&mut Parser<'a>) -> Result<R, DbusError>,
    ) -> Result<R, DbusError> {
        if self.depth >= MAX_DEPTH {
            return Err(DbusError::TooDeep);
        }
        let len = u32::from_ne_bytes(self.read_fixed()?) as usize;
        if len > MAX_ARRAY_LEN {
            return Err(DbusError::ArrayTooLong);
        }
        self.align_to(alignment)?;
        if self.buf.len() - self.pos < len {
            return Err(DbusError::UnexpectedEof);
        }
        let mut parser = Parser {
            buf: &self.buf[..self.pos + len],
            pos: self.pos,
            depth: self.depth + 1,
        };
        self.pos += len;
        f(&mut parser)
    }

    pub fn read_variant(&mut self) -> Result<Variant, DbusError> {
        let sig = self.read_signature()?;
        let (ty, rem) = DynamicType::from_signature(sig.as_bytes())?;
        if !rem.is_empty() {
            return Err(DbusError::TrailingVariantSignature);
        }
        self.nested(|parser| ty.parse(parser))
    }

    /// Reads a variant that must contain a `T`.
    pub fn read_variant_as<T: DbusType>(&mut self) -> Result<T, DbusError> {
        let sig = self.read_signature()?;
        let expected = T::signature();
        if sig.0 != expected {
            return Err(DbusError::SignatureMismatch {
                expected,
                actual: sig.0,
            });
        }
        T::unmarshal(self)
    }
}
