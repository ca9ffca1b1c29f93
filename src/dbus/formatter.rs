use crate::dbus::{DbusType, Formatter, Variant};

impl<'a> Formatter<'a> {
    pub fn new(buf: &'a mut Vec<u8>) -> Self {
        Self { buf }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn marshal<T: DbusType>(&mut self, t: &T) {
        t.marshal(self);
    }

    pub fn pad_to(&mut self, n: usize) {
        let pad = self.buf.len().wrapping_neg() & (n - 1);
        self.buf.resize(self.buf.len() + pad, 0);
    }

    /// Writes a basic value of `N` bytes, aligned to `N`.
    pub fn write_fixed<const N: usize>(&mut self, bytes: &[u8; N]) {
        self.pad_to(N);
        self.buf.extend_from_slice(bytes);
    }

    pub(super) fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_str(&mut self, s: &str) {
        debug_assert!(s.len() <= u32::MAX as usize, "string is longer than 4 GiB");
        self.write_fixed(&(s.len() as u32).to_ne_bytes());
        self.buf.extend_from_slice(s.as_bytes());
        self.buf.push(0);
    }

    /// Writes a signature. Signatures are at most 255 bytes long.
    pub fn write_signature(&mut self, s: &str) {
        debug_assert!(s.len() <= 255, "signature `{}` is longer than 255 bytes", s);
        self.buf.push(s.len() as u8);
        self.buf.extend_from_slice(s.as_bytes());
        self.buf.push(0);
    }

    pub fn write_array<T: DbusType>(&mut self, elements: &[T]) {
        self.write_array_with(T::ALIGNMENT, |fmt| T::marshal_elements(elements, fmt))
    }

    /// Writes an array whose elements are produced by `f`.
    ///
    /// The padding to `alignment` is written even if `f` writes nothing.
    pub fn write_array_with<R>(&mut self, alignment: usize, f: impl FnOnce(&mut Self) -> R) -> R {
        self.pad_to(4);
        let len_pos = self.buf.len();
        self.buf.extend_from_slice(&[0; 4]);
        self.pad_to(alignment);
        let start = self.buf.len();
        let res = f(self);
        let len = (self.buf.len() - start) as u32;
        self.buf[len_pos..len_pos + 4].copy_from_slice(&len.to_ne_bytes());
        res
    }

    pub fn write_variant(&mut self, v: &Variant) {
        let mut sig = String::new();
        v.write_signature(&mut sig);
        self.write_signature(&sig);
        v.marshal_value(self);
    }

    /// Writes `value` as a variant carrying the static signature of `T`.
    pub fn write_variant_as<T: DbusType>(&mut self, value: &T) {
        self.write_signature(&T::signature());
        value.marshal(self);
    }
}
