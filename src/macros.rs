/// Logs an error and terminates the process.
#[macro_export]
macro_rules! fatal {
    ($($arg:tt)+) => {{
        log::error!($($arg)+);
        std::process::exit(1);
    }};
}

/// Declares a struct that travels on the bus as a D-Bus struct.
///
/// Fields are encoded and decoded in declaration order and the signature is
/// the concatenation of the field signatures inside `(` and `)`.
#[macro_export]
macro_rules! dbus_struct {
    (
        $(#[$attr:meta])*
        pub struct $name:ident {
            $(
                $(#[$fattr:meta])*
                pub $field:ident: $ty:ty,
            )*
        }
    ) => {
        $(#[$attr])*
        pub struct $name {
            $(
                $(#[$fattr])*
                pub $field: $ty,
            )*
        }

        impl $crate::dbus::DbusType for $name {
            const ALIGNMENT: usize = 8;

            fn write_signature(w: &mut String) {
                w.push('(');
                $(
                    <$ty as $crate::dbus::DbusType>::write_signature(w);
                )*
                w.push(')');
            }

            fn marshal(&self, fmt: &mut $crate::dbus::Formatter) {
                fmt.pad_to(8);
                $(
                    <$ty as $crate::dbus::DbusType>::marshal(&self.$field, fmt);
                )*
            }

            fn unmarshal(
                parser: &mut $crate::dbus::Parser,
            ) -> Result<Self, $crate::dbus::DbusError> {
                parser.align_to(8)?;
                Ok(Self {
                    $(
                        $field: <$ty as $crate::dbus::DbusType>::unmarshal(parser)?,
                    )*
                })
            }
        }
    };
}
