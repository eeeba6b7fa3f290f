/// Declares a small integer-tagged enum together with its `nom`-based `unpack`/`pack` pair and
/// an `Unknown` fallback variant, so that an unrecognised tag round-trips instead of failing to
/// parse. Used for the handful of single-byte/short tag fields in the wire format (e.g. the
/// transport wrapper's payload kind) that don't carry a variant-specific body — control
/// subtypes carry bodies and are handled by a hand-written match instead (see `ilnp_proto`).
#[macro_export]
macro_rules! tag_enum {
    (
        $(#[$outer:meta])*
        $vis:vis enum $name:ident: $from:ident($T:ty) {
            $(
                $(#[$inner:ident $($args:tt)*])*
                $value_name:ident = $value:expr
            ),* $(,)?
        }
    ) => {
        $(#[$outer])*
        $vis enum $name {
            $(
                $(#[$inner $($args)*])*
                $value_name,
            )*
            Unknown($T)
        }

        impl $name {
            pub fn unpack(input: &[u8]) -> nom::IResult<&[u8], Self> {
                let (input, value) = nom::number::complete::$from(input)?;
                Ok((input, match value {
                    $(
                        $value => Self::$value_name,
                    )*
                    _ => Self::Unknown(value)
                }))
            }

            pub fn pack(&self) -> alloc::vec::Vec<u8> {
                match self {
                    $(
                        Self::$value_name => $value,
                    )*
                    Self::Unknown(value) => *value
                }.to_be_bytes().to_vec()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, formatter: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                match self {
                    $(
                        Self::$value_name => write!(formatter, stringify!($value_name)),
                    )*
                    Self::Unknown(value) => write!(formatter, "Unknown({})", value)
                }
            }
        }

        impl From<$T> for $name {
            fn from(value: $T) -> Self {
                match value {
                    $(
                        $value => Self::$value_name,
                    )*
                    _ => Self::Unknown(value)
                }
            }
        }

        impl From<$name> for $T {
            fn from(value: $name) -> Self {
                match value {
                    $(
                        $name::$value_name => $value,
                    )*
                    $name::Unknown(value) => value
                }
            }
        }
    };
}
