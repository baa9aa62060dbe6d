//! Enumerated constants at the boundary
//!
//! Enums cross as their declared underlying integer. Converting between
//! enums of different widths goes through [`EnumValue::narrow`], which keeps
//! the numeric value or fails. [`EnumValue::reinterpret`] is the separate,
//! cast-like path that keeps the low bits instead.

use std::fmt;

use crate::error::{BridgeError, Result};

/// Declared underlying storage of an enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnumWidth {
    /// One byte holding 0 or 1
    Bool,
    /// Signed 8-bit
    I8,
    /// Signed 16-bit
    I16,
    /// Signed 32-bit
    I32,
    /// Signed 64-bit
    I64,
}

impl EnumWidth {
    /// Storage size in bytes.
    pub fn bytes(self) -> usize {
        match self {
            EnumWidth::Bool | EnumWidth::I8 => 1,
            EnumWidth::I16 => 2,
            EnumWidth::I32 => 4,
            EnumWidth::I64 => 8,
        }
    }

    /// Name of the storage type.
    pub fn name(self) -> &'static str {
        match self {
            EnumWidth::Bool => "bool",
            EnumWidth::I8 => "i8",
            EnumWidth::I16 => "i16",
            EnumWidth::I32 => "i32",
            EnumWidth::I64 => "i64",
        }
    }

    /// Smallest representable value.
    pub fn min(self) -> i64 {
        match self {
            EnumWidth::Bool => 0,
            EnumWidth::I8 => i8::MIN as i64,
            EnumWidth::I16 => i16::MIN as i64,
            EnumWidth::I32 => i32::MIN as i64,
            EnumWidth::I64 => i64::MIN,
        }
    }

    /// Largest representable value.
    pub fn max(self) -> i64 {
        match self {
            EnumWidth::Bool => 1,
            EnumWidth::I8 => i8::MAX as i64,
            EnumWidth::I16 => i16::MAX as i64,
            EnumWidth::I32 => i32::MAX as i64,
            EnumWidth::I64 => i64::MAX,
        }
    }

    /// Whether `value` fits this storage.
    pub fn contains(self, value: i64) -> bool {
        (self.min()..=self.max()).contains(&value)
    }

    fn out_of_range(self, value: i64) -> BridgeError {
        BridgeError::OutOfRange {
            value,
            target: self.name().to_string(),
        }
    }
}

impl fmt::Display for EnumWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An enum value tagged with its declared width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnumValue {
    width: EnumWidth,
    value: i64,
}

impl EnumValue {
    /// Create a value, checking it fits `width`.
    pub fn new(width: EnumWidth, value: i64) -> Result<Self> {
        if !width.contains(value) {
            return Err(width.out_of_range(value));
        }
        Ok(Self { width, value })
    }

    /// Accept an enum coming from the managed side, where it may be null.
    pub fn from_boundary(value: Option<i64>, width: EnumWidth) -> Result<Self> {
        let value = value.ok_or_else(|| {
            BridgeError::NullArgument(format!("enum of underlying type {}", width))
        })?;
        Self::new(width, value)
    }

    /// The declared width.
    pub fn width(&self) -> EnumWidth {
        self.width
    }

    /// The numeric value.
    pub fn value(&self) -> i64 {
        self.value
    }

    /// Convert to `target`, keeping the numeric value.
    ///
    /// # Errors
    ///
    /// [`BridgeError::OutOfRange`] if the value is not representable in
    /// `target`.
    pub fn narrow(self, target: EnumWidth) -> Result<Self> {
        Self::new(target, self.value)
    }

    /// Cast to `target` keeping the bit pattern rather than the value.
    ///
    /// Integer targets keep the low bits, sign-extended. A `Bool` target is
    /// `1` for any non-zero source. Use [`EnumValue::narrow`] unless the cast
    /// is really what is wanted.
    pub fn reinterpret(self, target: EnumWidth) -> Self {
        let value = match target {
            EnumWidth::Bool => (self.value != 0) as i64,
            EnumWidth::I8 => self.value as i8 as i64,
            EnumWidth::I16 => self.value as i16 as i64,
            EnumWidth::I32 => self.value as i32 as i64,
            EnumWidth::I64 => self.value,
        };
        if value != self.value {
            log::trace!(
                "reinterpreted {} {} as {} {}",
                self.width,
                self.value,
                target,
                value
            );
        }
        Self {
            width: target,
            value,
        }
    }
}

impl fmt::Display for EnumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.width, self.value)
    }
}

/// A typed enum with a declared underlying width.
///
/// Usually implemented through [`native_enum!`](crate::native_enum).
pub trait NativeEnum: Sized + Copy {
    /// Declared underlying storage.
    const WIDTH: EnumWidth;

    /// Name of the enum type.
    const NAME: &'static str;

    /// The constant's numeric value.
    fn value(self) -> i64;

    /// The constant with numeric value `value`, if there is one.
    fn from_value(value: i64) -> Option<Self>;

    /// The constant as it crosses the boundary.
    fn to_native(self) -> EnumValue {
        EnumValue {
            width: Self::WIDTH,
            value: self.value(),
        }
    }

    /// Convert a boundary value into a constant of this enum.
    ///
    /// The value is narrowed to [`NativeEnum::WIDTH`] first.
    fn from_native(native: EnumValue) -> Result<Self> {
        let narrowed = native.narrow(Self::WIDTH)?;
        Self::from_value(narrowed.value()).ok_or_else(|| BridgeError::OutOfRange {
            value: narrowed.value(),
            target: Self::NAME.to_string(),
        })
    }
}

/// Declare an enum with a fixed underlying width.
///
/// ```
/// use bridgework::enums::{EnumWidth, NativeEnum};
/// use bridgework::native_enum;
///
/// native_enum! {
///     pub enum Color: I16 {
///         Red = 1,
///         Green = 2,
///     }
/// }
///
/// assert_eq!(Color::WIDTH, EnumWidth::I16);
/// assert_eq!(Color::Green.value(), 2);
/// assert_eq!(Color::from_value(1), Some(Color::Red));
/// ```
#[macro_export]
macro_rules! native_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident : $width:ident {
            $($variant:ident = $value:expr),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($variant),+
        }

        impl $crate::enums::NativeEnum for $name {
            const WIDTH: $crate::enums::EnumWidth = $crate::enums::EnumWidth::$width;
            const NAME: &'static str = stringify!($name);

            fn value(self) -> i64 {
                match self {
                    $($name::$variant => $value),+
                }
            }

            fn from_value(value: i64) -> Option<Self> {
                $(if value == $value {
                    return Some($name::$variant);
                })+
                None
            }
        }
    };
}
