//! Field access for bindable types.
//!
//! A type that can be the target of a rule implements [`Bind`], usually via
//! the [`bindable!`](crate::bindable) macro. The engine only ever sees it as
//! a `dyn Instance` and reaches its fields through `dyn Slot`, so rule sets
//! can mix any number of target types.

use alloc::boxed::Box;
use alloc::borrow::Cow;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::any::Any;
use core::fmt;

use crate::rule::Target;
use crate::value::{Number, Value};

/// How a single value of a field is represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repr {
    /// `String`
    String,
    /// `bool`
    Bool,
    /// A primitive integer
    Integer {
        /// `true` for `i*` types
        signed: bool,
        /// Width in bits
        bits: u8,
    },
    /// `f32` or `f64`
    Float {
        /// Width in bits
        bits: u8,
    },
    /// A bindable type, by name
    Object(&'static str),
}

impl fmt::Display for Repr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Repr::String => f.write_str("String"),
            Repr::Bool => f.write_str("bool"),
            Repr::Integer { signed: true, bits } => write!(f, "i{bits}"),
            Repr::Integer { signed: false, bits } => write!(f, "u{bits}"),
            Repr::Float { bits } => write!(f, "f{bits}"),
            Repr::Object(name) => f.write_str(name),
        }
    }
}

/// How many values a field holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    /// Exactly one
    Single,
    /// `Option<T>`
    Optional,
    /// `Vec<T>`
    Sequence,
}

/// The declared type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Kind {
    /// Representation of each value
    pub repr: Repr,
    /// Cardinality
    pub container: Container,
}

impl Kind {
    /// A plain `T` field.
    pub const fn single(repr: Repr) -> Kind {
        Kind {
            repr,
            container: Container::Single,
        }
    }

    /// An `Option<T>` field.
    pub const fn optional(repr: Repr) -> Kind {
        Kind {
            repr,
            container: Container::Optional,
        }
    }

    /// A `Vec<T>` field.
    pub const fn sequence(repr: Repr) -> Kind {
        Kind {
            repr,
            container: Container::Sequence,
        }
    }

    /// Name of the bindable type this field holds, if any.
    pub fn object_type(&self) -> Option<&'static str> {
        match self.repr {
            Repr::Object(name) => Some(name),
            _ => None,
        }
    }

    /// Returns `true` for `Vec<T>` fields.
    pub fn is_sequence(&self) -> bool {
        self.container == Container::Sequence
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.container {
            Container::Single => write!(f, "{}", self.repr),
            Container::Optional => write!(f, "Option<{}>", self.repr),
            Container::Sequence => write!(f, "Vec<{}>", self.repr),
        }
    }
}

/// Static description of a bindable type.
#[derive(Debug)]
pub struct Shape {
    /// The type's name
    pub type_identifier: &'static str,
    /// Fields in declaration order
    pub fields: &'static [FieldShape],
}

impl Shape {
    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&'static FieldShape> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// All field names in declaration order.
    pub fn field_names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|field| field.name).collect()
    }
}

/// Static description of one field.
#[derive(Debug, Clone, Copy)]
pub struct FieldShape {
    /// Field name as written in the struct
    pub name: &'static str,
    /// Declared type
    pub kind: Kind,
    /// The bindable type the field holds, for constructing its values
    pub element: fn() -> Option<Target>,
}

impl FieldShape {
    /// The bindable type the field holds, if any.
    pub fn element_target(&self) -> Option<Target> {
        (self.element)()
    }
}

/// Why a value could not be stored in a slot. The engine adds the location.
#[derive(Debug, Clone, PartialEq)]
pub enum Mismatch {
    /// The value has the wrong JSON kind (or the child has the wrong type)
    Type {
        /// What the slot holds
        expected: Kind,
        /// What was offered
        got: &'static str,
    },
    /// The number does not fit the slot's integer width
    OutOfRange {
        /// What the slot holds
        expected: Kind,
        /// The number as written
        value: String,
    },
}

/// A value of a bindable type, seen through its fields.
pub trait Instance: Any {
    /// The type's static description.
    fn shape(&self) -> &'static Shape;

    /// The slot for `field`, if the type has one.
    fn slot(&self, field: &str) -> Option<&dyn Slot>;

    /// Mutable access to the slot for `field`.
    fn slot_mut(&mut self, field: &str) -> Option<&mut dyn Slot>;

    /// Upcast for downcasting to the concrete type.
    fn as_any(&self) -> &dyn Any;

    /// Owned upcast for downcasting to the concrete type.
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<'a> dyn Instance + 'a {
    /// Borrow the concrete value, if it is a `T`.
    pub fn downcast_ref<T: Bind>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Take the concrete value, if it is a `T`.
    pub fn downcast<T: Bind>(self: Box<Self>) -> Option<T> {
        self.into_any().downcast::<T>().ok().map(|boxed| *boxed)
    }

    /// Returns `true` if the concrete value is a `T`.
    pub fn is<T: Bind>(&self) -> bool {
        self.as_any().is::<T>()
    }
}

impl<'a> fmt::Debug for dyn Instance + 'a {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shape = self.shape();
        let mut s = f.debug_struct(shape.type_identifier);
        for field in shape.fields {
            if let Some(slot) = self.slot(field.name) {
                s.field(field.name, &SlotDebug(slot));
            }
        }
        s.finish()
    }
}

struct SlotDebug<'a>(&'a dyn Slot);

impl fmt::Debug for SlotDebug<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = self.0.kind();
        if kind.object_type().is_some() {
            let children = self.0.children();
            return match (kind.container, children.first()) {
                (Container::Sequence, _) => f.debug_list().entries(children.iter()).finish(),
                (_, Some(child)) => fmt::Debug::fmt(child, f),
                (_, None) => f.write_str("null"),
            };
        }
        match self.0.to_value() {
            Some(value) => write!(f, "{value}"),
            None => f.write_str("?"),
        }
    }
}

/// A type rules can construct. Implemented by [`bindable!`](crate::bindable).
pub trait Bind: Instance + Default + Sized {
    /// The type's static description.
    const SHAPE: &'static Shape;
}

/// Default-construct a `T` behind the dynamic interface.
pub fn construct<T: Bind>() -> Box<dyn Instance> {
    Box::new(T::default())
}

/// A type that can be declared as a field of a bindable type.
pub trait Field {
    /// The field's declared type.
    const KIND: Kind;

    /// Target for the bindable type held, if any.
    const ELEMENT: fn() -> Option<Target>;
}

/// A settable field.
pub trait Slot {
    /// The field's declared type.
    fn kind(&self) -> Kind;

    /// Coerce `value` and store it, replacing what was there.
    fn assign(&mut self, value: &Value<'_>) -> Result<(), Mismatch>;

    /// Coerce `value` and append it to a sequence.
    fn push(&mut self, value: &Value<'_>) -> Result<(), Mismatch> {
        Err(Mismatch::Type {
            expected: self.kind(),
            got: value.kind_name(),
        })
    }

    /// Store a constructed child (appending, for sequences).
    fn link(&mut self, child: Box<dyn Instance>) -> Result<(), Mismatch>;

    /// Reset to the empty state: default, `None` or no elements.
    fn clear(&mut self);

    /// The stored scalar value(s) as JSON, or `None` for object fields.
    fn to_value(&self) -> Option<Value<'static>>;

    /// Child instances held by an object field.
    fn children(&self) -> Vec<&dyn Instance>;
}

/// A type that can appear on its own, inside `Option`, or inside `Vec`.
pub trait Element: Default + Sized + 'static {
    /// Representation of one value.
    const REPR: Repr;

    /// Coerce a JSON scalar.
    fn decode(value: &Value<'_>) -> Result<Self, Mismatch> {
        Err(Mismatch::Type {
            expected: Kind::single(Self::REPR),
            got: value.kind_name(),
        })
    }

    /// Take ownership of a constructed child.
    fn adopt(child: Box<dyn Instance>) -> Result<Self, Mismatch> {
        Err(Mismatch::Type {
            expected: Kind::single(Self::REPR),
            got: child.shape().type_identifier,
        })
    }

    /// The value as JSON, or `None` for bindable types.
    fn encode(&self) -> Option<Value<'static>> {
        None
    }

    /// The value as an instance, for bindable types.
    fn as_instance(&self) -> Option<&dyn Instance> {
        None
    }

    /// Target that constructs values of this type, for bindable types.
    fn target() -> Option<Target> {
        None
    }
}

impl Element for String {
    const REPR: Repr = Repr::String;

    fn decode(value: &Value<'_>) -> Result<Self, Mismatch> {
        match value {
            Value::String(s) => Ok(s.to_string()),
            other => Err(Mismatch::Type {
                expected: Kind::single(Self::REPR),
                got: other.kind_name(),
            }),
        }
    }

    fn encode(&self) -> Option<Value<'static>> {
        Some(Value::String(Cow::Owned(self.clone())))
    }
}

impl Element for bool {
    const REPR: Repr = Repr::Bool;

    fn decode(value: &Value<'_>) -> Result<Self, Mismatch> {
        match value {
            Value::Bool(b) => Ok(*b),
            other => Err(Mismatch::Type {
                expected: Kind::single(Self::REPR),
                got: other.kind_name(),
            }),
        }
    }

    fn encode(&self) -> Option<Value<'static>> {
        Some(Value::Bool(*self))
    }
}

macro_rules! impl_integer_element {
    ($($ty:ty => $signed:literal),* $(,)?) => {$(
        impl Element for $ty {
            const REPR: Repr = Repr::Integer {
                signed: $signed,
                bits: <$ty>::BITS as u8,
            };

            fn decode(value: &Value<'_>) -> Result<Self, Mismatch> {
                let expected = Kind::single(Self::REPR);
                let Value::Number(n) = value else {
                    return Err(Mismatch::Type {
                        expected,
                        got: value.kind_name(),
                    });
                };
                let Some(integer) = n.as_integer() else {
                    return Err(Mismatch::Type {
                        expected,
                        got: "number with fractional part",
                    });
                };
                <$ty>::try_from(integer).map_err(|_| Mismatch::OutOfRange {
                    expected,
                    value: n.to_string(),
                })
            }

            fn encode(&self) -> Option<Value<'static>> {
                let n = i128::from(*self);
                Some(Value::Number(if n < 0 {
                    Number::I64(n as i64)
                } else {
                    Number::U64(n as u64)
                }))
            }
        }
    )*};
}

impl_integer_element! {
    i8 => true,
    i16 => true,
    i32 => true,
    i64 => true,
    u8 => false,
    u16 => false,
    u32 => false,
    u64 => false,
}

macro_rules! impl_float_element {
    ($($ty:ty => $bits:literal),* $(,)?) => {$(
        impl Element for $ty {
            const REPR: Repr = Repr::Float { bits: $bits };

            fn decode(value: &Value<'_>) -> Result<Self, Mismatch> {
                let expected = Kind::single(Self::REPR);
                let Value::Number(n) = value else {
                    return Err(Mismatch::Type {
                        expected,
                        got: value.kind_name(),
                    });
                };
                let wide = n.as_f64();
                let narrowed = wide as $ty;
                if narrowed.is_infinite() && wide.is_finite() {
                    return Err(Mismatch::OutOfRange {
                        expected,
                        value: n.to_string(),
                    });
                }
                Ok(narrowed)
            }

            fn encode(&self) -> Option<Value<'static>> {
                Some(Value::Number(Number::F64(f64::from(*self))))
            }
        }
    )*};
}

impl_float_element! {
    f32 => 32,
    f64 => 64,
}

impl<T: Element> Element for Box<T> {
    const REPR: Repr = T::REPR;

    fn decode(value: &Value<'_>) -> Result<Self, Mismatch> {
        T::decode(value).map(Box::new)
    }

    fn adopt(child: Box<dyn Instance>) -> Result<Self, Mismatch> {
        T::adopt(child).map(Box::new)
    }

    fn encode(&self) -> Option<Value<'static>> {
        (**self).encode()
    }

    fn as_instance(&self) -> Option<&dyn Instance> {
        (**self).as_instance()
    }

    fn target() -> Option<Target> {
        T::target()
    }
}

impl<T: Element> Field for T {
    const KIND: Kind = Kind::single(T::REPR);
    const ELEMENT: fn() -> Option<Target> = T::target;
}

impl<T: Element> Field for Option<T> {
    const KIND: Kind = Kind::optional(T::REPR);
    const ELEMENT: fn() -> Option<Target> = T::target;
}

impl<T: Element> Field for Vec<T> {
    const KIND: Kind = Kind::sequence(T::REPR);
    const ELEMENT: fn() -> Option<Target> = T::target;
}

impl<T: Element> Slot for T {
    fn kind(&self) -> Kind {
        <T as Field>::KIND
    }

    fn assign(&mut self, value: &Value<'_>) -> Result<(), Mismatch> {
        *self = match value {
            Value::Null => T::default(),
            value => T::decode(value)?,
        };
        Ok(())
    }

    fn link(&mut self, child: Box<dyn Instance>) -> Result<(), Mismatch> {
        *self = T::adopt(child)?;
        Ok(())
    }

    fn clear(&mut self) {
        *self = T::default();
    }

    fn to_value(&self) -> Option<Value<'static>> {
        self.encode()
    }

    fn children(&self) -> Vec<&dyn Instance> {
        self.as_instance().into_iter().collect()
    }
}

impl<T: Element> Slot for Option<T> {
    fn kind(&self) -> Kind {
        <Self as Field>::KIND
    }

    fn assign(&mut self, value: &Value<'_>) -> Result<(), Mismatch> {
        *self = match value {
            Value::Null => None,
            value => Some(T::decode(value)?),
        };
        Ok(())
    }

    fn link(&mut self, child: Box<dyn Instance>) -> Result<(), Mismatch> {
        *self = Some(T::adopt(child)?);
        Ok(())
    }

    fn clear(&mut self) {
        *self = None;
    }

    fn to_value(&self) -> Option<Value<'static>> {
        match self {
            Some(value) => value.encode(),
            None => Some(Value::Null),
        }
    }

    fn children(&self) -> Vec<&dyn Instance> {
        self.as_ref()
            .and_then(|value| value.as_instance())
            .into_iter()
            .collect()
    }
}

impl<T: Element> Slot for Vec<T> {
    fn kind(&self) -> Kind {
        <Self as Field>::KIND
    }

    fn assign(&mut self, value: &Value<'_>) -> Result<(), Mismatch> {
        match value {
            Value::Null => self.clear(),
            Value::Array(items) => {
                *self = items.iter().map(T::decode).collect::<Result<_, _>>()?;
            }
            other => {
                return Err(Mismatch::Type {
                    expected: <Self as Field>::KIND,
                    got: other.kind_name(),
                });
            }
        }
        Ok(())
    }

    fn push(&mut self, value: &Value<'_>) -> Result<(), Mismatch> {
        Vec::push(self, T::decode(value)?);
        Ok(())
    }

    fn link(&mut self, child: Box<dyn Instance>) -> Result<(), Mismatch> {
        Vec::push(self, T::adopt(child)?);
        Ok(())
    }

    fn clear(&mut self) {
        Vec::clear(self);
    }

    fn to_value(&self) -> Option<Value<'static>> {
        self.iter()
            .map(Element::encode)
            .collect::<Option<Vec<_>>>()
            .map(Value::Array)
    }

    fn children(&self) -> Vec<&dyn Instance> {
        self.iter().filter_map(Element::as_instance).collect()
    }
}

/// Declare a struct whose fields rules can bind.
///
/// Every field must be a [`Field`]: a scalar, another bindable type, or an
/// `Option`, `Vec` or `Box` of those. The struct must implement `Default`.
///
/// ```
/// json_bind::bindable! {
///     #[derive(Debug, Default, PartialEq)]
///     pub struct Point {
///         pub x: i32,
///         pub y: i32,
///     }
/// }
/// ```
#[macro_export]
macro_rules! bindable {
    ($(
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$fmeta:meta])*
                $fvis:vis $field:ident : $ty:ty
            ),* $(,)?
        }
    )*) => {$(
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[$fmeta])*
                $fvis $field: $ty,
            )*
        }

        impl $crate::Bind for $name {
            const SHAPE: &'static $crate::Shape = &$crate::Shape {
                type_identifier: ::core::stringify!($name),
                fields: &[$(
                    $crate::FieldShape {
                        name: ::core::stringify!($field),
                        kind: <$ty as $crate::Field>::KIND,
                        element: <$ty as $crate::Field>::ELEMENT,
                    },
                )*],
            };
        }

        impl $crate::Instance for $name {
            fn shape(&self) -> &'static $crate::Shape {
                <Self as $crate::Bind>::SHAPE
            }

            #[allow(unused_variables)]
            fn slot(&self, field: &str) -> ::core::option::Option<&dyn $crate::Slot> {
                $(
                    if field == ::core::stringify!($field) {
                        return ::core::option::Option::Some(&self.$field as &dyn $crate::Slot);
                    }
                )*
                ::core::option::Option::None
            }

            #[allow(unused_variables)]
            fn slot_mut(&mut self, field: &str) -> ::core::option::Option<&mut dyn $crate::Slot> {
                $(
                    if field == ::core::stringify!($field) {
                        return ::core::option::Option::Some(&mut self.$field as &mut dyn $crate::Slot);
                    }
                )*
                ::core::option::Option::None
            }

            fn as_any(&self) -> &dyn ::core::any::Any {
                self
            }

            fn into_any(
                self: $crate::__private::Box<Self>,
            ) -> $crate::__private::Box<dyn ::core::any::Any> {
                self
            }
        }

        impl $crate::Element for $name {
            const REPR: $crate::Repr = $crate::Repr::Object(::core::stringify!($name));

            fn adopt(
                child: $crate::__private::Box<dyn $crate::Instance>,
            ) -> ::core::result::Result<Self, $crate::Mismatch> {
                let got = child.shape().type_identifier;
                match child.into_any().downcast::<Self>() {
                    ::core::result::Result::Ok(this) => ::core::result::Result::Ok(*this),
                    ::core::result::Result::Err(_) => {
                        ::core::result::Result::Err($crate::Mismatch::Type {
                            expected: $crate::Kind::single(
                                <Self as $crate::Element>::REPR,
                            ),
                            got,
                        })
                    }
                }
            }

            fn as_instance(&self) -> ::core::option::Option<&dyn $crate::Instance> {
                ::core::option::Option::Some(self)
            }

            fn target() -> ::core::option::Option<$crate::Target> {
                ::core::option::Option::Some($crate::Target::of::<Self>())
            }
        }
    )*};
}
