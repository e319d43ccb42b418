//! Reflection capability traits.
//!
//! Rust has no runtime reflection, so diffable types supply their own
//! metadata: a static table of attribute descriptors whose accessors are
//! plain function pointers over `&dyn Any`. The engine caches a per-type
//! table built from these descriptors, so the descriptor slices must be
//! `'static` and stable for the process lifetime.
//!
//! Type hierarchies flatten at registration: a type that embeds a "base"
//! struct lists the base's attributes after its own, and on a duplicate name
//! the earliest (most-derived) entry wins.

use std::any::Any;

use snapdiff_types::Value;

/// One state slot of a diffable type.
///
/// Visibility is not part of the descriptor: the implementation lives where
/// it can see private fields, so state discovery is presence-complete.
#[derive(Clone, Copy, Debug)]
pub struct FieldSpec {
    /// Attribute name.
    pub name: &'static str,
    /// Declared type of the slot.
    pub type_name: &'static str,
    /// `false` for slots injected by tooling (instrumentation, codegen);
    /// the metadata table excludes them.
    pub user_declared: bool,
    /// Read the slot from a receiver. Returns `None` when the receiver is
    /// not the expected type, which the engine treats as a fatal read error.
    pub get: fn(&dyn Any) -> Option<Value>,
}

impl FieldSpec {
    /// A user-declared state slot.
    pub const fn new(
        name: &'static str,
        type_name: &'static str,
        get: fn(&dyn Any) -> Option<Value>,
    ) -> Self {
        Self {
            name,
            type_name,
            user_declared: true,
            get,
        }
    }

    /// A tooling-injected slot, excluded from comparison.
    pub const fn synthetic(
        name: &'static str,
        type_name: &'static str,
        get: fn(&dyn Any) -> Option<Value>,
    ) -> Self {
        Self {
            name,
            type_name,
            user_declared: false,
            get,
        }
    }
}

/// One zero-argument method of a diffable type.
///
/// Only methods following the `get*` / `is*` naming conventions become
/// attributes; see the metadata table build rules in the cache module.
#[derive(Clone, Copy, Debug)]
pub struct MethodSpec {
    /// Method name as declared, e.g. `get_label` or `is_enabled`.
    pub method_name: &'static str,
    /// Declared return type.
    pub return_type: &'static str,
    /// `true` when the return type is boolean-shaped; required for `is*`
    /// methods to count as attributes.
    pub returns_bool: bool,
    /// Non-public methods never become attributes.
    pub public: bool,
    /// `false` for tooling-injected methods.
    pub user_declared: bool,
    /// Invoke the method on a receiver. Returns `None` when the receiver is
    /// not the expected type, which the engine treats as a fatal invocation
    /// error.
    pub invoke: fn(&dyn Any) -> Option<Value>,
}

impl MethodSpec {
    /// A public, user-declared method with every flag explicit.
    pub const fn new(
        method_name: &'static str,
        return_type: &'static str,
        returns_bool: bool,
        public: bool,
        user_declared: bool,
        invoke: fn(&dyn Any) -> Option<Value>,
    ) -> Self {
        Self {
            method_name,
            return_type,
            returns_bool,
            public,
            user_declared,
            invoke,
        }
    }

    /// A public `get*` accessor.
    pub const fn getter(
        method_name: &'static str,
        return_type: &'static str,
        invoke: fn(&dyn Any) -> Option<Value>,
    ) -> Self {
        Self::new(method_name, return_type, false, true, true, invoke)
    }

    /// A public boolean `is*` accessor.
    pub const fn predicate(
        method_name: &'static str,
        invoke: fn(&dyn Any) -> Option<Value>,
    ) -> Self {
        Self::new(method_name, "bool", true, true, true, invoke)
    }
}

/// State-based reflection: a type that exposes its held state for comparison.
///
/// Implementations list every state slot, private ones included, most-derived
/// first when flattening an embedded hierarchy.
pub trait StateReflect: Any {
    /// The runtime type name.
    fn type_name(&self) -> &'static str;

    /// The state slot descriptors, in declaration order.
    fn state_fields(&self) -> &'static [FieldSpec];

    /// The whole value, for scalar types only. Scalars short-circuit
    /// comparison: the two values are compared directly instead of
    /// attribute by attribute.
    fn as_scalar(&self) -> Option<Value> {
        None
    }

    /// The receiver as `Any`, for downcasting and type identity.
    fn as_any(&self) -> &dyn Any;
}

/// Accessor-based reflection: a type that exposes zero-argument methods for
/// comparison.
///
/// Implementations list their candidate methods; the engine applies the
/// `get*` / `is*` naming and visibility filters when building the metadata
/// table.
pub trait AccessorReflect: Any {
    /// The runtime type name.
    fn type_name(&self) -> &'static str;

    /// The zero-argument method descriptors, in declaration order.
    fn accessor_methods(&self) -> &'static [MethodSpec];

    /// The whole value, for scalar types only.
    fn as_scalar(&self) -> Option<Value> {
        None
    }

    /// The receiver as `Any`, for downcasting and type identity.
    fn as_any(&self) -> &dyn Any;
}

macro_rules! scalar_reflect {
    ($($ty:ty => $name:literal),* $(,)?) => {$(
        impl StateReflect for $ty {
            fn type_name(&self) -> &'static str {
                $name
            }

            fn state_fields(&self) -> &'static [FieldSpec] {
                &[]
            }

            fn as_scalar(&self) -> Option<Value> {
                Some(Value::from(*self))
            }

            fn as_any(&self) -> &dyn Any {
                self
            }
        }

        impl AccessorReflect for $ty {
            fn type_name(&self) -> &'static str {
                $name
            }

            fn accessor_methods(&self) -> &'static [MethodSpec] {
                &[]
            }

            fn as_scalar(&self) -> Option<Value> {
                Some(Value::from(*self))
            }

            fn as_any(&self) -> &dyn Any {
                self
            }
        }
    )*};
}

scalar_reflect! {
    bool => "bool",
    char => "char",
    i8 => "i8",
    i16 => "i16",
    i32 => "i32",
    i64 => "i64",
    isize => "isize",
    u8 => "u8",
    u16 => "u16",
    u32 => "u32",
    u64 => "u64",
    usize => "usize",
    f32 => "f32",
    f64 => "f64",
}

// Strings count as simple values: a differing pair reports one whole-value
// entry named "String" rather than a per-field breakdown.
impl StateReflect for String {
    fn type_name(&self) -> &'static str {
        "String"
    }

    fn state_fields(&self) -> &'static [FieldSpec] {
        &[]
    }

    fn as_scalar(&self) -> Option<Value> {
        Some(Value::Str(self.clone()))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl AccessorReflect for String {
    fn type_name(&self) -> &'static str {
        "String"
    }

    fn accessor_methods(&self) -> &'static [MethodSpec] {
        &[]
    }

    fn as_scalar(&self) -> Option<Value> {
        Some(Value::Str(self.clone()))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
