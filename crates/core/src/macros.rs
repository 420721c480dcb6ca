// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Declarative macros shared by the record types.
//!
//! - [`simple_display!`]: `Display` for enums whose variants print as fixed strings
//! - [`builder!`]: test-only builder for a record struct
//! - [`setters!`]: chained setters inside an existing `impl`

/// `Display` for an enum whose variants each render as a fixed string.
///
/// ```ignore
/// crate::simple_display! {
///     SnapshotKind {
///         DataStore => "data-store",
///         Configuration => "configuration",
///     }
/// }
/// ```
#[macro_export]
macro_rules! simple_display {
    ($enum:ty { $( $variant:ident => $text:expr ),+ $(,)? }) => {
        impl std::fmt::Display for $enum {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let text = match self {
                    $( Self::$variant => $text, )+
                };
                f.write_str(text)
            }
        }
    };
}

/// Test builder for a record: struct, `Default`, one setter per field and
/// `build()`, plus `Target::builder()`.
///
/// Compiled only for tests or with the `test-support` feature.
///
/// - `into { field: Type = default }`: setter takes `impl Into<Type>`
/// - `set { field: Type = default }`: setter takes `Type`
/// - `option { field: Type = default }`: target field is `Option<Type>`
///
/// ```ignore
/// crate::builder! {
///     pub struct PointBuilder => RollbackPoint {
///         into { environment: String = "staging" }
///         set { created_at_ms: u64 = 1_000_000 }
///         option { description: String = None }
///     }
/// }
/// ```
#[macro_export]
macro_rules! builder {
    (
        pub struct $builder:ident => $target:ident {
            into { $( $into_field:ident : $into_ty:ty = $into_default:expr ),* $(,)? }
            set { $( $set_field:ident : $set_ty:ty = $set_default:expr ),* $(,)? }
            option { $( $opt_field:ident : $opt_ty:ty = $opt_default:expr ),* $(,)? }
        }
    ) => {
        #[cfg(any(test, feature = "test-support"))]
        pub struct $builder {
            $( $into_field: $into_ty, )*
            $( $set_field: $set_ty, )*
            $( $opt_field: Option<$opt_ty>, )*
        }

        #[cfg(any(test, feature = "test-support"))]
        impl Default for $builder {
            fn default() -> Self {
                Self {
                    $( $into_field: $into_default.into(), )*
                    $( $set_field: $set_default, )*
                    $( $opt_field: $opt_default, )*
                }
            }
        }

        #[cfg(any(test, feature = "test-support"))]
        impl $builder {
            $crate::setters! {
                into { $( $into_field: $into_ty ),* }
                set { $( $set_field: $set_ty ),* }
                option { $( $opt_field: $opt_ty ),* }
            }

            pub fn build(self) -> $target {
                $target {
                    $( $into_field: self.$into_field, )*
                    $( $set_field: self.$set_field, )*
                    $( $opt_field: self.$opt_field, )*
                }
            }
        }

        #[cfg(any(test, feature = "test-support"))]
        impl $target {
            pub fn builder() -> $builder {
                $builder::default()
            }
        }
    };
}

/// Chained setter methods, for use inside an `impl` block.
///
/// Groups are optional and follow [`builder!`]: `into`, `set`, `option`.
///
/// ```ignore
/// impl RetentionConfig {
///     rb_core::setters! {
///         set { points: usize, executions: usize }
///     }
/// }
/// ```
#[macro_export]
macro_rules! setters {
    (
        $( into { $( $into_field:ident : $into_ty:ty ),* $(,)? } )?
        $( set { $( $set_field:ident : $set_ty:ty ),* $(,)? } )?
        $( option { $( $opt_field:ident : $opt_ty:ty ),* $(,)? } )?
    ) => {
        $($(
            pub fn $into_field(mut self, value: impl Into<$into_ty>) -> Self {
                self.$into_field = value.into();
                self
            }
        )*)?
        $($(
            pub fn $set_field(mut self, value: $set_ty) -> Self {
                self.$set_field = value;
                self
            }
        )*)?
        $($(
            pub fn $opt_field(mut self, value: impl Into<$opt_ty>) -> Self {
                self.$opt_field = Some(value.into());
                self
            }
        )*)?
    };
}
