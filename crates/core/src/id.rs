// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identifier newtypes

/// Characters used for generated id suffixes.
///
/// Lowercase alphanumerics only, so ids survive shells, file names and
/// case-insensitive terminals, and prefixes typed by operators stay unambiguous.
pub const ID_ALPHABET: [char; 36] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i',
    'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];

/// Length of the random part of a generated id.
pub const ID_SUFFIX_LEN: usize = 16;

/// Returns a string slice truncated to at most `n` characters.
pub fn short(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((end, _)) => &s[..end],
        None => s,
    }
}

/// Random id suffix drawn from [`ID_ALPHABET`].
pub fn random_suffix() -> String {
    nanoid::nanoid!(ID_SUFFIX_LEN, &ID_ALPHABET)
}

/// Define a prefixed id newtype backed by `SmolStr`.
///
/// Generated ids are `{prefix}{suffix}`: a 4 character type tag such as
/// `rbp-` followed by [`ID_SUFFIX_LEN`] characters of [`ID_ALPHABET`]. They
/// stay within `SmolStr`'s inline capacity. Ids read from disk are taken
/// verbatim.
///
/// The expansion only needs `serde` in the calling crate.
///
/// ```ignore
/// rb_core::define_id! {
///     /// Unique identifier for a rollback point.
///     pub struct PointId("rbp-");
/// }
/// ```
#[macro_export]
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident($prefix:literal);
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[derive(serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub $crate::__private::SmolStr);

        impl $name {
            pub const PREFIX: &'static str = $prefix;

            pub fn new() -> Self {
                let suffix = $crate::id::random_suffix();
                let mut id = String::with_capacity(Self::PREFIX.len() + suffix.len());
                id.push_str(Self::PREFIX);
                id.push_str(&suffix);
                Self($crate::__private::SmolStr::new(id))
            }

            /// Wrap an existing id, e.g. one typed by an operator.
            pub fn from_string(id: impl Into<$crate::__private::SmolStr>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// The id without its type prefix.
            pub fn suffix(&self) -> &str {
                self.0.strip_prefix(Self::PREFIX).unwrap_or(&self.0)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::from_string(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self::from_string(s)
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;

            fn deref(&self) -> &str {
                &self.0
            }
        }
    };
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
