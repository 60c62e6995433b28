// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identifier newtypes and prepid composition.

/// Width of the zero-padded serial suffix of a prepid.
pub const SERIAL_WIDTH: usize = 5;

/// Define a newtype ID wrapper around `String`.
///
/// Generates `new()`, `as_str()`, `Display`, `From<String>`, `From<&str>`,
/// `PartialEq<str>`, `PartialEq<&str>`, and `Borrow<str>` implementations.
///
/// ```ignore
/// define_id! {
///     /// Doc comment for the ID type.
///     pub struct MyId;
/// }
/// ```
#[macro_export]
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[derive(serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
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
    };
}

define_id! {
    /// Globally unique, immutable identifier of a RelVal: `<namespace>-<serial>`.
    #[derive(Default)]
    pub struct RelvalId;
}

impl RelvalId {
    /// Compose an id from its namespace and serial, zero-padding the serial.
    pub fn compose(namespace: &str, serial: u32) -> Self {
        Self(format!("{}-{:0width$}", namespace, serial, width = SERIAL_WIDTH))
    }

    /// Split into `(namespace, serial)`.
    ///
    /// Returns `None` when the id has no numeric `-<serial>` suffix.
    pub fn split(&self) -> Option<(&str, u32)> {
        let (namespace, serial) = self.0.rsplit_once('-')?;
        if namespace.is_empty() || serial.is_empty() || !serial.bytes().all(|b| b.is_ascii_digit())
        {
            return None;
        }
        serial.parse().ok().map(|n| (namespace, n))
    }

    pub fn namespace(&self) -> Option<&str> {
        self.split().map(|(ns, _)| ns)
    }

    pub fn serial(&self) -> Option<u32> {
        self.split().map(|(_, n)| n)
    }
}

/// Build the namespace part of a prepid from the campaign fields.
///
/// Leading/trailing separators are trimmed so an empty batch or workflow
/// name does not leave dangling `-` or `_`.
pub fn prepid_namespace(cmssw_release: &str, batch_name: &str, workflow_name: &str) -> String {
    format!("{}__{}-{}", cmssw_release, batch_name, workflow_name)
        .trim_matches(|c| c == '-' || c == '_')
        .to_string()
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
