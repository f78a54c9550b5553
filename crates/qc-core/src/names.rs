//! Strongly-typed names for mapped types and their members.
//!
//! Query trees, mapping metadata and the IR all refer to runtime types and
//! members by name. Wrapping those names keeps a member name from being
//! passed where a type name is expected.

/// Define a transparent string name wrapper.
///
/// Generates the struct plus `new`, `try_new`, `as_str`, `Display`,
/// `AsRef<str>`, `Borrow<str>`, `From<&str>` and string comparisons.
macro_rules! define_name {
    (
        $(#[$meta:meta])*
        $vis:vis struct $Name:ident;
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
        )]
        #[serde(transparent)]
        $vis struct $Name(String);

        impl $Name {
            /// Create a new name. Empty names are accepted in release builds
            /// but trip a debug assertion.
            pub fn new(name: impl Into<String>) -> Self {
                let s = name.into();
                debug_assert!(!s.is_empty(), concat!(stringify!($Name), " must not be empty"));
                Self(s)
            }

            /// Create a new name, returning `None` if it is empty.
            pub fn try_new(name: impl Into<String>) -> Option<Self> {
                let s = name.into();
                if s.is_empty() {
                    None
                } else {
                    Some(Self(s))
                }
            }

            /// Borrow the name as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $Name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $Name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::borrow::Borrow<str> for $Name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $Name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }

        impl PartialEq<str> for $Name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $Name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }
    };
}

define_name! {
    /// Name of a mapped runtime type (an entity, or a subtype in an
    /// inheritance hierarchy).
    pub struct TypeName;
}

define_name! {
    /// Name of a data member or association on a mapped type, or of a member
    /// of a constructed record.
    pub struct MemberName;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_try_new_rejects_empty() {
        assert!(TypeName::try_new("").is_none());
        assert_eq!(TypeName::try_new("Customer").unwrap(), "Customer");
    }

    #[test]
    fn test_borrow_allows_str_lookup() {
        let mut map = HashMap::new();
        map.insert(MemberName::new("Id"), 1);
        assert_eq!(map.get("Id"), Some(&1));
    }

    #[test]
    fn test_serde_is_transparent() {
        let name: MemberName = serde_json::from_str("\"City\"").unwrap();
        assert_eq!(name.as_str(), "City");
        assert_eq!(serde_json::to_string(&name).unwrap(), "\"City\"");
    }
}
