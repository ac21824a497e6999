//! Shared utilities and strongly-typed identifiers for workspace crates.
//!
//! ```rust
//! use rcommon::{IdempotencyKey, SessionId, TenantId};
//!
//! let tenant = TenantId::from("tenant-1");
//! let session = SessionId::new("session-1");
//! let key = IdempotencyKey::from("k1");
//!
//! assert_eq!(tenant.as_str(), "tenant-1");
//! assert_eq!(session.to_string(), "session-1");
//! assert!(!key.is_blank());
//! ```

pub mod future {
    //! Shared async future aliases.
    //!
    //! ```rust
    //! use rcommon::BoxFuture;
    //!
    //! fn str_len<'a>(value: &'a str) -> BoxFuture<'a, usize> {
    //!     Box::pin(async move { value.len() })
    //! }
    //!
    //! let _future = str_len("hello");
    //! ```

    use std::future::Future;
    use std::pin::Pin;

    pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
}

pub mod ids {
    //! Identifier newtypes shared by the provider, turn, and storage crates.
    //!
    //! ```rust
    //! use rcommon::{AgentId, TenantId};
    //!
    //! let agent = AgentId::new("agent-7");
    //! let tenant: TenantId = "acme".into();
    //!
    //! assert_eq!(agent.as_str(), "agent-7");
    //! assert_eq!(tenant.to_string(), "acme");
    //! ```

    use std::fmt::{Display, Formatter};

    use serde::{Deserialize, Serialize};

    macro_rules! string_id {
        ($(#[$meta:meta])* $name:ident) => {
            $(#[$meta])*
            #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
            #[serde(transparent)]
            pub struct $name(String);

            impl $name {
                pub fn new(value: impl Into<String>) -> Self {
                    Self(value.into())
                }

                pub fn as_str(&self) -> &str {
                    self.0.as_str()
                }

                pub fn is_blank(&self) -> bool {
                    self.0.trim().is_empty()
                }
            }

            impl Display for $name {
                fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                    f.write_str(&self.0)
                }
            }

            impl From<String> for $name {
                fn from(value: String) -> Self {
                    Self(value)
                }
            }

            impl From<&str> for $name {
                fn from(value: &str) -> Self {
                    Self(value.to_string())
                }
            }
        };
    }

    string_id!(
        /// Owner of agents, sessions, and every billed record.
        TenantId
    );
    string_id!(SessionId);
    string_id!(AgentId);
    string_id!(
        /// Caller-supplied token that scopes a turn to at most one execution per tenant.
        IdempotencyKey
    );
}

pub mod registry {
    //! Generic registry map wrapper used by runtime registries.
    //!
    //! ```rust
    //! use rcommon::Registry;
    //!
    //! let mut registry = Registry::new();
    //! registry.insert("alpha".to_string(), 1_u32);
    //!
    //! assert_eq!(registry.get("alpha"), Some(&1));
    //! assert!(registry.contains_key("alpha"));
    //! ```

    use std::borrow::Borrow;
    use std::collections::HashMap;
    use std::hash::Hash;

    #[derive(Debug, Clone)]
    pub struct Registry<K, V> {
        items: HashMap<K, V>,
    }

    impl<K, V> Default for Registry<K, V>
    where
        K: Eq + Hash,
    {
        fn default() -> Self {
            Self {
                items: HashMap::new(),
            }
        }
    }

    impl<K, V> Registry<K, V>
    where
        K: Eq + Hash,
    {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn insert(&mut self, key: K, value: V) -> Option<V> {
            self.items.insert(key, value)
        }

        pub fn get<Q>(&self, key: &Q) -> Option<&V>
        where
            K: Borrow<Q>,
            Q: Eq + Hash + ?Sized,
        {
            self.items.get(key)
        }

        pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
        where
            K: Borrow<Q>,
            Q: Eq + Hash + ?Sized,
        {
            self.items.remove(key)
        }

        pub fn contains_key<Q>(&self, key: &Q) -> bool
        where
            K: Borrow<Q>,
            Q: Eq + Hash + ?Sized,
        {
            self.items.contains_key(key)
        }

        pub fn keys(&self) -> impl Iterator<Item = &K> {
            self.items.keys()
        }

        pub fn len(&self) -> usize {
            self.items.len()
        }

        pub fn is_empty(&self) -> bool {
            self.items.is_empty()
        }
    }
}

pub use future::BoxFuture;
pub use ids::{AgentId, IdempotencyKey, SessionId, TenantId};
pub use registry::Registry;

#[cfg(test)]
mod tests {
    use super::{AgentId, IdempotencyKey, Registry, SessionId, TenantId};

    #[test]
    fn id_newtypes_round_trip_strings() {
        let tenant = TenantId::new("tenant-1");
        let session = SessionId::from("session-1");
        let agent = AgentId::from("agent-1".to_string());

        assert_eq!(tenant.as_str(), "tenant-1");
        assert_eq!(session.as_str(), "session-1");
        assert_eq!(agent.to_string(), "agent-1");
    }

    #[test]
    fn blank_ids_are_detected() {
        assert!(IdempotencyKey::from("   ").is_blank());
        assert!(IdempotencyKey::from("").is_blank());
        assert!(!IdempotencyKey::from("k1").is_blank());
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let key = IdempotencyKey::from("k1");
        let encoded = serde_json::to_string(&key).expect("key should serialize");
        assert_eq!(encoded, "\"k1\"");

        let decoded: TenantId = serde_json::from_str("\"acme\"").expect("tenant should parse");
        assert_eq!(decoded, TenantId::from("acme"));
    }

    #[test]
    fn generic_registry_basic_lifecycle() {
        let mut registry = Registry::new();
        assert!(registry.is_empty());

        registry.insert("alpha".to_string(), 1_u32);
        assert_eq!(registry.get("alpha"), Some(&1));
        assert!(registry.contains_key("alpha"));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.keys().count(), 1);

        let removed = registry.remove("alpha");
        assert_eq!(removed, Some(1));
        assert!(registry.is_empty());
    }
}
