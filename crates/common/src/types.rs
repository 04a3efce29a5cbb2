use serde::{Deserialize, Serialize};

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a raw numeric identifier.
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Returns the raw numeric identifier.
            pub const fn as_i64(&self) -> i64 {
                self.0
            }

            /// Returns true if the identifier is a valid (positive) database id.
            pub const fn is_positive(&self) -> bool {
                self.0 > 0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

numeric_id!(
    /// Identifier of the user placing an order.
    UserId
);

numeric_id!(
    /// Identifier of a product owned by the inventory service.
    ProductId
);

numeric_id!(
    /// Identifier of an order, assigned by the order store.
    OrderId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_serialize_as_plain_numbers() {
        let json = serde_json::to_string(&ProductId::new(42)).unwrap();
        assert_eq!(json, "42");
        let id: OrderId = serde_json::from_str("7").unwrap();
        assert_eq!(id.as_i64(), 7);
    }

    #[test]
    fn positivity() {
        assert!(UserId::new(1).is_positive());
        assert!(!UserId::new(0).is_positive());
        assert!(!UserId::new(-5).is_positive());
    }
}
