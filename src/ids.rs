// Random record identifiers
//
// Listings, offers and credit listings are keyed by 16 random bytes rendered
// as lowercase hex, so ids can be typed back in from the CLI.

/// Declare a random, hex-displayed identifier type
macro_rules! random_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
        pub struct $name([u8; 16]);

        impl $name {
            /// Generate a random identifier
            pub fn generate() -> Self {
                use rand::RngCore;
                let mut bytes = [0u8; 16];
                rand::thread_rng().fill_bytes(&mut bytes);
                Self(bytes)
            }

            /// Create from raw bytes
            pub fn from_bytes(bytes: [u8; 16]) -> Self {
                Self(bytes)
            }

            /// Get raw bytes
            pub fn as_bytes(&self) -> &[u8; 16] {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", hex::encode(self.0))
            }
        }

        impl std::str::FromStr for $name {
            type Err = crate::error::MarketError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let bytes = hex::decode(s.trim())
                    .map_err(|_| crate::error::MarketError::InvalidState(format!("malformed {} id: {}", $label, s)))?;
                let arr: [u8; 16] = bytes
                    .try_into()
                    .map_err(|_| crate::error::MarketError::InvalidState(format!("malformed {} id: {}", $label, s)))?;
                Ok(Self(arr))
            }
        }
    };
}

pub(crate) use random_id;
