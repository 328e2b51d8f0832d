/// Define a numeric id newtype, as used by the backend's relational tables
#[macro_export]
macro_rules! define_id_type {
    (
        $(#[$outer:meta])*
        struct $t:tt
    ) => {
        $(#[$outer])*
        #[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
        #[cfg_attr(feature = "serde", serde(transparent))]
        #[derive(Copy, Clone, Hash, Debug, PartialOrd, Ord, PartialEq, Eq)]
        pub struct $t(pub u64);

        impl std::fmt::Display for $t {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }

        impl std::str::FromStr for $t {
            type Err = $crate::id::IdParseError;

            fn from_str(s: &str) -> Result<$t, Self::Err> {
                s.trim()
                    .parse::<u64>()
                    .map(Self)
                    .map_err(|_| $crate::id::IdParseError {
                        input: s.to_owned(),
                    })
            }
        }

        impl From<u64> for $t {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl From<$t> for u64 {
            fn from(value: $t) -> Self {
                value.0
            }
        }
    };
}
