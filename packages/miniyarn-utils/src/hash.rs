use blake2::{Blake2b, Digest, digest::consts::U64};

use crate::{impl_serialization_traits, DataType, FromFileString, ToFileString, ToHumanString};

pub type Blake2b512 = Blake2b<U64>;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hash64 {
    state: Vec<u8>,
}

impl Hash64 {
    pub fn from_data<T: AsRef<[u8]>>(data: T) -> Self {
        let mut hasher = Blake2b512::new();
        hasher.update(data.as_ref());

        Hash64 {state: hasher.finalize().to_vec()}
    }

    pub fn short(&self) -> String {
        hex::encode(&self.state[0..8])
    }
}

impl FromFileString for Hash64 {
    type Error = hex::FromHexError;

    fn from_file_string(src: &str) -> Result<Self, Self::Error> {
        Ok(Hash64 {state: hex::decode(src)?})
    }
}

impl ToFileString for Hash64 {
    fn to_file_string(&self) -> String {
        hex::encode(&self.state)
    }
}

impl ToHumanString for Hash64 {
    fn to_print_string(&self) -> String {
        DataType::Code.colorize(&self.to_file_string())
    }
}

impl_serialization_traits!(Hash64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_is_stable() {
        let a = Hash64::from_data("1.0.0");
        let b = Hash64::from_data("1.0.0");
        let c = Hash64::from_data("1.0.1");

        assert_eq!(a.short(), b.short());
        assert_ne!(a.short(), c.short());
        assert_eq!(a.short().len(), 16);
    }

    #[test]
    fn test_file_string_round_trip() {
        let hash = Hash64::from_data("hello");
        let parsed = Hash64::from_file_string(&hash.to_file_string()).unwrap();

        assert_eq!(parsed, hash);
    }
}
