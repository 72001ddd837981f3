/*
 * Responsibility
 * - public id <-> internal id (encode/decode)
 * - extractors and DTOs go through this service, so the scheme can change
 *   in one place
 *
 * The error type stays hand-written: it never leaves the crate boundary
 * except through AppError.
 */
use sqids::{Error as SqidsError, Sqids};
use std::{error::Error, fmt};

pub type Result<T> = std::result::Result<T, IdCodecError>;

pub const DEFAULT_ALPHABET: &str = "k3G7QAe51FCsPW92uEOyq4Bg6Sp8YzVTmnU0liwDdHXLajZrfxNhobJIRcMvKt";

#[derive(Debug)]
pub enum IdCodecError {
    InvalidMinLength { value: usize },
    Sqids(SqidsError),
    NegativeId { value: i64 },
    DecodeInvalidFormat,
    DecodeOutOfRange,
}

impl fmt::Display for IdCodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdCodecError::InvalidMinLength { value } => {
                write!(f, "SQIDS_MIN_LENGTH must be between 0 and 255, got {value}")
            }
            IdCodecError::Sqids(e) => write!(f, "sqids error: {e}"),
            IdCodecError::NegativeId { value } => {
                write!(f, "id must be non-negative, got {value}")
            }
            IdCodecError::DecodeInvalidFormat => write!(f, "invalid public id format"),
            IdCodecError::DecodeOutOfRange => write!(f, "decoded id is out of range"),
        }
    }
}

impl Error for IdCodecError {}

impl From<SqidsError> for IdCodecError {
    fn from(e: SqidsError) -> Self {
        IdCodecError::Sqids(e)
    }
}

#[derive(Clone, Debug)]
pub struct IdCodec {
    sqids: Sqids,
}

impl IdCodec {
    pub fn new(min_length: usize, alphabet: &str) -> Result<Self> {
        let min_length: u8 = min_length
            .try_into()
            .map_err(|_| IdCodecError::InvalidMinLength { value: min_length })?;

        let sqids = Sqids::builder()
            .min_length(min_length)
            .alphabet(alphabet.chars().collect())
            .build()?;

        Ok(Self { sqids })
    }

    pub fn encode(&self, id: i64) -> Result<String> {
        let n = u64::try_from(id).map_err(|_| IdCodecError::NegativeId { value: id })?;
        Ok(self.sqids.encode(&[n])?)
    }

    /// Accepts only the canonical encoding of a single id, so every internal
    /// id has exactly one public spelling.
    pub fn decode(&self, public_id: &str) -> Result<i64> {
        let nums = self.sqids.decode(public_id);
        let [n] = nums.as_slice() else {
            return Err(IdCodecError::DecodeInvalidFormat);
        };
        let id = i64::try_from(*n).map_err(|_| IdCodecError::DecodeOutOfRange)?;
        if self.sqids.encode(&[*n])? != public_id {
            return Err(IdCodecError::DecodeInvalidFormat);
        }
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> IdCodec {
        IdCodec::new(10, DEFAULT_ALPHABET).unwrap()
    }

    #[test]
    fn encodes_to_min_length_and_back() {
        let c = codec();
        let public = c.encode(42).unwrap();
        assert!(public.len() >= 10);
        assert_eq!(c.decode(&public).unwrap(), 42);
    }

    #[test]
    fn rejects_garbage_and_negative_ids() {
        let c = codec();
        assert!(c.encode(-1).is_err());
        assert!(c.decode("").is_err());
        assert!(c.decode("not a public id!").is_err());
    }

    #[test]
    fn min_length_must_fit_in_a_byte() {
        assert!(matches!(
            IdCodec::new(300, DEFAULT_ALPHABET),
            Err(IdCodecError::InvalidMinLength { value: 300 })
        ));
    }
}
