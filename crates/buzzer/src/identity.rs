//! The identity record a buzzer keeps in persistent storage.
//!
//! The record has a fixed layout, so it can be stored at a fixed offset of
//! an EEPROM or of a flash page:
//!
//! | Offset | Size | Field |
//! |---|---|---|
//! | 0 | 1 | magic byte |
//! | 1 | 1 | buzzer name length |
//! | 2 | 30 | buzzer name, zero padded |
//! | 32 | 1 | flags, bit 0 set when a party is stored |
//! | 33 | 4 | party identifier, little endian |
//! | 37 | 2 | expected wait in minutes, little endian |
//! | 39 | 1 | party name length |
//! | 40 | 20 | party name, zero padded |

use crate::api::{BuzzerName, NAME_CAPACITY, PartyName};
use crate::error::IdentityError;

/// Size of an encoded record, in bytes.
pub const RECORD_LEN: usize = 60;

const MAGIC: u8 = 0xB2;
const HAS_PARTY: u8 = 0b0000_0001;

const NAME_LEN: usize = 1;
const NAME: usize = 2;
const FLAGS: usize = NAME + NAME_CAPACITY;
const PARTY_ID: usize = FLAGS + 1;
const WAIT: usize = PARTY_ID + 4;
const PARTY_NAME_LEN: usize = WAIT + 2;
const PARTY_NAME: usize = PARTY_NAME_LEN + 1;

/// A party the buzzer has been handed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredParty {
    /// Party identifier.
    pub id: u32,
    /// Party name.
    pub name: PartyName,
    /// Last known expected wait, in minutes.
    pub wait_minutes: u16,
}

/// The persisted identity of a buzzer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Name issued by the backend.
    pub name: BuzzerName,
    /// The accepted party, if any.
    pub party: Option<StoredParty>,
}

impl Identity {
    /// Creates an [`Identity`] without a party.
    #[must_use]
    #[inline]
    pub const fn new(name: BuzzerName) -> Self {
        Self { name, party: None }
    }

    /// Encodes the identity into its fixed layout.
    #[must_use]
    pub fn encode(&self) -> [u8; RECORD_LEN] {
        let mut record = [0; RECORD_LEN];

        record[0] = MAGIC;
        write_text(&mut record, NAME_LEN, NAME, self.name.as_bytes());

        if let Some(party) = &self.party {
            record[FLAGS] = HAS_PARTY;
            record[PARTY_ID..WAIT].copy_from_slice(&party.id.to_le_bytes());
            record[WAIT..PARTY_NAME_LEN].copy_from_slice(&party.wait_minutes.to_le_bytes());
            write_text(&mut record, PARTY_NAME_LEN, PARTY_NAME, party.name.as_bytes());
        }

        record
    }

    /// Decodes an identity from its fixed layout.
    ///
    /// Bytes past [`RECORD_LEN`] are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Blank`] when `bytes` does not start with a
    /// record or the stored name is empty, and another error when the record
    /// is incomplete or holds invalid text.
    pub fn decode(bytes: &[u8]) -> Result<Self, IdentityError> {
        if bytes.first() != Some(&MAGIC) {
            return Err(IdentityError::Blank);
        }

        let record: &[u8; RECORD_LEN] = bytes
            .get(..RECORD_LEN)
            .and_then(|record| record.try_into().ok())
            .ok_or(IdentityError::Truncated { len: bytes.len() })?;

        let name: BuzzerName = read_text(record, NAME_LEN, NAME, "name")?;
        if name.is_empty() {
            return Err(IdentityError::Blank);
        }

        let party = if record[FLAGS] & HAS_PARTY == 0 {
            None
        } else {
            Some(StoredParty {
                id: u32::from_le_bytes([
                    record[PARTY_ID],
                    record[PARTY_ID + 1],
                    record[PARTY_ID + 2],
                    record[PARTY_ID + 3],
                ]),
                name: read_text(record, PARTY_NAME_LEN, PARTY_NAME, "party name")?,
                wait_minutes: u16::from_le_bytes([record[WAIT], record[WAIT + 1]]),
            })
        };

        Ok(Self { name, party })
    }
}

// Callers only pass strings whose capacity matches the field.
fn write_text(record: &mut [u8; RECORD_LEN], len_at: usize, text_at: usize, text: &[u8]) {
    record[len_at] = text.len() as u8;
    record[text_at..text_at + text.len()].copy_from_slice(text);
}

fn read_text<const N: usize>(
    record: &[u8; RECORD_LEN],
    len_at: usize,
    text_at: usize,
    field: &'static str,
) -> Result<heapless::String<N>, IdentityError> {
    let len = usize::from(record[len_at]);
    if len > N {
        return Err(IdentityError::Corrupted { field });
    }

    let text = core::str::from_utf8(&record[text_at..text_at + len])
        .map_err(|_| IdentityError::Corrupted { field })?;

    let mut out = heapless::String::new();
    out.push_str(text)
        .map_err(|()| IdentityError::Corrupted { field })?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use crate::api::truncated;

    use super::*;

    fn identity_with_party() -> Identity {
        Identity {
            name: truncated("table-42"),
            party: Some(StoredParty {
                id: 7,
                name: truncated("Smith"),
                wait_minutes: 75,
            }),
        }
    }

    #[test]
    fn test_layout() {
        let record = identity_with_party().encode();

        assert_eq!(record[0], MAGIC);
        assert_eq!(record[1], 8);
        assert_eq!(&record[2..10], b"table-42");
        assert!(record[10..32].iter().all(|&b| b == 0));
        assert_eq!(record[32], HAS_PARTY);
        assert_eq!(&record[33..37], &[7, 0, 0, 0]);
        assert_eq!(&record[37..39], &[75, 0]);
        assert_eq!(record[39], 5);
        assert_eq!(&record[40..45], b"Smith");
    }

    #[test]
    fn test_decode_stored_records() {
        let identity = identity_with_party();
        assert_eq!(Identity::decode(&identity.encode()), Ok(identity));

        let without_party = Identity::new(truncated("bz-1"));
        let decoded = Identity::decode(&without_party.encode()).unwrap();
        assert_eq!(decoded.party, None);
    }

    #[test]
    fn test_decode_ignores_trailing_bytes() {
        let mut storage = [0xFF; 128];
        storage[..RECORD_LEN].copy_from_slice(&identity_with_party().encode());

        assert_eq!(Identity::decode(&storage), Ok(identity_with_party()));
    }

    #[test]
    fn test_decode_blank_storage() {
        assert_eq!(Identity::decode(&[]), Err(IdentityError::Blank));
        assert_eq!(Identity::decode(&[0; 64]), Err(IdentityError::Blank));
        assert_eq!(Identity::decode(&[0xFF; 64]), Err(IdentityError::Blank));

        let mut record = [0; RECORD_LEN];
        record[0] = MAGIC;
        assert_eq!(Identity::decode(&record), Err(IdentityError::Blank));
    }

    #[test]
    fn test_decode_damaged_records() {
        let record = identity_with_party().encode();
        assert_eq!(
            Identity::decode(&record[..20]),
            Err(IdentityError::Truncated { len: 20 })
        );

        let mut too_long = record;
        too_long[NAME_LEN] = 31;
        assert_eq!(
            Identity::decode(&too_long),
            Err(IdentityError::Corrupted { field: "name" })
        );

        let mut invalid_text = record;
        invalid_text[PARTY_NAME] = 0xFF;
        assert_eq!(
            Identity::decode(&invalid_text),
            Err(IdentityError::Corrupted {
                field: "party name"
            })
        );
    }
}
