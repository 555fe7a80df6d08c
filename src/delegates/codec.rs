use thiserror::Error;

use crate::delegates::repo::MunExperience;
use crate::error::ApiError;

/// Errors from the pastmuns column codec.
///
/// The stored format is the original one: `name,committee,delegation,year,award;`
/// repeated per experience, trailing `;` kept. Field values containing the
/// delimiter characters are rejected at encode time rather than escaped, so
/// stored bytes stay readable by anything that understood the old column.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("field value contains a reserved character (',' or ';'): {0}")]
    ReservedCharacter(String),
    #[error("malformed pastmuns record: {0}")]
    Malformed(String),
}

impl From<CodecError> for ApiError {
    fn from(e: CodecError) -> Self {
        match e {
            CodecError::ReservedCharacter(_) => ApiError::Invalid(e.to_string()),
            CodecError::Malformed(_) => ApiError::Unexpected(anyhow::Error::new(e)),
        }
    }
}

const FIELDS_PER_RECORD: usize = 5;

pub fn encode(muns: &[MunExperience]) -> Result<String, CodecError> {
    let mut out = String::new();
    for mun in muns {
        for field in [&mun.name, &mun.committee, &mun.delegation, &mun.award] {
            if field.contains(',') || field.contains(';') {
                return Err(CodecError::ReservedCharacter(field.clone()));
            }
        }
        out.push_str(&mun.name);
        out.push(',');
        out.push_str(&mun.committee);
        out.push(',');
        out.push_str(&mun.delegation);
        out.push(',');
        out.push_str(&mun.year.to_string());
        out.push(',');
        out.push_str(&mun.award);
        out.push(';');
    }
    Ok(out)
}

pub fn decode(raw: &str) -> Result<Vec<MunExperience>, CodecError> {
    let mut muns = Vec::new();
    for record in raw.split(';') {
        if record.is_empty() {
            continue;
        }
        let parts: Vec<&str> = record.split(',').collect();
        if parts.len() != FIELDS_PER_RECORD {
            return Err(CodecError::Malformed(record.to_string()));
        }
        let year = parts[3]
            .parse::<i64>()
            .map_err(|_| CodecError::Malformed(record.to_string()))?;
        muns.push(MunExperience {
            name: parts[0].to_string(),
            committee: parts[1].to_string(),
            delegation: parts[2].to_string(),
            year,
            award: parts[4].to_string(),
        });
    }
    Ok(muns)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mun(name: &str, year: i64, award: &str) -> MunExperience {
        MunExperience {
            name: name.to_string(),
            committee: "DISEC".to_string(),
            delegation: "India".to_string(),
            year,
            award: award.to_string(),
        }
    }

    #[test]
    fn roundtrip_preserves_order_and_values() {
        let muns = vec![
            mun("Harvard MUN", 2022, "Best Delegate"),
            mun("NMIMS MUN", 2023, ""),
            mun("Doon MUN", 2024, "High Commendation"),
        ];
        let encoded = encode(&muns).expect("encode");
        assert!(encoded.ends_with(';'));
        let decoded = decode(&encoded).expect("decode");
        assert_eq!(decoded, muns);
    }

    #[test]
    fn empty_string_decodes_to_empty_sequence() {
        assert!(decode("").expect("decode").is_empty());
    }

    #[test]
    fn empty_sequence_encodes_to_empty_string() {
        assert_eq!(encode(&[]).expect("encode"), "");
    }

    #[test]
    fn reserved_characters_are_rejected() {
        let bad = mun("MUN, the big one", 2023, "");
        assert!(matches!(
            encode(&[bad]),
            Err(CodecError::ReservedCharacter(_))
        ));
        let bad = mun("MUN; the other one", 2023, "");
        assert!(matches!(
            encode(&[bad]),
            Err(CodecError::ReservedCharacter(_))
        ));
    }

    #[test]
    fn malformed_records_fail_to_decode() {
        assert!(matches!(
            decode("only,three,fields;"),
            Err(CodecError::Malformed(_))
        ));
        assert!(matches!(
            decode("a,b,c,not-a-year,d;"),
            Err(CodecError::Malformed(_))
        ));
    }
}
