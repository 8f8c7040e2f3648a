use std::fmt;

use super::KeyError;

/// A composite key split back into its ordered `(label, value)` segments.
///
/// Decoding recovers identity only; it never rebuilds the entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeKey {
    segments: Vec<(String, String)>,
    delimiter: char,
}

impl CompositeKey {
    pub fn parse(raw: &str, delimiter: char) -> Result<Self, KeyError> {
        let pieces: Vec<&str> = raw.split(delimiter).collect();
        if pieces.len() % 2 != 0 {
            return Err(KeyError::Malformed {
                key: raw.to_string(),
                reason: "odd number of segments".to_string(),
            });
        }

        let mut segments = Vec::with_capacity(pieces.len() / 2);
        for pair in pieces.chunks(2) {
            if pair[0].is_empty() {
                return Err(KeyError::Malformed {
                    key: raw.to_string(),
                    reason: "empty label".to_string(),
                });
            }
            segments.push((pair[0].to_string(), pair[1].to_string()));
        }

        Ok(Self {
            segments,
            delimiter,
        })
    }

    pub fn segments(&self) -> &[(String, String)] {
        &self.segments
    }

    pub fn labels(&self) -> Vec<&str> {
        self.segments.iter().map(|(label, _)| label.as_str()).collect()
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.segments
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, value)| value.as_str())
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (label, value)) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", self.delimiter)?;
            }
            write!(f, "{}{}{}", label, self.delimiter, value)?;
        }
        Ok(())
    }
}
