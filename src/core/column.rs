//! Purpose: Atomic column types and their one-character format codes.
//! Exports: `ColumnType`.
//! Invariants: The code alphabet (`s`, `f`, `d`) is stable; format strings
//! and majority-vote buckets both depend on it.

/// The type a column holds after inference or explicit declaration.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ColumnType {
    Text,
    Number,
    Timestamp,
}

impl ColumnType {
    /// One-character code used in format strings (`sfd` and friends).
    pub fn code(self) -> char {
        match self {
            ColumnType::Text => 's',
            ColumnType::Number => 'f',
            ColumnType::Timestamp => 'd',
        }
    }

    pub fn from_code(code: char) -> Option<Self> {
        match code {
            's' => Some(ColumnType::Text),
            'f' => Some(ColumnType::Number),
            'd' => Some(ColumnType::Timestamp),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ColumnType;

    #[test]
    fn codes_round_trip() {
        for column in [ColumnType::Text, ColumnType::Number, ColumnType::Timestamp] {
            assert_eq!(ColumnType::from_code(column.code()), Some(column));
        }
    }

    #[test]
    fn unknown_codes_are_rejected() {
        assert_eq!(ColumnType::from_code('x'), None);
        assert_eq!(ColumnType::from_code(' '), None);
    }
}
