//! Eligibility Classifier

use super::mapper::MappedCode;
use crate::reference::{Eligibility, ReferenceStore};

/// One verdict per mapped code; anything without a table row is `na`
pub fn classify(codes: &[MappedCode], store: &ReferenceStore) -> Vec<Eligibility> {
    codes
        .iter()
        .map(|code| {
            code.target()
                .and_then(|target| store.eligibility(target))
                .unwrap_or(Eligibility::Na)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::EligibilityRow;

    #[test]
    fn test_verdicts_are_parallel() {
        let store = ReferenceStore::new(
            vec![],
            vec![
                EligibilityRow {
                    target_code: "X1".to_string(),
                    eligibility: Eligibility::No,
                },
                EligibilityRow {
                    target_code: "X2".to_string(),
                    eligibility: Eligibility::Yes,
                },
            ],
            vec![],
        );
        let codes = vec![
            MappedCode::Target("X2".to_string()),
            MappedCode::Unmapped,
            MappedCode::Target("X1".to_string()),
            MappedCode::Target("X3".to_string()),
        ];

        assert_eq!(
            classify(&codes, &store),
            vec![
                Eligibility::Yes,
                Eligibility::Na,
                Eligibility::No,
                Eligibility::Na
            ]
        );
    }

    #[test]
    fn test_empty_list() {
        assert!(classify(&[], &ReferenceStore::default()).is_empty());
    }
}
