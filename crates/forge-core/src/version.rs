//! Compiled version: a content hash of a learned-layer configuration
use crate::data_model::{Demonstration, FieldMap};

const VERSION_LEN: usize = 16;

/// Hash prompts (in key order) followed by demonstrations (in list order).
///
/// Fields are length-prefixed so that moving text between adjacent fields
/// changes the hash.
pub fn compiled_version(prompts: &FieldMap, demonstrations: &[Demonstration]) -> String {
    let mut hasher = blake3::Hasher::new();
    for (key, value) in prompts {
        update_field(&mut hasher, key);
        update_field(&mut hasher, value);
    }
    for demo in demonstrations {
        update_field(&mut hasher, &demo.pattern_name);
        update_field(&mut hasher, &demo.input);
        update_field(&mut hasher, &demo.output);
        update_field(&mut hasher, &demo.rationale);
    }
    let hex = hasher.finalize().to_hex();
    hex.as_str()[..VERSION_LEN].to_string()
}

fn update_field(hasher: &mut blake3::Hasher, field: &str) {
    hasher.update(&(field.len() as u64).to_le_bytes());
    hasher.update(field.as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn demo(input: &str, output: &str) -> Demonstration {
        Demonstration {
            pattern_name: String::new(),
            input: input.to_string(),
            rationale: String::new(),
            output: output.to_string(),
            confidence: 0.9,
            timestamp: Utc::now(),
            metadata: FieldMap::new(),
        }
    }

    #[test]
    fn test_insertion_order_does_not_matter() {
        let mut a = FieldMap::new();
        a.insert("system".to_string(), "Be terse.".to_string());
        a.insert("format".to_string(), "json".to_string());

        let mut b = FieldMap::new();
        b.insert("format".to_string(), "json".to_string());
        b.insert("system".to_string(), "Be terse.".to_string());

        let demos = vec![demo("q", "a")];
        assert_eq!(compiled_version(&a, &demos), compiled_version(&b, &demos));
    }

    #[test]
    fn test_ignores_timestamps_and_confidence() {
        let prompts = FieldMap::new();
        let first = demo("q", "a");
        let mut second = demo("q", "a");
        second.confidence = 0.1;
        assert_eq!(
            compiled_version(&prompts, &[first]),
            compiled_version(&prompts, &[second])
        );
    }

    #[test]
    fn test_content_change_changes_version() {
        let prompts = FieldMap::new();
        let v1 = compiled_version(&prompts, &[demo("ab", "c")]);
        let v2 = compiled_version(&prompts, &[demo("a", "bc")]);
        assert_ne!(v1, v2);
        assert_eq!(v1.len(), 16);
    }
}
