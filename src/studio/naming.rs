//! Artifact file names

use crate::ident::slugify;

const MAX_SLUG_LEN: usize = 40;
const FALLBACK_SLUG: &str = "sweeper";

/// `<script slug>_take<index>.wav`, index 1-based
pub fn artifact_file_name(script: &str, index: usize) -> String {
    let slug = slugify(script, MAX_SLUG_LEN);
    let slug = if slug.is_empty() { FALLBACK_SLUG } else { slug.as_str() };
    format!("{}_take{}.wav", slug, index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("You're listening to KXYZ!", 1 => "you_re_listening_to_kxyz_take1.wav")]
    #[test_case("", 3 => "sweeper_take3.wav")]
    #[test_case("!!!", 2 => "sweeper_take2.wav")]
    fn test_artifact_file_name(script: &str, index: usize) -> String {
        artifact_file_name(script, index)
    }

    #[test]
    fn test_long_script_is_truncated() {
        let name = artifact_file_name(&"the morning zoo crew ".repeat(10), 12);
        let slug = name.strip_suffix("_take12.wav").unwrap();
        assert!(slug.len() <= MAX_SLUG_LEN);
        assert!(!slug.ends_with('_'));
    }
}
