use sha2::{Digest, Sha256};

use crate::types::CompletionRequest;

/// Stable cache key for `request`: hex SHA-256 over the template tag, the
/// rendered prompt and every generation parameter.
///
/// Fields are length-prefixed so adjacent values cannot run into each
/// other, and floats are hashed by bit pattern.
pub fn fingerprint(request: &CompletionRequest) -> String {
    let mut hasher = Sha256::new();

    match &request.template {
        Some(tag) => {
            hasher.update([1u8]);
            update_str(&mut hasher, &tag.name);
            update_str(&mut hasher, &tag.version);
        }
        None => hasher.update([0u8]),
    }
    update_str(&mut hasher, &request.prompt);

    let params = &request.params;
    update_opt(&mut hasher, params.max_tokens.map(u64::from));
    update_opt(&mut hasher, params.temperature.map(|t| u64::from(t.to_bits())));
    update_opt(&mut hasher, params.top_p.map(|p| u64::from(p.to_bits())));
    hasher.update((params.stop_sequences.len() as u64).to_le_bytes());
    for stop in &params.stop_sequences {
        update_str(&mut hasher, stop);
    }

    format!("{:x}", hasher.finalize())
}

fn update_str(hasher: &mut Sha256, s: &str) {
    hasher.update((s.len() as u64).to_le_bytes());
    hasher.update(s.as_bytes());
}

fn update_opt(hasher: &mut Sha256, value: Option<u64>) {
    match value {
        Some(v) => {
            hasher.update([1u8]);
            hasher.update(v.to_le_bytes());
        }
        None => hasher.update([0u8]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GenerationParams, TemplateTag};

    fn request(prompt: &str) -> CompletionRequest {
        CompletionRequest::new(prompt, GenerationParams::default())
    }

    #[test]
    fn deterministic_and_hex() {
        let a = fingerprint(&request("hello"));
        assert_eq!(a, fingerprint(&request("hello")));
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn differs_on_prompt_params_and_template() {
        let base = fingerprint(&request("hello"));
        assert_ne!(base, fingerprint(&request("hello!")));

        let mut warmer = request("hello");
        warmer.params.temperature = Some(0.9);
        assert_ne!(base, fingerprint(&warmer));

        let mut stopped = request("hello");
        stopped.params.stop_sequences = vec!["\n".into()];
        assert_ne!(base, fingerprint(&stopped));

        let tagged = request("hello").with_template(TemplateTag::new("summarize_entries", "1.0.0"));
        assert_ne!(base, fingerprint(&tagged));
        let bumped = request("hello").with_template(TemplateTag::new("summarize_entries", "1.0.1"));
        assert_ne!(fingerprint(&tagged), fingerprint(&bumped));
    }

    #[test]
    fn field_boundaries_are_unambiguous() {
        let mut a = request("x");
        a.params.stop_sequences = vec!["ab".into(), "c".into()];
        let mut b = request("x");
        b.params.stop_sequences = vec!["a".into(), "bc".into()];
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }
}
