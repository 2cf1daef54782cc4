//! Embedded prompts
//!
//! Compiled into the binary from .pmt files so the tool works without any
//! installed template directory.

/// Plan generation prompt
pub const GENERATE: &str = include_str!("../../prompts/generate.pmt");

/// Plan modification prompt
pub const MODIFY: &str = include_str!("../../prompts/modify.pmt");

/// General-query conversational prompt
pub const CONVERSE: &str = include_str!("../../prompts/converse.pmt");

/// Get an embedded prompt by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    match name {
        "generate" => Some(GENERATE),
        "modify" => Some(MODIFY),
        "converse" => Some(CONVERSE),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_embedded_generate() {
        let template = get_embedded("generate").unwrap();
        assert!(template.contains("{{{task}}}"));
        assert!(template.contains("estimatedEffort"));
        assert!(template.contains("generatedAt"));
    }

    #[test]
    fn test_get_embedded_modify() {
        let template = get_embedded("modify").unwrap();
        assert!(template.contains("replacement plan"));
        assert!(template.contains("{{{request}}}"));
    }

    #[test]
    fn test_get_embedded_unknown() {
        assert!(get_embedded("nonexistent-template").is_none());
    }
}
