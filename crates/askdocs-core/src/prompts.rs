/// A suggested question shown while the transcript is empty
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultPrompt {
    pub id: &'static str,
    pub title: &'static str,
    pub prompt: &'static str,
    pub category: Option<&'static str>,
}

pub static DEFAULT_PROMPTS: [DefaultPrompt; 4] = [
    DefaultPrompt {
        id: "1",
        title: "Aircraft maintenance procedures",
        prompt: "What are the key maintenance procedures for aircraft ground support equipment?",
        category: Some("Maintenance"),
    },
    DefaultPrompt {
        id: "2",
        title: "Safety protocols",
        prompt: "What safety protocols should be followed when operating Barfield test equipment?",
        category: Some("Safety"),
    },
    DefaultPrompt {
        id: "3",
        title: "Troubleshooting guides",
        prompt: "How do I troubleshoot common issues with pressure testing equipment?",
        category: Some("Troubleshooting"),
    },
    DefaultPrompt {
        id: "4",
        title: "Equipment specifications",
        prompt: "What are the technical specifications for Barfield portable test equipment?",
        category: Some("Technical"),
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_prompt_ids_are_unique() {
        let ids: HashSet<&str> = DEFAULT_PROMPTS.iter().map(|p| p.id).collect();
        assert_eq!(ids.len(), DEFAULT_PROMPTS.len());
    }

    #[test]
    fn test_prompts_are_questions() {
        assert!(DEFAULT_PROMPTS.iter().all(|p| p.prompt.ends_with('?')));
    }
}
