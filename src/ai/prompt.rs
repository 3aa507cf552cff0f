//! Prompt Builder
//!
//! Sections are rendered in insertion order, separated by blank lines.

#[derive(Debug, Clone)]
enum PromptSection {
    Role { expertise: String, task: String },
    Text { header: Option<String>, content: String },
    Code { label: String, content: String },
}

#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    sections: Vec<PromptSection>,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn role(mut self, expertise: &str, task: &str) -> Self {
        self.sections.push(PromptSection::Role {
            expertise: expertise.to_string(),
            task: task.to_string(),
        });
        self
    }

    pub fn text(mut self, content: &str) -> Self {
        self.sections.push(PromptSection::Text {
            header: None,
            content: content.to_string(),
        });
        self
    }

    pub fn section(mut self, header: &str, content: &str) -> Self {
        self.sections.push(PromptSection::Text {
            header: Some(header.to_string()),
            content: content.to_string(),
        });
        self
    }

    /// Fenced block labelled with its source (usually a file path)
    pub fn code(mut self, label: &str, content: &str) -> Self {
        self.sections.push(PromptSection::Code {
            label: label.to_string(),
            content: content.to_string(),
        });
        self
    }

    pub fn build(self) -> String {
        let rendered: Vec<String> = self
            .sections
            .into_iter()
            .map(|section| match section {
                PromptSection::Role { expertise, task } => {
                    format!("You are an expert {}. Your task: {}", expertise, task)
                }
                PromptSection::Text { header: None, content } => content,
                PromptSection::Text {
                    header: Some(header),
                    content,
                } => format!("## {}\n\n{}", header, content),
                PromptSection::Code { label, content } => {
                    format!("### {}\n\n```\n{}\n```", label, content.trim_end())
                }
            })
            .collect();
        rendered.join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sections_render_in_order() {
        let prompt = PromptBuilder::new()
            .role("technical writer", "document the cache")
            .section("Files", "- a.rs")
            .code("a.rs", "fn a() {}\n")
            .text("Answer in markdown.")
            .build();

        let role = prompt.find("expert technical writer").unwrap();
        let files = prompt.find("## Files").unwrap();
        let code = prompt.find("```\nfn a() {}\n```").unwrap();
        let tail = prompt.find("Answer in markdown.").unwrap();
        assert!(role < files && files < code && code < tail);
    }
}
