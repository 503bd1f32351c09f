//! Prompt templates for the refinement stages and the fast path.
//!
//! Templates are ChatML-framed and carry exactly one `{text}` placeholder,
//! replaced verbatim by the previous stage's output (or the joined OCR text).

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Config;
use crate::generation::GenerationConfig;

pub const PLACEHOLDER: &str = "{text}";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PromptError {
    #[error("must contain the {{text}} placeholder exactly once (found {found})")]
    Placeholder { found: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageName {
    Clean,
    Understand,
    Describe,
    Fast,
}

impl StageName {
    pub const ALL: [StageName; 4] = [
        StageName::Clean,
        StageName::Understand,
        StageName::Describe,
        StageName::Fast,
    ];

    /// The three refinement stages in execution order.
    pub const REFINEMENT: [StageName; 3] =
        [StageName::Clean, StageName::Understand, StageName::Describe];

    pub fn as_str(&self) -> &'static str {
        match self {
            StageName::Clean => "clean",
            StageName::Understand => "understand",
            StageName::Describe => "describe",
            StageName::Fast => "fast",
        }
    }

    pub fn default_template(&self) -> &'static str {
        match self {
            StageName::Clean => CLEAN_TEMPLATE,
            StageName::Understand => UNDERSTAND_TEMPLATE,
            StageName::Describe => DESCRIBE_TEMPLATE,
            StageName::Fast => FAST_TEMPLATE,
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated template with a single `{text}` slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    raw: String,
}

impl PromptTemplate {
    pub fn parse(raw: impl Into<String>) -> Result<Self, PromptError> {
        let raw = raw.into();
        let found = raw.matches(PLACEHOLDER).count();
        if found != 1 {
            return Err(PromptError::Placeholder { found });
        }
        Ok(Self { raw })
    }

    pub fn render(&self, text: &str) -> String {
        self.raw.replacen(PLACEHOLDER, text, 1)
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

/// One model step: which template to fill and how to sample.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptStage {
    pub name: StageName,
    pub template: PromptTemplate,
    pub generation: GenerationConfig,
}

impl PromptStage {
    /// Resolve a stage from config: custom template if set, overrides merged
    /// over the shared `[generation]` section.
    pub fn from_config(name: StageName, config: &Config) -> Result<Self, PromptError> {
        let stage = config.stages.get(name);
        let template = match &stage.template {
            Some(raw) => PromptTemplate::parse(raw.clone())?,
            None => PromptTemplate::parse(name.default_template())?,
        };
        Ok(Self {
            name,
            template,
            generation: config.generation.merged(&stage.overrides),
        })
    }

    pub fn render(&self, text: &str) -> String {
        self.template.render(text)
    }
}

const CLEAN_TEMPLATE: &str = "<|im_start|>system
You read text that OCR extracted from a flowchart. OCR drops letters, merges words and misreads characters. Correct spelling and garbled words so every label reads as intended. Keep the order and structure of the fragments. Do not add steps, explanations or content that is not already present. Reply with the corrected text only.
<|im_end|>
<|im_start|>user
OCR text:
{text}
<|im_end|>
<|im_start|>assistant
";

const UNDERSTAND_TEMPLATE: &str = "<|im_start|>system
You are an expert in interpreting flowcharts, flowgraphs and technical diagrams. Given the cleaned labels of a flowchart, work out the workflow: the start and end points, the actions, the decisions and their branches, and how the steps connect. Where the labels leave a gap, fill it with the most likely connection and state each assumption explicitly.
<|im_end|>
<|im_start|>user
Flowchart labels:
{text}
<|im_end|>
<|im_start|>assistant
";

const DESCRIBE_TEMPLATE: &str = "<|im_start|>system
You write clear process documentation. Turn the analysis of a flowchart into a final description: a short summary of what the process achieves, then numbered steps in execution order. For each step say what happens, what it needs and where it leads. Mention decision branches under the step they belong to. Do not quote the analysis.
<|im_end|>
<|im_start|>user
Flowchart analysis:
{text}
<|im_end|>
<|im_start|>assistant
";

const FAST_TEMPLATE: &str = "<|im_start|>system
You are a highly skilled assistant with expertise in interpreting flowgraphs, flowcharts and technical diagrams whose text was extracted by OCR and may be noisy or incomplete. Critically analyze the extracted text and correct likely OCR mistakes. Make logical assumptions to fill in missing details and tell the user where key details are unclear. Provide a clear, structured, step-by-step interpretation that keeps the original structure.
<|im_end|>
<|im_start|>user
Describe the workflow for this text extracted from a flowchart by understanding and cleaning: {text}
<|im_end|>
<|im_start|>assistant
";
