//! Clean → Understand → Describe prompt chain.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{FlowError, Result};
use crate::generation::TextGenerator;
use crate::prompts::{PromptStage, StageName};

/// What one stage produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageOutput {
    pub stage: StageName,
    pub prompt_chars: usize,
    pub output: String,
}

/// All stage outputs of a completed run; `description` is the last one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefinementTrace {
    pub stages: Vec<StageOutput>,
    pub description: String,
}

pub struct RefinementPipeline {
    generator: Arc<dyn TextGenerator>,
    stages: Vec<PromptStage>,
}

impl RefinementPipeline {
    pub fn new(generator: Arc<dyn TextGenerator>, stages: Vec<PromptStage>) -> Self {
        Self { generator, stages }
    }

    pub fn from_config(generator: Arc<dyn TextGenerator>, config: &Config) -> Result<Self> {
        let stages = StageName::REFINEMENT
            .iter()
            .map(|name| {
                PromptStage::from_config(*name, config)
                    .map_err(|e| FlowError::config(format!("stage '{name}' template {e}")))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(generator, stages))
    }

    /// Run every stage in order, feeding each output into the next template.
    ///
    /// Any failure aborts the run; no partial trace is returned.
    pub async fn run(&self, text: &str) -> Result<RefinementTrace> {
        let mut current = text.to_string();
        let mut outputs = Vec::with_capacity(self.stages.len());

        for stage in &self.stages {
            if current.trim().is_empty() {
                return Err(FlowError::model(format!(
                    "stage '{}' has no input text",
                    stage.name
                )));
            }

            let prompt = stage.render(&current);
            info!(stage = %stage.name, input_chars = current.len(), "running refinement stage");
            debug!(stage = %stage.name, %prompt, "stage prompt");

            let output = self
                .generator
                .invoke(&prompt, &stage.generation)
                .await
                .map_err(|e| FlowError::model(format!("stage '{}' failed: {e}", stage.name)))?;

            info!(stage = %stage.name, output_chars = output.len(), "stage finished");
            debug!(stage = %stage.name, %output, "stage output");

            if output.trim().is_empty() {
                return Err(FlowError::model(format!(
                    "stage '{}' produced no text",
                    stage.name
                )));
            }

            outputs.push(StageOutput {
                stage: stage.name,
                prompt_chars: prompt.len(),
                output: output.clone(),
            });
            current = output;
        }

        Ok(RefinementTrace {
            stages: outputs,
            description: current,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::{GenerationConfig, ModelError};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Recorder {
        prompts: Mutex<Vec<String>>,
        replies: Mutex<Vec<std::result::Result<String, ModelError>>>,
    }

    impl Recorder {
        fn new(replies: Vec<std::result::Result<String, ModelError>>) -> Arc<Self> {
            Arc::new(Self {
                prompts: Mutex::new(Vec::new()),
                replies: Mutex::new(replies),
            })
        }
    }

    #[async_trait]
    impl TextGenerator for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        async fn invoke(
            &self,
            prompt: &str,
            _config: &GenerationConfig,
        ) -> std::result::Result<String, ModelError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.replies.lock().unwrap().remove(0)
        }
    }

    #[tokio::test]
    async fn chains_each_output_into_next_prompt() {
        let rec = Recorder::new(vec![
            Ok("cleaned labels".into()),
            Ok("understood flow".into()),
            Ok("final steps".into()),
        ]);
        let pipeline = RefinementPipeline::from_config(rec.clone(), &Config::default()).unwrap();

        let trace = pipeline.run("raw ocr").await.unwrap();

        let prompts = rec.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 3);
        assert!(prompts[0].contains("raw ocr"));
        assert!(prompts[1].contains("cleaned labels"));
        assert!(prompts[2].contains("understood flow"));
        assert_eq!(trace.description, "final steps");
        let names: Vec<_> = trace.stages.iter().map(|s| s.stage).collect();
        assert_eq!(names, StageName::REFINEMENT.to_vec());
    }

    #[tokio::test]
    async fn model_error_aborts_without_running_later_stages() {
        let rec = Recorder::new(vec![
            Ok("cleaned".into()),
            Err(ModelError::EmptyResponse),
            Ok("never".into()),
        ]);
        let pipeline = RefinementPipeline::from_config(rec.clone(), &Config::default()).unwrap();

        let err = pipeline.run("raw").await.unwrap_err();
        assert!(matches!(err, FlowError::ModelInvocation(ref m) if m.contains("understand")));
        assert_eq!(rec.prompts.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn blank_stage_output_aborts() {
        let rec = Recorder::new(vec![Ok("   ".into()), Ok("never".into()), Ok("never".into())]);
        let pipeline = RefinementPipeline::from_config(rec.clone(), &Config::default()).unwrap();

        let err = pipeline.run("raw").await.unwrap_err();
        assert!(matches!(err, FlowError::ModelInvocation(ref m) if m.contains("produced no text")));
        assert_eq!(rec.prompts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_input_is_rejected_before_any_call() {
        let rec = Recorder::new(vec![]);
        let pipeline = RefinementPipeline::from_config(rec.clone(), &Config::default()).unwrap();

        assert!(pipeline.run(" \n").await.is_err());
        assert!(rec.prompts.lock().unwrap().is_empty());
    }
}
