pub mod stages;

use std::sync::Arc;

use bindle_common::{
  ModuleId, NormalizedBundlerOptions, TransformContext, TransformOutput, TransformStage,
};
use bindle_error::{BuildResult, BundleError};
use bindle_utils::path_ext::PathExt;

use crate::types::SharedOptions;

use self::stages::{asset::AssetStage, css::CssStage, ecmascript::EcmascriptStage};

struct CompiledRule {
  rule: bindle_common::LoaderRule,
  stages: Vec<Arc<dyn TransformStage>>,
}

/// Loader rules resolved to concrete stage chains once, at pipeline build
/// time. A module's chain is looked up once per id, not per byte.
pub struct LoaderPipeline {
  rules: Vec<CompiledRule>,
  options: SharedOptions,
}

impl LoaderPipeline {
  pub fn new(options: SharedOptions) -> BuildResult<Self> {
    let mut rules = Vec::with_capacity(options.loaders.len());
    for rule in &options.loaders {
      let mut stages: Vec<Arc<dyn TransformStage>> = Vec::with_capacity(rule.stage_chain.len());
      for stage_name in &rule.stage_chain {
        stages.push(builtin_stage(stage_name, &options).ok_or_else(|| {
          BundleError::Config(format!(
            "unknown loader stage '{stage_name}' in rule '{}'",
            rule.pattern
          ))
        })?);
      }
      rules.push(CompiledRule { rule: rule.clone(), stages });
    }
    Ok(Self { rules, options })
  }

  /// First matching rule wins; modules matching none are passed through
  /// unchanged with zero declared dependencies.
  fn rule_for(&self, id: &ModuleId) -> Option<&CompiledRule> {
    let slash_path = id.path().expect_to_slash();
    self.rules.iter().find(|compiled| compiled.rule.matches(&slash_path))
  }

  /// Run the module through its stage chain: output of stage n feeds stage
  /// n+1, dependency declarations accumulate. Each stage runs on the
  /// blocking pool under the configured timeout, so one hung stage cannot
  /// stall unrelated modules.
  pub async fn transform(&self, id: &ModuleId, raw: Vec<u8>) -> BuildResult<TransformOutput> {
    let Some(rule) = self.rule_for(id) else {
      return Ok(TransformOutput::passthrough(raw));
    };

    let mut bytes = raw;
    let mut dependencies = Vec::new();
    let mut assets = Vec::new();

    for stage in &rule.stages {
      let stage = Arc::clone(stage);
      let stage_name = stage.name();
      let task_id = id.clone();
      let stage_options = rule.rule.options.clone();
      let input = std::mem::take(&mut bytes);

      let task = tokio::task::spawn_blocking(move || {
        let ctx = TransformContext { id: &task_id, options: &stage_options };
        stage.transform(&ctx, input)
      });

      let outcome = tokio::time::timeout(self.options.transform_timeout, task).await;
      let output = match outcome {
        Err(_) => {
          return Err(
            BundleError::transform(id.as_ref(), stage_name, "stage timed out").into(),
          );
        }
        Ok(Err(join_error)) => {
          return Err(
            BundleError::transform(id.as_ref(), stage_name, format!("stage panicked: {join_error}"))
              .into(),
          );
        }
        Ok(Ok(Err(message))) => {
          return Err(BundleError::transform(id.as_ref(), stage_name, message).into());
        }
        Ok(Ok(Ok(output))) => output,
      };

      bytes = output.bytes;
      dependencies.extend(output.dependencies);
      assets.extend(output.assets);
    }

    Ok(TransformOutput { bytes, dependencies, assets })
  }
}

fn builtin_stage(
  name: &str,
  options: &NormalizedBundlerOptions,
) -> Option<Arc<dyn TransformStage>> {
  Some(match name {
    "ecmascript" => Arc::new(EcmascriptStage::new(options.define.clone())),
    "css" => Arc::new(CssStage),
    "asset" => Arc::new(AssetStage::new(
      options.public_path.clone(),
      options.asset_inline_limit,
    )),
    _ => return None,
  })
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use bindle_common::{BundlerOptions, ModuleId};

  use crate::utils::normalize_options::normalize_options;

  use super::LoaderPipeline;

  fn pipeline() -> LoaderPipeline {
    let options = normalize_options(BundlerOptions {
      cwd: Some("/project".into()),
      ..BundlerOptions::default()
    })
    .unwrap();
    LoaderPipeline::new(Arc::new(options)).unwrap()
  }

  #[tokio::test]
  async fn unmatched_module_is_identity() {
    let pipeline = pipeline();
    let id = ModuleId::new("/project/notes.txt");
    let raw = b"plain text, not code".to_vec();
    let output = pipeline.transform(&id, raw.clone()).await.unwrap();
    assert_eq!(output.bytes, raw);
    assert!(output.dependencies.is_empty());
  }

  #[tokio::test]
  async fn ecmascript_rule_matches_jsx() {
    let pipeline = pipeline();
    let id = ModuleId::new("/project/src/app.jsx");
    let output = pipeline
      .transform(&id, b"import Button from 'components/Button';".to_vec())
      .await
      .unwrap();
    assert_eq!(output.dependencies.len(), 1);
    assert_eq!(output.dependencies[0].specifier.as_str(), "components/Button");
  }

  #[tokio::test]
  async fn unknown_stage_is_a_config_error() {
    let options = normalize_options(BundlerOptions {
      cwd: Some("/project".into()),
      loaders: Some(vec![bindle_common::LoaderRule::new(
        "*.sass",
        vec!["sass".to_string()],
      )]),
      ..BundlerOptions::default()
    })
    .unwrap();
    let Err(error) = LoaderPipeline::new(Arc::new(options)) else {
      panic!("an unknown stage name must be rejected");
    };
    assert!(matches!(error[0], bindle_error::BundleError::Config(_)));
  }
}
