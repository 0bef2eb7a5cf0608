use std::{
  ops::{Deref, DerefMut},
  path::PathBuf,
};

/// One structured bundling failure. Every variant carries enough context for
/// a caller to render a precise diagnostic without re-deriving it.
#[derive(Debug, thiserror::Error)]
pub enum BundleError {
  #[error("Could not resolve '{specifier}'{}", render_importer_chain(.importers))]
  Resolve { specifier: String, importers: Vec<String> },

  #[error("Alias prefixes '{first}' and '{second}' both match '{specifier}' and neither is a prefix of the other")]
  AmbiguousAlias { specifier: String, first: String, second: String },

  #[error("Loader stage '{stage}' failed for {module_id}: {message}")]
  Transform { module_id: String, stage: String, message: String },

  #[error("Module discovery did not converge: {graph_size} module ids exceed the variant budget of {budget}; this is a bug")]
  CycleBudgetExceeded { budget: usize, graph_size: usize },

  #[error("IO error on {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("Invalid configuration: {0}")]
  Config(String),

  #[error(transparent)]
  Other(#[from] anyhow::Error),
}

impl BundleError {
  pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
    Self::Io { path: path.into(), source }
  }

  pub fn transform(
    module_id: impl Into<String>,
    stage: impl Into<String>,
    message: impl Into<String>,
  ) -> Self {
    Self::Transform { module_id: module_id.into(), stage: stage.into(), message: message.into() }
  }
}

fn render_importer_chain(importers: &[String]) -> String {
  if importers.is_empty() {
    String::new()
  } else {
    format!(" imported by {}", importers.join(" <- "))
  }
}

/// Errors of a whole build attempt. A build may surface several independent
/// failures at once (e.g. two unresolvable imports in different modules).
#[derive(Debug)]
pub struct BuildError(pub Vec<BundleError>);

impl Deref for BuildError {
  type Target = Vec<BundleError>;

  fn deref(&self) -> &Self::Target {
    &self.0
  }
}

impl DerefMut for BuildError {
  fn deref_mut(&mut self) -> &mut Self::Target {
    &mut self.0
  }
}

impl From<BundleError> for BuildError {
  fn from(error: BundleError) -> Self {
    Self(vec![error])
  }
}

impl From<Vec<BundleError>> for BuildError {
  fn from(errors: Vec<BundleError>) -> Self {
    Self(errors)
  }
}

impl From<anyhow::Error> for BuildError {
  fn from(error: anyhow::Error) -> Self {
    Self(vec![BundleError::Other(error)])
  }
}

impl std::fmt::Display for BuildError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    for (index, error) in self.0.iter().enumerate() {
      if index > 0 {
        writeln!(f)?;
      }
      write!(f, "{error}")?;
    }
    Ok(())
  }
}

pub type BuildResult<T> = Result<T, BuildError>;
