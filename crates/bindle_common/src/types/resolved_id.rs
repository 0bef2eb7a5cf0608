use crate::ModuleId;

/// Outcome of resolving one specifier. External ids (http/data urls) are
/// left in place and never enter the module graph.
#[derive(Debug, Clone)]
pub struct ResolvedId {
  pub id: ModuleId,
  pub is_external: bool,
}

impl ResolvedId {
  pub fn normal(id: ModuleId) -> Self {
    Self { id, is_external: false }
  }

  pub fn external(id: ModuleId) -> Self {
    Self { id, is_external: true }
  }
}
