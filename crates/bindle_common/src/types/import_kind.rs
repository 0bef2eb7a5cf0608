/// How a dependency edge was declared by its importer. Dynamic imports start
/// a new chunk boundary; url references point at asset modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImportKind {
  /// `import ... from '...'`, `export ... from '...'`, `require('...')`,
  /// css `@import '...'`.
  Static,
  /// `import('...')` — a lazy chunk boundary.
  DynamicImport,
  /// css `url(...)` or an asset reference discovered by a loader stage.
  Url,
}

impl ImportKind {
  pub fn is_dynamic(self) -> bool {
    matches!(self, Self::DynamicImport)
  }
}
