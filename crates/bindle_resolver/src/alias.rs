use std::path::PathBuf;

use bindle_common::AliasItem;
use bindle_error::BundleError;
use itertools::Itertools;

/// Substitute a matching alias prefix, longest-prefix-wins. The default
/// tie-break policy of the configuration schema lives here and only here:
/// two distinct matching prefixes of equal length are an error, not a pick.
pub fn match_alias(
  aliases: &[AliasItem],
  specifier: &str,
) -> Result<Option<PathBuf>, BundleError> {
  let matching = aliases
    .iter()
    .filter(|alias| alias.matches(specifier))
    .sorted_by_key(|alias| std::cmp::Reverse(alias.find.len()))
    .collect::<Vec<_>>();

  let Some(best) = matching.first() else {
    return Ok(None);
  };

  if let Some(next) = matching.get(1) {
    if next.find.len() == best.find.len() && next.replacement != best.replacement {
      return Err(BundleError::AmbiguousAlias {
        specifier: specifier.to_string(),
        first: best.find.clone(),
        second: next.find.clone(),
      });
    }
  }

  let rest = specifier[best.find.len()..].trim_start_matches('/');
  Ok(Some(if rest.is_empty() {
    best.replacement.clone()
  } else {
    best.replacement.join(rest)
  }))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn longest_prefix_wins() {
    let aliases = vec![
      AliasItem::new("ui", "/project/src/ui"),
      AliasItem::new("ui/icons", "/project/vendored/icons"),
    ];
    let substituted = match_alias(&aliases, "ui/icons/check").unwrap().unwrap();
    assert_eq!(substituted, PathBuf::from("/project/vendored/icons/check"));
  }

  #[test]
  fn duplicate_prefix_is_ambiguous() {
    let aliases = vec![
      AliasItem::new("components", "/project/src/components"),
      AliasItem::new("components", "/project/lib/components"),
    ];
    let error = match_alias(&aliases, "components/Button").unwrap_err();
    assert!(matches!(error, BundleError::AmbiguousAlias { .. }));
  }

  #[test]
  fn no_match_passes_through() {
    let aliases = vec![AliasItem::new("components", "/project/src/components")];
    assert!(match_alias(&aliases, "./relative.js").unwrap().is_none());
  }
}
