/// A filename pattern like `[name].js` or `[hash].js`. Only the two
/// placeholders the configuration schema names are supported.
#[derive(Debug, Clone)]
pub struct FilenameTemplate {
  template: String,
}

impl FilenameTemplate {
  pub fn new(template: String) -> Self {
    Self { template }
  }

  pub fn render(&self, name: Option<&str>, hash: Option<&str>) -> String {
    let mut rendered = self.template.clone();
    if let Some(name) = name {
      rendered = rendered.replace("[name]", name);
    }
    if let Some(hash) = hash {
      rendered = rendered.replace("[hash]", hash);
    }
    rendered
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn render_placeholders() {
    let template = FilenameTemplate::new("[name].js".to_string());
    assert_eq!(template.render(Some("main"), None), "main.js");

    let hashed = FilenameTemplate::new("[hash].js".to_string());
    assert_eq!(hashed.render(Some("main"), Some("d41d8cd9")), "d41d8cd9.js");
  }
}
