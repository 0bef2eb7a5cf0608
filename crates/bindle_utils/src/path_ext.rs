use sugar_path::SugarPath;

pub trait PathExt {
  fn expect_to_slash(&self) -> String;
}

impl PathExt for std::path::Path {
  fn expect_to_slash(&self) -> String {
    self
      .to_slash()
      .unwrap_or_else(|| panic!("Failed to convert {:?} to slash str", self.display()))
      .into_owned()
  }
}
