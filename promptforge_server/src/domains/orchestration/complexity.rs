/// Single source of truth for mapping an arbitrary incoming complexity
/// label to the fixed set `{simple, moderate, complex}` (§4.5 step 4).
/// Applied both to classifier output and to the selector's input, so a
/// label that is valid on one side of the orchestrator is valid on the
/// other.
pub fn normalize(label: &str) -> &'static str {
  match label.to_ascii_lowercase().as_str() {
    "low" | "easy" | "basic" | "simple" => "simple",
    "medium" | "intermediate" | "moderate" => "moderate",
    "high" | "hard" | "difficult" | "advanced" | "complex" => "complex",
    _ => "moderate",
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn maps_known_synonyms() {
    assert_eq!(normalize("low"), "simple");
    assert_eq!(normalize("Easy"), "simple");
    assert_eq!(normalize("BASIC"), "simple");
    assert_eq!(normalize("medium"), "moderate");
    assert_eq!(normalize("Intermediate"), "moderate");
    assert_eq!(normalize("high"), "complex");
    assert_eq!(normalize("Hard"), "complex");
    assert_eq!(normalize("difficult"), "complex");
    assert_eq!(normalize("ADVANCED"), "complex");
  }

  #[test]
  fn unknown_labels_default_to_moderate() {
    assert_eq!(normalize("extreme"), "moderate");
    assert_eq!(normalize(""), "moderate");
  }

  #[test]
  fn is_case_insensitive() {
    assert_eq!(normalize("MEDIUM"), normalize("medium"));
  }
}
