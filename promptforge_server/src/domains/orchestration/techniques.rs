use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Static catalog served by `GET /api/v1/techniques` (cached under
/// `technique:v1:catalog`, TTL 30 min).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TechniqueDescriptor {
  pub name: String,
  pub description: String,
}

/// Built fresh from `&'static str` literals rather than stored as a
/// `const` slice, since `TechniqueDescriptor` now owns its strings (it must
/// be `DeserializeOwned` to round-trip through the cache).
pub fn catalog() -> Vec<TechniqueDescriptor> {
  [
    (
      "chain_of_thought",
      "Guides the model through intermediate reasoning steps before the final answer.",
    ),
    (
      "few_shot",
      "Primes the model with a small number of worked examples.",
    ),
    (
      "zero_shot",
      "Asks the model to perform the task directly without examples.",
    ),
    (
      "role_prompting",
      "Frames the task from a named persona or role to steer tone and focus.",
    ),
    (
      "self_consistency",
      "Samples multiple reasoning paths and reconciles them into one answer.",
    ),
    (
      "tree_of_thought",
      "Explores multiple branching lines of reasoning before committing to one.",
    ),
  ]
  .into_iter()
  .map(|(name, description)| TechniqueDescriptor {
    name: name.to_string(),
    description: description.to_string(),
  })
  .collect()
}

/// §4.5 step 5 / §9's Design Note: a pure function of the selector result,
/// the classifier's suggested techniques, and the hard-coded default,
/// kept free of any network dependency so it is directly unit-testable.
///
/// Precedence: selector techniques, if the selector succeeded and returned
/// any; else the classifier's suggestions, if non-empty; else
/// `["chain_of_thought"]`.
pub fn fallback_chain(
  selector_techniques: Option<&[String]>,
  classifier_suggested: &[String],
) -> Vec<String> {
  if let Some(techniques) = selector_techniques {
    if !techniques.is_empty() {
      return techniques.to_vec();
    }
  }

  if !classifier_suggested.is_empty() {
    return classifier_suggested.to_vec();
  }

  vec!["chain_of_thought".to_string()]
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn prefers_selector_result_when_present() {
    let result = fallback_chain(
      Some(&["few_shot".to_string()]),
      &["zero_shot".to_string()],
    );
    assert_eq!(result, vec!["few_shot".to_string()]);
  }

  #[test]
  fn falls_back_to_classifier_suggestions_when_selector_failed() {
    let result = fallback_chain(None, &["zero_shot".to_string()]);
    assert_eq!(result, vec!["zero_shot".to_string()]);
  }

  #[test]
  fn falls_back_to_classifier_suggestions_when_selector_returned_empty() {
    let result = fallback_chain(Some(&[]), &["role_prompting".to_string()]);
    assert_eq!(result, vec!["role_prompting".to_string()]);
  }

  #[test]
  fn falls_back_to_default_when_everything_is_empty() {
    let result = fallback_chain(None, &[]);
    assert_eq!(result, vec!["chain_of_thought".to_string()]);
  }
}
