use std::collections::HashSet;

use crate::catalogue::types::{Catalogue, OptimizerDescriptor};
use crate::error::{Severity, Violation};

/// Validate a parsed catalogue for completeness and consistency.
///
/// Returns a list of violations. If any violation has
/// [`Severity::Error`], generation refuses to run.
///
/// The argument schema is not checked here: its consistency is enforced
/// by [`crate::aux_args::AuxArgSchemas::new`], which every run calls
/// before rendering anything.
pub fn validate_catalogue(catalogue: &Catalogue) -> Vec<Violation> {
    let mut violations = Vec::new();

    if catalogue.optimizers.is_empty() {
        violations.push(Violation {
            severity: Severity::Error,
            rule: "CAT-001".to_string(),
            message: "optimizers must contain at least one entry".to_string(),
            location: Some("optimizers".to_string()),
        });
    }

    validate_names(catalogue, &mut violations);
    validate_dense(catalogue, &mut violations);
    for (i, opt) in catalogue.optimizers.iter().enumerate() {
        validate_capabilities(i, opt, &mut violations);
    }

    violations
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

fn validate_names(catalogue: &Catalogue, violations: &mut Vec<Violation>) {
    let mut seen = HashSet::new();
    for (i, opt) in catalogue.optimizers.iter().enumerate() {
        if !is_identifier(&opt.name) {
            violations.push(Violation {
                severity: Severity::Error,
                rule: "CAT-002".to_string(),
                message: format!(
                    "optimizer name {:?} must match [a-z0-9_]+; \
                     it is substituted into output filenames",
                    opt.name
                ),
                location: Some(format!("optimizers[{i}].name")),
            });
        }
        if !seen.insert(opt.name.as_str()) {
            violations.push(Violation {
                severity: Severity::Error,
                rule: "CAT-003".to_string(),
                message: format!("Duplicate optimizer name: {}", opt.name),
                location: Some(format!("optimizers[{i}].name")),
            });
        }
    }
}

fn validate_dense(catalogue: &Catalogue, violations: &mut Vec<Violation>) {
    let dense: Vec<&str> = catalogue
        .optimizers
        .iter()
        .filter(|o| o.is_dense)
        .map(|o| o.name.as_str())
        .collect();
    if dense.len() > 1 {
        violations.push(Violation {
            severity: Severity::Error,
            rule: "CAT-004".to_string(),
            message: format!(
                "at most one dense optimizer is allowed, found {}: {}",
                dense.len(),
                dense.join(", ")
            ),
            location: Some("optimizers".to_string()),
        });
    }
}

fn validate_capabilities(i: usize, opt: &OptimizerDescriptor, violations: &mut Vec<Violation>) {
    if opt.is_dense && opt.supports_offloaded_storage {
        violations.push(Violation {
            severity: Severity::Warning,
            rule: "CAT-005".to_string(),
            message: format!(
                "{} is dense; supports_offloaded_storage is ignored",
                opt.name
            ),
            location: Some(format!("optimizers[{i}].supports_offloaded_storage")),
        });
    }

    if !opt.supports_any_backend() {
        violations.push(Violation {
            severity: Severity::Warning,
            rule: "CAT-006".to_string(),
            message: format!(
                "{} supports neither CPU nor GPU; only host wrappers are generated",
                opt.name
            ),
            location: Some(format!("optimizers[{i}]")),
        });
    }

    if opt.supports_gpu && !opt.is_dense && opt.device_argument_sets.gpu.is_empty() {
        violations.push(Violation {
            severity: Severity::Warning,
            rule: "CAT-007".to_string(),
            message: format!("{} supports GPU but declares no GPU arguments", opt.name),
            location: Some(format!("optimizers[{i}].arguments.gpu")),
        });
    }

    if opt.is_approximate && !opt.supports_cpu {
        violations.push(Violation {
            severity: Severity::Info,
            rule: "CAT-008".to_string(),
            message: format!(
                "{} is approximate but has no CPU kernel; the flag has no effect",
                opt.name
            ),
            location: Some(format!("optimizers[{i}].is_approximate")),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue::parse_catalogue_str;

    const HEADER: &str = r#"
version: "1.0.0"
aux_args:
  bucket_order: [aux_tensor, aux_int, aux_float, aux_bool]
  buckets:
    - name: aux_tensor
    - name: aux_int
    - name: aux_float
    - name: aux_bool
"#;

    fn catalogue(optimizers: &str) -> Catalogue {
        parse_catalogue_str(&format!("{HEADER}optimizers:\n{optimizers}")).unwrap()
    }

    fn rules(violations: &[Violation]) -> Vec<&str> {
        violations.iter().map(|v| v.rule.as_str()).collect()
    }

    #[test]
    fn clean_catalogue_has_no_errors() {
        let c = catalogue(
            r#"
  - name: sgd
    supports_cpu: true
    supports_gpu: true
    arguments:
      gpu: [learning_rate]
"#,
        );
        assert!(validate_catalogue(&c).is_empty());
    }

    #[test]
    fn empty_catalogue_is_error() {
        let c = catalogue(" []\n");
        let v = validate_catalogue(&c);
        assert_eq!(rules(&v), vec!["CAT-001"]);
        assert_eq!(v[0].severity, Severity::Error);
    }

    #[test]
    fn bad_and_duplicate_names() {
        let c = catalogue(
            r#"
  - name: Row-Wise
    supports_cpu: true
  - name: sgd
    supports_cpu: true
  - name: sgd
    supports_cpu: true
"#,
        );
        let v = validate_catalogue(&c);
        let r = rules(&v);
        assert!(r.contains(&"CAT-002"));
        assert!(r.contains(&"CAT-003"));
    }

    #[test]
    fn two_dense_optimizers_is_error() {
        let c = catalogue(
            r#"
  - name: dense
    supports_gpu: true
    is_dense: true
  - name: dense_too
    supports_gpu: true
    is_dense: true
"#,
        );
        let v = validate_catalogue(&c);
        assert!(
            v.iter()
                .any(|x| x.rule == "CAT-004" && x.severity == Severity::Error)
        );
    }

    #[test]
    fn capability_warnings() {
        let c = catalogue(
            r#"
  - name: dense
    supports_gpu: true
    supports_offloaded_storage: true
    is_dense: true
  - name: orphan
  - name: lamb
    supports_gpu: true
  - name: approx_thing
    supports_gpu: true
    is_approximate: true
    arguments:
      gpu: [eps]
"#,
        );
        let v = validate_catalogue(&c);
        let r = rules(&v);
        assert!(r.contains(&"CAT-005"));
        assert!(r.contains(&"CAT-006"));
        assert!(r.contains(&"CAT-007"));
        assert!(r.contains(&"CAT-008"));
        assert!(v.iter().all(|x| x.severity != Severity::Error));
    }
}
