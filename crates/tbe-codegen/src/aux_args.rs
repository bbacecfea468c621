//! Positional auxiliary-argument schema.
//!
//! Compiled-execution wrappers and dispatch modules pack auxiliary
//! arguments into one list per value type. The position of each name in
//! its bucket is the contract between independently generated artifacts,
//! so the schema is built once per run and only borrowed afterwards.
//!
//! Two forms coexist: the base form and the offloaded-storage form, whose
//! boolean bucket has extra entries appended after the base entries.
//! Callers pick a form with [`AuxArgSchemas::for_storage`]; neither form
//! is ever modified after construction.

use std::collections::HashSet;

use crate::catalogue::AuxArgsDecl;
use crate::error::CodegenError;
use crate::naming::storage_suffix;
use crate::template::Bindings;

/// The four fixed buckets, in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BucketKind {
    Tensor,
    Int,
    Float,
    Bool,
}

impl BucketKind {
    pub const ALL: [Self; 4] = [Self::Tensor, Self::Int, Self::Float, Self::Bool];

    pub fn name(self) -> &'static str {
        match self {
            Self::Tensor => "aux_tensor",
            Self::Int => "aux_int",
            Self::Float => "aux_float",
            Self::Bool => "aux_bool",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }
}

impl std::fmt::Display for BucketKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One form of the schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuxArgSchema {
    offloaded: bool,
    buckets: Vec<(BucketKind, Vec<String>)>,
}

impl AuxArgSchema {
    pub fn is_offloaded(&self) -> bool {
        self.offloaded
    }

    pub fn bucket_kinds(&self) -> impl Iterator<Item = BucketKind> + '_ {
        self.buckets.iter().map(|(k, _)| *k)
    }

    pub fn bucket(&self, kind: BucketKind) -> &[String] {
        self.buckets
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, args)| args.as_slice())
            .unwrap_or(&[])
    }

    /// One `bucket[index] = name` line per argument, bucket by bucket.
    pub fn positional_catalogue(&self) -> String {
        let mut out = String::new();
        for (kind, args) in &self.buckets {
            for (i, arg) in args.iter().enumerate() {
                out.push_str(&format!("{kind}[{i}] = {arg}\n"));
            }
        }
        out
    }

    /// Bindings for templates that pack or unpack auxiliary arguments.
    pub fn bindings(&self) -> Bindings {
        let mut b = Bindings::new()
            .with("aux_suffix", storage_suffix(self.offloaded))
            .with(
                "aux_names",
                self.buckets
                    .iter()
                    .map(|(k, _)| k.name().to_string())
                    .collect::<Vec<_>>(),
            )
            .with("aux_catalogue", self.positional_catalogue());
        for (kind, args) in &self.buckets {
            b.set(kind.name(), args.clone());
        }
        b
    }
}

/// Both schema forms, built together from one declaration.
#[derive(Debug, Clone)]
pub struct AuxArgSchemas {
    base: AuxArgSchema,
    offloaded: AuxArgSchema,
}

impl AuxArgSchemas {
    /// Build both forms and check the declaration is consistent.
    ///
    /// # Errors
    ///
    /// - [`CodegenError::UnknownBucket`] for a name outside the four fixed
    ///   buckets.
    /// - [`CodegenError::SchemaMismatch`] if `bucket_order` does not list
    ///   the declared buckets in declaration order, or the declaration does
    ///   not cover each fixed bucket exactly once.
    /// - [`CodegenError::MissingOffloadedExtras`] if no boolean extras are
    ///   declared, which would make both forms identical.
    /// - [`CodegenError::DuplicateArgument`] if a name appears twice in the
    ///   offloaded form.
    pub fn new(decl: &AuxArgsDecl) -> Result<Self, CodegenError> {
        let found: Vec<String> = decl.buckets.iter().map(|b| b.name.clone()).collect();
        for name in decl.bucket_order.iter().chain(&found) {
            if BucketKind::from_name(name).is_none() {
                return Err(CodegenError::UnknownBucket(name.clone()));
            }
        }
        if decl.bucket_order != found {
            return Err(CodegenError::SchemaMismatch {
                declared: decl.bucket_order.clone(),
                found,
            });
        }
        let distinct: HashSet<&str> = found.iter().map(String::as_str).collect();
        if found.len() != BucketKind::ALL.len() || distinct.len() != found.len() {
            return Err(CodegenError::SchemaMismatch {
                declared: decl.bucket_order.clone(),
                found: BucketKind::ALL.iter().map(|k| k.name().to_string()).collect(),
            });
        }

        if decl.offloaded_bool_extras.is_empty() {
            return Err(CodegenError::MissingOffloadedExtras);
        }

        let buckets: Vec<(BucketKind, Vec<String>)> = decl
            .buckets
            .iter()
            .filter_map(|b| BucketKind::from_name(&b.name).map(|k| (k, b.args.clone())))
            .collect();

        let base = AuxArgSchema {
            offloaded: false,
            buckets,
        };
        let mut offloaded = base.clone();
        offloaded.offloaded = true;
        for (kind, args) in &mut offloaded.buckets {
            if *kind == BucketKind::Bool {
                args.extend(decl.offloaded_bool_extras.iter().cloned());
            }
        }

        check_unique(&offloaded)?;
        Ok(Self { base, offloaded })
    }

    pub fn base(&self) -> &AuxArgSchema {
        &self.base
    }

    pub fn offloaded(&self) -> &AuxArgSchema {
        &self.offloaded
    }

    /// The form matching an offloaded-storage setting.
    pub fn for_storage(&self, offloaded_storage: bool) -> &AuxArgSchema {
        if offloaded_storage {
            &self.offloaded
        } else {
            &self.base
        }
    }
}

fn check_unique(schema: &AuxArgSchema) -> Result<(), CodegenError> {
    let mut seen = HashSet::new();
    for (kind, args) in &schema.buckets {
        for arg in args {
            if !seen.insert(arg.as_str()) {
                return Err(CodegenError::DuplicateArgument {
                    bucket: kind.name().to_string(),
                    name: arg.clone(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue::BucketDecl;

    fn bucket(name: &str, args: &[&str]) -> BucketDecl {
        BucketDecl {
            name: name.to_string(),
            args: args.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    fn decl() -> AuxArgsDecl {
        AuxArgsDecl {
            bucket_order: BucketKind::ALL.iter().map(|k| k.name().to_string()).collect(),
            buckets: vec![
                bucket("aux_tensor", &["B_offsets", "lxu_cache_locations"]),
                bucket("aux_int", &["iter"]),
                bucket("aux_float", &["gwd_lower_bound", "max_gradient"]),
                bucket("aux_bool", &["is_experimental_tbe", "mixed_D"]),
            ],
            offloaded_bool_extras: vec!["enable_optimizer_offloading".to_string()],
        }
    }

    #[test]
    fn offloaded_form_appends_to_bool_bucket() {
        let s = AuxArgSchemas::new(&decl()).unwrap();
        let base = s.base().bucket(BucketKind::Bool);
        let ext = s.offloaded().bucket(BucketKind::Bool);
        assert_eq!(ext.len(), base.len() + 1);
        assert_eq!(&ext[..base.len()], base);
        assert_eq!(ext.last().unwrap(), "enable_optimizer_offloading");
    }

    #[test]
    fn forms_share_bucket_names_and_other_buckets() {
        let s = AuxArgSchemas::new(&decl()).unwrap();
        let a: Vec<_> = s.base().bucket_kinds().collect();
        let b: Vec<_> = s.offloaded().bucket_kinds().collect();
        assert_eq!(a, b);
        for kind in [BucketKind::Tensor, BucketKind::Int, BucketKind::Float] {
            assert_eq!(s.base().bucket(kind), s.offloaded().bucket(kind));
        }
    }

    #[test]
    fn for_storage_selects_form() {
        let s = AuxArgSchemas::new(&decl()).unwrap();
        assert!(s.for_storage(true).is_offloaded());
        assert!(!s.for_storage(false).is_offloaded());
        assert_eq!(s.for_storage(false), s.base());
    }

    #[test]
    fn mismatched_order_is_rejected() {
        let mut d = decl();
        d.bucket_order.swap(0, 1);
        let err = AuxArgSchemas::new(&d).unwrap_err();
        assert!(matches!(err, CodegenError::SchemaMismatch { .. }));
    }

    #[test]
    fn unknown_bucket_is_rejected() {
        let mut d = decl();
        d.buckets[2].name = "aux_double".to_string();
        d.bucket_order[2] = "aux_double".to_string();
        let err = AuxArgSchemas::new(&d).unwrap_err();
        assert!(matches!(err, CodegenError::UnknownBucket(ref n) if n == "aux_double"));
    }

    #[test]
    fn missing_bucket_is_rejected() {
        let mut d = decl();
        d.buckets.pop();
        d.bucket_order.pop();
        assert!(matches!(
            AuxArgSchemas::new(&d),
            Err(CodegenError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn duplicate_argument_is_rejected() {
        let mut d = decl();
        d.offloaded_bool_extras.push("mixed_D".to_string());
        let err = AuxArgSchemas::new(&d).unwrap_err();
        assert!(matches!(
            err,
            CodegenError::DuplicateArgument { ref bucket, ref name }
                if bucket == "aux_bool" && name == "mixed_D"
        ));
    }

    #[test]
    fn empty_offloaded_extras_are_rejected() {
        let mut d = decl();
        d.offloaded_bool_extras.clear();
        assert!(matches!(
            AuxArgSchemas::new(&d),
            Err(CodegenError::MissingOffloadedExtras)
        ));
    }

    #[test]
    fn positional_catalogue_lists_every_bucket() {
        let s = AuxArgSchemas::new(&decl()).unwrap();
        assert!(
            s.offloaded()
                .positional_catalogue()
                .ends_with("aux_bool[2] = enable_optimizer_offloading\n")
        );
        let cat = s.base().positional_catalogue();
        assert!(cat.starts_with("aux_tensor[0] = B_offsets\n"));
        assert!(cat.contains("aux_bool[1] = mixed_D\n"));
    }

    #[test]
    fn bindings_expose_buckets() {
        let s = AuxArgSchemas::new(&decl()).unwrap();
        let b = s.offloaded().bindings();
        assert_eq!(b.get("aux_suffix").unwrap().to_string(), "_ssd");
        assert_eq!(
            b.get("aux_names").unwrap().to_string(),
            "aux_tensor, aux_int, aux_float, aux_bool"
        );
        assert!(b.get("aux_bool").unwrap().to_string().ends_with("enable_optimizer_offloading"));
    }
}
