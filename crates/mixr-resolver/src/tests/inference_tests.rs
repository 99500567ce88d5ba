use super::*;
use crate::error::CompositionError;
use crate::test_fixtures::{declare, interface, mixin_base, mixin_base_with_next};
use mixr_common::TypeInfo;

#[test]
fn test_mixin_without_mixin_base_has_no_requirements() {
    let mut table = TypeTable::new();
    let target = declare(&mut table, TypeInfo::class("Acme.Order"));
    let plain = declare(&mut table, TypeInfo::class("Acme.PlainMixin"));

    let inferred = RequirementInference::new(&table)
        .infer(plain, target)
        .expect("infer");
    assert_eq!(inferred, InferredRequirements::default());
}

#[test]
fn test_face_argument_becomes_face_requirement() {
    let mut table = TypeTable::new();
    let target = declare(&mut table, TypeInfo::class("Acme.Order"));
    let face = interface(&mut table, "Acme.IOrder", &["Submit"]);
    let base = mixin_base(&mut table, face);
    let mixin = declare(&mut table, TypeInfo::class("Acme.AuditMixin").extends(base));

    let inferred = RequirementInference::new(&table)
        .infer(mixin, target)
        .expect("infer");
    assert_eq!(inferred.face, vec![InferredRequirement::leaf(face)]);
    assert!(inferred.base_call.is_empty());
}

#[test]
fn test_next_argument_becomes_base_call_requirement() {
    let mut table = TypeTable::new();
    let target = declare(&mut table, TypeInfo::class("Acme.Order"));
    let next = interface(&mut table, "Acme.ISaver", &["Save"]);
    let base = mixin_base_with_next(&mut table, TypeId::OBJECT, next);
    let mixin = declare(&mut table, TypeInfo::class("Acme.SaveMixin").extends(base));

    let inferred = RequirementInference::new(&table)
        .infer(mixin, target)
        .expect("infer");
    assert_eq!(inferred.face, vec![InferredRequirement::leaf(TypeId::OBJECT)]);
    assert_eq!(inferred.base_call, vec![InferredRequirement::leaf(next)]);
}

#[test]
fn test_mixin_base_found_through_intermediate_base_class() {
    let mut table = TypeTable::new();
    let target = declare(&mut table, TypeInfo::class("Acme.Order"));
    let face = interface(&mut table, "Acme.IOrder", &[]);
    let base = mixin_base(&mut table, face);
    let middle = declare(&mut table, TypeInfo::class("Acme.MixinSupport").extends(base));
    let mixin = declare(&mut table, TypeInfo::class("Acme.AuditMixin").extends(middle));

    let inferred = RequirementInference::new(&table)
        .infer(mixin, target)
        .expect("infer");
    assert_eq!(inferred.face[0].required_type, face);
}

#[test]
fn test_generic_parameter_aggregates_its_constraints() {
    let mut table = TypeTable::new();
    let first = interface(&mut table, "Acme.IFirst", &["A"]);
    let second = interface(&mut table, "Acme.ISecond", &["B"]);
    let param = declare(
        &mut table,
        TypeInfo::generic_parameter("TNext")
            .constrained_by(first)
            .constrained_by(second),
    );

    let node = RequirementInference::new(&table).expand(param).expect("expand");
    assert_eq!(node.required_type, param);
    assert_eq!(node.flatten(), vec![param, first, second]);
}

#[test]
fn test_interface_requirement_includes_extended_interfaces() {
    let mut table = TypeTable::new();
    let root = interface(&mut table, "Acme.IRoot", &["Root"]);
    let middle = declare(
        &mut table,
        TypeInfo::interface("Acme.IMiddle").extends(root),
    );
    let leaf = declare(&mut table, TypeInfo::interface("Acme.ILeaf").extends(middle));

    let node = RequirementInference::new(&table).expand(leaf).expect("expand");
    assert_eq!(node.flatten(), vec![leaf, middle, root]);
}

#[test]
fn test_mixin_base_cannot_be_applied_directly() {
    let mut table = TypeTable::new();
    let target = declare(&mut table, TypeInfo::class("Acme.Order"));
    let closed = mixin_base(&mut table, target);
    let inference = RequirementInference::new(&table);

    for mixin in [TypeId::MIXIN_BASE, closed] {
        let err = inference.infer(mixin, target).unwrap_err();
        assert!(
            matches!(
                err,
                CompositionError::Configuration(ConfigurationError::MixinBaseAppliedDirectly { .. })
            ),
            "unexpected error: {err}"
        );
    }
}
