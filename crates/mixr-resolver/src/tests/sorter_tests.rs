use super::*;
use crate::context::MemberVisibility;
use crate::model::{ClassMembers, DependencyEdge, RequirementKind};
use crate::test_fixtures::{declare, interface, void_method};
use mixr_common::TypeInfo;

fn definition(mixin_type: TypeId) -> MixinDefinition {
    MixinDefinition::new(
        mixin_type,
        ClassMembers::default(),
        Vec::new(),
        MemberVisibility::Private,
    )
}

fn requiring(mixin_type: TypeId, requirement: TypeId) -> MixinDefinition {
    let mut mixin = definition(mixin_type);
    mixin.dependencies_mut(RequirementKind::BaseCall).insert(
        requirement,
        DependencyEdge {
            depender: mixin_type,
            kind: RequirementKind::BaseCall,
            requirement,
            aggregator: None,
        },
    );
    mixin
}

fn depending(mixin_type: TypeId, on: &[TypeId]) -> MixinDefinition {
    let mut mixin = definition(mixin_type);
    mixin.mixin_dependencies.extend_from_slice(on);
    mixin
}

fn order(sorted: &[MixinDefinition]) -> Vec<TypeId> {
    sorted.iter().map(|m| m.mixin_type).collect()
}

fn classes(table: &mut TypeTable, names: &[&str]) -> Vec<TypeId> {
    names
        .iter()
        .map(|name| declare(table, TypeInfo::class(*name)))
        .collect()
}

#[test]
fn test_independent_mixins_are_ordered_by_name() {
    let mut table = TypeTable::new();
    let ids = classes(&mut table, &["Acme.Target", "Acme.Zeta", "Acme.Alpha"]);
    let (target, zeta, alpha) = (ids[0], ids[1], ids[2]);

    let sorted = MixinSorter::new(&table, target)
        .sort(vec![definition(zeta), definition(alpha)], &IndexMap::new())
        .expect("sort");

    assert_eq!(order(&sorted), vec![alpha, zeta]);
    assert_eq!(sorted[0].index(), Some(0));
    assert_eq!(sorted[1].index(), Some(1));
}

#[test]
fn test_dependent_mixin_comes_first() {
    let mut table = TypeTable::new();
    let ids = classes(&mut table, &["Acme.Target", "Acme.Alpha", "Acme.Beta"]);
    let (target, alpha, beta) = (ids[0], ids[1], ids[2]);

    let sorted = MixinSorter::new(&table, target)
        .sort(
            vec![definition(alpha), depending(beta, &[alpha])],
            &IndexMap::new(),
        )
        .expect("sort");

    assert_eq!(order(&sorted), vec![beta, alpha]);
}

#[test]
fn test_base_call_requirement_satisfied_by_implementing_mixin() {
    let mut table = TypeTable::new();
    let logger = interface(&mut table, "Acme.ILogger", &["Log"]);
    let target = declare(&mut table, TypeInfo::class("Acme.Target"));
    let logging = declare(
        &mut table,
        TypeInfo::class("Acme.LoggingMixin")
            .implements(logger)
            .with_method(void_method("Log")),
    );
    let audit = declare(&mut table, TypeInfo::class("Acme.AuditMixin"));

    let sorted = MixinSorter::new(&table, target)
        .sort(
            vec![definition(logging), requiring(audit, logger)],
            &IndexMap::new(),
        )
        .expect("sort");

    assert_eq!(order(&sorted), vec![audit, logging]);
}

#[test]
fn test_base_call_requirement_satisfied_by_introduction() {
    let mut table = TypeTable::new();
    let logger = interface(&mut table, "Acme.ILogger", &["Log"]);
    let ids = classes(
        &mut table,
        &["Acme.Target", "Acme.LoggingMixin", "Acme.ZetaMixin"],
    );
    let (target, logging, zeta) = (ids[0], ids[1], ids[2]);
    let mut introduced = IndexMap::new();
    introduced.insert(
        logger,
        InterfaceIntroduction {
            interface: logger,
            implementer: logging,
            methods: Vec::new(),
            properties: Vec::new(),
            events: Vec::new(),
        },
    );

    let sorted = MixinSorter::new(&table, target)
        .sort(vec![definition(logging), requiring(zeta, logger)], &introduced)
        .expect("sort");

    assert_eq!(order(&sorted), vec![zeta, logging]);
}

#[test]
fn test_object_and_generic_parameter_requirements_do_not_order() {
    let mut table = TypeTable::new();
    let ids = classes(&mut table, &["Acme.Target", "Acme.Beta", "Acme.Alpha"]);
    let (target, beta, alpha) = (ids[0], ids[1], ids[2]);

    let sorted = MixinSorter::new(&table, target)
        .sort(
            vec![
                requiring(beta, TypeId::OBJECT),
                requiring(alpha, TypeId::MIXIN_NEXT_PARAM),
            ],
            &IndexMap::new(),
        )
        .expect("sort");

    assert_eq!(order(&sorted), vec![alpha, beta]);
}

#[test]
fn test_ready_mixins_keep_configuration_order() {
    let mut table = TypeTable::new();
    let ids = classes(
        &mut table,
        &["Acme.Target", "Acme.B", "Acme.A", "Acme.C", "Acme.D"],
    );
    let (target, b, a, c, d) = (ids[0], ids[1], ids[2], ids[3], ids[4]);

    let sorted = MixinSorter::new(&table, target)
        .sort(
            vec![
                depending(b, &[c]),
                depending(a, &[c]),
                definition(c),
                definition(d),
            ],
            &IndexMap::new(),
        )
        .expect("sort");

    // {B, A, C} sorts before {D}; B and A are both ready first.
    assert_eq!(order(&sorted), vec![b, a, c, d]);
}

#[test]
fn test_sorting_is_deterministic() {
    let mut table = TypeTable::new();
    let ids = classes(
        &mut table,
        &["Acme.Target", "Acme.M1", "Acme.M2", "Acme.M3", "Acme.M4"],
    );
    let target = ids[0];
    let input = || {
        vec![
            depending(ids[3], &[ids[1]]),
            definition(ids[1]),
            depending(ids[4], &[ids[2]]),
            definition(ids[2]),
        ]
    };

    let sorter = MixinSorter::new(&table, target);
    let first = order(&sorter.sort(input(), &IndexMap::new()).expect("sort"));
    let second = order(&sorter.sort(input(), &IndexMap::new()).expect("sort"));
    assert_eq!(first, second);
    assert_eq!(first, vec![ids[3], ids[1], ids[4], ids[2]]);
}

#[test]
fn test_cycle_names_the_mixins_involved() {
    let mut table = TypeTable::new();
    let ids = classes(
        &mut table,
        &["Acme.Target", "Acme.X", "Acme.Y", "Acme.Free"],
    );
    let (target, x, y, free) = (ids[0], ids[1], ids[2], ids[3]);

    let err = MixinSorter::new(&table, target)
        .sort(
            vec![definition(free), depending(x, &[y]), depending(y, &[x])],
            &IndexMap::new(),
        )
        .unwrap_err();

    assert_eq!(
        err.as_configuration(),
        Some(&ConfigurationError::CircularDependency {
            target: "Acme.Target".into(),
            mixins: vec!["Acme.X".into(), "Acme.Y".into(), "Acme.X".into()],
        })
    );
}
