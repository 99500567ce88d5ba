use super::*;
use crate::context::MemberVisibility;
use crate::introductions::InterfaceIntroducer;
use crate::members::MemberCollector;
use crate::model::{MixinDefinition, RequirementKind};
use crate::test_fixtures::{declare, interface, void_method};
use mixr_common::{PropertyDecl, TypeInfo, Visibility};

struct Bound {
    arena: MemberArena,
    requirements: RequirementCollection,
}

/// Registers `required` as a face requirement and binds it.
fn bind(
    table: &TypeTable,
    target: TypeId,
    required: TypeId,
    mixins: &[TypeId],
    options: CompositionOptions,
) -> Result<Bound> {
    let mut arena = MemberArena::new();
    let collector = MemberCollector::new(table);
    let target_members = collector
        .collect(target, MemberOwner::Target, &mut arena, |_, _| true)
        .expect("target members");

    let introducer = InterfaceIntroducer::new(table, target).expect("introducer");
    let mut introduced = IndexMap::new();
    for &mixin_type in mixins {
        let members = collector
            .collect(mixin_type, MemberOwner::Mixin(mixin_type), &mut arena, |_, _| true)
            .expect("mixin members");
        let mut mixin =
            MixinDefinition::new(mixin_type, members, Vec::new(), MemberVisibility::Private);
        introducer
            .introduce(&mut mixin, &[], &arena, &mut introduced, &mut Vec::new())
            .expect("introduce");
    }

    let mut requirements = RequirementCollection::new(RequirementKind::Face);
    requirements.get_or_create(required);
    RequirementBinder::new(table, target, options)?.bind_all(
        &mut requirements,
        &arena,
        &target_members,
        &introduced,
    )?;
    Ok(Bound {
        arena,
        requirements,
    })
}

fn sources(bound: &Bound, required: TypeId) -> Vec<BindingSource> {
    bound
        .requirements
        .get(required)
        .expect("requirement")
        .required_methods
        .iter()
        .map(|b| b.source)
        .collect()
}

#[test]
fn test_declared_implementation_is_preferred() {
    let mut table = TypeTable::new();
    let greeter = interface(&mut table, "Acme.IGreeter", &["Greet"]);
    let target = declare(
        &mut table,
        TypeInfo::class("Acme.Order")
            .implements(greeter)
            .with_method(void_method("Greet")),
    );

    let bound = bind(&table, target, greeter, &[], CompositionOptions::default()).expect("bind");
    assert_eq!(sources(&bound, greeter), vec![BindingSource::DeclaredImplementation]);
    let binding = &bound.requirements.get(greeter).expect("greeter").required_methods[0];
    assert_eq!(binding.required_method, MemberRef::method(greeter, 0));
    assert_eq!(bound.arena[binding.implementer].owner, MemberOwner::Target);
}

#[test]
fn test_declared_implementation_in_base_class_binds() {
    let mut table = TypeTable::new();
    let greeter = interface(&mut table, "Acme.IGreeter", &["Greet"]);
    let base = declare(
        &mut table,
        TypeInfo::class("Acme.OrderBase")
            .implements(greeter)
            .with_method(void_method("Greet")),
    );
    let target = declare(&mut table, TypeInfo::class("Acme.Order").extends(base));

    let bound = bind(&table, target, greeter, &[], CompositionOptions::default()).expect("bind");
    let binding = &bound.requirements.get(greeter).expect("greeter").required_methods[0];
    assert_eq!(bound.arena[binding.implementer].member.owner, base);
}

#[test]
fn test_private_redeclaration_does_not_hide_declared_implementation() {
    let mut table = TypeTable::new();
    let greeter = interface(&mut table, "Acme.IGreeter", &["Greet"]);
    let base = declare(
        &mut table,
        TypeInfo::class("Acme.OrderBase")
            .implements(greeter)
            .with_method(void_method("Greet")),
    );
    let target = declare(
        &mut table,
        TypeInfo::class("Acme.Order")
            .extends(base)
            .with_method(void_method("Greet").with_visibility(Visibility::Private)),
    );

    let bound = bind(&table, target, greeter, &[], CompositionOptions::default())
        .expect("private redeclaration must not break declared binding");
    let binding = &bound.requirements.get(greeter).expect("greeter").required_methods[0];
    assert_eq!(binding.source, BindingSource::DeclaredImplementation);
    assert_eq!(bound.arena[binding.implementer].member, MemberRef::method(base, 0));
    assert_eq!(bound.arena[binding.implementer].visibility, Visibility::Public);
}

#[test]
fn test_introduced_interface_binds_to_mixin_members() {
    let mut table = TypeTable::new();
    let named = declare(
        &mut table,
        TypeInfo::interface("Acme.INamed")
            .with_method(void_method("Rename"))
            .with_property(PropertyDecl::new("Name", TypeId::STRING)),
    );
    let target = declare(&mut table, TypeInfo::class("Acme.Order"));
    let mixin = declare(
        &mut table,
        TypeInfo::class("Acme.NamedMixin")
            .implements(named)
            .with_property(PropertyDecl::new("Name", TypeId::STRING))
            .with_method(void_method("Rename")),
    );

    let bound = bind(&table, target, named, &[mixin], CompositionOptions::default()).expect("bind");
    let bindings = &bound.requirements.get(named).expect("named").required_methods;
    assert_eq!(bindings.len(), 3);
    assert!(bindings.iter().all(|b| b.source == BindingSource::IntroducedInterface));
    let names: Vec<&str> = bindings
        .iter()
        .map(|b| bound.arena[b.implementer].name.as_str())
        .collect();
    assert_eq!(names, vec!["Rename", "get_Name", "set_Name"]);
    assert!(bindings
        .iter()
        .all(|b| bound.arena[b.implementer].owner == MemberOwner::Mixin(mixin)));
}

#[test]
fn test_structural_binding_matches_name_and_signature() {
    let mut table = TypeTable::new();
    let greeter = interface(&mut table, "Acme.IGreeter", &["Greet"]);
    let target = declare(
        &mut table,
        TypeInfo::class("Acme.Order").with_method(void_method("Greet")),
    );

    let bound = bind(&table, target, greeter, &[], CompositionOptions::default()).expect("bind");
    assert_eq!(sources(&bound, greeter), vec![BindingSource::Structural]);
}

#[test]
fn test_structural_binding_covers_property_accessors() {
    let mut table = TypeTable::new();
    let named = declare(
        &mut table,
        TypeInfo::interface("Acme.INamed").with_property(PropertyDecl::new("Name", TypeId::STRING)),
    );
    let target = declare(
        &mut table,
        TypeInfo::class("Acme.Order").with_property(PropertyDecl::new("Name", TypeId::STRING)),
    );

    let bound = bind(&table, target, named, &[], CompositionOptions::default()).expect("bind");
    let bindings = &bound.requirements.get(named).expect("named").required_methods;
    let names: Vec<&str> = bindings
        .iter()
        .map(|b| bound.arena[b.implementer].name.as_str())
        .collect();
    assert_eq!(names, vec!["get_Name", "set_Name"]);
}

#[test]
fn test_private_target_member_does_not_bind_structurally() {
    let mut table = TypeTable::new();
    let greeter = interface(&mut table, "Acme.IGreeter", &["Greet"]);
    let target = declare(
        &mut table,
        TypeInfo::class("Acme.Order")
            .with_method(void_method("Greet").with_visibility(Visibility::Private)),
    );

    let err = bind(&table, target, greeter, &[], CompositionOptions::default())
        .err()
        .expect("unmet requirement");
    assert!(matches!(
        err.as_configuration(),
        Some(ConfigurationError::UnmetRequirement { .. })
    ));
}

#[test]
fn test_unmet_requirement_names_member_interface_and_target() {
    let mut table = TypeTable::new();
    let greeter = interface(&mut table, "Acme.IGreeter", &["Greet"]);
    let target = declare(&mut table, TypeInfo::class("Acme.Order"));

    let err = bind(&table, target, greeter, &[], CompositionOptions::default())
        .err()
        .expect("unmet requirement");
    let Some(ConfigurationError::UnmetRequirement {
        member,
        requirement,
        target,
        ..
    }) = err.as_configuration()
    else {
        panic!("unexpected error: {err}");
    };
    assert_eq!(member, "Acme.IGreeter.Greet");
    assert_eq!(requirement, "Acme.IGreeter");
    assert_eq!(target, "Acme.Order");
}

#[test]
fn test_structural_binding_can_be_disabled() {
    let mut table = TypeTable::new();
    let greeter = interface(&mut table, "Acme.IGreeter", &["Greet"]);
    let target = declare(
        &mut table,
        TypeInfo::class("Acme.Order").with_method(void_method("Greet")),
    );

    let options = CompositionOptions::default().without_structural_binding();
    let err = bind(&table, target, greeter, &[], options)
        .err()
        .expect("unmet requirement");
    assert!(matches!(
        err.as_configuration(),
        Some(ConfigurationError::UnmetRequirement { .. })
    ));
}

#[test]
fn test_class_requirement_needs_derivation() {
    let mut table = TypeTable::new();
    let entity = declare(&mut table, TypeInfo::class("Acme.Entity"));
    let target = declare(&mut table, TypeInfo::class("Acme.Order"));
    let derived = declare(&mut table, TypeInfo::class("Acme.Invoice").extends(entity));

    let err = bind(&table, target, entity, &[], CompositionOptions::default())
        .err()
        .expect("unsatisfied class requirement");
    assert!(matches!(
        err.as_configuration(),
        Some(ConfigurationError::UnsatisfiedClassRequirement { .. })
    ));

    let bound = bind(&table, derived, entity, &[], CompositionOptions::default()).expect("bind");
    assert!(bound.requirements.get(entity).expect("entity").required_methods.is_empty());
}

#[test]
fn test_empty_interface_needs_no_bindings() {
    let mut table = TypeTable::new();
    let marker = interface(&mut table, "Acme.IMarker", &[]);
    let target = declare(&mut table, TypeInfo::class("Acme.Order"));

    let bound = bind(&table, target, marker, &[], CompositionOptions::default()).expect("bind");
    assert!(sources(&bound, marker).is_empty());
}
