use super::*;
use crate::test_fixtures::{declare, void_method};
use mixr_common::{
    AnnotationInstance, AnnotationUsage, MethodInfo, PropertyDecl, Signature, TypeInfo, Visibility,
};

fn collect_all(table: &TypeTable, ty: TypeId, arena: &mut MemberArena) -> ClassMembers {
    MemberCollector::new(table)
        .collect(ty, MemberOwner::Target, arena, |_, _| true)
        .expect("collect")
}

#[test]
fn test_derived_method_hides_base_method_with_same_signature() {
    let mut table = TypeTable::new();
    let base = declare(
        &mut table,
        TypeInfo::class("Acme.Base")
            .with_method(void_method("Save"))
            .with_method(void_method("Load")),
    );
    let derived = declare(
        &mut table,
        TypeInfo::class("Acme.Derived")
            .extends(base)
            .with_method(void_method("Save")),
    );

    let mut arena = MemberArena::new();
    let members = collect_all(&table, derived, &mut arena);

    assert_eq!(members.methods.len(), 2);
    let save = members.methods[&MemberKey::new("Save", Signature::procedure())];
    assert_eq!(arena[save].member.owner, derived);
    let load = members.methods[&MemberKey::new("Load", Signature::procedure())];
    assert_eq!(arena[load].member.owner, base);
}

#[test]
fn test_private_redeclaration_yields_to_accessible_base_member() {
    let mut table = TypeTable::new();
    let base = declare(
        &mut table,
        TypeInfo::class("Acme.Base").with_method(void_method("Save")),
    );
    let derived = declare(
        &mut table,
        TypeInfo::class("Acme.Derived")
            .extends(base)
            .with_method(void_method("Save").with_visibility(Visibility::Private)),
    );

    let mut arena = MemberArena::new();
    let members = collect_all(&table, derived, &mut arena);

    assert_eq!(members.methods.len(), 1);
    let save = members.methods[&MemberKey::new("Save", Signature::procedure())];
    assert_eq!(arena[save].member.owner, base);
    assert_eq!(arena.len(), 1);
}

#[test]
fn test_private_explicit_implementation_keeps_hiding() {
    let mut table = TypeTable::new();
    let iface = declare(
        &mut table,
        TypeInfo::interface("Acme.ISaver").with_method(void_method("Save")),
    );
    let base = declare(
        &mut table,
        TypeInfo::class("Acme.Base").with_method(void_method("Save")),
    );
    let derived = declare(
        &mut table,
        TypeInfo::class("Acme.Derived")
            .extends(base)
            .implements(iface)
            .with_explicit_impl(
                MemberRef::method(iface, 0),
                void_method("Save").with_visibility(Visibility::Private),
            ),
    );

    let mut arena = MemberArena::new();
    let members = collect_all(&table, derived, &mut arena);

    let save = members.methods[&MemberKey::new("Save", Signature::procedure())];
    assert_eq!(arena[save].member.owner, derived);
    assert!(arena[save].visibility.is_private());
}

#[test]
fn test_overloads_are_kept_apart() {
    let mut table = TypeTable::new();
    let ty = declare(
        &mut table,
        TypeInfo::class("Acme.Printer")
            .with_method(void_method("Print"))
            .with_method(MethodInfo::new(
                "Print",
                Signature::new([TypeId::STRING], TypeId::VOID),
            )),
    );

    let mut arena = MemberArena::new();
    let members = collect_all(&table, ty, &mut arena);
    assert_eq!(members.methods.len(), 2);
}

#[test]
fn test_accessors_are_not_collected_as_methods() {
    let mut table = TypeTable::new();
    let ty = declare(
        &mut table,
        TypeInfo::class("Acme.Order")
            .with_property(PropertyDecl::new("Total", TypeId::INT32))
            .with_method(void_method("Submit")),
    );

    let mut arena = MemberArena::new();
    let members = collect_all(&table, ty, &mut arena);

    assert_eq!(members.methods.len(), 1);
    assert_eq!(members.properties.len(), 1);
    let total = members.properties.values().next().copied().expect("property");
    let MemberDefinitionKind::Property { getter, setter } = arena[total].kind else {
        panic!("expected a property definition");
    };
    assert_eq!(arena[getter.expect("getter")].name, "get_Total");
    assert_eq!(arena[setter.expect("setter")].name, "set_Total");
    // Property, two accessors, one method.
    assert_eq!(arena.len(), 4);
}

#[test]
fn test_hidden_property_accessors_do_not_leak_as_methods() {
    let mut table = TypeTable::new();
    let base = declare(
        &mut table,
        TypeInfo::class("Acme.Base").with_property(PropertyDecl::new("Name", TypeId::STRING)),
    );
    let derived = declare(
        &mut table,
        TypeInfo::class("Acme.Derived")
            .extends(base)
            .with_property(PropertyDecl::new("Name", TypeId::STRING)),
    );

    let mut arena = MemberArena::new();
    let members = collect_all(&table, derived, &mut arena);

    assert!(members.methods.is_empty());
    assert_eq!(members.properties.len(), 1);
    let name = members.properties.values().next().copied().expect("property");
    assert_eq!(arena[name].member.owner, derived);
}

#[test]
fn test_static_members_are_excluded() {
    let mut table = TypeTable::new();
    let ty = declare(
        &mut table,
        TypeInfo::class("Acme.Factory")
            .with_method(void_method("Create").with_flags(MemberFlags::STATIC))
            .with_method(void_method("Reset")),
    );

    let mut arena = MemberArena::new();
    let members = collect_all(&table, ty, &mut arena);
    assert_eq!(members.methods.len(), 1);
    assert_eq!(members.methods.keys().next().map(|k| k.name.as_str()), Some("Reset"));
}

#[test]
fn test_filter_limits_collected_members() {
    let mut table = TypeTable::new();
    let ty = declare(
        &mut table,
        TypeInfo::class("Acme.Order")
            .with_method(void_method("Open"))
            .with_method(void_method("Hidden").with_visibility(Visibility::Private)),
    );

    let mut arena = MemberArena::new();
    let members = MemberCollector::new(&table)
        .collect(ty, MemberOwner::Target, &mut arena, |visibility, _| {
            !visibility.is_private()
        })
        .expect("collect");
    assert_eq!(members.methods.len(), 1);
}

#[test]
fn test_definitions_are_registered_per_owner() {
    let mut table = TypeTable::new();
    let ty = declare(
        &mut table,
        TypeInfo::class("Acme.Shared").with_method(void_method("Run")),
    );

    let mut arena = MemberArena::new();
    let collector = MemberCollector::new(&table);
    collector
        .collect(ty, MemberOwner::Target, &mut arena, |_, _| true)
        .expect("as target");
    collector
        .collect(ty, MemberOwner::Mixin(ty), &mut arena, |_, _| true)
        .expect("as mixin");

    let run = MemberRef::method(ty, 0);
    let as_target = arena.find(MemberOwner::Target, run).expect("target definition");
    let as_mixin = arena.find(MemberOwner::Mixin(ty), run).expect("mixin definition");
    assert_ne!(as_target, as_mixin);
}

#[test]
fn test_type_annotations_include_inheritable_base_annotations() {
    let mut table = TypeTable::new();
    let inherited = declare(
        &mut table,
        TypeInfo::annotation("Acme.Tracked", AnnotationUsage::default()),
    );
    let local = declare(
        &mut table,
        TypeInfo::annotation(
            "Acme.Local",
            AnnotationUsage {
                inherited: false,
                allow_multiple: false,
            },
        ),
    );
    let base = declare(
        &mut table,
        TypeInfo::class("Acme.Base")
            .with_annotation(AnnotationInstance::new(inherited).with_argument("base"))
            .with_annotation(AnnotationInstance::new(local)),
    );
    let derived = declare(&mut table, TypeInfo::class("Acme.Derived").extends(base));

    let annotations = MemberCollector::new(&table)
        .collect_type_annotations(derived)
        .expect("annotations");

    assert_eq!(annotations.len(), 1);
    assert_eq!(annotations[0].kind, inherited);
    assert_eq!(annotations[0].arguments, vec!["base".to_string()]);
}

#[test]
fn test_single_use_annotation_on_derived_wins() {
    let mut table = TypeTable::new();
    let kind = declare(
        &mut table,
        TypeInfo::annotation("Acme.Tracked", AnnotationUsage::default()),
    );
    let base = declare(
        &mut table,
        TypeInfo::class("Acme.Base").with_annotation(AnnotationInstance::new(kind).with_argument("base")),
    );
    let derived = declare(
        &mut table,
        TypeInfo::class("Acme.Derived")
            .extends(base)
            .with_annotation(AnnotationInstance::new(kind).with_argument("derived")),
    );

    let annotations = MemberCollector::new(&table)
        .collect_type_annotations(derived)
        .expect("annotations");

    assert_eq!(annotations.len(), 1);
    assert_eq!(annotations[0].arguments, vec!["derived".to_string()]);
}
