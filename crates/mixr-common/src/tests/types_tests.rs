use super::*;

#[test]
fn test_reserved_ids_are_mixin_bases() {
    assert!(TypeId::MIXIN_BASE.is_mixin_base());
    assert!(TypeId::MIXIN_BASE_WITH_NEXT.is_mixin_base());
    assert!(!TypeId::OBJECT.is_mixin_base());
    assert!(!TypeId(TypeId::FIRST_USER).is_mixin_base());
}

#[test]
fn test_property_decl_lowers_to_accessors() {
    let info = TypeInfo::class("Acme.Order").with_property(
        PropertyDecl::new("Total", TypeId::INT32).with_flags(MemberFlags::VIRTUAL),
    );

    assert_eq!(info.methods.len(), 2);
    let property = &info.properties[0];
    let getter = &info.methods[property.getter.expect("getter") as usize];
    let setter = &info.methods[property.setter.expect("setter") as usize];

    assert_eq!(getter.name, "get_Total");
    assert_eq!(getter.signature, Signature::new([], TypeId::INT32));
    assert_eq!(setter.name, "set_Total");
    assert_eq!(setter.signature, Signature::new([TypeId::INT32], TypeId::VOID));
    assert!(getter.flags.contains(MemberFlags::SPECIAL_NAME | MemberFlags::VIRTUAL));
    assert_eq!(info.property_flags(property), getter.flags);
}

#[test]
fn test_read_only_property_has_no_setter() {
    let info = TypeInfo::class("Acme.Order")
        .with_property(PropertyDecl::new("Id", TypeId::STRING).read_only());

    assert_eq!(info.methods.len(), 1);
    assert!(info.properties[0].setter.is_none());
}

#[test]
fn test_event_decl_lowers_to_add_remove() {
    let handler = TypeId(42);
    let info = TypeInfo::class("Acme.Order").with_event(EventDecl::new("Changed", handler));

    let event = &info.events[0];
    assert_eq!(info.methods[event.add.expect("add") as usize].name, "add_Changed");
    assert_eq!(
        info.methods[event.remove.expect("remove") as usize].name,
        "remove_Changed"
    );
    assert_eq!(event.signature(), Signature::new([handler], TypeId::VOID));
}

#[test]
fn test_property_visibility_is_most_visible_accessor() {
    let mut info = TypeInfo::class("Acme.Order")
        .with_property(PropertyDecl::new("Note", TypeId::STRING).with_visibility(Visibility::Protected));
    let setter = info.properties[0].setter.expect("setter") as usize;
    info.methods[setter].visibility = Visibility::Public;

    assert_eq!(info.property_visibility(&info.properties[0]), Visibility::Public);
}

#[test]
fn test_overridable_flags() {
    assert!(MemberFlags::VIRTUAL.is_overridable());
    assert!(MemberFlags::ABSTRACT.is_overridable());
    assert!(!(MemberFlags::VIRTUAL | MemberFlags::FINAL).is_overridable());
    assert!(!MemberFlags::empty().is_overridable());
}

#[test]
fn test_interface_extends_goes_to_interfaces() {
    let base = TypeId(20);
    let info = TypeInfo::interface("Acme.IDerived").extends(base);
    assert_eq!(info.interfaces, vec![base]);
    assert!(info.base.is_none());
}
