use dwquery_core::memory::{die, unit};
use dwquery_core::{AllDies, At, Constant, DebugInfo, Decoded, Die, InfoError, MemoryInfo, Tag};
use rstest::{fixture, rstest};

// [0] cu a.c
//   [1] base_type int
//   [2] subprogram main
//     [3] formal_parameter argc
//     [4] variable i
//   [5] subprogram (abstract_origin -> 2)
// [6] cu b.c
//   [7] variable g
#[fixture]
fn info() -> MemoryInfo {
    MemoryInfo::new([
        unit("a.c")
            .child(die(Tag::BASE_TYPE).name("int").udata(At::BYTE_SIZE, 4))
            .child(
                die(Tag::SUBPROGRAM)
                    .name("main")
                    .flag(At::EXTERNAL)
                    .child(die(Tag::FORMAL_PARAMETER).name("argc").reference(At::TYPE, 1))
                    .child(die(Tag::VARIABLE).name("i").reference(At::TYPE, 1)),
            )
            .child(die(Tag::SUBPROGRAM).reference(At::ABSTRACT_ORIGIN, 2)),
        unit("b.c").child(die(Tag::VARIABLE).name("g")),
    ])
}

#[rstest]
fn walk_visits_every_die_in_preorder(info: MemoryInfo) {
    let mut walk = AllDies::new(&info).unwrap();
    let mut seen = Vec::new();
    while let Some(d) = walk.advance(&info).unwrap() {
        seen.push(d.offset());
    }
    assert_eq!(seen, (0..8).collect::<Vec<_>>());
    assert_eq!(walk.advance(&info).unwrap(), None);
}

#[rstest]
fn siblings_and_parents(info: MemoryInfo) {
    assert_eq!(info.first_child(Die(2)).unwrap(), Some(Die(3)));
    assert_eq!(info.next_sibling(Die(3)).unwrap(), Some(Die(4)));
    assert_eq!(info.next_sibling(Die(4)).unwrap(), None);
    assert_eq!(info.prev_sibling(Die(5)).unwrap(), Some(Die(2)));
    assert_eq!(info.prev_sibling(Die(1)).unwrap(), None);
    assert_eq!(info.parent(Die(7)).unwrap(), Some(Die(6)));
    assert_eq!(info.unit_of(Die(4)).unwrap(), Die(0));
    assert!(info.is_unit_root(Die(6)).unwrap());
    assert!(!info.is_unit_root(Die(7)).unwrap());
    assert!(!info.has_children(Die(1)).unwrap());
}

#[rstest]
fn integrated_lookup_follows_abstract_origin(info: MemoryInfo) {
    assert_eq!(info.attribute(Die(5), At::NAME).unwrap(), None);
    let name = info.attribute_integrate(Die(5), At::NAME).unwrap().unwrap();
    assert_eq!(name.decode().unwrap(), Decoded::Str("main".into()));
    assert!(info.has_attribute_integrate(Die(5), At::EXTERNAL).unwrap());
    assert!(!info.has_attribute_integrate(Die(5), At::BYTE_SIZE).unwrap());
}

#[rstest]
fn attribute_values_decode(info: MemoryInfo) {
    let size = info.attribute(Die(1), At::BYTE_SIZE).unwrap().unwrap();
    assert_eq!(size.decode().unwrap(), Decoded::Cst(Constant::unsigned(4)));
    let ty = info.attribute(Die(4), At::TYPE).unwrap().unwrap();
    assert_eq!(ty.decode().unwrap(), Decoded::Ref(Die(1)));
}

#[rstest]
fn unknown_offsets_are_reported(info: MemoryInfo) {
    assert_eq!(info.tag(Die(99)), Err(InfoError::UnknownDie(99)));
    assert_eq!(info.tag(Die(7)).unwrap(), Tag::VARIABLE);
}

#[test]
fn empty_store_walks_nothing() {
    let info = MemoryInfo::new([]);
    assert!(info.is_empty());
    let mut walk = AllDies::new(&info).unwrap();
    assert_eq!(walk.advance(&info).unwrap(), None);
}
