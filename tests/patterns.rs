//! Pattern matching integration tests.
//!
//! These tests run declarative patterns against assembled control flow
//! graphs through the public API, verifying match counts, variable
//! bindings, occurrence windows, edge-walk rules, and the dominated-by
//! constraint.

use byteflow::prelude::*;

fn static_method(max_locals: u16) -> MethodDesc {
    MethodDesc::new("com/acme/Widget", "run", "()V", true, max_locals)
}

fn instance_method(max_locals: u16) -> MethodDesc {
    MethodDesc::new("com/acme/Widget", "run", "()V", false, max_locals)
}

fn single_block_unit(method: MethodDesc, instructions: Vec<Instruction>) -> MethodUnit {
    let mut cfg = ControlFlowGraph::new();
    cfg.add_block(BasicBlock::new(instructions));
    MethodUnit::new(method, cfg)
}

fn constructor_call() -> Instruction {
    Instruction::invoke(
        Opcode::InvokeSpecial,
        MethodRef::new("com/acme/Widget", "<init>", "()V"),
    )
}

/// Scenario C: `New` bound to `$obj` followed by a constructor call on the
/// same receiver. One creation pair yields one match.
#[test]
fn test_new_then_constructor_single_pair() -> Result<()> {
    let unit = single_block_unit(
        static_method(0),
        vec![
            Instruction::simple(Opcode::New),
            constructor_call(),
            Instruction::simple(Opcode::Return),
        ],
    );

    let pattern = ByteCodePattern::new()
        .add(PatternElement::new_object("$obj").label("create"))
        .add(
            PatternElement::invoke("com/acme/Widget", "<init>", "()V", InvokeMode::CONSTRUCTOR)
                .receiver("$obj")
                .label("init"),
        );

    let matches = execute_pattern(&unit, &pattern, None)?;
    assert_eq!(matches.len(), 1);

    let matched = &matches[0];
    assert!(matched.binding("$obj").is_some());
    assert_eq!(
        matched.first_matched("create"),
        Some(Location::new(unit.cfg().entry(), 0))
    );
    assert_eq!(
        matched.first_matched("init"),
        Some(Location::new(unit.cfg().entry(), 1))
    );
    Ok(())
}

/// Scenario C continued: two independent creation pairs yield exactly two
/// matches with disjoint `$obj` bindings.
#[test]
fn test_new_then_constructor_two_pairs() -> Result<()> {
    let unit = single_block_unit(
        static_method(0),
        vec![
            Instruction::simple(Opcode::New),
            constructor_call(),
            Instruction::simple(Opcode::New),
            constructor_call(),
            Instruction::simple(Opcode::Return),
        ],
    );

    let pattern = ByteCodePattern::new()
        .add(PatternElement::new_object("$obj"))
        .add(
            PatternElement::invoke("com/acme/Widget", "<init>", "()V", InvokeMode::CONSTRUCTOR)
                .receiver("$obj"),
        );

    let matches = execute_pattern(&unit, &pattern, None)?;
    assert_eq!(matches.len(), 2);

    let first = matches[0].binding("$obj").unwrap();
    let second = matches[1].binding("$obj").unwrap();
    assert!(!first.same_as(second));
    Ok(())
}

/// Binding consistency prunes mismatched pairs: a constructor call on a
/// different receiver than the bound `New` does not match.
#[test]
fn test_mismatched_receiver_rejected() -> Result<()> {
    // new; new; <init> on the second object only
    let unit = single_block_unit(
        static_method(0),
        vec![
            Instruction::simple(Opcode::New),
            Instruction::simple(Opcode::New),
            constructor_call(),
            Instruction::simple(Opcode::Return),
        ],
    );

    let pattern = ByteCodePattern::new()
        .add(PatternElement::new_object("$obj"))
        .add(
            PatternElement::invoke("com/acme/Widget", "<init>", "()V", InvokeMode::CONSTRUCTOR)
                .receiver("$obj"),
        );

    // Only the second New is the receiver of the constructor call; the
    // first New's binding cannot be completed without a wildcard gap
    let matches = execute_pattern(&unit, &pattern, None)?;
    assert_eq!(matches.len(), 1);
    Ok(())
}

/// Wildcard windows bound the gap between elements.
#[test]
fn test_wildcard_window_bounds_gap() -> Result<()> {
    let body = |gap: usize| {
        let mut instructions = vec![Instruction::simple(Opcode::New)];
        instructions.extend((0..gap).map(|_| Instruction::simple(Opcode::Nop)));
        instructions.push(Instruction::simple(Opcode::Dup));
        instructions.push(Instruction::simple(Opcode::MonitorEnter));
        instructions.push(Instruction::simple(Opcode::Return));
        instructions
    };

    let pattern = ByteCodePattern::new()
        .add(PatternElement::op(&[Opcode::New]))
        .add_wild(2)
        .add(PatternElement::monitor_enter("$lock"));

    let narrow = single_block_unit(static_method(0), body(1));
    assert_eq!(execute_pattern(&narrow, &pattern, None)?.len(), 1);

    let wide = single_block_unit(static_method(0), body(3));
    assert!(execute_pattern(&wide, &pattern, None)?.is_empty());
    Ok(())
}

/// The search continues across forward edges but never across back edges.
#[test]
fn test_back_edges_not_followed() -> Result<()> {
    let mut cfg = ControlFlowGraph::new();
    let head = cfg.add_block(BasicBlock::new(vec![Instruction::simple(Opcode::Nop)]));
    let body = cfg.add_block(BasicBlock::new(vec![Instruction::simple(Opcode::Nop)]));
    cfg.add_edge(head, body, CfgEdgeKind::FallThrough).unwrap();
    cfg.add_edge(body, head, CfgEdgeKind::Branch).unwrap();
    let unit = MethodUnit::new(static_method(0), cfg);

    let two = ByteCodePattern::new().add(PatternElement::op(&[Opcode::Nop]).occurrences(2, 2));
    assert_eq!(execute_pattern(&unit, &two, None)?.len(), 1);

    // A third Nop is only reachable around the loop; the back edge blocks it
    let three = ByteCodePattern::new().add(PatternElement::op(&[Opcode::Nop]).occurrences(3, 3));
    assert!(execute_pattern(&unit, &three, None)?.is_empty());
    Ok(())
}

/// An element that forbids trailing edges stops the match at its block.
#[test]
fn test_trailing_edges_forbidden() -> Result<()> {
    let mut cfg = ControlFlowGraph::new();
    let first = cfg.add_block(BasicBlock::new(vec![Instruction::simple(Opcode::Nop)]));
    let second = cfg.add_block(BasicBlock::new(vec![Instruction::simple(Opcode::Return)]));
    cfg.add_edge(first, second, CfgEdgeKind::FallThrough).unwrap();
    let unit = MethodUnit::new(static_method(0), cfg);

    let crossing = ByteCodePattern::new()
        .add(PatternElement::op(&[Opcode::Nop]))
        .add(PatternElement::op(&[Opcode::Return]));
    assert_eq!(execute_pattern(&unit, &crossing, None)?.len(), 1);

    let confined = ByteCodePattern::new()
        .add(PatternElement::op(&[Opcode::Nop]).allow_trailing_edges(false))
        .add(PatternElement::op(&[Opcode::Return]));
    assert!(execute_pattern(&unit, &confined, None)?.is_empty());
    Ok(())
}

/// `MatchAny` takes the first matching child and fixes its own occurrence.
#[test]
fn test_match_any_over_field_access() -> Result<()> {
    let field = FieldRef::static_field("com/acme/Widget", "shared", "I");
    let unit = single_block_unit(
        static_method(1),
        vec![
            Instruction::field(Opcode::GetStatic, field.clone()),
            Instruction::field(Opcode::PutStatic, field),
            Instruction::simple(Opcode::Return),
        ],
    );

    let access = ByteCodePattern::new().add(PatternElement::match_any(vec![
        PatternElement::load("$f", "$v"),
        PatternElement::store("$f", "$v"),
    ]));

    // One match per access instruction
    let matches = execute_pattern(&unit, &access, None)?;
    assert_eq!(matches.len(), 2);
    for matched in &matches {
        assert!(matches!(matched.binding("$f"), Some(Variable::Field(_))));
    }
    Ok(())
}

/// Load/store value bindings ride on value numbers: the store of the loaded
/// value is tied back to the load through the shared binding.
#[test]
fn test_load_store_value_binding_consistency() -> Result<()> {
    let field = FieldRef::instance("com/acme/Widget", "count", "I");
    let other = FieldRef::instance("com/acme/Widget", "backup", "I");
    let unit = single_block_unit(
        instance_method(1),
        vec![
            Instruction::load(0, false),
            Instruction::field(Opcode::GetField, field),
            Instruction::load(0, false),
            Instruction::simple(Opcode::Swap),
            Instruction::field(Opcode::PutField, other),
            Instruction::simple(Opcode::Return),
        ],
    );

    let pattern = ByteCodePattern::new()
        .interelement_wild(4)
        .add(PatternElement::load("$src", "$value"))
        .add(PatternElement::store("$dst", "$value"));

    let matches = execute_pattern(&unit, &pattern, None)?;
    assert_eq!(matches.len(), 1);

    let matched = &matches[0];
    let Some(Variable::Field(src)) = matched.binding("$src") else {
        panic!("source field not bound");
    };
    let Some(Variable::Field(dst)) = matched.binding("$dst") else {
        panic!("destination field not bound");
    };
    assert_eq!(src.name(), "count");
    assert_eq!(dst.name(), "backup");
    Ok(())
}

/// Null-check elements bind the tested reference.
#[test]
fn test_if_null_binds_tested_value() -> Result<()> {
    let unit = single_block_unit(
        instance_method(1),
        vec![
            Instruction::load(0, false),
            Instruction::branch(Opcode::IfNull, 9),
            Instruction::simple(Opcode::Return),
        ],
    );

    let pattern = ByteCodePattern::new().add(PatternElement::if_null("$ref"));
    let matches = execute_pattern(&unit, &pattern, None)?;
    assert_eq!(matches.len(), 1);
    assert!(matches!(
        matches[0].binding("$ref"),
        Some(Variable::Value(_))
    ));
    Ok(())
}

/// Subtype predicates consult the hierarchy snapshot.
#[test]
fn test_invoke_subtype_with_hierarchy() -> Result<()> {
    let mut hierarchy = ClassHierarchy::new();
    hierarchy.add_class("java/lang/Object", None, &[]);
    hierarchy.add_class("java/io/InputStream", Some("java/lang/Object"), &[]);
    hierarchy.add_class(
        "java/io/FileInputStream",
        Some("java/io/InputStream"),
        &[],
    );

    let unit = single_block_unit(
        static_method(1),
        vec![
            Instruction::load(0, false),
            Instruction::invoke(
                Opcode::InvokeVirtual,
                MethodRef::new("java/io/FileInputStream", "close", "()V"),
            ),
            Instruction::simple(Opcode::Return),
        ],
    );

    let pattern = ByteCodePattern::new().add(PatternElement::invoke(
        "+java/io/InputStream",
        "close",
        "()V",
        InvokeMode::INSTANCE,
    ));
    assert_eq!(execute_pattern(&unit, &pattern, Some(&hierarchy))?.len(), 1);

    // Without a snapshot, the subtype predicate conservatively fails
    assert!(execute_pattern(&unit, &pattern, None)?.is_empty());
    Ok(())
}

/// Dominated-by elements match in blocks dominated by the labeled match.
#[test]
fn test_dominated_by_constraint() -> Result<()> {
    let field = FieldRef::instance("com/acme/Widget", "instance", "Ljava/lang/Object;");

    // entry: load + null check; guarded: store under the check; tail: return
    let mut cfg = ControlFlowGraph::new();
    let entry = cfg.add_block(BasicBlock::new(vec![
        Instruction::load(0, false),
        Instruction::branch(Opcode::IfNonNull, 9),
    ]));
    let guarded = cfg.add_block(BasicBlock::new(vec![
        Instruction::load(0, false),
        Instruction::load(1, false),
        Instruction::field(Opcode::PutField, field.clone()),
    ]));
    let tail = cfg.add_block(BasicBlock::new(vec![Instruction::simple(Opcode::Return)]));
    cfg.add_edge(entry, guarded, CfgEdgeKind::FallThrough).unwrap();
    cfg.add_edge(entry, tail, CfgEdgeKind::Branch).unwrap();
    cfg.add_edge(guarded, tail, CfgEdgeKind::FallThrough).unwrap();
    let unit = MethodUnit::new(instance_method(2), cfg);

    let pattern = ByteCodePattern::new()
        .add(PatternElement::if_null("$ref").label("check"))
        .add(PatternElement::store("$field", "$stored").dominated_by("check"));

    let matches = execute_pattern(&unit, &pattern, None)?;
    assert_eq!(matches.len(), 1);

    let Some(Variable::Field(bound)) = matches[0].binding("$field") else {
        panic!("field not bound");
    };
    assert_eq!(bound.name(), "instance");
    Ok(())
}

/// Search exhaustion is an empty result, not an error.
#[test]
fn test_no_match_is_empty_result() -> Result<()> {
    let unit = single_block_unit(
        static_method(0),
        vec![
            Instruction::simple(Opcode::Nop),
            Instruction::simple(Opcode::Return),
        ],
    );

    let pattern = ByteCodePattern::new().add(PatternElement::monitor_enter("$lock"));
    assert!(execute_pattern(&unit, &pattern, None)?.is_empty());
    Ok(())
}

/// The batch driver runs pattern analyses across independent units.
#[test]
fn test_batch_driver_with_patterns() -> Result<()> {
    let units: Vec<MethodUnit> = (0..4)
        .map(|_| {
            single_block_unit(
                static_method(0),
                vec![
                    Instruction::simple(Opcode::New),
                    constructor_call(),
                    Instruction::simple(Opcode::Return),
                ],
            )
        })
        .collect();

    let counts = analyze_methods(&units, |_, analysis| analysis.num_values_allocated());
    assert_eq!(counts.len(), 4);
    for count in counts {
        assert!(count.unwrap() > 0);
    }
    Ok(())
}
