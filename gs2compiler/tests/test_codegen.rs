use gs2compiler::{
    compile::Opcode,
    compile_str,
    disasm::{Disassembler, Operand},
    prelude::*,
};

const CONTROL: &str = include_str!("control.gs2");
const SOURCE: &str = include_str!("inventory.gs2");

fn ops(source: &str) -> Vec<Opcode> {
    let image = compile_str(source).unwrap();
    Disassembler::new(&image)
        .instructions()
        .unwrap()
        .into_iter()
        .map(|instr| instr.op)
        .collect()
}

#[test]
fn test_compile_inventory() {
    let mut ctx = Context::new();
    let result = ctx.compile(SOURCE, "weapon", "Inventory").unwrap();
    assert!(result.is_success(), "{:?}", result.error_message());

    let mut listing = String::new();
    Disassembler::new(result.bytecode()).disassemble(&mut listing).unwrap();
    println!("{}", listing);

    assert!(listing.starts_with("header: weapon,Inventory,1,"));
    assert_eq!(result.joined_classes(), &["inventory".to_string()]);
}

#[test]
fn test_function_table() {
    let image = compile_str(CONTROL).unwrap();
    let image = Disassembler::new(&image).image().unwrap();

    assert_eq!(image.functions, vec![(1, "onCreated")]);
    assert!(image.strings.contains(&"total"));
    assert!(image.strings.contains(&"big"));
}

#[test]
fn test_control_flow_targets() {
    let image = compile_str(CONTROL).unwrap();
    let instructions = Disassembler::new(&image).instructions().unwrap();

    // Every jump lands on an instruction, or right after the last one.
    for instr in instructions.iter().filter(|instr| instr.op.is_jump()) {
        match &instr.operand {
            Some(Operand::Int(target)) => assert!(
                (*target as usize) <= instructions.len(),
                "{:?} jumps past the end",
                instr
            ),
            other => panic!("jump without target: {:?}", other),
        }
    }

    // The skip over the function body targets the end of the script.
    assert_eq!(instructions[0].op, Opcode::SetIndex);
    assert_eq!(instructions[0].operand, Some(Operand::Int(instructions.len() as u32)));
    assert_eq!(instructions.last().map(|instr| instr.op), Some(Opcode::Ret));
}

#[test]
fn test_short_circuit() {
    use Opcode as O;

    #[rustfmt::skip]
    assert_eq!(ops("a = 1; b = a > 0 && a < 2;"), vec![
        O::TypeVar, O::TypeNumber, O::Assign,
        O::TypeVar,
        O::TypeVar, O::ConvToFloat, O::TypeNumber, O::Gt,
        O::If,
        O::TypeVar, O::ConvToFloat, O::TypeNumber, O::Lt,
        O::SetIndex,
        O::TypeFalse,
        O::Assign,
    ]);
}

#[test]
fn test_object_method_call() {
    use Opcode as O;

    #[rustfmt::skip]
    assert_eq!(ops("x = \"a,b\"; y = x.tokenize();"), vec![
        O::TypeVar, O::TypeString, O::Assign,
        O::TypeVar,
        O::TypeVar, O::ConvToString, O::TypeString, O::ObjTokenize,
        O::Assign,
    ]);
}

#[test]
fn test_compound_assignment() {
    use Opcode as O;

    #[rustfmt::skip]
    assert_eq!(ops("x = 1; x += 2;"), vec![
        O::TypeVar, O::TypeNumber, O::Assign,
        O::TypeVar, O::CopyLastOp, O::ConvToFloat, O::TypeNumber, O::Add, O::Assign,
    ]);
}

#[test]
fn test_postfix_step_value() {
    use Opcode as O;

    #[rustfmt::skip]
    assert_eq!(ops("x = 1; y = x++;"), vec![
        O::TypeVar, O::TypeNumber, O::Assign,
        O::TypeVar,
        O::TypeVar, O::CopyLastOp, O::ConvToFloat, O::SwapLastOps, O::Inc, O::IndexDec,
        O::Assign,
    ]);
}

#[test]
fn test_foreach() {
    use Opcode as O;

    #[rustfmt::skip]
    assert_eq!(ops("for (var item : {1, 2}) echo(item);"), vec![
        O::Temp, O::TypeVar, O::MemberAccess,
        O::TypeArray, O::TypeNumber, O::TypeNumber, O::ArrayEnd, O::ConvToObject,
        O::TypeNumber,
        O::ForEach,
        O::CmdCall,
        O::TypeArray, O::Temp, O::TypeVar, O::MemberAccess, O::TypeVar, O::Call, O::IndexDec,
        O::Inc,
        O::SetIndex,
        O::IndexDec,
    ]);
}

#[test]
fn test_with_block() {
    use Opcode as O;

    #[rustfmt::skip]
    assert_eq!(ops("with (player) { x = 1; }"), vec![
        O::Player, O::ConvToObject, O::With,
        O::TypeVar, O::TypeNumber, O::Assign,
        O::WithEnd,
    ]);
}

#[test]
fn test_index_assignment() {
    use Opcode as O;

    #[rustfmt::skip]
    assert_eq!(ops("a = {1}; a[0] = 5;"), vec![
        O::TypeVar, O::TypeArray, O::TypeNumber, O::ArrayEnd, O::Assign,
        O::TypeVar, O::TypeNumber, O::TypeNumber, O::ArrayAssign,
    ]);
}

#[test]
fn test_idempotent() {
    let compile = || {
        let mut ctx = Context::new();
        let result = ctx.compile(SOURCE, "weapon", "Inventory").unwrap().clone();
        result
    };
    assert_eq!(compile(), compile());
    assert_eq!(compile_str(CONTROL).unwrap(), compile_str(CONTROL).unwrap());
}

/// Jump instructions with their targets, by opcode index.
fn jumps(source: &str) -> Vec<(usize, Opcode, u32)> {
    let image = compile_str(source).unwrap();
    Disassembler::new(&image)
        .instructions()
        .unwrap()
        .into_iter()
        .filter(|instr| instr.op.is_jump())
        .map(|instr| match instr.operand {
            Some(Operand::Int(target)) => (instr.index, instr.op, target),
            other => panic!("jump without target: {:?}", other),
        })
        .collect()
}

#[test]
fn test_casts() {
    use Opcode as O;

    #[rustfmt::skip]
    assert_eq!(ops("x = 1; a = int(x); b = float(\"2\"); c = string(x);"), vec![
        O::TypeVar, O::TypeNumber, O::Assign,
        O::TypeVar, O::TypeVar, O::Int, O::Assign,
        O::TypeVar, O::TypeString, O::ConvToFloat, O::Assign,
        O::TypeVar, O::TypeVar, O::ConvToString, O::Assign,
    ]);

    // A cast to string needs no further conversion for concatenation.
    #[rustfmt::skip]
    assert_eq!(ops("s = string(1) @ \"a\";"), vec![
        O::TypeVar,
        O::TypeNumber, O::ConvToString, O::TypeString, O::Join,
        O::Assign,
    ]);
}

#[test]
fn test_in_range() {
    use Opcode as O;

    #[rustfmt::skip]
    assert_eq!(ops("x = 3; y = x in |1, \"5\"|;"), vec![
        O::TypeVar, O::TypeNumber, O::Assign,
        O::TypeVar,
        O::TypeVar, O::TypeNumber, O::TypeString, O::ConvToFloat, O::InRange,
        O::Assign,
    ]);

    // The test result is already a condition.
    #[rustfmt::skip]
    assert_eq!(ops("x = 3; if (x in |1, 5|) x = 0;"), vec![
        O::TypeVar, O::TypeNumber, O::Assign,
        O::TypeVar, O::TypeNumber, O::TypeNumber, O::InRange,
        O::If,
        O::TypeVar, O::TypeNumber, O::Assign,
    ]);
}

#[test]
fn test_in_object() {
    use Opcode as O;

    #[rustfmt::skip]
    assert_eq!(ops("list = {1, 2}; y = 2 in list;"), vec![
        O::TypeVar, O::TypeArray, O::TypeNumber, O::TypeNumber, O::ArrayEnd, O::Assign,
        O::TypeVar,
        O::TypeNumber, O::TypeVar, O::ConvToObject, O::InObj,
        O::Assign,
    ]);
}

#[test]
fn test_new_array() {
    use Opcode as O;

    #[rustfmt::skip]
    assert_eq!(ops("a = new[3][4][5];"), vec![
        O::TypeVar,
        O::TypeNumber, O::ArrayNew,
        O::TypeNumber, O::ArrayNewMultidim,
        O::TypeNumber, O::ArrayNewMultidim,
        O::Assign,
    ]);
}

#[test]
fn test_new_object() {
    use Opcode as O;

    #[rustfmt::skip]
    assert_eq!(ops("v = new TStaticVar(\"counter\"); w = new TStaticVar();"), vec![
        O::TypeVar, O::TypeString, O::InlineNew, O::TypeString, O::NewObject, O::Assign,
        O::TypeVar, O::TypeVar, O::TypeString, O::NewObject, O::Assign,
    ]);

    let image = compile_str("w = new TStaticVar();").unwrap();
    let image = Disassembler::new(&image).image().unwrap();
    assert!(image.strings.contains(&"unknown_object"));
    assert!(image.strings.contains(&"TStaticVar"));
}

#[test]
fn test_new_statement() {
    use Opcode as O;

    let source = "new GuiButtonCtrl(\"Ok\") {\n  width = 40;\n}";
    #[rustfmt::skip]
    assert_eq!(ops(source), vec![
        O::TypeString, O::InlineNew,
        O::CopyLastOp, O::CopyLastOp, O::CopyLastOp,
        O::TypeString, O::ConvToString, O::NewObject, O::Assign,
        O::ConvToObject, O::With,
        O::TypeVar, O::TypeNumber, O::Assign,
        O::WithEnd,
        O::TypeArray, O::SwapLastOps, O::TypeVar, O::Call, O::IndexDec,
    ]);

    // The body is skipped when the object can't be used.
    assert_eq!(jumps(source), vec![(10, Opcode::With, 15)]);

    let image = compile_str(source).unwrap();
    let image = Disassembler::new(&image).image().unwrap();
    assert!(image.strings.contains(&"addcontrol"));
}

#[test]
fn test_switch() {
    use Opcode as O;

    let source = "x = 2;\nswitch (x) {\n  case 1: y = 1; break;\n  case 2: y = 2;\n  default: y = 0;\n}";
    #[rustfmt::skip]
    assert_eq!(ops(source), vec![
        O::TypeVar, O::TypeNumber, O::Assign,
        O::SetIndex,
        O::TypeVar, O::TypeNumber, O::Assign, O::SetIndex,
        O::TypeVar, O::TypeNumber, O::Assign,
        O::TypeVar, O::TypeNumber, O::Assign,
        O::SetIndex,
        O::TypeVar,
        O::CopyLastOp, O::TypeNumber, O::Eq, O::SetIndexTrue,
        O::CopyLastOp, O::TypeNumber, O::Eq, O::SetIndexTrue,
        O::SetIndex,
        O::IndexDec,
    ]);

    #[rustfmt::skip]
    assert_eq!(jumps(source), vec![
        // To the tests after the bodies.
        (3, Opcode::SetIndex, 15),
        // `break` and the end of the last body drop the value.
        (7, Opcode::SetIndex, 25),
        (14, Opcode::SetIndex, 25),
        (19, Opcode::SetIndexTrue, 4),
        (23, Opcode::SetIndexTrue, 8),
        // Default after every label was tested.
        (24, Opcode::SetIndex, 11),
    ]);
}

#[test]
fn test_continue_in_switch() {
    use Opcode as O;

    let source = "x = 1; while (1) { switch (x) { case 1: continue; } }";
    #[rustfmt::skip]
    assert_eq!(ops(source), vec![
        O::TypeVar, O::TypeNumber, O::Assign,
        O::TypeNumber, O::If, O::CmdCall,
        O::SetIndex,
        O::IndexDec, O::SetIndex,
        O::SetIndex,
        O::TypeVar, O::CopyLastOp, O::TypeNumber, O::Eq, O::SetIndexTrue,
        O::IndexDec,
        O::SetIndex,
    ]);

    // `continue` drops the switch value and restarts the loop.
    let continues: Vec<_> = jumps(source).into_iter().filter(|(index, ..)| *index == 8).collect();
    assert_eq!(continues, vec![(8, Opcode::SetIndex, 3)]);
}
