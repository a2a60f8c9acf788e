//! Interpreter tests over hand-assembled programs.

use sprig_types::{ConstPool, Op, Program, Value};
use sprig_vm::{ExecArgs, Vm, VmConfig, VmFault};

/// Tiny assembler for building test programs.
#[derive(Default)]
struct Asm {
    code: Vec<u8>,
}

impl Asm {
    fn new() -> Self {
        Self::default()
    }

    fn op(mut self, op: Op) -> Self {
        self.code.push(op as u8);
        self
    }

    fn op1(mut self, op: Op, a: u32) -> Self {
        self.code.push(op as u8);
        self.code.extend_from_slice(&a.to_le_bytes());
        self
    }

    fn op2(mut self, op: Op, a: u32, b: u32) -> Self {
        self.code.push(op as u8);
        self.code.extend_from_slice(&a.to_le_bytes());
        self.code.extend_from_slice(&b.to_le_bytes());
        self
    }

    fn finish(self, consts: Vec<Value>) -> Program {
        Program::new(self.code, consts)
    }
}

fn number(v: Value) -> f64 {
    match v {
        Value::Number(n) => n,
        other => panic!("expected a number, got {other:?}"),
    }
}

/// `num main() { return 7; }`
fn return_constant_program() -> Program {
    // entry_point is 9 bytes, so main starts at 9.
    Asm::new()
        .op2(Op::EntryPoint, 9, 0)
        .op2(Op::MakeFrame, 0, 0)
        .op1(Op::PushConst, 0)
        .op(Op::Return)
        .finish(vec![Value::Number(7.0)])
}

/// `num main(num a, num b) { return a + b; }`
fn add_args_program() -> Program {
    Asm::new()
        .op2(Op::EntryPoint, 9, 2)
        .op2(Op::MakeFrame, 2, 2)
        .op1(Op::LoadLocal, 0)
        .op1(Op::LoadLocal, 1)
        .op(Op::Add)
        .op(Op::Return)
        .finish(vec![])
}

#[test]
fn test_return_constant() {
    let mut vm = Vm::new(VmConfig::default());
    let out = vm
        .execute(&return_constant_program(), ExecArgs::default())
        .unwrap();
    assert_eq!(number(out), 7.0);
}

#[test]
fn test_entry_arguments_become_locals() {
    let mut vm = Vm::new(VmConfig::default());
    let exec = ExecArgs::new(vec![Value::Number(3.0), Value::Number(4.0)]);
    let out = vm.execute(&add_args_program(), exec).unwrap();
    assert_eq!(number(out), 7.0);
}

#[test]
fn test_argument_count_is_validated() {
    let mut vm = Vm::new(VmConfig::default());
    let exec = ExecArgs::new(vec![Value::Number(3.0)]);
    let err = vm.execute(&add_args_program(), exec).unwrap_err();
    assert_eq!(
        err,
        VmFault::ArgumentCountMismatch {
            expected: 2,
            got: 1
        }
    );
}

#[test]
fn test_call_and_return_through_a_callee() {
    // main calls double(21); double returns its argument times two.
    //
    //   0: entry_point main 0      (9)
    //   9: make_frame 0 0          (9)   main
    //  18: push_const 0  ; 21      (5)
    //  23: call double            (5)
    //  28: return                  (1)
    //  29: make_frame 1 1          (9)   double
    //  38: load_local 0            (5)
    //  43: push_const 1  ; 2       (5)
    //  48: mul                     (1)
    //  49: return
    let program = Asm::new()
        .op2(Op::EntryPoint, 9, 0)
        .op2(Op::MakeFrame, 0, 0)
        .op1(Op::PushConst, 0)
        .op1(Op::Call, 29)
        .op(Op::Return)
        .op2(Op::MakeFrame, 1, 1)
        .op1(Op::LoadLocal, 0)
        .op1(Op::PushConst, 1)
        .op(Op::Mul)
        .op(Op::Return)
        .finish(vec![Value::Number(21.0), Value::Number(2.0)]);

    let mut vm = Vm::new(VmConfig::default());
    let out = vm.execute(&program, ExecArgs::default()).unwrap();
    assert_eq!(number(out), 42.0);
}

#[test]
fn test_every_positive_cycle_limit_below_need_faults() {
    // The add program takes exactly 6 instructions end to end.
    let program = add_args_program();
    for limit in 1..6 {
        let mut vm = Vm::new(VmConfig::default());
        let exec = ExecArgs::new(vec![Value::Number(1.0), Value::Number(2.0)])
            .with_cycle_limit(limit);
        assert_eq!(
            vm.execute(&program, exec),
            Err(VmFault::CycleLimitExceeded),
            "limit {limit} should exhaust"
        );
    }
    let mut vm = Vm::new(VmConfig::default());
    let exec =
        ExecArgs::new(vec![Value::Number(1.0), Value::Number(2.0)]).with_cycle_limit(6);
    assert_eq!(number(vm.execute(&program, exec).unwrap()), 3.0);
}

#[test]
fn test_zero_cycle_limit_is_unbounded() {
    let mut vm = Vm::new(VmConfig::default());
    let exec = ExecArgs::new(vec![Value::Number(1.0), Value::Number(2.0)]);
    assert_eq!(exec.cycle_limit, 0);
    assert_eq!(number(vm.execute(&add_args_program(), exec).unwrap()), 3.0);
}

#[test]
fn test_jump_if_false_takes_the_else_path() {
    // return (false) ? 1 : 2 spelled with explicit jumps.
    //
    //   0: entry_point 9 0   (9)
    //   9: make_frame 0 0    (9)
    //  18: push_const 0 ; false (5)
    //  23: jump_if_false 38  (5)
    //  28: push_const 1 ; 1  (5)
    //  33: jump 43           (5)
    //  38: push_const 2 ; 2  (5)
    //  43: return
    let program = Asm::new()
        .op2(Op::EntryPoint, 9, 0)
        .op2(Op::MakeFrame, 0, 0)
        .op1(Op::PushConst, 0)
        .op1(Op::JumpIfFalse, 38)
        .op1(Op::PushConst, 1)
        .op1(Op::Jump, 43)
        .op1(Op::PushConst, 2)
        .op(Op::Return)
        .finish(vec![
            Value::Bool(false),
            Value::Number(1.0),
            Value::Number(2.0),
        ]);

    let mut vm = Vm::new(VmConfig::default());
    let out = vm.execute(&program, ExecArgs::default()).unwrap();
    assert_eq!(number(out), 2.0);
}

#[test]
fn test_make_array_len_and_get() {
    // let xs = [10, 20, 30]; return xs[2] + len(xs);
    let program = Asm::new()
        .op2(Op::EntryPoint, 9, 0)
        .op2(Op::MakeFrame, 0, 1)
        .op1(Op::PushConst, 0)
        .op1(Op::PushConst, 1)
        .op1(Op::PushConst, 2)
        .op1(Op::MakeArray, 3)
        .op1(Op::StoreLocal, 0)
        .op1(Op::LoadLocal, 0)
        .op1(Op::PushConst, 3)
        .op(Op::ArrayGet)
        .op1(Op::LoadLocal, 0)
        .op(Op::ArrayLen)
        .op(Op::Add)
        .op(Op::Return)
        .finish(vec![
            Value::Number(10.0),
            Value::Number(20.0),
            Value::Number(30.0),
            Value::Number(2.0),
        ]);

    let mut vm = Vm::new(VmConfig::default());
    let out = vm.execute(&program, ExecArgs::default()).unwrap();
    assert_eq!(number(out), 33.0);
}

#[test]
fn test_array_get_out_of_range_faults() {
    let program = Asm::new()
        .op2(Op::EntryPoint, 9, 0)
        .op2(Op::MakeFrame, 0, 0)
        .op1(Op::PushConst, 0)
        .op1(Op::MakeArray, 1)
        .op1(Op::PushConst, 1)
        .op(Op::ArrayGet)
        .op(Op::Return)
        .finish(vec![Value::Number(5.0), Value::Number(3.0)]);

    let mut vm = Vm::new(VmConfig::default());
    let err = vm.execute(&program, ExecArgs::default()).unwrap_err();
    assert_eq!(err, VmFault::IndexOutOfRange { index: 3, len: 1 });
}

fn native_call_program() -> Program {
    let mut pool = ConstPool::new();
    let num = pool.intern(Value::Number(21.0));
    let name = pool.intern_string("twice");
    Asm::new()
        .op2(Op::EntryPoint, 9, 0)
        .op2(Op::MakeFrame, 0, 0)
        .op1(Op::PushConst, num)
        .op2(Op::CallNative, name, 1)
        .op(Op::Return)
        .finish(pool.into_values())
}

#[test]
fn test_native_call_round_trip() {
    let mut vm = Vm::new(VmConfig::default());
    vm.register_native(
        "twice",
        "f",
        1,
        Box::new(|_ctx, args| match args {
            [Value::Number(n)] => Ok(Value::Number(n * 2.0)),
            _ => Ok(Value::None),
        }),
    )
    .unwrap();

    let out = vm
        .execute(&native_call_program(), ExecArgs::default())
        .unwrap();
    assert_eq!(number(out), 42.0);
}

#[test]
fn test_unregistered_native_faults() {
    let mut vm = Vm::new(VmConfig::default());
    let err = vm
        .execute(&native_call_program(), ExecArgs::default())
        .unwrap_err();
    assert_eq!(err, VmFault::UnknownNative("twice".to_string()));
}

#[test]
fn test_native_arity_is_checked_at_call_time() {
    let mut vm = Vm::new(VmConfig::default());
    vm.register_native("twice", "ff", 2, Box::new(|_ctx, _args| Ok(Value::None)))
        .unwrap();
    let err = vm
        .execute(&native_call_program(), ExecArgs::default())
        .unwrap_err();
    assert_eq!(
        err,
        VmFault::NativeArityMismatch {
            name: "twice".to_string(),
            expected: 2,
            got: 1
        }
    );
}

#[test]
fn test_duplicate_native_registration_is_rejected() {
    let mut vm = Vm::new(VmConfig::default());
    vm.register_native("print", "[c]", 1, Box::new(|_ctx, _args| Ok(Value::None)))
        .unwrap();
    let err = vm
        .register_native("print", "[c]", 1, Box::new(|_ctx, _args| Ok(Value::None)))
        .unwrap_err();
    assert_eq!(err, VmFault::DuplicateNative("print".to_string()));
}

#[test]
fn test_native_can_allocate_a_result_array() {
    let mut pool = ConstPool::new();
    let name = pool.intern_string("greet");
    let program = Asm::new()
        .op2(Op::EntryPoint, 9, 0)
        .op2(Op::MakeFrame, 0, 0)
        .op2(Op::CallNative, name, 0)
        .op(Op::Return)
        .finish(pool.into_values());

    let mut vm = Vm::new(VmConfig::default());
    vm.register_native(
        "greet",
        "",
        0,
        Box::new(|ctx, _args| ctx.alloc_string("hi")),
    )
    .unwrap();

    let out = vm.execute(&program, ExecArgs::default()).unwrap();
    assert_eq!(vm.render(out, &program), "\"hi\"");
}

#[test]
fn test_native_arguments_stay_rooted_across_collection() {
    // A four-segment heap: the argument array claims the first two
    // segments, a discarded array claims the rest, so the allocation
    // inside the native has to collect while the argument is only
    // reachable through the call's buffer.
    let mut pool = ConstPool::new();
    let one = pool.intern(Value::Number(1.0));
    let two = pool.intern(Value::Number(2.0));
    let three = pool.intern(Value::Number(3.0));
    let name = pool.intern_string("first");
    let program = Asm::new()
        .op2(Op::EntryPoint, 9, 0)
        .op2(Op::MakeFrame, 0, 0)
        .op1(Op::PushConst, one)
        .op1(Op::PushConst, two)
        .op1(Op::PushConst, three)
        .op1(Op::MakeArray, 3)
        .op1(Op::PushConst, one)
        .op1(Op::PushConst, two)
        .op1(Op::PushConst, three)
        .op1(Op::MakeArray, 3)
        .op(Op::Pop)
        .op2(Op::CallNative, name, 1)
        .op(Op::Return)
        .finish(pool.into_values());

    let mut vm = Vm::new(VmConfig {
        heap_size: 64 * 4,
        ..VmConfig::default()
    });
    vm.register_native(
        "first",
        "[f]",
        1,
        Box::new(|ctx, args| {
            let [Value::Array(r)] = args else {
                return Ok(Value::None);
            };
            ctx.alloc_array(&[Value::Number(9.0)])?;
            let elems = ctx.read_array(*r).ok_or(VmFault::HeapExhausted(3))?;
            Ok(elems[0])
        }),
    )
    .unwrap();

    let out = vm.execute(&program, ExecArgs::default()).unwrap();
    assert_eq!(number(out), 1.0);
}

#[test]
fn test_invalid_opcode_faults_with_address() {
    let program = Program::new(vec![0xff], vec![]);
    let mut vm = Vm::new(VmConfig::default());
    let err = vm.execute(&program, ExecArgs::default()).unwrap_err();
    assert_eq!(err, VmFault::InvalidOpcode { byte: 0xff, addr: 0 });
}

#[test]
fn test_truncated_operand_faults() {
    // push_const with only two of its four operand bytes.
    let program = Program::new(vec![Op::PushConst as u8, 0x00, 0x00], vec![]);
    let mut vm = Vm::new(VmConfig::default());
    let err = vm.execute(&program, ExecArgs::default()).unwrap_err();
    assert_eq!(err, VmFault::TruncatedProgram(0));
}

#[test]
fn test_stack_overflow_on_runaway_push() {
    // An infinite push loop must hit the configured depth.
    let program = Asm::new()
        .op1(Op::PushConst, 0)
        .op1(Op::Jump, 0)
        .finish(vec![Value::Number(1.0)]);
    let mut vm = Vm::new(VmConfig {
        stack_size: 32,
        ..VmConfig::default()
    });
    let err = vm.execute(&program, ExecArgs::default()).unwrap_err();
    assert_eq!(err, VmFault::StackOverflow);
}

#[test]
fn test_render_follows_nested_arrays() {
    // [[1, 2], 'x'] rendered deep.
    let program = Asm::new()
        .op2(Op::EntryPoint, 9, 0)
        .op2(Op::MakeFrame, 0, 0)
        .op1(Op::PushConst, 0)
        .op1(Op::PushConst, 1)
        .op1(Op::MakeArray, 2)
        .op1(Op::PushConst, 2)
        .op1(Op::MakeArray, 2)
        .op(Op::Return)
        .finish(vec![
            Value::Number(1.0),
            Value::Number(2.0),
            Value::Char('x'),
        ]);

    let mut vm = Vm::new(VmConfig::default());
    let out = vm.execute(&program, ExecArgs::default()).unwrap();
    assert_eq!(vm.render(out, &program), "[[1, 2], 'x']");
}
