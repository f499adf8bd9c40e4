//! Integration tests for functions, programs and invocations.

use charsheet_core::testing::{assert_number, RulebookBuilder, ScriptedDice, StoreBuilder};
use charsheet_core::variable::NumberVariableValue;
use charsheet_core::{
    BindingName, DataReference, EngineError, EngineValue, EngineValueType, Environment, Evaluator, FunctionId,
    Invocation, NumberReference, Program, ProgramId, Rulebook, Sheet, Statement, TypeSignature, Variable,
    VariableReference,
};

fn numbers(n: usize) -> TypeSignature {
    TypeSignature::new(vec![EngineValueType::Number; n], EngineValueType::Number)
}

/// `add2` tabulated for a handful of small inputs.
fn rulebook() -> RulebookBuilder {
    RulebookBuilder::new().number_function(
        "add2",
        2,
        &[
            (&[1.0, 1.0], 2.0),
            (&[2.0, 3.0], 5.0),
            (&[5.0, 5.0], 10.0),
            (&[10.0, 2.0], 12.0),
        ],
    )
}

fn sum_program() -> Program {
    Program::new("sum", numbers(2), "b1")
        .with_statement(Statement::new("b1", "add2").with_program_parameter(1).with_program_parameter(2))
}

#[test]
fn test_single_statement_program() {
    let rulebook = rulebook().program(sum_program()).build();
    let store = StoreBuilder::new().build().unwrap();
    let mut dice = ScriptedDice::new([]);
    let mut evaluator = Evaluator::new(&rulebook, &store, &mut dice);

    let result = evaluator.run_program(
        &ProgramId::new("sum"),
        vec![EngineValue::Number(2.0), EngineValue::Number(3.0)],
    );
    assert_eq!(result, Ok(EngineValue::Number(5.0)));
}

#[test]
fn test_invocation_resolves_arguments_in_caller() {
    let rulebook = rulebook().program(sum_program()).shared();
    let store = StoreBuilder::new()
        .number("base", 5.0)
        .number("bonus", 5.0)
        .variable(Variable::number(
            "total",
            "Total",
            NumberVariableValue::Program(
                Invocation::new("sum")
                    .with_argument(DataReference::Number(NumberReference::Variable(VariableReference::id("base"))))
                    .with_argument(DataReference::Number(NumberReference::Variable(VariableReference::id("bonus")))),
            ),
        ))
        .build()
        .unwrap();
    let sheet = Sheet::with_store(rulebook, store);
    assert_number(&sheet, "total", &mut ScriptedDice::new([]), 10.0);
}

#[test]
fn test_program_is_deterministic() {
    let program = Program::new("chain", numbers(2), "b2")
        .with_statement(Statement::new("b1", "add2").with_program_parameter(1).with_program_parameter(2))
        .with_statement(
            Statement::new("b2", "add2")
                .with_binding("b1")
                .with_reference(DataReference::Number(NumberReference::Variable(VariableReference::id("bonus")))),
        );
    let rulebook = rulebook().program(program).build();
    let store = StoreBuilder::new().number("bonus", 2.0).build().unwrap();
    let args = vec![EngineValue::Number(5.0), EngineValue::Number(5.0)];

    let mut dice = ScriptedDice::new([]);
    let mut evaluator = Evaluator::new(&rulebook, &store, &mut dice);
    let first = evaluator.run_program(&ProgramId::new("chain"), args.clone());
    let second = evaluator.run_program(&ProgramId::new("chain"), args.clone());
    assert_eq!(first, Ok(EngineValue::Number(12.0)));
    assert_eq!(first, second);

    let mut dice = ScriptedDice::new([]);
    let mut fresh = Evaluator::new(&rulebook, &store, &mut dice);
    assert_eq!(fresh.apply(&FunctionId::new("chain"), args), first);
    assert!(dice.requests().is_empty());
}

#[test]
fn test_multi_statement_chain() {
    // b1 = add2(p1, p2); b2 = add2(b1, 2)
    let program = Program::new("chain", numbers(2), "b2")
        .with_statement(Statement::new("b1", "add2").with_program_parameter(1).with_program_parameter(2))
        .with_statement(Statement::new("b2", "add2").with_binding("b1").with_reference(2.0));
    let rulebook = rulebook().program(program).build();
    let store = StoreBuilder::new().build().unwrap();
    let mut dice = ScriptedDice::new([]);
    let mut evaluator = Evaluator::new(&rulebook, &store, &mut dice);
    assert_eq!(
        evaluator.run_program(&ProgramId::new("chain"), vec![EngineValue::Number(5.0), EngineValue::Number(5.0)]),
        Ok(EngineValue::Number(12.0))
    );
}

#[test]
fn test_forward_reference_fails_at_runtime() {
    let program = Program::new("bad", numbers(2), "b2")
        .with_statement(Statement::new("b1", "add2").with_binding("b2").with_program_parameter(1))
        .with_statement(Statement::new("b2", "add2").with_program_parameter(1).with_program_parameter(2));
    assert_eq!(program.forward_references(), vec![(0, BindingName::new("b2"))]);

    let rulebook = rulebook().program(program).build();
    let store = StoreBuilder::new().build().unwrap();
    let mut dice = ScriptedDice::new([]);
    let mut evaluator = Evaluator::new(&rulebook, &store, &mut dice);
    assert_eq!(
        evaluator.run_program(&ProgramId::new("bad"), vec![EngineValue::Number(1.0), EngineValue::Number(1.0)]),
        Err(EngineError::ForwardReference {
            program: ProgramId::new("bad"),
            statement: 0,
            binding: BindingName::new("b2"),
        })
    );
}

#[test]
fn test_last_write_wins() {
    let program = Program::new("rebind", numbers(2), "b")
        .with_statement(Statement::new("b", "add2").with_program_parameter(1).with_program_parameter(2))
        .with_statement(Statement::new("b", "add2").with_binding("b").with_binding("b"));
    let rulebook = rulebook().program(program).build();
    let store = StoreBuilder::new().build().unwrap();
    let mut dice = ScriptedDice::new([]);
    let mut evaluator = Evaluator::new(&rulebook, &store, &mut dice);
    // (2 + 3) then (5 + 5)
    assert_eq!(
        evaluator.run_program(&ProgramId::new("rebind"), vec![EngineValue::Number(2.0), EngineValue::Number(3.0)]),
        Ok(EngineValue::Number(10.0))
    );
}

#[test]
fn test_unbound_result() {
    let program = Program::new("lost", numbers(2), "missing")
        .with_statement(Statement::new("b1", "add2").with_program_parameter(1).with_program_parameter(2));
    let rulebook = rulebook().program(program).build();
    let store = StoreBuilder::new().build().unwrap();
    let mut dice = ScriptedDice::new([]);
    let mut evaluator = Evaluator::new(&rulebook, &store, &mut dice);
    assert_eq!(
        evaluator.run_program(&ProgramId::new("lost"), vec![EngineValue::Number(1.0), EngineValue::Number(1.0)]),
        Err(EngineError::UnboundResult {
            program: ProgramId::new("lost"),
            binding: BindingName::new("missing"),
        })
    );
}

#[test]
fn test_parameter_index_out_of_range() {
    for index in [0, 3] {
        let program = Program::new("oob", numbers(2), "b1")
            .with_statement(Statement::new("b1", "add2").with_program_parameter(1).with_program_parameter(index));
        let rulebook = rulebook().program(program).build();
        let store = StoreBuilder::new().build().unwrap();
        let mut dice = ScriptedDice::new([]);
        let mut evaluator = Evaluator::new(&rulebook, &store, &mut dice);
        assert_eq!(
            evaluator.run_program(&ProgramId::new("oob"), vec![EngineValue::Number(1.0), EngineValue::Number(1.0)]),
            Err(EngineError::InvalidParameterIndex {
                program: ProgramId::new("oob"),
                index,
            })
        );
    }
}

#[test]
fn test_program_arguments_are_type_checked() {
    let rulebook = rulebook().program(sum_program()).build();
    let store = StoreBuilder::new().build().unwrap();
    let mut dice = ScriptedDice::new([]);
    let mut evaluator = Evaluator::new(&rulebook, &store, &mut dice);
    let err = evaluator
        .run_program(&ProgramId::new("sum"), vec![EngineValue::Number(2.0), EngineValue::Boolean(true)])
        .unwrap_err();
    assert!(matches!(err, EngineError::TypeSignatureMismatch { .. }));
}

#[test]
fn test_statement_may_call_a_program() {
    // double(x) = sum(x, x)
    let double = Program::new("double", numbers(1), "d")
        .with_statement(Statement::new("d", "sum").with_program_parameter(1).with_program_parameter(1));
    let rulebook = rulebook().program(sum_program()).program(double).build();
    let store = StoreBuilder::new().build().unwrap();
    let mut dice = ScriptedDice::new([]);
    let mut evaluator = Evaluator::new(&rulebook, &store, &mut dice);
    assert_eq!(
        evaluator.run_program(&ProgramId::new("double"), vec![EngineValue::Number(5.0)]),
        Ok(EngineValue::Number(10.0))
    );
}

#[test]
fn test_mutual_recursion_is_cyclic() {
    let ping = Program::new("ping", numbers(1), "r")
        .with_statement(Statement::new("r", "pong").with_program_parameter(1));
    let pong = Program::new("pong", numbers(1), "r")
        .with_statement(Statement::new("r", "ping").with_program_parameter(1));
    let rulebook = Rulebook::new().with_program(ping).with_program(pong);
    let store = StoreBuilder::new().build().unwrap();
    let mut dice = ScriptedDice::new([]);
    let mut evaluator = Evaluator::new(&rulebook, &store, &mut dice);
    assert_eq!(
        evaluator.run_program(&ProgramId::new("ping"), vec![EngineValue::Number(1.0)]),
        Err(EngineError::CyclicInvocation(ProgramId::new("ping")))
    );
}

#[test]
fn test_unknown_function_in_statement() {
    let program = Program::new("p", numbers(0), "r").with_statement(Statement::new("r", "nowhere"));
    let rulebook = Rulebook::new().with_program(program);
    let store = StoreBuilder::new().build().unwrap();
    let mut dice = ScriptedDice::new([]);
    let mut evaluator = Evaluator::new(&rulebook, &store, &mut dice);
    assert_eq!(
        evaluator.run_program(&ProgramId::new("p"), Vec::new()),
        Err(EngineError::UnknownFunction(FunctionId::new("nowhere")))
    );
}

#[test]
fn test_program_conforms_to_its_function() {
    let rulebook = rulebook().program(sum_program()).build();
    let store = StoreBuilder::new().build().unwrap();
    let mut dice = ScriptedDice::new([]);
    let mut evaluator = Evaluator::new(&rulebook, &store, &mut dice);
    let report = evaluator
        .check_conformance(&ProgramId::new("sum"), &FunctionId::new("add2"))
        .unwrap();
    assert!(report.is_success());
    assert_eq!(report.passed, 4);
}
